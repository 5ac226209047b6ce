use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Always serialized as `{}`; reserved for paging and the like.
#[derive(Debug, Default, Serialize)]
pub struct Meta {}

/// Body shape shared by every endpoint, errors included.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: Option<T>,
    pub meta: Meta,
    pub message: String,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            data,
            meta: Meta::default(),
            message: message.into(),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(message, None)
    }
}

/// Status, optional extra headers and an enveloped body.
pub struct Reply<T> {
    status: StatusCode,
    headers: HeaderMap,
    body: ApiResponse<T>,
}

impl<T: Serialize> Reply<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self::with_status(StatusCode::OK, message, Some(data))
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self::with_status(StatusCode::CREATED, message, Some(data))
    }

    pub fn with_status(status: StatusCode, message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: ApiResponse::new(message, data),
        }
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl Reply<()> {
    pub fn done(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::OK, message, None)
    }
}

impl<T: Serialize> IntoResponse for Reply<T> {
    fn into_response(self) -> Response {
        (self.status, self.headers, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_carries_message_in_body() {
        let body = ApiResponse::new("Got tutorial", Some(serde_json::json!({ "slug": "go-101" })));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["message"], "Got tutorial");
        assert_eq!(json["data"]["slug"], "go-101");
        assert_eq!(json["meta"], serde_json::json!({}));
    }

    #[test]
    fn message_only_envelope_has_null_data() {
        let json = serde_json::to_value(ApiResponse::message("Logged out")).unwrap();
        assert!(json["data"].is_null());
    }
}
