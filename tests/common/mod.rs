#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use tutoria::{app::build_app, mail::LogMailer, state::AppState};
use uuid::Uuid;

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub mailer: Arc<LogMailer>,
}

pub struct Response {
    pub status: StatusCode,
    pub set_cookie: Option<String>,
    pub body: Value,
}

pub fn spawn_app() -> TestApp {
    let (state, mailer) = AppState::fake();
    TestApp {
        router: build_app(state.clone()),
        state,
        mailer,
    }
}

impl TestApp {
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            req = req.header(header::COOKIE, cookie);
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        Response {
            status,
            set_cookie,
            body,
        }
    }

    pub async fn register(&self, first_name: &str, email: &str, password: &str) -> Uuid {
        let res = self
            .send(
                "POST",
                "/users",
                None,
                Some(json!({
                    "first_name": first_name,
                    "last_name": "Tester",
                    "email": email,
                    "password": password,
                })),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
        res.body["data"]["id"].as_str().unwrap().parse().unwrap()
    }

    /// Logs in and returns the `name=value` pair to send back as `Cookie`.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let res = self
            .send(
                "POST",
                "/users/login",
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(res.status, StatusCode::OK, "{}", res.body);
        let set_cookie = res.set_cookie.expect("login sets a cookie");
        set_cookie.split(';').next().unwrap().to_string()
    }

    pub async fn user_session(&self, first_name: &str, email: &str) -> (Uuid, String) {
        let id = self.register(first_name, email, "password123").await;
        let cookie = self.login(email, "password123").await;
        (id, cookie)
    }

    pub async fn admin_session(&self) -> (Uuid, String) {
        let (id, cookie) = self.user_session("Admin", "admin@example.com").await;
        assert!(self.state.users.set_admin(id, true).await.unwrap());
        (id, cookie)
    }
}
