use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::claims::Claims;
use crate::{config::AppConfig, state::AppState};

/// A signed session token and the instant it stops verifying.
#[derive(Debug, Clone)]
pub struct SessionToken {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

impl JwtKeys {
    pub fn from_config(config: &AppConfig) -> Self {
        let secret = config.jwt.secret.as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            issuer: config.jwt.issuer.clone(),
            audience: config.jwt.audience.clone(),
            ttl: Duration::days(config.session.ttl_days),
        }
    }

    pub fn sign(&self, user_id: Uuid) -> anyhow::Result<SessionToken> {
        let now = OffsetDateTime::now_utc();
        let expires_at = now
            .checked_add(self.ttl)
            .ok_or_else(|| anyhow::anyhow!("session ttl {} out of range", self.ttl))?;
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: expires_at.unix_timestamp().max(0) as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "session token signed");
        Ok(SessionToken { token, expires_at })
    }

    /// Checks signature, expiry, issuer and audience.
    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, "session token verified");
        Ok(data.claims)
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.keys.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys(secret: &str, issuer: &str, audience: &str) -> JwtKeys {
        let mut config = AppConfig::for_tests();
        config.jwt.secret = secret.into();
        config.jwt.issuer = issuer.into();
        config.jwt.audience = audience.into();
        JwtKeys::from_config(&config)
    }

    #[test]
    fn sign_and_verify_session_token() {
        let keys = make_keys("dev-secret", "test-issuer", "test-aud");
        let user_id = Uuid::new_v4();
        let signed = keys.sign(user_id).expect("sign");
        let claims = keys.verify(&signed.token).expect("verify token");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(claims.exp as i64, signed.expires_at.unix_timestamp());
    }

    #[test]
    fn expiry_claim_matches_session_ttl() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let signed = keys.sign(Uuid::new_v4()).unwrap();
        let claims = keys.verify(&signed.token).unwrap();
        assert_eq!(claims.exp - claims.iat, 15 * 24 * 60 * 60);
    }

    #[test]
    fn verify_rejects_expired_token() {
        let mut keys = make_keys("dev-secret", "iss", "aud");
        keys.ttl = Duration::days(-1);
        let signed = keys.sign(Uuid::new_v4()).unwrap();
        assert!(keys.verify(&signed.token).is_err());
    }

    #[test]
    fn sign_errors_instead_of_overflowing() {
        let mut keys = make_keys("dev-secret", "iss", "aud");
        keys.ttl = Duration::MAX;
        assert!(keys.sign(Uuid::new_v4()).is_err());
    }

    #[test]
    fn verify_rejects_wrong_issuer_or_audience() {
        let good_keys = make_keys("same-secret", "good-iss", "good-aud");
        let bad_keys = make_keys("same-secret", "bad-iss", "bad-aud");
        let signed = good_keys.sign(Uuid::new_v4()).unwrap();
        assert!(bad_keys.verify(&signed.token).is_err());
    }

    #[test]
    fn verify_rejects_foreign_signature() {
        let ours = make_keys("our-secret", "iss", "aud");
        let theirs = make_keys("their-secret", "iss", "aud");
        let signed = theirs.sign(Uuid::new_v4()).unwrap();
        assert!(ours.verify(&signed.token).is_err());
    }
}
