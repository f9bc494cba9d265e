//! HS256 session tokens via jsonwebtoken.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use domains::{AppError, Result, Sessions, User, Viewer};

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// User id.
    sub: Uuid,
    /// Username, denormalized so the extractor needs no store lookup.
    name: String,
    iat: i64,
    exp: i64,
}

pub struct JwtSessions {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl JwtSessions {
    pub fn new(secret: &[u8], ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: Duration::hours(ttl_hours),
        }
    }
}

impl Sessions for JwtSessions {
    fn issue(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id,
            name: user.username.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("jwt encode: {e}")))
    }

    fn verify(&self, token: &str) -> Option<Viewer> {
        let validation = Validation::new(Algorithm::HS256);
        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => Some(Viewer {
                id: data.claims.sub,
                username: data.claims.name,
            }),
            Err(err) => {
                debug!(%err, "session token rejected");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: Uuid::now_v7(),
            username: "ada".into(),
            display_name: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn issue_then_verify_round_trips() {
        let sessions = JwtSessions::new(b"test-secret", 24);
        let u = user();
        let token = sessions.issue(&u).unwrap();
        let viewer = sessions.verify(&token).unwrap();
        assert_eq!(viewer.id, u.id);
        assert_eq!(viewer.username, "ada");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let minted = JwtSessions::new(b"secret-a", 24);
        let checked = JwtSessions::new(b"secret-b", 24);
        let token = minted.issue(&user()).unwrap();
        assert!(checked.verify(&token).is_none());
    }

    #[test]
    fn garbage_token_is_rejected() {
        let sessions = JwtSessions::new(b"test-secret", 24);
        assert!(sessions.verify("not.a.token").is_none());
    }
}
