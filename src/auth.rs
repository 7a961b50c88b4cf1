use std::convert::Infallible;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::DateTime;
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    models::{Identity, Session},
};

/// Claims
///
/// The subset of a Supabase access token the gate relies on. Signed with the project's
/// JWT secret (HS256).
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user's UUID in `auth.users`.
    pub sub: Uuid,
    /// Expiration Time (exp).
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Claims {
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.sub,
            email: self.email.clone(),
            expires_at: DateTime::from_timestamp(self.exp as i64, 0),
        }
    }
}

/// decode_claims
///
/// Validates signature and expiry. Audience is not checked: Supabase issues
/// `aud = "authenticated"` and locally minted tokens carry none.
pub fn decode_claims(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation.validate_aud = false;

    decode::<Claims>(token, &decoding_key, &validation).map(|data| data.claims)
}

/// Viewer
///
/// The session of whoever is calling the gate API. Unlike an authentication guard it
/// never rejects: a missing, malformed or expired token simply makes the viewer
/// anonymous, which the engine then answers with `RequireAuth`.
#[derive(Debug, Clone)]
pub struct Viewer {
    pub session: Session,
}

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);

        // Local development bypass: a raw UUID in 'x-user-id' stands in for a token.
        if config.env == Env::Local {
            let bypass = parts
                .headers
                .get("x-user-id")
                .and_then(|value| value.to_str().ok())
                .and_then(|id| Uuid::parse_str(id).ok());

            if let Some(user_id) = bypass {
                return Ok(Viewer {
                    session: Session::authenticated(Identity::new(user_id)),
                });
            }
        }

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));

        let Some(token) = token else {
            return Ok(Viewer {
                session: Session::anonymous(),
            });
        };

        let session = match decode_claims(token, &config.jwt_secret) {
            Ok(claims) => Session::authenticated(claims.identity()),
            Err(e) => {
                tracing::debug!(error = ?e.kind(), "bearer token rejected; treating viewer as anonymous");
                Session::anonymous()
            }
        };

        Ok(Viewer { session })
    }
}
