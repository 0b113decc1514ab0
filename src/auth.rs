//! Session tokens: issued on login, required on every other route.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::error::AuthError;
use crate::types::User;

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,
    pub uid: i64,
    pub iat: u64,
    pub exp: u64,
}

#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: u64,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl_minutes: u64) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::EmptySecret);
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs: ttl_minutes.saturating_mul(60),
        })
    }

    pub fn issue(&self, user: &User) -> Result<String, AuthError> {
        let now = Utc::now().timestamp().max(0) as u64;
        let claims = Claims {
            sub: user.username.clone(),
            uid: user.id,
            iat: now,
            exp: now.saturating_add(self.ttl_secs),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }
}

/// Token part of an `Authorization` header value (`<scheme> <token>`).
pub fn bearer_token(header_value: Option<&str>) -> Result<&str, AuthError> {
    let value = header_value.ok_or(AuthError::MissingHeader)?;
    Ok(value
        .split_once(' ')
        .map(|(_, token)| token.trim())
        .unwrap_or_default())
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match &self {
            AuthError::MissingHeader => StatusCode::BAD_REQUEST,
            AuthError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            AuthError::EmptySecret => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Rejects requests without a valid session token; valid claims are stored
/// in the request extensions.
pub async fn require_auth(
    State(issuer): State<Arc<TokenIssuer>>,
    mut request: Request,
    next: Next,
) -> Response {
    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let claims = match bearer_token(header_value).and_then(|token| issuer.verify(token)) {
        Ok(claims) => claims,
        Err(error) => {
            debug!(error = %error, "request rejected by auth");
            return error.into_response();
        }
    };

    debug!(subject = %claims.sub, "session token validated");
    request.extensions_mut().insert(claims);
    next.run(request).await
}
