use crate::models::ApiError;
use axum::{
    Json,
    body::Body,
    extract::State,
    http::{self, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::{convert::Infallible, env};
use tracing::warn;
use uuid::Uuid;

const TOKEN_TTL_HOURS: i64 = 2;

#[derive(Clone)]
pub struct AuthState {
    jwt_secret: String,
    admin_username: String,
    admin_password: String,
}

#[derive(Clone, Debug)]
pub struct AdminContext {
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub jti: Uuid,
    pub exp: i64,
}

impl AuthState {
    pub fn from_env() -> Self {
        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            warn!(
                target = "srbot.auth",
                "JWT_SECRET not set, using fallback secret"
            );
            "fallback_secret_change_in_production".to_string()
        });
        Self {
            jwt_secret,
            admin_username: env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".into()),
            admin_password: env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "pass".into()),
        }
    }

    #[cfg(test)]
    pub fn for_tests(secret: &str) -> Self {
        Self {
            jwt_secret: secret.to_string(),
            admin_username: "admin".into(),
            admin_password: "pass".into(),
        }
    }

    pub fn check_credentials(&self, username: &str, password: &str) -> bool {
        username == self.admin_username && password == self.admin_password
    }

    pub fn issue_token(&self, username: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = Claims {
            sub: username.to_string(),
            role: "admin".to_string(),
            jti: Uuid::new_v4(),
            exp: (Utc::now() + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
        };
        jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
    }

    fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let data = jsonwebtoken::decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(data.claims)
    }
}

/// Admin-route middleware: missing token → 401, bad or expired token → 403.
pub async fn require_admin(
    State(state): State<AuthState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, Infallible> {
    let Some(token) = extract_bearer(request.headers()) else {
        return Ok(error_response(StatusCode::UNAUTHORIZED, "Token requerido"));
    };

    match state.verify(&token) {
        Ok(claims) => {
            request
                .extensions_mut()
                .insert(AdminContext {
                    username: claims.sub,
                });
            Ok(next.run(request).await)
        }
        Err(err) => {
            warn!(target = "srbot.auth", error = %err, "token verification failed");
            Ok(error_response(StatusCode::FORBIDDEN, "Token inválido"))
        }
    }
}

fn extract_bearer(headers: &http::HeaderMap) -> Option<String> {
    let raw = headers.get(http::header::AUTHORIZATION)?.to_str().ok()?;
    if raw.len() >= 7 && raw[..6].eq_ignore_ascii_case("bearer") {
        let token = raw[6..].trim();
        if !token.is_empty() {
            return Some(token.to_string());
        }
    }
    None
}

fn error_response(status: StatusCode, message: &str) -> Response {
    let payload = ApiError {
        error: message.to_string(),
        detail: None,
    };
    (status, Json(payload)).into_response()
}
