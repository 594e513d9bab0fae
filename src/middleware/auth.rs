use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::config::AppState;
use crate::middleware::error_handling::AppError;
use crate::models::user::{UserId, UserRole};

pub const AUTH_COOKIE: &str = "auth_token";

/// Authenticated principal, as established by the session collaborator
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub user_id: UserId,
    pub role: UserRole,
    pub exp: usize,
    pub iat: usize,
    pub jti: String,
}

pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_ref()),
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
        }
    }

    pub fn generate_token(&self, user_id: UserId, role: UserRole) -> Result<String, jsonwebtoken::errors::Error> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as usize)
            .unwrap_or(0);

        let claims = Claims {
            sub: user_id.to_string(),
            user_id,
            role,
            exp: now + 24 * 60 * 60,
            iat: now,
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &self.decoding_key, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
    }

    pub fn extract_token_from_header(auth_header: &str) -> Option<&str> {
        auth_header.strip_prefix("Bearer ")
    }
}

/// Rejects requests without a valid session token before any messaging
/// operation runs; inserts [`Claims`] into the request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let jwt_service = JwtService::new(&state.jwt_secret);

    // Cookie first, then the Authorization header for API clients
    let cookie_jar = CookieJar::from_headers(request.headers());
    let token = match cookie_jar.get(AUTH_COOKIE) {
        Some(cookie) => Some(cookie.value().to_string()),
        None => request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(JwtService::extract_token_from_header)
            .map(str::to_string),
    };

    let token = token.ok_or(AppError::Unauthorized)?;
    let claims = jwt_service.validate_token(&token)?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}
