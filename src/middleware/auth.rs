use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2,
};
use axum::{
    extract::{Extension, Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
    Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::entities::{
    session::{self, Entity as SessionEntity},
    user_role::{self, Entity as UserRoleEntity, Role},
};
use crate::middleware::logging::{to_response, ApiError};

/// The session context handed to handlers. Built once per request by
/// [`auth_middleware`] and never mutated afterwards.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i32,
    pub role: Role,
    pub sid: String,
    pub exp: usize,
}

/// What a route group requires from the caller.
#[derive(Clone, Copy, Debug)]
pub enum Gate {
    Authenticated,
    Role(Role),
}

impl Gate {
    fn admits(&self, role: Role) -> bool {
        match self {
            Gate::Authenticated => true,
            Gate::Role(required) => *required == role,
        }
    }

    /// Auth entry point the client is sent to when the gate refuses it.
    pub fn redirect(&self) -> String {
        match self {
            Gate::Authenticated => "/auth".to_owned(),
            Gate::Role(role) => format!("/auth?role={role}"),
        }
    }
}

pub struct AuthKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl AuthKeys {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        AuthKeys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

pub async fn auth_middleware(
    State(gate): State<Gate>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(keys): Extension<Arc<AuthKeys>>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    let token = match token {
        Some(token) => token,
        None => {
            return refuse(
                StatusCode::UNAUTHORIZED,
                "Sign in required",
                gate,
                AuthMiddlewareError::MissingToken,
            )
        }
    };

    let claims = match validate_token(&db, &keys, token).await {
        Ok(claims) => claims,
        Err(err @ AuthMiddlewareError::InternalServerError(_)) => {
            return to_response(
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "error": "Internal server error"
                    })),
                ),
                Err(ApiError::General(err.to_string())),
            );
        }
        Err(err) => return refuse(StatusCode::UNAUTHORIZED, "Sign in required", gate, err),
    };

    if !gate.admits(claims.role) {
        return refuse(
            StatusCode::FORBIDDEN,
            "This area is not available for your account",
            gate,
            AuthMiddlewareError::InvalidUserOrRole,
        );
    }

    debug!(user_id = claims.user_id, role = %claims.role, "Request authenticated");
    req.extensions_mut().insert(claims);
    next.run(req).await
}

fn refuse(status: StatusCode, message: &str, gate: Gate, reason: AuthMiddlewareError) -> Response {
    to_response(
        (
            status,
            Json(json!({
                "error": message,
                "redirect": gate.redirect()
            })),
        ),
        Err(ApiError::Unauthorized(reason.to_string())),
    )
}

pub fn generate_token(
    keys: &AuthKeys,
    user_id: i32,
    role: Role,
    sid: String,
) -> Result<String, AuthMiddlewareError> {
    let exp = Utc::now()
        .checked_add_signed(keys.ttl)
        .ok_or(AuthMiddlewareError::GenerationFail)?
        .timestamp() as usize;

    let claims = Claims {
        user_id,
        role,
        sid,
        exp,
    };

    encode(&Header::default(), &claims, &keys.encoding)
        .map_err(|_| AuthMiddlewareError::GenerationFail)
}

/// Checks the signature and expiry, then that the session is still open and
/// the role in the token is still the one on record.
pub async fn validate_token(
    db: &DatabaseConnection,
    keys: &AuthKeys,
    token: &str,
) -> Result<Claims, AuthMiddlewareError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let claims = decode::<Claims>(token, &keys.decoding, &validation)
        .map_err(|_| AuthMiddlewareError::TokenExpired)?
        .claims;

    let session = SessionEntity::find_by_id(claims.sid.clone())
        .filter(session::Column::UserId.eq(claims.user_id))
        .one(db)
        .await
        .map_err(|err| AuthMiddlewareError::InternalServerError(err.to_string()))?;
    match session {
        Some(session) if session.expires_at > Utc::now() => {}
        _ => return Err(AuthMiddlewareError::SessionClosed),
    }

    let assignment = UserRoleEntity::find()
        .filter(user_role::Column::UserId.eq(claims.user_id))
        .one(db)
        .await
        .map_err(|err| AuthMiddlewareError::InternalServerError(err.to_string()))?;
    match assignment {
        Some(assignment) if assignment.role == claims.role => Ok(claims),
        _ => Err(AuthMiddlewareError::InvalidUserOrRole),
    }
}

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)?
        .to_string();

    Ok(password_hash)
}

#[derive(Error, Debug)]
pub enum AuthMiddlewareError {
    #[error("Missing bearer token")]
    MissingToken,
    #[error("Invalid user id or role")]
    InvalidUserOrRole,
    #[error("Token expired or malformed")]
    TokenExpired,
    #[error("Session is closed")]
    SessionClosed,
    #[error("Failed to generate token")]
    GenerationFail,
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_redirect_carries_role_hint() {
        assert_eq!(Gate::Role(Role::Buyer).redirect(), "/auth?role=buyer");
        assert_eq!(Gate::Role(Role::Seller).redirect(), "/auth?role=seller");
        assert_eq!(Gate::Authenticated.redirect(), "/auth");
    }

    #[test]
    fn gate_admits_only_matching_role() {
        let gate = Gate::Role(Role::Buyer);
        assert!(gate.admits(Role::Buyer));
        assert!(!gate.admits(Role::Seller));
        assert!(!gate.admits(Role::Admin));
        assert!(Gate::Authenticated.admits(Role::Seller));
    }

    #[test]
    fn token_round_trips_through_keys() {
        let keys = AuthKeys::new("test-secret", 1);
        let token = generate_token(&keys, 7, Role::Seller, "sid-1".to_owned())
            .expect("token should be generated");

        let decoded = decode::<Claims>(&token, &keys.decoding, &Validation::new(Algorithm::HS256))
            .expect("token should decode")
            .claims;
        assert_eq!(decoded.user_id, 7);
        assert_eq!(decoded.role, Role::Seller);
        assert_eq!(decoded.sid, "sid-1");
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let keys = AuthKeys::new("one", 1);
        let other = AuthKeys::new("two", 1);
        let token = generate_token(&keys, 1, Role::Buyer, "sid".to_owned()).expect("token");

        assert!(decode::<Claims>(&token, &other.decoding, &Validation::new(Algorithm::HS256)).is_err());
    }

    #[test]
    fn hashed_password_is_not_plaintext() {
        let hash = hash_password("Secret15").expect("hash");
        assert_ne!(hash, "Secret15");
        assert!(hash.starts_with("$argon2"));
    }
}
