use axum::{
    extract::Extension,
    http::StatusCode,
    middleware,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{
    profile,
    session::{self, Entity as SessionEntity},
    user::{self, Entity as UserEntity},
    user_role::{self, Entity as UserRoleEntity, Role},
};
use crate::middleware::{
    auth::{auth_middleware, generate_token, hash_password, AuthKeys, Claims, Gate},
    logging::{error_response, internal_error, to_response, ApiError},
};

//ROUTERS
pub fn auth_routes() -> Router {
    Router::new()
        .route("/auth/signup", post(sign_up))
        .route("/auth/signin", post(sign_in))
}

pub fn session_routes() -> Router {
    Router::new()
        .route("/auth/session", get(current_session))
        .route("/auth/signout", post(sign_out))
        .layer(middleware::from_fn_with_state(
            Gate::Authenticated,
            auth_middleware,
        ))
}

//ROUTES
async fn sign_up(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<SignUp>,
) -> Response {
    if let Err(err) = payload.validate() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Invalid email, password or name",
            ApiError::ValidationFail(err.to_string()),
        );
    }

    let role = payload.role.unwrap_or(Role::Buyer);
    if role == Role::Admin {
        let tmp = "Admin accounts cannot be self-registered";
        return error_response(StatusCode::FORBIDDEN, tmp, ApiError::General(tmp.to_owned()));
    }

    let password = match hash_password(&payload.password) {
        Ok(password) => password,
        Err(err) => return internal_error(ApiError::PasswordHashFailed(err.to_string())),
    };

    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(ApiError::TransactionCreationFailed),
    };

    let email = payload.email.trim().to_lowercase();
    match UserEntity::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .one(&txn)
        .await
    {
        Ok(None) => {}
        Ok(Some(_)) => {
            let _ = txn.rollback().await;
            let tmp = "An account with this email already exists";
            return error_response(StatusCode::CONFLICT, tmp, ApiError::General(tmp.to_owned()));
        }
        Err(err) => return internal_error(ApiError::DbError(err.to_string())),
    }

    let now = Utc::now();
    let new_user = user::ActiveModel {
        email: Set(email.clone()),
        password: Set(password),
        created_at: Set(now),
        ..Default::default()
    };
    let user_id = match UserEntity::insert(new_user).exec(&txn).await {
        Ok(inserted) => inserted.last_insert_id,
        Err(err) => {
            let _ = txn.rollback().await;
            return internal_error(ApiError::DbError(err.to_string()));
        }
    };

    let full_name = payload.full_name.trim().to_owned();
    let new_profile = profile::ActiveModel {
        id: Set(user_id),
        email: Set(email),
        full_name: Set(Some(full_name).filter(|n| !n.is_empty())),
        phone: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let new_role = user_role::ActiveModel {
        user_id: Set(user_id),
        role: Set(role),
        created_at: Set(now),
        ..Default::default()
    };

    let result = match profile::Entity::insert(new_profile).exec(&txn).await {
        Ok(_) => UserRoleEntity::insert(new_role).exec(&txn).await.map(|_| ()),
        Err(err) => Err(err),
    };
    if let Err(err) = result {
        let _ = txn.rollback().await;
        return internal_error(ApiError::DbError(err.to_string()));
    }

    match txn.commit().await {
        Ok(_) => to_response(
            (
                StatusCode::CREATED,
                Json(json!({
                    "message": "User registered successfully",
                    "user_id": user_id,
                    "role": role
                })),
            ),
            Ok(()),
        ),
        Err(err) => internal_error(ApiError::DbError(err.to_string())),
    }
}

async fn sign_in(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(keys): Extension<Arc<AuthKeys>>,
    Json(payload): Json<SignIn>,
) -> Response {
    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(ApiError::TransactionCreationFailed),
    };

    let email = payload.email.trim().to_lowercase();
    let model = match UserEntity::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .one(&txn)
        .await
    {
        Ok(Some(model)) => model,
        Ok(None) => return invalid_credentials(),
        Err(err) => return internal_error(ApiError::DbError(err.to_string())),
    };

    if model.check_hash(&payload.password).is_err() {
        return invalid_credentials();
    }

    let role = match UserRoleEntity::find()
        .filter(user_role::Column::UserId.eq(model.id))
        .one(&txn)
        .await
    {
        Ok(Some(assignment)) => assignment.role,
        Ok(None) => {
            let tmp = "Account has no role assigned";
            return error_response(StatusCode::FORBIDDEN, tmp, ApiError::General(tmp.to_owned()));
        }
        Err(err) => return internal_error(ApiError::DbError(err.to_string())),
    };

    let sid = Uuid::new_v4().to_string();
    let new_session = session::ActiveModel {
        id: Set(sid.clone()),
        user_id: Set(model.id),
        expires_at: Set(Utc::now() + keys.ttl()),
    };
    if let Err(err) = new_session.insert(&txn).await {
        let _ = txn.rollback().await;
        return internal_error(ApiError::DbError(err.to_string()));
    }

    let token = match generate_token(&keys, model.id, role, sid) {
        Ok(token) => token,
        Err(err) => {
            let _ = txn.rollback().await;
            return internal_error(ApiError::TokenGenerationFailed(err.to_string()));
        }
    };

    match txn.commit().await {
        Ok(_) => to_response(
            (
                StatusCode::OK,
                Json(json!({
                    "token": token,
                    "role": role,
                    "redirect": role.landing_page()
                })),
            ),
            Ok(()),
        ),
        Err(err) => internal_error(ApiError::DbError(err.to_string())),
    }
}

async fn current_session(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
) -> Response {
    match profile::Entity::find_by_id(claims.user_id).one(&*db).await {
        Ok(Some(profile)) => to_response(
            (
                StatusCode::OK,
                Json(json!({
                    "user_id": claims.user_id,
                    "email": profile.email,
                    "full_name": profile.full_name,
                    "role": claims.role
                })),
            ),
            Ok(()),
        ),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            "Not found",
            ApiError::General(format!("No profile for user {}", claims.user_id)),
        ),
        Err(err) => internal_error(ApiError::DbError(err.to_string())),
    }
}

async fn sign_out(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
) -> Response {
    match SessionEntity::delete_by_id(claims.sid.clone())
        .exec(&*db)
        .await
    {
        Ok(_) => to_response(
            (
                StatusCode::OK,
                Json(json!({
                    "message": "Signed out",
                    "redirect": "/"
                })),
            ),
            Ok(()),
        ),
        Err(err) => internal_error(ApiError::DbError(err.to_string())),
    }
}

//utilities
fn invalid_credentials() -> Response {
    let tmp = "Invalid email or password";
    error_response(StatusCode::UNAUTHORIZED, tmp, ApiError::General(tmp.to_owned()))
}

//structs
#[derive(Deserialize, Validate)]
struct SignUp {
    #[validate(email)]
    email: String,
    #[validate(length(min = 6, max = 128))]
    password: String,
    #[validate(length(max = 100))]
    full_name: String,
    role: Option<Role>,
}

#[derive(Deserialize)]
struct SignIn {
    email: String,
    password: String,
}
