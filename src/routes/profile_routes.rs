use axum::{
    extract::Extension, http::StatusCode, middleware, response::Response, routing::get, Json,
    Router,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect, Set,
    TransactionTrait,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::entities::{
    order,
    product,
    profile::{ActiveModel, Entity as ProfileEntity},
    user_role::Role,
};
use crate::middleware::{
    auth::{auth_middleware, Claims, Gate},
    logging::{error_response, internal_error, to_response, ApiError},
};
use crate::routes::order_routes::{sum_totals, with_product_names, OrderResponse};

const ACTIVITY_LIMIT: u64 = 10;

pub fn profile_routes() -> Router {
    Router::new()
        .route("/profile", get(get_profile).patch(patch_profile))
        .route("/profile/activity", get(get_activity))
        .layer(middleware::from_fn_with_state(
            Gate::Authenticated,
            auth_middleware,
        ))
}

async fn get_profile(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
) -> Response {
    match ProfileEntity::find_by_id(claims.user_id).one(&*db).await {
        Ok(Some(model)) => to_response(
            (
                StatusCode::OK,
                Json(json!({
                    "profile": model,
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
        Err(err) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to load profile",
            ApiError::DbError(err.to_string()),
        ),
    }
}

async fn patch_profile(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<PatchProfile>,
) -> Response {
    if let Err(err) = payload.validate() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Invalid profile details",
            ApiError::ValidationFail(err.to_string()),
        );
    }

    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(ApiError::TransactionCreationFailed),
    };

    //Email is owned by the account, only name and phone are editable here.
    let model = match ProfileEntity::find_by_id(claims.user_id).one(&txn).await {
        Ok(Some(model)) => model,
        Ok(None) => {
            return error_response(
                StatusCode::NOT_FOUND,
                "Not found",
                ApiError::General(format!("No profile for user {}", claims.user_id)),
            )
        }
        Err(err) => return internal_error(ApiError::DbError(err.to_string())),
    };

    let mut model: ActiveModel = model.into();
    if let Some(full_name) = payload.full_name {
        model.full_name = Set(Some(full_name.trim().to_owned()).filter(|v| !v.is_empty()));
    }
    if let Some(phone) = payload.phone {
        model.phone = Set(Some(phone.trim().to_owned()).filter(|v| !v.is_empty()));
    }
    model.updated_at = Set(Utc::now());

    match model.update(&txn).await {
        Ok(updated) => match txn.commit().await {
            Ok(_) => to_response(
                (
                    StatusCode::OK,
                    Json(json!({
                        "message": "Profile updated successfully",
                        "profile": updated
                    })),
                ),
                Ok(()),
            ),
            Err(err) => internal_error(ApiError::DbError(err.to_string())),
        },
        Err(err) => {
            let _ = txn.rollback().await;
            error_response(
                StatusCode::BAD_REQUEST,
                "Failed to update profile",
                ApiError::DbError(err.to_string()),
            )
        }
    }
}

/// Recent orders the caller took part in. Buyers see what they bought,
/// sellers what was bought from them; the total is summed over the rows shown.
async fn get_activity(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
) -> Response {
    let activities: Result<Vec<OrderResponse>, sea_orm::DbErr> = match claims.role {
        Role::Buyer => {
            let query = order::Entity::find().filter(order::Column::BuyerId.eq(claims.user_id));
            with_product_names(&db, query, Some(ACTIVITY_LIMIT)).await
        }
        Role::Seller => match product::Entity::find()
            .select_only()
            .column(product::Column::Id)
            .filter(product::Column::SellerId.eq(claims.user_id))
            .into_tuple::<i32>()
            .all(&*db)
            .await
        {
            Ok(ids) if ids.is_empty() => Ok(vec![]),
            Ok(ids) => {
                let query = order::Entity::find().filter(order::Column::ProductId.is_in(ids));
                with_product_names(&db, query, Some(ACTIVITY_LIMIT)).await
            }
            Err(err) => Err(err),
        },
        Role::Admin => Ok(vec![]),
    };

    match activities {
        Ok(activities) => to_response(
            (
                StatusCode::OK,
                Json(json!({
                    "total_orders": activities.len(),
                    "total_amount": sum_totals(&activities),
                    "activities": activities
                })),
            ),
            Ok(()),
        ),
        Err(err) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to load activity history",
            ApiError::DbError(err.to_string()),
        ),
    }
}

#[derive(Deserialize, Validate)]
struct PatchProfile {
    #[validate(length(max = 100))]
    full_name: Option<String>,
    #[validate(length(max = 20))]
    phone: Option<String>,
}
