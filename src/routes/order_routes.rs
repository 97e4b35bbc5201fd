use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    middleware,
    response::Response,
    routing::{get, patch},
    Json, Router,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Select, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::entities::{
    order::{self, Entity as OrderEntity, Status},
    product,
    user_role::Role,
};
use crate::middleware::{
    auth::{auth_middleware, Claims, Gate},
    logging::{error_response, internal_error, to_response, ApiError},
};

//ROUTERS
pub fn order_routes() -> Router {
    Router::new()
        .route("/orders", get(get_orders))
        .layer(middleware::from_fn_with_state(
            Gate::Role(Role::Buyer),
            auth_middleware,
        ))
}

pub fn admin_order_routes() -> Router {
    Router::new()
        .route("/admin/orders/:id", patch(set_order_status))
        .layer(middleware::from_fn_with_state(
            Gate::Role(Role::Admin),
            auth_middleware,
        ))
}

//ROUTES
async fn get_orders(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
) -> Response {
    let query = OrderEntity::find().filter(order::Column::BuyerId.eq(claims.user_id));
    match with_product_names(&db, query, None).await {
        Ok(orders) => to_response(Json(orders), Ok(())),
        Err(err) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to load orders",
            ApiError::DbError(err.to_string()),
        ),
    }
}

async fn set_order_status(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<PatchStatus>,
) -> Response {
    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(ApiError::TransactionCreationFailed),
    };

    let entry = match OrderEntity::find_by_id(id).one(&txn).await {
        Ok(Some(entry)) => entry,
        Ok(None) => {
            let tmp = format!("No order with {} id was found.", id);
            return error_response(StatusCode::NOT_FOUND, tmp.clone(), ApiError::General(tmp));
        }
        Err(err) => return internal_error(ApiError::DbError(err.to_string())),
    };

    let mut entry: order::ActiveModel = entry.into();
    entry.order_status = Set(payload.status);

    match entry.update(&txn).await {
        Ok(model) => match txn.commit().await {
            Ok(_) => to_response(
                (
                    StatusCode::OK,
                    Json(json!({
                        "message": "Resource patched successfully",
                        "order": model
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
                "Failed to patch this resource",
                ApiError::DbError(err.to_string()),
            )
        }
    }
}

//utilities
/// Runs an order query newest first and joins in the product name.
pub(crate) async fn with_product_names(
    db: &DatabaseConnection,
    query: Select<OrderEntity>,
    limit: Option<u64>,
) -> Result<Vec<OrderResponse>, DbErr> {
    let mut query = query
        .order_by_desc(order::Column::CreatedAt)
        .order_by_desc(order::Column::Id);
    if let Some(limit) = limit {
        query = query.limit(limit);
    }

    let rows = query.find_also_related(product::Entity).all(db).await?;

    Ok(rows
        .into_iter()
        .map(|(order, product)| OrderResponse {
            order,
            product_name: product.map(|p| p.name),
        })
        .collect())
}

pub(crate) fn sum_totals(orders: &[OrderResponse]) -> f64 {
    let sum: f64 = orders.iter().map(|o| o.order.total_price).sum();
    (sum * 100.0).round() / 100.0
}

//structs
#[derive(Serialize, Debug)]
pub(crate) struct OrderResponse {
    #[serde(flatten)]
    pub order: order::Model,
    pub product_name: Option<String>,
}

#[derive(Deserialize)]
struct PatchStatus {
    status: Status,
}
