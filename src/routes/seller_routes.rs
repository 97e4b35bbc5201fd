use axum::{
    extract::Extension, http::StatusCode, middleware, response::Response, routing::get, Json,
    Router,
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde_json::json;
use std::sync::Arc;

use crate::entities::{order, product, user_role::Role};
use crate::middleware::{
    auth::{auth_middleware, Claims, Gate},
    logging::{error_response, to_response, ApiError},
};
use crate::routes::order_routes::{sum_totals, with_product_names};

pub fn seller_routes() -> Router {
    Router::new()
        .route("/seller/dashboard", get(get_dashboard))
        .layer(middleware::from_fn_with_state(
            Gate::Role(Role::Seller),
            auth_middleware,
        ))
}

async fn get_dashboard(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
) -> Response {
    let products = match product::Entity::find()
        .filter(product::Column::SellerId.eq(claims.user_id))
        .order_by_desc(product::Column::CreatedAt)
        .order_by_desc(product::Column::Id)
        .all(&*db)
        .await
    {
        Ok(products) => products,
        Err(err) => return dashboard_failed(err),
    };

    let product_ids: Vec<i32> = products.iter().map(|p| p.id).collect();
    let orders = if product_ids.is_empty() {
        vec![]
    } else {
        let query = order::Entity::find().filter(order::Column::ProductId.is_in(product_ids));
        match with_product_names(&db, query, None).await {
            Ok(orders) => orders,
            Err(err) => return dashboard_failed(err),
        }
    };

    to_response(
        (
            StatusCode::OK,
            Json(json!({
                "stats": {
                    "total_products": products.len(),
                    "total_orders": orders.len(),
                    "revenue": sum_totals(&orders)
                },
                "products": products,
                "orders": orders
            })),
        ),
        Ok(()),
    )
}

fn dashboard_failed(err: sea_orm::DbErr) -> Response {
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Failed to load dashboard data",
        ApiError::DbError(err.to_string()),
    )
}
