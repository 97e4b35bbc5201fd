pub mod auth_routes;
pub mod awareness_routes;
pub mod checkout_routes;
pub mod order_routes;
pub mod product_routes;
pub mod profile_routes;
pub mod seller_routes;

use axum::{middleware, routing::get, Extension, Json, Router};
use sea_orm::DatabaseConnection;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::middleware::{auth::AuthKeys, logging::logging_middleware};
use {
    auth_routes::{auth_routes, session_routes},
    awareness_routes::awareness_routes,
    checkout_routes::checkout_routes,
    order_routes::{admin_order_routes, order_routes},
    product_routes::{product_routes, seller_product_routes},
    profile_routes::profile_routes,
    seller_routes::seller_routes,
};

pub fn api_router(db: Arc<DatabaseConnection>, keys: Arc<AuthKeys>) -> Router {
    let api = Router::new()
        .merge(auth_routes())
        .merge(session_routes())
        .merge(product_routes())
        .merge(awareness_routes())
        .merge(checkout_routes())
        .merge(order_routes())
        .merge(profile_routes())
        .merge(seller_routes())
        .merge(seller_product_routes())
        .merge(admin_order_routes());

    //Extensions sit outermost so the auth gates can read them.
    Router::new()
        .route("/", get(health))
        .nest("/api", api)
        .layer(middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(keys))
        .layer(Extension(db))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
