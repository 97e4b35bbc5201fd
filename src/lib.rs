pub mod catalog;
pub mod checkout;
pub mod config;
pub mod entities;
pub mod middleware;
pub mod routes;

use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::middleware::auth::AuthKeys;

/// Full application router, ready to be served.
pub fn app(db: Arc<DatabaseConnection>, keys: Arc<AuthKeys>) -> Router {
    routes::api_router(db, keys)
}
