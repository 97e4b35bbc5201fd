use axum::{extract::Extension, http::StatusCode, response::Response, routing::get, Json, Router};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use std::sync::Arc;

use crate::entities::awareness;
use crate::middleware::logging::{error_response, to_response, ApiError};

pub fn awareness_routes() -> Router {
    Router::new().route("/awareness", get(get_content))
}

async fn get_content(Extension(db): Extension<Arc<DatabaseConnection>>) -> Response {
    match awareness::Entity::find()
        .filter(awareness::Column::IsPublished.eq(true))
        .order_by_desc(awareness::Column::CreatedAt)
        .order_by_desc(awareness::Column::Id)
        .all(&*db)
        .await
    {
        Ok(content) => to_response(Json(content), Ok(())),
        Err(err) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to load awareness content",
            ApiError::DbError(err.to_string()),
        ),
    }
}
