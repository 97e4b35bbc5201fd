use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    middleware,
    response::Response,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use serde_json::json;
use std::borrow::Cow;
use std::sync::Arc;
use validator::{Validate, ValidationError};

use crate::catalog::{categories, ListingFilter};
use crate::checkout::is_whole_cents;
use crate::entities::{
    order,
    product::{self, Entity as ProductEntity, MARINE_CATEGORIES},
    user_role::Role,
};
use crate::middleware::{
    auth::{auth_middleware, Claims, Gate},
    logging::{error_response, internal_error, redirect_error, to_response, ApiError},
};

//ROUTERS
pub fn product_routes() -> Router {
    Router::new()
        .route("/products", get(get_products))
        .route("/products/categories", get(get_categories))
        .route("/products/:id", get(get_product))
}

pub fn seller_product_routes() -> Router {
    Router::new()
        .route(
            "/seller/products",
            get(seller_get_products).post(create_product),
        )
        .route(
            "/seller/products/:id",
            get(seller_get_product)
                .patch(patch_product)
                .delete(delete_product),
        )
        .layer(middleware::from_fn_with_state(
            Gate::Role(Role::Seller),
            auth_middleware,
        ))
}

//ROUTES
async fn get_products(
    Query(filter): Query<ListingFilter>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Response {
    match active_products(&db).await {
        Ok(products) => to_response(Json(filter.apply(products)), Ok(())),
        Err(err) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to load products",
            ApiError::DbError(err.to_string()),
        ),
    }
}

async fn get_categories(Extension(db): Extension<Arc<DatabaseConnection>>) -> Response {
    match active_products(&db).await {
        Ok(products) => to_response(Json(categories(&products)), Ok(())),
        Err(err) => internal_error(ApiError::DbError(err.to_string())),
    }
}

async fn get_product(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Response {
    let result = ProductEntity::find_by_id(id)
        .filter(product::Column::IsActive.eq(true))
        .one(&*db)
        .await;

    match result {
        Ok(Some(prod)) => to_response(Json(prod), Ok(())),
        Ok(None) => redirect_error(
            StatusCode::NOT_FOUND,
            "Product not found",
            "/products",
            ApiError::General(format!("No product with {} id was found.", id)),
        ),
        Err(err) => internal_error(ApiError::DbError(err.to_string())),
    }
}

async fn seller_get_products(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
) -> Response {
    match ProductEntity::find()
        .filter(product::Column::SellerId.eq(claims.user_id))
        .order_by_desc(product::Column::CreatedAt)
        .order_by_desc(product::Column::Id)
        .all(&*db)
        .await
    {
        Ok(products) => to_response(Json(products), Ok(())),
        Err(err) => internal_error(ApiError::DbError(err.to_string())),
    }
}

async fn seller_get_product(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
) -> Response {
    match owned_product(&*db, id, claims.user_id).await {
        Ok(Some(prod)) => to_response(Json(prod), Ok(())),
        Ok(None) => product_not_owned(id),
        Err(err) => internal_error(ApiError::DbError(err.to_string())),
    }
}

async fn create_product(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateProduct>,
) -> Response {
    if let Err(err) = payload.validate() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Invalid product details",
            ApiError::ValidationFail(err.to_string()),
        );
    }
    if !is_whole_cents(payload.price) {
        return price_not_in_cents();
    }

    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(ApiError::TransactionCreationFailed),
    };

    let new_product = product::ActiveModel {
        name: Set(payload.name.trim().to_owned()),
        category: Set(payload.category),
        price: Set(payload.price),
        quantity: Set(payload.quantity),
        image_url: Set(blank_to_none(payload.image_url)),
        description: Set(blank_to_none(payload.description)),
        hygiene_notes: Set(blank_to_none(payload.hygiene_notes)),
        seller_id: Set(claims.user_id),
        is_active: Set(payload.is_active.unwrap_or(true)),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    match new_product.insert(&txn).await {
        Ok(model) => match txn.commit().await {
            Ok(_) => to_response(
                (
                    StatusCode::CREATED,
                    Json(json!({
                        "message": "Product created successfully",
                        "product": model
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
                err.to_string(),
                ApiError::DbError(err.to_string()),
            )
        }
    }
}

async fn patch_product(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<PatchProduct>,
) -> Response {
    if let Err(err) = payload.validate() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Invalid product details",
            ApiError::ValidationFail(err.to_string()),
        );
    }
    if payload.price.is_some_and(|price| !is_whole_cents(price)) {
        return price_not_in_cents();
    }

    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(ApiError::TransactionCreationFailed),
    };

    let product = match owned_product(&txn, id, claims.user_id).await {
        Ok(Some(product)) => product,
        Ok(None) => return product_not_owned(id),
        Err(err) => return internal_error(ApiError::DbError(err.to_string())),
    };

    let mut product: product::ActiveModel = product.into();

    if let Some(name) = payload.name {
        product.name = Set(name.trim().to_owned());
    }
    if let Some(category) = payload.category {
        product.category = Set(category);
    }
    if let Some(price) = payload.price {
        product.price = Set(price);
    }
    if let Some(quantity) = payload.quantity {
        product.quantity = Set(quantity);
    }
    //Blank strings clear the optional text fields.
    if let Some(image_url) = payload.image_url {
        product.image_url = Set(blank_to_none(Some(image_url)));
    }
    if let Some(description) = payload.description {
        product.description = Set(blank_to_none(Some(description)));
    }
    if let Some(hygiene_notes) = payload.hygiene_notes {
        product.hygiene_notes = Set(blank_to_none(Some(hygiene_notes)));
    }
    if let Some(is_active) = payload.is_active {
        product.is_active = Set(is_active);
    }

    match product.update(&txn).await {
        Ok(model) => match txn.commit().await {
            Ok(_) => to_response(
                (
                    StatusCode::OK,
                    Json(json!({
                        "message": "Product updated successfully",
                        "product": model
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

async fn delete_product(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
) -> Response {
    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(ApiError::TransactionCreationFailed),
    };

    let product = match owned_product(&txn, id, claims.user_id).await {
        Ok(Some(product)) => product,
        Ok(None) => return product_not_owned(id),
        Err(err) => return internal_error(ApiError::DbError(err.to_string())),
    };

    //Orders keep pointing at the product, so it can only be hidden once sold.
    match order::Entity::find()
        .filter(order::Column::ProductId.eq(product.id))
        .count(&txn)
        .await
    {
        Ok(0) => {}
        Ok(_) => {
            let _ = txn.rollback().await;
            let tmp = "Product has orders and cannot be deleted; deactivate it instead";
            return error_response(StatusCode::CONFLICT, tmp, ApiError::General(tmp.to_owned()));
        }
        Err(err) => return internal_error(ApiError::DbError(err.to_string())),
    }

    let product: product::ActiveModel = product.into();
    match product.delete(&txn).await {
        Ok(_) => match txn.commit().await {
            Ok(_) => to_response(
                (
                    StatusCode::OK,
                    Json(json!({
                        "message": "Resource deleted successfully."
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
                "Failed to delete this resource",
                ApiError::DbError(err.to_string()),
            )
        }
    }
}

//utilities
async fn active_products(db: &DatabaseConnection) -> Result<Vec<product::Model>, sea_orm::DbErr> {
    ProductEntity::find()
        .filter(product::Column::IsActive.eq(true))
        .order_by_desc(product::Column::CreatedAt)
        .order_by_desc(product::Column::Id)
        .all(db)
        .await
}

async fn owned_product<C: sea_orm::ConnectionTrait>(
    conn: &C,
    id: i32,
    seller_id: i32,
) -> Result<Option<product::Model>, sea_orm::DbErr> {
    ProductEntity::find_by_id(id)
        .filter(product::Column::SellerId.eq(seller_id))
        .one(conn)
        .await
}

fn product_not_owned(id: i32) -> Response {
    let tmp = format!("No product with {} id was found.", id);
    redirect_error(
        StatusCode::NOT_FOUND,
        tmp.clone(),
        "/seller/dashboard",
        ApiError::General(tmp),
    )
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    match name.trim().chars().count() {
        0 => Err(ValidationError::new("name").with_message(Cow::Borrowed("Name is required"))),
        len if len > 200 => {
            Err(ValidationError::new("name").with_message(Cow::Borrowed("Name is too long")))
        }
        _ => Ok(()),
    }
}

fn price_not_in_cents() -> Response {
    let tmp = "Price must have at most two decimals";
    error_response(
        StatusCode::BAD_REQUEST,
        tmp,
        ApiError::ValidationFail(tmp.to_owned()),
    )
}

fn validate_category(category: &str) -> Result<(), ValidationError> {
    if MARINE_CATEGORIES.contains(&category) {
        Ok(())
    } else {
        Err(ValidationError::new("category")
            .with_message(Cow::Owned(format!("Unknown category: {category}"))))
    }
}

//structs
#[derive(Deserialize, Validate, Debug)]
struct CreateProduct {
    #[validate(custom(function = "validate_name"))]
    name: String,
    #[validate(custom(function = "validate_category"))]
    category: String,
    #[validate(range(min = 0.0))]
    price: f64,
    #[validate(range(min = 0))]
    quantity: i32,
    description: Option<String>,
    hygiene_notes: Option<String>,
    image_url: Option<String>,
    is_active: Option<bool>,
}

#[derive(Deserialize, Validate, Debug)]
struct PatchProduct {
    #[validate(custom(function = "validate_name"))]
    name: Option<String>,
    #[validate(custom(function = "validate_category"))]
    category: Option<String>,
    #[validate(range(min = 0.0))]
    price: Option<f64>,
    #[validate(range(min = 0))]
    quantity: Option<i32>,
    description: Option<String>,
    hygiene_notes: Option<String>,
    image_url: Option<String>,
    is_active: Option<bool>,
}
