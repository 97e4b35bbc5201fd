use axum::{
    extract::{rejection::QueryRejection, Extension, Path, Query},
    http::StatusCode,
    middleware,
    response::Response,
    routing::get,
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
use tracing::info;

use crate::checkout::{format_amount, order_total, requested_quantity, DeliveryDetails};
use crate::entities::{
    order::{self, PaymentMethod, Status},
    product::{self, Entity as ProductEntity},
    user_role::Role,
};
use crate::middleware::{
    auth::{auth_middleware, Claims, Gate},
    logging::{error_response, internal_error, redirect_error, to_response, ApiError},
};

//ROUTERS
pub fn checkout_routes() -> Router {
    Router::new()
        .route("/checkout/:id", get(checkout_summary).post(place_order))
        .layer(middleware::from_fn_with_state(
            Gate::Role(Role::Buyer),
            auth_middleware,
        ))
}

//ROUTES
async fn checkout_summary(
    Path(id): Path<i32>,
    query: Result<Query<CheckoutQuery>, QueryRejection>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Response {
    let quantity = match quantity_from(query) {
        Ok(quantity) => quantity,
        Err(response) => return response,
    };

    match purchasable(&*db, id).await {
        Ok(Some(product)) => {
            let total = order_total(product.price, quantity);
            to_response(
                (
                    StatusCode::OK,
                    Json(json!({
                        "product": {
                            "id": product.id,
                            "name": product.name,
                            "price": product.price,
                            "image_url": product.image_url
                        },
                        "quantity": quantity,
                        "in_stock": product.in_stock(),
                        "total": total,
                        "total_display": format_amount(total),
                        "payment_method": PaymentMethod::CashOnDelivery
                    })),
                ),
                Ok(()),
            )
        }
        Ok(None) => product_missing(id),
        Err(err) => internal_error(ApiError::DbError(err.to_string())),
    }
}

async fn place_order(
    Path(id): Path<i32>,
    query: Result<Query<CheckoutQuery>, QueryRejection>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<DeliveryDetails>,
) -> Response {
    let quantity = match quantity_from(query) {
        Ok(quantity) => quantity,
        Err(response) => return response,
    };

    //Nothing touches the store until the form is valid.
    let details = match payload.into_valid() {
        Ok(details) => details,
        Err(tmp) => {
            return error_response(StatusCode::BAD_REQUEST, tmp.clone(), ApiError::ValidationFail(tmp))
        }
    };

    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(ApiError::TransactionCreationFailed),
    };

    let product = match purchasable(&txn, id).await {
        Ok(Some(product)) => product,
        Ok(None) => return product_missing(id),
        Err(err) => return internal_error(ApiError::DbError(err.to_string())),
    };

    if !product.in_stock() {
        let _ = txn.rollback().await;
        let tmp = "Product is out of stock";
        return error_response(StatusCode::CONFLICT, tmp, ApiError::General(tmp.to_owned()));
    }

    let idempotency_key = details.idempotency_key.map(|key| key.to_string());
    if let Some(key) = &idempotency_key {
        match order::Entity::find()
            .filter(order::Column::BuyerId.eq(claims.user_id))
            .filter(order::Column::IdempotencyKey.eq(key.as_str()))
            .one(&txn)
            .await
        {
            Ok(Some(existing)) => {
                let _ = txn.rollback().await;
                return already_placed(existing);
            }
            Ok(None) => {}
            Err(err) => return internal_error(ApiError::DbError(err.to_string())),
        }
    }

    //Priced from the row read in this transaction, never from the client.
    let total = order_total(product.price, quantity);
    let new_order = order::ActiveModel {
        buyer_id: Set(claims.user_id),
        product_id: Set(product.id),
        quantity: Set(quantity),
        total_price: Set(total),
        buyer_name: Set(details.name),
        buyer_phone: Set(details.phone),
        delivery_address: Set(details.address),
        payment_method: Set(PaymentMethod::CashOnDelivery),
        order_status: Set(Status::Pending),
        idempotency_key: Set(idempotency_key.clone()),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    let placed = match new_order.insert(&txn).await {
        Ok(placed) => placed,
        Err(err) => {
            let _ = txn.rollback().await;
            //A concurrent submission with the same key won the unique index.
            if let Some(key) = &idempotency_key {
                if let Ok(Some(existing)) = order::Entity::find()
                    .filter(order::Column::BuyerId.eq(claims.user_id))
                    .filter(order::Column::IdempotencyKey.eq(key.as_str()))
                    .one(&*db)
                    .await
                {
                    return already_placed(existing);
                }
            }
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                err.to_string(),
                ApiError::DbError(err.to_string()),
            );
        }
    };

    match txn.commit().await {
        Ok(_) => {
            info!(
                order_id = placed.id,
                buyer_id = placed.buyer_id,
                product_id = placed.product_id,
                quantity = placed.quantity,
                total = placed.total_price,
                "Order placed"
            );
            to_response(
                (
                    StatusCode::CREATED,
                    Json(json!({
                        "message": "Your order has been placed successfully. You'll pay on delivery.",
                        "total_display": format_amount(placed.total_price),
                        "order": placed,
                        "redirect": "/orders"
                    })),
                ),
                Ok(()),
            )
        }
        Err(err) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            err.to_string(),
            ApiError::DbError(err.to_string()),
        ),
    }
}

//utilities
fn quantity_from(query: Result<Query<CheckoutQuery>, QueryRejection>) -> Result<i32, Response> {
    let raw = match query {
        Ok(Query(query)) => query.quantity,
        Err(rejection) => {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                "Quantity must be a whole number",
                ApiError::ValidationFail(rejection.body_text()),
            ))
        }
    };
    requested_quantity(raw).map_err(|tmp| {
        error_response(StatusCode::BAD_REQUEST, tmp.clone(), ApiError::ValidationFail(tmp))
    })
}

async fn purchasable<C: sea_orm::ConnectionTrait>(
    conn: &C,
    id: i32,
) -> Result<Option<product::Model>, sea_orm::DbErr> {
    ProductEntity::find_by_id(id)
        .filter(product::Column::IsActive.eq(true))
        .one(conn)
        .await
}

fn already_placed(existing: order::Model) -> Response {
    to_response(
        (
            StatusCode::OK,
            Json(json!({
                "message": "Order already placed",
                "order": existing,
                "total_display": format_amount(existing.total_price),
                "redirect": "/orders"
            })),
        ),
        Ok(()),
    )
}

fn product_missing(id: i32) -> Response {
    redirect_error(
        StatusCode::NOT_FOUND,
        "Product not found",
        "/products",
        ApiError::General(format!("No product with {} id was found.", id)),
    )
}

//structs
#[derive(Deserialize)]
struct CheckoutQuery {
    quantity: Option<i32>,
}
