mod common;

use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{delivery, json_body, product, spawn_app, TestApp};

async fn listing(app: &TestApp, query: &str) -> Vec<Value> {
    let response = app
        .client
        .get(app.url(&format!("/api/products{query}")))
        .send()
        .await
        .expect("Failed to send get products request");
    assert_eq!(response.status(), StatusCode::OK);
    json_body(response)
        .await
        .as_array()
        .cloned()
        .expect("Listing should be an array")
}

fn names(products: &[Value]) -> Vec<&str> {
    products
        .iter()
        .map(|p| p["name"].as_str().expect("name"))
        .collect()
}

#[tokio::test]
async fn test_search_is_case_insensitive() {
    let app = spawn_app().await;
    let seller = app.user("seller@harbour.in", "seller").await;
    app.create_product(&seller, product("salmon fillet", "Fresh Fish", 250.0, 4))
        .await;
    app.create_product(&seller, product("Tiger Prawns", "Crustaceans", 480.0, 4))
        .await;

    let found = listing(&app, "?search=SALMON").await;
    assert_eq!(names(&found), vec!["salmon fillet"]);
}

#[tokio::test]
async fn test_category_filter_and_empty_category() {
    let app = spawn_app().await;
    let seller = app.user("seller@harbour.in", "seller").await;
    app.create_product(&seller, product("Salmon", "Fresh Fish", 250.0, 4))
        .await;
    app.create_product(&seller, product("Prawns", "Crustaceans", 480.0, 4))
        .await;

    let found = listing(&app, "?category=Crustaceans").await;
    assert_eq!(names(&found), vec!["Prawns"]);

    assert!(listing(&app, "?category=Canned%20Seafood").await.is_empty());
    assert_eq!(listing(&app, "?category=all").await.len(), 2);
}

#[tokio::test]
async fn test_listing_is_newest_first_and_hides_inactive() {
    let app = spawn_app().await;
    let seller = app.user("seller@harbour.in", "seller").await;
    app.create_product(&seller, product("Older", "Fresh Fish", 10.0, 4))
        .await;
    let hidden = app
        .create_product(&seller, product("Hidden", "Fresh Fish", 10.0, 4))
        .await;
    app.create_product(&seller, product("Newer", "Fresh Fish", 10.0, 0))
        .await;

    let response = app
        .patch(&format!("/api/seller/products/{hidden}"), &seller)
        .json(&json!({ "is_active": false }))
        .send()
        .await
        .expect("Failed to send patch request");
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(names(&listing(&app, "").await), vec!["Newer", "Older"]);

    let response = app
        .client
        .get(app.url(&format!("/api/products/{hidden}")))
        .send()
        .await
        .expect("Failed to send get product request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["redirect"], "/products");
}

#[tokio::test]
async fn test_categories_endpoint() {
    let app = spawn_app().await;
    let seller = app.user("seller@harbour.in", "seller").await;
    app.create_product(&seller, product("Salmon", "Fresh Fish", 250.0, 4))
        .await;
    app.create_product(&seller, product("Cod", "Fresh Fish", 200.0, 4))
        .await;
    app.create_product(&seller, product("Net", "Fishing Gear", 900.0, 1))
        .await;

    let response = app
        .client
        .get(app.url("/api/products/categories"))
        .send()
        .await
        .expect("Failed to send categories request");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!(["Fishing Gear", "Fresh Fish"])
    );
}

#[tokio::test]
async fn test_get_product_detail() {
    let app = spawn_app().await;
    let seller = app.user("seller@harbour.in", "seller").await;
    let id = app
        .create_product(&seller, product("Salmon", "Fresh Fish", 250.0, 4))
        .await;

    let response = app
        .client
        .get(app.url(&format!("/api/products/{id}")))
        .send()
        .await
        .expect("Failed to send get product request");

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["name"], "Salmon");
    assert_eq!(body["hygiene_notes"], "Kept on ice");
    assert!(body["image_url"].is_null());
}

#[tokio::test]
async fn test_invalid_product_payloads_are_rejected() {
    let app = spawn_app().await;
    let seller = app.user("seller@harbour.in", "seller").await;

    for payload in [
        product("Salmon", "Spaceships", 250.0, 4),
        product("Salmon", "Fresh Fish", -1.0, 4),
        product("Salmon", "Fresh Fish", 1.0, -4),
        product("", "Fresh Fish", 1.0, 4),
    ] {
        let response = app
            .post("/api/seller/products", &seller)
            .json(&payload)
            .send()
            .await
            .expect("Failed to send create product request");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{payload}");
    }
}

#[tokio::test]
async fn test_buyer_cannot_create_products() {
    let app = spawn_app().await;
    let buyer = app.user("buyer@coast.in", "buyer").await;

    let response = app
        .post("/api/seller/products", &buyer)
        .json(&product("Salmon", "Fresh Fish", 250.0, 4))
        .send()
        .await
        .expect("Failed to send create product request");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["redirect"], "/auth?role=seller");
}

#[tokio::test]
async fn test_sellers_only_touch_their_own_products() {
    let app = spawn_app().await;
    let owner = app.user("owner@harbour.in", "seller").await;
    let rival = app.user("rival@harbour.in", "seller").await;
    let id = app
        .create_product(&owner, product("Salmon", "Fresh Fish", 250.0, 4))
        .await;

    let response = app
        .patch(&format!("/api/seller/products/{id}"), &rival)
        .json(&json!({ "price": 1.0 }))
        .send()
        .await
        .expect("Failed to send patch request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .delete(&format!("/api/seller/products/{id}"), &rival)
        .send()
        .await
        .expect("Failed to send delete request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .patch(&format!("/api/seller/products/{id}"), &owner)
        .json(&json!({ "price": 275.5, "description": "" }))
        .send()
        .await
        .expect("Failed to send patch request");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["product"]["price"].as_f64(), Some(275.5));
    assert!(body["product"]["description"].is_null());
}

#[tokio::test]
async fn test_delete_product() {
    let app = spawn_app().await;
    let seller = app.user("seller@harbour.in", "seller").await;
    let buyer = app.user("buyer@coast.in", "buyer").await;
    let unsold = app
        .create_product(&seller, product("Salmon", "Fresh Fish", 250.0, 4))
        .await;
    let sold = app
        .create_product(&seller, product("Prawns", "Crustaceans", 480.0, 4))
        .await;

    let response = app
        .post(&format!("/api/checkout/{sold}"), &buyer)
        .json(&delivery("Asha Menon", "9876543210", "12 Harbour Road"))
        .send()
        .await
        .expect("Failed to send checkout request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .delete(&format!("/api/seller/products/{sold}"), &seller)
        .send()
        .await
        .expect("Failed to send delete request");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .delete(&format!("/api/seller/products/{unsold}"), &seller)
        .send()
        .await
        .expect("Failed to send delete request");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await["message"],
        "Resource deleted successfully."
    );

    assert_eq!(names(&listing(&app, "").await), vec!["Prawns"]);
}

#[tokio::test]
async fn test_blank_name_is_rejected() {
    let app = spawn_app().await;
    let seller = app.user("seller@harbour.in", "seller").await;

    let response = app
        .post("/api/seller/products", &seller)
        .json(&product("   ", "Fresh Fish", 250.0, 4))
        .send()
        .await
        .expect("Failed to send create product request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let id = app
        .create_product(&seller, product("Salmon", "Fresh Fish", 250.0, 4))
        .await;
    let response = app
        .patch(&format!("/api/seller/products/{id}"), &seller)
        .json(&json!({ "name": "  " }))
        .send()
        .await
        .expect("Failed to send patch request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(names(&listing(&app, "").await), vec!["Salmon"]);
}

#[tokio::test]
async fn test_price_must_be_whole_cents() {
    let app = spawn_app().await;
    let seller = app.user("seller@harbour.in", "seller").await;

    let response = app
        .post("/api/seller/products", &seller)
        .json(&product("Salmon", "Fresh Fish", 19.999, 4))
        .send()
        .await
        .expect("Failed to send create product request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["error"],
        "Price must have at most two decimals"
    );

    let id = app
        .create_product(&seller, product("Salmon", "Fresh Fish", 19.99, 4))
        .await;
    let response = app
        .patch(&format!("/api/seller/products/{id}"), &seller)
        .json(&json!({ "price": 19.999 }))
        .send()
        .await
        .expect("Failed to send patch request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .client
        .get(app.url(&format!("/api/products/{id}")))
        .send()
        .await
        .expect("Failed to send get product request");
    assert_eq!(json_body(response).await["price"].as_f64(), Some(19.99));
}
