#![allow(dead_code)]

use reqwest::{header, Client, RequestBuilder, StatusCode};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use marine_market::entities::{seed_demo_data, setup_schema};
use marine_market::middleware::auth::AuthKeys;

pub const PASSWORD: &str = "Muzion15";

pub struct TestApp {
    pub base: String,
    pub client: Client,
}

/// Starts the server on a random port over a fresh in-memory database.
pub async fn spawn_app() -> TestApp {
    spawn(false).await
}

/// Same as [`spawn_app`], with the demo accounts (including the admin) seeded.
pub async fn spawn_seeded_app() -> TestApp {
    spawn(true).await
}

async fn spawn(seed: bool) -> TestApp {
    //One pinned connection: every new sqlite memory connection is a new database.
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(Duration::from_secs(3600))
        .max_lifetime(Duration::from_secs(3600))
        .sqlx_logging(false);

    let db: DatabaseConnection = Database::connect(options)
        .await
        .expect("Failed to open in-memory database");
    setup_schema(&db).await.expect("Failed to create schema");
    if seed {
        seed_demo_data(&db).await.expect("Failed to seed demo data");
    }

    let app = marine_market::app(Arc::new(db), Arc::new(AuthKeys::new("test-secret", 1)));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server crashed");
    });

    TestApp {
        base: format!("http://{}", addr),
        client: Client::new(),
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn get(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.get(self.url(path)).headers(bearer(token))
    }

    pub fn post(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.post(self.url(path)).headers(bearer(token))
    }

    pub fn patch(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.patch(self.url(path)).headers(bearer(token))
    }

    pub fn delete(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.delete(self.url(path)).headers(bearer(token))
    }

    pub async fn sign_up(&self, email: &str, role: &str) {
        let response = self
            .client
            .post(self.url("/api/auth/signup"))
            .json(&json!({
                "email": email,
                "password": PASSWORD,
                "full_name": "Test User",
                "role": role
            }))
            .send()
            .await
            .expect("Failed to send signup request");
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> String {
        let response = self
            .client
            .post(self.url("/api/auth/signin"))
            .json(&json!({
                "email": email,
                "password": password
            }))
            .send()
            .await
            .expect("Failed to send signin request");
        assert_eq!(response.status(), StatusCode::OK);

        let body = response
            .json::<Value>()
            .await
            .expect("Failed to parse signin response JSON");
        body["token"]
            .as_str()
            .expect("Token not found in signin response")
            .to_owned()
    }

    /// Registers a user with the given role and returns a bearer token.
    pub async fn user(&self, email: &str, role: &str) -> String {
        self.sign_up(email, role).await;
        self.sign_in(email, PASSWORD).await
    }

    pub async fn create_product(&self, seller_token: &str, payload: Value) -> i64 {
        let response = self
            .post("/api/seller/products", seller_token)
            .json(&payload)
            .send()
            .await
            .expect("Failed to send create product request");
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = response
            .json::<Value>()
            .await
            .expect("Failed to parse create product response JSON");
        body["product"]["id"].as_i64().expect("Product id missing")
    }
}

pub fn product(name: &str, category: &str, price: f64, quantity: i32) -> Value {
    json!({
        "name": name,
        "category": category,
        "price": price,
        "quantity": quantity,
        "description": format!("{name} from the morning catch"),
        "hygiene_notes": "Kept on ice",
        "image_url": ""
    })
}

pub fn delivery(name: &str, phone: &str, address: &str) -> Value {
    json!({
        "name": name,
        "phone": phone,
        "address": address
    })
}

fn bearer(token: &str) -> header::HeaderMap {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {}", token))
            .expect("Failed to create Authorization header"),
    );
    headers
}

pub async fn json_body(response: reqwest::Response) -> Value {
    response
        .json::<Value>()
        .await
        .expect("Failed to parse response JSON")
}
