use sea_orm::{Database, DatabaseConnection};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use marine_market::config::Config;
use marine_market::entities::{seed_demo_data, setup_schema};
use marine_market::middleware::auth::AuthKeys;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let db: DatabaseConnection = Database::connect(&config.database_url).await?;
    setup_schema(&db).await?;

    if config.seed_demo_data {
        seed_demo_data(&db).await?;
    }

    let shared_db = Arc::new(db);
    let keys = Arc::new(AuthKeys::new(&config.secret, config.token_ttl_hours));

    let app = marine_market::app(shared_db, keys);

    let listener = tokio::net::TcpListener::bind(config.bind_addr.as_str()).await?;
    info!(addr = %listener.local_addr()?, "Marine market listening");
    axum::serve(listener, app).await?;

    Ok(())
}
