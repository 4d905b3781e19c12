use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tshirtify::{app, auth, db, models::Role, AppState, Config};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url).await {
            Ok(client) => Some(client),
            Err(err) => {
                tracing::warn!(error = %err, "NATS unavailable, events disabled");
                None
            }
        },
        None => None,
    };

    ensure_default_admin(&pool, &config).await?;

    let state = AppState {
        db: pool,
        nats,
        config: Arc::new(config.clone()),
    };

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(%addr, "tshirtify listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app(state)).await?;
    Ok(())
}

/// Provisions the admin account named by ADMIN_EMAIL/ADMIN_PASSWORD when it
/// does not exist yet. Safe to run on every boot.
async fn ensure_default_admin(pool: &sqlx::PgPool, config: &Config) -> Result<()> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        return Ok(());
    };
    if db::users::find_by_email(pool, email).await?.is_some() {
        return Ok(());
    }
    let hash = auth::hash_password(password)?;
    db::users::insert(pool, email, &hash, "Administrator", Role::Admin).await?;
    tracing::info!(email, "default admin account created");
    Ok(())
}
