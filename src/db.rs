use anyhow::Context;
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use std::time::Duration;

use crate::config::AppConfig;
use crate::errors::AppError;

/// Connects to the externally owned catalog database. The schema is never migrated here.
pub async fn init_db(config: &AppConfig) -> anyhow::Result<AnyPool> {
    sqlx::any::install_default_drivers();

    let pool = AnyPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(config.query_timeout)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to the catalog database")?;

    tracing::info!("Database pool ready");
    Ok(pool)
}

pub async fn timeout_query<T, F>(duration: Duration, fut: F) -> Result<T, AppError>
where
    F: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(Ok(res)) => Ok(res),
        Ok(Err(e)) => Err(AppError::from(e)),
        Err(_) => Err(AppError::Database(anyhow::anyhow!(
            "Query timeout after {:?}",
            duration
        ))),
    }
}
