mod api;
mod config;
mod db;
mod errors;
mod system;
mod videos;

use axum::routing::get;
use axum_prometheus::PrometheusMetricLayer;
use sqlx::AnyPool;
use std::error::Error;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::api::create_router;
use crate::config::AppConfig;
use crate::db::init_db;
use crate::videos::paths::AssetPaths;

#[derive(Clone)]
pub struct InnerState {
    pub db: AnyPool,
    pub config: Arc<AppConfig>,
    pub paths: AssetPaths,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "video_admin=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!(
        base_site_url = %config.base_site_url,
        fs_root = %config.fs_root.display(),
        "Configuration loaded"
    );

    let db = init_db(&config).await?;

    let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();

    let bind_addr = config.bind_addr.clone();
    let app_state = InnerState {
        db,
        paths: AssetPaths::from_config(&config),
        config: Arc::new(config),
    };

    let app = create_router(app_state)
        .route("/metrics", get(|| async move { metric_handle.render() }))
        .layer(prometheus_layer);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
