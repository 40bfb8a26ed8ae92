use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::db::timeout_query;
use crate::InnerState;

/// `OK` when the catalog database answers a trivial query.
pub async fn health_check(State(inner): State<InnerState>) -> impl IntoResponse {
    let ping = sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(&inner.db);
    match timeout_query(inner.config.query_timeout, ping).await {
        Ok(_) => (StatusCode::OK, "OK"),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "database unavailable")
        }
    }
}
