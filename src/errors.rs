use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use std::error::Error as StdError;

use crate::api::render::escape_html;
use crate::videos::paths::AssetPathError;
use crate::videos::FieldError;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[source] anyhow::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Asset path error: {0}")]
    AssetPath(#[from] AssetPathError),

    #[error("Invalid field value: {0}")]
    Field(#[from] FieldError),

    #[error("File error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("An unexpected error occurred: {0}")]
    Unexpected(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::Field(_) | AppError::Json(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::AssetPath(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Database(_)
            | AppError::Io(_)
            | AppError::Session(_)
            | AppError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let error_message = self.to_string();

        tracing::error!(
            error_type = ?self,
            error_message = %error_message,
            status_code = %status,
            "Request error"
        );

        if let AppError::Unexpected(e) | AppError::Database(e) = &self {
            let mut source_chain = String::new();
            let mut current_err: Option<&(dyn StdError + 'static)> = e.source();
            while let Some(err) = current_err {
                source_chain.push_str(&format!("\n  Caused by: {}", err));
                current_err = err.source();
            }
            if !source_chain.is_empty() {
                tracing::error!("Error source chain:{}", source_chain);
            }
        }

        let body = Html(format!(
            "<!doctype html><html><head><title>{code}</title></head><body>\
             <h1>{code} {reason}</h1><p>{message}</p><p><a href=\"/\">Back to list</a></p>\
             </body></html>",
            code = status.as_u16(),
            reason = status.canonical_reason().unwrap_or("Error"),
            message = escape_html(&error_message),
        ));
        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Database record not found".to_string()),
            _ => AppError::Database(anyhow::Error::new(err).context("SQLx operation failed")),
        }
    }
}
