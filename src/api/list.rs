use axum::extract::{Query, State};
use axum::response::Html;
use serde::Deserialize;
use tower_sessions::Session;

use crate::api::common::messages::Messages;
use crate::api::render::{list_page, ListBody, ListContext};
use crate::errors::AppError;
use crate::videos::repository::{find_duplicates, list_videos, VideoFilter};
use crate::videos::DEFAULT_SEARCH_FIELD;
use crate::InnerState;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub q: Option<String>,
    pub field: Option<String>,
    pub page: Option<String>,
    pub duplicates: Option<String>,
}

#[tracing::instrument(name = "List videos page", skip(inner, session))]
pub async fn list_videos_page(
    State(inner): State<InnerState>,
    session: Session,
    Query(params): Query<ListParams>,
) -> Result<Html<String>, AppError> {
    let InnerState { db, config, .. } = inner;
    let messages = Messages::take(&session).await?;

    let q = params.q.as_deref().unwrap_or_default();
    let field = params.field.as_deref().unwrap_or(DEFAULT_SEARCH_FIELD);
    let show_duplicates = params.duplicates.as_deref().is_some_and(|d| !d.is_empty());
    let ctx = ListContext {
        q,
        selected_field: field,
        show_duplicates,
    };

    if show_duplicates {
        let groups = find_duplicates(&db, config.query_timeout).await?;
        return Ok(Html(list_page(&ctx, ListBody::Duplicates(&groups), &messages)));
    }

    let filter = VideoFilter::from_query(field, params.q.as_deref());
    let page_number = params
        .page
        .as_deref()
        .and_then(|p| p.parse::<i64>().ok())
        .unwrap_or(1);
    tracing::debug!(?filter, page_number, "Listing videos");

    let page = list_videos(&db, config.query_timeout, &filter, page_number).await?;
    Ok(Html(list_page(&ctx, ListBody::Page(&page), &messages)))
}
