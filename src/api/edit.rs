//! The per-record edit page.
//!
//! A POST carries exactly one action. Delete buttons win over a plain save, in
//! the order of [`EditAction::from_form`]. Every step reports what it did
//! through [`Messages`]; nothing already written is undone when a later step fails.

use axum::extract::{Path, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum_typed_multipart::{FieldData, TryFromMultipart, TypedMultipart};
use serde_json::Value;
use tempfile::NamedTempFile;
use tower_sessions::Session;

use crate::api::common::messages::Messages;
use crate::api::render::edit_page;
use crate::errors::AppError;
use crate::videos::assets::{delete_asset, write_asset, DeleteOutcome};
use crate::videos::paths::{swap_media_extension, AssetKind};
use crate::videos::repository::{delete_video, get_video, save_video};
use crate::videos::sidecar::{sync_sidecar, SyncOutcome};
use crate::videos::Video;
use crate::InnerState;

const LIST_URL: &str = "/";

#[derive(TryFromMultipart)]
pub struct EditForm {
    pub vid_category: Option<String>,
    pub search_category: Option<String>,
    pub vid_preacher: Option<String>,
    pub name: Option<String>,
    pub vid_title: Option<String>,
    pub vid_code: Option<String>,
    pub date: Option<String>,
    pub vid_url: Option<String>,
    pub video_id: Option<String>,
    pub main_category: Option<String>,
    pub profile_id: Option<String>,
    pub created_at: Option<String>,
    pub clicks: Option<String>,
    pub shorts: Option<String>,
    pub language: Option<String>,
    pub thumb_url: Option<String>,

    #[form_data(limit = "unlimited")]
    pub json_file: Option<FieldData<NamedTempFile>>,
    #[form_data(limit = "unlimited")]
    pub thumb_file: Option<FieldData<NamedTempFile>>,
    #[form_data(limit = "unlimited")]
    pub video_file: Option<FieldData<NamedTempFile>>,
    #[form_data(limit = "unlimited")]
    pub audio_file: Option<FieldData<NamedTempFile>>,
    #[form_data(limit = "unlimited")]
    pub vtt_file: Option<FieldData<NamedTempFile>>,
    pub audio_delete: Option<String>,
    pub vtt_delete: Option<String>,

    pub delete_video: Option<String>,
    pub delete_audio: Option<String>,
    pub delete_vtt: Option<String>,
    pub delete_thumb: Option<String>,
    pub delete_json: Option<String>,
    pub delete_all: Option<String>,
    pub delete_db_only: Option<String>,
}

impl EditForm {
    /// Metadata fields present in the body, by column name.
    fn metadata(&self) -> Vec<(&'static str, &str)> {
        [
            ("vid_category", &self.vid_category),
            ("search_category", &self.search_category),
            ("vid_preacher", &self.vid_preacher),
            ("name", &self.name),
            ("vid_title", &self.vid_title),
            ("vid_code", &self.vid_code),
            ("date", &self.date),
            ("vid_url", &self.vid_url),
            ("video_id", &self.video_id),
            ("main_category", &self.main_category),
            ("profile_id", &self.profile_id),
            ("created_at", &self.created_at),
            ("clicks", &self.clicks),
            ("shorts", &self.shorts),
            ("language", &self.language),
            ("thumb_url", &self.thumb_url),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.as_deref().map(|v| (field, v)))
        .collect()
    }
}

/// The one thing a POST asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditAction {
    DeleteAsset(AssetKind),
    DeleteAll,
    DeleteDbOnly,
    Save,
}

impl EditAction {
    pub fn from_form(form: &EditForm) -> Self {
        if form.delete_video.is_some() {
            EditAction::DeleteAsset(AssetKind::Video)
        } else if form.delete_audio.is_some() {
            EditAction::DeleteAsset(AssetKind::Audio)
        } else if form.delete_vtt.is_some() {
            EditAction::DeleteAsset(AssetKind::Subtitle)
        } else if form.delete_thumb.is_some() {
            EditAction::DeleteAsset(AssetKind::Thumbnail)
        } else if form.delete_json.is_some() {
            EditAction::DeleteAsset(AssetKind::Sidecar)
        } else if form.delete_all.is_some() {
            EditAction::DeleteAll
        } else if form.delete_db_only.is_some() {
            EditAction::DeleteDbOnly
        } else {
            EditAction::Save
        }
    }
}

/// File parts are spooled to a temporary file while the body is decoded.
/// A file input the browser submitted without choosing a file arrives as an
/// empty part with an empty file name.
fn upload(field: &Option<FieldData<NamedTempFile>>) -> Option<&FieldData<NamedTempFile>> {
    field.as_ref().filter(|data| {
        let unnamed = data
            .metadata
            .file_name
            .as_deref()
            .map_or(true, str::is_empty);
        let empty = data
            .contents
            .as_file()
            .metadata()
            .map_or(true, |meta| meta.len() == 0);
        !(unnamed && empty)
    })
}

fn checked(flag: &Option<String>) -> bool {
    match flag.as_deref() {
        None => false,
        Some(value) => !matches!(value.trim().to_ascii_lowercase().as_str(), "" | "false" | "0" | "off"),
    }
}

#[tracing::instrument(name = "Show edit form", skip(inner, session))]
pub async fn edit_form(
    State(inner): State<InnerState>,
    session: Session,
    Path(id): Path<i64>,
) -> Result<Html<String>, AppError> {
    let video = get_video(&inner.db, inner.config.query_timeout, id).await?;
    let messages = Messages::take(&session).await?;
    Ok(Html(edit_page(&video, &messages)))
}

#[tracing::instrument(name = "Apply edit action", skip(inner, session, form))]
pub async fn apply_edit(
    State(inner): State<InnerState>,
    session: Session,
    Path(id): Path<i64>,
    TypedMultipart(form): TypedMultipart<EditForm>,
) -> Result<Response, AppError> {
    let mut video = get_video(&inner.db, inner.config.query_timeout, id).await?;
    let action = EditAction::from_form(&form);
    tracing::info!(?action, "Decoded edit action");

    let mut messages = Messages::default();
    match action {
        EditAction::DeleteAsset(kind) => {
            if let Err(e) = delete_one(&inner, &mut video, kind, &mut messages).await {
                messages.error(format!("Error deleting {} file: {}", kind.label(), e));
            }
        }
        EditAction::DeleteAll => {
            if let Err(e) = delete_everything(&inner, &video, &mut messages).await {
                messages.error(format!("Error deleting all files and entry: {}", e));
            }
        }
        EditAction::DeleteDbOnly => {
            messages.info(format!(
                "Deleting database entry for video ID: {} (files remain intact)",
                video.id
            ));
            match delete_video(&inner.db, inner.config.query_timeout, video.id).await {
                Ok(_) => messages.success("Database entry deleted successfully."),
                Err(e) => messages.error(format!("Error deleting database entry: {}", e)),
            }
        }
        EditAction::Save => {
            if let Err(e) = save(&inner, &mut video, &form, &mut messages).await {
                messages.error(format!(
                    "Error during form validation or file operations: {}",
                    e
                ));
                let mut shown = Messages::take(&session).await?;
                shown.extend(messages.into_vec());
                return Ok(Html(edit_page(&video, &shown)).into_response());
            }
        }
    }

    messages.stash(&session).await?;
    Ok(Redirect::to(LIST_URL).into_response())
}

async fn delete_one(
    inner: &InnerState,
    video: &mut Video,
    kind: AssetKind,
    messages: &mut Messages,
) -> Result<(), AppError> {
    remove_asset(inner, video, kind, messages).await?;
    if kind == AssetKind::Thumbnail {
        video.thumb_url = None;
        save_video(&inner.db, inner.config.query_timeout, video).await?;
        messages.success("Thumbnail URL cleared in database.");
    }
    Ok(())
}

async fn delete_everything(
    inner: &InnerState,
    video: &Video,
    messages: &mut Messages,
) -> Result<(), AppError> {
    for kind in AssetKind::ALL {
        remove_asset(inner, video, kind, messages).await?;
    }
    messages.info(format!("Deleting database entry for video ID: {}", video.id));
    delete_video(&inner.db, inner.config.query_timeout, video.id).await?;
    messages.success("All files and database entry deleted successfully.");
    Ok(())
}

async fn remove_asset(
    inner: &InnerState,
    video: &Video,
    kind: AssetKind,
    messages: &mut Messages,
) -> Result<DeleteOutcome, AppError> {
    let label = kind.label();
    let path = inner.paths.resolve(video, kind).await?;
    messages.info(format!("Attempting to delete {} file at: {}", label, path.display()));

    let outcome = delete_asset(&path).await?;
    match outcome {
        DeleteOutcome::Deleted => messages.success(format!(
            "{} file deleted successfully from: {}",
            label,
            path.display()
        )),
        DeleteOutcome::NotFound => {
            messages.warning(format!("{} file not found at: {}", label, path.display()))
        }
    }
    Ok(outcome)
}

/// Metadata, then uploads in a fixed order, then the row, then the sidecar.
async fn save(
    inner: &InnerState,
    video: &mut Video,
    form: &EditForm,
    messages: &mut Messages,
) -> Result<(), AppError> {
    for (field, value) in form.metadata() {
        video.set_field(field, &Value::String(value.to_string()))?;
    }

    if let Some(file) = upload(&form.json_file) {
        let path = inner.paths.resolve(video, AssetKind::Sidecar).await?;
        messages.info(format!("Uploading JSON file to: {}", path.display()));
        write_asset(&path, file.contents.path()).await?;
        messages.success(format!("JSON file uploaded successfully to: {}", path.display()));

        let raw = tokio::fs::read(file.contents.path()).await?;
        let document: Value = serde_json::from_slice(&raw)?;
        apply_uploaded_document(video, &document)?;
        messages.success("Database updated from uploaded JSON.");
    }

    if let Some(file) = upload(&form.thumb_file) {
        let path = inner.paths.resolve(video, AssetKind::Thumbnail).await?;
        messages.info(format!("Uploading thumbnail to: {}", path.display()));
        write_asset(&path, file.contents.path()).await?;
        messages.success(format!("Thumbnail uploaded successfully to: {}", path.display()));

        let thumb_url = swap_media_extension(&video.vid_url, AssetKind::Thumbnail.extension());
        messages.success(format!("Thumbnail URL updated in database to: {}", thumb_url));
        video.thumb_url = Some(thumb_url);
    }

    if let Some(file) = upload(&form.video_file) {
        let path = inner.paths.resolve(video, AssetKind::Video).await?;
        messages.info(format!("Replacing video file at: {}", path.display()));
        write_asset(&path, file.contents.path()).await?;
        messages.success(format!("Video file successfully replaced at: {}", path.display()));
    }

    replace_or_delete(
        inner,
        video,
        AssetKind::Audio,
        upload(&form.audio_file),
        checked(&form.audio_delete),
        messages,
    )
    .await?;
    replace_or_delete(
        inner,
        video,
        AssetKind::Subtitle,
        upload(&form.vtt_file),
        checked(&form.vtt_delete),
        messages,
    )
    .await?;

    messages.info("Saving changes to database...");
    save_video(&inner.db, inner.config.query_timeout, video).await?;
    messages.success("Database changes saved successfully.");

    let json_path = inner.paths.path_for(video, AssetKind::Sidecar)?;
    messages.info(format!("Updating/Creating JSON file at: {}", json_path.display()));
    match sync_sidecar(video, &inner.paths).await? {
        SyncOutcome::Updated(path) => {
            messages.success(format!("JSON file updated successfully at: {}", path.display()))
        }
        SyncOutcome::Created(path) => {
            messages.success(format!("JSON file created successfully at: {}", path.display()))
        }
    }
    Ok(())
}

/// An uploaded sidecar must be a JSON object. Its `sql_params`, when present,
/// must be an object too; those keys overwrite the record's fields.
fn apply_uploaded_document(video: &mut Video, document: &Value) -> Result<(), AppError> {
    let Some(document) = document.as_object() else {
        return Err(AppError::Validation(
            "uploaded JSON must be an object".to_string(),
        ));
    };
    match document.get("sql_params") {
        None => Ok(()),
        Some(Value::Object(params)) => {
            let applied = video.apply_sql_params(params)?;
            tracing::debug!(?applied, "Applied sql_params from uploaded JSON");
            Ok(())
        }
        Some(_) => Err(AppError::Validation(
            "sql_params in uploaded JSON must be an object".to_string(),
        )),
    }
}

/// Audio and subtitle share this: an upload replaces the file, otherwise the
/// delete checkbox removes it.
async fn replace_or_delete(
    inner: &InnerState,
    video: &Video,
    kind: AssetKind,
    file: Option<&FieldData<NamedTempFile>>,
    delete_requested: bool,
    messages: &mut Messages,
) -> Result<(), AppError> {
    let label = kind.label();
    if let Some(file) = file {
        let path = inner.paths.resolve(video, kind).await?;
        messages.info(format!("Replacing {} file at: {}", label, path.display()));
        let written = write_asset(&path, file.contents.path()).await?;
        messages.success(format!(
            "{} file successfully replaced at: {} ({} bytes written)",
            label,
            path.display(),
            written
        ));
    } else if delete_requested {
        let path = inner.paths.resolve(video, kind).await?;
        messages.info(format!("Deleting {} file at: {}", label, path.display()));
        match delete_asset(&path).await? {
            DeleteOutcome::Deleted => messages.success(format!(
                "{} file deleted successfully from: {}",
                label,
                path.display()
            )),
            DeleteOutcome::NotFound => {
                messages.warning(format!("{} file not found at: {}", label, path.display()))
            }
        }
    }
    Ok(())
}
