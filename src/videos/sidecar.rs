//! JSON sidecar written next to each video.
//!
//! An existing sidecar keeps whatever ingestion metadata it already has; only
//! `sql_params` is replaced with the record's current fields. A missing sidecar
//! is created from what can be derived from the record itself.

use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::errors::AppError;
use crate::videos::paths::{swap_media_extension, AssetKind, AssetPaths};
use crate::videos::Video;

const STORED_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const US_DATE_FORMAT: &str = "%m/%d/%Y";

#[derive(Debug, Clone, Serialize)]
pub struct Sidecar {
    pub original_filename: String,
    pub target_filename: String,
    pub target_directory_relative: String,
    pub original_vtt_filename: Option<String>,
    pub uploader: String,
    pub target_vtt_filename: String,
    pub sql_params: Map<String, Value>,
    pub title: String,
    #[serde(rename = "us_mdY")]
    pub us_mdy: Option<String>,
    pub error: Option<String>,
}

impl Sidecar {
    pub fn for_video(video: &Video, paths: &AssetPaths) -> Result<Self, AppError> {
        let relative = paths.relative_path(video)?;
        let target_filename = relative
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let target_directory_relative = relative
            .parent()
            .map(|dir| dir.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            original_filename: target_filename.clone(),
            target_vtt_filename: swap_media_extension(&target_filename, "vtt"),
            target_filename,
            target_directory_relative,
            original_vtt_filename: None,
            uploader: uploader_from_category(&video.main_category),
            sql_params: video.field_map(),
            title: video.name.clone(),
            us_mdy: us_date(&video.date),
            error: None,
        })
    }
}

/// What happened to the sidecar file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Updated(PathBuf),
    Created(PathBuf),
}

/// Text inside the last parenthesised group of `main_category`,
/// e.g. `"Sermons (Pastor Jones)"` gives `"Pastor Jones"`.
pub fn uploader_from_category(main_category: &str) -> String {
    if main_category.is_empty() {
        return "Unknown".to_string();
    }
    main_category
        .rsplit('(')
        .next()
        .unwrap_or(main_category)
        .trim_end_matches(')')
        .to_string()
}

/// `2024-03-05 10:30:00` becomes `03/05/2024`. Anything unparsable is `None`.
pub fn us_date(stored: &str) -> Option<String> {
    if stored.is_empty() {
        return None;
    }
    NaiveDateTime::parse_from_str(stored, STORED_DATE_FORMAT)
        .map(|dt| dt.format(US_DATE_FORMAT).to_string())
        .map_err(|e| tracing::debug!(date = stored, error = %e, "Unparsable record date"))
        .ok()
}

/// Brings the sidecar in line with `video`, creating it if needed.
#[tracing::instrument(name = "Sync sidecar", skip(video, paths), fields(video_id = video.id))]
pub async fn sync_sidecar(video: &Video, paths: &AssetPaths) -> Result<SyncOutcome, AppError> {
    let path = paths.resolve(video, AssetKind::Sidecar).await?;

    if tokio::fs::try_exists(&path).await? {
        let raw = tokio::fs::read(&path).await?;
        let mut document: Value = serde_json::from_slice(&raw)?;
        let Some(object) = document.as_object_mut() else {
            return Err(AppError::Validation(format!(
                "sidecar at {} is not a JSON object",
                path.display()
            )));
        };
        object.insert("sql_params".to_string(), Value::Object(video.field_map()));
        write_pretty(&path, &document).await?;
        tracing::info!(path = %path.display(), "Sidecar updated");
        Ok(SyncOutcome::Updated(path))
    } else {
        let sidecar = Sidecar::for_video(video, paths)?;
        write_pretty(&path, &sidecar).await?;
        tracing::info!(path = %path.display(), "Sidecar created");
        Ok(SyncOutcome::Created(path))
    }
}

async fn write_pretty<T: Serialize>(path: &Path, value: &T) -> Result<(), AppError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    tokio::fs::write(path, buf).await?;
    Ok(())
}
