use std::path::{Component, Path, PathBuf};

use crate::config::AppConfig;
use crate::videos::Video;

/// The files that can accompany a record on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Video,
    Audio,
    Subtitle,
    Thumbnail,
    Sidecar,
}

impl AssetKind {
    /// Order used by "delete all".
    pub const ALL: [AssetKind; 5] = [
        AssetKind::Video,
        AssetKind::Audio,
        AssetKind::Subtitle,
        AssetKind::Thumbnail,
        AssetKind::Sidecar,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            AssetKind::Video => "mp4",
            AssetKind::Audio => "mp3",
            AssetKind::Subtitle => "vtt",
            AssetKind::Thumbnail => "jpg",
            AssetKind::Sidecar => "json",
        }
    }

    /// Upper-cased extension, as shown in status messages.
    pub fn label(self) -> String {
        self.extension().to_uppercase()
    }
}

pub const MEDIA_EXTENSION: &str = "mp4";

#[derive(thiserror::Error, Debug)]
pub enum AssetPathError {
    #[error("video url `{url}` does not start with base url `{base}`")]
    OutsideBaseUrl { url: String, base: String },
    #[error("video url `{0}` escapes the media root")]
    Traversal(String),
    #[error("video url `{0}` has no file name")]
    NoFileName(String),
    #[error("cannot create directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Maps a record's canonical URL onto the media filesystem.
#[derive(Debug, Clone)]
pub struct AssetPaths {
    base_url: String,
    root: PathBuf,
}

impl AssetPaths {
    pub fn new(base_url: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            base_url: base_url.into(),
            root: root.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.base_site_url.clone(), config.fs_root.clone())
    }

    /// `vid_url` with the base url stripped, e.g. `a/b/video.mp4`.
    pub fn relative_path(&self, video: &Video) -> Result<PathBuf, AssetPathError> {
        let rest = video
            .vid_url
            .strip_prefix(self.base_url.as_str())
            .ok_or_else(|| AssetPathError::OutsideBaseUrl {
                url: video.vid_url.clone(),
                base: self.base_url.clone(),
            })?;
        let relative = PathBuf::from(rest.trim_start_matches('/'));

        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(AssetPathError::Traversal(video.vid_url.clone()));
        }
        if relative.file_name().is_none() {
            return Err(AssetPathError::NoFileName(video.vid_url.clone()));
        }
        Ok(relative)
    }

    /// Where the asset lives, without touching the filesystem.
    pub fn path_for(&self, video: &Video, kind: AssetKind) -> Result<PathBuf, AssetPathError> {
        let full = self.root.join(self.relative_path(video)?);
        if kind.extension() == MEDIA_EXTENSION {
            Ok(full)
        } else {
            Ok(full.with_extension(kind.extension()))
        }
    }

    /// Like [`path_for`](Self::path_for), and makes sure the parent directory exists.
    pub async fn resolve(&self, video: &Video, kind: AssetKind) -> Result<PathBuf, AssetPathError> {
        let path = self.path_for(video, kind)?;
        if let Some(dir) = path.parent() {
            ensure_dir(dir).await?;
        }
        Ok(path)
    }
}

async fn ensure_dir(dir: &Path) -> Result<(), AssetPathError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| AssetPathError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })
}

/// Replaces the trailing `.mp4` of a url or file name with `.{extension}`.
/// Names without `.mp4` get the extension appended.
pub fn swap_media_extension(name: &str, extension: &str) -> String {
    let stem = name
        .rsplit_once(".mp4")
        .map(|(stem, _)| stem)
        .unwrap_or(name);
    format!("{stem}.{extension}")
}
