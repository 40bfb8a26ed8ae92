use sqlx::AnyPool;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::db::timeout_query;
use crate::errors::AppError;
use crate::videos::{filter_kind, FilterKind, Video, DB_FIELDS};

pub const PAGE_SIZE: i64 = 50;

const SELECT_VIDEOS: &str = "SELECT id, vid_category, search_category, vid_preacher, name, \
     vid_title, vid_code, date, vid_url, video_id, main_category, profile_id, created_at, \
     clicks, shorts, language, thumb_url FROM videos";

/// A list filter, decided once from the `field`/`q` query pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoFilter {
    All,
    TextContains { field: &'static str, needle: String },
    IntegerEquals { field: &'static str, value: i64 },
}

impl VideoFilter {
    /// Unknown fields, blank queries and non-numeric queries on integer
    /// fields all fall back to [`VideoFilter::All`].
    pub fn from_query(field: &str, q: Option<&str>) -> Self {
        let Some(q) = q.filter(|q| !q.is_empty()) else {
            return VideoFilter::All;
        };
        let Some(&field) = DB_FIELDS.iter().find(|&&f| f == field) else {
            return VideoFilter::All;
        };

        match filter_kind(field) {
            FilterKind::TextContains => VideoFilter::TextContains {
                field,
                needle: q.to_string(),
            },
            FilterKind::IntegerEquals => match q.trim().parse::<i64>() {
                Ok(value) => VideoFilter::IntegerEquals { field, value },
                Err(e) => {
                    tracing::debug!(field, q, error = %e, "Ignoring non-numeric filter");
                    VideoFilter::All
                }
            },
            FilterKind::Unsupported => VideoFilter::All,
        }
    }

    fn where_clause(&self) -> String {
        match self {
            VideoFilter::All => String::new(),
            VideoFilter::TextContains { field, .. } => {
                format!(" WHERE LOWER({field}) LIKE ? ESCAPE '!'")
            }
            VideoFilter::IntegerEquals { field, .. } => format!(" WHERE {field} = ?"),
        }
    }
}

/// `%`, `_` and the escape character itself match literally.
/// Only ASCII is folded: SQLite's `LOWER()` leaves other characters alone, so
/// a Unicode-lowered needle would never match there.
fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.to_ascii_lowercase().chars() {
        if matches!(c, '%' | '_' | '!') {
            escaped.push('!');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[derive(Debug, Clone)]
pub struct VideoPage {
    pub videos: Vec<Video>,
    pub page: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl VideoPage {
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    pub video_id: String,
    pub videos: Vec<Video>,
}

/// One page of records, newest first. Out-of-range pages are clamped.
#[tracing::instrument(name = "List videos", skip(db))]
pub async fn list_videos(
    db: &AnyPool,
    timeout: Duration,
    filter: &VideoFilter,
    page: i64,
) -> Result<VideoPage, AppError> {
    let where_clause = filter.where_clause();

    let count_sql = format!("SELECT COUNT(*) FROM videos{where_clause}");
    let count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    let count_query = match filter {
        VideoFilter::All => count_query,
        VideoFilter::TextContains { needle, .. } => count_query.bind(like_pattern(needle)),
        VideoFilter::IntegerEquals { value, .. } => count_query.bind(*value),
    };
    let total = timeout_query(timeout, count_query.fetch_one(db)).await?;

    let total_pages = ((total + PAGE_SIZE - 1) / PAGE_SIZE).max(1);
    let page = page.clamp(1, total_pages);
    let offset = (page - 1) * PAGE_SIZE;

    let list_sql =
        format!("{SELECT_VIDEOS}{where_clause} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?");
    let list_query = sqlx::query_as::<_, Video>(&list_sql);
    let list_query = match filter {
        VideoFilter::All => list_query,
        VideoFilter::TextContains { needle, .. } => list_query.bind(like_pattern(needle)),
        VideoFilter::IntegerEquals { value, .. } => list_query.bind(*value),
    };
    let videos = timeout_query(
        timeout,
        list_query.bind(PAGE_SIZE).bind(offset).fetch_all(db),
    )
    .await?;

    tracing::debug!(total, page, returned = videos.len(), "Fetched video page");
    Ok(VideoPage {
        videos,
        page,
        total,
        total_pages,
    })
}

/// Records sharing a `video_id` with at least one other record, grouped by
/// `video_id` with the newest `created_at` first inside each group.
#[tracing::instrument(name = "Find duplicate videos", skip(db))]
pub async fn find_duplicates(db: &AnyPool, timeout: Duration) -> Result<Vec<DuplicateGroup>, AppError> {
    let sql = format!(
        "{SELECT_VIDEOS} WHERE video_id IN \
         (SELECT video_id FROM videos GROUP BY video_id HAVING COUNT(*) > 1) \
         ORDER BY video_id, created_at DESC"
    );
    let rows = timeout_query(timeout, sqlx::query_as::<_, Video>(&sql).fetch_all(db)).await?;

    let mut grouped: BTreeMap<String, Vec<Video>> = BTreeMap::new();
    for video in rows {
        grouped.entry(video.video_id.clone()).or_default().push(video);
    }

    tracing::info!(groups = grouped.len(), "Duplicate groups found");
    Ok(grouped
        .into_iter()
        .map(|(video_id, videos)| DuplicateGroup { video_id, videos })
        .collect())
}

#[tracing::instrument(name = "Get video by id", skip(db))]
pub async fn get_video(db: &AnyPool, timeout: Duration, id: i64) -> Result<Video, AppError> {
    let sql = format!("{SELECT_VIDEOS} WHERE id = ?");
    timeout_query(
        timeout,
        sqlx::query_as::<_, Video>(&sql).bind(id).fetch_optional(db),
    )
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Video {} not found", id)))
}

/// Writes every field except `id` back to the row.
#[tracing::instrument(name = "Save video", skip(db, video), fields(video_id = video.id))]
pub async fn save_video(db: &AnyPool, timeout: Duration, video: &Video) -> Result<(), AppError> {
    let query = sqlx::query(
        r#"UPDATE videos SET vid_category = ?, search_category = ?, vid_preacher = ?, name = ?,
           vid_title = ?, vid_code = ?, date = ?, vid_url = ?, video_id = ?, main_category = ?,
           profile_id = ?, created_at = ?, clicks = ?, shorts = ?, language = ?, thumb_url = ?
           WHERE id = ?"#,
    )
    .bind(&video.vid_category)
    .bind(&video.search_category)
    .bind(&video.vid_preacher)
    .bind(&video.name)
    .bind(&video.vid_title)
    .bind(&video.vid_code)
    .bind(&video.date)
    .bind(&video.vid_url)
    .bind(&video.video_id)
    .bind(&video.main_category)
    .bind(video.profile_id)
    .bind(&video.created_at)
    .bind(video.clicks)
    .bind(video.shorts)
    .bind(&video.language)
    .bind(&video.thumb_url)
    .bind(video.id);

    let result = timeout_query(timeout, query.execute(db)).await?;
    tracing::info!(rows = result.rows_affected(), "Video row saved");
    Ok(())
}

#[tracing::instrument(name = "Delete video row", skip(db))]
pub async fn delete_video(db: &AnyPool, timeout: Duration, id: i64) -> Result<u64, AppError> {
    let result = timeout_query(
        timeout,
        sqlx::query("DELETE FROM videos WHERE id = ?").bind(id).execute(db),
    )
    .await?;
    tracing::info!(rows = result.rows_affected(), "Video row deleted");
    Ok(result.rows_affected())
}

#[cfg(test)]
pub(crate) async fn insert_video(db: &AnyPool, video: &Video) {
    sqlx::query(
        r#"INSERT INTO videos (id, vid_category, search_category, vid_preacher, name, vid_title,
           vid_code, date, vid_url, video_id, main_category, profile_id, created_at, clicks,
           shorts, language, thumb_url) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(video.id)
    .bind(&video.vid_category)
    .bind(&video.search_category)
    .bind(&video.vid_preacher)
    .bind(&video.name)
    .bind(&video.vid_title)
    .bind(&video.vid_code)
    .bind(&video.date)
    .bind(&video.vid_url)
    .bind(&video.video_id)
    .bind(&video.main_category)
    .bind(video.profile_id)
    .bind(&video.created_at)
    .bind(video.clicks)
    .bind(video.shorts)
    .bind(&video.language)
    .bind(&video.thumb_url)
    .execute(db)
    .await
    .expect("insert video");
}
