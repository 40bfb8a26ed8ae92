//! The `videos` record and everything derived from it: field metadata,
//! database access, on-disk asset paths and the JSON sidecar.

pub mod assets;
pub mod paths;
pub mod repository;
pub mod sidecar;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;
use std::collections::HashMap;

/// Every column of the `videos` table, in display order.
pub const DB_FIELDS: [&str; 17] = [
    "id",
    "vid_category",
    "search_category",
    "vid_preacher",
    "name",
    "vid_title",
    "vid_code",
    "date",
    "vid_url",
    "video_id",
    "main_category",
    "profile_id",
    "created_at",
    "clicks",
    "shorts",
    "language",
    "thumb_url",
];

pub const DEFAULT_SEARCH_FIELD: &str = "video_id";

/// How the list view filters on a given field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    TextContains,
    IntegerEquals,
    Unsupported,
}

static FILTER_KINDS: Lazy<HashMap<&'static str, FilterKind>> = Lazy::new(|| {
    DB_FIELDS
        .iter()
        .map(|&field| {
            let kind = match field {
                "id" | "profile_id" | "clicks" | "shorts" => FilterKind::IntegerEquals,
                _ => FilterKind::TextContains,
            };
            (field, kind)
        })
        .collect()
});

pub fn filter_kind(field: &str) -> FilterKind {
    FILTER_KINDS
        .get(field)
        .copied()
        .unwrap_or(FilterKind::Unsupported)
}

pub fn is_known_field(field: &str) -> bool {
    FILTER_KINDS.contains_key(field)
}

#[derive(thiserror::Error, Debug)]
pub enum FieldError {
    #[error("unknown field `{0}`")]
    Unknown(String),
    #[error("field `{0}` is read-only")]
    ReadOnly(String),
    #[error("field `{field}` expects {expected}, got `{value}`")]
    InvalidValue {
        field: String,
        expected: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Video {
    pub id: i64,
    pub vid_category: String,
    pub search_category: String,
    pub vid_preacher: String,
    pub name: String,
    pub vid_title: String,
    pub vid_code: String,
    pub date: String,
    pub vid_url: String,
    pub video_id: String,
    pub main_category: String,
    pub profile_id: Option<i64>,
    pub created_at: String,
    pub clicks: i64,
    pub shorts: i64,
    pub language: String,
    pub thumb_url: Option<String>,
}

impl Video {
    /// The record as a `field -> value` map, as stored under `sql_params`.
    pub fn field_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Renders one field for an HTML input; nulls become an empty string.
    pub fn field_text(&self, field: &str) -> Option<String> {
        self.field_map().remove(field).map(|value| match value {
            Value::Null => String::new(),
            Value::String(s) => s,
            other => other.to_string(),
        })
    }

    /// Assigns a single field. `id` can never be changed this way.
    ///
    /// Text fields take strings (numbers are stringified), integer fields take
    /// numbers or numeric strings. Only `profile_id` and `thumb_url` accept null;
    /// for those an empty string also means null.
    pub fn set_field(&mut self, field: &str, value: &Value) -> Result<(), FieldError> {
        match field {
            "id" => Err(FieldError::ReadOnly(field.to_string())),
            "vid_category" => set_text(&mut self.vid_category, field, value),
            "search_category" => set_text(&mut self.search_category, field, value),
            "vid_preacher" => set_text(&mut self.vid_preacher, field, value),
            "name" => set_text(&mut self.name, field, value),
            "vid_title" => set_text(&mut self.vid_title, field, value),
            "vid_code" => set_text(&mut self.vid_code, field, value),
            "date" => set_text(&mut self.date, field, value),
            "vid_url" => set_text(&mut self.vid_url, field, value),
            "video_id" => set_text(&mut self.video_id, field, value),
            "main_category" => set_text(&mut self.main_category, field, value),
            "profile_id" => {
                self.profile_id = optional_integer(field, value)?;
                Ok(())
            }
            "created_at" => set_text(&mut self.created_at, field, value),
            "clicks" => set_integer(&mut self.clicks, field, value),
            "shorts" => set_integer(&mut self.shorts, field, value),
            "language" => set_text(&mut self.language, field, value),
            "thumb_url" => {
                self.thumb_url = optional_text(field, value)?;
                Ok(())
            }
            _ => Err(FieldError::Unknown(field.to_string())),
        }
    }

    /// Copies every recognized field from a sidecar's `sql_params`, except `id`.
    /// Unknown keys are skipped. Returns the names of the fields that were assigned.
    pub fn apply_sql_params(&mut self, params: &Map<String, Value>) -> Result<Vec<String>, FieldError> {
        let mut applied = Vec::new();
        for (key, value) in params {
            if key == "id" || !is_known_field(key) {
                continue;
            }
            self.set_field(key, value)?;
            applied.push(key.clone());
        }
        Ok(applied)
    }
}

fn invalid(field: &str, expected: &'static str, value: &Value) -> FieldError {
    FieldError::InvalidValue {
        field: field.to_string(),
        expected,
        value: value.to_string(),
    }
}

fn text_value(field: &str, value: &Value) -> Result<String, FieldError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(invalid(field, "text", other)),
    }
}

fn integer_value(field: &str, value: &Value) -> Result<i64, FieldError> {
    match value {
        Value::Number(n) => n.as_i64().ok_or_else(|| invalid(field, "an integer", value)),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid(field, "an integer", value)),
        other => Err(invalid(field, "an integer", other)),
    }
}

fn set_text(slot: &mut String, field: &str, value: &Value) -> Result<(), FieldError> {
    *slot = text_value(field, value)?;
    Ok(())
}

fn set_integer(slot: &mut i64, field: &str, value: &Value) -> Result<(), FieldError> {
    *slot = integer_value(field, value)?;
    Ok(())
}

fn optional_text(field: &str, value: &Value) -> Result<Option<String>, FieldError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        other => text_value(field, other).map(Some),
    }
}

fn optional_integer(field: &str, value: &Value) -> Result<Option<i64>, FieldError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        other => integer_value(field, other).map(Some),
    }
}

#[cfg(test)]
pub(crate) fn sample_video(id: i64, vid_url: &str) -> Video {
    Video {
        id,
        vid_category: "Sermons".into(),
        search_category: "sermons".into(),
        vid_preacher: "J. Smith".into(),
        name: "Sunday Service".into(),
        vid_title: "Sunday Service Title".into(),
        vid_code: "<iframe></iframe>".into(),
        date: "2024-03-05 10:30:00".into(),
        vid_url: vid_url.into(),
        video_id: format!("vid-{id}"),
        main_category: "Main Church (Pastor Jones)".into(),
        profile_id: None,
        created_at: "2024-03-05 11:00:00".into(),
        clicks: 0,
        shorts: 0,
        language: "en".into(),
        thumb_url: None,
    }
}
