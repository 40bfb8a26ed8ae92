//! Status messages shown to the operator after each action.
//!
//! Messages collected while handling a POST are stashed in the session and
//! drained by whichever page renders next.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::errors::AppError;

const MESSAGES_KEY: &str = "messages";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Success => "success",
            Level::Warning => "warning",
            Level::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub level: Level,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct Messages(Vec<Message>);

impl Messages {
    pub fn push(&mut self, level: Level, text: impl Into<String>) {
        let text = text.into();
        match level {
            Level::Info | Level::Success => tracing::info!(kind = level.as_str(), "{}", text),
            Level::Warning => tracing::warn!("{}", text),
            Level::Error => tracing::error!("{}", text),
        }
        self.0.push(Message { level, text });
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.push(Level::Info, text);
    }

    pub fn success(&mut self, text: impl Into<String>) {
        self.push(Level::Success, text);
    }

    pub fn warning(&mut self, text: impl Into<String>) {
        self.push(Level::Warning, text);
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.push(Level::Error, text);
    }

    pub fn into_vec(self) -> Vec<Message> {
        self.0
    }

    /// Appends to whatever is already waiting in the session.
    pub async fn stash(self, session: &Session) -> Result<(), AppError> {
        if self.0.is_empty() {
            return Ok(());
        }
        let mut pending: Vec<Message> = session.get(MESSAGES_KEY).await?.unwrap_or_default();
        pending.extend(self.0);
        session.insert(MESSAGES_KEY, pending).await?;
        Ok(())
    }

    /// Removes and returns the stashed messages.
    pub async fn take(session: &Session) -> Result<Vec<Message>, AppError> {
        Ok(session
            .remove::<Vec<Message>>(MESSAGES_KEY)
            .await?
            .unwrap_or_default())
    }
}
