//! One-shot notices carried across a redirect in the session.

use axum::response::Redirect;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use utoipa::ToSchema;

use crate::error::AppResult;

const FLASH_KEY: &str = "_flashes";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Warning,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Notice {
    pub level: Level,
    pub message: String,
}

impl Notice {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Queue a notice for the next page the client renders.
pub async fn push(
    session: &Session,
    level: Level,
    message: impl Into<String>,
) -> Result<(), tower_sessions::session::Error> {
    let mut notices: Vec<Notice> = session.get(FLASH_KEY).await?.unwrap_or_default();
    notices.push(Notice::new(level, message));
    session.insert(FLASH_KEY, notices).await
}

/// Drain every queued notice.
pub async fn take(session: &Session) -> Result<Vec<Notice>, tower_sessions::session::Error> {
    Ok(session
        .remove::<Vec<Notice>>(FLASH_KEY)
        .await?
        .unwrap_or_default())
}

/// Queue a notice and redirect (303) to `to`.
pub async fn redirect(
    session: &Session,
    level: Level,
    message: impl Into<String>,
    to: &str,
) -> AppResult<Redirect> {
    push(session, level, message).await?;
    Ok(Redirect::to(to))
}
