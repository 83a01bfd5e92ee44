use serde::Serialize;
use utoipa::ToSchema;

use crate::{flash::Notice, middleware::auth::CurrentUser};

/// Per-page context: the flash notices drained for this request and the
/// logged-in user, if any.
#[derive(Debug, Serialize, ToSchema, Clone, Default)]
pub struct Meta {
    pub notices: Vec<Notice>,
    pub user: Option<CurrentUser>,
}

impl Meta {
    pub fn new(notices: Vec<Notice>, user: Option<CurrentUser>) -> Self {
        Self { notices, user }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: Option<T>,
    pub meta: Option<Meta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T, meta: Option<Meta>) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
            meta,
        }
    }
}

impl ApiResponse<()> {
    /// A page that carries no data of its own, only the request context.
    pub fn page(message: impl Into<String>, meta: Meta) -> Self {
        Self {
            message: message.into(),
            data: None,
            meta: Some(meta),
        }
    }
}
