use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{HistoryEntry, HistoryKind};

#[derive(Debug, Serialize, ToSchema)]
pub struct History {
    pub kind: HistoryKind,
    pub entries: Vec<HistoryEntry>,
}
