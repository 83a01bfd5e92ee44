use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{CatalogEntry, Item};

#[derive(Debug, Serialize, ToSchema)]
pub struct CatalogPage {
    pub items: Vec<CatalogEntry>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EditPage {
    pub item: Item,
}
