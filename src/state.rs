use std::sync::Arc;

use crate::{
    config::TextgenConfig,
    db::{DbPool, OrmConn, create_orm_conn},
    upload::ImageStore,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub images: ImageStore,
    pub textgen: Arc<TextgenConfig>,
}

impl AppState {
    pub fn new(pool: DbPool, images: ImageStore, textgen: TextgenConfig) -> Self {
        let orm = create_orm_conn(&pool);
        Self {
            pool,
            orm,
            images,
            textgen: Arc::new(textgen),
        }
    }
}
