use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::sync::Arc;

use crate::config::Config;
use crate::storage::BlobClients;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Arc<Config>,
    pub blobs: BlobClients,
}

impl AppState {
    pub fn new(db: DbPool, config: Config, blobs: BlobClients) -> Self {
        Self {
            db,
            config: Arc::new(config),
            blobs,
        }
    }
}
