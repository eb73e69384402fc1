pub mod api;
pub mod config;
pub mod db;
pub mod storage;

pub use db::DbPool;

use config::Config;
use storage::ImageStore;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub images: ImageStore,
}

impl AppState {
    pub fn new(config: Config, db: DbPool) -> Self {
        let images = ImageStore::new(config.storage.images_dir.clone());
        Self { config, db, images }
    }
}
