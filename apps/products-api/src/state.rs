//! Application state management

use std::sync::Arc;

use domain_products::{
    LocalThumbnailStore, MongoCategoryLookup, MongoProductDao, ProductService, ProductStore,
};
use mongodb::{Client, Database};

use crate::config::Config;

/// Public path prefix stored thumbnails are served from
pub const UPLOADS_PATH: &str = "/uploads";

pub type CatalogService = ProductService<ProductStore<MongoProductDao>>;

/// Shared application state, built once at startup
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub mongo_client: Client,
    pub db: Database,
}

impl AppState {
    pub fn new(config: Config, mongo_client: Client) -> Self {
        let db = mongo_client.database(config.mongodb.database());
        Self {
            config,
            mongo_client,
            db,
        }
    }

    pub fn product_dao(&self) -> MongoProductDao {
        MongoProductDao::new(&self.db)
    }

    /// Wire DAO, repository, category lookup and thumbnail storage into the service
    pub fn product_service(&self) -> CatalogService {
        ProductService::new(
            ProductStore::new(self.product_dao()),
            Arc::new(MongoCategoryLookup::new(&self.db)),
            Arc::new(LocalThumbnailStore::new(
                &self.config.upload_dir,
                UPLOADS_PATH,
            )),
        )
    }
}
