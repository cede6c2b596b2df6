//! Products Domain
//!
//! Product catalog backed by MongoDB: paginated listing with typed filters,
//! search, create (with thumbnail upload), bulk insert, partial update, and
//! soft/hard delete.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← HTTP endpoints, query parsing, page URLs
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Service   │  ← Validation, uniqueness, DTO shaping
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │ Repository  │  ← ProductStore over any DAO
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │     DAO     │  ← MongoDB or in-memory
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use domain_products::{
//!     handlers, LocalThumbnailStore, MongoCategoryLookup, MongoProductDao, ProductService,
//!     ProductStore,
//! };
//! use mongodb::Client;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::with_uri_str("mongodb://localhost:27017").await?;
//! let db = client.database("catalog");
//!
//! let dao = MongoProductDao::new(&db);
//! dao.init_indexes().await?;
//!
//! let service = ProductService::new(
//!     ProductStore::new(dao),
//!     Arc::new(MongoCategoryLookup::new(&db)),
//!     Arc::new(LocalThumbnailStore::new("public/uploads", "/uploads")),
//! );
//!
//! let router = handlers::router(service);
//! # Ok(())
//! # }
//! ```

pub mod category;
pub mod dao;
pub mod error;
pub mod handlers;
pub mod memory;
pub mod models;
pub mod mongodb;
pub mod query;
pub mod repository;
pub mod service;
pub mod uploads;

pub use category::CategoryLookup;
pub use dao::ProductDao;
pub use error::{ProductError, ProductResult};
pub use handlers::ApiDoc;
pub use memory::{InMemoryCategoryLookup, InMemoryProductDao};
pub use models::{
    ApiResponse, CreateProduct, FileUpload, Product, ProductDto, ProductPatch, UpdateProduct,
};
pub use self::mongodb::{MongoCategoryLookup, MongoProductDao};
pub use query::{ListParams, Page, PageOptions, ProductQuery};
pub use repository::{ProductRepository, ProductStore};
pub use service::ProductService;
pub use uploads::{LocalThumbnailStore, ThumbnailStore};
