//! MongoDB connection management for the catalog services.
//!
//! ```ignore
//! use core_config::FromEnv;
//! use database::mongodb::{MongoConfig, connect_from_config_with_retry};
//!
//! let config = MongoConfig::from_env()?;
//! let client = connect_from_config_with_retry(&config, None).await?;
//! let db = client.database(config.database());
//! ```

pub mod mongodb;
pub mod retry;

pub use retry::{RetryConfig, retry, retry_with_backoff};
