//! Configuration for Products API

use std::path::PathBuf;

use core_config::{
    app_info, env_list, env_or_default, server::ServerConfig, AppInfo, ConfigError, FromEnv,
};
use database::mongodb::MongoConfig;

pub use core_config::Environment;

/// Origins allowed when `CORS_ALLOWED_ORIGIN` is unset outside production
const DEV_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://localhost:5173"];

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub environment: Environment,
    pub server: ServerConfig,
    pub mongodb: MongoConfig,
    pub cors_origins: Vec<String>,
    /// Directory thumbnails are written to; served under `/uploads`
    pub upload_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = Environment::from_env();

        let cors_origins = match env_list("CORS_ALLOWED_ORIGIN") {
            Some(origins) => origins,
            None if environment.is_production() => {
                return Err(ConfigError::MissingEnvVar(
                    "CORS_ALLOWED_ORIGIN".to_string(),
                ));
            }
            None => DEV_ORIGINS.iter().map(|s| s.to_string()).collect(),
        };

        Ok(Self {
            app: app_info!(),
            server: ServerConfig::from_env()?,
            mongodb: MongoConfig::from_env()?,
            cors_origins,
            upload_dir: PathBuf::from(env_or_default("UPLOAD_DIR", "public/uploads")),
            environment,
        })
    }
}
