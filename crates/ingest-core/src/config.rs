//! Configuration module
//!
//! Pipeline configuration is read from the environment (optionally via a `.env` file).
//! Every setting has a default, so `IngestConfig::default()` is a complete configuration.

use std::env;

use crate::constants::{
    DEFAULT_IMAGE_CONTENT_TYPES, DEFAULT_STORAGE_KEY_PREFIX, DEFAULT_UPLOAD_CHUNK_SIZE,
    DEFAULT_VIDEO_CONTENT_TYPES, MAX_VIDEO_SIZE_BYTES,
};
use crate::storage_types::StorageBackend;

const LOCAL_STORAGE_PATH: &str = "./media";
const LOCAL_STORAGE_BASE_URL: &str = "http://localhost:3000/media";

/// Output format for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Clone, Debug)]
pub struct IngestConfig {
    pub environment: String,
    pub log_format: LogFormat,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub local_storage_path: String,
    pub local_storage_base_url: String,
    pub storage_key_prefix: String,
    pub upload_chunk_size_bytes: usize,
    // Classification
    pub max_video_size_bytes: usize,
    pub image_allowed_content_types: Vec<String>,
    pub video_allowed_content_types: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            log_format: LogFormat::Pretty,
            storage_backend: StorageBackend::Local,
            local_storage_path: LOCAL_STORAGE_PATH.to_string(),
            local_storage_base_url: LOCAL_STORAGE_BASE_URL.to_string(),
            storage_key_prefix: DEFAULT_STORAGE_KEY_PREFIX.to_string(),
            upload_chunk_size_bytes: DEFAULT_UPLOAD_CHUNK_SIZE,
            max_video_size_bytes: MAX_VIDEO_SIZE_BYTES,
            image_allowed_content_types: to_strings(DEFAULT_IMAGE_CONTENT_TYPES),
            video_allowed_content_types: to_strings(DEFAULT_VIDEO_CONTENT_TYPES),
        }
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse a size given in `unit`-byte units into bytes.
fn parse_scaled(name: &str, value: &str, unit: usize) -> Result<usize, anyhow::Error> {
    let amount = value
        .trim()
        .parse::<usize>()
        .map_err(|_| anyhow::anyhow!("{} must be a valid number", name))?;
    amount
        .checked_mul(unit)
        .ok_or_else(|| anyhow::anyhow!("{} is too large: {}", name, amount))
}

impl IngestConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or(defaults.environment);

        let log_format = match env::var("LOG_FORMAT") {
            Ok(value) => match value.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" | "text" => LogFormat::Pretty,
                other => return Err(anyhow::anyhow!("Invalid LOG_FORMAT: {}", other)),
            },
            Err(_) => defaults.log_format,
        };

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(value) => value.parse::<StorageBackend>()?,
            Err(_) => defaults.storage_backend,
        };

        let max_video_size_bytes = match env::var("MAX_VIDEO_SIZE_MB") {
            Ok(value) => parse_scaled("MAX_VIDEO_SIZE_MB", &value, 1024 * 1024)?,
            Err(_) => defaults.max_video_size_bytes,
        };

        let upload_chunk_size_bytes = match env::var("UPLOAD_CHUNK_SIZE_KB") {
            Ok(value) => parse_scaled("UPLOAD_CHUNK_SIZE_KB", &value, 1024)?,
            Err(_) => defaults.upload_chunk_size_bytes,
        };

        let config = IngestConfig {
            environment,
            log_format,
            storage_backend,
            local_storage_path: env::var("LOCAL_STORAGE_PATH")
                .unwrap_or(defaults.local_storage_path),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL")
                .unwrap_or(defaults.local_storage_base_url),
            storage_key_prefix: env::var("STORAGE_KEY_PREFIX")
                .map(|s| s.trim().trim_matches('/').to_string())
                .unwrap_or(defaults.storage_key_prefix),
            upload_chunk_size_bytes,
            max_video_size_bytes,
            image_allowed_content_types: env::var("IMAGE_ALLOWED_CONTENT_TYPES")
                .map(|s| parse_list(&s))
                .unwrap_or(defaults.image_allowed_content_types),
            video_allowed_content_types: env::var("VIDEO_ALLOWED_CONTENT_TYPES")
                .map(|s| parse_list(&s))
                .unwrap_or(defaults.video_allowed_content_types),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.upload_chunk_size_bytes == 0 {
            return Err(anyhow::anyhow!("UPLOAD_CHUNK_SIZE_KB must be greater than 0"));
        }
        if self.max_video_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_VIDEO_SIZE_MB must be greater than 0"));
        }
        if self.storage_key_prefix.is_empty() || self.storage_key_prefix.contains("..") {
            return Err(anyhow::anyhow!(
                "STORAGE_KEY_PREFIX must be a non-empty relative path segment"
            ));
        }
        if self.storage_backend == StorageBackend::Local && self.local_storage_path.is_empty() {
            return Err(anyhow::anyhow!(
                "LOCAL_STORAGE_PATH must be set for the local storage backend"
            ));
        }
        Ok(())
    }

    /// Check if the pipeline is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }
}
