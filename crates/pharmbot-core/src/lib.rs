use thiserror::Error;

pub mod app_config;
pub mod config;
pub mod query;
pub mod record;

pub use app_config::{AppConfig, ScrapeConfig, WebhookConfig};
pub use config::{load_app_config, load_app_config_from_env};
pub use query::{find_postcode, is_valid_identifier, normalize_postcode, QueryError, SearchQuery};
pub use record::{PharmacyRecord, ServiceMetrics};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
