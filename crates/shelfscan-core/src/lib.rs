pub mod app_config;
pub mod config;
pub mod identifier;
pub mod record;
pub mod sites;

pub use app_config::{AppConfig, Environment, MatchThresholds};
pub use config::{load_app_config, load_app_config_from_env};
pub use identifier::{sanitize_file_stem, slugify, ColumnMap, Identifier};
pub use record::{ExtractionRecord, PageType, RecordStatus};
pub use sites::{
    load_sites, ColumnOverrides, ExtractOverrides, FetcherKind, SiteConfig, SitesFile,
    StrategyKind,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read sites file {path}: {source}")]
    SitesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse sites file: {0}")]
    SitesFileParse(#[from] serde_yaml::Error),

    #[error("configuration validation failed: {0}")]
    Validation(String),
}
