use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Minimum token-overlap ratios a catalog entry must reach, bucketed by how
/// many significant tokens the target name has.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchThresholds {
    /// Targets with at most 2 significant tokens.
    pub short: f64,
    /// Targets with 3 or 4 significant tokens.
    pub medium: f64,
    /// Targets with 5 or more significant tokens.
    pub long: f64,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self {
            short: 0.9,
            medium: 0.5,
            long: 0.4,
        }
    }
}

impl MatchThresholds {
    /// Threshold that applies to a target with `significant_tokens` tokens.
    #[must_use]
    pub fn for_token_count(&self, significant_tokens: usize) -> f64 {
        match significant_tokens {
            0..=2 => self.short,
            3..=4 => self.medium,
            _ => self.long,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub sites_path: PathBuf,
    pub data_dir: PathBuf,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub max_concurrent_sites: usize,
    pub inter_request_delay_ms: u64,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub browser_settle_ms: u64,
    pub match_thresholds: MatchThresholds,
    pub min_link_score: u32,
}
