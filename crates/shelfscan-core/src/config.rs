use crate::app_config::{AppConfig, Environment, MatchThresholds};
use crate::ConfigError;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_ratio = |var: &str, default: &str| -> Result<f64, ConfigError> {
        let value = or_default(var, default)
            .parse::<f64>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if (0.0..=1.0).contains(&value) {
            Ok(value)
        } else {
            Err(invalid(var, format!("{value} is outside 0.0..=1.0")))
        }
    };

    let env = parse_environment(&or_default("SHELFSCAN_ENV", "development"))?;
    let log_level = or_default("SHELFSCAN_LOG_LEVEL", "info");
    let sites_path = PathBuf::from(or_default("SHELFSCAN_SITES_PATH", "./config/sites.yaml"));
    let data_dir = PathBuf::from(or_default("SHELFSCAN_DATA_DIR", "./data"));

    let request_timeout_secs = parse_u64("SHELFSCAN_REQUEST_TIMEOUT_SECS", "20")?;
    let user_agent = or_default("SHELFSCAN_USER_AGENT", DEFAULT_USER_AGENT);
    let max_concurrent_sites = parse_usize("SHELFSCAN_MAX_CONCURRENT_SITES", "3")?;
    if max_concurrent_sites == 0 {
        return Err(invalid(
            "SHELFSCAN_MAX_CONCURRENT_SITES",
            "must be at least 1".to_string(),
        ));
    }
    let inter_request_delay_ms = parse_u64("SHELFSCAN_INTER_REQUEST_DELAY_MS", "1000")?;
    let max_retries = parse_u32("SHELFSCAN_MAX_RETRIES", "2")?;
    let retry_backoff_base_ms = parse_u64("SHELFSCAN_RETRY_BACKOFF_BASE_MS", "1000")?;
    let browser_settle_ms = parse_u64("SHELFSCAN_BROWSER_SETTLE_MS", "3000")?;

    let match_thresholds = MatchThresholds {
        short: parse_ratio("SHELFSCAN_MATCH_SHORT", "0.9")?,
        medium: parse_ratio("SHELFSCAN_MATCH_MEDIUM", "0.5")?,
        long: parse_ratio("SHELFSCAN_MATCH_LONG", "0.4")?,
    };
    let min_link_score = parse_u32("SHELFSCAN_MIN_LINK_SCORE", "1")?;

    Ok(AppConfig {
        env,
        log_level,
        sites_path,
        data_dir,
        request_timeout_secs,
        user_agent,
        max_concurrent_sites,
        inter_request_delay_ms,
        max_retries,
        retry_backoff_base_ms,
        browser_settle_ms,
        match_thresholds,
        min_link_score,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for unrecognized values.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "SHELFSCAN_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
