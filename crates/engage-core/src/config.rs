use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
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
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can drive it from a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let optional =
        |var: &str| -> Option<String> { lookup(var).ok().filter(|v| !v.trim().is_empty()) };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let database_url = require("DATABASE_URL")?;
    let reward_public_url = require("ENGAGE_REWARD_PUBLIC_URL")?;

    let env = parse_environment(&or_default("ENGAGE_ENV", "development"))?;
    let log_level = or_default("ENGAGE_LOG_LEVEL", "info");
    let tenants_path = PathBuf::from(or_default("ENGAGE_TENANTS_PATH", "./config/tenants.yaml"));
    let vault_private_key = optional("ENGAGE_VAULT_PRIVATE_KEY");

    let db_max_connections = parse_u32("ENGAGE_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("ENGAGE_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("ENGAGE_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let upstream_base_url = or_default("ENGAGE_UPSTREAM_BASE_URL", "https://api.twitter.com/");
    let upstream_timeout_secs = parse_u64("ENGAGE_UPSTREAM_TIMEOUT_SECS", "15")?;
    let upstream_page_size = parse_u32("ENGAGE_UPSTREAM_PAGE_SIZE", "10")?;
    if !(10..=100).contains(&upstream_page_size) {
        return Err(ConfigError::InvalidEnvVar {
            var: "ENGAGE_UPSTREAM_PAGE_SIZE".to_string(),
            reason: format!("{upstream_page_size} is outside the accepted range 10..=100"),
        });
    }
    let recent_post_limit = parse_usize("ENGAGE_RECENT_POST_LIMIT", "5")?;
    if recent_post_limit == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "ENGAGE_RECENT_POST_LIMIT".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    let reward_internal_url = optional("ENGAGE_REWARD_INTERNAL_URL");
    let reward_api_key = optional("ENGAGE_REWARD_API_KEY");
    let dispatch_timeout_secs = parse_u64("ENGAGE_DISPATCH_TIMEOUT_SECS", "10")?;
    let synthetic_email_domain =
        or_default("ENGAGE_SYNTHETIC_EMAIL_DOMAIN", "x.engagement.invalid");

    let tenant_deadline_secs = parse_u64("ENGAGE_TENANT_DEADLINE_SECS", "120")?;
    let max_concurrent_tenants = parse_usize("ENGAGE_MAX_CONCURRENT_TENANTS", "1")?.max(1);
    let poll_cron = or_default("ENGAGE_POLL_CRON", "0 */5 * * * *");

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        tenants_path,
        vault_private_key,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        upstream_base_url,
        upstream_timeout_secs,
        upstream_page_size,
        recent_post_limit,
        reward_internal_url,
        reward_public_url,
        reward_api_key,
        dispatch_timeout_secs,
        synthetic_email_domain,
        tenant_deadline_secs,
        max_concurrent_tenants,
        poll_cron,
    })
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "ENGAGE_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
