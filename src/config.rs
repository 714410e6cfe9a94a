// src/config.rs
use crate::types::{Config, HarvestError};
use log::warn;
use std::env;
use std::fmt::Display;
use std::fs;
use std::path::Path;
use std::time::Duration;

type Result<T> = std::result::Result<T, HarvestError>;

fn context<E: Display>(message: String) -> impl FnOnce(E) -> HarvestError {
    move |e| HarvestError::ConfigError(format!("{}: {}", message, e))
}

/// Load configuration from an optional TOML file, then apply environment
/// overrides. A missing file is not an error.
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    let mut config = Config::default();

    if let Some(path) = config_path {
        if Path::new(path).exists() {
            let contents = fs::read_to_string(path).map_err(context(format!("Failed to read config file {}", path)))?;
            apply_toml(&mut config, &contents)?;
        } else {
            warn!("Config file {} not found, using defaults", path);
        }
    }

    apply_env_overrides(&mut config);
    validate_config(&config)?;

    Ok(config)
}

pub fn apply_toml(config: &mut Config, contents: &str) -> Result<()> {
    let value: toml::Value = toml::from_str(contents).map_err(context("Failed to parse config file".to_string()))?;
    let table = match value.as_table() {
        Some(table) => table,
        None => return Ok(()),
    };

    if let Some(base_url) = table.get("base_url").and_then(|v| v.as_str()) {
        config.base_url = base_url.to_string();
    }
    if let Some(proxy) = table.get("proxy").and_then(|v| v.as_str()) {
        config.proxy = Some(proxy.to_string()).filter(|p| !p.is_empty());
    }
    if let Some(url_proxy) = table.get("url_proxy").and_then(|v| v.as_str()) {
        config.url_proxy = url_proxy.to_string();
    }
    if let Some(use_url_proxy) = table.get("use_url_proxy").and_then(|v| v.as_bool()) {
        config.use_url_proxy = use_url_proxy;
    }
    if let Some(timeout) = table.get("timeout_secs").and_then(|v| v.as_integer()) {
        config.timeout = Duration::from_secs(non_negative(timeout, "timeout_secs")?);
    }
    if let Some(user_agent) = table.get("user_agent").and_then(|v| v.as_str()) {
        config.user_agent = user_agent.to_string();
    }
    if let Some(rate_limit) = table.get("rate_limit").and_then(|v| v.as_integer()) {
        let rate_limit = non_negative(rate_limit, "rate_limit")?;
        config.rate_limit = if rate_limit == 0 { None } else { Some(rate_limit.min(u32::MAX as u64) as u32) };
    }

    if let Some(api_keys) = table.get("api_keys").and_then(|v| v.as_table()) {
        if let Some(keys) = api_keys.get("rapiddns").and_then(|v| v.as_array()) {
            config.api_keys = keys.iter().filter_map(|v| v.as_str().map(|s| s.to_string())).collect();
        }
    }

    if let Some(harvest) = table.get("harvest").and_then(|v| v.as_table()) {
        if let Some(max) = harvest.get("max_records").and_then(|v| v.as_integer()) {
            config.harvest.max_records = non_negative(max, "harvest.max_records")? as usize;
        }
        if let Some(delay) = harvest.get("page_delay_ms").and_then(|v| v.as_integer()) {
            config.harvest.page_delay = Duration::from_millis(non_negative(delay, "harvest.page_delay_ms")?);
        }
        if let Some(deadline) = harvest.get("deadline_secs").and_then(|v| v.as_integer()) {
            let secs = non_negative(deadline, "harvest.deadline_secs")?;
            config.harvest.deadline = if secs == 0 { None } else { Some(Duration::from_secs(secs)) };
        }
        if let Some(flag) = harvest.get("extract_subdomains").and_then(|v| v.as_bool()) {
            config.harvest.extract_subdomains = flag;
        }
        if let Some(flag) = harvest.get("extract_ips").and_then(|v| v.as_bool()) {
            config.harvest.extract_ips = flag;
        }
    }

    Ok(())
}

fn non_negative(value: i64, key: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| HarvestError::ConfigError(format!("{} must not be negative", key)))
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(keys) = env::var("RAPIDDNS_API_KEYS") {
        config.api_keys = keys
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }
    if let Ok(proxy) = env::var("RAPIDDNS_PROXY") {
        config.proxy = Some(proxy).filter(|p| !p.is_empty());
    }
    if let Ok(url_proxy) = env::var("RAPIDDNS_URL_PROXY") {
        config.use_url_proxy = !url_proxy.is_empty();
        if config.use_url_proxy {
            config.url_proxy = url_proxy;
        }
    }
    if let Ok(base_url) = env::var("RAPIDDNS_BASE_URL") {
        config.base_url = base_url;
    }
}

pub fn validate_config(config: &Config) -> Result<()> {
    if config.timeout.as_secs() == 0 {
        return Err(HarvestError::ConfigError("Timeout must be greater than 0".to_string()));
    }
    if url::Url::parse(&config.base_url).is_err() {
        return Err(HarvestError::ConfigError(format!("Invalid base URL: {}", config.base_url)));
    }
    if config.use_url_proxy && config.url_proxy.is_empty() {
        return Err(HarvestError::ConfigError("URL proxy enabled but no prefix configured".to_string()));
    }
    Ok(())
}
