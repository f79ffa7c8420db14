use std::path::Path;
use std::str::FromStr;

use log::warn;

use crate::config::schema::Config;
use crate::error::ConfigError;

pub const SUPPORTED_VERSION: &str = "1.0";

/// Upper bound for the poll interval and scheduler tick: one week.
pub const MAX_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != SUPPORTED_VERSION {
        return Err(validation(format!(
            "Unsupported config version: {}",
            config.version
        )));
    }

    if config.workspace_directory.trim().is_empty() {
        return Err(validation("workspace_directory must not be empty"));
    }
    if config.object_store_directory.trim().is_empty() {
        return Err(validation("object_store_directory must not be empty"));
    }

    let slice = config.chunking.chunk_duration_secs;
    if !slice.is_finite() || slice <= 0.0 {
        return Err(validation(format!(
            "chunking.chunk_duration_secs must be positive, got {}",
            slice
        )));
    }

    if config.fan_out.max_concurrency == 0 {
        return Err(validation("fan_out.max_concurrency must be at least 1"));
    }

    if config.polling.interval_secs == 0 {
        return Err(validation("polling.interval_secs must be at least 1"));
    }
    if config.polling.interval_secs > MAX_INTERVAL_SECS {
        return Err(validation(format!(
            "polling.interval_secs must be at most {}, got {}",
            MAX_INTERVAL_SECS, config.polling.interval_secs
        )));
    }
    if config.polling.scheduler_tick_secs == 0 {
        return Err(validation("polling.scheduler_tick_secs must be at least 1"));
    }
    if config.polling.scheduler_tick_secs > MAX_INTERVAL_SECS {
        return Err(validation(format!(
            "polling.scheduler_tick_secs must be at most {}, got {}",
            MAX_INTERVAL_SECS, config.polling.scheduler_tick_secs
        )));
    }
    if config.polling.max_attempts == Some(0) {
        return Err(validation("polling.max_attempts must be at least 1 when set"));
    }

    if config.transcription.language_code.trim().is_empty() {
        return Err(validation("transcription.language_code must not be empty"));
    }

    Ok(())
}

fn validation(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}

impl Config {
    /// Overrides tuning knobs from `CHUNKSCRIBE_*` environment variables.
    /// Values that fail to parse are skipped with a warning. Call
    /// [`validate_config`] afterwards.
    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = env_parse::<f64>("CHUNKSCRIBE_CHUNK_DURATION_SECS") {
            self.chunking.chunk_duration_secs = v;
        }
        if let Some(v) = env_parse::<usize>("CHUNKSCRIBE_MAX_CONCURRENCY") {
            self.fan_out.max_concurrency = v;
        }
        if let Some(v) = env_parse::<u64>("CHUNKSCRIBE_POLL_INTERVAL_SECS") {
            self.polling.interval_secs = v;
        }
        if let Some(v) = env_parse::<u32>("CHUNKSCRIBE_MAX_POLL_ATTEMPTS") {
            self.polling.max_attempts = Some(v);
        }
        if let Ok(v) = std::env::var("CHUNKSCRIBE_LANGUAGE_CODE") {
            if !v.trim().is_empty() {
                self.transcription.language_code = v;
            }
        }
        if let Ok(v) = std::env::var("CHUNKSCRIBE_DATABASE_PATH") {
            if !v.trim().is_empty() {
                self.database_path = v;
            }
        }
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {}: cannot parse '{}'", name, raw);
            None
        }
    }
}
