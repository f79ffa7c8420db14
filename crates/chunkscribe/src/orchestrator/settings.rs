use std::time::Duration;

use crate::config::Config;

/// Runtime knobs of the orchestrator, decoupled from the config file format.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorSettings {
    pub chunk_duration_secs: f64,
    pub max_concurrency: usize,
    pub poll_interval: Duration,
    pub scheduler_tick: Duration,
    pub max_poll_attempts: Option<u32>,
    pub language_code: String,
    pub separator: String,
    pub cleanup_workspace: bool,
}

impl OrchestratorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunk_duration_secs: config.chunking.chunk_duration_secs,
            max_concurrency: config.fan_out.max_concurrency,
            poll_interval: Duration::from_secs(config.polling.interval_secs),
            scheduler_tick: Duration::from_secs(config.polling.scheduler_tick_secs),
            max_poll_attempts: config.polling.max_attempts,
            language_code: config.transcription.language_code.clone(),
            separator: config.aggregation.separator.clone(),
            cleanup_workspace: config.aggregation.cleanup_workspace,
        }
    }

    /// Delay until the next completion check, as a wall-clock offset.
    pub fn poll_delay(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.poll_interval)
            .unwrap_or_else(|_| chrono::Duration::days(365))
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            chunk_duration_secs: 30.0,
            max_concurrency: 5,
            poll_interval: Duration::from_secs(30),
            scheduler_tick: Duration::from_secs(5),
            max_poll_attempts: None,
            language_code: "en-GB".to_string(),
            separator: " ".to_string(),
            cleanup_workspace: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;

    #[test]
    fn test_from_config() {
        let config = load_config_from_str(
            r#"{
                "version": "1.0",
                "workspace_directory": "/mnt/work",
                "object_store_directory": "/srv/objects",
                "fan_out": { "max_concurrency": 2 },
                "polling": { "interval_secs": 10, "max_attempts": 4 },
                "aggregation": { "separator": "\n" }
            }"#,
        )
        .unwrap();

        let settings = OrchestratorSettings::from_config(&config);
        assert_eq!(settings.max_concurrency, 2);
        assert_eq!(settings.poll_interval, Duration::from_secs(10));
        assert_eq!(settings.max_poll_attempts, Some(4));
        assert_eq!(settings.separator, "\n");
        assert_eq!(settings.chunk_duration_secs, 30.0);
        assert_eq!(settings.poll_delay(), chrono::Duration::seconds(10));
    }

    #[test]
    fn test_defaults_match_config_defaults() {
        let config = load_config_from_str(
            r#"{"version":"1.0","workspace_directory":"/w","object_store_directory":"/o"}"#,
        )
        .unwrap();
        assert_eq!(OrchestratorSettings::from_config(&config), OrchestratorSettings::default());
    }
}
