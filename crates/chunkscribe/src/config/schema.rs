use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    /// Mount point of the shared working filesystem. Source files are
    /// addressed relative to it.
    pub workspace_directory: String,
    /// Root directory of the filesystem-backed object store.
    pub object_store_directory: String,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub fan_out: FanOutConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub transcription: TranscriptionConfig,
    #[serde(default)]
    pub aggregation: AggregationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_database_path() -> String {
    crate::db::default_database_path()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "chunkscribe.db".to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Slice length in seconds.
    #[serde(default = "default_chunk_duration")]
    pub chunk_duration_secs: f64,
    #[serde(default = "default_ffprobe")]
    pub ffprobe_path: String,
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg_path: String,
}

fn default_chunk_duration() -> f64 {
    30.0
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_duration_secs: default_chunk_duration(),
            ffprobe_path: default_ffprobe(),
            ffmpeg_path: default_ffmpeg(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanOutConfig {
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

fn default_max_concurrency() -> usize {
    5
}

impl Default for FanOutConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Delay between two completion checks of one execution.
    #[serde(default = "default_poll_interval")]
    pub interval_secs: u64,
    /// How often the scheduler looks for due executions.
    #[serde(default = "default_tick")]
    pub scheduler_tick_secs: u64,
    /// Unset means poll until the engine reports every job terminal.
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

fn default_poll_interval() -> u64 {
    30
}

fn default_tick() -> u64 {
    5
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval(),
            scheduler_tick_secs: default_tick(),
            max_attempts: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    #[serde(default = "default_language_code")]
    pub language_code: String,
}

fn default_language_code() -> String {
    "en-GB".to_string()
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            language_code: default_language_code(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationConfig {
    #[serde(default = "default_separator")]
    pub separator: String,
    /// Remove the execution's scratch directory once the transcript is written.
    #[serde(default = "default_true")]
    pub cleanup_workspace: bool,
}

fn default_separator() -> String {
    " ".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            separator: default_separator(),
            cleanup_workspace: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset, e.g. `info` or
    /// `chunkscribe=debug`.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config: Config = serde_json::from_str(
            r#"{"version":"1.0","workspace_directory":"/mnt/work","object_store_directory":"/srv/objects"}"#,
        )
        .unwrap();

        assert_eq!(config.chunking.chunk_duration_secs, 30.0);
        assert_eq!(config.fan_out.max_concurrency, 5);
        assert_eq!(config.polling.interval_secs, 30);
        assert_eq!(config.polling.max_attempts, None);
        assert_eq!(config.transcription.language_code, "en-GB");
        assert_eq!(config.aggregation.separator, " ");
        assert!(config.aggregation.cleanup_workspace);
        assert_eq!(config.logging.format, LogFormat::Text);
        assert!(config.database_path.ends_with("chunkscribe.db"));
    }

    #[test]
    fn test_log_format_lowercase() {
        let logging: LoggingConfig =
            serde_json::from_str(r#"{"level":"debug","format":"json"}"#).unwrap();
        assert_eq!(logging.format, LogFormat::Json);
        assert_eq!(logging.level, "debug");
    }
}
