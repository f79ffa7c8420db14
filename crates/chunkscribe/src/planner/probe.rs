use std::path::Path;
use std::process::Command;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::PlanningError;

// ffprobe -sexagesimal prints e.g. `0:01:15.000000`.
static RE_SEXAGESIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+):([0-5]?\d):([0-5]?\d(?:\.\d+)?)$").unwrap());

/// Reports the total duration of a media file in seconds.
pub trait MediaProbe: Send + Sync {
    fn duration(&self, path: &Path) -> Result<f64, PlanningError>;
}

/// Probes media with the `ffprobe` binary.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    binary: String,
}

impl FfprobeProbe {
    pub fn new(binary: &str) -> Self {
        Self {
            binary: binary.to_string(),
        }
    }
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl MediaProbe for FfprobeProbe {
    fn duration(&self, path: &Path) -> Result<f64, PlanningError> {
        if !path.is_file() {
            return Err(PlanningError::PlanningFailed {
                path: path.to_path_buf(),
                reason: "source file does not exist".to_string(),
            });
        }

        let output = Command::new(&self.binary)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
                "-sexagesimal",
            ])
            .arg(path)
            .output()
            .map_err(|e| PlanningError::ProbeFailed {
                path: path.to_path_buf(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(PlanningError::PlanningFailed {
                path: path.to_path_buf(),
                reason: format!(
                    "{} failed: {}",
                    self.binary,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let line = stdout.lines().next().unwrap_or_default();
        parse_sexagesimal(line)
    }
}

/// Parses `H:MM:SS[.fraction]` into seconds. Plain decimal seconds are
/// accepted as well.
pub fn parse_sexagesimal(value: &str) -> Result<f64, PlanningError> {
    let value = value.trim();

    if let Some(caps) = RE_SEXAGESIMAL.captures(value) {
        let field = |i: usize| -> Result<f64, PlanningError> {
            caps[i]
                .parse::<f64>()
                .map_err(|_| PlanningError::InvalidDuration(value.to_string()))
        };
        return Ok(field(1)? * 3600.0 + field(2)? * 60.0 + field(3)?);
    }

    match value.parse::<f64>() {
        Ok(seconds) if seconds.is_finite() => Ok(seconds),
        _ => Err(PlanningError::InvalidDuration(value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sexagesimal() {
        assert_eq!(parse_sexagesimal("0:01:15.000000").unwrap(), 75.0);
        assert_eq!(parse_sexagesimal("1:00:00.5").unwrap(), 3600.5);
        assert_eq!(parse_sexagesimal("0:00:30\n").unwrap(), 30.0);
        assert_eq!(parse_sexagesimal("12:05:09.250000").unwrap(), 43509.25);
    }

    #[test]
    fn test_parse_plain_seconds() {
        assert_eq!(parse_sexagesimal("75.250").unwrap(), 75.25);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_sexagesimal("N/A"),
            Err(PlanningError::InvalidDuration(_))
        ));
        assert!(parse_sexagesimal("").is_err());
        assert!(parse_sexagesimal("0:99:00").is_err());
        assert!(parse_sexagesimal("inf").is_err());
    }

    #[test]
    fn test_missing_file_fails_planning() {
        let probe = FfprobeProbe::default();
        let result = probe.duration(Path::new("/nonexistent/movie.mp4"));
        assert!(matches!(result, Err(PlanningError::PlanningFailed { .. })));
    }
}
