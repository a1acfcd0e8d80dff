//! Numeric configuration the engine consumes.
//!
//! Values come from a TOML file and `STATSTRACE_*` environment variables
//! (later wins), and are clamped by [`TracerSettings::normalized`].
//!
//! ```toml
//! sample_window_size = 2048
//! sample_frequency = 5
//! session_capacity = 10
//! memory_limit_mb = 128
//! csv_output_dir = "/tmp/StatsTracer"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;

pub const MIN_SAMPLE_WINDOW_SIZE: u32 = 512;
pub const MAX_SAMPLE_WINDOW_SIZE: u32 = 16384;
pub const MIN_SAMPLE_FREQUENCY: u32 = 1;
pub const MAX_SAMPLE_FREQUENCY: u32 = 120;
pub const MAX_SESSION_CAPACITY: u32 = 100;
pub const MIN_MEMORY_LIMIT_MB: u32 = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TracerSettings {
    /// Samples kept per data source. Power of two, 512-16384.
    #[serde(default = "TracerSettings::default_sample_window_size")]
    pub sample_window_size: u32,

    /// Sample every n-th tick, 1-120.
    #[serde(default = "TracerSettings::default_sample_frequency")]
    pub sample_frequency: u32,

    /// Sessions kept before the oldest is evicted. Zero keeps everything.
    #[serde(default = "TracerSettings::default_session_capacity")]
    pub session_capacity: u32,

    /// Byte budget for all retained samples, in megabytes.
    #[serde(default = "TracerSettings::default_memory_limit_mb")]
    pub memory_limit_mb: u32,

    /// Root directory for CSV export.
    #[serde(default = "TracerSettings::default_csv_output_dir")]
    pub csv_output_dir: PathBuf,
}

impl TracerSettings {
    fn default_sample_window_size() -> u32 {
        1024
    }

    fn default_sample_frequency() -> u32 {
        1
    }

    fn default_session_capacity() -> u32 {
        10
    }

    fn default_memory_limit_mb() -> u32 {
        128
    }

    fn default_csv_output_dir() -> PathBuf {
        std::env::temp_dir().join("StatsTracer")
    }

    /// Loads `path` if it exists, then applies environment overrides.
    /// The result is normalized.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = match path {
            Some(p) if p.exists() => {
                let content = std::fs::read_to_string(p).map_err(|e| ConfigError::FileRead {
                    path: p.to_path_buf(),
                    source: e,
                })?;
                Self::parse_toml(&content, p)?
            }
            _ => Self::default(),
        };
        settings.apply_env_overrides();
        Ok(settings.normalized())
    }

    pub fn parse_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = env_u32("STATSTRACE_SAMPLE_WINDOW_SIZE") {
            self.sample_window_size = v;
        }
        if let Some(v) = env_u32("STATSTRACE_SAMPLE_FREQUENCY") {
            self.sample_frequency = v;
        }
        if let Some(v) = env_u32("STATSTRACE_SESSION_CAPACITY") {
            self.session_capacity = v;
        }
        if let Some(v) = env_u32("STATSTRACE_MEMORY_LIMIT_MB") {
            self.memory_limit_mb = v;
        }
        if let Ok(dir) = std::env::var("STATSTRACE_CSV_DIR") {
            self.csv_output_dir = PathBuf::from(dir);
        }
    }

    /// Clamps every value into its documented range. The window size is
    /// rounded up to the next power of two first.
    pub fn normalized(mut self) -> Self {
        self.sample_window_size = self
            .sample_window_size
            .max(1)
            .checked_next_power_of_two()
            .unwrap_or(MAX_SAMPLE_WINDOW_SIZE)
            .clamp(MIN_SAMPLE_WINDOW_SIZE, MAX_SAMPLE_WINDOW_SIZE);
        self.sample_frequency = self.sample_frequency.clamp(MIN_SAMPLE_FREQUENCY, MAX_SAMPLE_FREQUENCY);
        self.session_capacity = self.session_capacity.min(MAX_SESSION_CAPACITY);
        self.memory_limit_mb = self.memory_limit_mb.max(MIN_MEMORY_LIMIT_MB);
        self
    }
}

impl Default for TracerSettings {
    fn default() -> Self {
        Self {
            sample_window_size: Self::default_sample_window_size(),
            sample_frequency: Self::default_sample_frequency(),
            session_capacity: Self::default_session_capacity(),
            memory_limit_mb: Self::default_memory_limit_mb(),
            csv_output_dir: Self::default_csv_output_dir(),
        }
    }
}

fn env_u32(key: &str) -> Option<u32> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("Ignoring {}={:?}: not an unsigned integer", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_rounds_up_to_power_of_two() {
        let s = TracerSettings { sample_window_size: 1000, ..Default::default() }.normalized();
        assert_eq!(s.sample_window_size, 1024);
        let s = TracerSettings { sample_window_size: 3, ..Default::default() }.normalized();
        assert_eq!(s.sample_window_size, 512);
        let s = TracerSettings { sample_window_size: 40000, ..Default::default() }.normalized();
        assert_eq!(s.sample_window_size, 16384);
    }

    #[test]
    fn test_clamps_frequency_capacity_and_memory() {
        let s = TracerSettings {
            sample_frequency: 0,
            session_capacity: 500,
            memory_limit_mb: 1,
            ..Default::default()
        }
        .normalized();
        assert_eq!(s.sample_frequency, 1);
        assert_eq!(s.session_capacity, 100);
        assert_eq!(s.memory_limit_mb, 4);

        let s = TracerSettings { sample_frequency: 999, ..Default::default() }.normalized();
        assert_eq!(s.sample_frequency, 120);
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml = r#"
sample_frequency = 5
memory_limit_mb = 64
"#;
        let s = TracerSettings::parse_toml(toml, Path::new("test.toml")).unwrap();
        assert_eq!(s.sample_frequency, 5);
        assert_eq!(s.memory_limit_mb, 64);
        assert_eq!(s.sample_window_size, 1024);
        assert_eq!(s.session_capacity, 10);
    }

    #[test]
    fn test_parse_error_names_file() {
        let err = TracerSettings::parse_toml("sample_frequency = \"fast\"", Path::new("bad.toml")).unwrap_err();
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("statstrace.toml");
        std::fs::write(&path, "sample_window_size = 600\nsession_capacity = 3\n").unwrap();
        let s = TracerSettings::load_from(Some(&path)).unwrap();
        assert_eq!(s.sample_window_size, 1024);
        assert_eq!(s.session_capacity, 3);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let s = TracerSettings::load_from(Some(Path::new("/nonexistent/statstrace.toml"))).unwrap();
        assert_eq!(s.sample_frequency, 1);
    }
}
