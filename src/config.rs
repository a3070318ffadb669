use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::sync::error::{Result, SyncError};

/// Engine configuration.
///
/// `sources` is the ordered list of stream URLs; the index of a URL in
/// this list is the source id used everywhere else (frame packets, logs,
/// diagnostics).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    pub sources: Vec<String>,
    /// Largest tolerated spread between the first timestamps of the
    /// streams, in seconds. Exceeding it aborts the pipeline at startup.
    #[serde(default = "default_max_initial_stream_offset")]
    pub max_initial_stream_offset: f64,
    /// Consecutive read failures after which a source is retired.
    #[serde(default = "default_max_read_errors")]
    pub max_read_errors: u32,
    /// Capacity of the output packet buffer. The default of 1 gives
    /// latest-wins semantics for slow consumers.
    #[serde(default = "default_output_capacity")]
    pub output_capacity: usize,
}

fn default_max_initial_stream_offset() -> f64 {
    30.0
}

fn default_max_read_errors() -> u32 {
    3
}

fn default_output_capacity() -> usize {
    1
}

impl SyncConfig {
    /// Configuration with default tuning for the given sources.
    pub fn new(sources: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            sources: sources.into_iter().map(Into::into).collect(),
            max_initial_stream_offset: default_max_initial_stream_offset(),
            max_read_errors: default_max_read_errors(),
            output_capacity: default_output_capacity(),
        }
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| SyncError::InvalidConfig(e.to_string()))?;
        serde_json::from_str(&contents).map_err(|e| SyncError::InvalidConfig(e.to_string()))
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(SyncError::InvalidConfig("sources list is empty".to_string()));
        }
        if self.max_initial_stream_offset.is_nan() || self.max_initial_stream_offset <= 0.0 {
            return Err(SyncError::InvalidConfig(
                "max_initial_stream_offset must be positive".to_string(),
            ));
        }
        if self.max_read_errors == 0 {
            return Err(SyncError::InvalidConfig(
                "max_read_errors must be positive".to_string(),
            ));
        }
        if self.output_capacity == 0 {
            return Err(SyncError::InvalidConfig(
                "output_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn new_applies_documented_defaults() {
        let config = SyncConfig::new(["rtsp://cam-0"]);
        assert_eq!(config.max_initial_stream_offset, 30.0);
        assert_eq!(config.max_read_errors, 3);
        assert_eq!(config.output_capacity, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_sources_fail_validation() {
        let config = SyncConfig::new(Vec::<String>::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn non_positive_tuning_values_fail_validation() {
        let mut config = SyncConfig::new(["rtsp://cam-0"]);
        config.max_initial_stream_offset = 0.0;
        assert!(config.validate().is_err());

        let mut config = SyncConfig::new(["rtsp://cam-0"]);
        config.max_read_errors = 0;
        assert!(config.validate().is_err());

        let mut config = SyncConfig::new(["rtsp://cam-0"]);
        config.output_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn nan_offset_fails_validation() {
        let mut config = SyncConfig::new(["rtsp://cam-0"]);
        config.max_initial_stream_offset = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn serialises_to_camel_case_json() {
        let config = SyncConfig::new(["rtsp://cam-0"]);
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["sources"][0], "rtsp://cam-0");
        assert_eq!(json["maxInitialStreamOffset"], 30.0);
        assert_eq!(json["maxReadErrors"], 3);
        assert_eq!(json["outputCapacity"], 1);
        assert!(json.get("max_read_errors").is_none());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: SyncConfig =
            serde_json::from_str(r#"{"sources":["rtsp://cam-0","rtsp://cam-1"]}"#).unwrap();
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.max_initial_stream_offset, 30.0);
        assert_eq!(config.max_read_errors, 3);
        assert_eq!(config.output_capacity, 1);
    }

    #[test]
    fn round_trips_through_json() {
        let mut config = SyncConfig::new(["rtsp://cam-0", "rtsp://cam-1"]);
        config.output_capacity = 4;
        let json = serde_json::to_string(&config).unwrap();
        let restored: SyncConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, restored);
    }

    #[test]
    fn from_json_file_loads_a_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("streams.json");
        std::fs::write(
            &path,
            r#"{"sources":["rtsp://cam-0"],"maxReadErrors":5}"#,
        )
        .unwrap();

        let config = SyncConfig::from_json_file(&path).unwrap();
        assert_eq!(config.sources, vec!["rtsp://cam-0".to_string()]);
        assert_eq!(config.max_read_errors, 5);
    }

    #[test]
    fn from_json_file_reports_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = SyncConfig::from_json_file(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(SyncError::InvalidConfig(_))));
    }

    #[test]
    fn from_json_file_reports_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("streams.json");
        std::fs::write(&path, "not valid json!!!").unwrap();
        assert!(SyncConfig::from_json_file(&path).is_err());
    }
}
