//! Streamer configuration
//!
//! Loaded from a JSON file, then overlaid with environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::provider::CameraFacing;
use crate::session::StreamTarget;

/// Overrides `ingest_url`
pub const ENV_INGEST_URL: &str = "LIVE_STREAMER_INGEST_URL";

/// Overrides `log_filter`
pub const ENV_LOG_FILTER: &str = "LIVE_STREAMER_LOG";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write config {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamerConfig {
    /// RTMP ingest endpoint including the stream key
    pub ingest_url: String,

    /// Camera opened when the provider binds
    pub default_camera: CameraFacing,

    /// Let the provider adapt bitrate to the network
    pub adaptive_streaming: bool,

    /// Application id used for the settings deep link
    pub app_package: String,

    /// `tracing` filter used when `RUST_LOG` is not set
    pub log_filter: String,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            ingest_url: "rtmp://localhost/live/stream".to_string(),
            default_camera: CameraFacing::Back,
            adaptive_streaming: true,
            app_package: "com.example.streamer".to_string(),
            log_filter: "live_streamer_lib=info".to_string(),
        }
    }
}

impl StreamerConfig {
    /// Load and validate a JSON config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config = Self::from_json_str(&contents)?;
        tracing::debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Parse and validate; missing fields take their defaults
    pub fn from_json_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| ConfigError::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Apply environment overrides. Returns the names of variables applied.
    pub fn apply_env_overrides(&mut self) -> Vec<&'static str> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Vec<&'static str> {
        let mut applied = Vec::new();
        if let Some(url) = lookup(ENV_INGEST_URL) {
            self.ingest_url = url;
            applied.push(ENV_INGEST_URL);
        }
        if let Some(filter) = lookup(ENV_LOG_FILTER) {
            self.log_filter = filter;
            applied.push(ENV_LOG_FILTER);
        }
        applied
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.ingest_url.trim();
        if url.is_empty() {
            return Err(ConfigError::Invalid {
                field: "ingestUrl",
                reason: "must not be empty".to_string(),
            });
        }
        if !(url.starts_with("rtmp://") || url.starts_with("rtmps://")) {
            return Err(ConfigError::Invalid {
                field: "ingestUrl",
                reason: format!("expected an rtmp:// or rtmps:// URL, got '{}'", url),
            });
        }
        if self.app_package.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "appPackage",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn stream_target(&self) -> StreamTarget {
        StreamTarget::new(self.ingest_url.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config =
            StreamerConfig::from_json_str(r#"{"ingestUrl": "rtmp://10.0.0.2/live/abc"}"#).unwrap();
        assert_eq!(config.ingest_url, "rtmp://10.0.0.2/live/abc");
        assert_eq!(config.default_camera, CameraFacing::Back);
        assert!(config.adaptive_streaming);
    }

    #[test]
    fn test_rejects_non_rtmp_url() {
        let err = StreamerConfig::from_json_str(r#"{"ingestUrl": "http://host/live"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "ingestUrl", .. }));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = StreamerConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [(ENV_INGEST_URL, "rtmps://cdn/live/key")].into();
        let mut config = StreamerConfig::default();

        let applied = config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(applied, vec![ENV_INGEST_URL]);
        assert_eq!(config.stream_target().as_str(), "rtmps://cdn/live/key");
        assert_eq!(config.log_filter, "live_streamer_lib=info");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("streamer.json");

        let config = StreamerConfig {
            default_camera: CameraFacing::Front,
            ..StreamerConfig::default()
        };
        config.save(&path).unwrap();

        assert_eq!(StreamerConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file() {
        let err = StreamerConfig::load(Path::new("/nonexistent/streamer.json")).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }
}
