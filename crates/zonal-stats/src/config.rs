//! Configuration for validation, batch processing and the watershed cache.

use std::path::Path;

use geotiff_reader::DEFAULT_MAX_DECODE_BYTES;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ZonalError};

/// Configuration for the zonal statistics pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZonalConfig {
    /// Allowed absolute difference between pixel sizes when checking a
    /// raster series. `0.0` means exact equality.
    pub resolution_tolerance: f64,

    /// Process rasters on a rayon pool instead of one after another.
    pub parallel: bool,

    /// Size of the dedicated pool for parallel runs. `None` uses the
    /// global rayon pool.
    pub worker_threads: Option<usize>,

    /// Number of parsed watershed layers kept in memory.
    pub watershed_cache_capacity: usize,

    /// Largest sample buffer a single raster may decode to, in bytes.
    /// Files declaring more are skipped as unreadable.
    pub max_decode_bytes: usize,
}

impl Default for ZonalConfig {
    fn default() -> Self {
        Self {
            resolution_tolerance: 0.0,
            parallel: false,
            worker_threads: None,
            watershed_cache_capacity: 8,
            max_decode_bytes: DEFAULT_MAX_DECODE_BYTES,
        }
    }
}

impl ZonalConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("ZONAL_RESOLUTION_TOLERANCE") {
            if let Ok(tol) = val.parse() {
                config.resolution_tolerance = tol;
            }
        }

        if let Ok(val) = std::env::var("ZONAL_PARALLEL") {
            config.parallel = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = std::env::var("ZONAL_WORKER_THREADS") {
            if let Ok(threads) = val.parse() {
                config.worker_threads = Some(threads);
            }
        }

        if let Ok(val) = std::env::var("WATERSHED_CACHE_CAPACITY") {
            if let Ok(capacity) = val.parse() {
                config.watershed_cache_capacity = capacity;
            }
        }

        if let Ok(val) = std::env::var("ZONAL_MAX_DECODE_BYTES") {
            if let Ok(bytes) = val.parse() {
                config.max_decode_bytes = bytes;
            }
        }

        config
    }

    /// Load configuration from a YAML file. Missing keys take their defaults.
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| ZonalError::Config(e.to_string()))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !self.resolution_tolerance.is_finite() || self.resolution_tolerance < 0.0 {
            return Err("resolution_tolerance must be a finite value >= 0".to_string());
        }

        if self.worker_threads == Some(0) {
            return Err("worker_threads must be > 0".to_string());
        }

        if self.watershed_cache_capacity == 0 {
            return Err("watershed_cache_capacity must be > 0".to_string());
        }

        if self.max_decode_bytes == 0 {
            return Err("max_decode_bytes must be > 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = ZonalConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.resolution_tolerance, 0.0);
        assert!(!config.parallel);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = ZonalConfig {
            resolution_tolerance: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ZonalConfig {
            worker_threads: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ZonalConfig {
            watershed_cache_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ZonalConfig {
            max_decode_bytes: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_yaml_partial() {
        let config = ZonalConfig::from_yaml_str("parallel: true\nworker_threads: 4\n").unwrap();
        assert!(config.parallel);
        assert_eq!(config.worker_threads, Some(4));
        assert_eq!(config.watershed_cache_capacity, 8);
        assert_eq!(config.max_decode_bytes, DEFAULT_MAX_DECODE_BYTES);
    }

    #[test]
    fn test_from_yaml_decode_limit() {
        let config = ZonalConfig::from_yaml_str("max_decode_bytes: 4096\n").unwrap();
        assert_eq!(config.max_decode_bytes, 4096);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_yaml_rejects_garbage() {
        let err = ZonalConfig::from_yaml_str("parallel: [not, a, bool]").unwrap_err();
        assert!(matches!(err, ZonalError::Config(_)));
    }
}
