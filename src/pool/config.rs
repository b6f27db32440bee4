//! Configuration for [`WorkerPool`](crate::pool::WorkerPool).

use crate::core::{Result, WorkerError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a worker pool.
///
/// Every field has a default, so a JSON document only needs the fields it
/// changes.
///
/// # Example
///
/// ```rust
/// use rust_worker_kit::prelude::*;
/// use std::time::Duration;
///
/// let config = WorkerPoolConfig::new(4)
///     .with_pool_name("ingest")
///     .with_worker_name_prefix("ingest-worker")
///     .with_poll_interval(Duration::from_millis(50));
///
/// let from_json = WorkerPoolConfig::from_json(
///     r#"{ "num_workers": 4, "pool_name": "ingest", "worker_name_prefix": "ingest-worker", "poll_interval_ms": 50 }"#,
/// ).unwrap();
/// assert_eq!(config, from_json);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerPoolConfig {
    /// Number of worker threads, fixed for the pool's lifetime
    pub num_workers: usize,
    /// Maximum number of queued tasks (0 = unbounded)
    pub max_queue_size: usize,
    /// Pool name used in logs and rejection errors
    pub pool_name: String,
    /// Worker threads are named `"{worker_name_prefix}-{id}"`
    pub worker_name_prefix: String,
    /// Longest single wait of an idle worker on the queue.
    /// Default: 100ms
    #[serde(rename = "poll_interval_ms", with = "duration_ms")]
    pub poll_interval: Duration,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            num_workers: num_cpus::get(),
            max_queue_size: 0,
            pool_name: "worker-pool".to_string(),
            worker_name_prefix: "worker".to_string(),
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl WorkerPoolConfig {
    /// Create a configuration with the given number of workers
    /// (0 = number of CPUs)
    #[must_use]
    pub fn new(num_workers: usize) -> Self {
        Self {
            num_workers: if num_workers == 0 {
                num_cpus::get()
            } else {
                num_workers
            },
            ..Default::default()
        }
    }

    /// Parse and validate a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| WorkerError::invalid_config("json", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| WorkerError::other(e.to_string()))
    }

    /// Bound the queue; submissions beyond `size` queued tasks are rejected
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_queue_size(mut self, size: usize) -> Self {
        self.max_queue_size = size;
        self
    }

    /// Set the pool name
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_pool_name<S: Into<String>>(mut self, name: S) -> Self {
        self.pool_name = name.into();
        self
    }

    /// Set the worker thread name prefix
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_worker_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.worker_name_prefix = prefix.into();
        self
    }

    /// Set the worker poll interval.
    ///
    /// Closing the queue wakes idle workers immediately, so this only
    /// bounds how long a single blocking receive lasts.
    ///
    /// # Panics
    ///
    /// Panics if interval is zero.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        assert!(!interval.is_zero(), "poll interval must be non-zero");
        self.poll_interval = interval;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.num_workers == 0 {
            return Err(WorkerError::invalid_config(
                "num_workers",
                "Number of workers must be greater than 0",
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(WorkerError::invalid_config(
                "poll_interval",
                "Poll interval must be non-zero",
            ));
        }
        if self.worker_name_prefix.is_empty() {
            return Err(WorkerError::invalid_config(
                "worker_name_prefix",
                "Worker name prefix must not be empty",
            ));
        }
        Ok(())
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WorkerPoolConfig::default();
        assert_eq!(config.num_workers, num_cpus::get());
        assert_eq!(config.max_queue_size, 0);
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_workers_means_cpus() {
        assert_eq!(WorkerPoolConfig::new(0).num_workers, num_cpus::get());
    }

    #[test]
    #[should_panic(expected = "poll interval must be non-zero")]
    fn test_zero_poll_interval_panics() {
        let _ = WorkerPoolConfig::new(1).with_poll_interval(Duration::ZERO);
    }

    #[test]
    fn test_from_json_partial() {
        let config = WorkerPoolConfig::from_json(r#"{ "num_workers": 3, "max_queue_size": 10 }"#)
            .expect("valid config");
        assert_eq!(config.num_workers, 3);
        assert_eq!(config.max_queue_size, 10);
        assert_eq!(config.pool_name, "worker-pool");
    }

    #[test]
    fn test_from_json_rejects_invalid() {
        let err = WorkerPoolConfig::from_json(r#"{ "num_workers": 0 }"#).unwrap_err();
        assert!(matches!(err, WorkerError::InvalidConfig { ref parameter, .. } if parameter == "num_workers"));

        let err = WorkerPoolConfig::from_json(r#"{ "poll_interval_ms": 0 }"#).unwrap_err();
        assert!(matches!(err, WorkerError::InvalidConfig { ref parameter, .. } if parameter == "poll_interval"));

        let err = WorkerPoolConfig::from_json("not json").unwrap_err();
        assert!(matches!(err, WorkerError::InvalidConfig { ref parameter, .. } if parameter == "json"));
    }

    #[test]
    fn test_json_round_trip() {
        let config = WorkerPoolConfig::new(2).with_pool_name("rt");
        let json = config.to_json().unwrap();
        assert!(json.contains("\"poll_interval_ms\": 100"));
        assert_eq!(WorkerPoolConfig::from_json(&json).unwrap(), config);
    }
}
