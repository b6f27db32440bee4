//! Error types for the worker kit

/// Result type for worker kit operations
pub type Result<T> = std::result::Result<T, WorkerError>;

/// Errors that can occur in the worker kit
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum WorkerError {
    /// A task was submitted to a pool that can no longer accept it
    #[error("Task rejected by pool '{pool_name}': {reason}")]
    RejectedExecution {
        /// Name of the worker pool
        pool_name: String,
        /// Why the task was rejected
        reason: String,
    },

    /// A task returned an error
    #[error("Task '{task}' failed: {message}")]
    TaskExecution {
        /// Name of the failed task
        task: String,
        /// Error message
        message: String,
    },

    /// A task panicked while executing
    #[error("Task '{task}' panicked: {message}")]
    TaskPanicked {
        /// Name of the panicked task
        task: String,
        /// Panic message
        message: String,
    },

    /// Timed lock acquisition gave up
    #[error("Failed to acquire lock within {timeout_ms}ms")]
    LockTimeout {
        /// Timeout duration in milliseconds
        timeout_ms: u64,
    },

    /// A blocking wait was interrupted before it produced a value
    #[error("Interrupted: {reason}")]
    Interrupted {
        /// Reason for the interruption
        reason: String,
    },

    /// Failed to spawn a worker thread
    #[error("Failed to spawn worker thread #{worker_id}: {message}")]
    SpawnError {
        /// ID of the worker that failed to spawn
        worker_id: usize,
        /// Error message
        message: String,
        /// Source IO error
        #[source]
        source: Option<std::io::Error>,
    },

    /// Failed to join a worker thread
    #[error("Failed to join worker thread #{worker_id}: {message}")]
    JoinError {
        /// ID of the worker that failed to join
        worker_id: usize,
        /// Error message
        message: String,
    },

    /// Invalid configuration with parameter
    #[error("Invalid configuration for '{parameter}': {message}")]
    InvalidConfig {
        /// Configuration parameter name
        parameter: String,
        /// Error message
        message: String,
    },

    /// General error
    #[error("{0}")]
    Other(String),
}

impl WorkerError {
    /// Create a rejected execution error
    pub fn rejected(pool_name: impl Into<String>, reason: impl Into<String>) -> Self {
        WorkerError::RejectedExecution {
            pool_name: pool_name.into(),
            reason: reason.into(),
        }
    }

    /// Create a task execution error
    pub fn execution(task: impl Into<String>, message: impl Into<String>) -> Self {
        WorkerError::TaskExecution {
            task: task.into(),
            message: message.into(),
        }
    }

    /// Create a task panic error
    pub fn panicked(task: impl Into<String>, message: impl Into<String>) -> Self {
        WorkerError::TaskPanicked {
            task: task.into(),
            message: message.into(),
        }
    }

    /// Create a lock timeout error
    pub fn lock_timeout(timeout: std::time::Duration) -> Self {
        WorkerError::LockTimeout {
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    /// Create an interrupted error
    pub fn interrupted(reason: impl Into<String>) -> Self {
        WorkerError::Interrupted {
            reason: reason.into(),
        }
    }

    /// Create a spawn error
    pub fn spawn(worker_id: usize, message: impl Into<String>) -> Self {
        WorkerError::SpawnError {
            worker_id,
            message: message.into(),
            source: None,
        }
    }

    /// Create a spawn error with source
    pub fn spawn_with_source(
        worker_id: usize,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        WorkerError::SpawnError {
            worker_id,
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a join error
    pub fn join(worker_id: usize, message: impl Into<String>) -> Self {
        WorkerError::JoinError {
            worker_id,
            message: message.into(),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        WorkerError::InvalidConfig {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        WorkerError::Other(msg.into())
    }

    /// Whether this error was caused by submitting to a pool that is shut down or full
    pub fn is_rejected(&self) -> bool {
        matches!(self, WorkerError::RejectedExecution { .. })
    }

    /// Whether this error reports an interrupted wait or task
    pub fn is_interrupted(&self) -> bool {
        matches!(self, WorkerError::Interrupted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_error_creation() {
        let err = WorkerError::rejected("main_pool", "pool is shutting down");
        assert!(err.is_rejected());

        let err = WorkerError::lock_timeout(Duration::from_millis(25));
        assert!(matches!(err, WorkerError::LockTimeout { timeout_ms: 25 }));

        let err = WorkerError::interrupted("discarded by shutdown_now");
        assert!(err.is_interrupted());
        assert!(!err.is_rejected());
    }

    #[test]
    fn test_error_display() {
        let err = WorkerError::rejected("workers", "pool is shutting down");
        assert_eq!(
            err.to_string(),
            "Task rejected by pool 'workers': pool is shutting down"
        );

        let err = WorkerError::lock_timeout(Duration::from_secs(2));
        assert_eq!(err.to_string(), "Failed to acquire lock within 2000ms");

        let err = WorkerError::panicked("ClosureTask", "boom");
        assert_eq!(err.to_string(), "Task 'ClosureTask' panicked: boom");
    }

    #[test]
    fn test_spawn_error_with_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = WorkerError::spawn_with_source(5, "Cannot create thread", io_err);

        assert!(matches!(err, WorkerError::SpawnError { .. }));
        assert!(err.to_string().contains("worker thread #5"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
