use thiserror::Error;

/// Main error type for the telemetry collector
#[derive(Error, Debug, Clone)]
pub enum TelemetryError {
    /// The model shape cannot be summarized (e.g. activations of a graph model)
    #[error("Unsupported model: {kind} - {operation}")]
    UnsupportedModel {
        kind: String,
        operation: String,
    },

    /// Handing a record to the storage router failed
    #[error("Router failure: {operation} - {message}")]
    RouterFailure {
        operation: String,
        message: String,
    },

    /// Hostname could not be determined
    #[error("Hostname unavailable: {0}")]
    HostnameUnavailable(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// IO errors
    #[error("IO error: {0}")]
    IoError(String),

    /// Invalid input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl TelemetryError {
    /// Create a router failure with the operation that was attempted
    pub fn router_failure(operation: &str, message: &str) -> Self {
        TelemetryError::RouterFailure {
            operation: operation.to_string(),
            message: message.to_string(),
        }
    }

    /// Create an unsupported-model error naming the topology and operation
    pub fn unsupported_model(kind: &str, operation: &str) -> Self {
        TelemetryError::UnsupportedModel {
            kind: kind.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        TelemetryError::ConfigurationError(message.into())
    }
}

impl From<std::io::Error> for TelemetryError {
    fn from(err: std::io::Error) -> Self {
        TelemetryError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for TelemetryError {
    fn from(err: serde_json::Error) -> Self {
        TelemetryError::SerializationError(err.to_string())
    }
}

impl From<bincode::Error> for TelemetryError {
    fn from(err: bincode::Error) -> Self {
        TelemetryError::SerializationError(err.to_string())
    }
}

/// Result type for telemetry operations
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    UnsupportedModel,
    RouterFailure,
    HostnameUnavailable,
    ConfigInvalid,
    SerializationFailed,
    Io,
    InvalidInput,
}

impl TelemetryError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            TelemetryError::UnsupportedModel { .. } => ErrorCode::UnsupportedModel,
            TelemetryError::RouterFailure { .. } => ErrorCode::RouterFailure,
            TelemetryError::HostnameUnavailable(_) => ErrorCode::HostnameUnavailable,
            TelemetryError::ConfigurationError(_) => ErrorCode::ConfigInvalid,
            TelemetryError::SerializationError(_) => ErrorCode::SerializationFailed,
            TelemetryError::IoError(_) => ErrorCode::Io,
            TelemetryError::InvalidInput(_) => ErrorCode::InvalidInput,
        }
    }

    /// Recoverable errors never need to stop a training run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.code(),
            ErrorCode::RouterFailure | ErrorCode::HostnameUnavailable
        )
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            TelemetryError::UnsupportedModel { kind, operation } => {
                format!("Unsupported Model: '{}' cannot provide '{}'.\n\nDisable the statistics that need this capability (for example activation histograms on graph models) or use a sequential model.", kind, operation)
            }
            TelemetryError::RouterFailure { operation, message } => {
                format!("Router Failure in '{}': {}\n\nThe storage backend rejected a record. Training can continue; check the storage destination.", operation, message)
            }
            TelemetryError::ConfigurationError(msg) => {
                format!("Configuration Error: {}\n\nReporting frequency and histogram bin counts must be at least 1.", msg)
            }
            _ => self.to_string(),
        }
    }
}
