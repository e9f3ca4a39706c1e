//! Error types for screenrec

use thiserror::Error;

/// Result type alias using RecorderError
pub type Result<T> = std::result::Result<T, RecorderError>;

/// Main error type for recorder operations
#[derive(Debug, Error)]
pub enum RecorderError {
    /// Graphics device could not be acquired
    #[error("Device error: {0}")]
    Device(String),

    /// Capture session could not be created or started
    #[error("Capture session error: {0}")]
    Session(String),

    /// Selector matched no capture target
    #[error("Capture target not found: {0}")]
    TargetNotFound(String),

    /// Encoder rejected the stream parameters or the output sink
    #[error("Pipeline preparation failed: {0}")]
    PipelinePrepare(String),

    /// Encoding failed while the recorder was running
    #[error("Pipeline failed: {0}")]
    PipelineRuntime(String),

    /// Pipeline did not finish within the configured shutdown timeout
    #[error("The recorder failed to stop in allotted time ({0:?})")]
    ShutdownTimeout(std::time::Duration),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<RecorderError>,
    },
}

/// Coarse classification of a [`RecorderError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Device or capture session could not be acquired
    ResourceAcquisition,
    /// No capture target matched the selector
    TargetNotFound,
    /// Encoder preparation failed
    PipelinePrepare,
    /// Encoder failed during transcode
    PipelineRuntime,
    /// Pipeline did not quiesce in time
    ShutdownTimeout,
    /// Configuration problem
    Config,
    /// I/O failure
    Io,
}

impl RecorderError {
    /// Create a device error
    pub fn device(msg: impl Into<String>) -> Self {
        Self::Device(msg.into())
    }

    /// Create a capture session error
    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session(msg.into())
    }

    /// Create a target-not-found error
    pub fn target_not_found(msg: impl Into<String>) -> Self {
        Self::TargetNotFound(msg.into())
    }

    /// Create a pipeline preparation error
    pub fn prepare(msg: impl Into<String>) -> Self {
        Self::PipelinePrepare(msg.into())
    }

    /// Create a pipeline runtime error
    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::PipelineRuntime(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Classify the error, looking through any added context
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Device(_) | Self::Session(_) => ErrorKind::ResourceAcquisition,
            Self::TargetNotFound(_) => ErrorKind::TargetNotFound,
            Self::PipelinePrepare(_) => ErrorKind::PipelinePrepare,
            Self::PipelineRuntime(_) => ErrorKind::PipelineRuntime,
            Self::ShutdownTimeout(_) => ErrorKind::ShutdownTimeout,
            Self::Config(_) => ErrorKind::Config,
            Self::Io(_) => ErrorKind::Io,
            Self::WithContext { source, .. } => source.kind(),
        }
    }

    /// Get a hint for the user on how to resolve the error
    pub fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Device(_) => Some("Check that a graphics device is available to this session"),
            Self::TargetNotFound(_) => {
                Some("Run 'screenrec list-displays' to see the available display names")
            }
            Self::PipelinePrepare(_) => {
                Some("Try a different --quality or disable hardware acceleration")
            }
            Self::Config(_) => Some("Check ~/.config/screenrec/config.toml for invalid values"),
            Self::WithContext { source, .. } => source.user_hint(),
            _ => None,
        }
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl From<toml::de::Error> for RecorderError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("Failed to parse config file: {}", err))
    }
}

impl From<toml::ser::Error> for RecorderError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Config(format!("Failed to serialize config: {}", err))
    }
}
