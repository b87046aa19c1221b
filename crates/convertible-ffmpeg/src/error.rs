//! Error types for convertible-ffmpeg.

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the transcoding strategy.
///
/// The first group is raised synchronously from
/// [`TranscodeAdapter::transcode`](crate::TranscodeAdapter::transcode) before
/// any process is started. [`Error::Execution`] is only ever delivered through
/// observers and the completion callback.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// No source location was given.
    #[error("you must specify a source path")]
    MissingInput,

    /// No destination was given.
    #[error("you must specify an output destination")]
    MissingOutput,

    /// A sink destination was given without an explicit output format.
    #[error("an output format is required when writing to a stream")]
    MissingFormat,

    /// The requested preset is neither built in nor configured.
    #[error("unknown preset: {0}")]
    UnknownPreset(String),

    /// No strategy is registered under this name.
    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),

    /// A required external tool is not available.
    #[error("tool not found: {tool}")]
    ToolNotFound { tool: String },

    /// Invalid option value (size descriptor, timemark, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The transcoding engine reported a failure.
    #[error("{message}")]
    Execution { message: String },
}

impl Error {
    /// Create a tool not found error.
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }

    /// Create an execution error carrying the engine's message.
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_error_displays_engine_message_verbatim() {
        let err = Error::execution("ffmpeg exited with code 1: Invalid data");
        assert_eq!(err.to_string(), "ffmpeg exited with code 1: Invalid data");
    }
}
