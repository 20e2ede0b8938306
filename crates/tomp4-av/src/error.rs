//! Error types for tomp4-av.

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while probing or transcoding media.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required external tool is not available.
    #[error("tool not found: {tool}")]
    ToolNotFound { tool: String },

    /// An external tool exited unsuccessfully. `transcript` holds the
    /// captured diagnostic output for error reporting.
    #[error("tool execution failed: {tool}: {message}")]
    ToolFailed {
        tool: String,
        message: String,
        transcript: Vec<String>,
    },

    /// A required capability is missing from an installed tool.
    #[error("unsupported {tool} installation: {message}")]
    MissingCapability { tool: String, message: String },

    /// Failed to parse tool output.
    #[error("failed to parse {tool} output: {message}")]
    ParseError { tool: String, message: String },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The input has more streams of a kind than the MP4 plan supports.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl Error {
    /// Create a tool not found error.
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }

    /// Create a tool execution failed error without a transcript.
    pub fn tool_failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            message: message.into(),
            transcript: Vec::new(),
        }
    }

    /// Create a tool execution failed error carrying the captured
    /// diagnostic transcript.
    pub fn tool_failed_with_transcript(
        tool: impl Into<String>,
        message: impl Into<String>,
        transcript: Vec<String>,
    ) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            message: message.into(),
            transcript,
        }
    }

    /// Create a missing capability error.
    pub fn missing_capability(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MissingCapability {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a parse error.
    pub fn parse_error(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ParseError {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Captured diagnostic lines, if this error carries any.
    pub fn transcript(&self) -> &[String] {
        match self {
            Self::ToolFailed { transcript, .. } => transcript,
            _ => &[],
        }
    }
}
