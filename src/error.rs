// Error types module

use std::fmt;

/// Centralized error type for the rewriter
///
/// Categorizes errors into 3 main types. None of these cross the public
/// `rewrite` boundary: configuration errors surface from `validate()`,
/// malformed tags are skipped, and internal errors degrade to returning
/// the original document with a diagnostic.
#[derive(Debug, Clone)]
pub enum RewriteError {
    /// Configuration errors (invalid hex key, quality out of range, etc.)
    Config(String),

    /// A matched `<img` span could not be tokenized (unclosed quote,
    /// missing `>`). The span is left untouched in the output.
    MalformedTag { position: usize, message: String },

    /// Internal rewrite errors (unexpected state during document scan)
    Internal(String),
}

impl fmt::Display for RewriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewriteError::Config(msg) => write!(f, "Configuration error: {}", msg),
            RewriteError::MalformedTag { position, message } => {
                write!(f, "Malformed <img> tag at byte {}: {}", position, message)
            }
            RewriteError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for RewriteError {}

impl RewriteError {
    /// Helper constructors for common error patterns
    pub fn config(message: impl Into<String>) -> Self {
        RewriteError::Config(message.into())
    }

    pub fn malformed_tag(position: usize, message: impl Into<String>) -> Self {
        RewriteError::MalformedTag {
            position,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        RewriteError::Internal(message.into())
    }
}
