use std::path::PathBuf;

/// Domain-level error type shared across comfydeck crates.
///
/// The taxonomy mirrors how callers must react:
/// - [`Config`](CoreError::Config) -- the workspace configuration itself is
///   wrong (missing required parameter, unresolvable node reference,
///   malformed constraint). Fix the config, not the request.
/// - [`Value`](CoreError::Value) -- a caller-supplied value failed the
///   declared type/range constraints. Fix the request.
/// - [`Validation`](CoreError::Validation) -- a file or structure failed a
///   shape check (bad workflow JSON, bad selector).
/// - [`Io`](CoreError::Io) -- a workspace file could not be read.
///
/// `Config` and `Value` always carry the offending parameter name.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Configuration error for parameter '{param}': {message}")]
    Config { param: String, message: String },

    #[error("Invalid value for parameter '{param}': {message}")]
    Value { param: String, message: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CoreError {
    /// Shorthand for a configuration error tied to a parameter.
    pub fn config(param: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::Config {
            param: param.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a value error tied to a parameter.
    pub fn value(param: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::Value {
            param: param.into(),
            message: message.into(),
        }
    }
}
