//! Error types for configuration and file plumbing.

use std::path::PathBuf;

use miette::Diagnostic;

/// Errors raised while reading or writing configuration files.
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum CommonError {
    /// IO error
    #[error("io error on {path}: {source}")]
    #[diagnostic(code(ownwrites::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization error
    #[error(transparent)]
    #[diagnostic(code(ownwrites::json))]
    Json(#[from] serde_json::Error),

    /// TOML parse error
    #[error(transparent)]
    #[diagnostic(code(ownwrites::toml))]
    TomlDe(#[from] toml::de::Error),

    /// TOML serialization error
    #[error(transparent)]
    #[diagnostic(code(ownwrites::toml))]
    TomlSer(#[from] toml::ser::Error),

    /// File extension is neither `.json` nor `.toml`
    #[error("unsupported config format: {0}")]
    #[diagnostic(
        code(ownwrites::config::format),
        help("config files must end in .json or .toml")
    )]
    UnsupportedFormat(PathBuf),
}

impl CommonError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
