#![forbid(unsafe_code)]

//! Error types for the fallible edges of the crate: path parsing and config
//! loading. State mutation and queries never fail.

use thiserror::Error;

/// A field-access expression could not be parsed.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("empty path")]
    Empty,
    #[error("empty segment at byte {position}")]
    EmptySegment { position: usize },
    #[error("unclosed '[' opened at byte {position}")]
    UnclosedBracket { position: usize },
    #[error("unexpected '{ch}' at byte {position}")]
    UnexpectedChar { ch: char, position: usize },
}

/// A [`ModelConfig`](crate::ModelConfig) could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
    #[cfg(feature = "toml-config")]
    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("config field `{field}` must be {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },
}
