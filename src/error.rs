//! Error taxonomy
//!
//! Configuration errors are fatal and surface before any file is processed.
//! Source errors only affect the file they name; the engine turns them into
//! report warnings and keeps going.

use std::path::PathBuf;
use thiserror::Error;

/// Invalid user configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid maxParameters {value}: must be at least 1")]
    InvalidThreshold { value: usize },

    #[error("unknown rule identifier '{id}' (known: setup-within-test, too-many-arguments, lexical-error, structural-parse-error)")]
    UnknownRule { id: String },

    #[error("unknown language '{name}' in testFrameworkHints")]
    UnknownLanguage { name: String },

    #[error("invalid pattern '{pattern}' in testFrameworkHints.{language}: {source}")]
    InvalidPattern {
        language: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid glob '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

/// A file the engine could not take in
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no language profile for {}", path.display())]
    UnsupportedLanguage { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
