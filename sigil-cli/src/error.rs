//! Error types for the command-line host.

use std::path::PathBuf;

use sigil::Eip712Error;
use sigil_safe::{SafeError, SignatureBlobError};

use crate::config::ConfigError;

/// Errors that end a `sigil` invocation.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An input file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Input is not JSON, or output failed to serialize.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Output could not be written.
    #[error("failed to write output: {0}")]
    Write(#[source] std::io::Error),

    /// Typed data is malformed.
    #[error(transparent)]
    Eip712(#[from] Eip712Error),

    /// A Safe payload or version is invalid.
    #[error(transparent)]
    Safe(#[from] SafeError),

    /// A signature blob is malformed.
    #[error(transparent)]
    Signature(#[from] SignatureBlobError),

    /// `safe-hash` was run without `--chain-id` and no configured default.
    #[error("no chain id given; pass --chain-id or set default_chain_id")]
    MissingChainId,
}
