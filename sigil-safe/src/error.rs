//! Errors raised while building Safe typed data.

use sigil::Eip712Error;

/// Errors that can occur while deriving a Safe transaction or message digest.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SafeError {
    /// The Safe version is not a valid semantic version.
    #[error("unsupported Safe version {version:?}: {source}")]
    UnsupportedSafeVersion {
        /// The version string as supplied.
        version: String,
        /// Parser failure.
        #[source]
        source: semver::Error,
    },
    /// A payload with a `to` member is not a well-formed Safe transaction.
    #[error("invalid Safe transaction: {0}")]
    InvalidTransaction(#[source] serde_json::Error),
    /// Typed-data hashing failed.
    #[error(transparent)]
    Eip712(#[from] Eip712Error),
}

/// A Safe operation byte other than `0` (call) or `1` (delegatecall).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid Safe operation {0}, expected 0 (call) or 1 (delegatecall)")]
pub struct InvalidOperation(pub u8);
