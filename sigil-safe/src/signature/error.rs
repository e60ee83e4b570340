//! Structural errors of a Safe signature blob.

use alloy_primitives::U256;
use sigil::encoding::HexError;

/// Reasons a signature blob is rejected.
///
/// Offsets and lengths read from the blob are attacker-controlled 256-bit
/// words, so they are reported as [`U256`] exactly as found.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum SignatureBlobError {
    /// The input is not `0x`-prefixed, even-length hex.
    #[error("malformed signature hex: {0}")]
    MalformedHex(#[from] HexError),
    /// The blob is too short for the signer table it must hold.
    #[error("signature blob is {len} bytes, static part needs {required}")]
    TruncatedStaticPart {
        /// Bytes available.
        len: usize,
        /// Bytes the static part requires.
        required: usize,
    },
    /// An exact signer count of zero was requested.
    #[error("signer count must be at least one")]
    NoSigners,
    /// A slot's `v` byte matches no Safe signature type.
    #[error("signature {index}: unknown signature type v={v}")]
    UnknownSignatureType {
        /// Slot position in the static part.
        index: usize,
        /// The offending `v` byte.
        v: u8,
    },
    /// A contract signature's offset points back into the signer table.
    #[error("signature {index}: dynamic offset {offset} points inside the {static_len}-byte static part")]
    OffsetInsideStaticPart {
        /// Slot position in the static part.
        index: usize,
        /// Offset read from the slot.
        offset: U256,
        /// Length of the static part.
        static_len: usize,
    },
    /// A contract signature's offset lies beyond the blob.
    #[error("signature {index}: dynamic offset {offset} exceeds blob length {len}")]
    OffsetOutOfBounds {
        /// Slot position in the static part.
        index: usize,
        /// Offset read from the slot.
        offset: U256,
        /// Blob length.
        len: usize,
    },
    /// The 32-byte length word at a dynamic offset is cut off.
    #[error("signature {index}: length word at offset {offset} is truncated (blob length {len})")]
    TruncatedDynamicLengthField {
        /// Slot position in the static part.
        index: usize,
        /// Offset read from the slot.
        offset: U256,
        /// Blob length.
        len: usize,
    },
    /// A dynamic payload runs past the end of the blob.
    #[error(
        "signature {index}: {payload_len}-byte payload at offset {offset} exceeds blob length {len}"
    )]
    TruncatedDynamicPayload {
        /// Slot position in the static part.
        index: usize,
        /// Offset read from the slot.
        offset: U256,
        /// Length word read at the offset.
        payload_len: U256,
        /// Blob length.
        len: usize,
    },
    /// Contract signatures nest deeper than the caller allows.
    #[error("contract signatures nest deeper than the allowed depth")]
    NestingTooDeep,
    /// A nested contract signature payload is itself malformed.
    #[error("signature {index}: nested signature blob: {source}")]
    Nested {
        /// Slot position of the contract signature in the outer blob.
        index: usize,
        /// Failure inside the payload.
        #[source]
        source: Box<SignatureBlobError>,
    },
}
