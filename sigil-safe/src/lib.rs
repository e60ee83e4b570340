#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Safe multisig digests and signature blobs.
//!
//! This crate builds on [`sigil`] to produce the EIP-712 digests Safe owners
//! sign, and parses the concatenated multi-owner signature blobs that
//! `execTransaction` consumes.
//!
//! # Overview
//!
//! - **Typed data**: `SafeTx` and `SafeMessage` documents for a given Safe
//!   address, version and chain. The domain carries `chainId` only for Safe
//!   1.3.0 and later; unparsable versions are rejected rather than guessed.
//! - **Signature blobs**: the 65-byte signer table and the dynamic region used
//!   by EIP-1271 contract signatures, validated with overflow-checked offsets
//!   and optional bounded recursion into Safe-owned-by-Safe payloads.
//!
//! # Modules
//!
//! - [`typed_data`] - Safe transaction and message typed data
//! - [`version`] - Safe version parsing and domain shapes
//! - [`signature`] - Signature blob codec and builder
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing spans around digest and blob parsing

mod error;
pub mod signature;
pub mod typed_data;
pub mod version;

pub use error::{InvalidOperation, SafeError};
pub use signature::{SignatureBlob, SignatureBlobError, SignatureEntry, SignerCount};
pub use typed_data::{
    Operation, SafeMessage, SafePayload, SafeTransactionData, SafeTypedDataFactory,
    safe_message_hash, safe_tx_hash,
};
pub use version::{DomainShape, SafeVersion};
