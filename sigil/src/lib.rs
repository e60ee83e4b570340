#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Deterministic EIP-712 typed-data hashing.
//!
//! This crate computes EIP-712 signing digests for arbitrary typed data, the
//! way wallets and multisig services hash structured messages before
//! signing. It is pure computation: no I/O, no global state, and every public
//! type is `Send + Sync`, so a host may call into it from any number of
//! threads or async tasks without coordination.
//!
//! # Overview
//!
//! A digest is produced in three stages:
//!
//! 1. every domain and message value is checked against its declared ABI type,
//!    and failures are reported with the offending field path;
//! 2. the domain separator and the message struct hash are computed with
//!    `hashStruct`;
//! 3. `keccak256(0x1901 || domainSeparator || structHash)` is returned. When
//!    the primary type is `EIP712Domain` the struct hash term is omitted.
//!
//! # Modules
//!
//! - [`eip712`] - Typed-data model, type graph, value encoder and struct hasher
//! - [`encoding`] - `0x`-hex and integer parsing shared with downstream crates
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing spans around digest computation

pub mod eip712;
pub mod encoding;

pub use eip712::{
    Eip712Digest, Eip712Error, FieldPath, HashingLimits, TypeField, TypedData, TypedDataDomain,
    Types,
};
