//! EIP-712 typed structured data hashing.
//!
//! The pipeline mirrors the standard's own definitions:
//!
//! - [`encoder`] turns one primitive value into an ABI word.
//! - [`graph`] resolves struct declarations and orders dependencies for
//!   `encodeType`.
//! - [`hasher`] implements `hashType`, `encodeData` and `hashStruct`.
//! - [`digest`] validates a [`TypedData`] document and produces the
//!   `0x1901`-prefixed signing hash.
//!
//! ```
//! use sigil::TypedData;
//!
//! let typed = TypedData::from_json_str(r#"{
//!     "types": {"Ping": [{"name": "nonce", "type": "uint256"}]},
//!     "primaryType": "Ping",
//!     "domain": {"name": "Example", "chainId": 1},
//!     "message": {"nonce": 7}
//! }"#)?;
//! let hash = typed.eip712_signing_hash()?;
//! assert_eq!(hash.len(), 32);
//! # Ok::<(), sigil::Eip712Error>(())
//! ```

pub mod digest;
pub mod encoder;
mod error;
pub mod graph;
pub mod hasher;
mod types;
pub mod validate;

pub use digest::{Eip712Digest, compute};
pub use encoder::AbiType;
pub use error::{Eip712Error, FieldPath};
pub use graph::TypeGraph;
pub use hasher::{DEFAULT_MAX_DEPTH, HashingLimits, StructHasher};
pub use types::{EIP712_DOMAIN, TypeField, TypedData, TypedDataDomain, Types};
