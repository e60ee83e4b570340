//! The final EIP-712 signing digest.
//!
//! `keccak256(0x19 || 0x01 || domainSeparator || hashStruct(message))`, where the
//! message term is dropped when the primary type is `EIP712Domain` itself.

use alloy_primitives::{B256, keccak256};
use serde::Serialize;

#[cfg(feature = "telemetry")]
use tracing::instrument;

use super::error::{Eip712Error, FieldPath};
use super::graph::TypeGraph;
use super::hasher::{HashingLimits, StructHasher};
use super::types::{EIP712_DOMAIN, TypedData, Types};
use super::validate::validate_struct;

/// The pieces of an EIP-712 digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip712Digest {
    /// `hashStruct(domain)`.
    pub domain_separator: B256,
    /// `hashStruct(message)`, absent when the primary type is `EIP712Domain`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub struct_hash: Option<B256>,
    /// The 32 bytes that get signed.
    pub digest: B256,
}

impl Eip712Digest {
    /// `0x1901 || domainSeparator || structHash?`.
    #[must_use]
    pub fn preimage(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(66);
        out.extend_from_slice(&[0x19, 0x01]);
        out.extend_from_slice(self.domain_separator.as_slice());
        if let Some(struct_hash) = &self.struct_hash {
            out.extend_from_slice(struct_hash.as_slice());
        }
        out
    }
}

/// A typed-data document with its type graph built.
struct Prepared<'t> {
    typed: &'t TypedData,
    graph: TypeGraph,
    domain: usize,
    /// `None` when the primary type is `EIP712Domain`.
    primary: Option<usize>,
}

impl<'t> Prepared<'t> {
    fn new(typed: &'t TypedData) -> Result<Self, Eip712Error> {
        let mut types = Types::new();
        types.insert(EIP712_DOMAIN, typed.domain.eip712_fields())?;
        for (name, fields) in typed.types.iter().filter(|(name, _)| *name != EIP712_DOMAIN) {
            types.insert(name, fields.to_vec())?;
        }
        let graph = TypeGraph::new(&types)?;

        let primary_type = typed.primary_type()?;
        let domain = graph
            .lookup(EIP712_DOMAIN)
            .ok_or_else(|| Eip712Error::UnknownPrimaryType(EIP712_DOMAIN.to_owned()))?;
        let primary = if primary_type == EIP712_DOMAIN {
            None
        } else {
            let id = graph
                .lookup(primary_type)
                .ok_or_else(|| Eip712Error::UnknownPrimaryType(primary_type.to_owned()))?;
            Some(id)
        };
        Ok(Self {
            typed,
            graph,
            domain,
            primary,
        })
    }

    fn validate(&self, limits: HashingLimits) -> Result<(), Eip712Error> {
        validate_struct(
            &self.graph,
            limits,
            self.domain,
            &self.typed.domain.to_json(),
            &FieldPath::root("domain"),
        )?;
        if let Some(primary) = self.primary {
            validate_struct(
                &self.graph,
                limits,
                primary,
                &self.typed.message,
                &FieldPath::root("message"),
            )?;
        }
        Ok(())
    }

    fn digest(&self, limits: HashingLimits) -> Result<Eip712Digest, Eip712Error> {
        self.validate(limits)?;

        let mut hasher = StructHasher::new(&self.graph, limits);
        let domain_separator = hasher.hash_struct(
            self.domain,
            &self.typed.domain.to_json(),
            &FieldPath::root("domain"),
        )?;
        let struct_hash = match self.primary {
            Some(primary) => Some(hasher.hash_struct(
                primary,
                &self.typed.message,
                &FieldPath::root("message"),
            )?),
            None => None,
        };

        let mut digest = Eip712Digest {
            domain_separator,
            struct_hash,
            digest: B256::ZERO,
        };
        digest.digest = keccak256(digest.preimage());
        Ok(digest)
    }

    /// The struct whose type string and hash describe the document.
    fn subject(&self) -> usize {
        self.primary.unwrap_or(self.domain)
    }
}

/// Validates `typed` and computes its digest.
///
/// # Errors
///
/// Returns the first [`Eip712Error`] found while resolving types, validating
/// the domain and message, or hashing.
#[cfg_attr(
    feature = "telemetry",
    instrument(name = "sigil.eip712_digest", level = "debug", skip_all)
)]
pub fn compute(typed: &TypedData, limits: HashingLimits) -> Result<Eip712Digest, Eip712Error> {
    Prepared::new(typed)?.digest(limits)
}

impl TypedData {
    /// Checks every domain and message value against its declared type.
    ///
    /// # Errors
    ///
    /// Returns the first offending field, see [`Eip712Error::path`].
    pub fn validate(&self) -> Result<(), Eip712Error> {
        Prepared::new(self)?.validate(HashingLimits::default())
    }

    /// `encodeType` of the primary type.
    ///
    /// # Errors
    ///
    /// Returns [`Eip712Error`] if the declarations do not resolve.
    pub fn encode_type(&self) -> Result<String, Eip712Error> {
        let prepared = Prepared::new(self)?;
        let hasher = StructHasher::new(&prepared.graph, HashingLimits::default());
        Ok(hasher.encode_type(prepared.subject()))
    }

    /// `hashType` of the primary type.
    ///
    /// # Errors
    ///
    /// Same as [`TypedData::encode_type`].
    pub fn type_hash(&self) -> Result<B256, Eip712Error> {
        self.encode_type().map(|encoded| keccak256(encoded.as_bytes()))
    }

    /// `hashStruct(domain)`.
    ///
    /// # Errors
    ///
    /// Same as [`TypedData::eip712_signing_hash`].
    pub fn domain_separator(&self) -> Result<B256, Eip712Error> {
        self.eip712_digest(HashingLimits::default())
            .map(|digest| digest.domain_separator)
    }

    /// `hashStruct(message)`, or `None` when the primary type is `EIP712Domain`.
    ///
    /// # Errors
    ///
    /// Same as [`TypedData::eip712_signing_hash`].
    pub fn struct_hash(&self) -> Result<Option<B256>, Eip712Error> {
        self.eip712_digest(HashingLimits::default())
            .map(|digest| digest.struct_hash)
    }

    /// The EIP-712 signing hash with default limits.
    ///
    /// # Errors
    ///
    /// Returns [`Eip712Error`] if the document is invalid.
    pub fn eip712_signing_hash(&self) -> Result<B256, Eip712Error> {
        self.eip712_signing_hash_with(HashingLimits::default())
    }

    /// The EIP-712 signing hash with explicit limits.
    ///
    /// # Errors
    ///
    /// Returns [`Eip712Error`] if the document is invalid or nests deeper
    /// than `limits` allows.
    pub fn eip712_signing_hash_with(&self, limits: HashingLimits) -> Result<B256, Eip712Error> {
        self.eip712_digest(limits).map(|digest| digest.digest)
    }

    /// The digest together with its intermediate hashes.
    ///
    /// # Errors
    ///
    /// Same as [`TypedData::eip712_signing_hash_with`].
    pub fn eip712_digest(&self, limits: HashingLimits) -> Result<Eip712Digest, Eip712Error> {
        compute(self, limits)
    }
}
