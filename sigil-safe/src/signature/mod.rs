//! Safe multi-owner signature blobs.
//!
//! `execTransaction` takes every owner signature concatenated into one byte
//! string. The static part is a table of 65-byte `{r, s, v}` slots, one per
//! signer. Contract (EIP-1271) signatures do not fit in a slot, so their slot
//! holds the verifying contract in `r` and a byte offset in `s`, and the
//! offset points into a dynamic region after the table holding a 32-byte
//! length word followed by the payload:
//!
//! ```text
//! | r (32) | s (32) | v (1) | ... N slots ... | len (32) | payload (len) | ...
//! ```
//!
//! [`SignatureBlob::parse`] certifies that this layout is self-consistent. It
//! performs no signature recovery and does not check owners or thresholds.

mod builder;
mod error;

use alloy_primitives::{Address, B256, Bytes, U256};
use serde::Serialize;
use sigil::encoding::decode_hex;

#[cfg(feature = "telemetry")]
use tracing::instrument;

pub use builder::SignatureBlobBuilder;
pub use error::SignatureBlobError;

/// Length of one static slot.
pub const SIGNATURE_LEN: usize = 65;

const WORD: usize = 32;

/// Signature type selected by a slot's `v` byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SignatureKind {
    /// `v = 0`: EIP-1271 contract signature with a dynamic payload.
    Contract,
    /// `v = 1`: hash pre-approved on chain by the owner in `r`.
    ApprovedHash,
    /// `v = 27 | 28`: ECDSA over the Safe digest.
    Eoa,
    /// `v = 31 | 32`: ECDSA over the EIP-191 prefixed digest, stored as `v + 4`.
    EthSign,
}

impl SignatureKind {
    /// Classifies a `v` byte.
    #[must_use]
    pub const fn from_v(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Contract),
            1 => Some(Self::ApprovedHash),
            27 | 28 => Some(Self::Eoa),
            31 | 32 => Some(Self::EthSign),
            _ => None,
        }
    }
}

/// A slot that is complete on its own: ECDSA or approved hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct StaticSignature {
    /// First word.
    pub r: B256,
    /// Second word.
    pub s: B256,
    /// Type byte.
    pub v: u8,
}

impl StaticSignature {
    /// The 65 slot bytes.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; SIGNATURE_LEN] {
        let mut out = [0u8; SIGNATURE_LEN];
        out[..WORD].copy_from_slice(self.r.as_slice());
        out[WORD..2 * WORD].copy_from_slice(self.s.as_slice());
        out[2 * WORD] = self.v;
        out
    }
}

/// An EIP-1271 signature: the slot plus its resolved dynamic payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ContractSignature {
    /// Contract whose `isValidSignature` vouches for the payload.
    pub verifier: Address,
    /// Offset of the length word from the start of the blob.
    pub offset: usize,
    /// Payload bytes following the length word.
    pub payload: Bytes,
}

impl ContractSignature {
    /// Parses the payload as a signature blob of its own (a Safe owned by a
    /// Safe), validating further nesting up to `max_depth` levels.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureBlobError::NestingTooDeep`] when `max_depth` is zero,
    /// or any structural error of the payload.
    pub fn nested(&self, max_depth: usize) -> Result<SignatureBlob, SignatureBlobError> {
        let remaining = max_depth
            .checked_sub(1)
            .ok_or(SignatureBlobError::NestingTooDeep)?;
        let blob = SignatureBlob::from_bytes(&self.payload, SignerCount::Inferred)?;
        blob.validate_nested(remaining)?;
        Ok(blob)
    }
}

/// One entry of the signer table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SignatureEntry {
    /// ECDSA over the Safe digest.
    Eoa(StaticSignature),
    /// ECDSA over the EIP-191 prefixed Safe digest.
    EthSign(StaticSignature),
    /// On-chain approval by the owner in `r`.
    ApprovedHash(StaticSignature),
    /// Contract signature with its dynamic payload.
    Contract(ContractSignature),
}

impl SignatureEntry {
    /// The signature type.
    #[must_use]
    pub const fn kind(&self) -> SignatureKind {
        match self {
            Self::Eoa(_) => SignatureKind::Eoa,
            Self::EthSign(_) => SignatureKind::EthSign,
            Self::ApprovedHash(_) => SignatureKind::ApprovedHash,
            Self::Contract(_) => SignatureKind::Contract,
        }
    }

    /// The owner named by the slot itself, for approved-hash and contract
    /// entries. ECDSA owners are only known after recovery.
    #[must_use]
    pub fn owner(&self) -> Option<Address> {
        match self {
            Self::ApprovedHash(sig) => Some(word_to_address(&sig.r)),
            Self::Contract(sig) => Some(sig.verifier),
            Self::Eoa(_) | Self::EthSign(_) => None,
        }
    }
}

/// How many slots the static part holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SignerCount {
    /// Read whole slots up to the first dynamic payload or the end of the
    /// blob; a trailing partial slot is left to the dynamic region.
    #[default]
    Inferred,
    /// Exactly this many slots, as when the Safe threshold is known. Bytes
    /// beyond the table and the referenced payloads are ignored. Zero is
    /// rejected with [`SignatureBlobError::NoSigners`].
    Exact(usize),
}

/// A structurally valid signature blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureBlob {
    entries: Vec<SignatureEntry>,
    static_len: usize,
    #[serde(skip)]
    bytes: Bytes,
}

impl SignatureBlob {
    /// Parses a `0x`-prefixed hex blob.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureBlobError`] on malformed hex or any layout violation;
    /// there is no partial result.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "sigil.signature_blob", level = "debug", skip_all)
    )]
    pub fn parse(hex: &str, signers: SignerCount) -> Result<Self, SignatureBlobError> {
        let bytes = decode_hex(hex)?;
        Self::from_bytes(&bytes, signers)
    }

    /// Parses raw blob bytes.
    ///
    /// # Errors
    ///
    /// Same as [`SignatureBlob::parse`], minus the hex step.
    pub fn from_bytes(bytes: &[u8], signers: SignerCount) -> Result<Self, SignatureBlobError> {
        let total = bytes.len();
        if total < SIGNATURE_LEN {
            return Err(SignatureBlobError::TruncatedStaticPart {
                len: total,
                required: SIGNATURE_LEN,
            });
        }

        let slots = match signers {
            SignerCount::Exact(count) => read_exact_slots(bytes, count)?,
            SignerCount::Inferred => read_inferred_slots(bytes)?,
        };
        let static_len = slots.len() * SIGNATURE_LEN;

        let mut entries = Vec::with_capacity(slots.len());
        for (index, slot) in slots.into_iter().enumerate() {
            let entry = match slot.kind_checked(index)? {
                SignatureKind::Contract => {
                    SignatureEntry::Contract(resolve_contract(bytes, index, &slot, static_len)?)
                }
                SignatureKind::ApprovedHash => SignatureEntry::ApprovedHash(slot),
                SignatureKind::Eoa => SignatureEntry::Eoa(slot),
                SignatureKind::EthSign => SignatureEntry::EthSign(slot),
            };
            entries.push(entry);
        }

        Ok(Self {
            entries,
            static_len,
            bytes: Bytes::copy_from_slice(bytes),
        })
    }

    /// Entries in table order.
    #[must_use]
    pub fn entries(&self) -> &[SignatureEntry] {
        &self.entries
    }

    /// Number of signers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The signer table.
    #[must_use]
    pub fn static_part(&self) -> &[u8] {
        &self.bytes[..self.static_len]
    }

    /// Everything after the signer table.
    #[must_use]
    pub fn dynamic_part(&self) -> &[u8] {
        &self.bytes[self.static_len..]
    }

    /// The raw blob.
    #[must_use]
    pub const fn as_bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Contract signatures with their table positions.
    pub fn contract_signatures(&self) -> impl Iterator<Item = (usize, &ContractSignature)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| match entry {
                SignatureEntry::Contract(sig) => Some((index, sig)),
                _ => None,
            })
    }

    /// Parses every contract payload as a nested blob, recursively, allowing
    /// at most `max_depth` levels below this one.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureBlobError::Nested`] naming the contract entry whose
    /// payload failed.
    pub fn validate_nested(&self, max_depth: usize) -> Result<(), SignatureBlobError> {
        for (index, sig) in self.contract_signatures() {
            sig.nested(max_depth)
                .map_err(|source| SignatureBlobError::Nested {
                    index,
                    source: Box::new(source),
                })?;
        }
        Ok(())
    }
}

impl StaticSignature {
    fn read(bytes: &[u8], index: usize) -> Self {
        let start = index * SIGNATURE_LEN;
        Self {
            r: B256::from_slice(&bytes[start..start + WORD]),
            s: B256::from_slice(&bytes[start + WORD..start + 2 * WORD]),
            v: bytes[start + 2 * WORD],
        }
    }

    fn kind_checked(&self, index: usize) -> Result<SignatureKind, SignatureBlobError> {
        SignatureKind::from_v(self.v)
            .ok_or(SignatureBlobError::UnknownSignatureType { index, v: self.v })
    }
}

fn read_exact_slots(bytes: &[u8], count: usize) -> Result<Vec<StaticSignature>, SignatureBlobError> {
    if count == 0 {
        return Err(SignatureBlobError::NoSigners);
    }
    let required = count.checked_mul(SIGNATURE_LEN).unwrap_or(usize::MAX);
    if bytes.len() < required {
        return Err(SignatureBlobError::TruncatedStaticPart {
            len: bytes.len(),
            required,
        });
    }
    Ok((0..count).map(|index| StaticSignature::read(bytes, index)).collect())
}

/// Reads `floor(static_end / 65)` slots, where `static_end` is the smallest
/// dynamic offset seen so far or the end of the blob. Bytes between the last
/// slot and `static_end` belong to the dynamic region.
fn read_inferred_slots(bytes: &[u8]) -> Result<Vec<StaticSignature>, SignatureBlobError> {
    let total = bytes.len();
    let mut static_end = total;
    let mut slots = Vec::new();
    while (slots.len() + 1) * SIGNATURE_LEN <= static_end {
        let index = slots.len();
        let slot = StaticSignature::read(bytes, index);
        if slot.kind_checked(index)? == SignatureKind::Contract {
            let offset = U256::from_be_bytes(slot.s.0);
            let read_so_far = (index + 1) * SIGNATURE_LEN;
            if offset < U256::from(read_so_far) {
                return Err(SignatureBlobError::OffsetInsideStaticPart {
                    index,
                    offset,
                    static_len: read_so_far,
                });
            }
            let start = usize::try_from(offset)
                .ok()
                .filter(|start| *start < total)
                .ok_or(SignatureBlobError::OffsetOutOfBounds {
                    index,
                    offset,
                    len: total,
                })?;
            static_end = static_end.min(start);
        }
        slots.push(slot);
    }
    Ok(slots)
}

/// Bounds-checks the dynamic payload of a contract slot with 256-bit
/// arithmetic and slices it out.
fn resolve_contract(
    bytes: &[u8],
    index: usize,
    slot: &StaticSignature,
    static_len: usize,
) -> Result<ContractSignature, SignatureBlobError> {
    let total = bytes.len();
    let total_word = U256::from(total);
    let offset = U256::from_be_bytes(slot.s.0);

    if offset < U256::from(static_len) {
        return Err(SignatureBlobError::OffsetInsideStaticPart {
            index,
            offset,
            static_len,
        });
    }
    if offset >= total_word {
        return Err(SignatureBlobError::OffsetOutOfBounds {
            index,
            offset,
            len: total,
        });
    }
    let length_end = offset + U256::from(WORD);
    if length_end > total_word {
        return Err(SignatureBlobError::TruncatedDynamicLengthField {
            index,
            offset,
            len: total,
        });
    }

    // Both values are bounded by `total` here.
    let start = usize::try_from(offset).map_err(|_| SignatureBlobError::OffsetOutOfBounds {
        index,
        offset,
        len: total,
    })?;
    let payload_start = start + WORD;
    let payload_len = U256::from_be_slice(&bytes[start..payload_start]);
    let truncated = || SignatureBlobError::TruncatedDynamicPayload {
        index,
        offset,
        payload_len,
        len: total,
    };
    let end = length_end
        .checked_add(payload_len)
        .filter(|end| *end <= total_word)
        .ok_or_else(truncated)?;
    let end = usize::try_from(end).map_err(|_| truncated())?;

    Ok(ContractSignature {
        verifier: word_to_address(&slot.r),
        offset: start,
        payload: Bytes::copy_from_slice(&bytes[payload_start..end]),
    })
}

/// The low 20 bytes of a word, as Solidity's `address(uint160(uint256(w)))`.
fn word_to_address(word: &B256) -> Address {
    Address::from_slice(&word[WORD - 20..])
}
