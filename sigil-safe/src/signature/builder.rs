//! Assembles a signature blob from individual owner signatures.

use alloy_primitives::{Address, B256, Bytes, Signature, U256};

use super::{SIGNATURE_LEN, StaticSignature, WORD};

#[derive(Debug, Clone)]
enum Pending {
    Static(StaticSignature),
    Contract(Bytes),
}

/// Collects owner signatures and encodes them the way Safe expects.
///
/// Entries are sorted by ascending owner address. Contract payloads are
/// appended after the signer table in the same order, each as a 32-byte
/// length word followed by the payload, and their slots point at them.
///
/// ```
/// use alloy_primitives::{Address, Bytes};
/// use sigil_safe::signature::{SignatureBlob, SignatureBlobBuilder, SignerCount};
///
/// let blob = SignatureBlobBuilder::new()
///     .approved_hash(Address::repeat_byte(0x22))
///     .contract(Address::repeat_byte(0x11), Bytes::from_static(&[0xab; 4]))
///     .build();
/// let parsed = SignatureBlob::from_bytes(&blob, SignerCount::Inferred).unwrap();
/// assert_eq!(parsed.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SignatureBlobBuilder {
    signatures: Vec<(Address, Pending)>,
}

impl SignatureBlobBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            signatures: Vec::new(),
        }
    }

    /// Adds an ECDSA signature over the Safe digest (`v = 27 | 28`).
    #[must_use]
    pub fn eoa(self, owner: Address, signature: &Signature) -> Self {
        self.ecdsa(owner, signature, 27)
    }

    /// Adds an ECDSA signature over the EIP-191 prefixed digest (`v = 31 | 32`).
    #[must_use]
    pub fn eth_sign(self, owner: Address, signature: &Signature) -> Self {
        self.ecdsa(owner, signature, 31)
    }

    /// Adds an on-chain approval by `owner` (`v = 1`).
    #[must_use]
    pub fn approved_hash(self, owner: Address) -> Self {
        self.push(
            owner,
            Pending::Static(StaticSignature {
                r: owner.into_word(),
                s: B256::ZERO,
                v: 1,
            }),
        )
    }

    /// Adds an EIP-1271 signature verified by the contract `verifier` (`v = 0`).
    #[must_use]
    pub fn contract(self, verifier: Address, payload: Bytes) -> Self {
        self.push(verifier, Pending::Contract(payload))
    }

    /// Encodes the blob.
    #[must_use]
    pub fn build(mut self) -> Bytes {
        self.signatures.sort_by_key(|(owner, _)| *owner);

        let static_len = self.signatures.len() * SIGNATURE_LEN;
        let mut table = Vec::with_capacity(static_len);
        let mut dynamic = Vec::new();
        for (owner, pending) in &self.signatures {
            let slot = match pending {
                Pending::Static(slot) => *slot,
                Pending::Contract(payload) => {
                    let offset = static_len + dynamic.len();
                    dynamic.extend_from_slice(&U256::from(payload.len()).to_be_bytes::<WORD>());
                    dynamic.extend_from_slice(payload);
                    StaticSignature {
                        r: owner.into_word(),
                        s: B256::from(U256::from(offset)),
                        v: 0,
                    }
                }
            };
            table.extend_from_slice(&slot.to_bytes());
        }
        table.extend(dynamic);
        table.into()
    }

    fn ecdsa(self, owner: Address, signature: &Signature, base_v: u8) -> Self {
        let slot = StaticSignature {
            r: B256::from(signature.r()),
            s: B256::from(signature.s()),
            v: base_v + u8::from(signature.v()),
        };
        self.push(owner, Pending::Static(slot))
    }

    fn push(mut self, owner: Address, pending: Pending) -> Self {
        self.signatures.push((owner, pending));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::{SignatureBlob, SignatureEntry, SignatureKind, SignerCount};

    fn signature(fill: u8, y_parity: bool) -> Signature {
        Signature::new(
            U256::from_be_bytes([fill; 32]),
            U256::from_be_bytes([fill.wrapping_add(1); 32]),
            y_parity,
        )
    }

    #[test]
    fn test_build_sorts_by_owner() {
        let low = Address::repeat_byte(0x01);
        let mid = Address::repeat_byte(0x02);
        let high = Address::repeat_byte(0x03);
        let blob = SignatureBlobBuilder::new()
            .eoa(high, &signature(0x10, false))
            .approved_hash(low)
            .eth_sign(mid, &signature(0x20, true))
            .build();
        assert_eq!(blob.len(), 3 * SIGNATURE_LEN);

        let parsed = SignatureBlob::from_bytes(&blob, SignerCount::Inferred).unwrap();
        let kinds: Vec<_> = parsed.entries().iter().map(SignatureEntry::kind).collect();
        assert_eq!(
            kinds,
            [
                SignatureKind::ApprovedHash,
                SignatureKind::EthSign,
                SignatureKind::Eoa
            ]
        );
        assert_eq!(parsed.entries()[0].owner(), Some(low));
        match &parsed.entries()[1] {
            SignatureEntry::EthSign(slot) => {
                assert_eq!(slot.v, 32);
                assert_eq!(slot.r, B256::repeat_byte(0x20));
                assert_eq!(slot.s, B256::repeat_byte(0x21));
            }
            other => panic!("unexpected entry: {other:?}"),
        }
        match &parsed.entries()[2] {
            SignatureEntry::Eoa(slot) => assert_eq!(slot.v, 27),
            other => panic!("unexpected entry: {other:?}"),
        }
    }

    #[test]
    fn test_build_contract_payloads_round_trip() {
        let first = Address::repeat_byte(0x0a);
        let second = Address::repeat_byte(0x0b);
        let eoa_owner = Address::repeat_byte(0x0c);
        let blob = SignatureBlobBuilder::new()
            .contract(second, Bytes::from_static(&[0xbb; 70]))
            .eoa(eoa_owner, &signature(0x30, true))
            .contract(first, Bytes::from_static(&[0xaa; 3]))
            .build();

        let parsed = SignatureBlob::from_bytes(&blob, SignerCount::Inferred).unwrap();
        assert_eq!(parsed.len(), 3);
        let contracts: Vec<_> = parsed
            .contract_signatures()
            .map(|(index, sig)| (index, sig.verifier, sig.offset, sig.payload.len()))
            .collect();
        assert_eq!(
            contracts,
            [(0, first, 195, 3), (1, second, 195 + 32 + 3, 70)]
        );
        assert_eq!(parsed.dynamic_part().len(), 32 + 3 + 32 + 70);
        assert_eq!(parsed, SignatureBlob::from_bytes(&blob, SignerCount::Exact(3)).unwrap());
    }

    #[test]
    fn test_nested_safe_signature() {
        let inner_owner = Address::repeat_byte(0x01);
        let inner = SignatureBlobBuilder::new()
            .eoa(inner_owner, &signature(0x40, false))
            .build();
        let inner_safe = Address::repeat_byte(0x99);
        let outer = SignatureBlobBuilder::new().contract(inner_safe, inner).build();

        let parsed = SignatureBlob::from_bytes(&outer, SignerCount::Inferred).unwrap();
        parsed.validate_nested(1).unwrap();
        let (_, sig) = parsed.contract_signatures().next().unwrap();
        let nested = sig.nested(1).unwrap();
        assert_eq!(nested.entries()[0].kind(), SignatureKind::Eoa);
    }
}
