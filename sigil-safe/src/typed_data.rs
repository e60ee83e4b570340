//! Typed data for Safe transactions and Safe messages.
//!
//! Safe contracts sign one of two fixed struct types:
//!
//! ```text
//! SafeTx(address to,uint256 value,bytes data,uint8 operation,uint256 safeTxGas,
//!        uint256 baseGas,uint256 gasPrice,address gasToken,address refundReceiver,
//!        uint256 nonce)
//! SafeMessage(bytes message)
//! ```
//!
//! The domain always names the Safe as `verifyingContract`; whether it also
//! carries `chainId` depends on the Safe version, see [`DomainShape`].

use alloy_primitives::{Address, B256, Bytes, U256, eip191_hash_message};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sigil::encoding::encode_hex;
use sigil::{HashingLimits, TypeField, TypedData, TypedDataDomain, Types};

#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::error::InvalidOperation;
use crate::version::{DomainShape, SafeVersion};
use crate::SafeError;

/// Primary type of a Safe transaction.
pub const SAFE_TX_TYPE: &str = "SafeTx";

/// Primary type of a Safe message.
pub const SAFE_MESSAGE_TYPE: &str = "SafeMessage";

/// Call type of a Safe transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Operation {
    /// A regular `CALL`.
    #[default]
    Call = 0,
    /// A `DELEGATECALL` into the target.
    DelegateCall = 1,
}

impl From<Operation> for u8 {
    fn from(operation: Operation) -> Self {
        operation as Self
    }
}

impl TryFrom<u8> for Operation {
    type Error = InvalidOperation;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Call),
            1 => Ok(Self::DelegateCall),
            other => Err(InvalidOperation(other)),
        }
    }
}

/// The ten fields of a Safe transaction.
///
/// Integers accept JSON numbers, decimal strings or `0x`-hex strings. Only
/// `to` and `nonce` are required; the rest default to zero, empty calldata,
/// [`Operation::Call`] and the zero address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeTransactionData {
    /// Call target.
    pub to: Address,
    /// Wei sent with the call.
    #[serde(default, with = "sigil::encoding::uint")]
    pub value: U256,
    /// Calldata.
    #[serde(default)]
    pub data: Bytes,
    /// Call or delegatecall.
    #[serde(default)]
    pub operation: Operation,
    /// Gas forwarded to the inner call.
    #[serde(default, with = "sigil::encoding::uint")]
    pub safe_tx_gas: U256,
    /// Gas charged for everything outside the inner call.
    #[serde(default, with = "sigil::encoding::uint")]
    pub base_gas: U256,
    /// Gas price used for the refund.
    #[serde(default, with = "sigil::encoding::uint")]
    pub gas_price: U256,
    /// Refund token, zero for ether.
    #[serde(default)]
    pub gas_token: Address,
    /// Refund recipient, zero for `tx.origin`.
    #[serde(default)]
    pub refund_receiver: Address,
    /// Safe nonce.
    #[serde(with = "sigil::encoding::uint")]
    pub nonce: U256,
}

impl SafeTransactionData {
    /// A plain call with no refund settings.
    #[must_use]
    pub fn call(to: Address, value: U256, data: Bytes, nonce: U256) -> Self {
        Self {
            to,
            value,
            data,
            operation: Operation::Call,
            safe_tx_gas: U256::ZERO,
            base_gas: U256::ZERO,
            gas_price: U256::ZERO,
            gas_token: Address::ZERO,
            refund_receiver: Address::ZERO,
            nonce,
        }
    }

    /// The transaction as a `SafeTx` message value.
    #[must_use]
    pub fn to_message(&self) -> Value {
        json!({
            "to": self.to.to_string(),
            "value": self.value.to_string(),
            "data": encode_hex(&self.data),
            "operation": u8::from(self.operation),
            "safeTxGas": self.safe_tx_gas.to_string(),
            "baseGas": self.base_gas.to_string(),
            "gasPrice": self.gas_price.to_string(),
            "gasToken": self.gas_token.to_string(),
            "refundReceiver": self.refund_receiver.to_string(),
            "nonce": self.nonce.to_string(),
        })
    }
}

/// An off-chain message signed by Safe owners.
#[derive(Debug, Clone, PartialEq)]
pub enum SafeMessage {
    /// A plain text message, hashed with the EIP-191 personal-message prefix.
    Text(String),
    /// A nested typed-data document, hashed with its own EIP-712 digest.
    TypedData(Box<TypedData>),
}

impl SafeMessage {
    /// The 32-byte hash embedded as `SafeMessage.message`.
    ///
    /// # Errors
    ///
    /// Returns [`SafeError::Eip712`] if a nested typed-data document is invalid.
    pub fn hash(&self, limits: HashingLimits) -> Result<B256, SafeError> {
        match self {
            Self::Text(text) => Ok(eip191_hash_message(text.as_bytes())),
            Self::TypedData(typed) => Ok(typed.eip712_signing_hash_with(limits)?),
        }
    }
}

/// Either kind of payload a Safe signs.
#[derive(Debug, Clone, PartialEq)]
pub enum SafePayload {
    /// A `SafeTx`.
    Transaction(SafeTransactionData),
    /// A `SafeMessage`.
    Message(SafeMessage),
}

impl SafePayload {
    /// Classifies a JSON payload.
    ///
    /// An object with a `to` member is a transaction, a string is a text
    /// message, and anything else is parsed as nested typed data.
    ///
    /// # Errors
    ///
    /// Returns [`SafeError::InvalidTransaction`] for a malformed transaction
    /// and [`SafeError::Eip712`] for malformed typed data.
    pub fn from_json(value: Value) -> Result<Self, SafeError> {
        if value.as_object().is_some_and(|map| map.contains_key("to")) {
            return serde_json::from_value(value)
                .map(Self::Transaction)
                .map_err(SafeError::InvalidTransaction);
        }
        match value {
            Value::String(text) => Ok(Self::Message(SafeMessage::Text(text))),
            other => {
                let typed = TypedData::from_json_value(other)?;
                Ok(Self::Message(SafeMessage::TypedData(Box::new(typed))))
            }
        }
    }
}

impl From<SafeTransactionData> for SafePayload {
    fn from(tx: SafeTransactionData) -> Self {
        Self::Transaction(tx)
    }
}

impl From<SafeMessage> for SafePayload {
    fn from(message: SafeMessage) -> Self {
        Self::Message(message)
    }
}

/// Builds `SafeTx` and `SafeMessage` typed data for one Safe deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeTypedDataFactory {
    safe: Address,
    version: SafeVersion,
    chain_id: U256,
    limits: HashingLimits,
}

impl SafeTypedDataFactory {
    /// Creates a factory for the Safe at `safe` running `version`.
    ///
    /// # Errors
    ///
    /// Returns [`SafeError::UnsupportedSafeVersion`] if `version` is not
    /// valid semver.
    pub fn new(safe: Address, version: &str, chain_id: U256) -> Result<Self, SafeError> {
        Ok(Self::with_version(safe, SafeVersion::parse(version)?, chain_id))
    }

    /// Creates a factory from an already parsed version.
    #[must_use]
    pub fn with_version(safe: Address, version: SafeVersion, chain_id: U256) -> Self {
        Self {
            safe,
            version,
            chain_id,
            limits: HashingLimits::default(),
        }
    }

    /// Sets the limits used when hashing nested typed-data messages.
    #[must_use]
    pub const fn with_limits(mut self, limits: HashingLimits) -> Self {
        self.limits = limits;
        self
    }

    /// The Safe version.
    #[must_use]
    pub const fn version(&self) -> &SafeVersion {
        &self.version
    }

    /// The domain layout selected by the Safe version.
    #[must_use]
    pub fn domain_shape(&self) -> DomainShape {
        self.version.domain_shape()
    }

    /// The signing domain of the Safe.
    #[must_use]
    pub fn domain(&self) -> TypedDataDomain {
        self.domain_shape().domain(self.safe, self.chain_id)
    }

    /// `SafeTx` typed data for a transaction.
    #[must_use]
    pub fn transaction(&self, tx: &SafeTransactionData) -> TypedData {
        TypedData::new(self.domain(), safe_tx_types(), SAFE_TX_TYPE, tx.to_message())
    }

    /// `SafeMessage` typed data for a message.
    ///
    /// # Errors
    ///
    /// Returns [`SafeError::Eip712`] if a nested typed-data message is invalid.
    pub fn message(&self, message: &SafeMessage) -> Result<TypedData, SafeError> {
        let hash = message.hash(self.limits)?;
        Ok(TypedData::new(
            self.domain(),
            safe_message_types(),
            SAFE_MESSAGE_TYPE,
            json!({ "message": encode_hex(hash) }),
        ))
    }

    /// Typed data for either kind of payload.
    ///
    /// # Errors
    ///
    /// Same as [`SafeTypedDataFactory::message`].
    pub fn typed_data(&self, payload: &SafePayload) -> Result<TypedData, SafeError> {
        match payload {
            SafePayload::Transaction(tx) => Ok(self.transaction(tx)),
            SafePayload::Message(message) => self.message(message),
        }
    }

    /// The EIP-712 digest owners sign for `payload`.
    ///
    /// # Errors
    ///
    /// Returns [`SafeError::Eip712`] if the payload cannot be hashed.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "sigil.safe_digest", level = "debug", skip_all, fields(safe = %self.safe))
    )]
    pub fn digest(&self, payload: &SafePayload) -> Result<B256, SafeError> {
        let typed = self.typed_data(payload)?;
        Ok(typed.eip712_signing_hash_with(self.limits)?)
    }
}

/// `SafeTx` digest, the value `getTransactionHash` returns on chain.
///
/// # Errors
///
/// Returns [`SafeError::UnsupportedSafeVersion`] for an unparsable version.
pub fn safe_tx_hash(
    safe: Address,
    version: &str,
    chain_id: U256,
    tx: &SafeTransactionData,
) -> Result<B256, SafeError> {
    let typed = SafeTypedDataFactory::new(safe, version, chain_id)?.transaction(tx);
    Ok(typed.eip712_signing_hash()?)
}

/// `SafeMessage` digest, the value `getMessageHash` returns on chain.
///
/// # Errors
///
/// Returns [`SafeError::UnsupportedSafeVersion`] for an unparsable version,
/// or [`SafeError::Eip712`] if a nested typed-data message is invalid.
pub fn safe_message_hash(
    safe: Address,
    version: &str,
    chain_id: U256,
    message: &SafeMessage,
) -> Result<B256, SafeError> {
    let factory = SafeTypedDataFactory::new(safe, version, chain_id)?;
    let typed = factory.message(message)?;
    Ok(typed.eip712_signing_hash()?)
}

fn safe_tx_types() -> Types {
    let fields = [
        ("to", "address"),
        ("value", "uint256"),
        ("data", "bytes"),
        ("operation", "uint8"),
        ("safeTxGas", "uint256"),
        ("baseGas", "uint256"),
        ("gasPrice", "uint256"),
        ("gasToken", "address"),
        ("refundReceiver", "address"),
        ("nonce", "uint256"),
    ];
    single_type(SAFE_TX_TYPE, &fields)
}

fn safe_message_types() -> Types {
    single_type(SAFE_MESSAGE_TYPE, &[("message", "bytes")])
}

fn single_type(name: &str, fields: &[(&str, &str)]) -> Types {
    let fields = fields
        .iter()
        .map(|(field, ty)| TypeField::new(*field, *ty))
        .collect();
    Types::single(name, fields)
}
