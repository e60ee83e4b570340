//! Hex and integer encoding helpers.
//!
//! Byte strings crossing the public surface are `0x`-prefixed hex, lowercase
//! or mixed case. [`decode_hex`] is strict about digit parity;
//! [`decode_hex_lenient`] left-pads a single nibble instead, which is how
//! established EIP-712 libraries treat odd-length `bytes` values.

use std::fmt;

use alloy_primitives::{U256, hex};
use serde::de::{self, Visitor};
use serde::Deserializer;

/// Errors produced while decoding a `0x`-prefixed hex string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum HexError {
    /// The string does not start with `0x`.
    #[error("hex string must start with 0x")]
    MissingPrefix,
    /// The string has an odd number of hex digits.
    #[error("hex string has an odd number of digits ({0})")]
    OddLength(usize),
    /// The string contains a character that is not a hex digit.
    #[error("invalid hex digit {c:?} at position {index}")]
    InvalidDigit {
        /// The offending character.
        c: char,
        /// Position of the character after the `0x` prefix.
        index: usize,
    },
}

fn strip_hex_prefix(s: &str) -> Result<&str, HexError> {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or(HexError::MissingPrefix)
}

fn decode_digits(digits: &str) -> Result<Vec<u8>, HexError> {
    if let Some((index, c)) = digits.char_indices().find(|(_, c)| !c.is_ascii_hexdigit()) {
        return Err(HexError::InvalidDigit { c, index });
    }
    hex::decode(digits).map_err(|_| HexError::OddLength(digits.len()))
}

/// Decodes a `0x`-prefixed hex string with an even number of digits.
///
/// # Errors
///
/// Returns [`HexError`] if the prefix is missing, a digit is invalid, or the
/// digit count is odd.
pub fn decode_hex(s: &str) -> Result<Vec<u8>, HexError> {
    let digits = strip_hex_prefix(s)?;
    if digits.len() % 2 != 0 {
        return Err(HexError::OddLength(digits.len()));
    }
    decode_digits(digits)
}

/// Decodes a `0x`-prefixed hex string, left-padding odd-length input with a
/// zero nibble (`0x123` decodes as `0x0123`).
///
/// # Errors
///
/// Returns [`HexError`] if the prefix is missing or a digit is invalid.
pub fn decode_hex_lenient(s: &str) -> Result<Vec<u8>, HexError> {
    let digits = strip_hex_prefix(s)?;
    if digits.len() % 2 == 0 {
        decode_digits(digits)
    } else {
        decode_digits(&format!("0{digits}"))
    }
}

/// Encodes bytes as a lowercase `0x`-prefixed hex string.
#[must_use]
pub fn encode_hex<T: AsRef<[u8]>>(bytes: T) -> String {
    hex::encode_prefixed(bytes)
}

/// Parses an unsigned 256-bit integer written in decimal or `0x`-hex.
///
/// Returns `None` for empty input, stray characters, or values wider than
/// 256 bits.
#[must_use]
pub fn parse_u256(s: &str) -> Option<U256> {
    let s = s.trim();
    if let Some(digits) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        U256::from_str_radix(digits, 16).ok()
    } else {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        U256::from_str_radix(s, 10).ok()
    }
}

/// Serde adapter for [`U256`] values written as JSON numbers, decimal strings
/// or `0x`-hex strings. Serializes as a decimal string.
pub mod uint {
    use super::{U256, UintVisitor};
    use serde::{Deserializer, Serializer};

    /// Serializes a [`U256`] as a decimal string.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    /// Deserializes a [`U256`] from a number or a decimal/hex string.
    ///
    /// # Errors
    ///
    /// Fails on negative, fractional, or malformed input.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        deserializer.deserialize_any(UintVisitor)
    }
}

/// Serde adapter for optional [`U256`] values, see [`uint`].
pub mod uint_opt {
    use super::{OptionUintVisitor, U256};
    use serde::{Deserializer, Serializer};

    /// Serializes an optional [`U256`] as a decimal string or `null`.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(
        value: &Option<U256>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => serializer.serialize_str(&value.to_string()),
            None => serializer.serialize_none(),
        }
    }

    /// Deserializes an optional [`U256`]; `null` maps to `None`.
    ///
    /// # Errors
    ///
    /// Fails on negative, fractional, or malformed input.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<U256>, D::Error> {
        deserializer.deserialize_option(OptionUintVisitor)
    }
}

struct UintVisitor;

impl Visitor<'_> for UintVisitor {
    type Value = U256;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an unsigned integer as a number, decimal string or 0x-hex string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(U256::from(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        u64::try_from(v)
            .map(U256::from)
            .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        parse_u256(v).ok_or_else(|| E::invalid_value(de::Unexpected::Str(v), &self))
    }
}

struct OptionUintVisitor;

impl<'de> Visitor<'de> for OptionUintVisitor {
    type Value = Option<U256>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an optional unsigned integer")
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(UintVisitor).map(Some)
    }
}
