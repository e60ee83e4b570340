//! ABI word encoding of individual typed values.
//!
//! Atomic values (`address`, `bool`, `uintN`, `intN`, `bytesN`) become a single
//! 32-byte ABI word. Dynamic values (`string`, `bytes`) are never inlined: the
//! word is the `keccak256` of their contents.

use std::fmt;

use alloy_primitives::{Address, B256, U256, keccak256};
use serde_json::Value;

use super::error::{Eip712Error, FieldPath};
use crate::encoding::{self, HexError};

const ADDRESS_LEN: usize = 20;

/// A primitive ABI type usable as an EIP-712 struct member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbiType {
    /// `address`
    Address,
    /// `bool`
    Bool,
    /// `uintN`, with the bit width.
    Uint(usize),
    /// `intN`, with the bit width.
    Int(usize),
    /// `bytesN`, with the byte width.
    FixedBytes(usize),
    /// `string`
    String,
    /// `bytes`
    Bytes,
}

impl AbiType {
    /// Parses a primitive type name. Bare `uint`/`int` mean 256 bits.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "address" => return Some(Self::Address),
            "bool" => return Some(Self::Bool),
            "string" => return Some(Self::String),
            "bytes" => return Some(Self::Bytes),
            _ => {}
        }
        if let Some(bits) = name.strip_prefix("uint") {
            return parse_width(bits, 256).filter(|b| b % 8 == 0 && *b <= 256).map(Self::Uint);
        }
        if let Some(bits) = name.strip_prefix("int") {
            return parse_width(bits, 256).filter(|b| b % 8 == 0 && *b <= 256).map(Self::Int);
        }
        if let Some(width) = name.strip_prefix("bytes") {
            return parse_width(width, 0).filter(|w| *w <= 32).map(Self::FixedBytes);
        }
        None
    }

    /// Returns `true` for types hashed rather than inlined.
    #[must_use]
    pub const fn is_dynamic(self) -> bool {
        matches!(self, Self::String | Self::Bytes)
    }
}

fn parse_width(digits: &str, default: usize) -> Option<usize> {
    if digits.is_empty() {
        return (default > 0).then_some(default);
    }
    if digits.starts_with('0') || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|w| *w > 0)
}

impl fmt::Display for AbiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address => f.write_str("address"),
            Self::Bool => f.write_str("bool"),
            Self::Uint(bits) => write!(f, "uint{bits}"),
            Self::Int(bits) => write!(f, "int{bits}"),
            Self::FixedBytes(width) => write!(f, "bytes{width}"),
            Self::String => f.write_str("string"),
            Self::Bytes => f.write_str("bytes"),
        }
    }
}

/// Encodes a primitive value as the ABI word used inside a struct hash.
///
/// # Errors
///
/// Returns [`Eip712Error::MalformedHex`] or [`Eip712Error::InvalidFieldValue`]
/// if `value` does not satisfy `ty`.
pub fn encode_atomic(ty: AbiType, value: &Value, path: &FieldPath) -> Result<B256, Eip712Error> {
    let word = match ty {
        AbiType::Address => parse_address(value, path)?.into_word(),
        AbiType::Bool => B256::with_last_byte(u8::from(parse_bool(value, path)?)),
        AbiType::Uint(bits) => B256::from(parse_uint(value, bits, path)?.to_be_bytes::<32>()),
        AbiType::Int(bits) => B256::from(parse_int(value, bits, path)?.to_be_bytes::<32>()),
        AbiType::FixedBytes(width) => {
            B256::right_padding_from(&parse_fixed_bytes(value, width, path)?)
        }
        AbiType::String => keccak256(parse_string(value, path)?.as_bytes()),
        AbiType::Bytes => keccak256(parse_bytes(value, path)?),
    };
    Ok(word)
}

/// Checks that a primitive value satisfies its type without hashing it.
///
/// # Errors
///
/// Same as [`encode_atomic`].
pub fn check_atomic(ty: AbiType, value: &Value, path: &FieldPath) -> Result<(), Eip712Error> {
    match ty {
        AbiType::Address => parse_address(value, path).map(drop),
        AbiType::Bool => parse_bool(value, path).map(drop),
        AbiType::Uint(bits) => parse_uint(value, bits, path).map(drop),
        AbiType::Int(bits) => parse_int(value, bits, path).map(drop),
        AbiType::FixedBytes(width) => parse_fixed_bytes(value, width, path).map(drop),
        AbiType::String => parse_string(value, path).map(drop),
        AbiType::Bytes => parse_bytes(value, path).map(drop),
    }
}

fn expect_str<'v>(value: &'v Value, ty: AbiType, path: &FieldPath) -> Result<&'v str, Eip712Error> {
    value
        .as_str()
        .ok_or_else(|| Eip712Error::invalid_value(path, ty, format!("expected a string, got {value}")))
}

fn malformed(path: &FieldPath) -> impl FnOnce(HexError) -> Eip712Error + '_ {
    move |source| Eip712Error::MalformedHex {
        path: path.clone(),
        source,
    }
}

pub(crate) fn parse_address(value: &Value, path: &FieldPath) -> Result<Address, Eip712Error> {
    let text = expect_str(value, AbiType::Address, path)?;
    let bytes = encoding::decode_hex(text).map_err(malformed(path))?;
    if bytes.len() != ADDRESS_LEN {
        return Err(Eip712Error::invalid_value(
            path,
            AbiType::Address,
            format!("expected 20 bytes, got {}", bytes.len()),
        ));
    }
    Ok(Address::from_slice(&bytes))
}

fn parse_bool(value: &Value, path: &FieldPath) -> Result<bool, Eip712Error> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) if s == "true" => Ok(true),
        Value::String(s) if s == "false" => Ok(false),
        _ => Err(Eip712Error::invalid_value(
            path,
            AbiType::Bool,
            format!("expected a boolean, got {value}"),
        )),
    }
}

/// Reads a JSON integer, decimal string or `0x`-hex string as sign and magnitude.
fn parse_integer(value: &Value, ty: AbiType, path: &FieldPath) -> Result<(bool, U256), Eip712Error> {
    match value {
        Value::Number(n) => {
            if let Some(v) = n.as_u64() {
                Ok((false, U256::from(v)))
            } else if let Some(v) = n.as_i64() {
                Ok((v < 0, U256::from(v.unsigned_abs())))
            } else {
                Err(Eip712Error::invalid_value(path, ty, format!("{n} is not an integer")))
            }
        }
        Value::String(s) => {
            let trimmed = s.trim();
            let (negative, digits) = trimmed
                .strip_prefix('-')
                .map_or((false, trimmed), |rest| (true, rest));
            encoding::parse_u256(digits)
                .map(|magnitude| (negative, magnitude))
                .ok_or_else(|| Eip712Error::invalid_value(path, ty, format!("{s:?} is not an integer")))
        }
        _ => Err(Eip712Error::invalid_value(
            path,
            ty,
            format!("expected an integer, got {value}"),
        )),
    }
}

pub(crate) fn parse_uint(value: &Value, bits: usize, path: &FieldPath) -> Result<U256, Eip712Error> {
    let ty = AbiType::Uint(bits);
    let (negative, magnitude) = parse_integer(value, ty, path)?;
    if negative && !magnitude.is_zero() {
        return Err(Eip712Error::invalid_value(path, ty, "negative value"));
    }
    if magnitude.bit_len() > bits {
        return Err(Eip712Error::invalid_value(
            path,
            ty,
            format!("{magnitude} does not fit in {bits} bits"),
        ));
    }
    Ok(magnitude)
}

/// Returns the two's complement 256-bit representation of a signed value.
fn parse_int(value: &Value, bits: usize, path: &FieldPath) -> Result<U256, Eip712Error> {
    let ty = AbiType::Int(bits);
    let (negative, magnitude) = parse_integer(value, ty, path)?;
    let bound = U256::from(1u8) << (bits - 1);
    let out_of_range = if negative {
        magnitude > bound
    } else {
        magnitude >= bound
    };
    if out_of_range {
        return Err(Eip712Error::invalid_value(path, ty, "value out of range"));
    }
    Ok(if negative {
        U256::ZERO.wrapping_sub(magnitude)
    } else {
        magnitude
    })
}

pub(crate) fn parse_fixed_bytes(
    value: &Value,
    width: usize,
    path: &FieldPath,
) -> Result<Vec<u8>, Eip712Error> {
    let ty = AbiType::FixedBytes(width);
    let text = expect_str(value, ty, path)?;
    let bytes = encoding::decode_hex(text).map_err(malformed(path))?;
    if bytes.len() != width {
        return Err(Eip712Error::invalid_value(
            path,
            ty,
            format!("expected {width} bytes, got {}", bytes.len()),
        ));
    }
    Ok(bytes)
}

pub(crate) fn parse_string<'v>(value: &'v Value, path: &FieldPath) -> Result<&'v str, Eip712Error> {
    expect_str(value, AbiType::String, path)
}

fn parse_bytes(value: &Value, path: &FieldPath) -> Result<Vec<u8>, Eip712Error> {
    let text = expect_str(value, AbiType::Bytes, path)?;
    encoding::decode_hex_lenient(text).map_err(malformed(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{b256, hex};
    use serde_json::json;

    fn path() -> FieldPath {
        FieldPath::root("message").field("value")
    }

    #[test]
    fn test_parse_abi_types() {
        assert_eq!(AbiType::parse("address"), Some(AbiType::Address));
        assert_eq!(AbiType::parse("uint8"), Some(AbiType::Uint(8)));
        assert_eq!(AbiType::parse("uint"), Some(AbiType::Uint(256)));
        assert_eq!(AbiType::parse("int256"), Some(AbiType::Int(256)));
        assert_eq!(AbiType::parse("bytes32"), Some(AbiType::FixedBytes(32)));
        assert_eq!(AbiType::parse("bytes"), Some(AbiType::Bytes));
        assert_eq!(AbiType::parse("uint7"), None);
        assert_eq!(AbiType::parse("uint264"), None);
        assert_eq!(AbiType::parse("uint08"), None);
        assert_eq!(AbiType::parse("bytes0"), None);
        assert_eq!(AbiType::parse("bytes33"), None);
        assert_eq!(AbiType::parse("Person"), None);
    }

    #[test]
    fn test_encode_address_left_pads() {
        let word = encode_atomic(
            AbiType::Address,
            &json!("0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826"),
            &path(),
        )
        .unwrap();
        assert_eq!(
            word,
            b256!("0x000000000000000000000000cd2a3d9f938e13cd947ec05abc7fe734df8dd826")
        );
    }

    #[test]
    fn test_encode_address_rejects_short_value() {
        let err = encode_atomic(AbiType::Address, &json!("0x1234"), &path()).unwrap_err();
        assert!(matches!(err, Eip712Error::InvalidFieldValue { .. }));
    }

    #[test]
    fn test_encode_address_rejects_missing_prefix() {
        let err = encode_atomic(
            AbiType::Address,
            &json!("cd2a3d9f938e13cd947ec05abc7fe734df8dd826"),
            &path(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Eip712Error::MalformedHex {
                source: HexError::MissingPrefix,
                ..
            }
        ));
    }

    #[test]
    fn test_encode_uint_accepts_number_and_strings() {
        let expected = B256::with_last_byte(42);
        for value in [json!(42), json!("42"), json!("0x2a")] {
            assert_eq!(encode_atomic(AbiType::Uint(8), &value, &path()).unwrap(), expected);
        }
    }

    #[test]
    fn test_encode_uint_rejects_overflow_and_negative() {
        assert!(encode_atomic(AbiType::Uint(8), &json!(256), &path()).is_err());
        assert!(encode_atomic(AbiType::Uint(256), &json!(-1), &path()).is_err());
        assert!(encode_atomic(AbiType::Uint(64), &json!(1.5), &path()).is_err());
    }

    #[test]
    fn test_encode_int_sign_extends() {
        let word = encode_atomic(AbiType::Int(8), &json!(-1), &path()).unwrap();
        assert_eq!(word, B256::repeat_byte(0xff));
        let word = encode_atomic(AbiType::Int(8), &json!("-128"), &path()).unwrap();
        assert_eq!(
            word,
            b256!("0xffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff80")
        );
        assert!(encode_atomic(AbiType::Int(8), &json!(128), &path()).is_err());
        assert!(encode_atomic(AbiType::Int(8), &json!(-129), &path()).is_err());
    }

    #[test]
    fn test_encode_fixed_bytes_right_pads() {
        let word = encode_atomic(AbiType::FixedBytes(2), &json!("0xabcd"), &path()).unwrap();
        assert_eq!(word[..2], [0xab, 0xcd]);
        assert!(word[2..].iter().all(|b| *b == 0));
        assert!(encode_atomic(AbiType::FixedBytes(4), &json!("0xabcd"), &path()).is_err());
    }

    #[test]
    fn test_encode_dynamic_values_are_hashed() {
        let word = encode_atomic(AbiType::String, &json!("Hello, Bob!"), &path()).unwrap();
        assert_eq!(word, keccak256("Hello, Bob!"));

        let word = encode_atomic(AbiType::Bytes, &json!("0xdeadbeef"), &path()).unwrap();
        assert_eq!(word, keccak256(hex!("deadbeef")));
    }

    #[test]
    fn test_encode_bytes_pads_odd_length() {
        let odd = encode_atomic(AbiType::Bytes, &json!("0xabc"), &path()).unwrap();
        let even = encode_atomic(AbiType::Bytes, &json!("0x0abc"), &path()).unwrap();
        assert_eq!(odd, even);
    }

    #[test]
    fn test_encode_bytes_rejects_invalid_digit() {
        let err = encode_atomic(AbiType::Bytes, &json!("0xzz"), &path()).unwrap_err();
        assert!(matches!(err, Eip712Error::MalformedHex { .. }));
    }

    #[test]
    fn test_encode_bool() {
        assert_eq!(
            encode_atomic(AbiType::Bool, &json!(true), &path()).unwrap(),
            B256::with_last_byte(1)
        );
        assert_eq!(
            encode_atomic(AbiType::Bool, &json!("false"), &path()).unwrap(),
            B256::ZERO
        );
        assert!(encode_atomic(AbiType::Bool, &json!(1), &path()).is_err());
    }
}
