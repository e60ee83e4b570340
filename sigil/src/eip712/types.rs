//! Typed-data model: struct declarations, the domain, and the document itself.

use std::fmt;

use alloy_primitives::{Address, B256, U256};
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use super::encoder;
use super::error::{Eip712Error, FieldPath};

/// Name of the implicit domain struct type.
pub const EIP712_DOMAIN: &str = "EIP712Domain";

/// A single `{name, type}` member of a struct declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeField {
    /// Member name.
    pub name: String,
    /// Member type: a primitive ABI type, a struct name, or an array of either.
    #[serde(rename = "type")]
    pub ty: String,
}

impl TypeField {
    /// Creates a new member declaration.
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
        }
    }
}

/// Struct type declarations, kept in document order.
///
/// Order matters only for picking a default primary type; hashing always
/// follows the canonical dependency ordering. A name may be declared once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Types {
    entries: Vec<(String, Vec<TypeField>)>,
}

impl Types {
    /// Creates an empty declaration set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// A set declaring exactly one struct type.
    #[must_use]
    pub fn single(name: impl Into<String>, fields: Vec<TypeField>) -> Self {
        Self {
            entries: vec![(name.into(), fields)],
        }
    }

    /// Declares a struct type.
    ///
    /// # Errors
    ///
    /// Returns [`Eip712Error::DuplicateType`] if `name` is already declared.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        fields: Vec<TypeField>,
    ) -> Result<(), Eip712Error> {
        let name = name.into();
        if self.contains(&name) {
            return Err(Eip712Error::DuplicateType(name));
        }
        self.entries.push((name, fields));
        Ok(())
    }

    /// Returns the members of a declared type.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[TypeField]> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, fields)| fields.as_slice())
    }

    /// Returns `true` if `name` is declared.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    /// Iterates declarations in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[TypeField])> {
        self.entries
            .iter()
            .map(|(name, fields)| (name.as_str(), fields.as_slice()))
    }

    /// Number of declared types.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no type is declared.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First declared type other than `EIP712Domain`.
    #[must_use]
    pub fn first_message_type(&self) -> Option<&str> {
        self.entries
            .iter()
            .map(|(name, _)| name.as_str())
            .find(|name| *name != EIP712_DOMAIN)
    }
}

impl Serialize for Types {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, fields) in &self.entries {
            map.serialize_entry(name, fields)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Types {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TypesVisitor;

        impl<'de> Visitor<'de> for TypesVisitor {
            type Value = Types;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of struct type names to member lists")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut types = Types::new();
                while let Some((name, fields)) = access.next_entry::<String, Vec<TypeField>>()? {
                    types.insert(name, fields).map_err(de::Error::custom)?;
                }
                Ok(types)
            }
        }

        deserializer.deserialize_map(TypesVisitor)
    }
}

/// The EIP-712 signing domain.
///
/// Only populated fields contribute to the implicit `EIP712Domain` struct,
/// so a domain without `chain_id` hashes differently from one with a zero
/// chain id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedDataDomain {
    /// Human-readable signing domain name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Current major version of the signing domain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// EIP-155 chain id.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::encoding::uint_opt"
    )]
    pub chain_id: Option<U256>,
    /// Address of the contract that will verify the signature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifying_contract: Option<Address>,
    /// Disambiguating salt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<B256>,
}

impl TypedDataDomain {
    /// Members of the `EIP712Domain` struct implied by the populated fields,
    /// in canonical order.
    #[must_use]
    pub fn eip712_fields(&self) -> Vec<TypeField> {
        let mut fields = Vec::with_capacity(5);
        if self.name.is_some() {
            fields.push(TypeField::new("name", "string"));
        }
        if self.version.is_some() {
            fields.push(TypeField::new("version", "string"));
        }
        if self.chain_id.is_some() {
            fields.push(TypeField::new("chainId", "uint256"));
        }
        if self.verifying_contract.is_some() {
            fields.push(TypeField::new("verifyingContract", "address"));
        }
        if self.salt.is_some() {
            fields.push(TypeField::new("salt", "bytes32"));
        }
        fields
    }

    /// The domain as a JSON object holding only the populated fields.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        if let Some(name) = &self.name {
            map.insert("name".into(), Value::String(name.clone()));
        }
        if let Some(version) = &self.version {
            map.insert("version".into(), Value::String(version.clone()));
        }
        if let Some(chain_id) = &self.chain_id {
            map.insert("chainId".into(), Value::String(chain_id.to_string()));
        }
        if let Some(contract) = &self.verifying_contract {
            map.insert("verifyingContract".into(), Value::String(contract.to_string()));
        }
        if let Some(salt) = &self.salt {
            map.insert("salt".into(), Value::String(salt.to_string()));
        }
        Value::Object(map)
    }

    /// Parses a domain object, reporting invalid members by path.
    ///
    /// `null` yields an empty domain; unknown keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Eip712Error`] if a known member has the wrong type.
    pub fn from_json(value: &Value, path: &FieldPath) -> Result<Self, Eip712Error> {
        let map = match value {
            Value::Null => return Ok(Self::default()),
            Value::Object(map) => map,
            _ => return Err(Eip712Error::invalid_value(path, EIP712_DOMAIN, "expected an object")),
        };
        let member = |key: &str| map.get(key).filter(|v| !v.is_null());

        let mut domain = Self::default();
        if let Some(v) = member("name") {
            domain.name = Some(encoder::parse_string(v, &path.field("name"))?.to_owned());
        }
        if let Some(v) = member("version") {
            domain.version = Some(encoder::parse_string(v, &path.field("version"))?.to_owned());
        }
        if let Some(v) = member("chainId") {
            domain.chain_id = Some(encoder::parse_uint(v, 256, &path.field("chainId"))?);
        }
        if let Some(v) = member("verifyingContract") {
            domain.verifying_contract =
                Some(encoder::parse_address(v, &path.field("verifyingContract"))?);
        }
        if let Some(v) = member("salt") {
            let salt = encoder::parse_fixed_bytes(v, 32, &path.field("salt"))?;
            domain.salt = Some(B256::from_slice(&salt));
        }
        Ok(domain)
    }
}

/// A complete EIP-712 typed-data document.
///
/// `primary_type` falls back to the first declared type other than
/// `EIP712Domain`. An `EIP712Domain` declaration in `types` is ignored: the
/// domain struct is always derived from the populated [`TypedDataDomain`]
/// fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawTypedData")]
pub struct TypedData {
    /// Signing domain.
    pub domain: TypedDataDomain,
    /// Struct declarations.
    pub types: Types,
    /// Struct type of `message`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_type: Option<String>,
    /// The value being signed.
    pub message: Value,
}

impl TypedData {
    /// Creates a typed-data document with an explicit primary type.
    pub fn new(
        domain: TypedDataDomain,
        types: Types,
        primary_type: impl Into<String>,
        message: Value,
    ) -> Self {
        Self {
            domain,
            types,
            primary_type: Some(primary_type.into()),
            message,
        }
    }

    /// Parses a typed-data JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`Eip712Error::Json`] for malformed JSON or duplicate type
    /// declarations, and a path-bearing error for invalid domain members.
    pub fn from_json_str(json: &str) -> Result<Self, Eip712Error> {
        let raw: RawTypedData = serde_json::from_str(json)?;
        raw.try_into()
    }

    /// Parses a typed-data document from an already decoded JSON value.
    ///
    /// # Errors
    ///
    /// Same as [`TypedData::from_json_str`].
    pub fn from_json_value(value: Value) -> Result<Self, Eip712Error> {
        let raw: RawTypedData = serde_json::from_value(value)?;
        raw.try_into()
    }

    /// The effective primary type.
    ///
    /// # Errors
    ///
    /// Returns [`Eip712Error::MissingPrimaryType`] if none is given and no
    /// message type is declared.
    pub fn primary_type(&self) -> Result<&str, Eip712Error> {
        self.primary_type
            .as_deref()
            .or_else(|| self.types.first_message_type())
            .ok_or(Eip712Error::MissingPrimaryType)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTypedData {
    #[serde(default)]
    domain: Value,
    #[serde(default)]
    types: Types,
    #[serde(default)]
    primary_type: Option<String>,
    #[serde(default)]
    message: Value,
}

impl TryFrom<RawTypedData> for TypedData {
    type Error = Eip712Error;

    fn try_from(raw: RawTypedData) -> Result<Self, Self::Error> {
        let domain = TypedDataDomain::from_json(&raw.domain, &FieldPath::root("domain"))?;
        Ok(Self {
            domain,
            types: raw.types,
            primary_type: raw.primary_type,
            message: raw.message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use serde_json::json;

    #[test]
    fn test_types_preserve_document_order() {
        let types: Types = serde_json::from_str(
            r#"{
                "Zebra": [{"name": "a", "type": "uint8"}],
                "EIP712Domain": [{"name": "name", "type": "string"}],
                "Apple": [{"name": "b", "type": "bool"}]
            }"#,
        )
        .unwrap();
        let names: Vec<&str> = types.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["Zebra", "EIP712Domain", "Apple"]);
        assert_eq!(types.first_message_type(), Some("Zebra"));
    }

    #[test]
    fn test_types_reject_duplicates() {
        let result: Result<Types, _> = serde_json::from_str(
            r#"{
                "Mail": [{"name": "a", "type": "uint8"}],
                "Mail": [{"name": "b", "type": "uint8"}]
            }"#,
        );
        let err = result.unwrap_err();
        assert!(err.to_string().contains("defined more than once"));
    }

    #[test]
    fn test_types_single() {
        let mut types = Types::single("Ping", vec![TypeField::new("nonce", "uint256")]);
        assert_eq!(types.len(), 1);
        assert_eq!(types.first_message_type(), Some("Ping"));
        assert_eq!(types.get("Ping"), Some(&[TypeField::new("nonce", "uint256")][..]));
        assert!(types.insert("Ping", Vec::new()).is_err());
    }

    #[test]
    fn test_types_insert_duplicate() {
        let mut types = Types::new();
        types.insert("Mail", vec![]).unwrap();
        assert!(matches!(
            types.insert("Mail", vec![]),
            Err(Eip712Error::DuplicateType(name)) if name == "Mail"
        ));
    }

    #[test]
    fn test_domain_fields_follow_populated_members() {
        let domain = TypedDataDomain {
            chain_id: Some(U256::from(1)),
            verifying_contract: Some(address!("0x1111111111111111111111111111111111111111")),
            ..TypedDataDomain::default()
        };
        let fields = domain.eip712_fields();
        assert_eq!(
            fields,
            vec![
                TypeField::new("chainId", "uint256"),
                TypeField::new("verifyingContract", "address"),
            ]
        );
        let value = domain.to_json();
        assert_eq!(value["chainId"], json!("1"));
        assert!(value.get("name").is_none());
    }

    #[test]
    fn test_domain_from_json_reports_path() {
        let err = TypedDataDomain::from_json(
            &json!({"verifyingContract": "0x1234"}),
            &FieldPath::root("domain"),
        )
        .unwrap_err();
        assert_eq!(
            err.path().map(FieldPath::as_str),
            Some("domain.verifyingContract")
        );
    }

    #[test]
    fn test_domain_from_json_accepts_numeric_chain_id() {
        let domain = TypedDataDomain::from_json(
            &json!({"name": "Ether Mail", "chainId": 137, "salt": null}),
            &FieldPath::root("domain"),
        )
        .unwrap();
        assert_eq!(domain.chain_id, Some(U256::from(137)));
        assert_eq!(domain.name.as_deref(), Some("Ether Mail"));
        assert_eq!(domain.salt, None);
    }

    #[test]
    fn test_typed_data_default_primary_type() {
        let typed = TypedData::from_json_str(
            r#"{
                "types": {
                    "EIP712Domain": [{"name": "name", "type": "string"}],
                    "Person": [{"name": "name", "type": "string"}]
                },
                "domain": {"name": "Test"},
                "message": {"name": "Alice"}
            }"#,
        )
        .unwrap();
        assert_eq!(typed.primary_type().unwrap(), "Person");
    }

    #[test]
    fn test_typed_data_missing_primary_type() {
        let typed = TypedData::from_json_str(r#"{"domain": {"name": "Test"}}"#).unwrap();
        assert!(matches!(
            typed.primary_type(),
            Err(Eip712Error::MissingPrimaryType)
        ));
    }
}
