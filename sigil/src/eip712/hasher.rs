//! `encodeType`, `hashType`, `encodeData` and `hashStruct`.

use std::collections::HashMap;

use alloy_primitives::{B256, keccak256};
use serde_json::Value;

use super::encoder::encode_atomic;
use super::error::{Eip712Error, FieldPath};
use super::graph::{FieldKind, TypeGraph};

/// Default bound on struct and array nesting while hashing.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Bounds applied while walking a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingLimits {
    /// Maximum struct/array nesting below the root value.
    pub max_depth: usize,
}

impl Default for HashingLimits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Hashes struct values against a [`TypeGraph`].
///
/// Type hashes are memoized for the lifetime of the hasher, which callers
/// create once per digest computation.
#[derive(Debug)]
pub struct StructHasher<'g> {
    graph: &'g TypeGraph,
    limits: HashingLimits,
    type_hashes: HashMap<usize, B256>,
}

impl<'g> StructHasher<'g> {
    /// Creates a hasher over `graph`.
    #[must_use]
    pub fn new(graph: &'g TypeGraph, limits: HashingLimits) -> Self {
        Self {
            graph,
            limits,
            type_hashes: HashMap::new(),
        }
    }

    /// The type graph this hasher reads declarations from.
    #[must_use]
    pub const fn graph(&self) -> &'g TypeGraph {
        self.graph
    }

    /// `encodeType` for the struct at `id`, e.g.
    /// `Mail(Person from,Person to,string contents)Person(string name,address wallet)`.
    #[must_use]
    pub fn encode_type(&self, id: usize) -> String {
        let mut out = String::new();
        for dep in self.graph.resolve(id) {
            self.graph.write_signature(dep, &mut out);
        }
        out
    }

    /// `keccak256(encodeType)` for the struct at `id`.
    pub fn hash_type(&mut self, id: usize) -> B256 {
        if let Some(hash) = self.type_hashes.get(&id) {
            return *hash;
        }
        let hash = keccak256(self.encode_type(id).as_bytes());
        self.type_hashes.insert(id, hash);
        hash
    }

    /// `hashType || enc(field_1) || ... || enc(field_n)` for a struct value.
    ///
    /// # Errors
    ///
    /// Returns [`Eip712Error`] naming the offending path if a member is
    /// missing, has the wrong shape, or nests deeper than the configured limit.
    pub fn encode_data(
        &mut self,
        id: usize,
        value: &Value,
        path: &FieldPath,
    ) -> Result<Vec<u8>, Eip712Error> {
        self.encode_struct(id, value, path, 0)
    }

    /// `keccak256(encodeData)` for a struct value.
    ///
    /// # Errors
    ///
    /// Same as [`StructHasher::encode_data`].
    pub fn hash_struct(
        &mut self,
        id: usize,
        value: &Value,
        path: &FieldPath,
    ) -> Result<B256, Eip712Error> {
        self.encode_data(id, value, path).map(keccak256)
    }

    fn encode_struct(
        &mut self,
        id: usize,
        value: &Value,
        path: &FieldPath,
        depth: usize,
    ) -> Result<Vec<u8>, Eip712Error> {
        let graph = self.graph;
        let object = value.as_object().ok_or_else(|| {
            Eip712Error::invalid_value(path, graph.name(id), format!("expected an object, got {value}"))
        })?;

        let fields = graph.fields(id);
        let mut out = Vec::with_capacity(32 * (fields.len() + 1));
        out.extend_from_slice(self.hash_type(id).as_slice());
        for field in fields {
            let member_path = path.field(&field.name);
            let member = object.get(&field.name).unwrap_or(&Value::Null);
            let word = self.encode_value(&field.ty, member, &member_path, depth)?;
            out.extend_from_slice(word.as_slice());
        }
        Ok(out)
    }

    /// Encodes one member value as the 32-byte word embedded in its parent.
    fn encode_value(
        &mut self,
        ty: &str,
        value: &Value,
        path: &FieldPath,
        depth: usize,
    ) -> Result<B256, Eip712Error> {
        if value.is_null() {
            return Err(Eip712Error::MissingFieldValue { path: path.clone() });
        }
        match self.graph.classify(ty, path)? {
            FieldKind::Atomic(abi) => encode_atomic(abi, value, path),
            FieldKind::Struct(id) => {
                let depth = self.descend(depth, path)?;
                self.encode_struct(id, value, path, depth).map(keccak256)
            }
            FieldKind::Array { element, len } => {
                let depth = self.descend(depth, path)?;
                let items = array_items(ty, value, len, path)?;
                let mut concat = Vec::with_capacity(32 * items.len());
                for (i, item) in items.iter().enumerate() {
                    let word = self.encode_value(element, item, &path.index(i), depth)?;
                    concat.extend_from_slice(word.as_slice());
                }
                Ok(keccak256(concat))
            }
        }
    }

    fn descend(&self, depth: usize, path: &FieldPath) -> Result<usize, Eip712Error> {
        let next = depth + 1;
        if next > self.limits.max_depth {
            return Err(Eip712Error::RecursionLimitExceeded {
                path: path.clone(),
                max_depth: self.limits.max_depth,
            });
        }
        Ok(next)
    }
}

/// Checks a value against an array type and returns its elements.
pub(crate) fn array_items<'v>(
    ty: &str,
    value: &'v Value,
    len: Option<usize>,
    path: &FieldPath,
) -> Result<&'v [Value], Eip712Error> {
    let items = value
        .as_array()
        .ok_or_else(|| Eip712Error::invalid_value(path, ty, format!("expected an array, got {value}")))?;
    match len {
        Some(len) if items.len() != len => Err(Eip712Error::invalid_value(
            path,
            ty,
            format!("expected {len} elements, got {}", items.len()),
        )),
        _ => Ok(items),
    }
}
