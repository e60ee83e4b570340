//! Structural validation of a value tree against its declared types.
//!
//! Runs before any hashing so that the first reported error is the first
//! offending field in declaration order, and no partial digest is computed.

use serde_json::Value;

use super::encoder::check_atomic;
use super::error::{Eip712Error, FieldPath};
use super::graph::{FieldKind, TypeGraph};
use super::hasher::{HashingLimits, array_items};

/// Checks every member of a struct value, recursively.
///
/// # Errors
///
/// Returns the first [`Eip712Error`] found, in declaration order.
pub fn validate_struct(
    graph: &TypeGraph,
    limits: HashingLimits,
    id: usize,
    value: &Value,
    path: &FieldPath,
) -> Result<(), Eip712Error> {
    Validator { graph, limits }.check_struct(id, value, path, 0)
}

struct Validator<'g> {
    graph: &'g TypeGraph,
    limits: HashingLimits,
}

impl Validator<'_> {
    fn check_struct(
        &self,
        id: usize,
        value: &Value,
        path: &FieldPath,
        depth: usize,
    ) -> Result<(), Eip712Error> {
        let object = value.as_object().ok_or_else(|| {
            Eip712Error::invalid_value(
                path,
                self.graph.name(id),
                format!("expected an object, got {value}"),
            )
        })?;
        for field in self.graph.fields(id) {
            let member = object.get(&field.name).unwrap_or(&Value::Null);
            self.check_value(&field.ty, member, &path.field(&field.name), depth)?;
        }
        Ok(())
    }

    fn check_value(
        &self,
        ty: &str,
        value: &Value,
        path: &FieldPath,
        depth: usize,
    ) -> Result<(), Eip712Error> {
        if value.is_null() {
            return Err(Eip712Error::MissingFieldValue { path: path.clone() });
        }
        match self.graph.classify(ty, path)? {
            FieldKind::Atomic(abi) => check_atomic(abi, value, path),
            FieldKind::Struct(id) => {
                let depth = self.descend(depth, path)?;
                self.check_struct(id, value, path, depth)
            }
            FieldKind::Array { element, len } => {
                let depth = self.descend(depth, path)?;
                for (i, item) in array_items(ty, value, len, path)?.iter().enumerate() {
                    self.check_value(element, item, &path.index(i), depth)?;
                }
                Ok(())
            }
        }
    }

    fn descend(&self, depth: usize, path: &FieldPath) -> Result<usize, Eip712Error> {
        if depth >= self.limits.max_depth {
            return Err(Eip712Error::RecursionLimitExceeded {
                path: path.clone(),
                max_depth: self.limits.max_depth,
            });
        }
        Ok(depth + 1)
    }
}
