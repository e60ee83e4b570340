//! Struct dependency graph and canonical type ordering.
//!
//! Declarations are loaded into an arena of nodes addressed by index. Walks
//! use an explicit stack and a visited bit set, so diamonds and recursive
//! declarations (`Tree(Tree[] children)`) resolve in a single pass.

use std::collections::HashMap;

use super::encoder::AbiType;
use super::error::{Eip712Error, FieldPath};
use super::types::{TypeField, Types};

/// How a member type string is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind<'t> {
    /// A declared struct, by arena index.
    Struct(usize),
    /// `T[]` or `T[k]`.
    Array {
        /// Element type string, possibly itself an array.
        element: &'t str,
        /// Fixed length, if declared.
        len: Option<usize>,
    },
    /// A primitive ABI type.
    Atomic(AbiType),
}

#[derive(Debug, Clone)]
struct TypeNode {
    name: String,
    fields: Vec<TypeField>,
    deps: Vec<usize>,
}

/// Arena of struct declarations with resolved member dependencies.
#[derive(Debug, Clone)]
pub struct TypeGraph {
    nodes: Vec<TypeNode>,
    index: HashMap<String, usize>,
}

impl TypeGraph {
    /// Builds the graph, checking every member type resolves.
    ///
    /// # Errors
    ///
    /// Returns [`Eip712Error::InvalidTypeName`] for struct names that are not
    /// identifiers or that shadow a primitive type, and
    /// [`Eip712Error::UnknownType`] for member types that are neither
    /// primitive nor declared.
    pub fn new(types: &Types) -> Result<Self, Eip712Error> {
        let mut nodes = Vec::with_capacity(types.len());
        let mut index = HashMap::with_capacity(types.len());
        for (name, fields) in types.iter() {
            if !is_valid_struct_name(name) {
                return Err(Eip712Error::InvalidTypeName(name.to_owned()));
            }
            index.insert(name.to_owned(), nodes.len());
            nodes.push(TypeNode {
                name: name.to_owned(),
                fields: fields.to_vec(),
                deps: Vec::new(),
            });
        }

        let mut graph = Self { nodes, index };
        for id in 0..graph.nodes.len() {
            let mut deps = Vec::new();
            for field in &graph.nodes[id].fields {
                let path = FieldPath::root(graph.nodes[id].name.as_str()).field(&field.name);
                if let Some(dep) = graph.struct_dependency(&field.ty, &path)? {
                    deps.push(dep);
                }
            }
            graph.nodes[id].deps = deps;
        }
        Ok(graph)
    }

    /// Peels array suffixes and returns the struct a member type refers to.
    fn struct_dependency(&self, ty: &str, path: &FieldPath) -> Result<Option<usize>, Eip712Error> {
        let mut current = ty;
        loop {
            match self.classify(current, path)? {
                FieldKind::Struct(id) => return Ok(Some(id)),
                FieldKind::Array { element, .. } => current = element,
                FieldKind::Atomic(_) => return Ok(None),
            }
        }
    }

    /// Classifies a member type string.
    ///
    /// # Errors
    ///
    /// Returns [`Eip712Error::UnknownType`] if `ty` is malformed or names an
    /// undeclared type.
    pub fn classify<'t>(&self, ty: &'t str, path: &FieldPath) -> Result<FieldKind<'t>, Eip712Error> {
        let unknown = || Eip712Error::UnknownType {
            path: path.clone(),
            ty: ty.to_owned(),
        };
        if let Some(open_end) = ty.strip_suffix(']') {
            let open = open_end.rfind('[').ok_or_else(unknown)?;
            let element = &open_end[..open];
            let len_text = &open_end[open + 1..];
            if element.is_empty() {
                return Err(unknown());
            }
            let len = if len_text.is_empty() {
                None
            } else {
                if !len_text.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(unknown());
                }
                Some(len_text.parse::<usize>().map_err(|_| unknown())?)
            };
            return Ok(FieldKind::Array { element, len });
        }
        if let Some(id) = self.index.get(ty) {
            return Ok(FieldKind::Struct(*id));
        }
        AbiType::parse(ty).map(FieldKind::Atomic).ok_or_else(unknown)
    }

    /// Arena index of a declared type.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Name of the type at `id`.
    #[must_use]
    pub fn name(&self, id: usize) -> &str {
        &self.nodes[id].name
    }

    /// Members of the type at `id`, in declaration order.
    #[must_use]
    pub fn fields(&self, id: usize) -> &[TypeField] {
        &self.nodes[id].fields
    }

    /// Canonical `encodeType` ordering for `primary`: the primary type first,
    /// then every other reachable struct sorted by name.
    #[must_use]
    pub fn resolve(&self, primary: usize) -> Vec<usize> {
        let mut visited = vec![false; self.nodes.len()];
        visited[primary] = true;
        let mut stack = vec![primary];
        let mut reachable = Vec::new();
        while let Some(id) = stack.pop() {
            for &dep in &self.nodes[id].deps {
                if !visited[dep] {
                    visited[dep] = true;
                    reachable.push(dep);
                    stack.push(dep);
                }
            }
        }
        reachable.sort_by(|a, b| self.nodes[*a].name.cmp(&self.nodes[*b].name));

        let mut order = Vec::with_capacity(reachable.len() + 1);
        order.push(primary);
        order.extend(reachable);
        order
    }

    /// Same as [`TypeGraph::resolve`], by name.
    ///
    /// # Errors
    ///
    /// Returns [`Eip712Error::UnknownPrimaryType`] if `primary` is not declared.
    pub fn resolve_names(&self, primary: &str) -> Result<Vec<&str>, Eip712Error> {
        let id = self
            .lookup(primary)
            .ok_or_else(|| Eip712Error::UnknownPrimaryType(primary.to_owned()))?;
        Ok(self.resolve(id).into_iter().map(|id| self.name(id)).collect())
    }

    /// Appends `Name(type1 name1,type2 name2)` for the type at `id`.
    pub(crate) fn write_signature(&self, id: usize, out: &mut String) {
        let node = &self.nodes[id];
        out.push_str(&node.name);
        out.push('(');
        for (i, field) in node.fields.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(&field.ty);
            out.push(' ');
            out.push_str(&field.name);
        }
        out.push(')');
    }
}

fn is_valid_struct_name(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_well = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$');
    starts_well
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        && AbiType::parse(name).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(decls: &[(&str, &[(&str, &str)])]) -> Types {
        let mut types = Types::new();
        for (name, fields) in decls {
            let fields = fields
                .iter()
                .map(|(field, ty)| TypeField::new(*field, *ty))
                .collect();
            types.insert(*name, fields).unwrap();
        }
        types
    }

    #[test]
    fn test_resolve_primary_first_then_sorted() {
        let graph = TypeGraph::new(&types(&[
            ("Mail", &[("from", "Person"), ("to", "Person[]"), ("meta", "Attachment")]),
            ("Person", &[("name", "string"), ("wallet", "address")]),
            ("Attachment", &[("data", "bytes")]),
        ]))
        .unwrap();
        assert_eq!(
            graph.resolve_names("Mail").unwrap(),
            ["Mail", "Attachment", "Person"]
        );
        assert_eq!(graph.resolve_names("Person").unwrap(), ["Person"]);
    }

    #[test]
    fn test_resolve_diamond_visits_once() {
        let graph = TypeGraph::new(&types(&[
            ("Top", &[("left", "Left"), ("right", "Right")]),
            ("Left", &[("leaf", "Leaf")]),
            ("Right", &[("leaf", "Leaf[2]")]),
            ("Leaf", &[("value", "uint256")]),
        ]))
        .unwrap();
        assert_eq!(
            graph.resolve_names("Top").unwrap(),
            ["Top", "Leaf", "Left", "Right"]
        );
    }

    #[test]
    fn test_resolve_terminates_on_cycles() {
        let graph = TypeGraph::new(&types(&[
            ("Node", &[("children", "Node[]"), ("other", "Other")]),
            ("Other", &[("back", "Node")]),
        ]))
        .unwrap();
        assert_eq!(graph.resolve_names("Node").unwrap(), ["Node", "Other"]);
        assert_eq!(graph.resolve_names("Other").unwrap(), ["Other", "Node"]);
    }

    #[test]
    fn test_unknown_member_type_is_rejected() {
        let err = TypeGraph::new(&types(&[("Mail", &[("from", "Persn")])])).unwrap_err();
        match err {
            Eip712Error::UnknownType { path, ty } => {
                assert_eq!(path.as_str(), "Mail.from");
                assert_eq!(ty, "Persn");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_array_suffix_is_rejected() {
        for ty in ["uint256[x]", "[]", "uint256]", "uint256[-1]"] {
            let result = TypeGraph::new(&types(&[("Bad", &[("field", ty)])]));
            assert!(
                matches!(result, Err(Eip712Error::UnknownType { .. })),
                "{ty} should be rejected"
            );
        }
    }

    #[test]
    fn test_struct_name_must_not_shadow_primitive() {
        let err = TypeGraph::new(&types(&[("address", &[("a", "uint8")])])).unwrap_err();
        assert!(matches!(err, Eip712Error::InvalidTypeName(name) if name == "address"));
    }

    #[test]
    fn test_classify_nested_arrays() {
        let graph = TypeGraph::new(&types(&[("Point", &[("x", "int32")])])).unwrap();
        let path = FieldPath::root("test");
        assert_eq!(
            graph.classify("Point[2][]", &path).unwrap(),
            FieldKind::Array {
                element: "Point[2]",
                len: None
            }
        );
        assert_eq!(
            graph.classify("Point[2]", &path).unwrap(),
            FieldKind::Array {
                element: "Point",
                len: Some(2)
            }
        );
        assert_eq!(graph.classify("Point", &path).unwrap(), FieldKind::Struct(0));
        assert_eq!(
            graph.classify("uint8", &path).unwrap(),
            FieldKind::Atomic(AbiType::Uint(8))
        );
    }
}
