//! Validation of queries and schema definitions.
//!
//! Documents are parsed with `graphql-parser`. On top of the parsed schema,
//! every field must refer to a built-in scalar or a type defined in the same
//! document. Queries are bare selection sets such as `Log { address }`, where
//! each top-level selection names an object type of the schema. Argument
//! values and directives are not type-checked.

use std::collections::{BTreeMap, BTreeSet};

use graphql_parser::query::{
    Definition as QueryDefinition, Field as QueryField, OperationDefinition, Selection,
    SelectionSet, TypeCondition,
};
use graphql_parser::schema::{Definition, Type, TypeDefinition};
use graphql_parser::{parse_query, parse_schema};

use crate::Error;

/// Scalars that need not be defined before use.
pub const BUILTIN_SCALARS: &[&str] = &["Int", "Float", "String", "Boolean", "ID"];

// Root type that queries are resolved against. A user-defined type with this
// name is never reachable from a query.
const ROOT_TYPE: &str = "Query";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Scalar,
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
}

impl Kind {
    fn is_composite(self) -> bool {
        matches!(self, Self::Object | Self::Interface | Self::Union)
    }
}

#[derive(Debug, Clone)]
struct TypeInfo {
    kind: Kind,
    /// Field names mapped to the name of their unwrapped type.
    fields: BTreeMap<String, String>,
    /// Interfaces implemented by an object or interface type, or the members
    /// of a union.
    related: Vec<String>,
}

impl TypeInfo {
    fn leaf(kind: Kind) -> Self {
        Self {
            kind,
            fields: BTreeMap::new(),
            related: Vec::new(),
        }
    }
}

fn base_type<'t>(ty: &'t Type<'_, String>) -> &'t str {
    match ty {
        Type::NamedType(name) => name,
        Type::ListType(inner) | Type::NonNullType(inner) => base_type(inner),
    }
}

fn type_info(def: TypeDefinition<'_, String>) -> (String, TypeInfo) {
    match def {
        TypeDefinition::Scalar(t) => (t.name, TypeInfo::leaf(Kind::Scalar)),
        TypeDefinition::Enum(t) => (t.name, TypeInfo::leaf(Kind::Enum)),
        TypeDefinition::Object(t) => (
            t.name,
            TypeInfo {
                kind: Kind::Object,
                fields: t
                    .fields
                    .iter()
                    .map(|f| (f.name.clone(), base_type(&f.field_type).to_string()))
                    .collect(),
                related: t.implements_interfaces,
            },
        ),
        TypeDefinition::Interface(t) => (
            t.name,
            TypeInfo {
                kind: Kind::Interface,
                fields: t
                    .fields
                    .iter()
                    .map(|f| (f.name.clone(), base_type(&f.field_type).to_string()))
                    .collect(),
                related: t.implements_interfaces,
            },
        ),
        TypeDefinition::Union(t) => (
            t.name,
            TypeInfo {
                kind: Kind::Union,
                fields: BTreeMap::new(),
                related: t.types,
            },
        ),
        TypeDefinition::InputObject(t) => (
            t.name,
            TypeInfo {
                kind: Kind::InputObject,
                fields: t
                    .fields
                    .iter()
                    .map(|f| (f.name.clone(), base_type(&f.value_type).to_string()))
                    .collect(),
                related: Vec::new(),
            },
        ),
    }
}

/// A parsed set of type definitions against which queries can be validated.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    types: BTreeMap<String, TypeInfo>,
}

impl Schema {
    /// Parses the given schema definition, checking that every referenced
    /// type is either a built-in scalar or defined in the same document.
    pub fn parse(src: &str) -> Result<Self, Error> {
        if src.trim().is_empty() {
            return Ok(Self::default());
        }
        let doc = parse_schema::<String>(src).map_err(|e| Error::InvalidSdl(e.to_string()))?;
        let mut types = BTreeMap::new();
        for def in doc.definitions {
            let def = match def {
                Definition::TypeDefinition(def) => def,
                // Schema blocks, extensions and directive definitions carry
                // no types of their own.
                _ => continue,
            };
            let (name, info) = type_info(def);
            if types.contains_key(&name) {
                return Err(Error::InvalidSdl(format!(
                    "type {} is defined more than once",
                    name
                )));
            }
            types.insert(name, info);
        }
        let schema = Self { types };
        schema.check_references()?;
        Ok(schema)
    }

    fn check_references(&self) -> Result<(), Error> {
        for (name, ty) in &self.types {
            for (field, base) in &ty.fields {
                if !BUILTIN_SCALARS.contains(&base.as_str()) && !self.types.contains_key(base) {
                    return Err(Error::InvalidSdl(format!(
                        "undefined type used in SDL: {} (in {}.{})",
                        base, name, field
                    )));
                }
            }
            let expected = match ty.kind {
                Kind::Union => Kind::Object,
                _ => Kind::Interface,
            };
            for related in &ty.related {
                if self.kind_of(related) != Some(expected) {
                    return Err(Error::InvalidSdl(format!(
                        "{} refers to {}, which is not a defined {:?} type",
                        name, related, expected
                    )));
                }
            }
        }
        Ok(())
    }

    fn kind_of(&self, name: &str) -> Option<Kind> {
        self.types.get(name).map(|ty| ty.kind)
    }

    /// Names of all the types defined in this schema, in alphabetical order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    // Every object type is reachable as a list-typed root field of the same
    // name.
    fn root(&self) -> TypeInfo {
        TypeInfo {
            kind: Kind::Object,
            fields: self
                .types
                .iter()
                .filter(|(name, ty)| ty.kind == Kind::Object && name.as_str() != ROOT_TYPE)
                .map(|(name, _)| (name.clone(), name.clone()))
                .collect(),
            related: Vec::new(),
        }
    }

    /// Validates a bare selection set such as `Log { address topics }`.
    ///
    /// Every top-level selection must name an object type in this schema.
    /// Nested selections must name fields of their parent type, and only
    /// fields of object, interface or union type may (and must) have
    /// sub-selections. Inline fragments must name a type that can overlap
    /// with the enclosing one.
    pub fn validate_query(&self, query: &str) -> Result<(), Error> {
        let wrapped = format!("query {{ {} }}", query.trim());
        let doc =
            parse_query::<String>(&wrapped).map_err(|e| Error::InvalidQuery(e.to_string()))?;
        let selection_set = match doc.definitions.as_slice() {
            [QueryDefinition::Operation(OperationDefinition::Query(op))] => &op.selection_set,
            _ => {
                return Err(Error::InvalidQuery(
                    "expected a single selection set, e.g. \"Log { address }\"".to_string(),
                ))
            }
        };
        self.validate_selection_set(ROOT_TYPE, &self.root(), selection_set)
    }

    fn validate_selection_set(
        &self,
        parent_name: &str,
        parent: &TypeInfo,
        set: &SelectionSet<'_, String>,
    ) -> Result<(), Error> {
        if set.items.is_empty() {
            return Err(Error::InvalidQuery(format!(
                "empty selection set on \"{}\"",
                parent_name
            )));
        }
        for selection in &set.items {
            match selection {
                Selection::Field(field) => self.validate_field(parent_name, parent, field)?,
                Selection::InlineFragment(fragment) => {
                    let (name, ty) = match &fragment.type_condition {
                        Some(TypeCondition::On(name)) => (name.as_str(), self.composite(name)?),
                        None => (parent_name, parent),
                    };
                    if !self.overlaps(parent_name, name) {
                        return Err(Error::InvalidQuery(format!(
                            "fragment on \"{}\" can never apply to \"{}\"",
                            name, parent_name
                        )));
                    }
                    self.validate_selection_set(name, ty, &fragment.selection_set)?;
                }
                Selection::FragmentSpread(spread) => {
                    return Err(Error::InvalidQuery(format!(
                        "unknown fragment \"{}\"",
                        spread.fragment_name
                    )))
                }
            }
        }
        Ok(())
    }

    fn validate_field(
        &self,
        parent_name: &str,
        parent: &TypeInfo,
        field: &QueryField<'_, String>,
    ) -> Result<(), Error> {
        let has_selection = !field.selection_set.items.is_empty();
        if field.name == "__typename" {
            return if has_selection {
                Err(Error::InvalidQuery(
                    "\"__typename\" must not have a selection".to_string(),
                ))
            } else {
                Ok(())
            };
        }
        let base = parent.fields.get(&field.name).ok_or_else(|| {
            Error::InvalidQuery(format!(
                "cannot query field \"{}\" on type \"{}\"",
                field.name, parent_name
            ))
        })?;
        match self.types.get(base).filter(|ty| ty.kind.is_composite()) {
            Some(ty) if has_selection => self.validate_selection_set(base, ty, &field.selection_set),
            Some(_) => Err(Error::InvalidQuery(format!(
                "field \"{}\" of type \"{}\" must have a selection of subfields",
                field.name, base
            ))),
            None if has_selection => Err(Error::InvalidQuery(format!(
                "field \"{}\" of type \"{}\" must not have a selection since it is a scalar",
                field.name, base
            ))),
            None => Ok(()),
        }
    }

    fn composite(&self, name: &str) -> Result<&TypeInfo, Error> {
        self.types
            .get(name)
            .filter(|ty| ty.kind.is_composite())
            .ok_or_else(|| {
                Error::InvalidQuery(format!("unknown composite type \"{}\" in fragment", name))
            })
    }

    // The object types a value of the given type can have at runtime.
    fn possible_types<'s>(&'s self, name: &'s str) -> BTreeSet<&'s str> {
        match self.types.get(name) {
            Some(ty) if ty.kind == Kind::Object => BTreeSet::from([name]),
            Some(ty) if ty.kind == Kind::Union => ty.related.iter().map(String::as_str).collect(),
            Some(ty) if ty.kind == Kind::Interface => self
                .types
                .iter()
                .filter(|(_, other)| {
                    other.kind == Kind::Object && other.related.iter().any(|i| i == name)
                })
                .map(|(other, _)| other.as_str())
                .collect(),
            _ => BTreeSet::new(),
        }
    }

    fn overlaps(&self, a: &str, b: &str) -> bool {
        a == b
            || !self
                .possible_types(a)
                .is_disjoint(&self.possible_types(b))
    }
}

/// Validates a standalone schema definition, as attached to a view.
pub fn validate_sdl(sdl: &str) -> Result<(), Error> {
    let schema = Schema::parse(sdl)?;
    if schema.types.is_empty() {
        return Err(Error::InvalidSdl("no type definitions found".to_string()));
    }
    Ok(())
}

/// Validates a query against the given schema source.
pub fn validate_query(schema: &str, query: &str) -> Result<(), Error> {
    Schema::parse(schema)?.validate_query(query)
}

#[cfg(test)]
mod test {
    use super::*;

    const SCHEMA: &str = include_str!("default_schema.graphql");

    const SHAPES: &str = r#"
        interface Shape { area: Float }
        type Circle implements Shape { area: Float radius: Float }
        type Square implements Shape { area: Float side: Float }
        union Anything = Circle | Square
        type Canvas { shapes: [Shape!]! things: [Anything] }
    "#;

    #[test]
    fn default_schema_parses() {
        let schema = Schema::parse(SCHEMA).unwrap();
        assert_eq!(
            schema.type_names().collect::<Vec<_>>(),
            vec!["Block", "Log", "Transaction"]
        );
        let block = &schema.types["Block"];
        assert_eq!(block.kind, Kind::Object);
        assert_eq!(block.fields["transactions"], "Transaction");
        assert_eq!(block.fields["number"], "Int");
        assert!(!block.fields.contains_key("nope"));
    }

    #[test]
    fn valid_queries() {
        for query in [
            "Log { address }",
            "Log { address topics }",
            "Log(filter: {address: {_eq: \"0xdac1\"}}) { address data }",
            "Block { number transactions { hash logs { address } } }",
            "Log { addr: address __typename }",
            "Log { address } Transaction { hash }",
            "Log { ... on Log { address } }",
            "Log { ... { data } address @include(if: true) }",
        ] {
            validate_query(SCHEMA, query).unwrap_or_else(|e| panic!("{}: {}", query, e));
        }
    }

    #[test]
    fn invalid_queries() {
        for query in [
            "",
            "Log",
            "Log { }",
            "Log { address",
            "Nope { address }",
            "Log { nope }",
            "Block { transactions }",
            "Log { address { x } }",
            "Log { address } }",
            "Log { ...LogFields }",
            "Log { ... on Block { number } }",
            "Log { ... on String { x } }",
        ] {
            assert!(
                matches!(validate_query(SCHEMA, query), Err(Error::InvalidQuery(_))),
                "{:?} should be rejected",
                query
            );
        }
    }

    #[test]
    fn fragments_on_abstract_types() {
        let schema = Schema::parse(SHAPES).unwrap();
        schema
            .validate_query("Canvas { shapes { area ... on Circle { radius } } }")
            .unwrap();
        schema
            .validate_query("Canvas { things { __typename ... on Square { side } } }")
            .unwrap();
        assert!(matches!(
            schema.validate_query("Canvas { things { area } }"),
            Err(Error::InvalidQuery(_))
        ));
        assert!(matches!(
            schema.validate_query("Circle { ... on Square { side } }"),
            Err(Error::InvalidQuery(_))
        ));
    }

    #[test]
    fn valid_sdl() {
        for sdl in [
            "type FilteredLogs @materialized(if: false) { hash: String block: String }",
            "type A { b: [B!]! }\ntype B { x: ID }",
            "\"\"\"Filtered logs\"\"\"\ntype A { \"the hash\" x: String }",
            "enum Color { RED GREEN }\ntype A { c: Color }",
            "input A { b: String }",
            "scalar Bytes\ntype A { data: Bytes }",
            SHAPES,
        ] {
            validate_sdl(sdl).unwrap_or_else(|e| panic!("{}: {}", sdl, e));
        }
    }

    #[test]
    fn invalid_sdl() {
        for sdl in [
            "",
            "type A { b: Missing }",
            "type A { b: String",
            "type A { b: String } type A { c: Int }",
            "type A { b String }",
            "input A { b: [Missing] }",
            "type A implements Nope { b: String }",
            "type A { b: String }\nunion U = A | Nope",
            "enum E { X }\nunion U = E",
        ] {
            assert!(
                matches!(validate_sdl(sdl), Err(Error::InvalidSdl(_))),
                "{:?} should be rejected",
                sdl
            );
        }
    }
}
