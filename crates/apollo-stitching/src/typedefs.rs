//! Merging of type definitions from several schemas into one.
//!
//! Types with the same name are merged member by member.
//! Declarations that disagree on a field’s type or arguments are conflicts,
//! resolved by [`TypeMergeOptions`] (by default, the later declaration wins).

use crate::error::SchemaBuildError;
use apollo_compiler::ast;
use apollo_compiler::schema;
use apollo_compiler::schema::Component;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::schema::FieldDefinition;
use apollo_compiler::schema::InputValueDefinition;
use apollo_compiler::schema::Type;
use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::Schema;
use indexmap::IndexMap;
use serde::Deserialize;
use std::hash::BuildHasher;
use std::sync::Arc;

/// Configuration of [`merge_type_defs`]
#[derive(Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TypeMergeOptions {
    /// Types left out of the merged schema
    pub exclusions: Vec<Name>,
    /// Sort types by name instead of keeping the order they were first seen in
    pub sort: bool,
    /// On conflict, keep the first declaration
    pub ignore_field_conflicts: bool,
    /// On conflict, fail with [`SchemaBuildError::FieldConflict`]
    /// or [`SchemaBuildError::EnumValueConflict`]
    pub throw_on_conflict: bool,
    /// Decide each field conflict. Consulted when neither flag above is set.
    #[serde(skip)]
    pub on_field_conflict: Option<Arc<ConflictHandler>>,
}

pub type ConflictHandler = dyn Fn(&FieldConflict<'_>) -> ConflictResolution + Send + Sync;

/// Two declarations of the same field or input field that disagree on their signature
#[derive(Debug, Clone, Copy)]
pub struct FieldConflict<'a> {
    pub type_name: &'a Name,
    pub field_name: &'a Name,
    pub existing: &'a Type,
    pub incoming: &'a Type,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictResolution {
    KeepExisting,
    TakeIncoming,
}

impl std::fmt::Debug for TypeMergeOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeMergeOptions")
            .field("exclusions", &self.exclusions)
            .field("sort", &self.sort)
            .field("ignore_field_conflicts", &self.ignore_field_conflicts)
            .field("throw_on_conflict", &self.throw_on_conflict)
            .field("on_field_conflict", &self.on_field_conflict.is_some())
            .finish()
    }
}

/// Parse type definitions that may extend types defined elsewhere.
///
/// The result is not validated: it may reference types that only other inputs define.
pub fn parse_type_defs(source_name: &str, source_text: &str) -> Result<Schema, SchemaBuildError> {
    Schema::builder()
        .adopt_orphan_extensions()
        .parse(source_text, source_name)
        .build()
        .map_err(|with_errors| SchemaBuildError::Parse {
            source_name: source_name.to_owned(),
            errors: with_errors.errors,
        })
}

/// Merge type definitions of `inputs`, in order, into one unvalidated schema
pub fn merge_type_defs<'a>(
    inputs: impl IntoIterator<Item = &'a Schema>,
    options: &TypeMergeOptions,
) -> Result<Schema, SchemaBuildError> {
    let merger = TypeDefMerger { options };
    let mut merged = Schema::new();
    for input in inputs {
        merger.merge_schema_definition(
            merged.schema_definition.make_mut(),
            &input.schema_definition,
        );
        for (name, definition) in &input.directive_definitions {
            if merged.directive_definitions.get(name) != Some(definition) {
                merged
                    .directive_definitions
                    .insert(name.clone(), definition.clone());
            }
        }
        for (name, ty) in &input.types {
            if ty.is_built_in() || options.exclusions.contains(name) {
                continue;
            }
            match merged.types.get_mut(name) {
                None => {
                    merged.types.insert(name.clone(), ty.clone());
                }
                Some(existing) if existing != ty => merger.merge_types(existing, ty)?,
                Some(_) => {}
            }
        }
    }
    if options.sort {
        merged.types.sort_keys();
    }
    Ok(merged)
}

struct TypeDefMerger<'a> {
    options: &'a TypeMergeOptions,
}

impl TypeDefMerger<'_> {
    fn merge_schema_definition(
        &self,
        merged: &mut schema::SchemaDefinition,
        new: &schema::SchemaDefinition,
    ) {
        merge_description(&mut merged.description, &new.description);
        merge_vecs(&mut merged.directives, &new.directives);
        for (merged_root, new_root) in [
            (&mut merged.query, &new.query),
            (&mut merged.mutation, &new.mutation),
            (&mut merged.subscription, &new.subscription),
        ] {
            if new_root.is_some() {
                merged_root.clone_from(new_root)
            }
        }
    }

    fn merge_types(
        &self,
        merged: &mut ExtendedType,
        new: &ExtendedType,
    ) -> Result<(), SchemaBuildError> {
        match (&mut *merged, new) {
            (ExtendedType::Scalar(merged), ExtendedType::Scalar(new)) => {
                let merged = merged.make_mut();
                merge_description(&mut merged.description, &new.description);
                merge_vecs(&mut merged.directives, &new.directives);
                Ok(())
            }
            (ExtendedType::Object(merged), ExtendedType::Object(new)) => {
                let merged = merged.make_mut();
                merge_description(&mut merged.description, &new.description);
                merge_vecs(&mut merged.directives, &new.directives);
                for interface in &new.implements_interfaces {
                    merged.implements_interfaces.insert(interface.clone());
                }
                self.merge_fields(&merged.name, &mut merged.fields, &new.fields)
            }
            (ExtendedType::Interface(merged), ExtendedType::Interface(new)) => {
                let merged = merged.make_mut();
                merge_description(&mut merged.description, &new.description);
                merge_vecs(&mut merged.directives, &new.directives);
                for interface in &new.implements_interfaces {
                    merged.implements_interfaces.insert(interface.clone());
                }
                self.merge_fields(&merged.name, &mut merged.fields, &new.fields)
            }
            (ExtendedType::Union(merged), ExtendedType::Union(new)) => {
                let merged = merged.make_mut();
                merge_description(&mut merged.description, &new.description);
                merge_vecs(&mut merged.directives, &new.directives);
                for member in &new.members {
                    merged.members.insert(member.clone());
                }
                Ok(())
            }
            (ExtendedType::Enum(merged), ExtendedType::Enum(new)) => {
                let merged = merged.make_mut();
                merge_description(&mut merged.description, &new.description);
                merge_vecs(&mut merged.directives, &new.directives);
                self.merge_enum_values(&merged.name, &mut merged.values, &new.values)
            }
            (ExtendedType::InputObject(merged), ExtendedType::InputObject(new)) => {
                let merged = merged.make_mut();
                merge_description(&mut merged.description, &new.description);
                merge_vecs(&mut merged.directives, &new.directives);
                self.merge_input_fields(&merged.name, &mut merged.fields, &new.fields)
            }
            (merged, new) => Err(SchemaBuildError::IncompatibleKinds {
                type_name: new.name().clone(),
                existing: describe_kind(merged),
                incoming: describe_kind(new),
            }),
        }
    }

    fn merge_fields<S: BuildHasher>(
        &self,
        type_name: &Name,
        merged: &mut IndexMap<Name, Component<FieldDefinition>, S>,
        new: &IndexMap<Name, Component<FieldDefinition>, S>,
    ) -> Result<(), SchemaBuildError> {
        for (field_name, new_field) in new {
            let Some(merged_field) = merged.get_mut(field_name) else {
                merged.insert(field_name.clone(), new_field.clone());
                continue;
            };
            if merged_field == new_field {
                continue;
            }
            if (&merged_field.ty, &merged_field.arguments) != (&new_field.ty, &new_field.arguments)
            {
                let conflict = FieldConflict {
                    type_name,
                    field_name,
                    existing: &merged_field.ty,
                    incoming: &new_field.ty,
                };
                let resolution = self.resolve_conflict(
                    &conflict,
                    field_signature(merged_field),
                    field_signature(new_field),
                )?;
                if resolution == ConflictResolution::TakeIncoming {
                    *merged_field = new_field.clone();
                }
                continue;
            }
            let merged_field = merged_field.make_mut();
            merge_description(&mut merged_field.description, &new_field.description);
            merge_vecs(&mut merged_field.directives, &new_field.directives);
        }
        Ok(())
    }

    fn merge_input_fields<S: BuildHasher>(
        &self,
        type_name: &Name,
        merged: &mut IndexMap<Name, Component<InputValueDefinition>, S>,
        new: &IndexMap<Name, Component<InputValueDefinition>, S>,
    ) -> Result<(), SchemaBuildError> {
        for (field_name, new_field) in new {
            let Some(merged_field) = merged.get_mut(field_name) else {
                merged.insert(field_name.clone(), new_field.clone());
                continue;
            };
            if merged_field == new_field {
                continue;
            }
            if (&merged_field.ty, &merged_field.default_value)
                != (&new_field.ty, &new_field.default_value)
            {
                let conflict = FieldConflict {
                    type_name,
                    field_name,
                    existing: &*merged_field.ty,
                    incoming: &*new_field.ty,
                };
                let resolution = self.resolve_conflict(
                    &conflict,
                    merged_field.ty.to_string(),
                    new_field.ty.to_string(),
                )?;
                if resolution == ConflictResolution::TakeIncoming {
                    *merged_field = new_field.clone();
                }
                continue;
            }
            let merged_field = merged_field.make_mut();
            merge_description(&mut merged_field.description, &new_field.description);
            merge_vecs(&mut merged_field.directives, &new_field.directives);
        }
        Ok(())
    }

    fn merge_enum_values<S: BuildHasher>(
        &self,
        type_name: &Name,
        merged: &mut IndexMap<Name, Component<ast::EnumValueDefinition>, S>,
        new: &IndexMap<Name, Component<ast::EnumValueDefinition>, S>,
    ) -> Result<(), SchemaBuildError> {
        for (value, new_value) in new {
            let Some(merged_value) = merged.get_mut(value) else {
                merged.insert(value.clone(), new_value.clone());
                continue;
            };
            if merged_value == new_value {
                continue;
            }
            if directives_disagree(&merged_value.directives, &new_value.directives) {
                if self.options.throw_on_conflict {
                    return Err(SchemaBuildError::EnumValueConflict {
                        type_name: type_name.clone(),
                        value: value.clone(),
                    });
                }
                if !self.options.ignore_field_conflicts {
                    *merged_value = new_value.clone();
                }
                continue;
            }
            let merged_value = merged_value.make_mut();
            merge_description(&mut merged_value.description, &new_value.description);
            merge_vecs(&mut merged_value.directives, &new_value.directives);
        }
        Ok(())
    }

    fn resolve_conflict(
        &self,
        conflict: &FieldConflict<'_>,
        existing: String,
        incoming: String,
    ) -> Result<ConflictResolution, SchemaBuildError> {
        if self.options.throw_on_conflict {
            return Err(SchemaBuildError::FieldConflict {
                type_name: conflict.type_name.clone(),
                field_name: conflict.field_name.clone(),
                existing,
                incoming,
            });
        }
        if self.options.ignore_field_conflicts {
            return Ok(ConflictResolution::KeepExisting);
        }
        if let Some(handler) = &self.options.on_field_conflict {
            return Ok(handler(conflict));
        }
        Ok(ConflictResolution::TakeIncoming)
    }
}

/// A later description replaces an earlier one, but a missing or empty one does not erase it
fn merge_description(merged: &mut Option<Node<str>>, new: &Option<Node<str>>) {
    if new.as_deref().is_some_and(|description| !description.is_empty()) {
        merged.clone_from(new)
    }
}

fn merge_vecs<T>(merged: &mut Vec<T>, new: &[T])
where
    T: Clone + Eq,
{
    for new in new {
        if !merged.contains(new) {
            merged.push(new.clone())
        }
    }
}

/// Whether some directive appears on both sides with different arguments
fn directives_disagree<D>(merged: &[D], new: &[D]) -> bool
where
    D: std::ops::Deref<Target = ast::Directive>,
{
    merged.iter().any(|merged_directive| {
        new.iter().any(|new_directive| {
            merged_directive.name == new_directive.name
                && merged_directive.arguments != new_directive.arguments
        })
    })
}

fn field_signature(field: &FieldDefinition) -> String {
    if field.arguments.is_empty() {
        return field.ty.to_string();
    }
    let arguments = field
        .arguments
        .iter()
        .map(|arg| format!("{}: {}", arg.name, &*arg.ty))
        .collect::<Vec<_>>()
        .join(", ");
    format!("({arguments}) {}", field.ty)
}

fn describe_kind(ty: &ExtendedType) -> &'static str {
    match ty {
        ExtendedType::Scalar(_) => "a scalar type",
        ExtendedType::Object(_) => "an object type",
        ExtendedType::Interface(_) => "an interface type",
        ExtendedType::Union(_) => "a union type",
        ExtendedType::Enum(_) => "an enum type",
        ExtendedType::InputObject(_) => "an input object type",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apollo_compiler::name;
    use pretty_assertions::assert_eq;

    const A: &str = "type Query { a: String } type User { id: ID!, age: Int }";
    const B: &str = "type Query { b: String } type User { id: ID!, age: String, name: String }";

    fn parse(source_text: &str) -> Schema {
        parse_type_defs("input.graphql", source_text).unwrap()
    }

    fn fields(schema: &Schema, type_name: &str) -> Vec<String> {
        let mut fields = Vec::new();
        match &schema.types[type_name] {
            ExtendedType::Object(def) => {
                for field in def.fields.values() {
                    fields.push(format!("{}: {}", field.name, field.ty))
                }
            }
            ExtendedType::Enum(def) => fields.extend(def.values.keys().map(|v| v.to_string())),
            ExtendedType::Union(def) => fields.extend(def.members.iter().map(|m| m.to_string())),
            _ => {}
        }
        fields
    }

    #[test]
    fn later_declaration_wins_by_default() {
        let (a, b) = (parse(A), parse(B));
        let options = TypeMergeOptions::default();
        let ab = merge_type_defs([&a, &b], &options).unwrap();
        assert_eq!(fields(&ab, "User"), ["id: ID!", "age: String", "name: String"]);
        assert_eq!(fields(&ab, "Query"), ["a: String", "b: String"]);
        let ba = merge_type_defs([&b, &a], &options).unwrap();
        assert_eq!(fields(&ba, "User"), ["id: ID!", "age: Int", "name: String"]);
        ab.validate().unwrap();
    }

    #[test]
    fn conflict_policies() {
        let (a, b) = (parse(A), parse(B));
        let options = TypeMergeOptions {
            throw_on_conflict: true,
            ..Default::default()
        };
        let err = merge_type_defs([&a, &b], &options).unwrap_err();
        assert_eq!(
            err.to_string(),
            "field `User.age` is defined as `Int` and as `String`"
        );

        let options = TypeMergeOptions {
            ignore_field_conflicts: true,
            ..Default::default()
        };
        let merged = merge_type_defs([&a, &b], &options).unwrap();
        assert_eq!(fields(&merged, "User"), ["id: ID!", "age: Int", "name: String"]);

        let options = TypeMergeOptions {
            on_field_conflict: Some(Arc::new(|conflict: &FieldConflict<'_>| {
                if conflict.existing.is_named() && conflict.field_name == "age" {
                    ConflictResolution::KeepExisting
                } else {
                    ConflictResolution::TakeIncoming
                }
            })),
            ..Default::default()
        };
        let merged = merge_type_defs([&a, &b], &options).unwrap();
        assert_eq!(fields(&merged, "User"), ["id: ID!", "age: Int", "name: String"]);
    }

    #[test]
    fn later_description_wins() {
        let first = parse(r#"type Query { t: T } "first" type T { "first" f: Int }"#);
        let second = parse(r#""second" type T { "second" f: Int }"#);
        let bare = parse("type T { f: Int }");
        let description = |schema: &Schema| {
            let def = schema.get_object("T").unwrap();
            (
                def.description.as_deref().map(str::to_owned),
                def.fields["f"].description.as_deref().map(str::to_owned),
            )
        };
        let options = TypeMergeOptions::default();

        let merged = merge_type_defs([&first, &second], &options).unwrap();
        assert_eq!(
            description(&merged),
            (Some("second".to_owned()), Some("second".to_owned()))
        );
        let merged = merge_type_defs([&second, &first], &options).unwrap();
        assert_eq!(
            description(&merged),
            (Some("first".to_owned()), Some("first".to_owned()))
        );
        let merged = merge_type_defs([&first, &bare], &options).unwrap();
        assert_eq!(
            description(&merged),
            (Some("first".to_owned()), Some("first".to_owned()))
        );
    }

    #[test]
    fn members_are_unioned() {
        let a = parse(
            "type Query { s: Search } type User { id: ID } union Search = User \
             enum Role { ADMIN } interface Node { id: ID }",
        );
        let b = parse(
            "type Post implements Node { id: ID } union Search = Post enum Role { GUEST } \
             interface Node { id: ID }",
        );
        let merged = merge_type_defs([&a, &b], &TypeMergeOptions::default()).unwrap();
        assert_eq!(fields(&merged, "Search"), ["User", "Post"]);
        assert_eq!(fields(&merged, "Role"), ["ADMIN", "GUEST"]);
        merged.validate().unwrap();
    }

    #[test]
    fn incompatible_kinds() {
        let a = parse("type Query { r: Role } enum Role { ADMIN }");
        let b = parse("type Role { name: String }");
        let err = merge_type_defs([&a, &b], &TypeMergeOptions::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "type `Role` is defined as an enum type and as an object type"
        );
    }

    #[test]
    fn exclusions_and_sorting() {
        let a = parse("type Query { a: String } type Zebra { z: Int } type Apple { a: Int }");
        let options = TypeMergeOptions {
            exclusions: vec![name!("Apple")],
            sort: true,
            ..Default::default()
        };
        let merged = merge_type_defs([&a], &options).unwrap();
        let names: Vec<_> = merged
            .types
            .iter()
            .filter(|(_, ty)| !ty.is_built_in())
            .map(|(name, _)| name.as_str())
            .collect();
        assert_eq!(names, ["Query", "Zebra"]);
    }

    #[test]
    fn orphan_extensions_are_merged_into_definitions() {
        let a = parse(A);
        let extension = parse("extend type User { nickname: String }");
        let merged = merge_type_defs([&a, &extension], &TypeMergeOptions::default()).unwrap();
        assert_eq!(fields(&merged, "User"), ["id: ID!", "age: Int", "nickname: String"]);
        merged.validate().unwrap();
    }

    #[test]
    fn options_from_json() {
        let options: TypeMergeOptions =
            serde_json::from_str(r#"{"exclusions": ["Internal"], "throwOnConflict": true}"#)
                .unwrap();
        assert_eq!(options.exclusions, [name!("Internal")]);
        assert!(options.throw_on_conflict);
        assert!(!options.sort);
    }
}
