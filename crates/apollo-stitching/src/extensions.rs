//! Non-executable schema annotations, carried alongside the type system.
//!
//! Extensions of each subschema are combined with a deep merge:
//! when two subschemas annotate the same key,
//! nested maps are merged key by key and any other value from the later subschema wins.

use crate::JsonMap;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::Name;
use apollo_compiler::Schema;
use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;
use serde_json_bytes::Value as JsonValue;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SchemaExtensions {
    #[serde(skip_serializing_if = "JsonMap::is_empty")]
    pub schema_extensions: JsonMap,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub types: IndexMap<Name, TypeExtensions>,
}

/// Extensions of a named type and of its fields, input fields or enum values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeExtensions {
    #[serde(skip_serializing_if = "JsonMap::is_empty")]
    pub extensions: JsonMap,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub fields: IndexMap<Name, FieldExtensions>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldExtensions {
    #[serde(skip_serializing_if = "JsonMap::is_empty")]
    pub extensions: JsonMap,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub arguments: IndexMap<Name, JsonMap>,
}

impl SchemaExtensions {
    pub fn is_empty(&self) -> bool {
        self.schema_extensions.is_empty() && self.types.is_empty()
    }

    pub fn type_extensions(&self, type_name: &str) -> Option<&JsonMap> {
        Some(&self.types.get(type_name)?.extensions)
    }

    pub fn field_extensions(&self, type_name: &str, field_name: &str) -> Option<&JsonMap> {
        Some(&self.types.get(type_name)?.fields.get(field_name)?.extensions)
    }

    /// Set a top-level key of the extensions of `type_name`
    pub fn annotate_type(&mut self, type_name: Name, key: &str, value: JsonValue) -> &mut Self {
        self.types
            .entry(type_name)
            .or_default()
            .extensions
            .insert(key, value);
        self
    }

    /// Set a top-level key of the extensions of `type_name.field_name`
    pub fn annotate_field(
        &mut self,
        type_name: Name,
        field_name: Name,
        key: &str,
        value: JsonValue,
    ) -> &mut Self {
        self.types
            .entry(type_name)
            .or_default()
            .fields
            .entry(field_name)
            .or_default()
            .extensions
            .insert(key, value);
        self
    }
}

/// Deep-merge extension metadata, in input order
pub fn merge_extensions<'a>(
    inputs: impl IntoIterator<Item = &'a SchemaExtensions>,
) -> SchemaExtensions {
    let mut merged = SchemaExtensions::default();
    for input in inputs {
        deep_merge(&mut merged.schema_extensions, &input.schema_extensions);
        for (type_name, type_extensions) in &input.types {
            let merged_type = merged.types.entry(type_name.clone()).or_default();
            deep_merge(&mut merged_type.extensions, &type_extensions.extensions);
            for (field_name, field_extensions) in &type_extensions.fields {
                let merged_field = merged_type.fields.entry(field_name.clone()).or_default();
                deep_merge(&mut merged_field.extensions, &field_extensions.extensions);
                for (arg_name, arg_extensions) in &field_extensions.arguments {
                    let merged_arg = merged_field.arguments.entry(arg_name.clone()).or_default();
                    deep_merge(merged_arg, arg_extensions);
                }
            }
        }
    }
    merged
}

/// Merge `new` into `merged`: maps colliding on a key are merged recursively,
/// any other colliding value is replaced by the one from `new`.
pub fn deep_merge(merged: &mut JsonMap, new: &JsonMap) {
    for (key, new_value) in new {
        if let (Some(JsonValue::Object(merged_map)), JsonValue::Object(new_map)) =
            (merged.get_mut(key.as_str()), new_value)
        {
            deep_merge(merged_map, new_map);
            continue;
        }
        merged.insert(key.clone(), new_value.clone());
    }
}

/// Keep only the extensions of schema elements that exist in `schema`
pub(crate) fn apply_extensions(
    schema: &Schema,
    mut extensions: SchemaExtensions,
) -> SchemaExtensions {
    extensions.types.retain(|type_name, type_extensions| {
        let Some(ty) = schema.types.get(type_name) else {
            tracing::debug!("dropping extensions of unknown type {type_name}");
            return false;
        };
        type_extensions.fields.retain(|field_name, field_extensions| {
            let arguments = match ty {
                ExtendedType::Object(def) => def.fields.get(field_name).map(|f| &f.arguments),
                ExtendedType::Interface(def) => def.fields.get(field_name).map(|f| &f.arguments),
                ExtendedType::InputObject(def) => {
                    return def.fields.contains_key(field_name);
                }
                ExtendedType::Enum(def) => return def.values.contains_key(field_name),
                ExtendedType::Scalar(_) | ExtendedType::Union(_) => None,
            };
            let Some(arguments) = arguments else {
                tracing::debug!("dropping extensions of unknown field {type_name}.{field_name}");
                return false;
            };
            field_extensions
                .arguments
                .retain(|arg_name, _| arguments.iter().any(|arg| arg.name == *arg_name));
            true
        });
        true
    });
    extensions
}

#[cfg(test)]
mod tests {
    use super::*;
    use apollo_compiler::name;
    use pretty_assertions::assert_eq;

    fn json(value: serde_json::Value) -> JsonMap {
        match JsonValue::from(value) {
            JsonValue::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn deep_merge_overrides_leaves_and_merges_maps() {
        let mut merged = json(serde_json::json!({
            "cache": {"ttl": 10, "scope": "public"},
            "owner": "team-a",
            "tags": ["a"],
        }));
        deep_merge(
            &mut merged,
            &json(serde_json::json!({
                "cache": {"ttl": 60},
                "owner": {"name": "team-b"},
                "tags": ["b"],
            })),
        );
        assert_eq!(
            merged,
            json(serde_json::json!({
                "cache": {"ttl": 60, "scope": "public"},
                "owner": {"name": "team-b"},
                "tags": ["b"],
            }))
        );
    }

    #[test]
    fn merge_is_order_sensitive() {
        let mut a = SchemaExtensions::default();
        a.annotate_field(name!("User"), name!("email"), "pii", true.into());
        a.annotate_type(name!("User"), "owner", "a".into());
        let mut b = SchemaExtensions::default();
        b.annotate_type(name!("User"), "owner", "b".into());

        let ab = merge_extensions([&a, &b]);
        assert_eq!(
            ab.type_extensions("User").unwrap().get("owner"),
            Some(&JsonValue::from("b"))
        );
        assert_eq!(
            ab.field_extensions("User", "email").unwrap().get("pii"),
            Some(&JsonValue::from(true))
        );
        let ba = merge_extensions([&b, &a]);
        assert_eq!(
            ba.type_extensions("User").unwrap().get("owner"),
            Some(&JsonValue::from("a"))
        );
    }

    #[test]
    fn applying_drops_unknown_elements() {
        let schema = Schema::parse(
            "type Query { user(id: ID): User } type User { id: ID } enum Role { ADMIN }",
            "schema.graphql",
        )
        .unwrap();
        let mut extensions = SchemaExtensions::default();
        extensions
            .annotate_type(name!("Gone"), "x", 1.into())
            .annotate_field(name!("User"), name!("gone"), "x", 1.into())
            .annotate_field(name!("User"), name!("id"), "x", 1.into())
            .annotate_field(name!("Role"), name!("ADMIN"), "x", 1.into());
        let query = extensions.types.entry(name!("Query")).or_default();
        let user_field = query.fields.entry(name!("user")).or_default();
        user_field.arguments.insert(name!("id"), JsonMap::new());
        user_field.arguments.insert(name!("gone"), JsonMap::new());

        let applied = apply_extensions(&schema, extensions);
        assert_eq!(
            applied.types.keys().collect::<Vec<_>>(),
            [&name!("User"), &name!("Role"), &name!("Query")]
        );
        assert!(applied.field_extensions("User", "gone").is_none());
        assert!(applied.field_extensions("User", "id").is_some());
        assert!(applied.field_extensions("Role", "ADMIN").is_some());
        assert_eq!(
            applied.types["Query"].fields["user"]
                .arguments
                .keys()
                .collect::<Vec<_>>(),
            [&name!("id")]
        );
    }
}
