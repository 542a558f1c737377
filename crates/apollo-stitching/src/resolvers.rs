use crate::JsonMap;
use apollo_compiler::Name;
use futures::future::BoxFuture;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json_bytes::Value as JsonValue;
use std::sync::Arc;

/// Name of the pseudo-field under which an abstract type’s resolve-type resolver is registered
pub const RESOLVE_TYPE: &str = "__resolveType";

/// What a resolver gets to see about the field being resolved
#[derive(Clone, Copy)]
pub struct ResolveInfo<'a> {
    pub type_name: &'a str,
    pub field_name: &'a str,
    /// The object value the field belongs to
    pub parent: &'a JsonMap,
    /// Coerced argument values
    pub arguments: &'a JsonMap,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ResolverError {
    pub message: String,
}

/// Abstraction for implementing field resolvers.
///
/// For synchronous resolvers, [`Resolvers::resolve_with`] takes a closure instead.
pub trait FieldResolver: Send + Sync {
    /// Resolves the field described by `info`.
    ///
    /// The resolved value is expected to match the type of the corresponding field definition
    /// in the schema.
    fn resolve<'a>(&'a self, info: ResolveInfo<'a>)
        -> BoxFuture<'a, Result<JsonValue, ResolverError>>;
}

struct FnResolver<F>(F);

impl<F> FieldResolver for FnResolver<F>
where
    F: Fn(&ResolveInfo<'_>) -> Result<JsonValue, ResolverError> + Send + Sync,
{
    fn resolve<'a>(
        &'a self,
        info: ResolveInfo<'a>,
    ) -> BoxFuture<'a, Result<JsonValue, ResolverError>> {
        Box::pin(futures::future::ready((self.0)(&info)))
    }
}

/// Resolver map: type name → field name → resolver
#[derive(Clone, Default)]
pub struct Resolvers {
    types: IndexMap<Name, IndexMap<Name, Arc<dyn FieldResolver>>>,
}

/// Configuration of [`merge_resolvers`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolverMergeOptions {
    /// `"Type.field"` removes one resolver, `"Type.*"` removes all resolvers of a type
    pub exclusions: Vec<String>,
}

impl ResolverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Resolvers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `resolver` for `type_name.field_name`, replacing any previous one
    pub fn insert(
        &mut self,
        type_name: Name,
        field_name: Name,
        resolver: Arc<dyn FieldResolver>,
    ) -> Option<Arc<dyn FieldResolver>> {
        self.types
            .entry(type_name)
            .or_default()
            .insert(field_name, resolver)
    }

    /// Register a synchronous resolver closure for `type_name.field_name`
    pub fn resolve_with<F>(&mut self, type_name: Name, field_name: Name, resolver: F) -> &mut Self
    where
        F: Fn(&ResolveInfo<'_>) -> Result<JsonValue, ResolverError> + Send + Sync + 'static,
    {
        self.insert(type_name, field_name, Arc::new(FnResolver(resolver)));
        self
    }

    pub fn get(&self, type_name: &str, field_name: &str) -> Option<&Arc<dyn FieldResolver>> {
        self.types.get(type_name)?.get(field_name)
    }

    pub fn remove(&mut self, type_name: &str, field_name: &str) -> Option<Arc<dyn FieldResolver>> {
        let fields = self.types.get_mut(type_name)?;
        let removed = fields.shift_remove(field_name);
        if fields.is_empty() {
            self.types.shift_remove(type_name);
        }
        removed
    }

    pub fn contains(&self, type_name: &str, field_name: &str) -> bool {
        self.get(type_name, field_name).is_some()
    }

    /// Iterate `(type name, field name, resolver)` in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&Name, &Name, &Arc<dyn FieldResolver>)> {
        self.types.iter().flat_map(|(type_name, fields)| {
            fields
                .iter()
                .map(move |(field_name, resolver)| (type_name, field_name, resolver))
        })
    }

    pub(crate) fn iter_mut(
        &mut self,
    ) -> impl Iterator<Item = (&Name, &Name, &mut Arc<dyn FieldResolver>)> {
        self.types.iter_mut().flat_map(|(type_name, fields)| {
            fields
                .iter_mut()
                .map(move |(field_name, resolver)| (type_name, field_name, resolver))
        })
    }

    pub fn len(&self) -> usize {
        self.types.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl std::fmt::Debug for Resolvers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(
                self.types
                    .iter()
                    .map(|(type_name, fields)| (type_name, fields.keys().collect::<Vec<_>>())),
            )
            .finish()
    }
}

/// Merge resolver maps. For a given type and field,
/// a resolver from a later map overrides one from an earlier map.
///
/// Overrides are never errors.
pub fn merge_resolvers<'a>(
    inputs: impl IntoIterator<Item = &'a Resolvers>,
    options: &ResolverMergeOptions,
) -> Resolvers {
    let mut merged = Resolvers::new();
    for input in inputs {
        for (type_name, field_name, resolver) in input.iter() {
            merged.insert(type_name.clone(), field_name.clone(), resolver.clone());
        }
    }
    for exclusion in &options.exclusions {
        let Some((type_name, field_name)) = exclusion.split_once('.') else {
            tracing::warn!("ignoring resolver exclusion without a field: {exclusion}");
            continue;
        };
        if field_name == "*" {
            merged.types.shift_remove(type_name);
        } else {
            merged.remove(type_name, field_name);
        }
    }
    merged
}
