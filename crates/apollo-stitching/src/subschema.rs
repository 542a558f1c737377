use crate::error::SchemaBuildError;
use crate::extensions::SchemaExtensions;
use crate::resolvers::Resolvers;
use apollo_compiler::validation::Valid;
use apollo_compiler::Name;
use apollo_compiler::Schema;
use indexmap::IndexMap;
use serde::Deserialize;
use std::sync::Arc;

/// One independently defined schema taking part in composition:
/// its type system, its resolvers and its extension metadata.
pub struct Subschema {
    name: String,
    schema: Valid<Schema>,
    resolvers: Resolvers,
    extensions: SchemaExtensions,
    merge: IndexMap<Name, MergedTypeConfig>,
}

/// How a subschema takes part in merging one object type
/// that other subschemas also implement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MergedTypeConfig {
    /// Fields this subschema needs to re-enter the entity, as a field set such as `"id"`
    pub key: Option<String>,

    /// Extra selection needed before a field of this subschema can be computed,
    /// as a field set string keyed by field name
    pub fields: IndexMap<Name, String>,
}

/// Shared handle to a [`Subschema`].
///
/// Equality and hashing are by identity: two handles are equal
/// if and only if they point to the same subschema.
#[derive(Clone)]
pub struct SubschemaRef(Arc<Subschema>);

impl Subschema {
    pub fn new(name: impl Into<String>, schema: Valid<Schema>) -> Self {
        Self {
            name: name.into(),
            schema,
            resolvers: Resolvers::new(),
            extensions: SchemaExtensions::default(),
            merge: IndexMap::new(),
        }
    }

    /// Parse and validate type definitions into a subschema with no resolvers
    pub fn parse(name: impl Into<String>, source_text: &str) -> Result<Self, SchemaBuildError> {
        let name = name.into();
        let schema = Schema::parse_and_validate(source_text, format!("{name}.graphql"))
            .map_err(|with_errors| SchemaBuildError::Parse {
                source_name: name.clone(),
                errors: with_errors.errors,
            })?;
        Ok(Self::new(name, schema))
    }

    pub fn with_resolvers(mut self, resolvers: Resolvers) -> Self {
        self.resolvers = resolvers;
        self
    }

    pub fn with_extensions(mut self, extensions: SchemaExtensions) -> Self {
        self.extensions = extensions;
        self
    }

    /// Declare how this subschema takes part in merging `type_name`
    pub fn with_merged_type(mut self, type_name: Name, config: MergedTypeConfig) -> Self {
        self.merge.insert(type_name, config);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Valid<Schema> {
        &self.schema
    }

    pub fn resolvers(&self) -> &Resolvers {
        &self.resolvers
    }

    pub fn extensions(&self) -> &SchemaExtensions {
        &self.extensions
    }

    pub fn merged_type_config(&self, type_name: &str) -> Option<&MergedTypeConfig> {
        self.merge.get(type_name)
    }
}

impl MergedTypeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(mut self, field_set: impl Into<String>) -> Self {
        self.key = Some(field_set.into());
        self
    }

    pub fn field(mut self, field_name: Name, field_set: impl Into<String>) -> Self {
        self.fields.insert(field_name, field_set.into());
        self
    }
}

impl SubschemaRef {
    pub fn new(subschema: Subschema) -> Self {
        Self(Arc::new(subschema))
    }
}

impl From<Subschema> for SubschemaRef {
    fn from(subschema: Subschema) -> Self {
        Self::new(subschema)
    }
}

impl std::ops::Deref for SubschemaRef {
    type Target = Subschema;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl PartialEq for SubschemaRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for SubschemaRef {}

impl std::hash::Hash for SubschemaRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.0), state)
    }
}

impl std::fmt::Debug for SubschemaRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SubschemaRef").field(&self.0.name).finish()
    }
}
