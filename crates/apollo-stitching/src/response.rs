use crate::JsonMap;
use apollo_compiler::Name;
use serde::Serialize;
use serde_json_bytes::Value as JsonValue;

/// <https://spec.graphql.org/October2021/#sec-Errors.Error-result-format>
///
/// Errors attached to a [`ResultObject`][crate::ResultObject] have a `path`
/// relative to that object, not to the root of the response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphQLError {
    pub message: String,

    /// Empty for errors about the object as a whole
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<PathElement>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<Location>,

    #[serde(skip_serializing_if = "JsonMap::is_empty")]
    pub extensions: JsonMap,
}

/// Possible key in the `GraphQLError::extensions` map
pub const EXTENSION_CODE: &str = "code";

/// Possible key in the `GraphQLError::extensions` map,
/// naming the subschema an error originates from
pub const EXTENSION_SUBSCHEMA: &str = "subschema";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathElement {
    Field(Name),
    ListItem { index: usize },
}

impl GraphQLError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Vec::new(),
            locations: Vec::new(),
            extensions: JsonMap::new(),
        }
    }

    pub fn with_path(mut self, path: Vec<PathElement>) -> Self {
        self.path = path;
        self
    }

    pub fn with_extension(mut self, key: &str, value: impl Into<JsonValue>) -> Self {
        self.extensions.insert(key, value.into());
        self
    }

    /// Drop the first path segment.
    ///
    /// An error reported for a field of a parent object has a path starting
    /// at that field. Slicing makes the path relative to the object the
    /// field resolved to.
    pub fn sliced(mut self) -> Self {
        if !self.path.is_empty() {
            self.path.remove(0);
        }
        self
    }

    /// Prepend `prefix` to this error’s path
    pub fn relocated(mut self, prefix: &[PathElement]) -> Self {
        if !prefix.is_empty() {
            self.path.splice(0..0, prefix.iter().cloned());
        }
        self
    }
}

impl std::fmt::Display for GraphQLError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)?;
        if !self.path.is_empty() {
            f.write_str(" at ")?;
            for (i, element) in self.path.iter().enumerate() {
                if i > 0 {
                    f.write_str(".")?;
                }
                match element {
                    PathElement::Field(name) => write!(f, "{name}")?,
                    PathElement::ListItem { index } => write!(f, "{index}")?,
                }
            }
        }
        Ok(())
    }
}

impl Serialize for PathElement {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            PathElement::Field(name) => name.as_str().serialize(serializer),
            PathElement::ListItem { index } => index.serialize(serializer),
        }
    }
}
