use crate::response::GraphQLError;
use crate::subschema::SubschemaRef;
use crate::JsonMap;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::schema::InterfaceType;
use apollo_compiler::schema::ObjectType;
use apollo_compiler::schema::UnionType;
use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::Schema;
use serde_json_bytes::Value as JsonValue;

/// Key of the object type discriminator in result values
pub const TYPENAME: &str = "__typename";

/// The resolved value of a composite type,
/// together with the subschema that produced it and the errors incurred producing it.
///
/// Error paths are relative to this object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultObject {
    pub value: JsonMap,
    source: Option<SubschemaRef>,
    errors: Vec<GraphQLError>,
}

/// An output type whose values are objects
#[derive(Debug, Clone, Copy)]
pub enum CompositeType<'schema> {
    Object(&'schema Node<ObjectType>),
    Interface(&'schema Node<InterfaceType>),
    Union(&'schema Node<UnionType>),
}

impl ResultObject {
    pub fn new(value: JsonMap) -> Self {
        Self {
            value,
            source: None,
            errors: Vec::new(),
        }
    }

    pub fn with_errors(mut self, errors: Vec<GraphQLError>) -> Self {
        self.errors = errors;
        self
    }

    /// The subschema this object was originally resolved from
    pub fn source(&self) -> Option<&SubschemaRef> {
        self.source.as_ref()
    }

    pub fn set_source(&mut self, source: SubschemaRef) {
        self.source = Some(source)
    }

    pub fn errors(&self) -> &[GraphQLError] {
        &self.errors
    }

    pub fn push_error(&mut self, error: GraphQLError) {
        self.errors.push(error)
    }

    pub fn extend_errors(&mut self, errors: impl IntoIterator<Item = GraphQLError>) {
        self.errors.extend(errors)
    }

    pub fn get(&self, response_key: &str) -> Option<&JsonValue> {
        self.value.get(response_key)
    }

    /// Whether `response_key` holds a value other than null
    pub fn has_value(&self, response_key: &str) -> bool {
        self.get(response_key).is_some_and(|value| !value.is_null())
    }

    /// Name of the concrete object type, if the value carries one
    pub fn typename(&self) -> Option<&str> {
        self.get(TYPENAME)?.as_str()
    }

    pub fn into_parts(self) -> (JsonMap, Vec<GraphQLError>) {
        (self.value, self.errors)
    }
}

impl From<JsonMap> for ResultObject {
    fn from(value: JsonMap) -> Self {
        Self::new(value)
    }
}

impl<'schema> CompositeType<'schema> {
    /// Returns `None` if `type_name` is not an object, interface, or union type of `schema`
    pub fn new(schema: &'schema Schema, type_name: &str) -> Option<Self> {
        match schema.types.get(type_name)? {
            ExtendedType::Object(def) => Some(Self::Object(def)),
            ExtendedType::Interface(def) => Some(Self::Interface(def)),
            ExtendedType::Union(def) => Some(Self::Union(def)),
            ExtendedType::Scalar(_) | ExtendedType::Enum(_) | ExtendedType::InputObject(_) => {
                None
            }
        }
    }

    pub fn name(&self) -> &'schema Name {
        match *self {
            Self::Object(def) => &def.name,
            Self::Interface(def) => &def.name,
            Self::Union(def) => &def.name,
        }
    }

    pub fn is_abstract(&self) -> bool {
        !matches!(self, Self::Object(_))
    }

    /// The object type `object` is an instance of.
    ///
    /// For abstract types this reads the `__typename` discriminator,
    /// which must name an object type that is a possible type of `self`.
    pub fn concrete_type(
        &self,
        schema: &'schema Schema,
        object: &ResultObject,
    ) -> Result<&'schema Node<ObjectType>, GraphQLError> {
        let abstract_name = match *self {
            Self::Object(def) => return Ok(def),
            Self::Interface(def) => &def.name,
            Self::Union(def) => &def.name,
        };
        let Some(typename) = object.typename() else {
            return Err(GraphQLError::new(format!(
                "abstract type {abstract_name} must resolve to an object type at runtime, \
                 but the result has no {TYPENAME}"
            )));
        };
        match schema.get_object(typename) {
            Some(def) if schema.is_subtype(abstract_name, typename) => Ok(def),
            _ => Err(GraphQLError::new(format!(
                "abstract type {abstract_name} must resolve to one of its possible types at runtime, \
                 received {typename}"
            ))),
        }
    }
}
