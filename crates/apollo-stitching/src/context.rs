use crate::compose::StitchedSchema;
use crate::delegate::Delegator;
use crate::JsonMap;
use apollo_compiler::ExecutableDocument;

/// What result merging needs to know about the request being executed
#[derive(Clone, Copy)]
pub struct RequestContext<'a> {
    pub schema: &'a StitchedSchema,
    /// The request document, for its fragment definitions
    pub document: &'a ExecutableDocument,
    /// Coerced variable values of the request
    pub variable_values: &'a JsonMap,
    pub delegator: &'a dyn Delegator,
    /// Return objects as their origin subschema resolved them
    pub skip_type_merging: bool,
}

impl<'a> RequestContext<'a> {
    pub fn new(
        schema: &'a StitchedSchema,
        document: &'a ExecutableDocument,
        variable_values: &'a JsonMap,
        delegator: &'a dyn Delegator,
    ) -> Self {
        Self {
            schema,
            document,
            variable_values,
            delegator,
            skip_type_merging: false,
        }
    }

    pub fn skip_type_merging(mut self, skip: bool) -> Self {
        self.skip_type_merging = skip;
        self
    }
}
