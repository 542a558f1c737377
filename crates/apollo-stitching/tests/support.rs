use apollo_compiler::executable::Field;
use apollo_compiler::executable::Selection;
use apollo_compiler::name;
use apollo_compiler::validation::Valid;
use apollo_compiler::ExecutableDocument;
use apollo_compiler::Node;
use apollo_stitching::DelegationError;
use apollo_stitching::DelegationRequest;
use apollo_stitching::Delegator;
use apollo_stitching::JsonMap;
use apollo_stitching::JsonValue;
use apollo_stitching::MergedTypeConfig;
use apollo_stitching::ResultObject;
use apollo_stitching::SchemaComposer;
use apollo_stitching::StitchedSchema;
use apollo_stitching::Subschema;
use apollo_stitching::SubschemaRef;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Mutex;

pub const ACCOUNTS: &str = r#"
    type Query { me: User, node(id: ID!): Node }
    interface Node { id: ID! }
    type User implements Node { id: ID!, name: String }
"#;

pub const EMAILS: &str = r#"
    type Query { userById(id: ID!): User }
    type User { id: ID!, email: String }
"#;

pub const REVIEWS: &str = r#"
    type Query { reviewer(id: ID!): User }
    type User { id: ID!, reviewCount: Int }
"#;

pub fn subschema(name: &str, source_text: &str) -> SubschemaRef {
    Subschema::parse(name, source_text)
        .unwrap()
        .with_merged_type(name!("User"), MergedTypeConfig::new().key("id"))
        .into()
}

pub fn compose(subschemas: &[&SubschemaRef]) -> StitchedSchema {
    subschemas
        .iter()
        .fold(SchemaComposer::new(), |composer, subschema| {
            composer.subschema((*subschema).clone())
        })
        .compose()
        .unwrap()
}

pub fn json_map(value: serde_json::Value) -> JsonMap {
    match JsonValue::from(value) {
        JsonValue::Object(map) => map,
        _ => panic!("expected an object"),
    }
}

pub fn parse_query(schema: &StitchedSchema, query: &str) -> Valid<ExecutableDocument> {
    ExecutableDocument::parse_and_validate(schema.schema(), query, "query.graphql").unwrap()
}

/// Nodes of the root field with `response_key` in the anonymous operation of `document`
pub fn root_field(document: &ExecutableDocument, response_key: &str) -> Node<Field> {
    let operation = document.operations.get(None).unwrap();
    operation
        .selection_set
        .selections
        .iter()
        .find_map(|selection| match selection {
            Selection::Field(field) if field.response_key() == response_key => {
                Some(field.clone())
            }
            _ => None,
        })
        .unwrap()
}

/// Answers delegations with canned objects, trimmed to the requested fields unless
/// [`untrimmed`][Self::untrimmed], and records every request it gets.
#[derive(Default)]
pub struct MockDelegator {
    responses: HashMap<String, Result<ResultObject, DelegationError>>,
    requests: Mutex<Vec<String>>,
    untrimmed: bool,
}

impl MockDelegator {
    pub fn respond(mut self, subschema: &str, value: serde_json::Value) -> Self {
        let object = ResultObject::new(json_map(value));
        self.responses.insert(subschema.to_owned(), Ok(object));
        self
    }

    pub fn respond_with(mut self, subschema: &str, object: ResultObject) -> Self {
        self.responses.insert(subschema.to_owned(), Ok(object));
        self
    }

    pub fn fail(mut self, subschema: &str, message: &str) -> Self {
        let error = DelegationError::new(message);
        self.responses.insert(subschema.to_owned(), Err(error));
        self
    }

    /// Answer with the whole canned object, including keys nobody asked for
    pub fn untrimmed(mut self) -> Self {
        self.untrimmed = true;
        self
    }

    /// `subschema Type(key) { fields }` for each request, in call order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Delegator for MockDelegator {
    fn delegate<'a>(
        &'a self,
        request: DelegationRequest<'a>,
    ) -> BoxFuture<'a, Result<ResultObject, DelegationError>> {
        let requested: Vec<_> = request
            .field_nodes
            .iter()
            .map(|field| field.response_key().as_str())
            .collect();
        self.requests.lock().unwrap().push(format!(
            "{} {}({}) {{ {} }}",
            request.subschema.name(),
            request.type_name,
            serde_json::to_string(&request.key).unwrap(),
            requested.join(" ")
        ));
        let result = match self.responses.get(request.subschema.name()) {
            Some(Ok(object)) if self.untrimmed => Ok(object.clone()),
            Some(Ok(object)) => {
                let mut trimmed = JsonMap::new();
                for (key, value) in &object.value {
                    if requested.contains(&key.as_str()) {
                        trimmed.insert(key.clone(), value.clone());
                    }
                }
                Ok(ResultObject::new(trimmed).with_errors(object.errors().to_vec()))
            }
            Some(Err(error)) => Err(error.clone()),
            None => Err(DelegationError::new("no response configured")),
        };
        Box::pin(futures::future::ready(result))
    }
}
