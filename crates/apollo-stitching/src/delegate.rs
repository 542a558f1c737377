//! The contract of the component that sends a selection to a subschema.
//!
//! Transport is out of scope of this crate:
//! result merging only calls a [`Delegator`] and awaits what it returns.

use crate::context::RequestContext;
use crate::result::ResultObject;
use crate::subschema::SubschemaRef;
use crate::JsonMap;
use apollo_compiler::executable::Field;
use apollo_compiler::Name;
use apollo_compiler::Node;
use futures::future::BoxFuture;

/// Fetch fields of one entity from one subschema
pub struct DelegationRequest<'a> {
    pub subschema: &'a SubschemaRef,
    pub type_name: &'a Name,
    /// Fields to fetch, keyed in the result by their response keys
    pub field_nodes: Vec<Node<Field>>,
    /// Values the subschema needs to re-enter the entity, taken from the object being merged
    pub key: JsonMap,
    pub context: &'a RequestContext<'a>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct DelegationError {
    pub message: String,
    pub extensions: JsonMap,
}

/// Sends sub-selections to subschemas.
///
/// May be called concurrently for different subschemas within one merge.
pub trait Delegator: Send + Sync {
    /// Returns the partial object the subschema resolved.
    /// Errors in it are relative to that object.
    fn delegate<'a>(
        &'a self,
        request: DelegationRequest<'a>,
    ) -> BoxFuture<'a, Result<ResultObject, DelegationError>>;
}

struct FnDelegator<F>(F);

impl<F> Delegator for FnDelegator<F>
where
    F: Fn(DelegationRequest<'_>) -> Result<ResultObject, DelegationError> + Send + Sync,
{
    fn delegate<'a>(
        &'a self,
        request: DelegationRequest<'a>,
    ) -> BoxFuture<'a, Result<ResultObject, DelegationError>> {
        Box::pin(futures::future::ready((self.0)(request)))
    }
}

/// A delegator that answers synchronously
pub fn delegator_fn<F>(delegate: F) -> impl Delegator
where
    F: Fn(DelegationRequest<'_>) -> Result<ResultObject, DelegationError> + Send + Sync,
{
    FnDelegator(delegate)
}

impl DelegationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            extensions: JsonMap::new(),
        }
    }
}
