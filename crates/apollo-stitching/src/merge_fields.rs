//! Fetching missing fields of an object from other subschemas and merging them in.

use crate::collect::GroupedFields;
use crate::context::RequestContext;
use crate::delegate::DelegationError;
use crate::delegate::DelegationRequest;
use crate::response::GraphQLError;
use crate::response::PathElement;
use crate::response::EXTENSION_CODE;
use crate::response::EXTENSION_SUBSCHEMA;
use crate::result::ResultObject;
use crate::stitching_info::MergedTypeInfo;
use crate::subschema::SubschemaRef;
use crate::JsonMap;
use apollo_compiler::executable::Field;
use apollo_compiler::executable::Selection;
use apollo_compiler::Name;
use apollo_compiler::Node;
use futures::future::join_all;
use indexmap::IndexMap;
use serde_json_bytes::Value as JsonValue;

/// Error code of errors standing for fields a failed delegation did not return
pub const DELEGATION_FAILED: &str = "DELEGATION_FAILED";

/// Fetch `needed` fields of `object` from `candidates` and merge them into it.
///
/// Sources in `exclude` are never asked.
/// Each response key is fetched from one source: the first candidate providing every needed field
/// if there is one, otherwise the first candidate providing that field.
/// Keys no candidate provides are left alone.
///
/// Delegations run concurrently and are all awaited.
/// A value already on `object` is never replaced,
/// and when sources return the same key the first non-null value in candidate order wins.
/// A failed delegation leaves its fields null, each with an error.
pub async fn merge_fields(
    ctx: &RequestContext<'_>,
    merged_type: &MergedTypeInfo,
    mut object: ResultObject,
    needed: GroupedFields,
    exclude: &[SubschemaRef],
    candidates: &[SubschemaRef],
) -> ResultObject {
    let candidates: Vec<&SubschemaRef> = candidates
        .iter()
        .filter(|candidate| !exclude.contains(*candidate))
        .collect();
    let plan = plan_delegations(merged_type, &candidates, needed);
    if plan.is_empty() {
        return object;
    }

    let results = join_all(plan.iter().map(|(subschema, fields)| {
        let request = DelegationRequest {
            subschema,
            type_name: &merged_type.type_name,
            field_nodes: fields.values().flatten().cloned().collect(),
            key: entity_key(merged_type, subschema, &object.value),
            context: ctx,
        };
        tracing::debug!(
            subschema = subschema.name(),
            "delegating {}.{{{}}}",
            merged_type.type_name,
            fields.keys().map(Name::as_str).collect::<Vec<_>>().join(", ")
        );
        ctx.delegator.delegate(request)
    }))
    .await;

    for ((subschema, fields), result) in plan.iter().zip(results) {
        match result {
            Ok(partial) => {
                let (value, errors) = partial.into_parts();
                merge_value(&mut object.value, value);
                object.extend_errors(errors);
            }
            Err(error) => {
                tracing::warn!(
                    subschema = subschema.name(),
                    "delegation of {} fields failed: {error}",
                    merged_type.type_name
                );
                for response_key in fields.keys() {
                    object.push_error(delegation_failed(&error, subschema, response_key));
                }
            }
        }
    }
    for response_key in plan.values().flat_map(IndexMap::keys) {
        if !object.value.contains_key(response_key.as_str()) {
            object.value.insert(response_key.as_str(), JsonValue::Null);
        }
    }
    object
}

/// Assign each needed response key to the subschema that will be asked for it,
/// keeping candidate order
fn plan_delegations(
    merged_type: &MergedTypeInfo,
    candidates: &[&SubschemaRef],
    needed: GroupedFields,
) -> IndexMap<SubschemaRef, GroupedFields> {
    let covering = candidates.iter().find(|candidate| {
        needed
            .values()
            .all(|fields| provides(merged_type, candidate, fields))
    });
    if let Some(covering) = covering {
        return IndexMap::from([((*covering).clone(), needed)]);
    }

    let mut assignments = vec![GroupedFields::new(); candidates.len()];
    for (response_key, fields) in needed {
        let Some(index) = candidates
            .iter()
            .position(|candidate| provides(merged_type, candidate, &fields))
        else {
            continue;
        };
        assignments[index].insert(response_key, fields);
    }
    candidates
        .iter()
        .zip(assignments)
        .filter(|(_, fields)| !fields.is_empty())
        .map(|(candidate, fields)| ((*candidate).clone(), fields))
        .collect()
}

fn provides(
    merged_type: &MergedTypeInfo,
    candidate: &SubschemaRef,
    fields: &[Node<Field>],
) -> bool {
    fields
        .first()
        .is_some_and(|field| merged_type.provides(candidate, &field.name))
}

/// Values of `object` that `subschema` needs to re-enter the entity:
/// its key selection if it declares one, otherwise every field it shares with `object`
fn entity_key(
    merged_type: &MergedTypeInfo,
    subschema: &SubschemaRef,
    object: &JsonMap,
) -> JsonMap {
    let mut key = JsonMap::new();
    match merged_type.key_selections.get(subschema) {
        Some(key_selection) => {
            for selection in &key_selection.selections {
                let Selection::Field(field) = selection else {
                    continue;
                };
                let response_key = field.response_key().as_str();
                if let Some(value) = object.get(response_key) {
                    key.insert(response_key, value.clone());
                }
            }
        }
        None => {
            for (field_name, value) in object {
                if merged_type.provides(subschema, field_name.as_str()) {
                    key.insert(field_name.clone(), value.clone());
                }
            }
        }
    }
    key
}

/// Shallow merge: a non-null value is never replaced, a null one only by a non-null one
fn merge_value(merged: &mut JsonMap, partial: JsonMap) {
    for (response_key, value) in partial {
        match merged.get(response_key.as_str()) {
            Some(existing) if !existing.is_null() => continue,
            Some(_) if value.is_null() => continue,
            _ => {
                merged.insert(response_key, value);
            }
        }
    }
}

fn delegation_failed(
    error: &DelegationError,
    subschema: &SubschemaRef,
    response_key: &Name,
) -> GraphQLError {
    let mut graphql_error = GraphQLError::new(error.message.clone());
    graphql_error.extensions = error.extensions.clone();
    graphql_error
        .relocated(&[PathElement::Field(response_key.clone())])
        .with_extension(EXTENSION_CODE, DELEGATION_FAILED)
        .with_extension(EXTENSION_SUBSCHEMA, subschema.name())
}
