//! Collection of the fields requested on an object,
//! augmented with the extra selections merged types need.

use crate::context::RequestContext;
use apollo_compiler::ast::Value;
use apollo_compiler::executable::Field;
use apollo_compiler::executable::Selection;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::schema::ObjectType;
use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::Schema;
use indexmap::IndexMap;
use std::collections::HashSet;

/// Field nodes grouped by response key, in request order
pub type GroupedFields = IndexMap<Name, Vec<Node<Field>>>;

/// Fields selected on `object_type` by the selection sets of `field_nodes`,
/// the nodes of the parent field whose value is an `object_type` object.
pub fn collect_sub_fields(
    ctx: &RequestContext<'_>,
    object_type: &ObjectType,
    field_nodes: &[Node<Field>],
) -> GroupedFields {
    let mut grouped_fields = GroupedFields::new();
    let mut visited_fragments = HashSet::new();
    for field in field_nodes {
        collect_into(
            ctx,
            object_type,
            &field.selection_set.selections,
            &mut visited_fragments,
            &mut grouped_fields,
        );
    }
    add_extra_selections(ctx, object_type, &mut visited_fragments, &mut grouped_fields);
    grouped_fields
}

/// Fields selected on `object_type` by `selections`.
///
/// Collecting again from the fields of the result adds nothing.
pub fn collect_fields(
    ctx: &RequestContext<'_>,
    object_type: &ObjectType,
    selections: &[Selection],
) -> GroupedFields {
    let mut grouped_fields = GroupedFields::new();
    let mut visited_fragments = HashSet::new();
    collect_into(
        ctx,
        object_type,
        selections,
        &mut visited_fragments,
        &mut grouped_fields,
    );
    add_extra_selections(ctx, object_type, &mut visited_fragments, &mut grouped_fields);
    grouped_fields
}

/// Fold the extra selection registered for each collected field into `grouped_fields`.
///
/// Fields added this way get their own extra selections folded in too.
fn add_extra_selections(
    ctx: &RequestContext<'_>,
    object_type: &ObjectType,
    visited_fragments: &mut HashSet<Name>,
    grouped_fields: &mut GroupedFields,
) {
    let Some(stitching_info) = ctx.schema.stitching_info() else {
        return;
    };
    let mut index = 0;
    while let Some((_, fields)) = grouped_fields.get_index(index) {
        index += 1;
        // Indexing should not panic: `collect_into` only creates a `Vec` to push to it
        let field_name = &fields[0].name;
        let Some(extra) = stitching_info.selection_set_for_field(&object_type.name, field_name)
        else {
            continue;
        };
        collect_into(
            ctx,
            object_type,
            &extra.selections,
            visited_fragments,
            grouped_fields,
        );
    }
}

/// <https://spec.graphql.org/October2021/#CollectFields()>
fn collect_into(
    ctx: &RequestContext<'_>,
    object_type: &ObjectType,
    selections: &[Selection],
    visited_fragments: &mut HashSet<Name>,
    grouped_fields: &mut GroupedFields,
) {
    for selection in selections {
        if eval_if_arg(selection, "skip", ctx.variable_values).unwrap_or(false)
            || !eval_if_arg(selection, "include", ctx.variable_values).unwrap_or(true)
        {
            continue;
        }
        match selection {
            Selection::Field(field) => {
                let fields = grouped_fields
                    .entry(field.response_key().clone())
                    .or_default();
                if !fields.contains(field) {
                    fields.push(field.clone())
                }
            }
            Selection::FragmentSpread(spread) => {
                let new = visited_fragments.insert(spread.fragment_name.clone());
                if !new {
                    continue;
                }
                let Some(fragment) = ctx.document.fragments.get(&spread.fragment_name) else {
                    continue;
                };
                if !does_fragment_type_apply(
                    ctx.schema.schema(),
                    object_type,
                    fragment.type_condition(),
                ) {
                    continue;
                }
                collect_into(
                    ctx,
                    object_type,
                    &fragment.selection_set.selections,
                    visited_fragments,
                    grouped_fields,
                )
            }
            Selection::InlineFragment(inline) => {
                if let Some(condition) = &inline.type_condition {
                    if !does_fragment_type_apply(ctx.schema.schema(), object_type, condition) {
                        continue;
                    }
                }
                collect_into(
                    ctx,
                    object_type,
                    &inline.selection_set.selections,
                    visited_fragments,
                    grouped_fields,
                )
            }
        }
    }
}

/// <https://spec.graphql.org/October2021/#DoesFragmentTypeApply()>
fn does_fragment_type_apply(
    schema: &Schema,
    object_type: &ObjectType,
    fragment_type: &Name,
) -> bool {
    match schema.types.get(fragment_type) {
        Some(ExtendedType::Object(_)) => *fragment_type == object_type.name,
        Some(ExtendedType::Interface(_)) => {
            object_type.implements_interfaces.contains(fragment_type)
        }
        Some(ExtendedType::Union(def)) => def.members.contains(&object_type.name),
        // Undefined or not an output type: validation should have caught this
        _ => false,
    }
}

fn eval_if_arg(
    selection: &Selection,
    directive_name: &str,
    variable_values: &crate::JsonMap,
) -> Option<bool> {
    match selection
        .directives()
        .get(directive_name)?
        .specified_argument_by_name("if")?
        .as_ref()
    {
        Value::Boolean(value) => Some(*value),
        Value::Variable(var) => variable_values.get(var.as_str())?.as_bool(),
        _ => None,
    }
}
