use crate::collect::collect_sub_fields;
use crate::context::RequestContext;
use crate::merge_fields::merge_fields;
use crate::response::GraphQLError;
use crate::result::CompositeType;
use crate::result::ResultObject;
use crate::subschema::SubschemaRef;
use apollo_compiler::executable::Field;
use apollo_compiler::Node;

/// Entry point of result merging, called for each composite value a subschema resolves.
///
/// `errors` are the errors the origin reported at or below this object,
/// with paths starting at the field whose nodes are `field_nodes`.
/// They are attached to the object relative to it.
///
/// If other subschemas implement the object’s type,
/// fields requested by `field_nodes` that `origin` does not provide are fetched from them
/// and merged in.
pub async fn handle_object(
    ctx: &RequestContext<'_>,
    ty: CompositeType<'_>,
    mut object: ResultObject,
    errors: Vec<GraphQLError>,
    origin: &SubschemaRef,
    field_nodes: &[Node<Field>],
) -> ResultObject {
    object.extend_errors(errors.into_iter().map(GraphQLError::sliced));
    object.set_source(origin.clone());
    if ctx.skip_type_merging {
        return object;
    }
    let Some(stitching_info) = ctx.schema.stitching_info() else {
        return object;
    };
    let object_type = match ty.concrete_type(ctx.schema.schema(), &object) {
        Ok(object_type) => object_type,
        Err(error) => {
            object.push_error(error);
            return object;
        }
    };
    let Some(merged_type) = stitching_info.merged_type(&object_type.name) else {
        return object;
    };
    let targets: Vec<SubschemaRef> = merged_type
        .subschemas
        .iter()
        .filter(|subschema| *subschema != origin)
        .cloned()
        .collect();
    if targets.is_empty() {
        return object;
    }

    let mut missing = collect_sub_fields(ctx, object_type, field_nodes);
    missing.retain(|_, fields| {
        let Some(field) = fields.first() else {
            return false;
        };
        // Meta-fields like `__typename` come with every object
        !field.name.starts_with("__") && !merged_type.provides(origin, &field.name)
    });
    if missing.is_empty() {
        return object;
    }
    merge_fields(
        ctx,
        merged_type,
        object,
        missing,
        std::slice::from_ref(origin),
        &targets,
    )
    .await
}
