//! Index of the object types that several subschemas implement together,
//! derived once from the composed schema.

use crate::error::SchemaBuildError;
use crate::subschema::SubschemaRef;
use apollo_compiler::ast::OperationType;
use apollo_compiler::executable::FieldSet;
use apollo_compiler::executable::SelectionSet;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::schema::FieldDefinition;
use apollo_compiler::validation::Valid;
use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::Schema;
use indexmap::IndexMap;

/// Registry of merged types, attached to a [`StitchedSchema`][crate::StitchedSchema].
///
/// Read-only once built.
#[derive(Debug, Clone)]
pub struct StitchingInfo {
    merged_types: IndexMap<Name, MergedTypeInfo>,
    selection_sets_by_field: IndexMap<Name, IndexMap<Name, SelectionSet>>,
}

/// One object type implemented by two or more subschemas
#[derive(Debug, Clone)]
pub struct MergedTypeInfo {
    pub type_name: Name,
    /// Every subschema implementing this type, in composition order
    pub subschemas: Vec<SubschemaRef>,
    /// Each subschema’s own fields of this type
    pub type_maps: IndexMap<SubschemaRef, IndexMap<Name, Node<FieldDefinition>>>,
    /// Selection each subschema needs to re-enter an entity of this type
    pub key_selections: IndexMap<SubschemaRef, SelectionSet>,
    /// Additional selection needed before a field of this type can be computed
    pub extra_selections: IndexMap<Name, SelectionSet>,
}

/// Extra selections supplied by the caller of composition, type name → field name → field set
pub type SelectionSetsByField = IndexMap<Name, IndexMap<Name, String>>;

impl StitchingInfo {
    /// Returns `None` if no object type is implemented by more than one subschema
    pub(crate) fn build(
        schema: &Valid<Schema>,
        subschemas: &[SubschemaRef],
        selection_sets_by_field: &SelectionSetsByField,
    ) -> Result<Option<Self>, SchemaBuildError> {
        let root_types: Vec<&Name> = [
            OperationType::Query,
            OperationType::Mutation,
            OperationType::Subscription,
        ]
        .into_iter()
        .filter_map(|operation_type| schema.root_operation(operation_type))
        .collect();
        let mut merged_types = IndexMap::new();
        for (type_name, ty) in &schema.types {
            // Root fields are resolved by delegating to their own subschema, never merged
            if !matches!(ty, ExtendedType::Object(_))
                || ty.is_built_in()
                || root_types.contains(&type_name)
            {
                continue;
            }
            let implementers: Vec<_> = subschemas
                .iter()
                .filter(|subschema| subschema.schema().get_object(type_name).is_some())
                .cloned()
                .collect();
            if implementers.len() < 2 {
                continue;
            }
            let info = MergedTypeInfo::build(schema, type_name, implementers)?;
            merged_types.insert(type_name.clone(), info);
        }
        if merged_types.is_empty() {
            return Ok(None);
        }

        let mut by_field = IndexMap::<Name, IndexMap<Name, SelectionSet>>::new();
        for (type_name, info) in &merged_types {
            for (field_name, selection_set) in &info.extra_selections {
                let extra = by_field
                    .entry(type_name.clone())
                    .or_default()
                    .entry(field_name.clone())
                    .or_insert_with(|| SelectionSet::new(type_name.clone()));
                extend_selection_set(extra, selection_set);
            }
        }
        for (type_name, fields) in selection_sets_by_field {
            for (field_name, source_text) in fields {
                let selection_set = parse_selection(schema, type_name, source_text)?;
                let extra = by_field
                    .entry(type_name.clone())
                    .or_default()
                    .entry(field_name.clone())
                    .or_insert_with(|| SelectionSet::new(type_name.clone()));
                extend_selection_set(extra, &selection_set);
            }
        }
        tracing::debug!(
            merged_types = merged_types.len(),
            "built stitching info for {}",
            merged_types.keys().map(Name::as_str).collect::<Vec<_>>().join(", ")
        );
        Ok(Some(Self {
            merged_types,
            selection_sets_by_field: by_field,
        }))
    }

    pub fn merged_type(&self, type_name: &str) -> Option<&MergedTypeInfo> {
        self.merged_types.get(type_name)
    }

    pub fn merged_types(&self) -> impl Iterator<Item = &MergedTypeInfo> {
        self.merged_types.values()
    }

    /// Extra selection registered for `type_name.field_name`, if any
    pub fn selection_set_for_field(
        &self,
        type_name: &str,
        field_name: &str,
    ) -> Option<&SelectionSet> {
        self.selection_sets_by_field.get(type_name)?.get(field_name)
    }
}

impl MergedTypeInfo {
    fn build(
        schema: &Valid<Schema>,
        type_name: &Name,
        subschemas: Vec<SubschemaRef>,
    ) -> Result<Self, SchemaBuildError> {
        let mut type_maps = IndexMap::new();
        let mut key_selections = IndexMap::new();
        let mut extra_selections = IndexMap::<Name, SelectionSet>::new();
        for subschema in &subschemas {
            let Some(object) = subschema.schema().get_object(type_name) else {
                continue;
            };
            let fields: IndexMap<_, _> = object
                .fields
                .iter()
                .map(|(name, field)| (name.clone(), field.node.clone()))
                .collect();
            type_maps.insert(subschema.clone(), fields);

            let Some(config) = subschema.merged_type_config(type_name) else {
                continue;
            };
            if let Some(key) = &config.key {
                let key = parse_selection(schema, type_name, key)?;
                key_selections.insert(subschema.clone(), key);
            }
            for (field_name, source_text) in &config.fields {
                let selection_set = parse_selection(schema, type_name, source_text)?;
                let extra = extra_selections
                    .entry(field_name.clone())
                    .or_insert_with(|| SelectionSet::new(type_name.clone()));
                extend_selection_set(extra, &selection_set);
            }
        }

        // Fetching a field that only some subschemas provide may need delegation,
        // for which the provider’s key must be known.
        for (provider, fields) in &type_maps {
            let Some(key) = key_selections.get(provider) else {
                continue;
            };
            for field_name in fields.keys() {
                let everywhere = type_maps.values().all(|f| f.contains_key(field_name));
                if everywhere {
                    continue;
                }
                let extra = extra_selections
                    .entry(field_name.clone())
                    .or_insert_with(|| SelectionSet::new(type_name.clone()));
                extend_selection_set(extra, key);
            }
        }

        Ok(Self {
            type_name: type_name.clone(),
            subschemas,
            type_maps,
            key_selections,
            extra_selections,
        })
    }

    /// Field definitions `subschema` provides for this type
    pub fn fields_of(
        &self,
        subschema: &SubschemaRef,
    ) -> Option<&IndexMap<Name, Node<FieldDefinition>>> {
        self.type_maps.get(subschema)
    }

    pub fn provides(&self, subschema: &SubschemaRef, field_name: &str) -> bool {
        self.fields_of(subschema)
            .is_some_and(|fields| fields.contains_key(field_name))
    }
}

fn parse_selection(
    schema: &Valid<Schema>,
    type_name: &Name,
    source_text: &str,
) -> Result<SelectionSet, SchemaBuildError> {
    let field_set = FieldSet::parse_and_validate(
        schema,
        type_name.clone(),
        source_text,
        "extra_selection.graphql",
    )
    .map_err(|with_errors| SchemaBuildError::ExtraSelection {
        type_name: type_name.clone(),
        selection: source_text.to_owned(),
        errors: with_errors.errors,
    })?;
    Ok(field_set.into_inner().selection_set)
}

/// Append selections of `new` that `merged` does not already have
fn extend_selection_set(merged: &mut SelectionSet, new: &SelectionSet) {
    for selection in &new.selections {
        if !merged.selections.contains(selection) {
            merged.selections.push(selection.clone())
        }
    }
}
