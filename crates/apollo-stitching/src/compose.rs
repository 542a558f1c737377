//! Composition of subschemas into one stitched schema.

use crate::error::ComposeError;
use crate::error::SchemaBuildError;
use crate::extensions::apply_extensions;
use crate::extensions::merge_extensions;
use crate::extensions::SchemaExtensions;
use crate::logger::add_error_logging;
use crate::logger::Logger;
use crate::resolvers::merge_resolvers;
use crate::resolvers::FieldResolver;
use crate::resolvers::ResolverMergeOptions;
use crate::resolvers::Resolvers;
use crate::stitching_info::SelectionSetsByField;
use crate::stitching_info::StitchingInfo;
use crate::subschema::SubschemaRef;
use crate::typedefs::merge_type_defs;
use crate::typedefs::parse_type_defs;
use crate::typedefs::TypeMergeOptions;
use crate::validation::attach_resolvers;
use crate::validation::ResolverValidationOptions;
use crate::JsonMap;
use apollo_compiler::ast::Directive;
use apollo_compiler::ast::EnumValueDefinition;
use apollo_compiler::ast::InputValueDefinition;
use apollo_compiler::schema::Component;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::schema::FieldDefinition;
use apollo_compiler::schema::InterfaceType;
use apollo_compiler::schema::ObjectType;
use apollo_compiler::validation::Valid;
use apollo_compiler::Name;
use apollo_compiler::Schema;
use futures::future::join_all;
use indexmap::IndexMap;
use std::hash::BuildHasher;
use std::sync::Arc;

/// Configures and runs composition.
///
/// Inputs are merged in the order they were added:
/// subschemas first, then extra type definitions, resolvers, and extensions.
/// Where inputs conflict, the later one wins by default.
///
/// ```no_run
/// use apollo_stitching::SchemaComposer;
/// use apollo_stitching::Subschema;
///
/// let users = Subschema::parse("users", "type Query { me: User } type User { id: ID! }")?;
/// let stitched = SchemaComposer::new()
///     .subschema(users)
///     .type_defs("extensions.graphql", "extend type User { nickname: String }")
///     .compose()?;
/// assert!(stitched.schema().get_object("User").is_some());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Default)]
pub struct SchemaComposer {
    subschemas: Vec<SubschemaRef>,
    type_defs: Vec<(String, String)>,
    resolvers: Vec<Resolvers>,
    extensions: Vec<SchemaExtensions>,
    type_merge_options: TypeMergeOptions,
    resolver_merge_options: ResolverMergeOptions,
    resolver_validation: ResolverValidationOptions,
    logger: Option<Arc<dyn Logger>>,
    directive_visitors: IndexMap<Name, Arc<dyn SchemaDirectiveVisitor>>,
    selection_sets_by_field: SelectionSetsByField,
}

/// Hooks called once during composition for each schema element
/// that carries the directive the visitor is registered for.
///
/// Object and interface types, their fields, enum values, and input object fields are visited.
/// Directives on scalars, unions, arguments, and the schema definition are not.
/// Visitors run after resolvers are attached. The schema is validated again afterwards.
pub trait SchemaDirectiveVisitor: Send + Sync {
    fn visit_object(&self, _directive: &Directive, _object: &mut ObjectType) {}

    fn visit_interface(&self, _directive: &Directive, _interface: &mut InterfaceType) {}

    /// `resolver` is the field’s current resolver: replace it to change how the field resolves
    fn visit_field_definition(
        &self,
        _directive: &Directive,
        _type_name: &Name,
        _field: &mut FieldDefinition,
        _resolver: &mut Option<Arc<dyn FieldResolver>>,
    ) {
    }

    fn visit_enum_value(
        &self,
        _directive: &Directive,
        _enum_name: &Name,
        _value: &mut EnumValueDefinition,
    ) {
    }

    fn visit_input_field(
        &self,
        _directive: &Directive,
        _type_name: &Name,
        _field: &mut InputValueDefinition,
    ) {
    }
}

/// The result of composition: the unified schema and its resolvers,
/// and the index of types that several subschemas implement.
///
/// Read-only once composed.
#[derive(Debug)]
pub struct StitchedSchema {
    schema: Valid<Schema>,
    resolvers: Resolvers,
    extensions: SchemaExtensions,
    subschemas: Vec<SubschemaRef>,
    stitching_info: Option<StitchingInfo>,
}

/// What is extracted from each input before merging
struct ComposeInputs {
    type_defs: Vec<Schema>,
    resolvers: Vec<Resolvers>,
    extensions: Vec<SchemaExtensions>,
}

impl SchemaComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subschema(mut self, subschema: impl Into<SubschemaRef>) -> Self {
        self.subschemas.push(subschema.into());
        self
    }

    /// Additional type definitions, which may extend types of the subschemas
    pub fn type_defs(
        mut self,
        source_name: impl Into<String>,
        source_text: impl Into<String>,
    ) -> Self {
        self.type_defs.push((source_name.into(), source_text.into()));
        self
    }

    /// Additional resolvers, merged after those of the subschemas
    pub fn resolvers(mut self, resolvers: Resolvers) -> Self {
        self.resolvers.push(resolvers);
        self
    }

    /// Additional extension metadata, merged after that of the subschemas
    pub fn extensions(mut self, extensions: SchemaExtensions) -> Self {
        self.extensions.push(extensions);
        self
    }

    pub fn type_merge_options(mut self, options: TypeMergeOptions) -> Self {
        self.type_merge_options = options;
        self
    }

    pub fn resolver_merge_options(mut self, options: ResolverMergeOptions) -> Self {
        self.resolver_merge_options = options;
        self
    }

    pub fn resolver_validation(mut self, options: ResolverValidationOptions) -> Self {
        self.resolver_validation = options;
        self
    }

    /// Report errors of every resolver of the composed schema to `logger`
    pub fn logger(mut self, logger: impl Logger + 'static) -> Self {
        self.logger = Some(Arc::new(logger));
        self
    }

    /// Run `visitor` on schema elements carrying the directive `directive_name`
    pub fn schema_directive(
        mut self,
        directive_name: Name,
        visitor: impl SchemaDirectiveVisitor + 'static,
    ) -> Self {
        self.directive_visitors.insert(directive_name, Arc::new(visitor));
        self
    }

    /// Always fetch `field_set` alongside `type_name.field_name`
    pub fn selection_set_for_field(
        mut self,
        type_name: Name,
        field_name: Name,
        field_set: impl Into<String>,
    ) -> Self {
        self.selection_sets_by_field
            .entry(type_name)
            .or_default()
            .insert(field_name, field_set.into());
        self
    }

    pub fn compose(&self) -> Result<StitchedSchema, ComposeError> {
        let mut type_defs: Vec<_> = self.subschemas.iter().map(type_defs_of).collect();
        for (source_name, source_text) in &self.type_defs {
            type_defs.push(parse_type_defs(source_name, source_text)?)
        }
        let inputs = ComposeInputs {
            type_defs,
            resolvers: self.subschemas.iter().map(resolvers_of).collect(),
            extensions: self.subschemas.iter().map(extensions_of).collect(),
        };
        self.assemble(inputs)
    }

    /// Like [`compose`][Self::compose], but extraction from each input starts independently
    /// and results are combined once all of it is done.
    ///
    /// The output is identical to that of `compose` for the same inputs.
    pub async fn compose_async(&self) -> Result<StitchedSchema, ComposeError> {
        let (mut type_defs, extra_type_defs, resolvers, extensions) = futures::join!(
            join_all(
                self.subschemas
                    .iter()
                    .map(|subschema| async move { type_defs_of(subschema) })
            ),
            join_all(
                self.type_defs
                    .iter()
                    .map(|(source_name, source_text)| async move {
                        parse_type_defs(source_name, source_text)
                    })
            ),
            join_all(
                self.subschemas
                    .iter()
                    .map(|subschema| async move { resolvers_of(subschema) })
            ),
            join_all(
                self.subschemas
                    .iter()
                    .map(|subschema| async move { extensions_of(subschema) })
            ),
        );
        for parsed in extra_type_defs {
            type_defs.push(parsed?)
        }
        let inputs = ComposeInputs {
            type_defs,
            resolvers,
            extensions,
        };
        self.assemble(inputs)
    }

    /// Combine extracted inputs. Both composition entry points end here.
    fn assemble(&self, inputs: ComposeInputs) -> Result<StitchedSchema, ComposeError> {
        let ComposeInputs {
            type_defs,
            mut resolvers,
            mut extensions,
        } = inputs;
        resolvers.extend(self.resolvers.iter().cloned());
        extensions.extend(self.extensions.iter().cloned());

        let merged = merge_type_defs(&type_defs, &self.type_merge_options)?;
        let resolvers = merge_resolvers(&resolvers, &self.resolver_merge_options);
        let extensions = merge_extensions(&extensions);

        let schema = merged.validate().map_err(|with_errors| {
            SchemaBuildError::Invalid(with_errors.errors)
        })?;
        let mut resolvers = attach_resolvers(&schema, resolvers, &self.resolver_validation)?;
        if let Some(logger) = &self.logger {
            add_error_logging(&mut resolvers, logger)
        }
        let schema = if self.directive_visitors.is_empty() {
            schema
        } else {
            let mut schema = schema.into_inner();
            self.visit_directives(&mut schema, &mut resolvers);
            schema
                .validate()
                .map_err(|with_errors| SchemaBuildError::Invalid(with_errors.errors))?
        };
        let extensions = apply_extensions(&schema, extensions);
        let stitching_info =
            StitchingInfo::build(&schema, &self.subschemas, &self.selection_sets_by_field)?;
        tracing::debug!(
            subschemas = self.subschemas.len(),
            types = schema.types.len(),
            resolvers = resolvers.len(),
            "composed schema"
        );
        Ok(StitchedSchema {
            schema,
            resolvers,
            extensions,
            subschemas: self.subschemas.clone(),
            stitching_info,
        })
    }

    fn visit_directives(&self, schema: &mut Schema, resolvers: &mut Resolvers) {
        for (directive_name, visitor) in &self.directive_visitors {
            let visitor = visitor.as_ref();
            for ty in schema.types.values_mut() {
                match ty {
                    ExtendedType::Object(object) => {
                        let object = object.make_mut();
                        if let Some(directive) = object.directives.get(directive_name) {
                            let directive = directive.node.clone();
                            visitor.visit_object(&directive, object);
                        }
                        let type_name = object.name.clone();
                        visit_fields(
                            visitor,
                            directive_name,
                            &type_name,
                            &mut object.fields,
                            resolvers,
                        )
                    }
                    ExtendedType::Interface(interface) => {
                        let interface = interface.make_mut();
                        if let Some(directive) = interface.directives.get(directive_name) {
                            let directive = directive.node.clone();
                            visitor.visit_interface(&directive, interface);
                        }
                        let type_name = interface.name.clone();
                        visit_fields(
                            visitor,
                            directive_name,
                            &type_name,
                            &mut interface.fields,
                            resolvers,
                        )
                    }
                    ExtendedType::Enum(enum_type) => {
                        let enum_type = enum_type.make_mut();
                        for value in enum_type.values.values_mut() {
                            let Some(directive) = value.directives.get(directive_name) else {
                                continue;
                            };
                            let directive = directive.clone();
                            visitor.visit_enum_value(&directive, &enum_type.name, value.make_mut());
                        }
                    }
                    ExtendedType::InputObject(input_object) => {
                        let input_object = input_object.make_mut();
                        for field in input_object.fields.values_mut() {
                            let Some(directive) = field.directives.get(directive_name) else {
                                continue;
                            };
                            let directive = directive.clone();
                            visitor.visit_input_field(
                                &directive,
                                &input_object.name,
                                field.make_mut(),
                            );
                        }
                    }
                    ExtendedType::Scalar(_) | ExtendedType::Union(_) => {}
                }
            }
        }
    }
}

fn visit_fields<S: BuildHasher>(
    visitor: &dyn SchemaDirectiveVisitor,
    directive_name: &Name,
    type_name: &Name,
    fields: &mut IndexMap<Name, Component<FieldDefinition>, S>,
    resolvers: &mut Resolvers,
) {
    for field in fields.values_mut() {
        let Some(directive) = field.directives.get(directive_name) else {
            continue;
        };
        let directive = directive.clone();
        let mut resolver = resolvers.get(type_name, &field.name).cloned();
        visitor.visit_field_definition(&directive, type_name, field.make_mut(), &mut resolver);
        match resolver {
            Some(resolver) => {
                resolvers.insert(type_name.clone(), field.name.clone(), resolver);
            }
            None => {
                resolvers.remove(type_name, &field.name);
            }
        }
    }
}

fn type_defs_of(subschema: &SubschemaRef) -> Schema {
    Schema::clone(subschema.schema())
}

fn resolvers_of(subschema: &SubschemaRef) -> Resolvers {
    subschema.resolvers().clone()
}

fn extensions_of(subschema: &SubschemaRef) -> SchemaExtensions {
    subschema.extensions().clone()
}

impl StitchedSchema {
    pub fn schema(&self) -> &Valid<Schema> {
        &self.schema
    }

    pub fn resolvers(&self) -> &Resolvers {
        &self.resolvers
    }

    /// The subschemas this schema was composed from, in composition order
    pub fn subschemas(&self) -> &[SubschemaRef] {
        &self.subschemas
    }

    /// `None` if no object type is implemented by more than one subschema
    pub fn stitching_info(&self) -> Option<&StitchingInfo> {
        self.stitching_info.as_ref()
    }

    pub fn extensions(&self) -> &SchemaExtensions {
        &self.extensions
    }

    pub fn schema_extensions(&self) -> &JsonMap {
        &self.extensions.schema_extensions
    }

    pub fn type_extensions(&self, type_name: &str) -> Option<&JsonMap> {
        self.extensions.type_extensions(type_name)
    }

    pub fn field_extensions(&self, type_name: &str, field_name: &str) -> Option<&JsonMap> {
        self.extensions.field_extensions(type_name, field_name)
    }
}
