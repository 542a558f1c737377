//! Checks of a merged resolver map against the composed schema.

use crate::error::ResolverValidationError;
use crate::resolvers::Resolvers;
use crate::resolvers::RESOLVE_TYPE;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::Name;
use apollo_compiler::Schema;
use serde::Deserialize;

/// What to do when a resolver requirement is not met
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidationLevel {
    #[default]
    Ignore,
    /// Log a warning and carry on
    Warn,
    /// Fail composition with a [`ResolverValidationError`]
    Error,
}

/// Requirements resolvers must meet to be attached to a composed schema.
///
/// The default is tolerant: nothing is required,
/// and resolvers for fields the schema lacks are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolverValidationOptions {
    /// Fields taking arguments must have a resolver
    pub require_resolvers_for_args: ValidationLevel,
    /// Fields of an object, interface or union type must have a resolver
    pub require_resolvers_for_non_scalar: ValidationLevel,
    /// Every field of every object type must have a resolver
    pub require_resolvers_for_all_fields: ValidationLevel,
    /// Interfaces and unions must have a `__resolveType` resolver
    pub require_resolvers_for_resolve_type: ValidationLevel,
    pub allow_resolvers_not_in_schema: bool,
}

impl Default for ResolverValidationOptions {
    fn default() -> Self {
        Self {
            require_resolvers_for_args: ValidationLevel::Ignore,
            require_resolvers_for_non_scalar: ValidationLevel::Ignore,
            require_resolvers_for_all_fields: ValidationLevel::Ignore,
            require_resolvers_for_resolve_type: ValidationLevel::Ignore,
            allow_resolvers_not_in_schema: true,
        }
    }
}

/// Check `resolvers` against `schema` and return those that apply to it
pub(crate) fn attach_resolvers(
    schema: &Schema,
    resolvers: Resolvers,
    options: &ResolverValidationOptions,
) -> Result<Resolvers, ResolverValidationError> {
    let mut attached = Resolvers::new();
    for (type_name, field_name, resolver) in resolvers.iter() {
        let known = match schema.types.get(type_name) {
            None => Err("type is not defined in the schema"),
            Some(ExtendedType::Object(def)) if def.fields.contains_key(field_name) => Ok(()),
            Some(ExtendedType::Interface(def)) if def.fields.contains_key(field_name) => Ok(()),
            Some(ExtendedType::Interface(_) | ExtendedType::Union(_))
                if field_name == RESOLVE_TYPE =>
            {
                Ok(())
            }
            Some(_) => Err("field is not defined in the schema"),
        };
        match known {
            Ok(()) => {
                attached.insert(type_name.clone(), field_name.clone(), resolver.clone());
            }
            Err(message) if options.allow_resolvers_not_in_schema => {
                tracing::debug!("dropping resolver for {type_name}.{field_name}: {message}")
            }
            Err(message) => {
                return Err(ResolverValidationError {
                    type_name: type_name.clone(),
                    field_name: Some(field_name.clone()),
                    message: message.to_owned(),
                })
            }
        }
    }

    for (type_name, ty) in &schema.types {
        if ty.is_built_in() {
            continue;
        }
        match ty {
            ExtendedType::Object(def) => {
                for (field_name, field) in &def.fields {
                    if attached.contains(type_name, field_name) {
                        continue;
                    }
                    let mut level = options.require_resolvers_for_all_fields;
                    if !field.arguments.is_empty() {
                        level = level.max(options.require_resolvers_for_args);
                    }
                    let non_scalar = matches!(
                        schema.types.get(field.ty.inner_named_type()),
                        Some(
                            ExtendedType::Object(_)
                                | ExtendedType::Interface(_)
                                | ExtendedType::Union(_)
                        )
                    );
                    if non_scalar {
                        level = level.max(options.require_resolvers_for_non_scalar);
                    }
                    report(level, type_name, Some(field_name), "resolver is required")?;
                }
            }
            ExtendedType::Interface(_) | ExtendedType::Union(_) => {
                if !attached.contains(type_name, RESOLVE_TYPE) {
                    report(
                        options.require_resolvers_for_resolve_type,
                        type_name,
                        None,
                        "abstract type has no __resolveType resolver",
                    )?;
                }
            }
            ExtendedType::Scalar(_) | ExtendedType::Enum(_) | ExtendedType::InputObject(_) => {}
        }
    }
    Ok(attached)
}

fn report(
    level: ValidationLevel,
    type_name: &Name,
    field_name: Option<&Name>,
    message: &str,
) -> Result<(), ResolverValidationError> {
    let error = ResolverValidationError {
        type_name: type_name.clone(),
        field_name: field_name.cloned(),
        message: message.to_owned(),
    };
    match level {
        ValidationLevel::Ignore => Ok(()),
        ValidationLevel::Warn => {
            tracing::warn!("{error}");
            Ok(())
        }
        ValidationLevel::Error => Err(error),
    }
}
