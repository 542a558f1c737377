use apollo_compiler::validation::DiagnosticList;
use apollo_compiler::Name;

/// Errors that abort [composition][crate::SchemaComposer]
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error(transparent)]
    SchemaBuild(#[from] SchemaBuildError),
    #[error(transparent)]
    ResolverValidation(#[from] ResolverValidationError),
}

/// The merged type definitions do not form a consistent schema
#[derive(Debug, thiserror::Error)]
pub enum SchemaBuildError {
    #[error("could not parse type definitions from {source_name}:\n{errors}")]
    Parse {
        source_name: String,
        errors: DiagnosticList,
    },
    #[error("type `{type_name}` is defined as {existing} and as {incoming}")]
    IncompatibleKinds {
        type_name: Name,
        existing: &'static str,
        incoming: &'static str,
    },
    #[error("field `{type_name}.{field_name}` is defined as `{existing}` and as `{incoming}`")]
    FieldConflict {
        type_name: Name,
        field_name: Name,
        existing: String,
        incoming: String,
    },
    #[error("enum value `{type_name}.{value}` has conflicting definitions")]
    EnumValueConflict { type_name: Name, value: Name },
    #[error("invalid extra selection `{selection}` for `{type_name}`:\n{errors}")]
    ExtraSelection {
        type_name: Name,
        selection: String,
        errors: DiagnosticList,
    },
    #[error("merged schema is invalid:\n{0}")]
    Invalid(DiagnosticList),
}

/// A resolver map does not satisfy a required [validation level][crate::ValidationLevel]
#[derive(Debug, Clone, thiserror::Error)]
#[error("{type_name}{}: {message}", field_name.as_ref().map(|f| format!(".{f}")).unwrap_or_default())]
pub struct ResolverValidationError {
    pub type_name: Name,
    pub field_name: Option<Name>,
    pub message: String,
}
