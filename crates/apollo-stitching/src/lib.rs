#![doc = include_str!("../README.md")]

mod collect;
mod compose;
mod context;
mod delegate;
mod error;
mod extensions;
mod handle_object;
mod logger;
mod merge_fields;
mod resolvers;
mod response;
mod result;
mod stitching_info;
mod subschema;
mod typedefs;
mod validation;

pub use self::collect::collect_fields;
pub use self::collect::collect_sub_fields;
pub use self::collect::GroupedFields;
pub use self::compose::SchemaComposer;
pub use self::compose::SchemaDirectiveVisitor;
pub use self::compose::StitchedSchema;
pub use self::context::RequestContext;
pub use self::delegate::delegator_fn;
pub use self::delegate::DelegationError;
pub use self::delegate::DelegationRequest;
pub use self::delegate::Delegator;
pub use self::error::ComposeError;
pub use self::error::ResolverValidationError;
pub use self::error::SchemaBuildError;
pub use self::extensions::deep_merge;
pub use self::extensions::merge_extensions;
pub use self::extensions::FieldExtensions;
pub use self::extensions::SchemaExtensions;
pub use self::extensions::TypeExtensions;
pub use self::handle_object::handle_object;
pub use self::logger::Logger;
pub use self::logger::TracingLogger;
pub use self::merge_fields::merge_fields;
pub use self::merge_fields::DELEGATION_FAILED;
pub use self::resolvers::merge_resolvers;
pub use self::resolvers::FieldResolver;
pub use self::resolvers::ResolveInfo;
pub use self::resolvers::ResolverError;
pub use self::resolvers::ResolverMergeOptions;
pub use self::resolvers::Resolvers;
pub use self::resolvers::RESOLVE_TYPE;
pub use self::response::GraphQLError;
pub use self::response::Location;
pub use self::response::PathElement;
pub use self::response::EXTENSION_CODE;
pub use self::response::EXTENSION_SUBSCHEMA;
pub use self::result::CompositeType;
pub use self::result::ResultObject;
pub use self::result::TYPENAME;
pub use self::stitching_info::MergedTypeInfo;
pub use self::stitching_info::SelectionSetsByField;
pub use self::stitching_info::StitchingInfo;
pub use self::subschema::MergedTypeConfig;
pub use self::subschema::Subschema;
pub use self::subschema::SubschemaRef;
pub use self::typedefs::merge_type_defs;
pub use self::typedefs::parse_type_defs;
pub use self::typedefs::ConflictHandler;
pub use self::typedefs::ConflictResolution;
pub use self::typedefs::FieldConflict;
pub use self::typedefs::TypeMergeOptions;
pub use self::validation::ResolverValidationOptions;
pub use self::validation::ValidationLevel;
pub use serde_json_bytes::ByteString;
pub use serde_json_bytes::Value as JsonValue;

/// Represents a JSON object
pub type JsonMap = serde_json_bytes::Map<ByteString, JsonValue>;
