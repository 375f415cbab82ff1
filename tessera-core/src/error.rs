use thiserror::Error;

/// Unified error type for configuration derivation.
///
/// Label problems never show up here: malformed or missing labels fall back
/// to their defaults. Only an unroutable instance or misuse of the accessor
/// table produces an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeriveError {
    #[error("Instance {instance:?} of service {service} has no network address")]
    MissingAddress { service: String, instance: String },

    #[error("Instance {instance:?} of service {service} has no port label and no port bindings")]
    MissingPort { service: String, instance: String },

    #[error("Accessor not found: {0}")]
    UnknownAccessor(String),

    #[error("Accessor {name} expects {expected} argument")]
    AccessorKind { name: String, expected: &'static str },

    #[error("Accessor {name} did not produce a {expected} value")]
    FieldType { name: String, expected: &'static str },
}

impl DeriveError {
    /// True for errors that leave an instance without a routing target.
    pub fn is_unroutable(&self) -> bool {
        matches!(
            self,
            DeriveError::MissingAddress { .. } | DeriveError::MissingPort { .. }
        )
    }

    /// Stable machine-readable code, used as a structured log field.
    pub fn code(&self) -> &'static str {
        match self {
            DeriveError::MissingAddress { .. } => "missing_address",
            DeriveError::MissingPort { .. } => "missing_port",
            DeriveError::UnknownAccessor(_) => "unknown_accessor",
            DeriveError::AccessorKind { .. } => "accessor_kind",
            DeriveError::FieldType { .. } => "field_type",
        }
    }
}
