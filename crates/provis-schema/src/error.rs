use provis_types::TypeError;
use thiserror::Error;

/// Validation failures for a single field or requirement.
///
/// These are collected by [`crate::Item::validate`] rather than propagated,
/// so that every problem with an item can be reported at once.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// The field's value does not have the field's type.
    #[error("field '{field}' of kind '{kind}' does not have a valid value ({value})")]
    Invalid {
        field: String,
        kind: &'static str,
        value: String,
    },

    /// A required field was never given a value.
    #[error("field '{field}' of kind '{kind}' is required")]
    Required { field: String, kind: &'static str },

    #[error("field '{field}' contains a value ({value}) not in its list of choices")]
    InvalidChoice {
        field: String,
        value: String,
        choices: Vec<String>,
    },

    #[error("field '{field}' contains a value ({value}) which does not refer to a readable file")]
    FileNotFound { field: String, value: String },

    /// An item reference does not name an existing item of the target type.
    #[error("field '{field}' cannot find an item of type '{item_type}' named '{name}'")]
    InvalidReference {
        field: String,
        item_type: String,
        name: String,
    },

    /// A cross-field requirement failed.
    #[error("item of type {item_type} failed requirement ({requirement})")]
    Requirement {
        item_type: String,
        requirement: String,
    },
}

/// Errors raised while assigning to an item's fields.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FieldError {
    #[error("item type {item_type} has no field '{field}'")]
    UnknownField { item_type: String, field: String },

    #[error("field '{field}' of item type {item_type} is read-only")]
    ReadOnly { item_type: String, field: String },

    #[error("field '{field}': {source}")]
    Coercion {
        field: String,
        #[source]
        source: TypeError,
    },
}

/// Errors raised while declaring item schemas.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchemaError {
    /// A declared default cannot be coerced by its own field kind.
    #[error("field '{field}' has an invalid default: {source}")]
    InvalidDefault {
        field: String,
        #[source]
        source: TypeError,
    },

    /// A user field used one of the reserved identity names.
    #[error("field name '{field}' on {schema} is reserved")]
    ReservedField { schema: String, field: String },

    #[error("{schema} declares render parent '{field}' which is not a field")]
    UnknownParent { schema: String, field: String },

    #[error("{schema} declares render parent '{field}' which is not an item reference")]
    ParentNotAReference { schema: String, field: String },
}

/// Convenience alias for schema declaration results.
pub type Result<T> = std::result::Result<T, SchemaError>;
