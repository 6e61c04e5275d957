use thiserror::Error;

/// Errors produced by value operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TypeError {
    /// A value could not be converted to the representation a field needs.
    #[error("cannot coerce {value} ({found}) to {target}: {reason}")]
    Coercion {
        target: &'static str,
        found: &'static str,
        value: String,
        reason: String,
    },

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl TypeError {
    /// Build a coercion error for `value` that could not become `target`.
    pub fn coercion(
        target: &'static str,
        value: &crate::Value,
        reason: impl Into<String>,
    ) -> Self {
        Self::Coercion {
            target,
            found: value.kind_name(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}
