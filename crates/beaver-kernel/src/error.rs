//! Error types for rule construction, synthesis, and dispatch.

/// Raised while building a [`Rule`](crate::Rule).
///
/// Not recoverable: the registering code is expected to fix the rule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    /// No matcher was supplied.
    #[error("matcher must be given")]
    MissingMatcher,

    /// Neither an implementation nor a specification producer was supplied.
    #[error("exactly one of implementation or specification producer must be given, got neither")]
    MissingProducer,

    /// Both an implementation and a specification producer were supplied.
    #[error("exactly one of implementation or specification producer must be given, got both")]
    ConflictingProducers,

    /// A declarative rule source produced something unusable.
    #[error("invalid rule `{label}`: {reason}")]
    Invalid { label: String, reason: String },
}

/// Raised when a matched rule cannot materialize an implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SynthesisError {
    #[error("invalid field name `{0}`")]
    InvalidFieldName(String),

    #[error("invalid operation name `{0}`")]
    InvalidOperationName(String),

    /// A delegate template that would call back into the operation it defines.
    #[error("operation `{0}` cannot delegate to itself")]
    SelfDelegation(String),

    #[error("sequence must contain at least one step")]
    EmptySequence,

    /// A template referenced a context slot nobody wrote.
    #[error("context slot `{0}` is unset")]
    UnsetSlot(String),

    /// Free-form failure reported by a specification producer.
    #[error("{0}")]
    Producer(String),
}

/// Errors surfacing from a call on an [`Instance`](crate::Instance).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// No static operation, no matching rule, and no fallback.
    ///
    /// Statically absent operations on types without rules report the same
    /// variant, so callers cannot tell the two apart.
    #[error("undefined operation `{operation}` for {type_name}")]
    Unresolved {
        operation: String,
        type_name: String,
    },

    /// A rule matched but its producer yielded an unusable specification.
    #[error("cannot synthesize `{operation}`: {source}")]
    Synthesis {
        operation: String,
        #[source]
        source: SynthesisError,
    },

    /// A domain error raised by an implementation.
    #[error("{operation}: {message}")]
    Raised { operation: String, message: String },

    /// Nested dispatch went deeper than the per-thread limit, typically
    /// through operations that delegate to each other.
    #[error("dispatch of `{operation}` exceeded the nesting limit of {limit}")]
    RecursionLimit { operation: String, limit: usize },
}

impl DispatchError {
    /// The operation the failing call was made for.
    pub fn operation(&self) -> &str {
        match self {
            DispatchError::Unresolved { operation, .. }
            | DispatchError::Synthesis { operation, .. }
            | DispatchError::Raised { operation, .. }
            | DispatchError::RecursionLimit { operation, .. } => operation,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, DispatchError::Unresolved { .. })
    }

    /// Convenience constructor for implementations raising domain errors.
    pub fn raised(operation: impl Into<String>, message: impl Into<String>) -> Self {
        DispatchError::Raised {
            operation: operation.into(),
            message: message.into(),
        }
    }
}
