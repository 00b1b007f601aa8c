use beaver_kernel::ConfigurationError;

/// A `match` declaration that cannot be compiled.
#[derive(Debug, thiserror::Error)]
pub enum MatcherError {
    #[error(transparent)]
    Regex(#[from] regex::Error),

    /// `{operation}` always renders the operation name, so a capture group
    /// of that name could never be read.
    #[error("capture group `{0}` is reserved for the operation name")]
    ReservedGroup(String),
}

/// Failures loading a rulebook or turning it into live types.
#[derive(Debug, thiserror::Error)]
pub enum RulebookError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML rulebook: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON rulebook: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported rulebook format for {0} (expected .toml or .json)")]
    UnsupportedFormat(String),

    #[error("class `{0}` is declared more than once")]
    DuplicateClass(String),

    /// Parents must be declared before their subtypes.
    #[error("class `{class}` names unknown parent `{parent}`")]
    UnknownParent { class: String, parent: String },

    #[error("unknown class `{0}`")]
    UnknownClass(String),

    #[error("class `{class}` rule `{label}`: {source}")]
    InvalidRule {
        class: String,
        label: String,
        #[source]
        source: ConfigurationError,
    },

    #[error("class `{class}` operation `{operation}`: {reason}")]
    InvalidOperation {
        class: String,
        operation: String,
        reason: String,
    },
}
