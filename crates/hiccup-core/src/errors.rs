use hiccup_xpath::XPathError;
use thiserror::Error;

/// Result type alias using HiccupError
pub type Result<T> = std::result::Result<T, HiccupError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every condition the kernel can run into has a kind with a stable code.
/// `AccessFailure` and `InvalidTag` never reach the caller as errors; they
/// are recovered where they occur and reported as diagnostics, but carry
/// codes so that logs and diagnostic sinks use the same vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HiccupErrorKind {
    // Surfaced to the caller
    UnsupportedValue,
    AmbiguousResult,
    InvalidQuery,
    UnknownIdentity,
    HookFailed,
    CycleDetected,

    // Configuration
    InvalidPattern,
    InvalidConfig,

    // Recovered during projection
    AccessFailure,
    InvalidTag,
}

impl HiccupErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            HiccupErrorKind::UnsupportedValue => "ERR_UNSUPPORTED_VALUE",
            HiccupErrorKind::AmbiguousResult => "ERR_AMBIGUOUS_RESULT",
            HiccupErrorKind::InvalidQuery => "ERR_INVALID_QUERY",
            HiccupErrorKind::UnknownIdentity => "ERR_UNKNOWN_IDENTITY",
            HiccupErrorKind::HookFailed => "ERR_HOOK_FAILED",
            HiccupErrorKind::CycleDetected => "ERR_CYCLE_DETECTED",
            HiccupErrorKind::InvalidPattern => "ERR_INVALID_PATTERN",
            HiccupErrorKind::InvalidConfig => "ERR_INVALID_CONFIG",
            HiccupErrorKind::AccessFailure => "ERR_ACCESS_FAILURE",
            HiccupErrorKind::InvalidTag => "ERR_INVALID_TAG",
        }
    }

    /// Whether errors of this kind are recovered during projection instead
    /// of being returned
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            HiccupErrorKind::AccessFailure | HiccupErrorKind::InvalidTag
        )
    }
}

// ========== End Error Facility ==========

/// Errors returned by projection and querying
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HiccupError {
    /// A value was classified as primitive but no converter renders it
    #[error("Unsupported primitive value of type {type_name}")]
    UnsupportedValue { type_name: String },

    /// A single-result query matched zero or several nodes
    #[error("{query}: expected single result, got {count} instead")]
    AmbiguousResult { query: String, count: usize },

    /// The query engine rejected the query
    #[error("Invalid query {query:?}: {source}")]
    InvalidQuery {
        query: String,
        #[source]
        source: XPathError,
    },

    /// A matched node carries no identity token, or one the registry never issued
    #[error("Node <{tag}> has no resolvable identity (token: {token:?})")]
    UnknownIdentity { tag: String, token: Option<String> },

    /// The post-processing hook failed
    #[error("Tree hook failed: {message}")]
    HookFailed { message: String },

    /// An object was reached again below itself
    #[error("Cycle detected: object at {path} is one of its own ancestors")]
    CycleDetected { path: String },

    /// A name pattern for an exclusion predicate did not compile
    #[error("Invalid name pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl HiccupError {
    /// Get the canonical kind of this error
    pub fn kind(&self) -> HiccupErrorKind {
        match self {
            HiccupError::UnsupportedValue { .. } => HiccupErrorKind::UnsupportedValue,
            HiccupError::AmbiguousResult { .. } => HiccupErrorKind::AmbiguousResult,
            HiccupError::InvalidQuery { .. } => HiccupErrorKind::InvalidQuery,
            HiccupError::UnknownIdentity { .. } => HiccupErrorKind::UnknownIdentity,
            HiccupError::HookFailed { .. } => HiccupErrorKind::HookFailed,
            HiccupError::CycleDetected { .. } => HiccupErrorKind::CycleDetected,
            HiccupError::InvalidPattern { .. } => HiccupErrorKind::InvalidPattern,
            HiccupError::InvalidConfig { .. } => HiccupErrorKind::InvalidConfig,
        }
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind().code()
    }
}

impl From<toml::de::Error> for HiccupError {
    fn from(err: toml::de::Error) -> Self {
        HiccupError::InvalidConfig {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for HiccupError {
    fn from(err: serde_json::Error) -> Self {
        HiccupError::InvalidConfig {
            message: err.to_string(),
        }
    }
}
