//! Error types for the Reasonchain pipeline.
//!
//! Uses `thiserror` for public API error types. The taxonomy mirrors the
//! request lifecycle: client input, stage failures, tool dispatch, provider
//! transport, and startup configuration.

use serde::{Deserialize, Serialize};

/// Top-level error type for a single pipeline request.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    #[error("Stage failure: {0}")]
    Stage(#[from] StageFailure),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

impl PipelineError {
    /// Whether the caller is at fault. Client errors never reach a provider.
    pub fn is_client_error(&self) -> bool {
        matches!(self, PipelineError::Client(_))
    }
}

/// Errors caused by malformed or missing request input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("Question is required")]
    MissingQuestion,

    #[error("Invalid request body: {message}")]
    InvalidBody { message: String },
}

/// The remote-call phase a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Reasoning,
    Finishing,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Reasoning => write!(f, "reasoning"),
            Stage::Finishing => write!(f, "finishing"),
        }
    }
}

/// Why a stage failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StageFailureKind {
    /// Transport or provider-side error.
    Provider,
    /// The stage exceeded its configured timeout.
    Timeout,
    /// The caller went away before the stage finished.
    Cancelled,
    /// Structured output did not match the declared schema.
    SchemaViolation,
    /// Tool-call arguments could not be decoded.
    MalformedToolArgs,
}

impl std::fmt::Display for StageFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageFailureKind::Provider => write!(f, "provider"),
            StageFailureKind::Timeout => write!(f, "timeout"),
            StageFailureKind::Cancelled => write!(f, "cancelled"),
            StageFailureKind::SchemaViolation => write!(f, "schemaViolation"),
            StageFailureKind::MalformedToolArgs => write!(f, "malformedToolArgs"),
        }
    }
}

/// A remote call in one of the stages failed, timed out, or returned
/// unusable content.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{stage} stage failed ({kind}): {message}")]
pub struct StageFailure {
    pub stage: Stage,
    pub kind: StageFailureKind,
    pub message: String,
}

impl StageFailure {
    pub fn new(stage: Stage, kind: StageFailureKind, message: impl Into<String>) -> Self {
        Self {
            stage,
            kind,
            message: message.into(),
        }
    }

    /// Wrap a provider error as a `Provider` failure of the given stage.
    pub fn provider(stage: Stage, err: &LlmError) -> Self {
        Self::new(stage, StageFailureKind::Provider, err.to_string())
    }
}

/// Errors from executing a model-requested tool.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// The tool backend failed. Recoverable: the request degrades instead
    /// of failing.
    #[error("Tool '{name}' is unavailable: {message}")]
    ToolUnavailable { name: String, message: String },

    /// The model asked for a tool nobody registered. Always fatal.
    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("Invalid arguments for tool '{name}': {reason}")]
    InvalidArguments { name: String, reason: String },

    /// Two tools were registered under one name. Always fatal.
    #[error("Tool '{name}' is registered more than once")]
    RegistryConflict { name: String },
}

impl DispatchError {
    /// Only `ToolUnavailable` is swallowed by the finishing stage.
    pub fn is_soft(&self) -> bool {
        matches!(self, DispatchError::ToolUnavailable { .. })
    }
}

/// Errors from tool registration and execution.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Tool not found: {name}")]
    NotFound { name: String },

    #[error("Tool already registered: {name}")]
    AlreadyRegistered { name: String },

    #[error("Invalid arguments for tool '{name}': {reason}")]
    InvalidArguments { name: String, reason: String },

    #[error("Tool '{name}' backend unavailable: {message}")]
    Unavailable { name: String, message: String },

    #[error("Tool '{name}' timed out after {timeout_secs}s")]
    Timeout { name: String, timeout_secs: u64 },
}

impl From<ToolError> for DispatchError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::NotFound { name } => DispatchError::UnknownTool { name },
            ToolError::InvalidArguments { name, reason } => {
                DispatchError::InvalidArguments { name, reason }
            }
            ToolError::Unavailable { name, message } => {
                DispatchError::ToolUnavailable { name, message }
            }
            ToolError::Timeout { name, timeout_secs } => DispatchError::ToolUnavailable {
                name,
                message: format!("timed out after {}s", timeout_secs),
            },
            ToolError::AlreadyRegistered { name } => DispatchError::RegistryConflict { name },
        }
    }
}

/// Errors from LLM provider interactions.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Provider connection failed: {message}")]
    Connection { message: String },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Environment variable not set: {var}")]
    EnvVarMissing { var: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::ParseError {
            message: err.to_string(),
        }
    }
}
