//! # Reasonchain Core
//!
//! Core library for the Reasonchain question-answering pipeline.
//! Provides the LLM interface (brain) and OpenAI-compatible client, the
//! reasoning and finishing stages, the request orchestrator, the HTTP
//! gateway, configuration, and fundamental types.

pub mod brain;
pub mod config;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod gateway;
pub mod orchestrator;
pub mod providers;
pub mod stages;
pub mod types;
pub mod usage;

// Re-export commonly used types at the crate root.
pub use brain::{LlmProvider, MockLlmProvider};
pub use config::{Credentials, PipelineConfig, load_config};
pub use dispatch::{Finding, ToolDispatcher, ToolInvocation, ToolName, ToolResult};
pub use envelope::{
    ErrorEnvelope, FinishingMode, FinishingResult, Question, ReasoningResult, ResponseEnvelope,
    StructuredSummary, ToolOutcome, ToolStatus,
};
pub use error::{
    ClientError, ConfigError, DispatchError, LlmError, PipelineError, Stage,
    StageFailure, StageFailureKind, ToolError,
};
pub use orchestrator::Orchestrator;
pub use types::{
    CompletionRequest, CompletionResponse, Content, Message, Role, TokenUsage, ToolDefinition,
};
pub use usage::{Usage, UsageAccumulator};
