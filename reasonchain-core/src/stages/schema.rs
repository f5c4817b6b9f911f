//! JSON schema for structured finishing output.

use crate::envelope::StructuredSummary;
use crate::error::{Stage, StageFailure, StageFailureKind};
use crate::types::ResponseFormat;
use serde_json::{Value, json};

pub const STRUCTURED_RESPONSE_NAME: &str = "structured_response";

pub fn structured_response_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "summary": {
                "type": "string",
                "description": "A one-sentence answer to the question"
            },
            "bullet_points": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Key points supporting the answer"
            },
            "reasoning_steps": {
                "type": "integer",
                "description": "Number of distinct reasoning steps in the transcript"
            },
            "follow_up_prompts": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Questions the user might ask next"
            }
        },
        "required": ["summary", "bullet_points", "reasoning_steps", "follow_up_prompts"],
        "additionalProperties": false
    })
}

pub fn structured_response_format() -> ResponseFormat {
    ResponseFormat::JsonSchema {
        name: STRUCTURED_RESPONSE_NAME.to_string(),
        schema: structured_response_schema(),
        strict: true,
    }
}

/// Parse the model's reply as exactly the structured schema.
pub fn parse_structured(text: &str) -> Result<StructuredSummary, StageFailure> {
    serde_json::from_str(text.trim()).map_err(|e| {
        StageFailure::new(
            Stage::Finishing,
            StageFailureKind::SchemaViolation,
            format!("structured output does not match schema: {}", e),
        )
    })
}
