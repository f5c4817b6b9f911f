//! OpenAI-compatible LLM provider.
//!
//! Both stages speak the OpenAI chat completions format: DeepSeek for
//! reasoning, OpenAI for finishing. Any endpoint following that format
//! (OpenRouter, vLLM, Ollama) works by pointing `base_url` at it.

use crate::brain::LlmProvider;
use crate::error::LlmError;
use crate::types::{
    CompletionRequest, CompletionResponse, Content, Message, ResponseFormat, Role, TokenUsage,
    ToolDefinition,
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::debug;

/// OpenAI-compatible LLM provider.
pub struct OpenAiCompatibleProvider {
    client: Client,
    provider: String,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiCompatibleProvider {
    /// Create a provider for `model` at `base_url`, authenticated with `api_key`.
    pub fn new(
        provider: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, LlmError> {
        let provider = provider.into();
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::AuthFailed { provider });
        }
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            client: Client::new(),
            provider,
            base_url,
            api_key,
            model: model.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Convert internal messages to OpenAI JSON format.
    fn messages_to_json(messages: &[Message]) -> Vec<Value> {
        messages
            .iter()
            .map(|msg| {
                json!({
                    "role": msg.role.to_string(),
                    "content": msg.content.as_text().unwrap_or_default(),
                })
            })
            .collect()
    }

    /// Convert tool definitions to OpenAI format.
    fn tools_to_json(tools: &[ToolDefinition]) -> Vec<Value> {
        tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    }
                })
            })
            .collect()
    }

    fn response_format_to_json(format: &ResponseFormat) -> Value {
        match format {
            ResponseFormat::JsonSchema {
                name,
                schema,
                strict,
            } => json!({
                "type": "json_schema",
                "json_schema": {
                    "name": name,
                    "schema": schema,
                    "strict": strict,
                }
            }),
        }
    }

    /// Build the `/chat/completions` request body.
    fn build_body(&self, request: &CompletionRequest) -> Value {
        let mut body = json!({
            "model": request.model.as_deref().unwrap_or(&self.model),
            "messages": Self::messages_to_json(&request.messages),
            "stream": false,
        });

        if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        }
        match request.stop_sequences.as_slice() {
            [] => {}
            [single] => body["stop"] = json!(single),
            many => body["stop"] = json!(many),
        }
        if let Some(tools) = &request.tools
            && !tools.is_empty()
        {
            body["tools"] = json!(Self::tools_to_json(tools));
            if let Some(choice) = request.tool_choice {
                body["tool_choice"] = json!(choice.as_str());
            }
        }
        if let Some(format) = &request.response_format {
            body["response_format"] = Self::response_format_to_json(format);
        }
        body
    }

    /// Parse an OpenAI-format response body into a CompletionResponse.
    ///
    /// A reply without choices, or a choice without a message, parses as
    /// empty text. Usage is read either way.
    fn parse_response(body: &Value, model: &str) -> Result<CompletionResponse, LlmError> {
        let choice = body.get("choices").and_then(|c| c.get(0));
        let message = choice.and_then(|c| c.get("message"));
        if message.is_none() {
            debug!("Response carried no message, treating as empty text");
        }

        let finish_reason = choice
            .and_then(|c| c.get("finish_reason"))
            .and_then(|f| f.as_str())
            .map(|s| s.to_string());

        let text = message
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .unwrap_or("");

        let calls: Vec<Content> = message
            .and_then(|m| m.get("tool_calls"))
            .and_then(|tc| tc.as_array())
            .map(|calls| {
                calls
                    .iter()
                    .filter_map(|tc| {
                        let id = tc.get("id").and_then(|i| i.as_str()).unwrap_or("");
                        let func = tc.get("function")?;
                        let name = func.get("name")?.as_str()?;
                        // Arguments normally arrive JSON-encoded; some servers send an object.
                        let arguments = match func.get("arguments") {
                            Some(Value::String(s)) => s.clone(),
                            Some(Value::Null) | None => String::new(),
                            Some(other) => other.to_string(),
                        };
                        Some(Content::tool_call(id, name, arguments))
                    })
                    .collect()
            })
            .unwrap_or_default();

        let content = match calls.len() {
            0 => Content::text(text),
            1 if text.is_empty() => calls.into_iter().next().unwrap_or_else(|| Content::text("")),
            _ => {
                let mut parts = Vec::with_capacity(calls.len() + 1);
                if !text.is_empty() {
                    parts.push(Content::text(text));
                }
                parts.extend(calls);
                Content::MultiPart { parts }
            }
        };

        let usage_obj = body.get("usage");
        let read_usage = |key: &str| {
            usage_obj
                .and_then(|u| u.get(key))
                .and_then(|t| t.as_u64())
                .unwrap_or(0)
        };
        let usage = TokenUsage {
            input_tokens: read_usage("prompt_tokens"),
            output_tokens: read_usage("completion_tokens"),
            total_tokens: read_usage("total_tokens"),
        };

        let resp_model = body
            .get("model")
            .and_then(|m| m.as_str())
            .unwrap_or(model)
            .to_string();

        Ok(CompletionResponse {
            message: Message::new(Role::Assistant, content),
            usage,
            model: resp_model,
            finish_reason,
        })
    }

    /// Map an HTTP status code to the appropriate LlmError.
    fn map_http_error(provider: &str, status: reqwest::StatusCode, body: &str) -> LlmError {
        match status.as_u16() {
            401 | 403 => {
                debug!(body = %body, "Authentication failed ({})", status);
                LlmError::AuthFailed {
                    provider: provider.to_string(),
                }
            }
            429 => {
                // Try to extract "try again in Xs" from the error message
                let retry_secs = serde_json::from_str::<Value>(body)
                    .ok()
                    .and_then(|v| {
                        v.get("error")?
                            .get("message")?
                            .as_str()
                            .map(|s| s.to_string())
                    })
                    .and_then(|msg| {
                        msg.split("in ")
                            .last()
                            .and_then(|s| s.trim_end_matches('s').parse::<u64>().ok())
                    })
                    .unwrap_or(5);
                LlmError::RateLimited {
                    retry_after_secs: retry_secs,
                }
            }
            status if status >= 500 => LlmError::ApiRequest {
                message: format!("Server error ({}): {}", status, body),
            },
            _ => LlmError::ApiRequest {
                message: format!("HTTP {}: {}", status, body),
            },
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_body(&request);

        debug!(url = %url, provider = %self.provider, model = %self.model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    LlmError::Connection {
                        message: e.to_string(),
                    }
                } else {
                    LlmError::ApiRequest {
                        message: format!("Request failed: {}", e),
                    }
                }
            })?;

        let status = response.status();
        let response_body = response.text().await.map_err(|e| LlmError::ApiRequest {
            message: format!("Failed to read response body: {}", e),
        })?;

        if !status.is_success() {
            return Err(Self::map_http_error(&self.provider, status, &response_body));
        }

        let json: Value =
            serde_json::from_str(&response_body).map_err(|e| LlmError::ResponseParse {
                message: format!("Invalid JSON: {}", e),
            })?;

        Self::parse_response(&json, &self.model)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        &self.provider
    }
}
