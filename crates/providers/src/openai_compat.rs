//! OpenAI-compatible provider implementation.
//!
//! Works with: OpenAI, OpenRouter, Gemini (OpenAI-compatible endpoint),
//! Ollama, and any other `/chat/completions` endpoint.
//!
//! Translation rules:
//! - `Model` messages become `assistant` messages with their tool calls
//! - `System` notices become `user` messages
//! - each tool response becomes one `tool` message tagged with its call id,
//!   unless the matching call is not part of the sent slice, in which case it
//!   is sent as plain `user` text

use async_trait::async_trait;
use quill_core::error::ProviderError;
use quill_core::message::{Message, MessageBody, synthesize_call_id};
use quill_core::provider::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Gemini harm categories disabled for creative writing.
const GEMINI_HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// An OpenAI-compatible LLM provider.
///
/// This handles the vast majority of LLM providers since most expose
/// an OpenAI-compatible `/v1/chat/completions` endpoint.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Create an OpenRouter provider (convenience constructor).
    pub fn openrouter(api_key: impl Into<String>) -> Self {
        Self::new("openrouter", "https://openrouter.ai/api/v1", api_key)
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    /// Create a Gemini provider on Google's OpenAI-compatible endpoint.
    pub fn gemini(api_key: impl Into<String>) -> Self {
        Self::new(
            "gemini",
            "https://generativelanguage.googleapis.com/v1beta/openai",
            api_key,
        )
    }

    /// Create an Ollama provider (convenience constructor).
    pub fn ollama(base_url: Option<&str>) -> Self {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama", // Ollama doesn't need a real key
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Convert the system instruction and history to OpenAI API format.
    fn to_api_messages(system_instruction: &str, messages: &[Message]) -> Vec<ApiMessage> {
        let mut out = Vec::with_capacity(messages.len() + 1);
        if !system_instruction.trim().is_empty() {
            out.push(ApiMessage::text("system", system_instruction));
        }

        // Call ids declared by assistant messages so far in this slice
        let mut declared: HashSet<String> = HashSet::new();
        // Ids synthesized for calls that arrived without one, in call order
        let mut synthesized: VecDeque<String> = VecDeque::new();

        for message in messages {
            match &message.body {
                MessageBody::User { text } => out.push(ApiMessage::text("user", text)),
                MessageBody::System { text, .. } => out.push(ApiMessage::text("user", text)),
                MessageBody::Model { text, tool_calls } => {
                    synthesized.clear();
                    let calls: Vec<ApiToolCall> = tool_calls
                        .iter()
                        .map(|tc| {
                            let id = if tc.id.is_empty() {
                                let id = synthesize_call_id();
                                synthesized.push_back(id.clone());
                                id
                            } else {
                                tc.id.clone()
                            };
                            declared.insert(id.clone());
                            ApiToolCall {
                                id,
                                r#type: "function".into(),
                                function: ApiFunction {
                                    name: tc.name.clone(),
                                    arguments: serde_json::to_string(&tc.args)
                                        .unwrap_or_else(|_| "{}".into()),
                                },
                            }
                        })
                        .collect();

                    let content = match (text, calls.is_empty()) {
                        (Some(t), _) => Some(t.clone()),
                        (None, true) => Some(String::new()),
                        (None, false) => None,
                    };
                    out.push(ApiMessage {
                        role: "assistant".into(),
                        content,
                        tool_calls: (!calls.is_empty()).then_some(calls),
                        tool_call_id: None,
                    });
                }
                MessageBody::ToolResponses { responses } => {
                    for response in responses {
                        let call_id = if response.call_id.is_empty() {
                            synthesized.pop_front().unwrap_or_default()
                        } else {
                            response.call_id.clone()
                        };
                        if !call_id.is_empty() && declared.contains(&call_id) {
                            out.push(ApiMessage {
                                role: "tool".into(),
                                content: Some(response.output.clone()),
                                tool_calls: None,
                                tool_call_id: Some(call_id),
                            });
                        } else {
                            trace!(call_id = %call_id, "Rendering orphan tool response as user text");
                            out.push(ApiMessage::text(
                                "user",
                                &format!("[tool result {}] {}", response.name, response.output),
                            ));
                        }
                    }
                }
            }
        }
        out
    }

    /// Convert tool definitions to OpenAI API format.
    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    /// Build the JSON request body.
    fn build_body(request: &ProviderRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.system_instruction, &request.messages),
            "temperature": request.temperature,
            "stream": false,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
            body["tool_choice"] = match &request.tool_choice {
                ToolChoice::Auto => serde_json::json!("auto"),
                ToolChoice::Function(name) => serde_json::json!({
                    "type": "function",
                    "function": { "name": name }
                }),
            };
        }

        if is_gemini_model(&request.model) {
            body["safety_settings"] = serde_json::json!(
                GEMINI_HARM_CATEGORIES
                    .iter()
                    .map(|c| serde_json::json!({ "category": c, "threshold": "BLOCK_NONE" }))
                    .collect::<Vec<_>>()
            );
        }

        body
    }
}

/// Whether `model` belongs to the Gemini family.
pub fn is_gemini_model(model: &str) -> bool {
    model.to_ascii_lowercase().contains("gemini")
}

/// Map a non-success HTTP status and body to a provider error.
pub(crate) fn map_status(status: u16, retry_after: Option<u64>, body: &str) -> ProviderError {
    let lower = body.to_ascii_lowercase();
    if status == 429 {
        return ProviderError::RateLimited {
            retry_after_secs: retry_after.unwrap_or(0),
        };
    }
    if status == 401
        || status == 403
        || lower.contains("invalid api key")
        || lower.contains("api key not valid")
        || lower.contains("incorrect api key")
        || lower.contains("invalid_api_key")
    {
        return ProviderError::AuthenticationFailed(
            extract_error_message(body)
                .unwrap_or_else(|| "Invalid API key or insufficient permissions".into()),
        );
    }
    ProviderError::ApiError {
        status_code: status,
        message: extract_error_message(body).unwrap_or_else(|| body.to_string()),
    }
}

/// Pull `error.message` out of an OpenAI-style error body.
fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let error = match &value {
        serde_json::Value::Array(items) => items.first()?.get("error")?,
        other => other.get("error")?,
    };
    error
        .get("message")
        .and_then(|m| m.as_str())
        .map(String::from)
        .or_else(|| error.as_str().map(String::from))
}

/// Parse tool-call arguments. Malformed JSON is kept as `{"_raw": ...}`.
fn parse_arguments(raw: &str) -> serde_json::Value {
    if raw.trim().is_empty() {
        return serde_json::json!({});
    }
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(value @ serde_json::Value::Object(_)) => value,
        Ok(other) => serde_json::json!({ "_raw": other.to_string() }),
        Err(_) => serde_json::json!({ "_raw": raw }),
    }
}

/// Translate a raw 2xx body into a provider response.
pub(crate) fn parse_response(
    body: &str,
    requested_model: &str,
) -> Result<ProviderResponse, ProviderError> {
    let api_response: ApiResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::Parse(format!("Failed to parse response: {e}")))?;

    // Some gateways report upstream failures inside a 200 body
    if let Some(error) = api_response.error {
        let status = error
            .code
            .as_ref()
            .and_then(|c| c.as_u64())
            .and_then(|c| u16::try_from(c).ok())
            .unwrap_or(502);
        let message = error.message.unwrap_or_else(|| "upstream error".into());
        return Err(map_status(status, None, &message));
    }

    let candidates: Vec<Candidate> = api_response
        .choices
        .into_iter()
        .map(|choice| {
            let tool_calls = choice
                .message
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .map(|tc| quill_core::ToolCallRequest {
                    id: if tc.id.trim().is_empty() {
                        synthesize_call_id()
                    } else {
                        tc.id
                    },
                    name: tc.function.name,
                    args: parse_arguments(&tc.function.arguments),
                })
                .collect();
            Candidate {
                text: choice.message.content.filter(|t| !t.trim().is_empty()),
                tool_calls,
                finish_reason: choice.finish_reason.as_deref().map(FinishReason::from_wire),
            }
        })
        .collect();

    if let Some(first) = candidates.first() {
        if first.finish_reason == Some(FinishReason::ContentFilter) && first.tool_calls.is_empty() {
            return Err(ProviderError::ContentFiltered(
                "The provider's safety filter blocked the response".into(),
            ));
        }
    }

    let usage = api_response.usage.map(|u| Usage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    });

    Ok(ProviderResponse {
        metadata: ResponseMetadata {
            model: api_response
                .model
                .unwrap_or_else(|| requested_model.to_string()),
            finish_reason: candidates.first().and_then(|c| c.finish_reason),
            usage,
            duration_ms: 0,
            attempts: 1,
        },
        candidates,
    })
}

#[async_trait]
impl quill_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::build_body(&request);
        let started = Instant::now();

        debug!(
            provider = %self.name,
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !(200..300).contains(&status) {
            warn!(status, body = %text, "Provider returned error");
            return Err(map_status(status, retry_after, &text));
        }

        let mut parsed = parse_response(&text, &request.model)?;
        parsed.metadata.duration_ms = started.elapsed().as_millis() as u64;
        trace!(
            provider = %self.name,
            finish_reason = ?parsed.metadata.finish_reason,
            duration_ms = parsed.metadata.duration_ms,
            "Completion received"
        );
        Ok(parsed)
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl ApiMessage {
    fn text(role: &str, content: &str) -> Self {
        Self {
            role: role.into(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    #[serde(default)]
    id: String,
    #[serde(default = "default_call_type")]
    r#type: String,
    function: ApiFunction,
}

fn default_call_type() -> String {
    "function".into()
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
}
