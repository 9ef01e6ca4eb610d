//! OpenRouter chat-completions client with SSE streaming.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::agent::error::{AgentError, AgentResult};
use crate::storage::{ContentBlock, Message, Role};

use super::{ModelProvider, ModelRequest, ModelTurn, RawMessage, ToolInvocation};

const API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Streaming chat-completions provider backed by OpenRouter.
#[derive(Debug)]
pub struct OpenRouterProvider {
    client: reqwest::Client,
    api_key: String,
}

impl OpenRouterProvider {
    /// Build a provider with the given API key.
    ///
    /// # Errors
    /// [`AgentError::Provider`] if the HTTP client cannot be constructed.
    pub fn new(api_key: impl Into<String>) -> AgentResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| AgentError::Provider(format!("http client: {err}")))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
        })
    }

    fn request_body(request: &ModelRequest<'_>) -> Value {
        json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "stream": true,
            "messages": request.messages.iter().map(wire_message).collect::<Vec<_>>(),
            "tools": request.tools.iter().map(|schema| json!({
                "type": "function",
                "function": schema,
            })).collect::<Vec<_>>(),
        })
    }
}

#[async_trait]
impl ModelProvider for OpenRouterProvider {
    async fn stream_turn(
        &self,
        request: ModelRequest<'_>,
        deltas: mpsc::UnboundedSender<String>,
    ) -> AgentResult<ModelTurn> {
        let body = Self::request_body(&request);
        debug!(model = request.model, messages = request.messages.len(), "model round-trip");

        let response = self
            .client
            .post(API_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let detail = response.text().await.unwrap_or_default();
            return Err(AgentError::Authentication(format!("{status}: {detail}")));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AgentError::Provider(format!("{status}: {detail}")));
        }

        let mut accumulator = TurnAccumulator::default();
        let mut stream = response.bytes_stream();
        let mut buffer = String::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(classify_transport_error)?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            // SSE frames are newline-delimited; keep the trailing partial
            // line in the buffer for the next chunk.
            while let Some(newline) = buffer.find('\n') {
                let line = buffer[..newline].trim().to_string();
                buffer.drain(..=newline);
                accumulator.feed_line(&line, &deltas);
            }
        }

        Ok(accumulator.finish())
    }
}

/// Streamed tool-call fragments keyed by choice index.
#[derive(Debug, Default)]
struct PartialToolCall {
    call_id: Option<String>,
    tool_name: String,
    arguments: String,
}

/// Accumulates SSE frames into a [`ModelTurn`].
#[derive(Debug, Default)]
struct TurnAccumulator {
    text: String,
    tool_calls: BTreeMap<u32, PartialToolCall>,
    done: bool,
}

#[derive(Debug, Deserialize)]
struct StreamFrame {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<StreamToolCall>,
}

#[derive(Debug, Deserialize)]
struct StreamToolCall {
    #[serde(default)]
    index: u32,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: StreamFunction,
}

#[derive(Debug, Default, Deserialize)]
struct StreamFunction {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

impl TurnAccumulator {
    fn feed_line(&mut self, line: &str, deltas: &mpsc::UnboundedSender<String>) {
        let Some(payload) = line.strip_prefix("data:").map(str::trim) else {
            return;
        };
        if payload == "[DONE]" {
            self.done = true;
            return;
        }
        let frame: StreamFrame = match serde_json::from_str(payload) {
            Ok(frame) => frame,
            Err(err) => {
                trace!(%err, "skipping unparseable stream frame");
                return;
            }
        };
        for choice in frame.choices {
            if let Some(content) = choice.delta.content {
                if !content.is_empty() {
                    self.text.push_str(&content);
                    // A consumer that went away must not fail the stream.
                    let _ = deltas.send(content);
                }
            }
            for call in choice.delta.tool_calls {
                let partial = self.tool_calls.entry(call.index).or_default();
                if let Some(id) = call.id {
                    partial.call_id = Some(id);
                }
                if let Some(name) = call.function.name {
                    partial.tool_name.push_str(&name);
                }
                if let Some(arguments) = call.function.arguments {
                    partial.arguments.push_str(&arguments);
                }
            }
        }
    }

    fn finish(self) -> ModelTurn {
        if !self.done {
            warn!("stream ended without a [DONE] frame");
        }
        let tool_calls: Vec<ToolInvocation> = self
            .tool_calls
            .into_values()
            .filter(|partial| !partial.tool_name.is_empty())
            .map(|partial| {
                let args = if partial.arguments.trim().is_empty() {
                    json!({})
                } else {
                    serde_json::from_str(&partial.arguments).unwrap_or_else(|err| {
                        warn!(%err, tool = partial.tool_name, "tool arguments unparseable");
                        json!({})
                    })
                };
                ToolInvocation {
                    call_id: partial
                        .call_id
                        .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4())),
                    tool_name: partial.tool_name,
                    args,
                }
            })
            .collect();

        let mut blocks = Vec::new();
        if !self.text.is_empty() {
            blocks.push(json!({"type": "text", "text": self.text}));
        }
        for call in &tool_calls {
            blocks.push(json!({
                "type": "tool-call",
                "toolCallId": call.call_id,
                "toolName": call.tool_name,
                "args": call.args,
            }));
        }
        let messages = if blocks.is_empty() {
            Vec::new()
        } else {
            vec![RawMessage {
                role: Role::Assistant,
                blocks,
            }]
        };

        ModelTurn {
            text: self.text,
            tool_calls,
            messages,
        }
    }
}

/// Convert one transcript message into the chat-completions wire shape.
fn wire_message(message: &Message) -> Value {
    match message.role {
        Role::System => json!({"role": "system", "content": message.plain_text()}),
        Role::User => json!({"role": "user", "content": message.plain_text()}),
        Role::Assistant => {
            let mut tool_calls = Vec::new();
            for block in &message.content {
                if let ContentBlock::ToolCall {
                    tool_call_id,
                    tool_name,
                    args,
                } = block
                {
                    tool_calls.push(json!({
                        "id": tool_call_id,
                        "type": "function",
                        "function": {
                            "name": tool_name,
                            "arguments": args.to_string(),
                        },
                    }));
                }
            }
            let mut wire = json!({"role": "assistant", "content": message.plain_text()});
            if !tool_calls.is_empty() {
                wire["tool_calls"] = Value::Array(tool_calls);
            }
            wire
        }
        Role::Tool => {
            // One wire message per result; the loop stores one result per
            // transcript message, so taking the first block is exact.
            match message.content.first() {
                Some(ContentBlock::ToolResult {
                    tool_call_id,
                    output,
                }) => json!({
                    "role": "tool",
                    "tool_call_id": tool_call_id,
                    "content": output,
                }),
                _ => json!({"role": "tool", "content": message.plain_text()}),
            }
        }
    }
}

fn classify_transport_error(err: reqwest::Error) -> AgentError {
    if err.is_timeout() {
        AgentError::Timeout(err.to_string())
    } else if err.is_connect() || err.is_request() {
        AgentError::Network(err.to_string())
    } else {
        AgentError::Provider(err.to_string())
    }
}
