//! Conversation document types and response-message normalization.
//!
//! The on-disk JSON shapes (camelCase fields, kebab-case block tags) are a
//! compatibility contract with existing conversation files; do not rename
//! fields without a migration.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role of a message in the transcript.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The fixed system preamble.
    System,
    /// A message typed by the user.
    User,
    /// A model turn (text and/or tool calls).
    Assistant,
    /// A tool result fed back to the model.
    Tool,
}

/// One block of message content.
///
/// This is a closed union: any block tag outside this set coming back from a
/// provider is dropped during normalization and never enters the stored
/// transcript.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ContentBlock {
    /// Plain text.
    Text {
        /// The text content.
        text: String,
    },
    /// A model-issued request to invoke a tool.
    ToolCall {
        /// Provider-assigned call id, echoed back in the result.
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        /// Name of the requested tool.
        #[serde(rename = "toolName")]
        tool_name: String,
        /// Arguments as a JSON object.
        args: Value,
    },
    /// The outcome of a tool call.
    ToolResult {
        /// Id of the call this result answers.
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        /// Textual tool output.
        output: String,
    },
    /// An image reference.
    Image {
        /// Image URL or data reference.
        image: String,
    },
    /// A file reference.
    File {
        /// File URL or data reference.
        file: String,
    },
}

/// A single transcript message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who produced the message.
    pub role: Role,
    /// Ordered content blocks.
    pub content: Vec<ContentBlock>,
}

impl Message {
    /// Build a message holding a single text block.
    #[must_use]
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }

    /// Build a `tool` message carrying one tool result.
    #[must_use]
    pub fn tool_result(tool_call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: vec![ContentBlock::ToolResult {
                tool_call_id: tool_call_id.into(),
                output: output.into(),
            }],
        }
    }

    /// Concatenated text of all text blocks.
    #[must_use]
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for block in &self.content {
            if let ContentBlock::Text { text } = block {
                out.push_str(text);
            }
        }
        out
    }
}

/// Aggregate metadata for a conversation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationMetadata {
    /// Distinct tool names invoked over the conversation's lifetime.
    #[serde(rename = "toolsUsed")]
    pub tools_used: BTreeSet<String>,
    /// Total tokens consumed. Not yet computed; persisted as zero.
    #[serde(rename = "totalTokens")]
    pub total_tokens: u64,
    /// Total cost in USD. Not yet computed; persisted as zero.
    #[serde(rename = "totalCost")]
    pub total_cost: f64,
}

/// The durable transcript of one chat session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Stable unique id; immutable once assigned.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Creation timestamp.
    pub created: DateTime<Utc>,
    /// Last-activity timestamp; bumped on every completed chat.
    pub updated: DateTime<Utc>,
    /// Model identifier the conversation was started with.
    pub model: String,
    /// Append-only ordered transcript. `messages[0]` is the system preamble
    /// once the conversation is non-empty.
    pub messages: Vec<Message>,
    /// Aggregate metadata.
    pub metadata: ConversationMetadata,
}

impl Conversation {
    /// Construct a fresh, empty conversation.
    #[must_use]
    pub fn new(id: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: "New Conversation".to_string(),
            created: now,
            updated: now,
            model: String::new(),
            messages: Vec::new(),
            metadata: ConversationMetadata::default(),
        }
    }

    /// Projection used by the index.
    #[must_use]
    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            created: self.created,
            updated: self.updated,
            message_count: self.messages.len(),
        }
    }
}

/// Lightweight projection of a conversation for listing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    /// Conversation id.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Creation timestamp.
    pub created: DateTime<Utc>,
    /// Last-activity timestamp.
    pub updated: DateTime<Utc>,
    /// Number of messages in the transcript.
    #[serde(rename = "messageCount")]
    pub message_count: usize,
}

/// The persisted index of all known conversations.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationIndex {
    /// Summaries sorted by `updated` descending.
    pub conversations: Vec<ConversationSummary>,
}

/// Provider side-channel fields stripped from blocks before storage.
const PROVIDER_FIELDS: &[&str] = &["providerOptions", "providerMetadata", "providerExecuted"];

/// Normalize a raw provider message into a transcript [`Message`].
///
/// Keeps only blocks of the known variant set, strips provider-internal
/// fields, and drops anything else. Returns `None` when the role is missing
/// or nothing survives filtering.
#[must_use]
pub fn normalize_message(role: Role, raw_blocks: &[Value]) -> Option<Message> {
    let mut content = Vec::with_capacity(raw_blocks.len());
    for raw in raw_blocks {
        if let Some(block) = normalize_block(raw) {
            content.push(block);
        }
    }
    if content.is_empty() {
        return None;
    }
    Some(Message { role, content })
}

/// Normalize a single raw block, or drop it.
fn normalize_block(raw: &Value) -> Option<ContentBlock> {
    let mut cleaned = raw.clone();
    if let Some(map) = cleaned.as_object_mut() {
        for field in PROVIDER_FIELDS {
            map.remove(*field);
        }
    }
    serde_json::from_value(cleaned).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_block_tags_round_trip() {
        let blocks = vec![
            ContentBlock::Text { text: "hi".into() },
            ContentBlock::ToolCall {
                tool_call_id: "c1".into(),
                tool_name: "readFile".into(),
                args: json!({"fileName": "a.txt"}),
            },
            ContentBlock::ToolResult {
                tool_call_id: "c1".into(),
                output: "contents".into(),
            },
        ];
        let encoded = serde_json::to_value(&blocks).unwrap();
        assert_eq!(encoded[0]["type"], "text");
        assert_eq!(encoded[1]["type"], "tool-call");
        assert_eq!(encoded[2]["type"], "tool-result");
        let decoded: Vec<ContentBlock> = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, blocks);
    }

    #[test]
    fn test_normalize_drops_unknown_block_types() {
        let raw = vec![
            json!({"type": "text", "text": "keep me"}),
            json!({"type": "reasoning", "text": "drop me"}),
            json!({"type": "redacted-thinking", "data": "drop me too"}),
        ];
        let msg = normalize_message(Role::Assistant, &raw).unwrap();
        assert_eq!(msg.content.len(), 1);
        assert_eq!(msg.plain_text(), "keep me");
    }

    #[test]
    fn test_normalize_strips_provider_fields() {
        let raw = vec![json!({
            "type": "tool-call",
            "toolCallId": "c9",
            "toolName": "webSearch",
            "args": {"query": "rust"},
            "providerOptions": {"internal": true},
            "providerExecuted": false
        })];
        let msg = normalize_message(Role::Assistant, &raw).unwrap();
        let encoded = serde_json::to_value(&msg.content[0]).unwrap();
        assert!(encoded.get("providerOptions").is_none());
        assert!(encoded.get("providerExecuted").is_none());
        assert_eq!(encoded["toolName"], "webSearch");
    }

    #[test]
    fn test_normalize_empty_message_is_dropped() {
        let raw = vec![json!({"type": "reasoning", "text": "only unknown"})];
        assert!(normalize_message(Role::Assistant, &raw).is_none());
        assert!(normalize_message(Role::Assistant, &[]).is_none());
    }

    #[test]
    fn test_metadata_tools_used_has_set_semantics() {
        let mut meta = ConversationMetadata::default();
        meta.tools_used.insert("readFile".to_string());
        meta.tools_used.insert("readFile".to_string());
        meta.tools_used.insert("webSearch".to_string());
        assert_eq!(meta.tools_used.len(), 2);
    }

    #[test]
    fn test_conversation_document_field_names() {
        let conv = Conversation::new("conv_x".into(), Utc::now());
        let doc = serde_json::to_value(&conv).unwrap();
        assert!(doc["metadata"].get("toolsUsed").is_some());
        assert!(doc["metadata"].get("totalTokens").is_some());
        assert!(doc["metadata"].get("totalCost").is_some());
        let summary = serde_json::to_value(conv.summary()).unwrap();
        assert!(summary.get("messageCount").is_some());
    }
}
