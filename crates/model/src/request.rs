use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ToolCallRequest;

/// A request to be sent to the model provider.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelRequest {
    /// The input messages, in the order they were exchanged.
    pub messages: Vec<ModelMessage>,
    /// Tools that are available to the model.
    pub tools: Vec<ModelTool>,
    /// Sampling options for this request.
    pub options: ModelOptions,
}

/// Sampling options forwarded to the provider with every request.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelOptions {
    /// Identifier of the model to sample from.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Upper bound of tokens the model may generate for one response.
    pub max_output_tokens: u32,
}

/// The author of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// The human side of the conversation.
    User,
    /// The model.
    Assistant,
    /// A tool call result.
    Tool,
}

/// A complete message.
///
/// The serialized form is the wire shape replayed to models: a `role` tag
/// with `content`, plus `tool_calls` for assistant messages and
/// `tool_call_id` for tool messages.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ModelMessage {
    /// A user input text.
    User {
        /// The text the user typed.
        content: String,
    },
    /// A message generated by the model.
    Assistant {
        /// The text, absent when the model only requested tool calls.
        content: Option<String>,
        /// Tool calls requested by the model, in the order it emitted them.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCallRequest>,
    },
    /// A tool call result.
    Tool {
        /// The identifier of the tool call request this message answers.
        tool_call_id: String,
        /// The result of the tool call.
        content: String,
    },
}

impl ModelMessage {
    /// Creates a user message.
    #[inline]
    pub fn user<S: Into<String>>(content: S) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    /// Creates an assistant message.
    #[inline]
    pub fn assistant(
        content: Option<String>,
        tool_calls: Vec<ToolCallRequest>,
    ) -> Self {
        Self::Assistant {
            content,
            tool_calls,
        }
    }

    /// Creates a tool result message.
    #[inline]
    pub fn tool<ID: Into<String>, S: Into<String>>(
        tool_call_id: ID,
        content: S,
    ) -> Self {
        Self::Tool {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
        }
    }

    /// Returns the author of this message.
    #[inline]
    pub fn role(&self) -> Role {
        match self {
            Self::User { .. } => Role::User,
            Self::Assistant { .. } => Role::Assistant,
            Self::Tool { .. } => Role::Tool,
        }
    }

    /// Returns the text content of this message, if any.
    #[inline]
    pub fn content(&self) -> Option<&str> {
        match self {
            Self::User { content } | Self::Tool { content, .. } => {
                Some(content)
            }
            Self::Assistant { content, .. } => content.as_deref(),
        }
    }

    /// Returns the tool calls carried by an assistant message.
    ///
    /// The slice is empty for any other role.
    #[inline]
    pub fn tool_calls(&self) -> &[ToolCallRequest] {
        match self {
            Self::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }
}

/// Describes a tool that can be used by the model.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ModelTool {
    /// Name of the tool.
    pub name: String,
    /// Description of the tool.
    pub description: String,
    /// Input definition of the tool.
    ///
    /// For most model providers, the input should typically be defined by
    /// a [JSON schema](https://json-schema.org/) object.
    pub input_schema: Value,
}
