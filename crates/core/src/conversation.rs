//! Conversation-related types.

use std::collections::VecDeque;

use plain_agent_model::ModelMessage;

/// An error returned when a message would break the ordering of the
/// conversation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A tool result arrived that doesn't answer the next pending tool call.
    #[error("tool result `{got}` does not answer the pending tool call {expected:?}")]
    UnexpectedToolResult {
        /// The tool call id that should be answered next, if any.
        expected: Option<String>,
        /// The tool call id carried by the rejected message.
        got: String,
    },
    /// A user or assistant message arrived while tool calls of the last
    /// assistant message were still unanswered.
    #[error("{pending} tool call(s) are still waiting for results")]
    ToolResultsPending {
        /// Number of unanswered tool calls.
        pending: usize,
    },
}

/// Represents a conversation.
///
/// Messages are append-only and kept in insertion order, which is exactly
/// the order they are replayed to the model. Every tool result must follow
/// the assistant message that requested it, answering its tool calls one by
/// one in the order they were requested.
#[derive(Clone, Default, Debug)]
pub struct Conversation {
    messages: Vec<ModelMessage>,
    pending_tool_calls: VecDeque<String>,
}

impl Conversation {
    /// Creates an empty conversation.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message, checking the tool call ordering.
    ///
    /// Rejected messages leave the conversation untouched.
    pub fn push(&mut self, msg: ModelMessage) -> Result<(), Error> {
        match &msg {
            ModelMessage::Tool { tool_call_id, .. } => {
                let expected = self.pending_tool_calls.front();
                if expected != Some(tool_call_id) {
                    return Err(Error::UnexpectedToolResult {
                        expected: expected.cloned(),
                        got: tool_call_id.clone(),
                    });
                }
                self.pending_tool_calls.pop_front();
            }
            ModelMessage::User { .. } | ModelMessage::Assistant { .. } => {
                if !self.pending_tool_calls.is_empty() {
                    return Err(Error::ToolResultsPending {
                        pending: self.pending_tool_calls.len(),
                    });
                }
                self.pending_tool_calls
                    .extend(msg.tool_calls().iter().map(|call| call.id.clone()));
            }
        }
        self.messages.push(msg);
        Ok(())
    }

    /// Answers every pending tool call with an "interrupted" result.
    ///
    /// This happens when a previous turn was cancelled while running
    /// tools. Returns the number of tool calls closed.
    pub fn interrupt_pending_tool_calls(&mut self) -> usize {
        let pending: Vec<_> = self.pending_tool_calls.drain(..).collect();
        for id in &pending {
            let content = format!("Error: Tool call {id} was interrupted.");
            self.messages.push(ModelMessage::tool(id.clone(), content));
        }
        pending.len()
    }

    /// Returns ids of the tool calls that are still waiting for results.
    #[inline]
    pub fn pending_tool_calls(&self) -> impl Iterator<Item = &str> {
        self.pending_tool_calls.iter().map(String::as_str)
    }

    /// Returns all messages in insertion order.
    #[inline]
    pub fn messages(&self) -> &[ModelMessage] {
        &self.messages
    }

    /// Returns the number of messages.
    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if no message has been added yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
