mod builder;
mod state;
#[cfg(test)]
mod tests;

use std::sync::Arc;

use plain_agent_model::{ModelProviderError, ModelTool};

use crate::config::AgentConfig;
use crate::conversation::{Conversation, Error as ConversationError};
use crate::model_client::ModelClient;
use crate::tool::Registry as ToolRegistry;
pub use builder::AgentBuilder;

/// A callback receiving the model's text as it streams.
pub(crate) type TranscriptCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Returned when the model finishes without any text.
const EMPTY_RESPONSE_FALLBACK: &str =
    "I apologize, but I couldn't generate a response.";

/// An agent instance, which maintains a conversation, a model client, and a
/// toolset.
///
/// Each call to [`chat`](Agent::chat) runs the model until it stops asking
/// for tools, or until the iteration budget of the configuration is used up.
/// The conversation carries over between calls.
///
/// Calls are strictly sequential: `chat` borrows the agent mutably, and tool
/// calls of one model response are executed one after another in the order
/// the model emitted them.
pub struct Agent {
    model_client: ModelClient,
    tools: ToolRegistry,
    tool_schemas: Vec<ModelTool>,
    conversation: Conversation,
    config: AgentConfig,
    on_transcript: Option<TranscriptCallback>,
}

/// An error that ends a [`chat`](Agent::chat) call early.
///
/// None of these errors discards the conversation: whatever has been
/// appended before the failure stays for the next call.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The model provider failed. The request is not retried.
    #[error("An error occurred during chat completion: {0}")]
    ModelCall(Box<dyn ModelProviderError>),
    /// The model kept calling tools until the iteration budget ran out.
    #[error("Maximum iterations reached. The conversation may be too complex.")]
    IterationLimitExceeded {
        /// The exhausted budget.
        max_iterations: usize,
    },
    /// A message was rejected by the conversation.
    #[error("Error: The conversation history is inconsistent: {0}")]
    Conversation(#[from] ConversationError),
}

impl Agent {
    /// Sends a user input and returns the final answer of the model.
    ///
    /// Failures are reported as the returned text as well; use
    /// [`send_message`](Agent::send_message) to tell them apart.
    pub async fn chat<S: Into<String>>(&mut self, input: S) -> String {
        match self.send_message(input).await {
            Ok(answer) => answer,
            Err(err) => err.to_string(),
        }
    }

    /// Sends a user input and returns the final answer of the model, or the
    /// reason why there is none.
    ///
    /// # Cancel safety
    ///
    /// Dropping the returned future leaves the conversation consistent:
    /// tool calls that were still waiting for results are closed as
    /// interrupted by the next call.
    pub async fn send_message<S: Into<String>>(
        &mut self,
        input: S,
    ) -> Result<String, AgentError> {
        let interrupted = self.conversation.interrupt_pending_tool_calls();
        if interrupted > 0 {
            warn!("closed {interrupted} tool call(s) left by a cancelled turn");
        }
        self.run_turns(input.into()).await
    }

    /// Returns the conversation so far.
    #[inline]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Returns the configuration.
    #[inline]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Returns the registered tools.
    #[inline]
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }
}

impl Agent {
    fn from_builder(builder: AgentBuilder) -> Self {
        let AgentBuilder {
            model_client,
            tools,
            config,
            on_transcript,
        } = builder;

        let tool_schemas = tools.schemas();
        Self {
            model_client,
            tools,
            tool_schemas,
            conversation: Default::default(),
            config,
            on_transcript,
        }
    }
}
