use std::path::PathBuf;

use plain_agent_core::tool::{Registry as ToolRegistry, RegistryError};
use plain_agent_core::{Agent, AgentBuilder, AgentConfig, AgentError};
use plain_agent_model::ModelProvider;

use crate::tools::FileSystemToolset;

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder {
    agent_builder: AgentBuilder,
    root: PathBuf,
}

impl SessionBuilder {
    /// Creates a session builder with a specified model provider.
    pub fn with_model_provider<M: ModelProvider + 'static>(
        provider: M,
    ) -> Self {
        let agent_builder = AgentBuilder::with_model_provider(provider);
        Self {
            agent_builder,
            root: PathBuf::from("."),
        }
    }

    /// Sets the agent configuration.
    #[inline]
    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.agent_builder = self.agent_builder.with_config(config);
        self
    }

    /// Sets the directory that relative file paths are resolved against.
    ///
    /// Defaults to the current working directory.
    #[inline]
    pub fn with_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.root = root.into();
        self
    }

    /// Attaches a callback to be invoked when the model streams text.
    #[inline]
    pub fn on_transcript(
        mut self,
        on_transcript: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        self.agent_builder = self.agent_builder.on_transcript(on_transcript);
        self
    }

    /// Builds a new session with the file tools registered.
    pub fn build(self) -> Result<Session, RegistryError> {
        let mut tools = ToolRegistry::new();
        FileSystemToolset::new(self.root).register_into(&mut tools)?;

        let agent = self.agent_builder.with_tools(tools).build();
        Ok(Session { agent })
    }
}

/// A chat session, like a window that displays messages and has a input box.
///
/// The session holds a fully configured agent that you can use directly, and it
/// is basically a wrapper around [`Agent`].
pub struct Session {
    agent: Agent,
}

impl Session {
    /// Sends a message to the session and waits for the answer.
    #[inline]
    pub async fn chat(&mut self, message: &str) -> String {
        self.agent.chat(message).await
    }

    /// Like [`chat`](Session::chat), but keeps failures typed.
    #[inline]
    pub async fn send_message(
        &mut self,
        message: &str,
    ) -> Result<String, AgentError> {
        self.agent.send_message(message).await
    }

    /// Returns the underlying agent.
    #[inline]
    pub fn agent(&self) -> &Agent {
        &self.agent
    }
}
