use std::collections::HashMap;
use std::sync::Arc;

use plain_agent_model::{ModelTool, ToolCallRequest};
use serde_json::Value;
use tracing::Instrument;

use crate::tool::object::{ToolObject, ToolObjectImpl};
use crate::tool::{ErrorKind, Tool};

/// An error returned when registering a tool.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Another tool with the same name is already registered.
    #[error("tool `{0}` is already registered")]
    DuplicateToolName(String),
}

/// Why a tool call couldn't produce a result of its own.
///
/// The `Display` output is the text the model receives as the tool result.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// No tool is registered under the requested name.
    #[error("Error: Tool {name} is not recognized.")]
    UnknownTool {
        /// The requested tool name.
        name: String,
    },
    /// The arguments are not a JSON object matching the tool's input schema.
    #[error("Error: Invalid arguments for tool {name}: {reason}")]
    InvalidArguments {
        /// The requested tool name.
        name: String,
        /// What's wrong with the arguments.
        reason: String,
    },
    /// The tool failed while executing.
    #[error("Error: Error occurred while executing tool {name}.")]
    ExecutionFailed {
        /// The requested tool name.
        name: String,
    },
}

/// An object that manages the toolset and dispatches requests from the
/// model.
///
/// Tools are kept in registration order, so the schemas sent to the model
/// are deterministic.
#[derive(Default)]
pub struct Registry {
    tools: Vec<Arc<dyn ToolObject>>,
    index: HashMap<String, usize>,
}

impl Registry {
    /// Creates an empty registry.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool under its own name.
    pub fn register<T: Tool>(&mut self, tool: T) -> Result<(), RegistryError> {
        let name = tool.name().to_owned();
        if self.index.contains_key(&name) {
            return Err(RegistryError::DuplicateToolName(name));
        }
        debug!("registered tool: {name}");
        self.index.insert(name, self.tools.len());
        self.tools.push(Arc::new(ToolObjectImpl(tool)));
        Ok(())
    }

    /// Returns `true` if a tool with the given name is registered.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Returns the number of registered tools.
    #[inline]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` if no tool is registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Returns the definitions of all tools, in registration order.
    pub fn schemas(&self) -> Vec<ModelTool> {
        self.tools
            .iter()
            .map(|tool| ModelTool {
                name: tool.name().to_owned(),
                description: tool.description().to_owned(),
                input_schema: tool.input_schema().clone(),
            })
            .collect()
    }

    /// Runs the named tool with already parsed arguments.
    ///
    /// This never fails: errors are rendered into the returned text, which
    /// is meant to be fed back to the model.
    pub async fn dispatch(&self, name: &str, arguments: Value) -> String {
        self.try_dispatch(name, arguments)
            .await
            .unwrap_or_else(|err| err.to_string())
    }

    /// Runs a tool call request from the model, parsing its serialized
    /// arguments first.
    ///
    /// Like [`dispatch`](Self::dispatch), this never fails.
    pub async fn dispatch_call(&self, call: &ToolCallRequest) -> String {
        let span =
            debug_span!("tool dispatch", id = %call.id, tool = %call.name);
        async move {
            if !self.contains(&call.name) {
                warn!("tool not found: {}", call.name);
                return DispatchError::UnknownTool {
                    name: call.name.clone(),
                }
                .to_string();
            }
            let arguments = match parse_arguments(&call.arguments) {
                Ok(arguments) => arguments,
                Err(reason) => {
                    warn!("malformed arguments for {}: {reason}", call.name);
                    return DispatchError::InvalidArguments {
                        name: call.name.clone(),
                        reason,
                    }
                    .to_string();
                }
            };
            self.dispatch(&call.name, arguments).await
        }
        .instrument(span)
        .await
    }

    /// Runs the named tool, keeping the failure typed.
    pub async fn try_dispatch(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<String, DispatchError> {
        let Some(&idx) = self.index.get(name) else {
            warn!("tool not found: {name}");
            return Err(DispatchError::UnknownTool {
                name: name.to_owned(),
            });
        };
        let tool = Arc::clone(&self.tools[idx]);
        trace!("executing {name} with args: {arguments:?}");

        tool.execute(arguments).await.map_err(|err| {
            warn!("tool {name} failed: {err}");
            match err.kind() {
                ErrorKind::InvalidInput => DispatchError::InvalidArguments {
                    name: name.to_owned(),
                    reason: err.reason().into_owned(),
                },
                ErrorKind::ExecutionError => DispatchError::ExecutionFailed {
                    name: name.to_owned(),
                },
            }
        })
    }
}

fn parse_arguments(arguments: &str) -> Result<Value, String> {
    // Some models send an empty string for tools without parameters.
    if arguments.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    match serde_json::from_str::<Value>(arguments) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(_) => Err("arguments must be a JSON object".to_owned()),
        Err(err) => Err(err.to_string()),
    }
}
