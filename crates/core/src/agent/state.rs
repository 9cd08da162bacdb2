use plain_agent_model::{ModelMessage, ModelRequest, ToolCallRequest};
use tracing::Instrument;

use super::{Agent, AgentError, EMPTY_RESPONSE_FALLBACK};

/// Where a single [`Agent::chat`] call currently is.
#[derive(Debug)]
enum TurnStage {
    /// The next step is calling the model.
    AwaitingModel,
    /// The model asked for these tools, which must run before calling the
    /// model again.
    RunningTools(Vec<ToolCallRequest>),
    /// The model answered without calling tools.
    Done(Option<String>),
}

impl Agent {
    /// Drives the turn state machine for one user input.
    pub(super) async fn run_turns(
        &mut self,
        input: String,
    ) -> Result<String, AgentError> {
        self.conversation.push(ModelMessage::user(input))?;

        let max_iterations = self.config.max_iterations();
        let mut iteration = 0;
        let mut stage = TurnStage::AwaitingModel;
        loop {
            stage = match stage {
                TurnStage::AwaitingModel => {
                    iteration += 1;
                    if iteration > max_iterations {
                        warn!("gave up after {max_iterations} model call(s)");
                        return Err(AgentError::IterationLimitExceeded {
                            max_iterations,
                        });
                    }
                    self.call_model()
                        .instrument(debug_span!("agent turn", iteration))
                        .await?
                }
                TurnStage::RunningTools(tool_calls) => {
                    self.run_tools(tool_calls).await?;
                    TurnStage::AwaitingModel
                }
                TurnStage::Done(content) => {
                    return Ok(content
                        .filter(|content| !content.is_empty())
                        .unwrap_or_else(|| {
                            EMPTY_RESPONSE_FALLBACK.to_owned()
                        }));
                }
            };
        }
    }

    async fn call_model(&mut self) -> Result<TurnStage, AgentError> {
        let request = ModelRequest {
            messages: self.conversation.messages().to_vec(),
            tools: self.tool_schemas.clone(),
            options: self.config.model_options(),
        };
        let on_transcript = self.on_transcript.clone();
        let resp = self
            .model_client
            .send_request(request, move |delta| {
                if let Some(on_transcript) = &on_transcript {
                    on_transcript(&delta);
                }
            })
            .await
            .map_err(AgentError::ModelCall)?;
        debug!(
            "model finished ({:?}) with {} tool call(s)",
            resp.finish_reason,
            resp.tool_calls.len()
        );

        let tool_calls = resp.tool_calls;
        self.conversation.push(ModelMessage::assistant(
            resp.content.clone(),
            tool_calls.clone(),
        ))?;

        if tool_calls.is_empty() {
            Ok(TurnStage::Done(resp.content))
        } else {
            Ok(TurnStage::RunningTools(tool_calls))
        }
    }

    async fn run_tools(
        &mut self,
        tool_calls: Vec<ToolCallRequest>,
    ) -> Result<(), AgentError> {
        for call in tool_calls {
            let result = self.tools.dispatch_call(&call).await;
            trace!("tool {} ({}) returned: {result}", call.name, call.id);
            self.conversation.push(ModelMessage::tool(call.id, result))?;
        }
        Ok(())
    }
}
