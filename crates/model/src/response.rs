use std::pin::Pin;
use std::task::{self, Poll};

use serde::{Deserialize, Serialize};

use crate::provider::ModelProviderError;

/// A streamed response from a model provider.
///
/// Text arrives as deltas, while each tool call arrives complete.
pub trait ModelResponse: Sized + Send + 'static {
    /// The error type that may be returned by the provider.
    type Error: ModelProviderError;

    /// Polls for the next streamed event.
    ///
    /// - `Poll::Pending`: no event yet; the waker in `cx` is registered.
    /// - `Poll::Ready(Ok(Some(event)))`: one event, more may follow.
    /// - `Poll::Ready(Ok(None))`: the stream is over, and stays over on
    ///   later calls.
    /// - `Poll::Ready(Err(error))`: the stream broke. Events already
    ///   delivered should not be trusted to form a complete response.
    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>>;
}

/// The reason why a model response has finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFinishReason {
    /// The model needs to call a tool.
    ToolCalls,
    /// The model has finished generating text.
    Stop,
}

/// Describes a tool call request from the model.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// The unique identifier for the tool call request.
    pub id: String,
    /// The name of the tool to call.
    pub name: String,
    /// The arguments as emitted by the model: a serialized JSON object
    /// that should match the tool's input schema.
    ///
    /// Models may produce malformed payloads, so this is kept verbatim and
    /// only parsed right before dispatch.
    pub arguments: String,
}

/// The event from a model response.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelResponseEvent {
    /// The response has been completed.
    Completed(ModelFinishReason),
    /// Received a message delta.
    MessageDelta(String),
    /// Received a tool call request.
    ToolCall(ToolCallRequest),
}
