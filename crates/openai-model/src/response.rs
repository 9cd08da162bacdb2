use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use plain_agent_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
    ToolCallRequest,
};
use pin_project_lite::pin_project;

use crate::Error;
use crate::io::{Sse, SseError};
use crate::proto::{ChatCompletionChunk, ToolCall};

/// A tool call being assembled from streamed fragments.
#[derive(Debug, Default)]
struct PartialToolCall {
    index: u32,
    id: String,
    name: String,
    arguments: String,
}

impl PartialToolCall {
    fn patch(&mut self, fragment: ToolCall) {
        if let Some(id) = fragment.id {
            self.id.push_str(&id);
        }
        if let Some(function) = fragment.function {
            if let Some(name) = function.name {
                self.name.push_str(&name);
            }
            if let Some(arguments) = function.arguments {
                self.arguments.push_str(&arguments);
            }
        }
    }
}

struct PartialState {
    sse: Sse,
    id: Option<String>,
    tool_calls: Vec<PartialToolCall>,
    // Events decoded from a chunk but not yet handed out.
    pending_events: VecDeque<ModelResponseEvent>,
    finished: bool,
}

impl PartialState {
    // Tool calls are only emitted once the choice finishes, since their
    // arguments are incomplete before that.
    fn flush_tool_calls(&mut self) {
        self.tool_calls.sort_by_key(|tool_call| tool_call.index);
        for tool_call in self.tool_calls.drain(..) {
            self.pending_events.push_back(ModelResponseEvent::ToolCall(
                ToolCallRequest {
                    id: tool_call.id,
                    name: tool_call.name,
                    arguments: tool_call.arguments,
                },
            ));
        }
    }

    fn merge_fragment(&mut self, fragment: ToolCall) {
        // Some servers leave out the index. A fragment without an id then
        // continues the call before it, and one with an id starts a new call.
        let index = match fragment.index {
            Some(index) => index,
            None if fragment.id.is_none() => match self.tool_calls.last_mut() {
                Some(partial) => return partial.patch(fragment),
                None => 0,
            },
            None => self.tool_calls.len() as u32,
        };
        match self.tool_calls.iter_mut().find(|t| t.index == index) {
            Some(partial) => partial.patch(fragment),
            None => {
                let mut partial = PartialToolCall {
                    index,
                    ..Default::default()
                };
                partial.patch(fragment);
                self.tool_calls.push(partial);
            }
        }
    }

    fn apply_chunk(
        &mut self,
        mut chunk: ChatCompletionChunk,
    ) -> Result<(), Error> {
        if self.id.get_or_insert_with(|| chunk.id.clone()) != &chunk.id {
            return Err(Error::new("chunk id mismatch", ErrorKind::Other));
        }

        // Only one choice is requested. Chunks without choices (usage
        // reports, for example) carry nothing for us.
        let Some(choice) = chunk.choices.pop() else {
            return Ok(());
        };

        if let Some(content) = choice.delta.content {
            if !content.is_empty() {
                self.pending_events
                    .push_back(ModelResponseEvent::MessageDelta(content));
            }
        }
        for fragment in choice.delta.tool_calls.into_iter().flatten() {
            self.merge_fragment(fragment);
        }

        if let Some(finish_reason) = choice.finish_reason {
            let finish_reason = match finish_reason.as_str() {
                "tool_calls" => ModelFinishReason::ToolCalls,
                "content_filter" => {
                    return Err(Error::new(
                        "the response was blocked by the content filter",
                        ErrorKind::Moderated,
                    ));
                }
                _ => ModelFinishReason::Stop,
            };
            self.flush_tool_calls();
            self.pending_events
                .push_back(ModelResponseEvent::Completed(finish_reason));
            self.finished = true;
        }
        Ok(())
    }
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(Option<ModelResponseEvent>, PartialState), Error>;

pin_project! {
    /// A streamed chat completion.
    pub struct OpenAIResponse {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
    }
}

impl OpenAIResponse {
    #[inline]
    pub(crate) fn from_sse(sse: Sse) -> Self {
        let partial_state = PartialState {
            sse,
            id: None,
            tool_calls: Default::default(),
            pending_events: Default::default(),
            finished: false,
        };
        Self {
            next_event_fut: Some(Box::pin(next_event(partial_state))),
        }
    }
}

impl ModelResponse for OpenAIResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        let Some(next_event_fut) = this.next_event_fut else {
            return Poll::Ready(Ok(None));
        };
        let (event, partial_state) =
            match ready!(next_event_fut.as_mut().poll(cx)) {
                Ok((Some(event), partial_state)) => (event, partial_state),
                Ok((None, _)) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Ok(None));
                }
                Err(err) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Err(err));
                }
            };

        // The stream may still have more data to pull, create a new future for
        // the next event.
        *this.next_event_fut = Some(Box::pin(next_event(partial_state)));

        Poll::Ready(Ok(Some(event)))
    }
}

async fn next_event(mut partial_state: PartialState) -> NextEvent {
    loop {
        if let Some(event) = partial_state.pending_events.pop_front() {
            return Ok((Some(event), partial_state));
        }
        if partial_state.finished {
            return Ok((None, partial_state));
        }

        let sse_event = match partial_state.sse.next_event().await {
            Ok(Some(event)) => event,
            Ok(None) => {
                // The server hung up without a finish reason. Hand out what
                // has been assembled so far.
                warn!("event stream ended before the response finished");
                partial_state.flush_tool_calls();
                partial_state.finished = true;
                continue;
            }
            Err(err @ SseError::Chunks(_)) => {
                return Err(Error::new(err.to_string(), ErrorKind::Transport));
            }
            Err(err) => {
                return Err(Error::new(err.to_string(), ErrorKind::Other));
            }
        };
        trace!("got sse event: {sse_event}");
        if sse_event == "[DONE]" {
            partial_state.flush_tool_calls();
            partial_state.finished = true;
            continue;
        }

        let chunk = serde_json::from_str::<ChatCompletionChunk>(&sse_event)
            .map_err(|err| Error::new(format!("{err}"), ErrorKind::Other))?;
        partial_state.apply_chunk(chunk)?;
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use bytes::Bytes;
    use plain_agent_model::ModelProviderError;

    use super::*;
    use crate::io::Chunks;

    async fn collect_events(
        payload: &'static [u8],
    ) -> Result<Vec<ModelResponseEvent>, Error> {
        let chunks =
            Chunks::from_vec_deque(vec![Bytes::from_static(payload)].into());
        let mut resp = pin!(OpenAIResponse::from_sse(Sse::new(chunks)));
        let mut events = vec![];
        while let Some(event) =
            poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await?
        {
            events.push(event);
        }
        Ok(events)
    }

    #[tokio::test]
    async fn test_tool_call_events() {
        let events =
            collect_events(include_bytes!("../fixtures/test_response.txt"))
                .await
                .unwrap();

        assert_eq!(
            events,
            [
                ModelResponseEvent::MessageDelta("Let me look.".to_owned()),
                ModelResponseEvent::ToolCall(ToolCallRequest {
                    id: "call_abc".to_owned(),
                    name: "list_files".to_owned(),
                    arguments: r#"{"path":"."}"#.to_owned(),
                }),
                ModelResponseEvent::ToolCall(ToolCallRequest {
                    id: "call_def".to_owned(),
                    name: "read_file".to_owned(),
                    arguments: r#"{"path":"README.md"}"#.to_owned(),
                }),
                ModelResponseEvent::Completed(ModelFinishReason::ToolCalls),
            ]
        );
    }

    #[tokio::test]
    async fn test_text_events() {
        let events = collect_events(
            br#"data: {"id":"c1","choices":[{"delta":{"role":"assistant","content":""},"finish_reason":null}]}

data: {"id":"c1","choices":[{"delta":{"content":"Hello"},"finish_reason":null}]}

data: {"id":"c1","choices":[{"delta":{"content":" there"},"finish_reason":null}]}

data: {"id":"c1","choices":[{"delta":{},"finish_reason":"stop"}]}

data: {"id":"c1","choices":[],"usage":{"total_tokens":12}}

data: [DONE]

"#,
        )
        .await
        .unwrap();

        assert_eq!(
            events,
            [
                ModelResponseEvent::MessageDelta("Hello".to_owned()),
                ModelResponseEvent::MessageDelta(" there".to_owned()),
                ModelResponseEvent::Completed(ModelFinishReason::Stop),
            ]
        );
    }

    #[tokio::test]
    async fn test_truncated_stream() {
        let events = collect_events(
            br#"data: {"id":"c1","choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_1","type":"function","function":{"name":"read_file","arguments":""}}]},"finish_reason":null}]}

data: {"id":"c1","choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"{\"path\":"}}]},"finish_reason":null}]}

"#,
        )
        .await
        .unwrap();

        assert_eq!(
            events,
            [ModelResponseEvent::ToolCall(ToolCallRequest {
                id: "call_1".to_owned(),
                name: "read_file".to_owned(),
                arguments: r#"{"path":"#.to_owned(),
            })]
        );
    }

    #[tokio::test]
    async fn test_fragments_without_index() {
        let events = collect_events(
            br#"data: {"id":"c1","choices":[{"delta":{"tool_calls":[{"id":"call_1","type":"function","function":{"name":"read_file","arguments":""}}]},"finish_reason":null}]}

data: {"id":"c1","choices":[{"delta":{"tool_calls":[{"function":{"arguments":"{\"path\":"}}]},"finish_reason":null}]}

data: {"id":"c1","choices":[{"delta":{"tool_calls":[{"function":{"arguments":"\"a.txt\"}"}}]},"finish_reason":null}]}

data: {"id":"c1","choices":[{"delta":{"tool_calls":[{"id":"call_2","type":"function","function":{"name":"list_files","arguments":"{}"}}]},"finish_reason":null}]}

data: {"id":"c1","choices":[{"delta":{},"finish_reason":"tool_calls"}]}

"#,
        )
        .await
        .unwrap();

        assert_eq!(
            events,
            [
                ModelResponseEvent::ToolCall(ToolCallRequest {
                    id: "call_1".to_owned(),
                    name: "read_file".to_owned(),
                    arguments: r#"{"path":"a.txt"}"#.to_owned(),
                }),
                ModelResponseEvent::ToolCall(ToolCallRequest {
                    id: "call_2".to_owned(),
                    name: "list_files".to_owned(),
                    arguments: "{}".to_owned(),
                }),
                ModelResponseEvent::Completed(ModelFinishReason::ToolCalls),
            ]
        );
    }

    #[tokio::test]
    async fn test_stream_errors() {
        let err = collect_events(b"data: {not json}\n\n").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);

        let err = collect_events(
            br#"data: {"id":"c1","choices":[{"delta":{},"finish_reason":"content_filter"}]}

"#,
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Moderated);

        let err = collect_events(
            br#"data: {"id":"c1","choices":[{"delta":{"content":"a"},"finish_reason":null}]}

data: {"id":"c2","choices":[{"delta":{"content":"b"},"finish_reason":null}]}

"#,
        )
        .await
        .unwrap_err();
        assert_eq!(err.message(), "chunk id mismatch");
    }
}
