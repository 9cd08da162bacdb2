use std::future::{pending, ready};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use plain_agent_model::{ModelMessage, Role};
use plain_agent_test_model::{
    PresetEvent, PresetResponse, TestModelProvider,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::time::timeout;

use crate::tool::{Tool, ToolResult};
use crate::{AgentBuilder, AgentConfig, AgentError};

#[derive(Deserialize)]
struct EchoInput {
    text: String,
}

struct EchoTool {
    schema: Value,
}

impl EchoTool {
    fn new() -> Self {
        Self {
            schema: json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string", "description": "Text to echo" }
                },
                "required": ["text"]
            }),
        }
    }
}

impl Tool for EchoTool {
    type Input = EchoInput;

    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echoes the text back"
    }

    fn input_schema(&self) -> &Value {
        &self.schema
    }

    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        ready(Ok(format!("echo: {}", input.text)))
    }
}

struct HangingTool;

impl Tool for HangingTool {
    type Input = Value;

    fn name(&self) -> &str {
        "hang"
    }

    fn description(&self) -> &str {
        "Never finishes"
    }

    fn input_schema(&self) -> &Value {
        static SCHEMA: &Value = &Value::Null;
        SCHEMA
    }

    fn execute(
        &self,
        _input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        pending()
    }
}

fn text(msg: &str) -> PresetResponse {
    PresetResponse::with_events([PresetEvent::MessageDelta(msg.to_owned())])
}

fn echo_call(id: &str, text: &str) -> PresetEvent {
    PresetEvent::tool_call(id, "echo", json!({ "text": text }).to_string())
}

fn roles(messages: &[ModelMessage]) -> Vec<Role> {
    messages.iter().map(ModelMessage::role).collect()
}

#[tokio::test]
async fn test_simple_message() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_user_input_step();
    model_provider.add_assistant_response_step(PresetResponse::with_events([
        PresetEvent::MessageDelta("Hi, ".to_owned()),
        PresetEvent::MessageDelta("what can I do for you?".to_owned()),
    ]));

    let mut agent = AgentBuilder::with_model_provider(model_provider).build();
    let answer = agent.chat("Hello").await;

    assert_eq!(answer, "Hi, what can I do for you?");
    assert_eq!(
        roles(agent.conversation().messages()),
        [Role::User, Role::Assistant]
    );
}

#[tokio::test]
async fn test_tool_calls_round_trip() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_user_input_step();
    model_provider.add_assistant_response_step(PresetResponse::with_events([
        echo_call("call_a", "one"),
        echo_call("call_b", "two"),
    ]));
    model_provider.add_tool_result_step();
    model_provider.add_tool_result_step();
    model_provider.add_assistant_response_step(text("Both echoed."));

    let mut agent = AgentBuilder::with_model_provider(model_provider.clone())
        .with_tool(EchoTool::new())
        .unwrap()
        .build();
    let answer = agent.chat("Echo one and two").await;
    assert_eq!(answer, "Both echoed.");

    let messages = agent.conversation().messages();
    assert_eq!(
        roles(messages),
        [
            Role::User,
            Role::Assistant,
            Role::Tool,
            Role::Tool,
            Role::Assistant
        ]
    );
    assert_eq!(messages[1].content(), None);
    assert_eq!(messages[2], ModelMessage::tool("call_a", "echo: one"));
    assert_eq!(messages[3], ModelMessage::tool("call_b", "echo: two"));

    let requests = model_provider.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].messages, messages[..4]);
    for request in &requests {
        assert_eq!(request.tools.len(), 1);
        assert_eq!(request.tools[0].name, "echo");
        assert_eq!(request.options.model, "gpt-4o-mini");
    }
}

#[tokio::test]
async fn test_tool_errors_are_fed_back() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_user_input_step();
    model_provider.add_assistant_response_step(PresetResponse::with_events([
        PresetEvent::tool_call("call_a", "shell", r#"{"cmdline":"ls"}"#),
        PresetEvent::tool_call("call_b", "echo", "{not json"),
        PresetEvent::tool_call("call_c", "echo", r#"{"txt":"typo"}"#),
    ]));
    model_provider.add_tool_result_step();
    model_provider.add_tool_result_step();
    model_provider.add_tool_result_step();
    model_provider.add_assistant_response_step(text("Sorry about that."));

    let mut agent = AgentBuilder::with_model_provider(model_provider)
        .with_tool(EchoTool::new())
        .unwrap()
        .build();
    assert_eq!(agent.chat("Do things").await, "Sorry about that.");

    let messages = agent.conversation().messages();
    assert_eq!(
        messages[2].content(),
        Some("Error: Tool shell is not recognized.")
    );
    assert!(
        messages[3]
            .content()
            .unwrap()
            .starts_with("Error: Invalid arguments for tool echo:")
    );
    assert!(
        messages[4]
            .content()
            .unwrap()
            .starts_with("Error: Invalid arguments for tool echo:")
    );
}

#[tokio::test]
async fn test_iteration_limit() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_user_input_step();
    for idx in 0..10 {
        model_provider.add_assistant_response_step(PresetResponse::with_events(
            [echo_call(&format!("call_{idx}"), "again")],
        ));
        model_provider.add_tool_result_step();
    }

    let mut agent = AgentBuilder::with_model_provider(model_provider.clone())
        .with_tool(EchoTool::new())
        .unwrap()
        .build();
    let answer = agent.chat("Loop forever").await;

    assert_eq!(
        answer,
        "Maximum iterations reached. The conversation may be too complex."
    );
    assert_eq!(model_provider.requests().len(), 5);
    // The user message plus five assistant/tool pairs.
    assert_eq!(agent.conversation().len(), 11);
}

#[tokio::test]
async fn test_custom_iteration_budget() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_user_input_step();
    for idx in 0..4 {
        model_provider.add_assistant_response_step(PresetResponse::with_events(
            [echo_call(&format!("call_{idx}"), "again")],
        ));
        model_provider.add_tool_result_step();
    }

    let mut agent = AgentBuilder::with_model_provider(model_provider.clone())
        .with_config(AgentConfig::default().with_max_iterations(2))
        .with_tool(EchoTool::new())
        .unwrap()
        .build();
    let result = agent.send_message("Loop").await;

    assert!(matches!(
        result,
        Err(AgentError::IterationLimitExceeded { max_iterations: 2 })
    ));
    assert_eq!(model_provider.requests().len(), 2);
}

#[tokio::test]
async fn test_model_failure_keeps_history() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_user_input_step();
    model_provider.add_assistant_response_step(text("never").with_failures(0));
    model_provider.add_assistant_response_step(text("Back online."));

    let mut agent =
        AgentBuilder::with_model_provider(model_provider.clone()).build();
    let answer = agent.chat("Hello?").await;
    assert!(
        answer.starts_with("An error occurred during chat completion:"),
        "{answer}"
    );
    assert_eq!(model_provider.requests().len(), 1);
    assert_eq!(roles(agent.conversation().messages()), [Role::User]);

    // The next call continues from the partial history.
    assert_eq!(agent.chat("Anyone there?").await, "Back online.");
    assert_eq!(
        roles(agent.conversation().messages()),
        [Role::User, Role::User, Role::Assistant]
    );
}

#[tokio::test]
async fn test_empty_response_fallback() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_user_input_step();
    model_provider.add_assistant_response_step(PresetResponse::with_events([]));

    let mut agent = AgentBuilder::with_model_provider(model_provider).build();
    assert_eq!(
        agent.chat("...").await,
        "I apologize, but I couldn't generate a response."
    );
    assert_eq!(agent.conversation().messages()[1].content(), None);
}

#[tokio::test]
async fn test_multi_turn_memory() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_user_input_step();
    model_provider.add_assistant_response_step(text("Nice to meet you, Ada."));
    model_provider.add_user_input_step();
    model_provider.add_assistant_response_step(text("Your name is Ada."));

    let mut agent =
        AgentBuilder::with_model_provider(model_provider.clone()).build();
    agent.chat("I'm Ada").await;
    assert_eq!(agent.chat("What's my name?").await, "Your name is Ada.");

    let requests = model_provider.requests();
    assert_eq!(requests[1].messages.len(), 3);
    assert_eq!(requests[1].messages[0], ModelMessage::user("I'm Ada"));
}

#[tokio::test]
async fn test_cancelled_turn_is_closed() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_user_input_step();
    model_provider.add_assistant_response_step(PresetResponse::with_events([
        PresetEvent::tool_call("call_h", "hang", "{}"),
    ]));
    model_provider.add_tool_result_step();
    model_provider.add_user_input_step();
    model_provider.add_assistant_response_step(text("Moving on."));

    let mut agent = AgentBuilder::with_model_provider(model_provider)
        .with_tool(HangingTool)
        .unwrap()
        .build();

    let result =
        timeout(Duration::from_millis(100), agent.send_message("Hang")).await;
    assert!(result.is_err());
    assert_eq!(
        agent.conversation().pending_tool_calls().collect::<Vec<_>>(),
        ["call_h"]
    );

    assert_eq!(agent.chat("Never mind").await, "Moving on.");
    let messages = agent.conversation().messages();
    assert_eq!(
        messages[2],
        ModelMessage::tool("call_h", "Error: Tool call call_h was interrupted.")
    );
    assert_eq!(messages[3], ModelMessage::user("Never mind"));
}

#[test]
fn test_duplicate_tool() {
    let result = AgentBuilder::with_model_provider(TestModelProvider::default())
        .with_tool(EchoTool::new())
        .and_then(|builder| builder.with_tool(EchoTool::new()));
    assert!(result.is_err());
}

#[tokio::test]
async fn test_transcript_streams_across_turns() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_user_input_step();
    model_provider.add_assistant_response_step(PresetResponse::with_events([
        PresetEvent::MessageDelta("Let me check. ".to_owned()),
        echo_call("call_a", "ping"),
    ]));
    model_provider.add_tool_result_step();
    model_provider.add_assistant_response_step(PresetResponse::with_events([
        PresetEvent::MessageDelta("Got ".to_owned()),
        PresetEvent::MessageDelta("pong.".to_owned()),
    ]));

    let transcript = Arc::new(Mutex::new(Vec::new()));
    let mut agent = AgentBuilder::with_model_provider(model_provider)
        .on_transcript({
            let transcript = Arc::clone(&transcript);
            move |delta| transcript.lock().unwrap().push(delta.to_owned())
        })
        .with_tool(EchoTool::new())
        .unwrap()
        .build();

    assert_eq!(agent.chat("Ping").await, "Got pong.");
    assert_eq!(
        *transcript.lock().unwrap(),
        ["Let me check. ", "Got ", "pong."]
    );
}
