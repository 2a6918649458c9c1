//! Unit tests for Langbase API types.

use super::*;

#[test]
fn test_message_constructors() {
    let msg = Message::system("You are a diligence analyst");
    assert_eq!(msg.role, MessageRole::System);
    assert_eq!(msg.content, "You are a diligence analyst");

    assert_eq!(Message::user("hi").role, MessageRole::User);
    assert_eq!(Message::assistant("hello").role, MessageRole::Assistant);
}

#[test]
fn test_message_role_serializes_lowercase() {
    let json = serde_json::to_string(&Message::assistant("ok")).unwrap();
    assert!(json.contains("\"role\":\"assistant\""));
    assert_eq!(MessageRole::User.to_string(), "user");
}

#[test]
fn test_pipe_request_serialization() {
    let request = PipeRequest::new("diligence-analysis-v1", vec![Message::user("Summarize")]);

    let json = serde_json::to_value(&request).unwrap();
    assert_eq!(json["name"], "diligence-analysis-v1");
    assert_eq!(json["stream"], false);
    assert_eq!(json["messages"][0]["content"], "Summarize");
}

#[test]
fn test_pipe_request_user_content() {
    let request = PipeRequest::new(
        "p",
        vec![
            Message::system("sys"),
            Message::user("first"),
            Message::assistant("reply"),
            Message::user("second"),
        ],
    );
    assert_eq!(request.user_content(), "first\nsecond");
}

#[test]
fn test_pipe_response_deserialization() {
    let response: PipeResponse = serde_json::from_value(serde_json::json!({
        "success": true,
        "completion": "Company X sells solar panels.",
        "threadId": null,
        "raw": {"model": "gpt-4o", "usage": {"total_tokens": 42}}
    }))
    .unwrap();

    assert!(response.success);
    assert_eq!(response.completion, "Company X sells solar panels.");
    assert_eq!(
        response.raw.and_then(|r| r.usage).and_then(|u| u.total_tokens),
        Some(42)
    );
}

#[test]
fn test_create_pipe_request_builder() {
    let request = CreatePipeRequest::new("diligence-chat-v1")
        .with_description("chat")
        .with_model("openai:gpt-4o")
        .with_upsert(true)
        .with_temperature(0.1)
        .with_max_tokens(2000)
        .with_messages(vec![Message::system("be helpful")]);

    let json = serde_json::to_value(&request).unwrap();
    assert_eq!(json["model"], "openai:gpt-4o");
    assert_eq!(json["upsert"], true);
    assert_eq!(json["max_tokens"], 2000);
    assert_eq!(json["messages"][0]["role"], "system");
}
