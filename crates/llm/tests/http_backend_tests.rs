//! OpenAI-compatible backend against a local mock server

use taskwire_llm::{ChatParams, CompletionBackend, LlmError, Message, OpenAiCompatBackend};

fn params() -> ChatParams {
    ChatParams {
        model: "test-model".to_string(),
        messages: vec![Message::user("Summarize")],
        ..Default::default()
    }
}

#[tokio::test]
async fn test_complete_success() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer test-key")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"choices":[{"message":{"role":"assistant","content":"A summary."},"finish_reason":"stop"}],
                "usage":{"prompt_tokens":10,"completion_tokens":3,"total_tokens":13}}"#,
        )
        .create_async()
        .await;

    let backend = OpenAiCompatBackend::new("test-key", Some(server.url()), None);
    let response = backend.complete(params()).await.unwrap();

    assert_eq!(response.content.as_deref(), Some("A summary."));
    assert_eq!(response.usage.total_tokens, 13);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_complete_api_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":{"message":"bad model"}}"#)
        .create_async()
        .await;

    let backend = OpenAiCompatBackend::new("test-key", Some(server.url()), None);
    match backend.complete(params()).await {
        Err(LlmError::Api(msg)) => assert_eq!(msg, "bad model"),
        other => panic!("Expected Api error, got {:?}", other.map(|r| r.content)),
    }
}

#[tokio::test]
async fn test_complete_rate_limited() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(429)
        .with_body("slow down")
        .create_async()
        .await;

    let backend = OpenAiCompatBackend::new("test-key", Some(server.url()), None);
    let result = backend.complete(params()).await;
    assert!(matches!(result, Err(LlmError::RateLimited)));
}

#[tokio::test]
async fn test_complete_non_json_error_body() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(502)
        .with_header("content-type", "text/html")
        .with_body("<html>Bad Gateway</html>")
        .create_async()
        .await;

    let backend = OpenAiCompatBackend::new("test-key", Some(server.url()), None);
    match backend.complete(params()).await {
        Err(LlmError::Api(msg)) => {
            assert!(msg.starts_with("502"), "{}", msg);
            assert!(msg.contains("<html>Bad Gateway</html>"));
        }
        other => panic!("Expected Api error, got {:?}", other.map(|r| r.content)),
    }
}

#[tokio::test]
async fn test_complete_empty_error_body() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(503)
        .create_async()
        .await;

    let backend = OpenAiCompatBackend::new("test-key", Some(server.url()), None);
    match backend.complete(params()).await {
        Err(LlmError::Api(msg)) => assert_eq!(msg, "503 Service Unavailable"),
        other => panic!("Expected Api error, got {:?}", other.map(|r| r.content)),
    }
}
