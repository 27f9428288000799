use newzlm::llm::remote::RemoteLlmProvider;
use newzlm::llm::{LlmProvider, LlmRequest};

#[tokio::test]
async fn test_remote_provider_with_mock() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("POST", "/")
        .match_header("authorization", "Bearer fake-api-key")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "model": "llama-3.1-8b-instant",
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": "  This is a test response\n"
                    },
                    "finish_reason": "stop"
                }],
                "usage": {
                    "prompt_tokens": 10,
                    "completion_tokens": 5,
                    "total_tokens": 15
                }
            }"#,
        )
        .create_async()
        .await;

    let provider = RemoteLlmProvider::new(server.url(), "fake-api-key", "llama-3.1-8b-instant");

    let request = LlmRequest {
        system: Some("You are a journalist".to_string()),
        prompt: "Test prompt".to_string(),
        max_tokens: Some(100),
        temperature: Some(0.7),
        timeout_seconds: Some(10),
    };

    let response = provider.generate(request).await.unwrap();

    assert_eq!(response.content, "This is a test response");
    assert_eq!(response.usage.prompt_tokens, 10);
    assert_eq!(response.usage.completion_tokens, 5);
    assert_eq!(response.usage.total_tokens, 15);
    assert_eq!(response.model, "llama-3.1-8b-instant");

    mock.assert_async().await;
}

#[tokio::test]
async fn test_remote_provider_sends_system_message_first() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("POST", "/")
        .match_body(mockito::Matcher::PartialJsonString(
            r#"{"model": "m", "messages": [{"role": "system", "content": "Be brief"}, {"role": "user", "content": "Hello"}]}"#
                .to_string(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"choices": [{"message": {"role": "assistant", "content": "Hi"}}]}"#)
        .create_async()
        .await;

    let provider = RemoteLlmProvider::new(server.url(), "k", "m");
    let mut request = LlmRequest::new("Hello");
    request.system = Some("Be brief".to_string());

    let response = provider.generate(request).await.unwrap();
    assert_eq!(response.content, "Hi");
    // no usage block and no model in the reply
    assert_eq!(response.usage.total_tokens, 0);
    assert_eq!(response.model, "m");

    mock.assert_async().await;
}

#[tokio::test]
async fn test_remote_provider_error_handling() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("POST", "/")
        .with_status(500)
        .with_body("Internal Server Error")
        .create_async()
        .await;

    let provider = RemoteLlmProvider::new(server.url(), "fake-api-key", "model");
    let result = provider.generate(LlmRequest::new("Test")).await;

    let err = result.unwrap_err();
    assert!(err.to_string().contains("500"));

    mock.assert_async().await;
}

#[tokio::test]
async fn test_remote_provider_fills_unset_sampling_and_rejects_empty_choices() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("POST", "/")
        .match_body(mockito::Matcher::PartialJsonString(
            r#"{"model": "m", "max_tokens": 1024, "messages": [{"role": "user", "content": "Only user"}]}"#.to_string(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"model": "m", "choices": [], "usage": null}"#)
        .create_async()
        .await;

    let provider = RemoteLlmProvider::new(server.url(), "k", "m");
    let err = provider.generate(LlmRequest::new("Only user")).await.unwrap_err();
    assert!(err.to_string().contains("no choices"));

    mock.assert_async().await;
}
