use std::sync::Arc;

use mockito::Matcher;
use newzlm::editorial::EditorialSettings;
use newzlm::generator::{
    generation_request, ArticleGenerator, EndpointGenerator, GenerationError, LlmArticleGenerator,
};
use newzlm::llm::remote::RemoteLlmProvider;
use newzlm::news::samples::sample_articles;

fn request() -> newzlm::generator::GenerationRequest {
    let settings = EditorialSettings::default();
    generation_request(Some(sample_articles().remove(0)), "", "", &settings).unwrap()
}

#[tokio::test]
async fn endpoint_generator_passes_prompt_and_url() {
    let mut server = mockito::Server::new_async().await;
    let request = request();

    let mock = server
        .mock("GET", "/generate_article")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("url".into(), "https://example.com/ai-central-asia".into()),
            Matcher::UrlEncoded("system_prompt".into(), request.system_prompt.clone()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"title": "AI on the Steppe", "content": "Startups in Almaty..."}"#)
        .create_async()
        .await;

    let generator = EndpointGenerator::new(format!("{}/generate_article", server.url()), 5).unwrap();
    let article = generator.generate(&request).await.unwrap();

    assert_eq!(article.title, "AI on the Steppe");
    assert_eq!(article.content, "Startups in Almaty...");
    mock.assert_async().await;
}

#[tokio::test]
async fn endpoint_generator_error_kinds() {
    let mut server = mockito::Server::new_async().await;

    server
        .mock("GET", "/down")
        .match_query(Matcher::Any)
        .with_status(503)
        .create_async()
        .await;
    server
        .mock("GET", "/garbage")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("<html>not json</html>")
        .create_async()
        .await;
    server
        .mock("GET", "/empty")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"title": "T", "content": "  "}"#)
        .create_async()
        .await;

    let request = request();

    let down = EndpointGenerator::new(format!("{}/down", server.url()), 5).unwrap();
    assert!(matches!(
        down.generate(&request).await,
        Err(GenerationError::Remote { status: 503 })
    ));

    let garbage = EndpointGenerator::new(format!("{}/garbage", server.url()), 5).unwrap();
    assert!(matches!(garbage.generate(&request).await, Err(GenerationError::Unparsable)));

    let empty = EndpointGenerator::new(format!("{}/empty", server.url()), 5).unwrap();
    assert!(matches!(empty.generate(&request).await, Err(GenerationError::Unparsable)));

    // nothing listening
    let unreachable = EndpointGenerator::new("http://127.0.0.1:9/generate_article", 2).unwrap();
    assert!(matches!(
        unreachable.generate(&request).await,
        Err(GenerationError::Transport(_))
    ));
}

#[tokio::test]
async fn llm_generator_through_remote_provider() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("POST", "/")
        .match_header("authorization", "Bearer fake-api-key")
        .match_body(Matcher::Regex("professional journalist".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r###"{
                "model": "llama-3.1-8b-instant",
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": "Here is your article:\n{\"title\": \"Central Asia Bets on AI\", \"content\": \"## Overview\\nStartups...\"}"
                    }
                }],
                "usage": {"prompt_tokens": 300, "completion_tokens": 120, "total_tokens": 420}
            }"###,
        )
        .create_async()
        .await;

    let provider = RemoteLlmProvider::new(server.url(), "fake-api-key", "llama-3.1-8b-instant");
    // sample URLs are not real pages, so skip scraping
    let generator = LlmArticleGenerator::new(Arc::new(provider)).with_source_scraping(false);

    let article = generator.generate(&request()).await.unwrap();
    assert_eq!(article.title, "Central Asia Bets on AI");
    assert!(article.content.starts_with("## Overview"));

    mock.assert_async().await;
}

#[tokio::test]
async fn llm_generator_maps_api_errors_to_transport() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/")
        .with_status(429)
        .with_body("rate limited")
        .create_async()
        .await;

    let provider = RemoteLlmProvider::new(server.url(), "fake-api-key", "model");
    let generator = LlmArticleGenerator::new(Arc::new(provider));

    let err = generator.generate(&request()).await.unwrap_err();
    assert!(matches!(err, GenerationError::Transport(_)));
    assert_eq!(GenerationError::USER_MESSAGE, "Failed to generate article. Please try again.");
}
