//! Integration tests for Langbase client
//!
//! Tests HTTP client behavior using wiremock for request/response mocking.

use serde_json::json;
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use dataroom_diligence::config::{LangbaseConfig, ModelConfig, PipeConfig, RequestConfig};
use dataroom_diligence::error::LangbaseError;
use dataroom_diligence::langbase::{Generator, LangbaseClient, Message, PipeRequest};

/// Create a test client pointing to mock server
fn create_test_client(base_url: &str) -> LangbaseClient {
    create_client_with(base_url, 0)
}

fn create_client_with(base_url: &str, max_retries: u32) -> LangbaseClient {
    let config = LangbaseConfig {
        api_key: "test-api-key".to_string(),
        base_url: base_url.to_string(),
    };

    let request_config = RequestConfig {
        timeout_ms: 5000,
        max_retries,
        retry_delay_ms: 10,
    };

    LangbaseClient::new(&config, request_config).expect("Failed to create client")
}

/// Create a simple pipe request for testing
fn create_test_request(content: &str) -> PipeRequest {
    PipeRequest::new(
        "diligence-analysis-v1",
        vec![Message::system("Analyze."), Message::user(content)],
    )
}

#[cfg(test)]
mod pipe_call_tests {
    use super::*;

    #[tokio::test]
    async fn test_successful_pipe_call() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pipes/run"))
            .and(header("Authorization", "Bearer test-api-key"))
            .and(header("Content-Type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "completion": "Company X sells solar panels.",
                "threadId": "thread-123",
                "raw": {
                    "model": "gpt-4o",
                    "usage": {
                        "prompt_tokens": 100,
                        "completion_tokens": 8,
                        "total_tokens": 108
                    }
                }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri());
        let response = client
            .call_pipe(create_test_request("Summarize the pitch"))
            .await
            .unwrap();

        assert!(response.success);
        assert_eq!(response.completion, "Company X sells solar panels.");
        assert_eq!(response.thread_id, Some("thread-123".to_string()));
        let usage = response.raw.unwrap().usage.unwrap();
        assert_eq!(usage.total_tokens, Some(108));
    }

    #[tokio::test]
    async fn test_request_body_carries_pipe_and_messages() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pipes/run"))
            .and(body_partial_json(json!({
                "name": "diligence-analysis-v1",
                "stream": false,
                "messages": [
                    {"role": "system", "content": "Analyze."},
                    {"role": "user", "content": "Summarize the pitch"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "completion": "ok"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri());
        let result = client.call_pipe(create_test_request("Summarize the pitch")).await;
        assert!(result.is_ok(), "{:?}", result.err());
    }

    #[tokio::test]
    async fn test_pipe_call_authentication_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pipes/run"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"message": "Invalid API key"}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri());
        let err = client
            .call_pipe(create_test_request("Test"))
            .await
            .unwrap_err();

        match err {
            LangbaseError::Unavailable { message, retries } => {
                assert!(message.contains("401"));
                assert!(message.contains("Invalid API key"));
                assert_eq!(retries, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_handle_malformed_json() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pipes/run"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri());
        let err = client
            .call_pipe(create_test_request("Test"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to parse response"));
    }
}

#[cfg(test)]
mod generator_tests {
    use super::*;

    async fn mount_completion(server: &MockServer, body: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path("/v1/pipes/run"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_generate_returns_completion() {
        let mock_server = MockServer::start().await;
        mount_completion(
            &mock_server,
            json!({"success": true, "completion": "Revenue grew 40%."}),
        )
        .await;

        let client = create_test_client(&mock_server.uri());
        let text = client.generate(create_test_request("Revenue?")).await.unwrap();
        assert_eq!(text, "Revenue grew 40%.");
    }

    #[tokio::test]
    async fn test_generate_rejects_empty_completion() {
        let mock_server = MockServer::start().await;
        mount_completion(&mock_server, json!({"success": true, "completion": "  "})).await;

        let client = create_test_client(&mock_server.uri());
        let err = client.generate(create_test_request("Test")).await.unwrap_err();

        assert!(matches!(err, LangbaseError::InvalidResponse { .. }));
        assert!(err.to_string().contains("empty completion"));
    }

    #[tokio::test]
    async fn test_generate_rejects_unsuccessful_run() {
        let mock_server = MockServer::start().await;
        mount_completion(
            &mock_server,
            json!({"success": false, "completion": "partial"}),
        )
        .await;

        let client = create_test_client(&mock_server.uri());
        let err = client.generate(create_test_request("Test")).await.unwrap_err();
        assert!(err.to_string().contains("unsuccessful run"));
    }
}

#[cfg(test)]
mod timeout_tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_request_timeout() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pipes/run"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({
                        "success": true,
                        "completion": "Delayed response"
                    }))
                    .set_delay(Duration::from_secs(10)), // Longer than timeout
            )
            .mount(&mock_server)
            .await;

        let config = LangbaseConfig {
            api_key: "test-api-key".to_string(),
            base_url: mock_server.uri(),
        };
        let request_config = RequestConfig {
            timeout_ms: 100,
            max_retries: 0,
            retry_delay_ms: 100,
        };
        let client = LangbaseClient::new(&config, request_config).unwrap();

        let err = client
            .call_pipe(create_test_request("Test"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timeout"));
    }
}

#[cfg(test)]
mod retry_tests {
    use super::*;

    #[tokio::test]
    async fn test_retry_then_succeed() {
        let mock_server = MockServer::start().await;

        // First call fails, second succeeds
        Mock::given(method("POST"))
            .and(path("/v1/pipes/run"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Server error"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/pipes/run"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "completion": "Recovered."
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_client_with(&mock_server.uri(), 2);
        let text = client.generate(create_test_request("Test")).await.unwrap();
        assert_eq!(text, "Recovered.");
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pipes/run"))
            .respond_with(ResponseTemplate::new(503).set_body_string("Unavailable"))
            .expect(3)
            .mount(&mock_server)
            .await;

        let client = create_client_with(&mock_server.uri(), 2);
        let err = client
            .call_pipe(create_test_request("Test"))
            .await
            .unwrap_err();

        assert!(matches!(err, LangbaseError::Unavailable { retries: 3, .. }));
    }
}

#[cfg(test)]
mod pipe_management_tests {
    use super::*;

    #[tokio::test]
    async fn test_ensure_pipes_creates_all_three() {
        let mock_server = MockServer::start().await;

        for name in [
            "diligence-analysis-v1",
            "diligence-condense-v1",
            "diligence-chat-v1",
        ] {
            Mock::given(method("POST"))
                .and(path("/v1/pipes"))
                .and(body_partial_json(json!({
                    "name": name,
                    "model": "openai:gpt-4o",
                    "upsert": true
                })))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "name": name,
                    "status": "public",
                    "url": format!("https://langbase.com/pipes/{}", name)
                })))
                .expect(1)
                .mount(&mock_server)
                .await;
        }

        let client = create_test_client(&mock_server.uri());
        client
            .ensure_pipes(&PipeConfig::default(), &ModelConfig::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_ensure_pipes_tolerates_existing() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pipes"))
            .respond_with(ResponseTemplate::new(409).set_body_string("Pipe already exists"))
            .expect(3)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri());
        let result = client
            .ensure_pipes(&PipeConfig::default(), &ModelConfig::default())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_ensure_pipes_stops_on_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pipes"))
            .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri());
        let err = client
            .ensure_pipes(&PipeConfig::default(), &ModelConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LangbaseError::Api { status: 403, .. }));
    }
}
