//! Vendor adapter tests against mock HTTP servers.

use std::time::Duration;

use vgen_models::{GenerationRequest, JobId, JobStatus, MediaLocator};
use vgen_providers::{
    FalConfig, FalProvider, GenerationProvider, OpenAiTtsConfig, OpenAiTtsProvider, ProviderError,
    ReplicateConfig, ReplicateProvider,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

fn image_request(provider: &str) -> GenerationRequest {
    GenerationRequest::image_to_video(
        provider,
        MediaLocator::Url("https://cdn.example.com/scene-1.png".to_string()),
        "A fox running through snow",
    )
}

fn fal(server: &MockServer) -> FalProvider {
    FalProvider::new(
        FalConfig {
            api_key: Some("fal-key".to_string()),
            base_url: server.uri(),
            model: "fal-ai/kling-video/v1.6/standard/image-to-video".to_string(),
        },
        client(),
    )
    .unwrap()
}

fn replicate(server: &MockServer) -> ReplicateProvider {
    ReplicateProvider::new(
        ReplicateConfig {
            api_token: Some("r8-token".to_string()),
            base_url: server.uri(),
            version: "owner/model:abc123".to_string(),
        },
        client(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_fal_full_lifecycle_uses_returned_urls() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/fal-ai/kling-video/v1.6/standard/image-to-video"))
        .and(header("Authorization", "Key fal-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "request_id": "req-42",
            "status_url": format!("{}/custom/req-42/status", server.uri()),
            "response_url": format!("{}/custom/req-42", server.uri()),
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/custom/req-42/status"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "IN_PROGRESS"})),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/custom/req-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "video": {"url": "https://fal.media/out.mp4"}
        })))
        .mount(&server)
        .await;

    let provider = fal(&server);
    let job_id = provider.submit(&image_request("fal")).await.unwrap();
    assert_eq!(job_id.as_str(), "req-42");

    let report = provider.check_status(&job_id).await.unwrap();
    assert_eq!(report.status, JobStatus::Processing);

    let result = provider.get_result(&job_id).await.unwrap();
    assert_eq!(result, MediaLocator::Url("https://fal.media/out.mp4".to_string()));
}

#[tokio::test]
async fn test_fal_failed_job_forgets_returned_urls() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/fal-ai/kling-video/v1.6/standard/image-to-video"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "request_id": "req-9",
            "status_url": format!("{}/custom/req-9/status", server.uri()),
            "response_url": format!("{}/custom/req-9", server.uri()),
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/custom/req-9/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "FAILED",
            "error": "content policy"
        })))
        .expect(1)
        .mount(&server)
        .await;

    // Once the job has failed, lookups fall back to the app-id queue path.
    Mock::given(method("GET"))
        .and(path("/fal-ai/kling-video/requests/req-9/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "FAILED"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = fal(&server);
    let job_id = provider.submit(&image_request("fal")).await.unwrap();

    let report = provider.check_status(&job_id).await.unwrap();
    assert_eq!(report.status, JobStatus::Failed);
    assert_eq!(report.error.as_deref(), Some("content policy"));

    let again = provider.check_status(&job_id).await.unwrap();
    assert_eq!(again.status, JobStatus::Failed);
}

#[tokio::test]
async fn test_fal_missing_video_url_is_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/fal-ai/kling-video/requests/req-7"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"images": []})),
        )
        .mount(&server)
        .await;

    let err = fal(&server)
        .get_result(&JobId::from_string("req-7"))
        .await
        .unwrap_err();

    match err {
        ProviderError::MalformedResult { job_id, raw, .. } => {
            assert_eq!(job_id, "req-7");
            assert!(raw.contains("images"));
        }
        other => panic!("expected MalformedResult, got {other:?}"),
    }
}

#[tokio::test]
async fn test_invalid_request_never_reaches_network() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let provider = fal(&server);

    let mut no_source = image_request("fal");
    no_source.source_media = None;
    assert!(matches!(
        provider.submit(&no_source).await,
        Err(ProviderError::InvalidRequest(_))
    ));

    let mut no_text = image_request("fal");
    no_text.instruction_text = String::new();
    assert!(matches!(
        provider.submit(&no_text).await,
        Err(ProviderError::InvalidRequest(_))
    ));
}

#[tokio::test]
async fn test_replicate_requires_remote_source() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let provider = replicate(&server);
    assert!(!provider.accepts_inline_source());

    let request = GenerationRequest::image_to_video(
        "replicate",
        MediaLocator::inline_from_bytes("image/png", b"\x89PNG"),
        "waves",
    );
    assert!(matches!(
        provider.submit(&request).await,
        Err(ProviderError::InvalidRequest(_))
    ));
}

#[tokio::test]
async fn test_replicate_lifecycle_with_array_output() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/predictions"))
        .and(header("Authorization", "Bearer r8-token"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": "pred-1",
            "status": "starting",
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/predictions/pred-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "pred-1",
            "status": "succeeded",
            "output": ["https://replicate.delivery/out.mp4"],
            "logs": "100%",
        })))
        .mount(&server)
        .await;

    let provider = replicate(&server);
    let job_id = provider.submit(&image_request("replicate")).await.unwrap();
    assert_eq!(job_id.as_str(), "pred-1");

    let report = provider.check_status(&job_id).await.unwrap();
    assert_eq!(report.status, JobStatus::Completed);

    let result = provider.get_result(&job_id).await.unwrap();
    assert_eq!(
        result,
        MediaLocator::Url("https://replicate.delivery/out.mp4".to_string())
    );
}

#[tokio::test]
async fn test_replicate_progress_and_failure_detail() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/predictions/running"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "processing",
            "logs": "step 3/10 30%\nstep 6/10 60%",
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/predictions/broken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "failed",
            "error": "CUDA out of memory",
        })))
        .mount(&server)
        .await;

    let provider = replicate(&server);

    let running = provider
        .check_status(&JobId::from_string("running"))
        .await
        .unwrap();
    assert_eq!(running.status, JobStatus::Processing);
    assert_eq!(running.progress, Some(60));

    let broken = provider
        .check_status(&JobId::from_string("broken"))
        .await
        .unwrap();
    assert_eq!(broken.status, JobStatus::Failed);
    assert_eq!(broken.error.as_deref(), Some("CUDA out of memory"));
}

#[tokio::test]
async fn test_openai_tts_returns_inline_audio() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/audio/speech"))
        .and(header("Authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3fakeaudio".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OpenAiTtsProvider::new(
        OpenAiTtsConfig {
            api_key: Some("sk-test".to_string()),
            base_url: server.uri(),
            ..OpenAiTtsConfig::default()
        },
        client(),
    )
    .unwrap();

    let job_id = provider
        .submit(&GenerationRequest::speech("openai-tts", "Hello there"))
        .await
        .unwrap();

    let report = provider.check_status(&job_id).await.unwrap();
    assert_eq!(report.status, JobStatus::Completed);

    let audio = provider.get_result(&job_id).await.unwrap();
    assert_eq!(audio.mime_type(), Some("audio/mpeg"));
    assert_eq!(audio.decode_bytes().unwrap(), b"ID3fakeaudio");
}
