//! End-to-end tests for the analysis endpoint

mod common;

use axum::{body::Body, http::Request, http::StatusCode};
use common::*;
use std::time::Duration;
use tower::ServiceExt;

#[tokio::test]
async fn test_cache_miss_then_hit() {
    let backend = StubBackend::text(FENCED_GALLIA);
    let app = test_app(Some(backend.clone()));

    let response = app
        .clone()
        .oneshot(analyze_request(&text_body(GALLIA), Some("198.51.100.4")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-cache"], "MISS");
    let first = json_body(response).await;
    assert_eq!(first["words"][0]["word"], "Gallia");
    assert_eq!(first["words"][0]["morphology"]["case"], "nominative");

    let response = app
        .oneshot(analyze_request(&text_body(GALLIA), Some("198.51.100.4")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-cache"], "HIT");
    let second = json_body(response).await;

    assert_eq!(first, second);
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn test_body_is_the_model_json_verbatim() {
    let model_json = serde_json::json!({
        "words": [{
            "word": "est",
            "meaning": "is",
            "morphology": {"person": 3, "declension": "3rd"},
            "relationships": [{"type": "copula", "direction": "both", "strength": 0.5}]
        }, {
            "word": "omnis",
            "relationships": null
        }],
        "notes": "copula sentence"
    });
    let backend = StubBackend::text(&format!("Analysis:\n```json\n{:#}\n```", model_json));
    let app = test_app(Some(backend.clone()));

    for expected_cache in ["MISS", "HIT"] {
        let response = app
            .clone()
            .oneshot(analyze_request(&text_body("est omnis"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-cache"], expected_cache);
        assert_eq!(json_body(response).await, model_json);
    }
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn test_words_must_be_an_array() {
    let backend = StubBackend::text(r#"{"words": {"Gallia": "noun"}}"#);
    let app = test_app(Some(backend));

    let response = app
        .oneshot(analyze_request(&text_body(GALLIA), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(response).await["errorType"], "parsing_error");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_share_state() {
    let backend = StubBackend::text(FENCED_GALLIA);
    let app = test_app(Some(backend.clone()));

    // Eight distinct passages from one client, all in flight at once
    let mut tasks = Vec::new();
    for i in 0..8 {
        let app = app.clone();
        tasks.push(tokio::spawn(async move {
            app.oneshot(analyze_request(&text_body(&format!("verbum {}", i)), Some("192.0.2.1")))
                .await
                .unwrap()
                .status()
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap(), StatusCode::OK);
    }
    assert_eq!(backend.calls(), 8);

    // Every concurrent write landed in the cache
    for i in 0..8 {
        let response = app
            .clone()
            .oneshot(analyze_request(&text_body(&format!("verbum {}", i)), Some("192.0.2.2")))
            .await
            .unwrap();
        assert_eq!(response.headers()["x-cache"], "HIT");
    }

    // Every concurrent request was recorded: two left, then limited
    for i in 8..10 {
        let response = app
            .clone()
            .oneshot(analyze_request(&text_body(&format!("verbum {}", i)), Some("192.0.2.1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = app
        .oneshot(analyze_request(&text_body("verbum 10"), Some("192.0.2.1")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(backend.calls(), 10);
}

#[tokio::test]
async fn test_cache_is_shared_across_clients() {
    let backend = StubBackend::text(FENCED_GALLIA);
    let app = test_app(Some(backend.clone()));

    for ip in ["198.51.100.4", "198.51.100.5", "198.51.100.6"] {
        let response = app
            .clone()
            .oneshot(analyze_request(&text_body(GALLIA), Some(ip)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn test_missing_text_is_400() {
    let backend = StubBackend::text(FENCED_GALLIA);
    let app = test_app(Some(backend.clone()));

    for body in [r#"{}"#, r#"{"stream": false, "lang": "la"}"#, r#"{"text": ""}"#] {
        let response = app.clone().oneshot(analyze_request(body, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", body);
        let json = json_body(response).await;
        assert!(json["error"].is_string());
        assert!(json["suggestions"].is_array());
    }
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_non_post_is_405() {
    let backend = StubBackend::text(FENCED_GALLIA);
    let app = test_app(Some(backend.clone()));

    for method in ["GET", "PUT", "DELETE", "PATCH"] {
        let request = Request::builder()
            .method(method)
            .uri("/api/analyze")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{}", method);
        assert_eq!(response.headers()["allow"], "POST");
        let json = json_body(response).await;
        assert_eq!(json["retryable"], false);
    }

    // GET requests never touched the limiter: a full allowance remains
    for i in 0..10 {
        let response = app
            .clone()
            .oneshot(analyze_request(&text_body(&format!("verbum {}", i)), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(backend.calls(), 10);
}

#[tokio::test]
async fn test_prose_response_is_422_and_not_cached() {
    let backend = StubBackend::text("I am unable to analyze this passage at the moment.");
    let app = test_app(Some(backend.clone()));

    let response = app
        .clone()
        .oneshot(analyze_request(&text_body(GALLIA), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = json_body(response).await;
    assert_eq!(json["errorType"], "parsing_error");
    assert_eq!(json["fallback"], true);
    assert_eq!(json["retryable"], false);
    assert_eq!(
        json["rawExcerpt"],
        "I am unable to analyze this passage at the moment."
    );

    let response = app
        .oneshot(analyze_request(&text_body(GALLIA), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn test_parsing_excerpt_is_bounded() {
    let garbage = format!("{{ {} ", "x".repeat(1000));
    let backend = StubBackend::text(&format!("{}}}", garbage));
    let app = test_app(Some(backend));

    let response = app
        .oneshot(analyze_request(&text_body(GALLIA), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = json_body(response).await;
    assert_eq!(json["rawExcerpt"].as_str().unwrap().chars().count(), 200);
}

#[tokio::test]
async fn test_eleventh_request_is_rate_limited() {
    let backend = StubBackend::text(r#"{"words": []}"#);
    let app = test_app(Some(backend.clone()));

    for i in 0..10 {
        let response = app
            .clone()
            .oneshot(analyze_request(&text_body(&format!("verbum {}", i)), Some("203.0.113.9")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(analyze_request(&text_body("verbum 10"), Some("203.0.113.9")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = response.headers()["retry-after"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after > 0 && retry_after <= 60);

    let json = json_body(response).await;
    assert_eq!(json["errorType"], "rate_limit_error");
    assert_eq!(json["retryable"], true);
    assert!(json["resetInSeconds"].as_u64().unwrap() > 0);
    assert!(json["resetInMs"].as_u64().unwrap() > 0);
    assert_eq!(backend.calls(), 10);

    // A different client is unaffected
    let response = app
        .oneshot(analyze_request(&text_body("verbum 10"), Some("203.0.113.10")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unidentified_clients_share_a_bucket() {
    let backend = StubBackend::text(r#"{"words": []}"#);
    let app = test_app(Some(backend));

    for i in 0..10 {
        app.clone()
            .oneshot(analyze_request(&text_body(&format!("verbum {}", i)), None))
            .await
            .unwrap();
    }

    let response = app
        .oneshot(analyze_request(&text_body("verbum 10"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_missing_credential_is_500_with_fallback() {
    let app = test_app(None);

    let response = app
        .oneshot(analyze_request(&text_body(GALLIA), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = json_body(response).await;
    assert_eq!(json["errorType"], "unknown_error");
    assert_eq!(json["fallback"], true);
    assert_eq!(json["retryable"], false);
}

#[tokio::test]
async fn test_upstream_failures_are_classified() {
    let cases = [
        (Some(429), "Resource has been exhausted", StatusCode::TOO_MANY_REQUESTS, "rate_limit_error", true),
        (Some(400), "API key not valid. Please pass a valid API key.", StatusCode::UNAUTHORIZED, "authentication_error", false),
        (None, "Deadline exceeded while waiting for model", StatusCode::GATEWAY_TIMEOUT, "timeout_error", true),
        (Some(500), "Internal error encountered", StatusCode::INTERNAL_SERVER_ERROR, "unknown_error", false),
    ];

    for (status, message, expected_status, expected_type, retryable) in cases {
        let backend = StubBackend::new(StubReply::Upstream {
            status,
            message: message.to_string(),
        });
        let app = test_app(Some(backend));

        let response = app
            .oneshot(analyze_request(&text_body(GALLIA), None))
            .await
            .unwrap();
        assert_eq!(response.status(), expected_status, "{}", message);
        let json = json_body(response).await;
        assert_eq!(json["errorType"], expected_type, "{}", message);
        assert_eq!(json["retryable"], retryable, "{}", message);
        assert!(!json["suggestions"].as_array().unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_host_deadline_is_504() {
    let backend = StubBackend::new(StubReply::Hang);
    let app = test_app_with_timeout(Some(backend), Duration::from_millis(50));

    let response = app
        .oneshot(analyze_request(&text_body(GALLIA), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    let json = json_body(response).await;
    assert_eq!(json["errorType"], "timeout_error");
    assert_eq!(json["retryable"], true);
}

#[tokio::test]
async fn test_stream_flag_is_served_without_streaming() {
    let backend = StubBackend::text(FENCED_GALLIA);
    let app = test_app(Some(backend));

    let body = serde_json::json!({ "text": GALLIA, "stream": true }).to_string();
    let response = app.oneshot(analyze_request(&body, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "application/json"
    );
}

#[tokio::test]
async fn test_debug_endpoint() {
    let backend = StubBackend::text(FENCED_GALLIA);
    let app = test_app(Some(backend));

    app.clone()
        .oneshot(analyze_request(&text_body(GALLIA), None))
        .await
        .unwrap();

    let request = Request::builder()
        .uri("/api/debug")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["hasApiKey"], true);
    assert_eq!(json["cacheEntries"], 1);
}
