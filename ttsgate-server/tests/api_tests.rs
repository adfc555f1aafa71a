mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::http::{header, StatusCode};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::json;
use ttsgate_core::audio::decode_wav;
use ttsgate_server::cache::CacheConfig;
use ttsgate_server::dispatcher::DispatchConfig;
use ttsgate_server::{OutputMode, ServiceConfig};

use common::{gated_app, get, post_json, send, send_json, tone_app};

fn cached_config() -> ServiceConfig {
    ServiceConfig {
        cache: CacheConfig {
            enabled: true,
            max_entries: 8,
        },
        dispatch: DispatchConfig::bounded(4, 1),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_health_before_any_load() {
    let (app, _) = tone_app(ServiceConfig::default());

    let (status, body) = send_json(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["device"], "cpu");
    assert_eq!(body["dtype"], "float32");
    assert_eq!(body["models_loaded"], json!([]));

    let (status, _, _) = send(&app, get("/live")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = send(&app, get("/ready")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_synthesize_returns_base64_wav() {
    let (app, calls) = tone_app(ServiceConfig::default());

    let (status, body) = send_json(
        &app,
        post_json("/v1/tts", json!({"text": "Hello there", "request_id": "req-1"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["request_id"], "req-1");
    assert_eq!(body["audio_format"], "wav");
    assert_eq!(body["sample_rate"], 24_000);
    assert!((body["duration_sec"].as_f64().unwrap() - 0.1).abs() < 1e-9);
    assert!(body.get("audio_url").is_none());

    let wav = STANDARD.decode(body["audio_base64"].as_str().unwrap()).unwrap();
    let (samples, rate) = decode_wav(&wav).unwrap();
    assert_eq!(rate, 24_000);
    assert_eq!(samples.len(), 2_400);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let (_, health) = send_json(&app, get("/health")).await;
    assert_eq!(health["models_loaded"], json!(["qwen3-tts-0.6b"]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_identical_request_served_from_cache() {
    let (app, calls) = tone_app(cached_config());
    let request = json!({"text": "cache me", "voice": "ryan", "seed": 7});

    let (first_status, first) = send_json(&app, post_json("/v1/tts", request.clone())).await;
    let (second_status, second) = send_json(&app, post_json("/v1/tts", request)).await;

    assert_eq!(first_status, StatusCode::OK);
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(first["audio_base64"], second["audio_base64"]);
    assert_ne!(first["request_id"], second["request_id"]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let (_, metrics) = send_json(&app, get("/metrics")).await;
    assert_eq!(metrics["cache"]["enabled"], true);
    assert_eq!(metrics["cache"]["stats"]["hits"], 1);
    assert_eq!(metrics["cache"]["stats"]["misses"], 1);
    assert_eq!(metrics["dispatch"]["models"][0]["dispatch"]["completed"], 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_different_seed_misses_cache() {
    let (app, calls) = tone_app(cached_config());

    send_json(&app, post_json("/v1/tts", json!({"text": "x", "seed": 1}))).await;
    send_json(&app, post_json("/v1/tts", json!({"text": "x", "seed": 2}))).await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_busy_model_rejects_with_429() {
    let config = ServiceConfig {
        dispatch: DispatchConfig::bounded(1, 1),
        ..Default::default()
    };
    let (app, mut entered, release) = gated_app(config);

    let first = {
        let app = app.clone();
        tokio::spawn(async move { send_json(&app, post_json("/v1/tts", json!({"text": "slow"}))).await })
    };
    tokio::time::timeout(Duration::from_secs(5), entered.recv())
        .await
        .expect("engine was never invoked");

    let (status, headers, body) = send(&app, post_json("/v1/tts", json!({"text": "second"}))).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(headers.get(header::RETRY_AFTER).unwrap(), "1");
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"]["type"], "Busy");

    release.send(()).unwrap();
    let (status, _) = first.await.unwrap();
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_model_is_client_error() {
    let (app, calls) = tone_app(ServiceConfig::default());

    let (status, body) = send_json(
        &app,
        post_json("/v1/tts", json!({"text": "hi", "model": "qwen3-tts-7b"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "UnknownModel");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_validation() {
    let (app, _) = tone_app(ServiceConfig::default());

    let (status, _) = send_json(&app, post_json("/v1/tts", json!({"text": "  "}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send_json(&app, post_json("/v1/tts", json!({"text": "hi", "speed": 9.0}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = send_json(&app, post_json("/v1/tts", json!({"text": "hi", "stream": true}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Bad request: streaming not implemented yet");

    let (status, _) = send_json(&app, post_json("/v1/tts", json!({"voice": "ryan"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_mp3_is_rejected() {
    let (app, calls) = tone_app(ServiceConfig::default());
    let (status, body) = send_json(&app, post_json("/v1/tts", json!({"text": "hi", "format": "mp3"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "Audio");
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let (_, health) = send_json(&app, get("/health")).await;
    assert_eq!(health["models_loaded"], json!([]));
}

#[tokio::test]
async fn test_voices() {
    let (app, _) = tone_app(ServiceConfig::default());

    let (status, body) = send_json(&app, get("/v1/voices")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"], "qwen3-tts-0.6b");
    let voices: Vec<String> = serde_json::from_value(body["voices"].clone()).unwrap();
    assert!(voices.contains(&"ryan".to_string()));
    assert!(voices.contains(&"narrator".to_string()));

    let (status, _) = send_json(&app, get("/v1/voices?model=qwen3-tts-1.7b&refresh=true")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send_json(&app, get("/v1/voices?model=nope")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_file_output_mode() {
    let dir = tempfile::tempdir().unwrap();
    let config = ServiceConfig {
        output_mode: OutputMode::File,
        output_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    let (app, _) = tone_app(config);

    let (status, body) = send_json(&app, post_json("/v1/tts", json!({"text": "save me"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("audio_base64").is_none());
    let url = body["audio_url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/v1/audio/"));

    let (status, headers, bytes) = send(&app, get(&url)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "audio/wav");
    assert_eq!(&bytes[0..4], b"RIFF");

    let (status, _, _) = send(&app, get("/v1/audio/..secret.wav")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _, _) = send(&app, get("/v1/audio/missing.wav")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_audio_endpoint_disabled_in_base64_mode() {
    let (app, _) = tone_app(ServiceConfig::default());
    let (status, _, _) = send(&app, get("/v1/audio/anything.wav")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_prometheus_endpoint() {
    let (app, _) = tone_app(ServiceConfig::default());
    let (status, headers, _) = send(&app, get("/metrics/prometheus")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
}
