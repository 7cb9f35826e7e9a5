//! End-to-end tests against an in-process axum stub server.
//!
//! Exercises the real HTTP transport: JSON form round trip, multipart image
//! upload, non-2xx statuses, and the generative endpoint shape.

use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use image::{ImageFormat, Rgb, RgbImage};
use medai_common::{
    preprocess, AnalysisTransport, Endpoint, HttpTransport, RequestOrchestrator,
};
use medai_shared::form::FIELD_NAMES;
use medai_shared::{
    AnalysisRequest, AnalysisResult, DiabetesForm, Panel, RequestState, RiskLevel,
};
use serde_json::{json, Value};
use std::io::Cursor;
use std::sync::{Arc, Mutex};

type Seen = Arc<Mutex<Vec<Value>>>;

async fn spawn_stub(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn transport() -> Arc<dyn AnalysisTransport> {
    Arc::new(HttpTransport::new().unwrap())
}

async fn predict(State(seen): State<Seen>, Json(body): Json<Value>) -> Json<Value> {
    seen.lock().unwrap().push(body);
    Json(json!({
        "probability_score": 0.71,
        "risk_assessment": "High",
        "detailed_analysis": "BMI and blood pressure both elevated."
    }))
}

async fn classify(State(seen): State<Seen>, mut multipart: Multipart) -> Json<Value> {
    while let Some(field) = multipart.next_field().await.unwrap() {
        if field.name() == Some("file") {
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await.unwrap();
            let decoded = image::load_from_memory(&bytes).unwrap();
            seen.lock().unwrap().push(json!({
                "content_type": content_type,
                "width": decoded.width(),
                "height": decoded.height(),
                "bytes": bytes.len(),
            }));
        }
    }
    Json(json!({"label": "Benign keratosis", "confidence": 0.93}))
}

async fn overloaded() -> (StatusCode, &'static str) {
    (StatusCode::SERVICE_UNAVAILABLE, "instance warming up")
}

async fn generative(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()) != Some("test-key") {
        return (StatusCode::UNAUTHORIZED, Json(json!({})));
    }
    let prompt = body["contents"][0]["parts"][0]["text"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    (
        StatusCode::OK,
        Json(json!({
            "candidates": [{ "content": { "parts": [{
                "text": format!("Advice for: {}", prompt.lines().last().unwrap_or_default())
            }] } }]
        })),
    )
}

#[tokio::test]
async fn test_diabetes_form_round_trip_preserves_fields() {
    let seen: Seen = Arc::default();
    let app = Router::new()
        .route("/predict", post(predict))
        .with_state(seen.clone());
    let base = spawn_stub(app).await;

    let mut form = DiabetesForm::default();
    form.apply_assignment("education_level=High School").unwrap();
    form.apply_assignment("hypertension_history=1").unwrap();
    form.apply_assignment("screen_time_hours_per_day=5.25").unwrap();

    let orch = RequestOrchestrator::new(
        Panel::Diabetes,
        Endpoint::inference(&format!("{}/predict", base)),
        transport(),
    );
    let terminal = orch
        .submit(AnalysisRequest::diabetes(form.clone()).unwrap())
        .unwrap()
        .await;

    match terminal {
        RequestState::Succeeded {
            result: AnalysisResult::Risk(risk),
        } => {
            assert_eq!(risk.risk_level, RiskLevel::High);
            assert!((risk.percent() - 71.0).abs() < 1e-9);
        }
        other => panic!("unexpected {:?}", other),
    }

    let received = seen.lock().unwrap().pop().unwrap();
    for name in FIELD_NAMES {
        assert!(received.get(name).is_some(), "missing {}", name);
    }
    assert!(received["age"].is_f64());
    assert!(received["screen_time_hours_per_day"].is_f64());
    assert!(received["education_level"].is_string());
    assert!(received["hypertension_history"].is_u64());

    let decoded: DiabetesForm = serde_json::from_value(received).unwrap();
    assert_eq!(decoded, form);
}

#[tokio::test]
async fn test_lesion_upload_is_preprocessed_multipart() {
    let seen: Seen = Arc::default();
    let app = Router::new()
        .route("/classify", post(classify))
        .with_state(seen.clone());
    let base = spawn_stub(app).await;

    // Pseudo-random noise so the PNG stays large
    let original = RgbImage::from_fn(1200, 900, |x, y| {
        let h = x.wrapping_mul(73_856_093) ^ y.wrapping_mul(19_349_663);
        Rgb([h as u8, (h >> 8) as u8, (h >> 16) as u8])
    });
    let mut png = Cursor::new(Vec::new());
    original.write_to(&mut png, ImageFormat::Png).unwrap();
    let png = png.into_inner();

    let encoded = preprocess::resize(&png, 100, 75).unwrap();
    let orch = RequestOrchestrator::new(
        Panel::Lesion,
        Endpoint::inference(&format!("{}/classify", base)),
        transport(),
    );
    let terminal = orch
        .submit(AnalysisRequest::lesion(encoded).unwrap())
        .unwrap()
        .await;

    match terminal {
        RequestState::Succeeded {
            result: AnalysisResult::Classification(c),
        } => {
            assert_eq!(c.label, "Benign keratosis");
            assert!((c.confidence_score - 93.0).abs() < 1e-9);
        }
        other => panic!("unexpected {:?}", other),
    }

    let upload = seen.lock().unwrap().pop().unwrap();
    assert_eq!(upload["content_type"], "image/jpeg");
    assert_eq!(upload["width"], 100);
    assert_eq!(upload["height"], 75);
    assert!((upload["bytes"].as_u64().unwrap() as usize) < png.len() / 10);
}

#[tokio::test]
async fn test_non_success_status_is_failed() {
    let app = Router::new().route("/predict", post(overloaded));
    let base = spawn_stub(app).await;

    let orch = RequestOrchestrator::new(
        Panel::Triage,
        Endpoint::inference(&format!("{}/predict", base)),
        transport(),
    );
    let terminal = orch
        .submit(AnalysisRequest::triage("chest pain").unwrap())
        .unwrap()
        .await;

    assert_eq!(
        terminal.failure_code(),
        Some(medai_shared::ScreeningError::Network(String::new()).code())
    );
    match terminal {
        RequestState::Failed { reason, .. } => {
            assert!(!reason.contains("503"));
            assert!(!reason.contains("warming"));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn test_generative_triage_with_api_key() {
    let app = Router::new().route("/generate", post(generative));
    let base = spawn_stub(app).await;

    let mut endpoint = Endpoint::generative(&format!("{}/generate", base));
    endpoint.api_key = Some("test-key".to_string());

    let orch = RequestOrchestrator::new(Panel::Triage, endpoint, transport());
    let terminal = orch
        .submit(AnalysisRequest::triage("persistent dry cough").unwrap())
        .unwrap()
        .await;

    assert_eq!(
        terminal,
        RequestState::Succeeded {
            result: AnalysisResult::Narrative {
                text: "Advice for: Symptoms: persistent dry cough".to_string()
            }
        }
    );
}

#[tokio::test]
async fn test_generative_without_key_is_rejected() {
    let app = Router::new().route("/generate", post(generative));
    let base = spawn_stub(app).await;

    let orch = RequestOrchestrator::new(
        Panel::Triage,
        Endpoint::generative(&format!("{}/generate", base)),
        transport(),
    );
    let terminal = orch
        .submit(AnalysisRequest::triage("headache").unwrap())
        .unwrap()
        .await;
    assert!(matches!(terminal, RequestState::Failed { .. }));
}
