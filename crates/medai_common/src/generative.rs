//! Generic LLM endpoint support.
//!
//! Request bodies use the `{"contents":[{"parts":[...]}]}` shape; replies
//! carry text at `candidates[0].content.parts[0].text`. Panels that expect
//! structured output ask for JSON and pull the first object out of the
//! reply text, since models like to wrap it in prose or code fences.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use medai_shared::{AnalysisRequest, RequestPayload, ScreeningError};
use regex::Regex;
use serde_json::{json, Value};
use std::sync::OnceLock;

const LESION_PROMPT: &str = "You are screening a dermatoscopic image for malignancy. \
Respond with JSON only, shaped as {\"label\": string, \"confidence\": number between 0 and 1}.";

const TRIAGE_PROMPT: &str = "You are a clinical triage advisor. Give cautious, plain-language \
guidance on urgency and possible next steps for these patient-reported symptoms. \
Always recommend seeing a clinician for anything serious.";

fn diabetes_prompt(form_json: &str) -> String {
    format!(
        "You are a diabetes risk scoring service.\n\
         Patient record: {}\n\
         Estimate the probability of type 2 diabetes between 0 and 1 and classify it as \
         Low, Moderate or High risk. Respond with JSON only, shaped as \
         {{\"probability_score\": number, \"risk_assessment\": \"Low\"|\"Moderate\"|\"High\", \
         \"detailed_analysis\": string}}.",
        form_json
    )
}

/// Build the `contents/parts` body for `request`
pub fn request_body(request: &AnalysisRequest) -> Result<Value, ScreeningError> {
    let parts = match request.payload() {
        RequestPayload::Image(image) => json!([
            { "text": LESION_PROMPT },
            { "inlineData": { "mimeType": image.mime, "data": STANDARD.encode(&image.bytes) } }
        ]),
        RequestPayload::Form(form) => {
            let form_json = serde_json::to_string(form)
                .map_err(|e| ScreeningError::Encode(format!("form serialization: {}", e)))?;
            json!([{ "text": diabetes_prompt(&form_json) }])
        }
        RequestPayload::Symptoms(symptoms) => {
            json!([{ "text": format!("{}\n\nSymptoms: {}", TRIAGE_PROMPT, symptoms) }])
        }
    };
    Ok(json!({ "contents": [{ "parts": parts }] }))
}

/// Text of the first candidate's first part
pub fn reply_text(reply: &Value) -> Result<String, ScreeningError> {
    reply
        .get("candidates")
        .and_then(|v| v.get(0))
        .and_then(|v| v.get("content"))
        .and_then(|v| v.get("parts"))
        .and_then(|v| v.get(0))
        .and_then(|v| v.get("text"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| {
            ScreeningError::MalformedResponse("no candidate text in generative reply".to_string())
        })
}

fn object_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("static regex"))
}

/// Extract the outermost `{...}` span from free text and parse it
pub fn extract_json_object(text: &str) -> Result<Value, ScreeningError> {
    let span = object_pattern().find(text).ok_or_else(|| {
        ScreeningError::MalformedResponse("no JSON object in generative reply".to_string())
    })?;
    serde_json::from_str(span.as_str()).map_err(|e| {
        ScreeningError::MalformedResponse(format!("JSON in generative reply: {}", e))
    })
}
