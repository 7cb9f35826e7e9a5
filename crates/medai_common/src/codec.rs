//! Wire encoding of requests and decoding of responses per endpoint kind.

use crate::config::EndpointKind;
use crate::generative;
use crate::transport::WireBody;
use medai_shared::result::{narrative, parse_classification, parse_risk, parse_triage};
use medai_shared::{AnalysisRequest, AnalysisResult, Panel, RequestPayload, ScreeningError};
use serde_json::{json, Value};

/// Multipart field carrying the image for inference endpoints
pub const IMAGE_FIELD: &str = "file";

pub fn encode(request: &AnalysisRequest, kind: EndpointKind) -> Result<WireBody, ScreeningError> {
    if kind == EndpointKind::Generative {
        return Ok(WireBody::Json(generative::request_body(request)?));
    }

    match request.payload() {
        RequestPayload::Image(image) => Ok(WireBody::Multipart {
            field: IMAGE_FIELD,
            file_name: image.file_name().to_string(),
            mime: image.mime.to_string(),
            bytes: image.bytes.clone(),
        }),
        RequestPayload::Form(form) => serde_json::to_value(form)
            .map(WireBody::Json)
            .map_err(|e| ScreeningError::Encode(format!("form serialization: {}", e))),
        RequestPayload::Symptoms(symptoms) => Ok(WireBody::Json(json!({ "symptoms": symptoms }))),
    }
}

pub fn decode(panel: Panel, kind: EndpointKind, body: &[u8]) -> Result<AnalysisResult, ScreeningError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ScreeningError::MalformedResponse(format!("response is not JSON: {}", e)))?;

    match kind {
        EndpointKind::Inference => match panel {
            Panel::Lesion => parse_classification(value),
            Panel::Diabetes => parse_risk(value),
            Panel::Triage => parse_triage(value),
        },
        EndpointKind::Generative => {
            let text = generative::reply_text(&value)?;
            match panel {
                Panel::Triage => narrative(&text),
                Panel::Lesion => parse_classification(generative::extract_json_object(&text)?),
                Panel::Diabetes => parse_risk(generative::extract_json_object(&text)?),
            }
        }
    }
}
