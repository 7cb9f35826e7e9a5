//! Analysis requests submitted by a panel.

use crate::error::ScreeningError;
use crate::form::DiabetesForm;
use serde::{Deserialize, Serialize};

/// One of the three screening flows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Panel {
    Lesion,
    Diabetes,
    Triage,
}

impl Panel {
    pub const ALL: [Panel; 3] = [Panel::Lesion, Panel::Diabetes, Panel::Triage];

    pub fn title(&self) -> &'static str {
        match self {
            Self::Lesion => "Lesion Classification",
            Self::Diabetes => "Diabetes Risk",
            Self::Triage => "Symptom Triage",
        }
    }
}

impl std::fmt::Display for Panel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lesion => write!(f, "lesion"),
            Self::Diabetes => write!(f, "diabetes"),
            Self::Triage => write!(f, "triage"),
        }
    }
}

/// Preprocessed image ready for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub mime: &'static str,
}

impl EncodedImage {
    pub fn file_name(&self) -> &'static str {
        match self.mime {
            "image/png" => "lesion.png",
            _ => "lesion.jpg",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestPayload {
    Image(EncodedImage),
    Form(DiabetesForm),
    Symptoms(String),
}

/// An immutable analysis request. Built through the per-panel constructors,
/// which guarantee the payload matches the panel.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    panel: Panel,
    payload: RequestPayload,
}

impl AnalysisRequest {
    pub fn lesion(image: EncodedImage) -> Result<Self, ScreeningError> {
        if image.bytes.is_empty() {
            return Err(ScreeningError::InvalidInput("image is empty".to_string()));
        }
        Ok(Self {
            panel: Panel::Lesion,
            payload: RequestPayload::Image(image),
        })
    }

    pub fn diabetes(form: DiabetesForm) -> Result<Self, ScreeningError> {
        form.validate()?;
        Ok(Self {
            panel: Panel::Diabetes,
            payload: RequestPayload::Form(form),
        })
    }

    pub fn triage(symptoms: &str) -> Result<Self, ScreeningError> {
        let symptoms = symptoms.trim();
        if symptoms.is_empty() {
            return Err(ScreeningError::InvalidInput(
                "describe at least one symptom".to_string(),
            ));
        }
        Ok(Self {
            panel: Panel::Triage,
            payload: RequestPayload::Symptoms(symptoms.to_string()),
        })
    }

    pub fn panel(&self) -> Panel {
        self.panel
    }

    pub fn payload(&self) -> &RequestPayload {
        &self.payload
    }
}
