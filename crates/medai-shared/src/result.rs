//! Analysis results and the response schemas they are parsed from.
//!
//! Every response is validated against its schema; a missing field or an
//! out-of-range score is a `MalformedResponse`, never a silent default.

use crate::error::ScreeningError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Moderate => write!(f, "Moderate"),
            Self::High => write!(f, "High"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    /// Percentage in [0, 100]
    pub confidence_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskOutcome {
    /// Probability in [0, 1]
    pub probability_score: f64,
    pub risk_level: RiskLevel,
    pub narrative: String,
}

impl RiskOutcome {
    pub fn percent(&self) -> f64 {
        self.probability_score * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisResult {
    Classification(Classification),
    Risk(RiskOutcome),
    Narrative { text: String },
}

/// `{label, confidence}` or `{error}` from the lesion classifier
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ClassificationResponse {
    Label { label: String, confidence: f64 },
    Error { error: String },
}

/// `{probability_score, risk_assessment, detailed_analysis}` or `{error}`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RiskResponse {
    Assessment {
        probability_score: f64,
        risk_assessment: RiskLevel,
        detailed_analysis: String,
    },
    Error {
        error: String,
    },
}

/// `{advice}` or `{error}` from the triage service
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TriageResponse {
    Advice { advice: String },
    Error { error: String },
}

fn malformed(detail: impl Into<String>) -> ScreeningError {
    ScreeningError::MalformedResponse(detail.into())
}

/// Normalize a confidence to a percentage. Values in [0, 1] are fractions.
fn confidence_percent(confidence: f64) -> Result<f64, ScreeningError> {
    if !confidence.is_finite() || confidence < 0.0 {
        return Err(malformed(format!("confidence out of range: {}", confidence)));
    }
    if confidence <= 1.0 {
        Ok(confidence * 100.0)
    } else if confidence <= 100.0 {
        Ok(confidence)
    } else {
        Err(malformed(format!("confidence out of range: {}", confidence)))
    }
}

impl ClassificationResponse {
    pub fn into_result(self) -> Result<AnalysisResult, ScreeningError> {
        match self {
            Self::Error { error } => Err(ScreeningError::Service(error)),
            Self::Label { label, confidence } => {
                let label = label.trim();
                if label.is_empty() {
                    return Err(malformed("empty label"));
                }
                Ok(AnalysisResult::Classification(Classification {
                    label: label.to_string(),
                    confidence_score: confidence_percent(confidence)?,
                }))
            }
        }
    }
}

impl RiskResponse {
    pub fn into_result(self) -> Result<AnalysisResult, ScreeningError> {
        match self {
            Self::Error { error } => Err(ScreeningError::Service(error)),
            Self::Assessment {
                probability_score,
                risk_assessment,
                detailed_analysis,
            } => {
                if !(0.0..=1.0).contains(&probability_score) {
                    return Err(malformed(format!(
                        "probability_score out of range: {}",
                        probability_score
                    )));
                }
                Ok(AnalysisResult::Risk(RiskOutcome {
                    probability_score,
                    risk_level: risk_assessment,
                    narrative: detailed_analysis,
                }))
            }
        }
    }
}

impl TriageResponse {
    pub fn into_result(self) -> Result<AnalysisResult, ScreeningError> {
        match self {
            Self::Error { error } => Err(ScreeningError::Service(error)),
            Self::Advice { advice } => narrative(&advice),
        }
    }
}

/// Narrative result from free text; blank text is malformed
pub fn narrative(text: &str) -> Result<AnalysisResult, ScreeningError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(malformed("empty narrative"));
    }
    Ok(AnalysisResult::Narrative {
        text: text.to_string(),
    })
}

pub fn parse_classification(value: serde_json::Value) -> Result<AnalysisResult, ScreeningError> {
    serde_json::from_value::<ClassificationResponse>(value)
        .map_err(|e| malformed(format!("classification schema: {}", e)))?
        .into_result()
}

pub fn parse_risk(value: serde_json::Value) -> Result<AnalysisResult, ScreeningError> {
    serde_json::from_value::<RiskResponse>(value)
        .map_err(|e| malformed(format!("risk schema: {}", e)))?
        .into_result()
}

pub fn parse_triage(value: serde_json::Value) -> Result<AnalysisResult, ScreeningError> {
    serde_json::from_value::<TriageResponse>(value)
        .map_err(|e| malformed(format!("triage schema: {}", e)))?
        .into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classification_fraction_and_percent() {
        let r = parse_classification(json!({"label": "Melanoma", "confidence": 0.87})).unwrap();
        match r {
            AnalysisResult::Classification(c) => {
                assert_eq!(c.label, "Melanoma");
                assert!((c.confidence_score - 87.0).abs() < 1e-9);
            }
            other => panic!("unexpected {:?}", other),
        }

        let r = parse_classification(json!({"label": "Nevus", "confidence": 64.5})).unwrap();
        match r {
            AnalysisResult::Classification(c) => assert_eq!(c.confidence_score, 64.5),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_classification_rejects_bad_shapes() {
        assert!(matches!(
            parse_classification(json!({"label": "Melanoma"})),
            Err(ScreeningError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_classification(json!({"label": "x", "confidence": 140})),
            Err(ScreeningError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_classification(json!({"label": " ", "confidence": 0.5})),
            Err(ScreeningError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_classification(json!({"error": "no lesion found"})),
            Err(ScreeningError::Service(_))
        ));
    }

    #[test]
    fn test_risk_parsing() {
        let r = parse_risk(json!({
            "probability_score": 0.62,
            "risk_assessment": "Moderate",
            "detailed_analysis": "Elevated BMI and family history."
        }))
        .unwrap();
        match r {
            AnalysisResult::Risk(risk) => {
                assert_eq!(risk.risk_level, RiskLevel::Moderate);
                assert!((risk.percent() - 62.0).abs() < 1e-9);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_risk_rejects_schema_mismatch() {
        assert!(parse_risk(json!({
            "probability_score": 1.4,
            "risk_assessment": "High",
            "detailed_analysis": ""
        }))
        .is_err());
        assert!(parse_risk(json!({
            "probability_score": 0.4,
            "risk_assessment": "Severe",
            "detailed_analysis": ""
        }))
        .is_err());
        assert!(parse_risk(json!({"status": "error"})).is_err());
    }

    #[test]
    fn test_triage_parsing() {
        assert!(matches!(
            parse_triage(json!({"advice": "Rest and hydrate."})),
            Ok(AnalysisResult::Narrative { .. })
        ));
        assert!(parse_triage(json!({"advice": ""})).is_err());
    }

    #[test]
    fn test_result_serializes_with_kind_tag() {
        let r = AnalysisResult::Narrative {
            text: "ok".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&r).unwrap(),
            json!({"kind": "narrative", "text": "ok"})
        );
    }
}
