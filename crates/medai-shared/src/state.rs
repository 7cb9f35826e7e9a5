//! Request lifecycle state and the events published on each transition.

use crate::advisory::AdvisoryMessage;
use crate::error::ScreeningError;
use crate::request::Panel;
use crate::result::AnalysisResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of the single request a panel may have
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RequestState {
    Idle,
    InFlight {
        request_id: Uuid,
        started_at: DateTime<Utc>,
    },
    Succeeded {
        result: AnalysisResult,
    },
    Failed {
        reason: String,
        /// `ScreeningError::code()` of the cause, when there is one
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<i32>,
    },
}

impl Default for RequestState {
    fn default() -> Self {
        Self::Idle
    }
}

impl RequestState {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::InFlight { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded { .. } | Self::Failed { .. })
    }

    /// Whether this is the in-flight state of `id`
    pub fn is_in_flight_for(&self, id: Uuid) -> bool {
        matches!(self, Self::InFlight { request_id, .. } if *request_id == id)
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
            code: None,
        }
    }

    /// Failure caused by `error`: user-safe reason plus its numeric code
    pub fn failed_with(error: &ScreeningError) -> Self {
        Self::Failed {
            reason: error.user_message(),
            code: Some(error.code()),
        }
    }

    /// Error code of a failure, if it carries one
    pub fn failure_code(&self) -> Option<i32> {
        match self {
            Self::Failed { code, .. } => *code,
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::InFlight { .. } => "in_flight",
            Self::Succeeded { .. } => "succeeded",
            Self::Failed { .. } => "failed",
        }
    }
}

/// What happened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelEventKind {
    Started,
    Advisory(AdvisoryMessage),
    Terminal(RequestState),
}

/// Event published by the orchestrator during a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelEvent {
    pub panel: Panel,
    pub request_id: Uuid,
    /// Elapsed time since the request started (ms)
    pub elapsed_ms: u64,
    pub kind: PanelEventKind,
}

impl PanelEvent {
    pub fn started(panel: Panel, request_id: Uuid) -> Self {
        Self {
            panel,
            request_id,
            elapsed_ms: 0,
            kind: PanelEventKind::Started,
        }
    }

    pub fn advisory(panel: Panel, request_id: Uuid, message: AdvisoryMessage, elapsed_ms: u64) -> Self {
        Self {
            panel,
            request_id,
            elapsed_ms,
            kind: PanelEventKind::Advisory(message),
        }
    }

    pub fn terminal(panel: Panel, request_id: Uuid, state: RequestState, elapsed_ms: u64) -> Self {
        Self {
            panel,
            request_id,
            elapsed_ms,
            kind: PanelEventKind::Terminal(state),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, PanelEventKind::Terminal(_))
    }

    /// Format for debug display
    pub fn format_debug(&self) -> String {
        let elapsed = self.elapsed_ms as f64 / 1000.0;
        match &self.kind {
            PanelEventKind::Started => format!("[{}] started", self.panel),
            PanelEventKind::Advisory(msg) => {
                format!("[{}] {} ({:.1}s): {}", self.panel, msg.severity, elapsed, msg.text)
            }
            PanelEventKind::Terminal(state) => {
                format!("[{}] {} after {:.1}s", self.panel, state.label(), elapsed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisory::Severity;

    #[test]
    fn test_state_predicates() {
        let id = Uuid::new_v4();
        let in_flight = RequestState::InFlight {
            request_id: id,
            started_at: Utc::now(),
        };
        assert!(in_flight.is_in_flight());
        assert!(in_flight.is_in_flight_for(id));
        assert!(!in_flight.is_in_flight_for(Uuid::new_v4()));
        assert!(!in_flight.is_terminal());

        assert!(RequestState::failed("x").is_terminal());
        assert!(!RequestState::Idle.is_terminal());
        assert_eq!(RequestState::default(), RequestState::Idle);
    }

    #[test]
    fn test_event_format() {
        let id = Uuid::new_v4();
        let event = PanelEvent::advisory(
            Panel::Diabetes,
            id,
            AdvisoryMessage {
                severity: Severity::Info,
                text: "queued".to_string(),
            },
            30_000,
        );
        let line = event.format_debug();
        assert!(line.contains("diabetes"));
        assert!(line.contains("info"));
        assert!(line.contains("30.0s"));

        let done = PanelEvent::terminal(Panel::Lesion, id, RequestState::failed("x"), 1_500);
        assert!(done.is_terminal());
        assert!(done.format_debug().contains("failed after 1.5s"));
    }

    #[test]
    fn test_state_json_tag() {
        let json = serde_json::to_value(RequestState::failed("nope")).unwrap();
        assert_eq!(json["state"], "failed");
        assert_eq!(json["reason"], "nope");
        assert!(json.get("code").is_none());
    }

    #[test]
    fn test_failed_with_keeps_error_code() {
        let err = ScreeningError::Network("connection refused (os error 111)".to_string());
        let state = RequestState::failed_with(&err);
        assert_eq!(state.failure_code(), Some(err.code()));
        match &state {
            RequestState::Failed { reason, .. } => assert!(!reason.contains("os error")),
            other => panic!("unexpected {:?}", other),
        }

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["code"], err.code());
        let back: RequestState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }
}
