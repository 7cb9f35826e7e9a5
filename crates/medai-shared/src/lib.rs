//! Shared types for MedAI screening panels.
//!
//! Pure data and pure functions only: no I/O, no runtime.

pub mod advisory;
pub mod error;
pub mod form;
pub mod request;
pub mod result;
pub mod state;

pub use advisory::{advise, AdvisoryMessage, AdvisoryThresholds, AdvisoryTracker, LatencyBand, Severity};
pub use error::ScreeningError;
pub use form::DiabetesForm;
pub use request::{AnalysisRequest, EncodedImage, Panel, RequestPayload};
pub use result::{AnalysisResult, Classification, RiskLevel, RiskOutcome};
pub use state::{PanelEvent, PanelEventKind, RequestState};
