//! MedAI common services: configuration, image preprocessing, transport,
//! wire codec and the request orchestrator.

pub mod codec;
pub mod config;
pub mod generative;
pub mod orchestrator;
pub mod preprocess;
pub mod transport;

pub use config::{Endpoint, EndpointKind, MedaiConfig};
pub use orchestrator::{PendingAnalysis, RequestOrchestrator, CANCELLED_REASON};
pub use preprocess::{resize, ImagePreprocessor};
pub use transport::{AnalysisTransport, FakeReply, FakeTransport, HttpTransport, WireBody};
