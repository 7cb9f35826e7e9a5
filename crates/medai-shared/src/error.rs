//! Error types for MedAI screening flows.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScreeningError {
    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Service error: {0}")]
    Service(String),

    #[error("An analysis is already in flight for this panel")]
    AlreadyInFlight,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ScreeningError {
    pub fn code(&self) -> i32 {
        match self {
            ScreeningError::Encode(_) => -32010,
            ScreeningError::Network(_) => -32011,
            ScreeningError::MalformedResponse(_) => -32700,
            ScreeningError::Service(_) => -32012,
            ScreeningError::AlreadyInFlight => -32013,
            ScreeningError::InvalidInput(_) => -32602,
            ScreeningError::Config(_) => -32014,
        }
    }

    /// Message safe to show to an end user.
    ///
    /// Transport and parser details stay in the logs; only input and
    /// configuration problems echo their detail, since the user caused them.
    pub fn user_message(&self) -> String {
        match self {
            ScreeningError::Encode(_) => "The image could not be prepared for upload.".to_string(),
            ScreeningError::Network(_) => {
                "The analysis service could not be reached. Please try again.".to_string()
            }
            ScreeningError::MalformedResponse(_) => {
                "The analysis service returned an unexpected response.".to_string()
            }
            ScreeningError::Service(_) => {
                "The analysis service could not process this request.".to_string()
            }
            ScreeningError::AlreadyInFlight => {
                "An analysis is already running for this panel.".to_string()
            }
            ScreeningError::InvalidInput(detail) => format!("Invalid input: {}", detail),
            ScreeningError::Config(detail) => format!("Configuration error: {}", detail),
        }
    }
}

impl From<serde_json::Error> for ScreeningError {
    fn from(e: serde_json::Error) -> Self {
        ScreeningError::MalformedResponse(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_hides_transport_detail() {
        let err = ScreeningError::Network("tcp connect error: 10.0.0.3:443 refused".to_string());
        let msg = err.user_message();
        assert!(!msg.contains("10.0.0.3"));
        assert!(!msg.contains("tcp"));

        let err = ScreeningError::MalformedResponse("expected `,` at line 1 column 9".to_string());
        assert!(!err.user_message().contains("column"));
    }

    #[test]
    fn test_codes_are_distinct() {
        let all = [
            ScreeningError::Encode(String::new()),
            ScreeningError::Network(String::new()),
            ScreeningError::MalformedResponse(String::new()),
            ScreeningError::Service(String::new()),
            ScreeningError::AlreadyInFlight,
            ScreeningError::InvalidInput(String::new()),
            ScreeningError::Config(String::new()),
        ];
        let mut codes: Vec<i32> = all.iter().map(|e| e.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), all.len());
    }
}
