//! Exit codes for medaictl

use medai_shared::{RequestState, ScreeningError};

/// Exit code for success
pub const EXIT_SUCCESS: i32 = 0;

/// Exit code when the analysis ended in a failure state
pub const EXIT_ANALYSIS_FAILED: i32 = 1;

/// Exit code for bad arguments or form values
pub const EXIT_INVALID_INPUT: i32 = 64;

/// Exit code when the service answered with something unparseable
pub const EXIT_INVALID_RESPONSE: i32 = 65;

/// Exit code when the service could not be reached
pub const EXIT_SERVICE_UNAVAILABLE: i32 = 70;

/// Exit code for missing or invalid configuration
pub const EXIT_CONFIG: i32 = 78;

/// Exit code for an error returned before a request was accepted
pub fn for_error(error: &ScreeningError) -> i32 {
    match error {
        ScreeningError::InvalidInput(_) => EXIT_INVALID_INPUT,
        ScreeningError::Config(_) => EXIT_CONFIG,
        ScreeningError::MalformedResponse(_) => EXIT_INVALID_RESPONSE,
        ScreeningError::Network(_) => EXIT_SERVICE_UNAVAILABLE,
        ScreeningError::Encode(_)
        | ScreeningError::Service(_)
        | ScreeningError::AlreadyInFlight => EXIT_ANALYSIS_FAILED,
    }
}

/// Exit code for a terminal state, keyed on the failure's error code
pub fn for_state(state: &RequestState) -> i32 {
    match state {
        RequestState::Succeeded { .. } => EXIT_SUCCESS,
        RequestState::Failed { code, .. } => {
            let malformed = ScreeningError::MalformedResponse(String::new()).code();
            let network = ScreeningError::Network(String::new()).code();
            match *code {
                Some(c) if c == malformed => EXIT_INVALID_RESPONSE,
                Some(c) if c == network => EXIT_SERVICE_UNAVAILABLE,
                _ => EXIT_ANALYSIS_FAILED,
            }
        }
        RequestState::Idle | RequestState::InFlight { .. } => EXIT_ANALYSIS_FAILED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medai_shared::AnalysisResult;

    #[test]
    fn test_terminal_state_codes() {
        let ok = RequestState::Succeeded {
            result: AnalysisResult::Narrative {
                text: "Rest.".to_string(),
            },
        };
        assert_eq!(for_state(&ok), EXIT_SUCCESS);

        let malformed =
            RequestState::failed_with(&ScreeningError::MalformedResponse("eof".into()));
        assert_eq!(for_state(&malformed), EXIT_INVALID_RESPONSE);

        let unreachable = RequestState::failed_with(&ScreeningError::Network("refused".into()));
        assert_eq!(for_state(&unreachable), EXIT_SERVICE_UNAVAILABLE);

        let service = RequestState::failed_with(&ScreeningError::Service("dark".into()));
        assert_eq!(for_state(&service), EXIT_ANALYSIS_FAILED);
    }

    #[test]
    fn test_state_code_ignores_reason_text() {
        // Same wording as a network failure, but no error code behind it
        let reworded = RequestState::failed(ScreeningError::Network(String::new()).user_message());
        assert_eq!(for_state(&reworded), EXIT_ANALYSIS_FAILED);

        let relabelled = RequestState::Failed {
            reason: "Something else entirely.".to_string(),
            code: Some(ScreeningError::MalformedResponse(String::new()).code()),
        };
        assert_eq!(for_state(&relabelled), EXIT_INVALID_RESPONSE);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(for_error(&ScreeningError::Config("x".into())), EXIT_CONFIG);
        assert_eq!(
            for_error(&ScreeningError::InvalidInput("x".into())),
            EXIT_INVALID_INPUT
        );
        assert_eq!(for_error(&ScreeningError::Encode("x".into())), EXIT_ANALYSIS_FAILED);
    }
}
