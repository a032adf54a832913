//! Placeholder response for unconfigured or dry-run calls.

use crate::endpoint::BASE_URL_ENV;
use crate::schema::{make_empty_response, AnalyzeResponse, Feedback};
use crate::types::AnalyzeRequest;

/// Build the stub response for `request`.
///
/// Scores are all zero; the feedback explains how to point the client at a
/// real server; the transcript key is echoed back.
pub fn make_stub(request: &AnalyzeRequest) -> AnalyzeResponse {
    let mut stub = make_empty_response();
    stub.feedback = Feedback {
        vocabulary: "No server configured. This is a stub response.".to_string(),
        filler: "-".to_string(),
        clarity: "-".to_string(),
        idea: "-".to_string(),
        actions: vec![
            format!("Set {BASE_URL_ENV} to your backend URL."),
            "Call analyze() again to see live results.".to_string(),
        ],
    };
    stub.assets.transcript_key = request.transcript_key.clone();
    stub
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::validate_response;

    #[test]
    fn test_stub_echoes_key_and_zero_scores() {
        let stub = make_stub(&AnalyzeRequest::new("k"));
        assert_eq!(stub.assets.transcript_key, "k");
        assert!(stub.scores.iter().all(|(_, score)| score == 0.0));
        assert_eq!(stub.feedback.actions.len(), 2);
        assert!(stub.feedback.actions[0].contains("SPEAKMATE_API_BASE_URL"));
    }

    #[test]
    fn test_stub_with_empty_key() {
        let stub = make_stub(&AnalyzeRequest::new(""));
        assert_eq!(stub.assets.transcript_key, "");
    }

    #[test]
    fn test_stub_satisfies_contract() {
        let stub = make_stub(&AnalyzeRequest::new("uploads/7").with_language("fr"));
        let value = serde_json::to_value(&stub).unwrap();
        assert_eq!(validate_response(&value).unwrap(), stub);
    }
}
