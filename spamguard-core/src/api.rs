//! Request and response bodies shared by both HTTP shapes.

use serde::{Deserialize, Serialize};

use crate::data::Label;
use crate::error::{ErrorKind, Result, SpamError};

/// Body of every 400 response for a missing or empty message.
pub const NO_MESSAGE_PROVIDED: &str = "No message provided.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub prediction: Label,
}

/// Pull a non-empty `message` string out of a raw request body.
///
/// Anything else (invalid JSON, a non-object body, a missing, non-string or
/// empty `message`) is [`SpamError::InvalidInput`].
pub fn extract_message(body: &[u8]) -> Result<String> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|_| SpamError::invalid_input(NO_MESSAGE_PROVIDED))?;
    match value.get("message").and_then(|m| m.as_str()) {
        Some(message) => validate_message(message.to_string()),
        None => Err(SpamError::invalid_input(NO_MESSAGE_PROVIDED)),
    }
}

/// Reject an empty message. Whitespace-only text is still a message.
pub fn validate_message(message: String) -> Result<String> {
    if message.is_empty() {
        return Err(SpamError::invalid_input(NO_MESSAGE_PROVIDED));
    }
    Ok(message)
}

/// Body of a 500 response: `Error: ` followed by the fixed public message.
pub fn error_body(kind: ErrorKind) -> String {
    format!("Error: {}", kind.public_message())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_message() {
        assert_eq!(
            extract_message(br#"{"message": "WIN A FREE PRIZE NOW"}"#).unwrap(),
            "WIN A FREE PRIZE NOW"
        );
        // Extra fields are ignored.
        assert_eq!(
            extract_message(br#"{"message": "hi there", "id": 7}"#).unwrap(),
            "hi there"
        );
    }

    #[test]
    fn test_rejects_missing_or_empty() {
        for body in [
            &b"{}"[..],
            br#"{"message": ""}"#,
            br#"{"message": null}"#,
            br#"{"message": 42}"#,
            br#"["message"]"#,
            br#""message""#,
            b"not json",
            b"",
        ] {
            let err = extract_message(body).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput);
            assert!(err.to_string().ends_with(NO_MESSAGE_PROVIDED));
        }
    }

    #[test]
    fn test_validate_message() {
        assert_eq!(validate_message(" ".into()).unwrap(), " ");
        let err = validate_message(String::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_response_serializes_text_label() {
        let body = serde_json::to_string(&PredictionResponse {
            prediction: Label::Spam,
        })
        .unwrap();
        assert_eq!(body, r#"{"prediction":"spam"}"#);
    }

    #[test]
    fn test_error_body() {
        assert_eq!(
            error_body(ErrorKind::ModelRetrieval),
            "Error: model retrieval failed"
        );
    }
}
