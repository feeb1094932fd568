// POST /api/analyze: classify a text as offensive or not.
//
// Body: { "text": string, "threshold"?: number }
//
// The body is parsed by hand rather than through the Json extractor so that
// every malformed body (wrong content type, invalid JSON, missing text) gets
// the same 400 { "error": "No text provided" } response.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::classifier::ClassifyError;
use crate::output::truncate_chars;
use crate::web::{api_error, AppState};

/// A validated analyze request.
#[derive(Debug, PartialEq)]
pub struct AnalyzeRequest {
    pub text: String,
    pub threshold: Option<f64>,
}

/// Why a request body was rejected.
#[derive(Debug, PartialEq)]
pub enum RequestError {
    NoText,
    InvalidThreshold,
}

impl RequestError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::NoText => "No text provided",
            Self::InvalidThreshold => "Invalid threshold",
        }
    }
}

/// Parse the raw request body. `threshold` may be a number or a numeric
/// string; null or absent means "use the default".
pub fn parse_request(body: &[u8]) -> Result<AnalyzeRequest, RequestError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| RequestError::NoText)?;

    let text = value
        .get("text")
        .and_then(Value::as_str)
        .ok_or(RequestError::NoText)?
        .to_string();

    let threshold = match value.get("threshold") {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => Some(n.as_f64().ok_or(RequestError::InvalidThreshold)?),
        Some(Value::String(s)) => Some(
            crate::config::parse_threshold(s).map_err(|_| RequestError::InvalidThreshold)?,
        ),
        Some(_) => return Err(RequestError::InvalidThreshold),
    };

    Ok(AnalyzeRequest { text, threshold })
}

pub async fn analyze_text(State(state): State<AppState>, body: Bytes) -> Response {
    let request = match parse_request(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(reason = e.message(), "Rejected analyze request");
            return api_error(StatusCode::BAD_REQUEST, e.message());
        }
    };

    match state
        .classifier
        .analyze(&request.text, request.threshold)
        .await
    {
        Ok(analysis) => {
            info!(
                text_preview = %truncate_chars(&analysis.text, 80),
                label = %analysis.label,
                probability = analysis.probability,
                offensive_words = ?analysis.offensive_words,
                "Classified text"
            );
            (StatusCode::OK, Json(analysis)).into_response()
        }
        Err(ClassifyError::InvalidThreshold(_)) => {
            warn!("Rejected analyze request: non-finite threshold");
            api_error(StatusCode::BAD_REQUEST, RequestError::InvalidThreshold.message())
        }
        Err(ClassifyError::ModelUnavailable) => {
            warn!("Analyze request refused: model unavailable");
            api_error(StatusCode::SERVICE_UNAVAILABLE, "Model unavailable")
        }
        Err(e @ ClassifyError::Inference(_)) => {
            error!(
                error = %e,
                text_preview = %truncate_chars(&request.text, 80),
                "Classification failed"
            );
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Inference failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_only() {
        let req = parse_request(br#"{"text": "hello"}"#).unwrap();
        assert_eq!(req.text, "hello");
        assert_eq!(req.threshold, None);
    }

    #[test]
    fn test_parse_numeric_and_string_threshold() {
        let req = parse_request(br#"{"text": "a", "threshold": 0.7}"#).unwrap();
        assert_eq!(req.threshold, Some(0.7));
        let req = parse_request(br#"{"text": "a", "threshold": "0.25"}"#).unwrap();
        assert_eq!(req.threshold, Some(0.25));
        let req = parse_request(br#"{"text": "a", "threshold": null}"#).unwrap();
        assert_eq!(req.threshold, None);
    }

    #[test]
    fn test_empty_text_is_accepted() {
        assert_eq!(parse_request(br#"{"text": ""}"#).unwrap().text, "");
    }

    #[test]
    fn test_missing_or_malformed_text() {
        assert_eq!(parse_request(b"{}").unwrap_err(), RequestError::NoText);
        assert_eq!(parse_request(b"not json").unwrap_err(), RequestError::NoText);
        assert_eq!(parse_request(b"").unwrap_err(), RequestError::NoText);
        assert_eq!(parse_request(br#"{"text": 42}"#).unwrap_err(), RequestError::NoText);
        assert_eq!(parse_request(br#"["text"]"#).unwrap_err(), RequestError::NoText);
    }

    #[test]
    fn test_bad_threshold() {
        assert_eq!(
            parse_request(br#"{"text": "a", "threshold": "high"}"#).unwrap_err(),
            RequestError::InvalidThreshold
        );
        assert_eq!(
            parse_request(br#"{"text": "a", "threshold": [0.5]}"#).unwrap_err(),
            RequestError::InvalidThreshold
        );
    }
}
