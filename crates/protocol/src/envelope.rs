use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Stable error taxonomy shared across the substrate.
///
/// The serialized form (SCREAMING_SNAKE_CASE) is part of the external
/// contract; add variants, never rename them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    OutsideAllowedRoots,
    TraversalDetected,
    NotAbsolute,
    FileNotFound,
    FileTooLarge,
    UnsupportedFileType,
    ChunkingImpossible,
    ModelUnavailable,
    ModelCallError,
    ModelTimeout,
    ParsingError,
    Cancelled,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OutsideAllowedRoots => "OUTSIDE_ALLOWED_ROOTS",
            Self::TraversalDetected => "TRAVERSAL_DETECTED",
            Self::NotAbsolute => "NOT_ABSOLUTE",
            Self::FileNotFound => "FILE_NOT_FOUND",
            Self::FileTooLarge => "FILE_TOO_LARGE",
            Self::UnsupportedFileType => "UNSUPPORTED_FILE_TYPE",
            Self::ChunkingImpossible => "CHUNKING_IMPOSSIBLE",
            Self::ModelUnavailable => "MODEL_UNAVAILABLE",
            Self::ModelCallError => "MODEL_CALL_ERROR",
            Self::ModelTimeout => "MODEL_TIMEOUT",
            Self::ParsingError => "PARSING_ERROR",
            Self::Cancelled => "CANCELLED",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorEnvelope {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// The only shape ever returned across the core's boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEnvelope {
    pub success: bool,
    /// Unix epoch milliseconds, stringified.
    pub timestamp: String,
    pub model_used: String,
    pub execution_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorEnvelope>,
}

impl ResultEnvelope {
    pub fn success(data: serde_json::Value, model_used: &str, execution_time_ms: u64) -> Self {
        Self {
            success: true,
            timestamp: unix_ms_now().to_string(),
            model_used: model_used.to_string(),
            execution_time_ms,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: ErrorEnvelope, model_used: &str, execution_time_ms: u64) -> Self {
        Self {
            success: false,
            timestamp: unix_ms_now().to_string(),
            model_used: model_used.to_string(),
            execution_time_ms,
            data: None,
            error: Some(error),
        }
    }
}

pub fn unix_ms_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn envelope_serializes_with_camel_case_and_stable_codes() {
        let envelope = ResultEnvelope::failure(
            ErrorEnvelope {
                code: ErrorCode::ModelTimeout,
                message: "model call exceeded 120s".to_string(),
                details: None,
            },
            "qwen2.5-coder",
            1500,
        );

        let raw = serde_json::to_value(&envelope).unwrap();
        assert_eq!(raw["success"], false);
        assert_eq!(raw["modelUsed"], "qwen2.5-coder");
        assert_eq!(raw["executionTimeMs"], 1500);
        assert_eq!(raw["error"]["code"], "MODEL_TIMEOUT");
        assert!(raw.get("data").is_none());
    }

    #[test]
    fn error_code_as_str_matches_serde() {
        for code in [
            ErrorCode::OutsideAllowedRoots,
            ErrorCode::TraversalDetected,
            ErrorCode::NotAbsolute,
            ErrorCode::FileNotFound,
            ErrorCode::FileTooLarge,
            ErrorCode::UnsupportedFileType,
            ErrorCode::ChunkingImpossible,
            ErrorCode::ModelUnavailable,
            ErrorCode::ModelCallError,
            ErrorCode::ModelTimeout,
            ErrorCode::ParsingError,
            ErrorCode::Cancelled,
        ] {
            let serialized = serde_json::to_value(code).unwrap();
            assert_eq!(serialized, code.as_str());
        }
    }
}
