//! API DTOs (Data Transfer Objects)

use serde::Serialize;

/// GET /csrf-token response
#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// GET /csrf-token rejection
#[derive(Debug, Clone, Serialize)]
pub struct OriginErrorResponse {
    pub error: &'static str,
}

impl OriginErrorResponse {
    pub fn invalid_origin() -> Self {
        Self {
            error: "Invalid origin",
        }
    }
}

/// POST /submit-contact-form success envelope
///
/// Failures use the kernel envelope with the same shape.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub message: String,
}

impl SubmitResponse {
    pub fn success(message: String) -> Self {
        Self {
            success: true,
            message,
        }
    }
}
