//! Conversions into [`AppError`]
//!
//! Startup documents (message catalog, link lists) are read from disk and
//! parsed as JSON; both failures are server-side.

use super::app_error::AppError;

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::internal("Failed to read file").with_source(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        let message = if err.is_eof() {
            "JSON document is truncated"
        } else {
            "Invalid JSON document"
        };
        AppError::internal(message).with_source(err)
    }
}

/// Renders the `{"success": false, "message": "..."}` envelope
#[cfg(feature = "axum")]
impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::Json;
        use axum::http::StatusCode;

        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        (status, Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::kind::ErrorKind;
    use std::error::Error;

    #[test]
    fn test_io_error_is_internal() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "messages.json");
        let app_err: AppError = io_err.into();
        assert_eq!(app_err.kind(), ErrorKind::InternalServerError);
        assert!(app_err.source().is_some());
        assert!(!app_err.message().contains("messages.json"));
    }

    #[test]
    fn test_json_error_messages() {
        let err: AppError = serde_json::from_str::<serde_json::Value>("{\"a\":")
            .unwrap_err()
            .into();
        assert_eq!(err.message(), "JSON document is truncated");

        let err: AppError = serde_json::from_str::<serde_json::Value>("nope")
            .unwrap_err()
            .into();
        assert_eq!(err.message(), "Invalid JSON document");
        assert_eq!(err.status_code(), 500);
    }
}
