//! Contact Error Types
//!
//! Pipeline rejections and collaborator failures, integrated with the
//! unified `kernel::error::AppError` system.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use platform::rate_limit::RateLimitReason;
use thiserror::Error;

use crate::application::messages::{Lang, MessageCatalog};

/// Contact-specific result type alias
pub type ContactResult<T> = Result<T, ContactError>;

/// Submission pipeline error variants
#[derive(Debug, Error)]
pub enum ContactError {
    /// Origin/Referer not trusted
    #[error("Invalid origin")]
    InvalidOrigin,

    /// CSRF token missing or not matching the session
    #[error("CSRF token mismatch")]
    CsrfMismatch,

    /// Client throttled
    #[error("Rate limited: {0}")]
    RateLimited(RateLimitReason),

    /// No CAPTCHA response submitted
    #[error("CAPTCHA response missing")]
    CaptchaMissing,

    /// Provider rejected the CAPTCHA response
    #[error("CAPTCHA verification failed")]
    CaptchaFailed,

    /// Provider unreachable or answered with an error status
    #[error("CAPTCHA provider unavailable: {0}")]
    CaptchaUnavailable(String),

    /// Email present but malformed
    #[error("Invalid email address")]
    InvalidEmail,

    /// A required field is empty
    #[error("Required fields missing")]
    FieldsIncomplete,

    /// Notification mail could not be delivered
    #[error(transparent)]
    Mail(#[from] MailError),

    /// Body could not be parsed
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// Rate-limit store I/O
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// SMTP delivery failure classes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MailError {
    #[error("SMTP connection failed: {0}")]
    Connection(String),

    #[error("SMTP authentication failed: {0}")]
    Authentication(String),

    #[error("SMTP send failed: {0}")]
    Send(String),
}

/// CAPTCHA provider call failed before a verdict was obtained
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptchaError {
    #[error("CAPTCHA provider unavailable: {0}")]
    Unavailable(String),
}

/// CRM synchronisation failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CrmError {
    /// No API key configured
    #[error("CRM integration not configured")]
    NotConfigured,

    #[error("CRM request failed: {0}")]
    Transport(String),

    #[error("CRM rejected request (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Mail template rendering or addressing failure
#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("Template rendering failed: {0}")]
    Template(#[from] askama::Error),
}

impl ContactError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ContactError::InvalidOrigin | ContactError::CsrfMismatch => StatusCode::FORBIDDEN,
            ContactError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ContactError::CaptchaMissing
            | ContactError::CaptchaFailed
            | ContactError::InvalidEmail
            | ContactError::FieldsIncomplete
            | ContactError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            ContactError::CaptchaUnavailable(_)
            | ContactError::Mail(_)
            | ContactError::Storage(_)
            | ContactError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ContactError::InvalidOrigin | ContactError::CsrfMismatch => ErrorKind::Forbidden,
            ContactError::RateLimited(_) => ErrorKind::TooManyRequests,
            ContactError::CaptchaMissing
            | ContactError::CaptchaFailed
            | ContactError::InvalidEmail
            | ContactError::FieldsIncomplete
            | ContactError::MalformedRequest(_) => ErrorKind::BadRequest,
            ContactError::CaptchaUnavailable(_)
            | ContactError::Mail(_)
            | ContactError::Storage(_)
            | ContactError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    /// Catalog id of the user-facing message
    ///
    /// Missing and failed CAPTCHA share one message.
    pub fn message_key(&self) -> &'static str {
        match self {
            ContactError::InvalidOrigin | ContactError::CsrfMismatch => "contact-error-csrf",
            ContactError::RateLimited(RateLimitReason::TooSoon) => "contact-error-rate-limit-wait",
            ContactError::RateLimited(RateLimitReason::QuotaExceeded) => {
                "contact-error-rate-limit-exceeded"
            }
            ContactError::CaptchaMissing | ContactError::CaptchaFailed => "contact-error-captcha",
            ContactError::CaptchaUnavailable(_) => "contact-error-captcha-unavailable",
            ContactError::InvalidEmail => "contact-error-email-invalid",
            ContactError::FieldsIncomplete => "contact-error-fields-incomplete",
            ContactError::Mail(MailError::Connection(_)) => "contact-error-smtp-connection",
            ContactError::Mail(MailError::Authentication(_)) => "contact-error-smtp-auth",
            ContactError::Mail(MailError::Send(_)) => "contact-error-email-send",
            ContactError::MalformedRequest(_) => "contact-error-invalid-request",
            ContactError::Storage(_) | ContactError::Internal(_) => "contact-error-technical",
        }
    }

    /// Convert to AppError carrying the localized user message
    pub fn to_app_error(&self, catalog: &MessageCatalog, lang: Lang) -> AppError {
        AppError::new(self.kind(), catalog.text(self.message_key(), lang))
    }

    /// Log the error with appropriate level
    pub(crate) fn log(&self) {
        match self {
            ContactError::Mail(MailError::Connection(detail)) => {
                tracing::error!(error = %detail, "SMTP connection error");
            }
            ContactError::Mail(MailError::Authentication(detail)) => {
                tracing::error!(error = %detail, "SMTP authentication error");
            }
            ContactError::Mail(MailError::Send(detail)) => {
                tracing::error!(error = %detail, "SMTP send error");
            }
            ContactError::CaptchaUnavailable(detail) => {
                tracing::error!(error = %detail, "CAPTCHA provider unavailable");
            }
            ContactError::Storage(e) => {
                tracing::error!(error = %e, "Rate-limit store error");
            }
            ContactError::Internal(msg) => {
                tracing::error!(message = %msg, "Contact internal error");
            }
            ContactError::InvalidOrigin
            | ContactError::CsrfMismatch
            | ContactError::RateLimited(_)
            | ContactError::CaptchaMissing
            | ContactError::CaptchaFailed => {
                tracing::warn!(error = %self, "Submission rejected");
            }
            _ => {
                tracing::debug!(error = %self, "Contact error");
            }
        }
    }
}

impl IntoResponse for ContactError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error(MessageCatalog::builtin(), Lang::default())
            .into_response()
    }
}

impl From<ContactError> for AppError {
    fn from(err: ContactError) -> Self {
        err.to_app_error(MessageCatalog::builtin(), Lang::default())
    }
}

impl From<CaptchaError> for ContactError {
    fn from(err: CaptchaError) -> Self {
        match err {
            CaptchaError::Unavailable(detail) => ContactError::CaptchaUnavailable(detail),
        }
    }
}

impl From<ComposeError> for ContactError {
    fn from(err: ComposeError) -> Self {
        ContactError::Internal(err.to_string())
    }
}
