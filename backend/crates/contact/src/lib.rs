//! Contact Form Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Origin policy, CSRF session, submission values, collaborator traits
//! - `application/` - Configuration, message catalog, mail composition, use cases
//! - `infra/` - File-backed rate-limit store, reCAPTCHA, SMTP and HubSpot clients
//! - `presentation/` - HTTP extractors, handlers, router
//!
//! ## Endpoints
//! - `GET /csrf-token` - issue the per-session anti-forgery token
//! - `POST /submit-contact-form` - run the submission pipeline
//!
//! ## Security Model
//! - Origin/Referer checked against an allow-list before anything else
//! - CSRF token bound to an HMAC-signed session cookie
//! - Per-client quota persisted in a file store under an exclusive lock
//! - CAPTCHA verification fails closed

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;


// Re-exports for convenience
pub use application::config::{CaptchaConfig, ContactConfig, CrmConfig, SmtpConfig, SmtpEncryption};
pub use application::messages::{Lang, MessageCatalog};
pub use error::{ContactError, ContactResult};
pub use infra::{FileRateLimitStore, HubSpotClient, RecaptchaVerifier, SmtpMailer};
pub use presentation::handlers::ContactAppState;
pub use presentation::router::contact_router;

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};
