//! Infrastructure Layer
//!
//! File-backed rate-limit store and clients for the external services.

pub mod file_store;
pub mod hubspot;
pub mod recaptcha;
pub mod smtp;

pub use file_store::FileRateLimitStore;
pub use hubspot::HubSpotClient;
pub use recaptcha::RecaptchaVerifier;
pub use smtp::SmtpMailer;
