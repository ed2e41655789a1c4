//! Domain Layer
//!
//! Origin policy, CSRF session, submission values and collaborator traits.

pub mod gateway;
pub mod origin;
pub mod submission;
pub mod token;

// Re-exports
pub use gateway::{
    CaptchaVerdict, CaptchaVerifier, CrmClient, CrmContact, MailAddress, MailTransport,
    OutgoingMail, RateLimitStore,
};
pub use origin::{OriginHeaders, OriginMatch, OriginValidator};
pub use submission::{Email, Rating, SubmissionFields, ValidSubmission};
pub use token::{CsrfToken, Session, SessionCodec};
