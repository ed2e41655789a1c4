//! Collaborator Traits
//!
//! Interfaces for the rate-limit store and the external services.
//! Implementations are in the infrastructure layer.

use platform::rate_limit::{RateLimitPolicy, RateLimitReason};
use std::net::IpAddr;
use std::time::Duration;

use crate::error::{CaptchaError, ContactResult, CrmError, MailError};

/// Rate-limit store trait
#[trait_variant::make(RateLimitStore: Send)]
pub trait LocalRateLimitStore {
    /// Check the policy and record the submission under one exclusive lock
    async fn admit(
        &self,
        key: &str,
        now: i64,
        policy: &RateLimitPolicy,
    ) -> ContactResult<Option<RateLimitReason>>;

    /// Read-only policy check
    async fn should_reject(
        &self,
        key: &str,
        now: i64,
        policy: &RateLimitPolicy,
    ) -> ContactResult<Option<RateLimitReason>>;

    /// Record a submission without checking
    async fn record(&self, key: &str, now: i64, policy: &RateLimitPolicy) -> ContactResult<()>;

    /// Delete records untouched for longer than `max_age`; returns the count
    async fn sweep(&self, max_age: Duration) -> ContactResult<usize>;
}

/// Outcome of a CAPTCHA check that reached the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptchaVerdict {
    pub success: bool,
    pub error_codes: Vec<String>,
}

impl CaptchaVerdict {
    pub fn passed() -> Self {
        Self {
            success: true,
            error_codes: Vec::new(),
        }
    }

    pub fn failed(code: impl Into<String>) -> Self {
        Self {
            success: false,
            error_codes: vec![code.into()],
        }
    }
}

/// CAPTCHA verifier trait
#[trait_variant::make(CaptchaVerifier: Send)]
pub trait LocalCaptchaVerifier {
    /// Verify a client response token with the provider
    async fn verify(
        &self,
        response_token: &str,
        remote_ip: Option<IpAddr>,
    ) -> Result<CaptchaVerdict, CaptchaError>;
}

/// Mail participant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailAddress {
    pub name: Option<String>,
    pub email: String,
}

impl MailAddress {
    pub fn new(name: Option<&str>, email: impl Into<String>) -> Self {
        Self {
            name: name.map(str::to_string),
            email: email.into(),
        }
    }
}

/// Fully composed message (HTML with plaintext alternative)
#[derive(Debug, Clone)]
pub struct OutgoingMail {
    pub from: MailAddress,
    pub to: MailAddress,
    pub reply_to: Option<MailAddress>,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Mail transport trait
#[trait_variant::make(MailTransport: Send)]
pub trait LocalMailTransport {
    /// Deliver one message; no retries
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError>;
}

/// Contact record pushed to the CRM
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrmContact {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub mobile_phone: Option<String>,
    pub subject: String,
    pub message: String,
}

/// CRM client trait
#[trait_variant::make(CrmClient: Send)]
pub trait LocalCrmClient {
    /// Create or update the contact keyed by email
    async fn upsert_contact(&self, contact: &CrmContact) -> Result<(), CrmError>;
}
