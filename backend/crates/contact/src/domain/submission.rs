//! Submission Value Objects
//!
//! Validation of the submitted form fields. Values are stored as typed
//! (trimmed, never HTML-escaped); escaping happens when rendering.

use serde::Serialize;

use crate::error::{ContactError, ContactResult};

/// Maximum email length (per RFC 5321)
const EMAIL_MAX_LENGTH: usize = 254;
const EMAIL_LOCAL_MAX_LENGTH: usize = 64;
const MAX_RATING: f64 = 5.0;

/// Subject keywords that select the casual confirmation greeting
const CASUAL_SUBJECT_KEYWORDS: [&str; 4] = ["student", "praktikum", "bewerbung", "karriere"];

/// Raw form fields as submitted
#[derive(Debug, Clone, Default)]
pub struct SubmissionFields {
    pub name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
    pub short_code: Option<String>,
    pub rating: Option<String>,
    pub crm_consent: Option<String>,
    pub phone: Option<String>,
    pub mobile_phone: Option<String>,
}

/// Email address value object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Email(String);

impl Email {
    /// Create a new email with validation
    pub fn new(email: impl Into<String>) -> ContactResult<Self> {
        let email = email.into().trim().to_string();

        if email.is_empty() || email.len() > EMAIL_MAX_LENGTH {
            return Err(ContactError::InvalidEmail);
        }

        if !Self::is_valid_format(&email) {
            return Err(ContactError::InvalidEmail);
        }

        Ok(Self(email))
    }

    /// Basic email format validation
    fn is_valid_format(email: &str) -> bool {
        if email.chars().any(char::is_whitespace) {
            return false;
        }

        // Must contain exactly one @
        let Some((local, domain)) = email.split_once('@') else {
            return false;
        };
        if domain.contains('@') {
            return false;
        }

        if local.is_empty() || local.len() > EMAIL_LOCAL_MAX_LENGTH {
            return false;
        }

        if domain.is_empty() || !domain.contains('.') {
            return false;
        }

        if !domain
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        {
            return false;
        }

        // Domain shouldn't start or end with dot or hyphen
        !(domain.starts_with(['.', '-']) || domain.ends_with(['.', '-']))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Star rating in (0, 5]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rating(f64);

impl Rating {
    /// Lenient parse; anything unusable is dropped rather than rejected
    pub fn parse(value: &str) -> Option<Self> {
        let value: f64 = value.trim().parse().ok()?;
        (value.is_finite() && value > 0.0 && value <= MAX_RATING).then_some(Self(value))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn full_stars(&self) -> usize {
        self.0.floor() as usize
    }

    pub fn has_half_star(&self) -> bool {
        self.0 - self.0.floor() >= 0.5
    }

    pub fn empty_stars(&self) -> usize {
        MAX_RATING as usize - self.full_stars() - usize::from(self.has_half_star())
    }

    /// Render with the given glyphs, e.g. `("★", "½", "☆")`
    pub fn stars(&self, full: &str, half: &str, empty: &str) -> String {
        let mut out = full.repeat(self.full_stars());
        if self.has_half_star() {
            out.push_str(half);
        }
        out.push_str(&empty.repeat(self.empty_stars()));
        out
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

/// Submission that passed field validation
#[derive(Debug, Clone)]
pub struct ValidSubmission {
    pub name: String,
    pub email: Email,
    pub subject: String,
    pub message: String,
    pub short_code: Option<String>,
    pub rating: Option<Rating>,
    pub crm_consent: bool,
    pub phone: Option<String>,
    pub mobile_phone: Option<String>,
}

impl ValidSubmission {
    /// Validate raw fields
    ///
    /// A present but malformed email reports `InvalidEmail` even when other
    /// fields are missing; otherwise any gap is `FieldsIncomplete`.
    pub fn validate(fields: &SubmissionFields) -> ContactResult<Self> {
        let name = trimmed(&fields.name);
        let raw_email = trimmed(&fields.email);
        let subject = trimmed(&fields.subject);
        let message = trimmed(&fields.message);

        let email = match raw_email {
            Some(raw) => Some(Email::new(raw)?),
            None => None,
        };

        let (Some(name), Some(email), Some(subject), Some(message)) =
            (name, email, subject, message)
        else {
            return Err(ContactError::FieldsIncomplete);
        };

        Ok(Self {
            name: name.to_string(),
            email,
            subject: subject.to_string(),
            message: message.to_string(),
            short_code: trimmed(&fields.short_code).map(str::to_string),
            rating: fields.rating.as_deref().and_then(Rating::parse),
            crm_consent: fields.crm_consent.as_deref() == Some("on"),
            phone: trimmed(&fields.phone).map(str::to_string),
            mobile_phone: trimmed(&fields.mobile_phone).map(str::to_string),
        })
    }

    /// Career-related subjects get the casual greeting
    pub fn prefers_casual_greeting(&self) -> bool {
        let subject = self.subject.to_lowercase();
        CASUAL_SUBJECT_KEYWORDS.iter().any(|k| subject.contains(k))
    }
}

fn trimmed(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Split a display name at the first space into (first, last)
pub fn split_name(name: &str) -> (String, String) {
    match name.trim().split_once(' ') {
        Some((first, last)) => (first.to_string(), last.to_string()),
        None => (name.trim().to_string(), String::new()),
    }
}
