//! Cookie Management Infrastructure
//!
//! Cookie configuration, `Set-Cookie` building, extraction, and
//! HMAC-signed cookie values.

use axum::http::{HeaderMap, header};

use crate::crypto::{constant_time_eq, hmac_sha256_hex};

/// SameSite policy for cookies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Cookie configuration
#[derive(Debug, Clone)]
pub struct CookieConfig {
    pub name: String,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
    pub path: String,
    /// `None` = lives as long as the browser session
    pub max_age_secs: Option<i64>,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: "contact_session".to_string(),
            secure: true,
            http_only: true,
            same_site: SameSite::Lax,
            path: "/".to_string(),
            max_age_secs: None,
        }
    }
}

impl CookieConfig {
    /// `Set-Cookie` value for `value` with the configured attributes
    pub fn build_set_cookie(&self, value: &str) -> String {
        let mut attributes = vec![format!("{}={}", self.name, value)];

        if self.http_only {
            attributes.push("HttpOnly".to_string());
        }
        if self.secure {
            attributes.push("Secure".to_string());
        }
        attributes.push(format!("SameSite={}", self.same_site.as_str()));
        attributes.push(format!("Path={}", self.path));
        if let Some(max_age) = self.max_age_secs {
            attributes.push(format!("Max-Age={}", max_age));
        }

        attributes.join("; ")
    }
}

/// Extract a cookie value from headers
pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|cookie| {
            let (key, value) = cookie.trim().split_once('=')?;
            (key == name).then(|| value.to_string())
        })
}

/// `value.signature` where signature = hex(HMAC-SHA256(secret, value))
pub fn sign_value(secret: &[u8], value: &str) -> String {
    format!("{}.{}", value, hmac_sha256_hex(secret, value.as_bytes()))
}

/// Return the payload of a signed value if its signature checks out
pub fn verify_signed_value<'a>(secret: &[u8], signed: &'a str) -> Option<&'a str> {
    let (value, signature) = signed.rsplit_once('.')?;
    let expected = hmac_sha256_hex(secret, value.as_bytes());

    constant_time_eq(signature.as_bytes(), expected.as_bytes()).then_some(value)
}
