//! Application Configuration
//!
//! Typed configuration for the contact pipeline and its collaborators.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use platform::client::TrustedProxies;
use platform::rate_limit::RateLimitPolicy;

use crate::domain::origin::OriginValidator;
use crate::domain::token::SessionCodec;

/// Re-export cookie types from platform
pub use platform::cookie::{CookieConfig, SameSite};

pub const DEFAULT_ALLOWED_ORIGINS: [&str; 4] = [
    "https://business-consulting.de",
    "https://www.business-consulting.de",
    "http://localhost",
    "http://127.0.0.1",
];

pub const DEFAULT_PRODUCTION_DOMAINS: [&str; 2] =
    ["business-consulting.de", "www.business-consulting.de"];

pub const DEFAULT_RATE_LIMIT_SALT: &str = "contact_rate_limit_v1";

/// Probabilistic garbage collection of the rate-limit store
#[derive(Debug, Clone, Copy)]
pub struct SweepConfig {
    /// Chance per submission of starting a sweep
    pub probability: f64,
    /// Records untouched for longer are deleted
    pub max_age: Duration,
    /// Upper bound for one sweep
    pub timeout: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            probability: 0.01,
            max_age: Duration::from_secs(24 * 3600),
            timeout: Duration::from_secs(5),
        }
    }
}

/// Contact pipeline configuration
#[derive(Debug, Clone)]
pub struct ContactConfig {
    /// Full origins accepted verbatim
    pub allowed_origins: Vec<String>,
    /// Host names this site is served under
    pub production_domains: Vec<String>,
    /// Name the server answers to (besides the Host header)
    pub server_name: Option<String>,
    /// HMAC key for the session cookie (32 bytes)
    pub session_secret: [u8; 32],
    pub cookie: CookieConfig,
    pub rate_limit: RateLimitPolicy,
    /// Salt for hashing client IPs into store keys
    pub rate_limit_salt: String,
    pub trusted_proxies: TrustedProxies,
    pub sweep: SweepConfig,
    /// Organisation inbox
    pub recipient_email: String,
    /// Envelope sender for both mails
    pub sender_email: String,
    pub social_links: SocialLinks,
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self {
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.iter().map(|s| s.to_string()).collect(),
            production_domains: DEFAULT_PRODUCTION_DOMAINS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            server_name: None,
            session_secret: [0u8; 32],
            cookie: CookieConfig::default(),
            rate_limit: RateLimitPolicy::default(),
            rate_limit_salt: DEFAULT_RATE_LIMIT_SALT.to_string(),
            trusted_proxies: TrustedProxies::default(),
            sweep: SweepConfig::default(),
            recipient_email: String::new(),
            sender_email: String::new(),
            social_links: SocialLinks::default(),
        }
    }
}

impl ContactConfig {
    /// Create config with a random session secret (for development)
    pub fn with_random_secret() -> Self {
        use rand::RngCore;
        let mut secret = [0u8; 32];
        rand::rng().fill_bytes(&mut secret);
        Self {
            session_secret: secret,
            ..Default::default()
        }
    }

    /// Create config for development (insecure cookie)
    pub fn development() -> Self {
        let mut config = Self::with_random_secret();
        config.cookie.secure = false;
        config
    }

    pub fn origin_validator(&self) -> OriginValidator {
        OriginValidator::new(
            self.allowed_origins.clone(),
            self.production_domains.clone(),
            self.server_name.clone(),
        )
    }

    pub fn session_codec(&self) -> SessionCodec {
        SessionCodec::new(self.session_secret)
    }
}

/// SMTP encryption mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmtpEncryption {
    /// Implicit TLS (usually port 465)
    Ssl,
    /// Mandatory STARTTLS (usually port 587)
    #[default]
    StartTls,
    /// Plaintext, loopback relays only
    None,
}

impl SmtpEncryption {
    /// `ssl` | `tls` | `starttls` | `none` (case-insensitive)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ssl" | "smtps" => Some(SmtpEncryption::Ssl),
            "tls" | "starttls" | "" => Some(SmtpEncryption::StartTls),
            "none" => Some(SmtpEncryption::None),
            _ => None,
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            SmtpEncryption::Ssl => 465,
            SmtpEncryption::StartTls => 587,
            SmtpEncryption::None => 25,
        }
    }
}

/// SMTP server settings
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub encryption: SmtpEncryption,
    pub timeout: Duration,
}

impl SmtpConfig {
    /// STARTTLS on the default port, 30s timeout
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let encryption = SmtpEncryption::default();
        Self {
            host: host.into(),
            port: encryption.default_port(),
            username: username.into(),
            password: password.into(),
            encryption,
            timeout: Duration::from_secs(30),
        }
    }

    /// Plaintext is refused unless the relay is on this machine
    pub fn validate(&self) -> Result<(), String> {
        if self.encryption == SmtpEncryption::None && !is_loopback_host(&self.host) {
            return Err(format!(
                "SMTP_SECURE=none is only allowed for a loopback host, got {}",
                self.host
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("encryption", &self.encryption)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn is_loopback_host(host: &str) -> bool {
    host == "localhost"
        || host
            .parse::<std::net::IpAddr>()
            .is_ok_and(|ip| ip.is_loopback())
}

pub const RECAPTCHA_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

/// CAPTCHA provider settings
#[derive(Clone)]
pub struct CaptchaConfig {
    pub secret: String,
    pub verify_url: String,
    pub timeout: Duration,
}

impl CaptchaConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            verify_url: RECAPTCHA_VERIFY_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl std::fmt::Debug for CaptchaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptchaConfig")
            .field("verify_url", &self.verify_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

pub const HUBSPOT_UPSERT_URL: &str =
    "https://api.hubapi.com/crm/v3/objects/contacts/batch/upsert";

/// CRM settings
#[derive(Clone)]
pub struct CrmConfig {
    /// `None` disables the integration
    pub api_key: Option<String>,
    pub endpoint: String,
    pub timeout: Duration,
    /// Message property is cut to this many chars
    pub message_max_chars: usize,
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: HUBSPOT_UPSERT_URL.to_string(),
            timeout: Duration::from_secs(5),
            message_max_chars: 65536,
        }
    }
}

impl std::fmt::Debug for CrmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrmConfig")
            .field("configured", &self.api_key.is_some())
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish()
    }
}

pub const FALLBACK_FACEBOOK_URL: &str = "https://www.facebook.com/IBC.Furtwangen/";
pub const FALLBACK_INSTAGRAM_URL: &str = "https://www.instagram.com/ibc_e.v/";
pub const FALLBACK_LINKEDIN_URL: &str =
    "https://www.linkedin.com/company/institut-f%C3%BCr-business-consulting-e-v/";

/// Social media links shown in the confirmation mail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocialLinks {
    pub facebook: String,
    pub instagram: String,
    pub linkedin: String,
}

impl Default for SocialLinks {
    fn default() -> Self {
        Self {
            facebook: FALLBACK_FACEBOOK_URL.to_string(),
            instagram: FALLBACK_INSTAGRAM_URL.to_string(),
            linkedin: FALLBACK_LINKEDIN_URL.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct ExternalLinksFile {
    #[serde(rename = "socialMedia", default)]
    social_media: SocialMediaEntries,
}

#[derive(Deserialize, Default)]
struct SocialMediaEntries {
    facebook: Option<String>,
    instagram: Option<String>,
    linkedin: Option<String>,
}

impl SocialLinks {
    /// Parse `{"socialMedia": {...}}`; absent entries keep their fallback
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let file: ExternalLinksFile = serde_json::from_str(json)?;
        let fallback = Self::default();
        let pick = |value: Option<String>, fallback: String| {
            value.filter(|v| !v.trim().is_empty()).unwrap_or(fallback)
        };

        Ok(Self {
            facebook: pick(file.social_media.facebook, fallback.facebook),
            instagram: pick(file.social_media.instagram, fallback.instagram),
            linkedin: pick(file.social_media.linkedin, fallback.linkedin),
        })
    }

    /// Load from a file, falling back to the built-in links on any error
    pub fn load(path: &Path) -> Self {
        let parsed = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|json| Self::from_json(&json).map_err(|e| e.to_string()));

        match parsed {
            Ok(links) => links,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Using fallback social links");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ContactConfig::default();
        assert_eq!(config.allowed_origins.len(), 4);
        assert_eq!(config.rate_limit_salt, "contact_rate_limit_v1");
        assert!(config.cookie.secure);
        assert!(!config.trusted_proxies.enabled);
    }

    #[test]
    fn test_development_config() {
        let config = ContactConfig::development();
        assert!(!config.cookie.secure);
        assert_ne!(config.session_secret, [0u8; 32]);
    }

    #[test]
    fn test_smtp_encryption_parse() {
        assert_eq!(SmtpEncryption::parse("SSL"), Some(SmtpEncryption::Ssl));
        assert_eq!(SmtpEncryption::parse("tls"), Some(SmtpEncryption::StartTls));
        assert_eq!(SmtpEncryption::parse("starttls"), Some(SmtpEncryption::StartTls));
        assert_eq!(SmtpEncryption::parse("none"), Some(SmtpEncryption::None));
        assert_eq!(SmtpEncryption::parse("rot13"), None);
    }

    #[test]
    fn test_plaintext_smtp_only_on_loopback() {
        let mut smtp = SmtpConfig {
            host: "127.0.0.1".into(),
            port: 25,
            username: "u".into(),
            password: "p".into(),
            encryption: SmtpEncryption::None,
            timeout: Duration::from_secs(30),
        };
        assert!(smtp.validate().is_ok());

        smtp.host = "smtp.example.com".into();
        assert!(smtp.validate().is_err());

        smtp.encryption = SmtpEncryption::StartTls;
        assert!(smtp.validate().is_ok());
    }

    #[test]
    fn test_smtp_debug_hides_password() {
        let smtp = SmtpConfig {
            host: "h".into(),
            port: 587,
            username: "u".into(),
            password: "hunter2".into(),
            encryption: SmtpEncryption::StartTls,
            timeout: Duration::from_secs(30),
        };
        assert!(!format!("{:?}", smtp).contains("hunter2"));
    }

    #[test]
    fn test_social_links_from_json() {
        let links = SocialLinks::from_json(
            r#"{"socialMedia": {"facebook": "https://fb.example/x", "linkedin": ""}}"#,
        )
        .unwrap();
        assert_eq!(links.facebook, "https://fb.example/x");
        assert_eq!(links.instagram, FALLBACK_INSTAGRAM_URL);
        assert_eq!(links.linkedin, FALLBACK_LINKEDIN_URL);
    }

    #[test]
    fn test_social_links_missing_file() {
        let links = SocialLinks::load(Path::new("/nonexistent/links.json"));
        assert_eq!(links, SocialLinks::default());
    }
}
