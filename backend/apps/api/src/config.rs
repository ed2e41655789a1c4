//! Server Configuration
//!
//! Environment variables are read once at startup. Every missing
//! mandatory variable is reported in a single error.

use anyhow::{Context, bail};
use base64::Engine;
use base64::engine::general_purpose;
use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use contact::application::config::SocialLinks;
use contact::{
    CaptchaConfig, ContactConfig, CrmConfig, FileRateLimitStore, SmtpConfig, SmtpEncryption,
};
use ipnetwork::IpNetwork;
use platform::client::TrustedProxies;

const REQUIRED_VARS: [&str; 6] = [
    "SMTP_HOST",
    "SMTP_USERNAME",
    "SMTP_PASSWORD",
    "RECAPTCHA_SECRET_KEY",
    "CONTACT_RECIPIENT_EMAIL",
    "CONTACT_SENDER_EMAIL",
];

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:31113";

#[derive(Debug)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub contact: ContactConfig,
    pub smtp: SmtpConfig,
    pub captcha: CaptchaConfig,
    pub crm: CrmConfig,
    pub rate_limit_dir: PathBuf,
    /// Scheduled sweep; `None` leaves only the per-request sweep
    pub sweep_interval: Option<Duration>,
    pub messages_path: Option<PathBuf>,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let missing: Vec<&str> = REQUIRED_VARS
            .iter()
            .copied()
            .filter(|key| var(key).is_none())
            .collect();
        if !missing.is_empty() {
            bail!(
                "Missing required environment variables: {}",
                missing.join(", ")
            );
        }
        let required = |key: &str| var(key).unwrap_or_default();

        let bind_addr = var("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .context("BIND_ADDR must be a socket address")?;

        // Contact pipeline
        let mut contact = ContactConfig {
            session_secret: session_secret(var("SESSION_SECRET"))?,
            recipient_email: required("CONTACT_RECIPIENT_EMAIL"),
            sender_email: required("CONTACT_SENDER_EMAIL"),
            server_name: var("SERVER_NAME"),
            ..ContactConfig::default()
        };
        if let Some(origins) = var("ALLOWED_ORIGINS") {
            contact.allowed_origins = split_list(&origins);
        }
        if let Some(domains) = var("PRODUCTION_DOMAINS") {
            contact.production_domains = split_list(&domains);
        }
        if let Some(salt) = var("RATE_LIMIT_SALT") {
            contact.rate_limit_salt = salt;
        }
        contact.cookie.secure = parse_bool(var("COOKIE_SECURE"), "COOKIE_SECURE", true)?;
        contact.trusted_proxies = trusted_proxies(
            parse_bool(var("TRUST_PROXY_HEADERS"), "TRUST_PROXY_HEADERS", false)?,
            var("TRUSTED_PROXY_RANGES"),
        )?;
        if let Some(path) = var("EXTERNAL_LINKS_PATH") {
            contact.social_links = SocialLinks::load(Path::new(&path));
        }

        // SMTP
        let mut smtp = SmtpConfig::new(
            required("SMTP_HOST"),
            required("SMTP_USERNAME"),
            required("SMTP_PASSWORD"),
        );
        if let Some(mode) = var("SMTP_SECURE") {
            smtp.encryption = SmtpEncryption::parse(&mode)
                .with_context(|| format!("SMTP_SECURE: unknown mode {}", mode))?;
        }
        smtp.port = parse_var(var("SMTP_PORT"), "SMTP_PORT", smtp.encryption.default_port())?;
        smtp.timeout = Duration::from_secs(parse_var(var("SMTP_TIMEOUT_SECS"), "SMTP_TIMEOUT_SECS", 30)?);
        if let Err(reason) = smtp.validate() {
            bail!(reason);
        }

        // CAPTCHA
        let mut captcha = CaptchaConfig::new(required("RECAPTCHA_SECRET_KEY"));
        if let Some(url) = var("RECAPTCHA_VERIFY_URL") {
            captcha.verify_url = url;
        }
        captcha.timeout =
            Duration::from_secs(parse_var(var("CAPTCHA_TIMEOUT_SECS"), "CAPTCHA_TIMEOUT_SECS", 10)?);

        let crm = CrmConfig {
            api_key: var("HUBSPOT_API_KEY"),
            ..CrmConfig::default()
        };

        let sweep_secs: u64 = parse_var(
            var("RATE_LIMIT_SWEEP_INTERVAL_SECS"),
            "RATE_LIMIT_SWEEP_INTERVAL_SECS",
            0,
        )?;

        Ok(Self {
            bind_addr,
            contact,
            smtp,
            captcha,
            crm,
            rate_limit_dir: var("RATE_LIMIT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(FileRateLimitStore::default_dir),
            sweep_interval: (sweep_secs > 0).then(|| Duration::from_secs(sweep_secs)),
            messages_path: var("MESSAGES_PATH").map(PathBuf::from),
        })
    }
}

/// Base64 secret of exactly 32 bytes; random in debug builds when unset
fn session_secret(value: Option<String>) -> anyhow::Result<[u8; 32]> {
    let Some(encoded) = value else {
        if cfg!(debug_assertions) {
            tracing::warn!("SESSION_SECRET not set, using a random secret");
            return Ok(ContactConfig::with_random_secret().session_secret);
        }
        bail!("SESSION_SECRET must be set in production");
    };

    let bytes = general_purpose::STANDARD
        .decode(encoded.as_bytes())
        .context("SESSION_SECRET must be base64")?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| anyhow::anyhow!("SESSION_SECRET must decode to 32 bytes, got {}", b.len()))
}

fn trusted_proxies(enabled: bool, ranges: Option<String>) -> anyhow::Result<TrustedProxies> {
    let Some(ranges) = ranges else {
        let mut proxies = TrustedProxies::cloudflare();
        proxies.enabled = enabled;
        return Ok(proxies);
    };

    let ranges = split_list(&ranges)
        .iter()
        .map(|cidr| {
            cidr.parse::<IpNetwork>()
                .with_context(|| format!("TRUSTED_PROXY_RANGES: bad range {}", cidr))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(TrustedProxies::new(enabled, ranges))
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(value: Option<String>, key: &str, default: bool) -> anyhow::Result<bool> {
    match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => bail!("{}: expected a boolean, got {}", key, other),
    }
}

fn parse_var<T>(value: Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{}: invalid value {}", key, raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, String> {
        HashMap::from([
            ("SMTP_HOST", "smtp.example.com".to_string()),
            ("SMTP_USERNAME", "mailer".to_string()),
            ("SMTP_PASSWORD", "hunter2".to_string()),
            ("RECAPTCHA_SECRET_KEY", "captcha-secret".to_string()),
            ("CONTACT_RECIPIENT_EMAIL", "inbox@example.com".to_string()),
            ("CONTACT_SENDER_EMAIL", "noreply@example.com".to_string()),
        ])
    }

    fn load(env: &HashMap<&'static str, String>) -> anyhow::Result<ServerConfig> {
        ServerConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&base_env()).unwrap();
        assert_eq!(config.bind_addr.port(), 31113);
        assert_eq!(config.smtp.encryption, SmtpEncryption::StartTls);
        assert_eq!(config.smtp.port, 587);
        assert_eq!(config.smtp.timeout, Duration::from_secs(30));
        assert_eq!(config.captcha.timeout, Duration::from_secs(10));
        assert!(config.crm.api_key.is_none());
        assert!(config.contact.cookie.secure);
        assert!(!config.contact.trusted_proxies.enabled);
        assert!(!config.contact.trusted_proxies.ranges.is_empty());
        assert_eq!(config.sweep_interval, None);
    }

    #[test]
    fn test_all_missing_vars_reported() {
        let mut env = base_env();
        env.remove("SMTP_HOST");
        env.remove("CONTACT_SENDER_EMAIL");

        let err = load(&env).unwrap_err().to_string();
        assert!(err.contains("SMTP_HOST"));
        assert!(err.contains("CONTACT_SENDER_EMAIL"));
        assert!(!err.contains("SMTP_PASSWORD"));
    }

    #[test]
    fn test_blank_counts_as_missing() {
        let mut env = base_env();
        env.insert("RECAPTCHA_SECRET_KEY", "   ".into());
        assert!(load(&env).unwrap_err().to_string().contains("RECAPTCHA_SECRET_KEY"));
    }

    #[test]
    fn test_ssl_uses_implicit_tls_port() {
        let mut env = base_env();
        env.insert("SMTP_SECURE", "ssl".into());
        let config = load(&env).unwrap();
        assert_eq!(config.smtp.encryption, SmtpEncryption::Ssl);
        assert_eq!(config.smtp.port, 465);
    }

    #[test]
    fn test_plaintext_smtp_needs_loopback() {
        let mut env = base_env();
        env.insert("SMTP_SECURE", "none".into());
        assert!(load(&env).is_err());

        env.insert("SMTP_HOST", "127.0.0.1".into());
        assert!(load(&env).is_ok());
    }

    #[test]
    fn test_session_secret() {
        let mut env = base_env();
        env.insert("SESSION_SECRET", general_purpose::STANDARD.encode([7u8; 32]));
        assert_eq!(load(&env).unwrap().contact.session_secret, [7u8; 32]);

        env.insert("SESSION_SECRET", general_purpose::STANDARD.encode([7u8; 16]));
        assert!(load(&env).is_err());
    }

    #[test]
    fn test_lists_and_proxies() {
        let mut env = base_env();
        env.insert("ALLOWED_ORIGINS", "https://a.example, https://b.example".into());
        env.insert("TRUST_PROXY_HEADERS", "true".into());
        env.insert("TRUSTED_PROXY_RANGES", "10.0.0.0/8".into());
        env.insert("RATE_LIMIT_SWEEP_INTERVAL_SECS", "600".into());
        env.insert("HUBSPOT_API_KEY", "pat-123".into());

        let config = load(&env).unwrap();
        assert_eq!(
            config.contact.allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert!(
            config
                .contact
                .trusted_proxies
                .is_trusted("10.1.2.3".parse().unwrap())
        );
        assert_eq!(config.sweep_interval, Some(Duration::from_secs(600)));
        assert_eq!(config.crm.api_key.as_deref(), Some("pat-123"));
    }

    #[test]
    fn test_bad_values_rejected() {
        let mut env = base_env();
        env.insert("SMTP_PORT", "not-a-port".into());
        assert!(load(&env).is_err());

        let mut env = base_env();
        env.insert("TRUSTED_PROXY_RANGES", "10.0.0.0/99".into());
        assert!(load(&env).is_err());

        let mut env = base_env();
        env.insert("COOKIE_SECURE", "maybe".into());
        assert!(load(&env).is_err());
    }
}
