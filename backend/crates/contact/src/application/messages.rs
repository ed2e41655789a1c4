//! Localized Message Catalog
//!
//! `{ "<message-id>": { "de": "...", "en": "...", "fr": "..." } }`

use kernel::error::app_error::AppResult;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

const BUILTIN_MESSAGES: &str = include_str!("../../assets/messages.json");

/// Supported languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lang {
    #[default]
    De,
    En,
    Fr,
}

impl Lang {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "de" => Some(Lang::De),
            "en" => Some(Lang::En),
            "fr" => Some(Lang::Fr),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Lang::De => "de",
            Lang::En => "en",
            Lang::Fr => "fr",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct LocalizedText {
    de: Option<String>,
    en: Option<String>,
    fr: Option<String>,
}

impl LocalizedText {
    fn get(&self, lang: Lang) -> Option<&str> {
        match lang {
            Lang::De => self.de.as_deref(),
            Lang::En => self.en.as_deref(),
            Lang::Fr => self.fr.as_deref(),
        }
    }
}

/// Message catalog keyed by message id
#[derive(Debug, Clone, Default)]
pub struct MessageCatalog {
    entries: HashMap<String, LocalizedText>,
}

impl MessageCatalog {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self {
            entries: serde_json::from_str(json)?,
        })
    }

    /// Load a catalog file
    pub fn load(path: &Path) -> AppResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&json)?)
    }

    /// Catalog compiled into the binary
    pub fn builtin() -> &'static Self {
        static BUILTIN: OnceLock<MessageCatalog> = OnceLock::new();
        BUILTIN.get_or_init(|| {
            Self::from_json(BUILTIN_MESSAGES).unwrap_or_else(|e| {
                tracing::error!(error = %e, "Built-in message catalog is invalid");
                Self::default()
            })
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Look up a message; falls back to German, then to the id itself
    pub fn text(&self, key: &str, lang: Lang) -> String {
        let Some(entry) = self.entries.get(key) else {
            tracing::warn!(key, "Message id not found");
            return key.to_string();
        };

        match entry.get(lang).or_else(|| entry.get(Lang::De)) {
            Some(text) => text.to_string(),
            None => {
                tracing::warn!(key, lang = lang.as_str(), "Message has no usable translation");
                key.to_string()
            }
        }
    }

    /// Substitute `{placeholder}`s with HTML-escaped values
    pub fn render(&self, key: &str, lang: Lang, params: &[(&str, &str)]) -> String {
        substitute(self.text(key, lang), params, |value| {
            html_escape::encode_safe(value).into_owned()
        })
    }

    /// Substitute `{placeholder}`s verbatim (plain-text output)
    pub fn render_plain(&self, key: &str, lang: Lang, params: &[(&str, &str)]) -> String {
        substitute(self.text(key, lang), params, str::to_string)
    }
}

fn substitute(mut message: String, params: &[(&str, &str)], encode: fn(&str) -> String) -> String {
    for (name, value) in params {
        message = message.replace(&format!("{{{}}}", name), &encode(value));
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> MessageCatalog {
        MessageCatalog::from_json(
            r#"{
                "greet": {"de": "Hallo {name}", "en": "Hello {name}"},
                "only-en": {"en": "English"}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_lang_parse() {
        assert_eq!(Lang::parse("EN"), Some(Lang::En));
        assert_eq!(Lang::parse("fr"), Some(Lang::Fr));
        assert_eq!(Lang::parse("es"), None);
        assert_eq!(Lang::default(), Lang::De);
    }

    #[test]
    fn test_fallbacks() {
        let c = catalog();
        assert_eq!(c.text("greet", Lang::En), "Hello {name}");
        assert_eq!(c.text("greet", Lang::Fr), "Hallo {name}");
        assert_eq!(c.text("only-en", Lang::Fr), "only-en");
        assert_eq!(c.text("missing", Lang::De), "missing");
    }

    #[test]
    fn test_render_escapes_params() {
        let c = catalog();
        assert_eq!(
            c.render("greet", Lang::En, &[("name", "<b>Anna</b>")]),
            "Hello &lt;b&gt;Anna&lt;/b&gt;"
        );
        assert_eq!(
            c.render_plain("greet", Lang::En, &[("name", "<b>Anna</b>")]),
            "Hello <b>Anna</b>"
        );
    }

    #[test]
    fn test_render_escapes_quotes_and_ampersands() {
        let c = catalog();
        assert_eq!(
            c.render("greet", Lang::De, &[("name", r#"a&b"c'd"#)]),
            "Hallo a&amp;b&quot;c&#x27;d"
        );
    }

    #[test]
    fn test_builtin_catalog_has_pipeline_messages() {
        let c = MessageCatalog::builtin();
        for key in [
            "contact-success",
            "contact-error-technical",
            "contact-error-csrf",
            "contact-error-rate-limit-wait",
            "contact-error-rate-limit-exceeded",
            "contact-error-captcha",
            "contact-error-captcha-unavailable",
            "contact-error-email-invalid",
            "contact-error-fields-incomplete",
            "contact-error-smtp-connection",
            "contact-error-smtp-auth",
            "contact-error-email-send",
            "contact-error-invalid-request",
            "contact-error-method-not-allowed",
            "email-confirm-subject",
            "email-confirm-greeting-formal",
            "email-confirm-greeting-casual",
        ] {
            assert!(c.contains(key), "missing {key}");
            for lang in [Lang::De, Lang::En, Lang::Fr] {
                assert_ne!(c.text(key, lang), key);
            }
        }
    }

    #[test]
    fn test_load_missing_file() {
        assert!(MessageCatalog::load(Path::new("/nonexistent/messages.json")).is_err());
    }
}
