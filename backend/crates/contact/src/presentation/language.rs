//! Language Negotiation
//!
//! `?lang=` query parameter, then the `language` cookie, then
//! `Accept-Language` with q-values. Defaults to German.

use axum::http::{HeaderMap, header};
use platform::cookie::extract_cookie;

use crate::application::messages::Lang;

pub const LANGUAGE_COOKIE: &str = "language";

/// Pick the response language for a request
pub fn negotiate(query_lang: Option<&str>, headers: &HeaderMap) -> Lang {
    if let Some(lang) = query_lang.and_then(Lang::parse) {
        return lang;
    }

    if let Some(lang) = extract_cookie(headers, LANGUAGE_COOKIE)
        .as_deref()
        .and_then(Lang::parse)
    {
        return lang;
    }

    headers
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok())
        .and_then(from_accept_language)
        .unwrap_or_default()
}

/// Best supported language in an `Accept-Language` value
///
/// Ties keep header order. `q=0` entries are ignored.
pub fn from_accept_language(value: &str) -> Option<Lang> {
    let mut best: Option<(Lang, f32)> = None;

    for entry in value.split(',') {
        let mut parts = entry.trim().split(';');
        let tag = parts.next().unwrap_or_default().trim();
        let primary = tag.split(['-', '_']).next().unwrap_or_default();

        let Some(lang) = Lang::parse(primary) else {
            continue;
        };

        let quality = parts
            .filter_map(|p| p.trim().strip_prefix("q="))
            .find_map(|q| q.trim().parse::<f32>().ok())
            .unwrap_or(1.0);

        if quality <= 0.0 {
            continue;
        }
        if best.is_none_or(|(_, q)| quality > q) {
            best = Some((lang, quality));
        }
    }

    best.map(|(lang, _)| lang)
}
