//! Request Extractors

use axum::extract::{ConnectInfo, Form, FromRequest, FromRequestParts, Multipart, Request};
use axum::http::request::Parts;
use axum::http::{HeaderMap, header};
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use platform::client::{TrustedProxies, resolve_client_ip};
use platform::cookie::extract_cookie;

use crate::application::messages::Lang;
use crate::domain::origin::OriginHeaders;
use crate::domain::submission::SubmissionFields;
use crate::error::ContactError;
use crate::presentation::language;

pub const CSRF_HEADER: &str = "x-csrf-token";
pub const CSRF_FIELD: &str = "csrf_token";
pub const CAPTCHA_FIELD: &str = "g-recaptcha-response";

/// Headers, peer address and `?lang=` of the request
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub headers: HeaderMap,
    pub peer: Option<IpAddr>,
    pub query_lang: Option<String>,
}

impl RequestMeta {
    pub fn header(&self, name: impl header::AsHeaderName) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    pub fn origin_headers(&self) -> OriginHeaders {
        OriginHeaders {
            origin: self.header(header::ORIGIN),
            referer: self.header(header::REFERER),
            host: self.header(header::HOST),
        }
    }

    pub fn cookie(&self, name: &str) -> Option<String> {
        extract_cookie(&self.headers, name)
    }

    pub fn client_ip(&self, trusted: &TrustedProxies) -> Option<IpAddr> {
        resolve_client_ip(&self.headers, self.peer, trusted)
    }

    pub fn lang(&self) -> Lang {
        language::negotiate(self.query_lang.as_deref(), &self.headers)
    }
}

impl<S> FromRequestParts<S> for RequestMeta
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0.ip());

        let query_lang = parts.uri.query().and_then(|query| {
            url::form_urlencoded::parse(query.as_bytes())
                .find(|(key, _)| key == "lang")
                .map(|(_, value)| value.into_owned())
        });

        Ok(Self {
            headers: parts.headers.clone(),
            peer,
            query_lang,
        })
    }
}

/// Contact form body, multipart or url-encoded
///
/// Repeated field names keep the last value.
#[derive(Debug, Clone, Default)]
pub struct ContactForm {
    values: HashMap<String, String>,
}

impl ContactForm {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    fn owned(&self, name: &str) -> Option<String> {
        self.get(name).map(str::to_string)
    }

    pub fn csrf_token(&self) -> Option<String> {
        self.owned(CSRF_FIELD)
    }

    pub fn captcha_response(&self) -> Option<String> {
        self.owned(CAPTCHA_FIELD)
    }

    pub fn fields(&self) -> SubmissionFields {
        SubmissionFields {
            name: self.owned("name"),
            email: self.owned("email"),
            subject: self.owned("subject"),
            message: self.owned("message"),
            short_code: self.owned("kuerzel"),
            rating: self.owned("rating"),
            crm_consent: self.owned("hubspot_consent"),
            phone: self.owned("phone"),
            mobile_phone: self.owned("mobilephone"),
        }
    }
}

impl<S> FromRequest<S> for ContactForm
where
    S: Send + Sync,
{
    type Rejection = ContactError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("multipart/form-data"));

        if !is_multipart {
            let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map_err(|e| ContactError::MalformedRequest(e.body_text()))?;
            return Ok(Self::from_pairs(pairs));
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| ContactError::MalformedRequest(e.body_text()))?;

        let mut values = HashMap::new();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ContactError::MalformedRequest(e.body_text()))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let value = field
                .text()
                .await
                .map_err(|e| ContactError::MalformedRequest(e.body_text()))?;
            values.insert(name, value);
        }

        Ok(Self { values })
    }
}
