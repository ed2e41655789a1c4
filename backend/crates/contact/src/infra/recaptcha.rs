//! reCAPTCHA Verifier

use serde::Deserialize;
use std::net::IpAddr;

use crate::application::config::CaptchaConfig;
use crate::domain::gateway::{CaptchaVerdict, CaptchaVerifier};
use crate::error::CaptchaError;

/// siteverify response body
#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    #[serde(default)]
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

/// Parse a 2xx body; unparseable content counts as a failed check
fn parse_verdict(body: &str) -> CaptchaVerdict {
    match serde_json::from_str::<SiteVerifyResponse>(body) {
        Ok(response) => CaptchaVerdict {
            success: response.success,
            error_codes: response.error_codes,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Unparseable CAPTCHA provider response");
            CaptchaVerdict::failed("invalid-json-response")
        }
    }
}

/// Verifier backed by the provider's siteverify endpoint
#[derive(Clone)]
pub struct RecaptchaVerifier {
    http: reqwest::Client,
    config: CaptchaConfig,
}

impl RecaptchaVerifier {
    pub fn new(config: CaptchaConfig) -> Result<Self, CaptchaError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CaptchaError::Unavailable(e.to_string()))?;
        Ok(Self { http, config })
    }
}

impl CaptchaVerifier for RecaptchaVerifier {
    async fn verify(
        &self,
        response_token: &str,
        remote_ip: Option<IpAddr>,
    ) -> Result<CaptchaVerdict, CaptchaError> {
        let mut form = vec![
            ("secret", self.config.secret.clone()),
            ("response", response_token.to_string()),
        ];
        if let Some(ip) = remote_ip {
            form.push(("remoteip", ip.to_string()));
        }

        let response = self
            .http
            .post(&self.config.verify_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| CaptchaError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CaptchaError::Unavailable(format!(
                "Provider returned HTTP {}",
                status.as_u16()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| CaptchaError::Unavailable(e.to_string()))?;

        let verdict = parse_verdict(&body);
        if !verdict.success {
            tracing::debug!(error_codes = ?verdict.error_codes, "CAPTCHA rejected by provider");
        }
        Ok(verdict)
    }
}
