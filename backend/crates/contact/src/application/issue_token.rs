//! Issue Token Use Case
//!
//! Origin-gated CSRF token issuance for `GET /csrf-token`.

use std::sync::Arc;

use crate::application::config::ContactConfig;
use crate::application::token_service::TokenService;
use crate::domain::origin::{OriginHeaders, OriginValidator};
use crate::error::{ContactError, ContactResult};

/// Issue token input
pub struct IssueTokenInput {
    pub origin: OriginHeaders,
    /// Raw session cookie value, if any
    pub session_cookie: Option<String>,
}

/// Issue token output
#[derive(Debug)]
pub struct IssueTokenOutput {
    pub token: String,
    /// `Set-Cookie` value when a session was started
    pub set_cookie: Option<String>,
    /// Origin to echo in `Access-Control-Allow-Origin`
    pub allow_origin: Option<String>,
}

/// Issue token use case
pub struct IssueTokenUseCase {
    config: Arc<ContactConfig>,
    validator: OriginValidator,
    tokens: TokenService,
}

impl IssueTokenUseCase {
    pub fn new(config: Arc<ContactConfig>) -> Self {
        let validator = config.origin_validator();
        let tokens = TokenService::new(config.session_codec());
        Self {
            config,
            validator,
            tokens,
        }
    }

    pub fn execute(&self, input: IssueTokenInput) -> ContactResult<IssueTokenOutput> {
        if self.validator.validate(&input.origin).is_none() {
            let (origin, referer, host) = input.origin.sanitized();
            tracing::warn!(%origin, %referer, %host, "CSRF token request from invalid origin");
            return Err(ContactError::InvalidOrigin);
        }

        let session = self
            .tokens
            .issue(self.tokens.load(input.session_cookie.as_deref()));

        let set_cookie = session.is_new().then(|| {
            self.config
                .cookie
                .build_set_cookie(&self.tokens.cookie_value(&session))
        });

        Ok(IssueTokenOutput {
            token: session.token().as_str().to_string(),
            set_cookie,
            allow_origin: self.cors_origin(&input.origin),
        })
    }

    /// Origin to echo back for CORS, only for allow-listed origins
    pub fn cors_origin(&self, headers: &OriginHeaders) -> Option<String> {
        headers
            .origin
            .as_deref()
            .filter(|origin| self.validator.is_allowed_origin(origin, headers.host.as_deref()))
            .map(str::to_string)
    }
}
