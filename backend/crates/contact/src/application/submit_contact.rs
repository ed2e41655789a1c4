//! Submit Contact Form Use Case
//!
//! The submission pipeline:
//! `Received → OriginOk → CsrfOk → RateOk → CaptchaOk → FieldsOk → MailSent → Done`.
//! The first failing gate determines the response; later gates are not run.

use std::net::IpAddr;
use std::sync::Arc;

use platform::client::client_key;

use crate::application::config::ContactConfig;
use crate::application::dispatch_mail::{DispatchReport, MailDispatcher};
use crate::application::messages::Lang;
use crate::application::token_service::TokenService;
use crate::domain::gateway::{CaptchaVerifier, CrmClient, MailTransport, RateLimitStore};
use crate::domain::origin::{OriginHeaders, OriginValidator};
use crate::domain::submission::{SubmissionFields, ValidSubmission};
use crate::error::{ContactError, ContactResult};

/// Last gate a submission passed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Received,
    OriginOk,
    CsrfOk,
    RateOk,
    CaptchaOk,
    FieldsOk,
    MailSent,
    Done,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Received => "received",
            PipelineStage::OriginOk => "origin_ok",
            PipelineStage::CsrfOk => "csrf_ok",
            PipelineStage::RateOk => "rate_ok",
            PipelineStage::CaptchaOk => "captcha_ok",
            PipelineStage::FieldsOk => "fields_ok",
            PipelineStage::MailSent => "mail_sent",
            PipelineStage::Done => "done",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Submit contact input
pub struct SubmitContactInput {
    pub origin: OriginHeaders,
    pub session_cookie: Option<String>,
    /// `csrf_token` form field; wins over the header when present
    pub csrf_field: Option<String>,
    /// `X-CSRF-Token` header
    pub csrf_header: Option<String>,
    pub client_ip: Option<IpAddr>,
    pub captcha_response: Option<String>,
    /// Form fields, or why the body could not be read; a body error is
    /// reported only once the origin and CSRF gates have passed
    pub fields: ContactResult<SubmissionFields>,
    pub lang: Lang,
    /// Unix seconds
    pub now: i64,
}

/// Submit contact output
#[derive(Debug)]
pub struct SubmitContactOutput {
    pub report: DispatchReport,
}

/// Submit contact use case
pub struct SubmitContactUseCase<S, C, M, H>
where
    S: RateLimitStore,
    C: CaptchaVerifier,
    M: MailTransport,
    H: CrmClient,
{
    store: Arc<S>,
    captcha: Arc<C>,
    dispatcher: MailDispatcher<M, H>,
    config: Arc<ContactConfig>,
    validator: OriginValidator,
    tokens: TokenService,
}

impl<S, C, M, H> SubmitContactUseCase<S, C, M, H>
where
    S: RateLimitStore + Send + Sync + 'static,
    C: CaptchaVerifier,
    M: MailTransport,
    H: CrmClient,
{
    pub fn new(
        store: Arc<S>,
        captcha: Arc<C>,
        dispatcher: MailDispatcher<M, H>,
        config: Arc<ContactConfig>,
    ) -> Self {
        let validator = config.origin_validator();
        let tokens = TokenService::new(config.session_codec());
        Self {
            store,
            captcha,
            dispatcher,
            config,
            validator,
            tokens,
        }
    }

    pub async fn execute(&self, input: SubmitContactInput) -> ContactResult<SubmitContactOutput> {
        self.maybe_sweep();

        let mut stage = PipelineStage::Received;
        let result = self.run(input, &mut stage).await;

        match &result {
            Ok(output) => tracing::info!(
                stage = %stage,
                confirmation = output.report.confirmation.as_str(),
                crm = output.report.crm.as_str(),
                "Contact submission processed"
            ),
            Err(e) => tracing::info!(passed = %stage, reason = %e, "Contact submission rejected"),
        }

        result
    }

    async fn run(
        &self,
        input: SubmitContactInput,
        stage: &mut PipelineStage,
    ) -> ContactResult<SubmitContactOutput> {
        if self.validator.validate(&input.origin).is_none() {
            let (origin, referer, host) = input.origin.sanitized();
            tracing::warn!(%origin, %referer, %host, "Submission from invalid origin");
            return Err(ContactError::InvalidOrigin);
        }
        *stage = PipelineStage::OriginOk;

        let session = self.tokens.load(input.session_cookie.as_deref());
        let candidate = input.csrf_field.as_deref().or(input.csrf_header.as_deref());
        self.tokens.verify(session.as_ref(), candidate)?;
        *stage = PipelineStage::CsrfOk;

        let fields = input.fields?;

        let key = client_key(input.client_ip, &self.config.rate_limit_salt);
        tracing::debug!(client_ip = ?input.client_ip, client = %key, "Resolved client");
        if let Some(reason) = self
            .store
            .admit(&key, input.now, &self.config.rate_limit)
            .await?
        {
            tracing::warn!(client = %key, %reason, "Rate limit exceeded");
            return Err(ContactError::RateLimited(reason));
        }
        *stage = PipelineStage::RateOk;

        let captcha_response = input
            .captcha_response
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ContactError::CaptchaMissing)?;
        let verdict = self.captcha.verify(captcha_response, input.client_ip).await?;
        if !verdict.success {
            tracing::warn!(client = %key, error_codes = ?verdict.error_codes, "CAPTCHA verification failed");
            return Err(ContactError::CaptchaFailed);
        }
        *stage = PipelineStage::CaptchaOk;

        let submission = ValidSubmission::validate(&fields)?;
        *stage = PipelineStage::FieldsOk;

        let report = self.dispatcher.send(&submission, input.lang).await?;
        *stage = PipelineStage::MailSent;
        tracing::info!(
            confirmation = report.confirmation.as_str(),
            crm = report.crm.as_str(),
            "Contact submission delivered"
        );

        *stage = PipelineStage::Done;
        Ok(SubmitContactOutput { report })
    }

    /// Occasionally start a bounded store sweep in the background
    fn maybe_sweep(&self) {
        let sweep = self.config.sweep;
        if sweep.probability <= 0.0 || rand::random::<f64>() >= sweep.probability {
            return;
        }

        let store = self.store.clone();
        tokio::spawn(async move {
            match tokio::time::timeout(sweep.timeout, store.sweep(sweep.max_age)).await {
                Ok(Ok(removed)) => tracing::info!(removed, "Rate-limit sweep finished"),
                Ok(Err(e)) => tracing::warn!(error = %e, "Rate-limit sweep failed"),
                Err(_) => tracing::warn!("Rate-limit sweep timed out"),
            }
        });
    }
}
