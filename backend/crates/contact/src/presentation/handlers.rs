//! HTTP Handlers

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use kernel::error::app_error::AppError;
use std::any::Any;
use std::sync::Arc;

use crate::application::compose::MailComposer;
use crate::application::config::{ContactConfig, CrmConfig};
use crate::application::dispatch_mail::MailDispatcher;
use crate::application::messages::{Lang, MessageCatalog};
use crate::application::{
    IssueTokenInput, IssueTokenUseCase, SubmitContactInput, SubmitContactUseCase,
};
use crate::domain::gateway::{CaptchaVerifier, CrmClient, MailTransport, RateLimitStore};
use crate::error::ContactError;
use crate::presentation::dto::{OriginErrorResponse, SubmitResponse, TokenResponse};
use crate::presentation::extract::{CSRF_HEADER, ContactForm, RequestMeta};

/// Shared state for contact handlers
pub struct ContactAppState<S, C, M, H> {
    pub store: Arc<S>,
    pub captcha: Arc<C>,
    pub mailer: Arc<M>,
    pub crm: Arc<H>,
    pub config: Arc<ContactConfig>,
    pub crm_config: Arc<CrmConfig>,
    pub messages: Arc<MessageCatalog>,
}

// Arc fields only; no bounds on the collaborators
impl<S, C, M, H> Clone for ContactAppState<S, C, M, H> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            captcha: self.captcha.clone(),
            mailer: self.mailer.clone(),
            crm: self.crm.clone(),
            config: self.config.clone(),
            crm_config: self.crm_config.clone(),
            messages: self.messages.clone(),
        }
    }
}

const NO_STORE: &str = "no-store, no-cache, must-revalidate, max-age=0";
const PREFLIGHT_MAX_AGE: &str = "86400";

fn token_response_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_STORE));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers
}

/// Echo an allow-listed origin with credentials
fn insert_cors(headers: &mut HeaderMap, origin: &str) {
    if let Ok(value) = HeaderValue::from_str(origin) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
        headers.insert(header::VARY, HeaderValue::from_static("Origin"));
    }
}

// ============================================================================
// CSRF Token
// ============================================================================

/// GET /csrf-token
pub async fn csrf_token<S, C, M, H>(
    State(state): State<ContactAppState<S, C, M, H>>,
    meta: RequestMeta,
) -> Response
where
    S: RateLimitStore + Send + Sync + 'static,
    C: CaptchaVerifier + Send + Sync + 'static,
    M: MailTransport + Send + Sync + 'static,
    H: CrmClient + Send + Sync + 'static,
{
    let use_case = IssueTokenUseCase::new(state.config.clone());

    let input = IssueTokenInput {
        origin: meta.origin_headers(),
        session_cookie: meta.cookie(&state.config.cookie.name),
    };

    let mut headers = token_response_headers();

    match use_case.execute(input) {
        Ok(output) => {
            if let Some(origin) = &output.allow_origin {
                insert_cors(&mut headers, origin);
            }
            if let Some(cookie) = output
                .set_cookie
                .as_deref()
                .and_then(|c| HeaderValue::from_str(c).ok())
            {
                headers.insert(header::SET_COOKIE, cookie);
            }

            (
                StatusCode::OK,
                headers,
                Json(TokenResponse {
                    token: output.token,
                }),
            )
                .into_response()
        }
        Err(ContactError::InvalidOrigin) => (
            StatusCode::FORBIDDEN,
            headers,
            Json(OriginErrorResponse::invalid_origin()),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// OPTIONS /csrf-token
pub async fn csrf_preflight<S, C, M, H>(
    State(state): State<ContactAppState<S, C, M, H>>,
    meta: RequestMeta,
) -> Response
where
    S: RateLimitStore + Send + Sync + 'static,
    C: CaptchaVerifier + Send + Sync + 'static,
    M: MailTransport + Send + Sync + 'static,
    H: CrmClient + Send + Sync + 'static,
{
    let use_case = IssueTokenUseCase::new(state.config.clone());
    let mut headers = HeaderMap::new();

    if let Some(origin) = use_case.cors_origin(&meta.origin_headers()) {
        insert_cors(&mut headers, &origin);
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, OPTIONS"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        );
        headers.insert(
            header::ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from_static(PREFLIGHT_MAX_AGE),
        );
    }

    (StatusCode::NO_CONTENT, headers).into_response()
}

// ============================================================================
// Submit Contact Form
// ============================================================================

/// POST /submit-contact-form
pub async fn submit_contact_form<S, C, M, H>(
    State(state): State<ContactAppState<S, C, M, H>>,
    meta: RequestMeta,
    form: Result<ContactForm, ContactError>,
) -> Response
where
    S: RateLimitStore + Send + Sync + 'static,
    C: CaptchaVerifier + Send + Sync + 'static,
    M: MailTransport + Send + Sync + 'static,
    H: CrmClient + Send + Sync + 'static,
{
    let lang = meta.lang();

    let (csrf_field, captcha_response, fields) = match form {
        Ok(form) => (form.csrf_token(), form.captcha_response(), Ok(form.fields())),
        Err(e) => (None, None, Err(e)),
    };

    let composer = MailComposer::new(state.messages.clone(), state.config.clone());
    let dispatcher = MailDispatcher::new(
        state.mailer.clone(),
        state.crm.clone(),
        composer,
        state.crm_config.clone(),
    );
    let use_case = SubmitContactUseCase::new(
        state.store.clone(),
        state.captcha.clone(),
        dispatcher,
        state.config.clone(),
    );

    let input = SubmitContactInput {
        origin: meta.origin_headers(),
        session_cookie: meta.cookie(&state.config.cookie.name),
        csrf_field,
        csrf_header: meta.header(CSRF_HEADER),
        client_ip: meta.client_ip(&state.config.trusted_proxies),
        captcha_response,
        fields,
        lang,
        now: chrono::Utc::now().timestamp(),
    };

    match use_case.execute(input).await {
        Ok(_) => (
            StatusCode::OK,
            Json(SubmitResponse::success(
                state.messages.text("contact-success", lang),
            )),
        )
            .into_response(),
        Err(e) => failure(&state.messages, e, lang),
    }
}

/// Localized `{"success": false, ...}` envelope
fn failure(messages: &MessageCatalog, err: ContactError, lang: Lang) -> Response {
    err.log();
    err.to_app_error(messages, lang).into_response()
}

/// Any method other than POST on the form endpoint
pub async fn method_not_allowed(meta: RequestMeta) -> Response {
    let message = MessageCatalog::builtin().text("contact-error-method-not-allowed", meta.lang());
    let mut response = AppError::method_not_allowed(message).into_response();
    response
        .headers_mut()
        .insert(header::ALLOW, HeaderValue::from_static("POST"));
    response
}

/// Last-resort JSON answer for a panicking handler
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");

    tracing::error!(panic = %detail, "Handler panicked");

    let message = MessageCatalog::builtin().text("contact-error-technical", Lang::default());
    AppError::internal(message).into_response()
}
