//! Contact Router

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::catch_panic::CatchPanicLayer;

use crate::domain::gateway::{CaptchaVerifier, CrmClient, MailTransport, RateLimitStore};
use crate::presentation::handlers::{self, ContactAppState};

/// Create the contact router
///
/// - `GET|OPTIONS /csrf-token`
/// - `POST /submit-contact-form` (JSON 405 for other methods)
///
/// Panics inside a handler become a JSON 500.
pub fn contact_router<S, C, M, H>(state: ContactAppState<S, C, M, H>) -> Router
where
    S: RateLimitStore + Send + Sync + 'static,
    C: CaptchaVerifier + Send + Sync + 'static,
    M: MailTransport + Send + Sync + 'static,
    H: CrmClient + Send + Sync + 'static,
{
    Router::new()
        .route(
            "/csrf-token",
            get(handlers::csrf_token::<S, C, M, H>).options(handlers::csrf_preflight::<S, C, M, H>),
        )
        .route(
            "/submit-contact-form",
            post(handlers::submit_contact_form::<S, C, M, H>).fallback(handlers::method_not_allowed),
        )
        .with_state(state)
        .layer(CatchPanicLayer::custom(handlers::panic_response))
}
