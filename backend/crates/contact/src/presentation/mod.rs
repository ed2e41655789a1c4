//! Presentation Layer
//!
//! HTTP extractors, DTOs, handlers and the router.

pub mod dto;
pub mod extract;
pub mod handlers;
pub mod language;
pub mod router;

pub use handlers::ContactAppState;
pub use router::contact_router;
