//! Application Layer
//!
//! Configuration, message catalog, mail composition and use cases.

pub mod compose;
pub mod config;
pub mod dispatch_mail;
pub mod issue_token;
pub mod messages;
pub mod submit_contact;
pub mod token_service;

// Re-exports
pub use compose::MailComposer;
pub use config::ContactConfig;
pub use dispatch_mail::{DeliveryStatus, DispatchReport, MailDispatcher};
pub use issue_token::{IssueTokenInput, IssueTokenOutput, IssueTokenUseCase};
pub use messages::{Lang, MessageCatalog};
pub use submit_contact::{
    PipelineStage, SubmitContactInput, SubmitContactOutput, SubmitContactUseCase,
};
pub use token_service::TokenService;
