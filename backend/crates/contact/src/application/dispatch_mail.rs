//! Mail Dispatch
//!
//! Sends the notification mail (mandatory), then the confirmation mail and
//! the CRM upsert as best-effort side effects.

use chrono::Datelike;
use std::sync::Arc;

use crate::application::compose::MailComposer;
use crate::application::config::CrmConfig;
use crate::application::messages::Lang;
use crate::domain::gateway::{CrmClient, CrmContact, MailTransport};
use crate::domain::submission::{ValidSubmission, split_name};
use crate::error::{ContactResult, CrmError};

/// Result of one best-effort side effect
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    Sent,
    Skipped,
    Failed(String),
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Skipped => "skipped",
            DeliveryStatus::Failed(_) => "failed",
        }
    }
}

/// Independent outcomes of the side effects after the notification went out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub confirmation: DeliveryStatus,
    pub crm: DeliveryStatus,
}

/// Mail dispatcher
pub struct MailDispatcher<M, H>
where
    M: MailTransport,
    H: CrmClient,
{
    transport: Arc<M>,
    crm: Arc<H>,
    composer: MailComposer,
    crm_config: Arc<CrmConfig>,
}

impl<M, H> MailDispatcher<M, H>
where
    M: MailTransport,
    H: CrmClient,
{
    pub fn new(
        transport: Arc<M>,
        crm: Arc<H>,
        composer: MailComposer,
        crm_config: Arc<CrmConfig>,
    ) -> Self {
        Self {
            transport,
            crm,
            composer,
            crm_config,
        }
    }

    /// Only a failed notification is an error
    pub async fn send(&self, sub: &ValidSubmission, lang: Lang) -> ContactResult<DispatchReport> {
        let notification = self.composer.notification(sub)?;
        self.transport.send(&notification).await?;
        tracing::info!("Contact notification sent");

        let confirmation = self.send_confirmation(sub, lang).await;
        let crm = self.sync_crm(sub).await;

        Ok(DispatchReport { confirmation, crm })
    }

    async fn send_confirmation(&self, sub: &ValidSubmission, lang: Lang) -> DeliveryStatus {
        let year = chrono::Utc::now().year();
        let mail = match self.composer.confirmation(sub, lang, year) {
            Ok(mail) => mail,
            Err(e) => {
                tracing::warn!(error = %e, "Confirmation mail could not be composed");
                return DeliveryStatus::Failed(e.to_string());
            }
        };

        match self.transport.send(&mail).await {
            Ok(()) => DeliveryStatus::Sent,
            Err(e) => {
                tracing::warn!(error = %e, "Confirmation mail failed");
                DeliveryStatus::Failed(e.to_string())
            }
        }
    }

    async fn sync_crm(&self, sub: &ValidSubmission) -> DeliveryStatus {
        if !sub.crm_consent {
            tracing::debug!("No CRM consent, skipping sync");
            return DeliveryStatus::Skipped;
        }

        let contact = crm_contact(sub, self.crm_config.message_max_chars);
        match self.crm.upsert_contact(&contact).await {
            Ok(()) => DeliveryStatus::Sent,
            Err(CrmError::NotConfigured) => {
                tracing::info!("CRM not configured, skipping sync");
                DeliveryStatus::Skipped
            }
            Err(e) => {
                tracing::warn!(error = %e, "CRM sync failed");
                DeliveryStatus::Failed(e.to_string())
            }
        }
    }
}

fn crm_contact(sub: &ValidSubmission, message_max_chars: usize) -> CrmContact {
    let (first_name, last_name) = split_name(&sub.name);
    CrmContact {
        email: sub.email.as_str().to_string(),
        first_name,
        last_name,
        phone: sub.phone.clone(),
        mobile_phone: sub.mobile_phone.clone(),
        subject: sub.subject.clone(),
        message: sub.message.chars().take(message_max_chars).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::config::ContactConfig;
    use crate::application::messages::MessageCatalog;
    use crate::domain::gateway::OutgoingMail;
    use crate::domain::submission::SubmissionFields;
    use crate::error::{ContactError, MailError};
    use std::sync::Mutex;

    /// Fails the n-th send (0-based) if configured
    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<OutgoingMail>>,
        fail_at: Option<(usize, MailError)>,
    }

    impl MailTransport for RecordingTransport {
        async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
            let mut sent = self.sent.lock().unwrap();
            if let Some((index, err)) = &self.fail_at {
                if *index == sent.len() {
                    sent.push(mail.clone());
                    return Err(err.clone());
                }
            }
            sent.push(mail.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingCrm {
        contacts: Mutex<Vec<CrmContact>>,
        error: Option<CrmError>,
    }

    impl CrmClient for RecordingCrm {
        async fn upsert_contact(&self, contact: &CrmContact) -> Result<(), CrmError> {
            self.contacts.lock().unwrap().push(contact.clone());
            match &self.error {
                Some(e) => Err(e.clone()),
                None => Ok(()),
            }
        }
    }

    fn dispatcher(
        transport: RecordingTransport,
        crm: RecordingCrm,
    ) -> (
        MailDispatcher<RecordingTransport, RecordingCrm>,
        Arc<RecordingTransport>,
        Arc<RecordingCrm>,
    ) {
        let transport = Arc::new(transport);
        let crm = Arc::new(crm);
        let composer = MailComposer::new(
            Arc::new(MessageCatalog::builtin().clone()),
            Arc::new(ContactConfig {
                recipient_email: "inbox@example.org".into(),
                sender_email: "noreply@example.org".into(),
                ..Default::default()
            }),
        );
        let dispatcher = MailDispatcher::new(
            transport.clone(),
            crm.clone(),
            composer,
            Arc::new(CrmConfig {
                message_max_chars: 5,
                ..Default::default()
            }),
        );
        (dispatcher, transport, crm)
    }

    fn submission(consent: bool) -> ValidSubmission {
        ValidSubmission::validate(&SubmissionFields {
            name: Some("Anna Maria Schmidt".into()),
            email: Some("a@b.de".into()),
            subject: Some("Info".into()),
            message: Some("Hallo Welt".into()),
            crm_consent: consent.then(|| "on".to_string()),
            phone: Some("0123".into()),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_all_steps_succeed() {
        let (d, transport, crm) = dispatcher(RecordingTransport::default(), RecordingCrm::default());
        let report = d.send(&submission(true), Lang::De).await.unwrap();

        assert_eq!(report.confirmation, DeliveryStatus::Sent);
        assert_eq!(report.crm, DeliveryStatus::Sent);
        assert_eq!(transport.sent.lock().unwrap().len(), 2);

        let contacts = crm.contacts.lock().unwrap();
        assert_eq!(contacts[0].first_name, "Anna");
        assert_eq!(contacts[0].last_name, "Maria Schmidt");
        assert_eq!(contacts[0].message, "Hallo");
    }

    #[tokio::test]
    async fn test_notification_failure_is_fatal() {
        let transport = RecordingTransport {
            fail_at: Some((0, MailError::Connection("refused".into()))),
            ..Default::default()
        };
        let (d, transport, crm) = dispatcher(transport, RecordingCrm::default());

        let err = d.send(&submission(true), Lang::De).await.unwrap_err();
        assert!(matches!(err, ContactError::Mail(MailError::Connection(_))));
        assert_eq!(transport.sent.lock().unwrap().len(), 1);
        assert!(crm.contacts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_confirmation_failure_is_tolerated() {
        let transport = RecordingTransport {
            fail_at: Some((1, MailError::Send("550".into()))),
            ..Default::default()
        };
        let (d, _, _) = dispatcher(transport, RecordingCrm::default());

        let report = d.send(&submission(true), Lang::De).await.unwrap();
        assert!(matches!(report.confirmation, DeliveryStatus::Failed(_)));
        assert_eq!(report.crm, DeliveryStatus::Sent);
    }

    #[tokio::test]
    async fn test_crm_outcomes() {
        let (d, _, crm) = dispatcher(RecordingTransport::default(), RecordingCrm::default());
        let report = d.send(&submission(false), Lang::De).await.unwrap();
        assert_eq!(report.crm, DeliveryStatus::Skipped);
        assert!(crm.contacts.lock().unwrap().is_empty());

        let failing = RecordingCrm {
            error: Some(CrmError::Rejected {
                status: 400,
                body: "bad".into(),
            }),
            ..Default::default()
        };
        let (d, _, _) = dispatcher(RecordingTransport::default(), failing);
        let report = d.send(&submission(true), Lang::De).await.unwrap();
        assert!(matches!(report.crm, DeliveryStatus::Failed(_)));

        let unconfigured = RecordingCrm {
            error: Some(CrmError::NotConfigured),
            ..Default::default()
        };
        let (d, _, _) = dispatcher(RecordingTransport::default(), unconfigured);
        let report = d.send(&submission(true), Lang::De).await.unwrap();
        assert_eq!(report.crm, DeliveryStatus::Skipped);
    }
}
