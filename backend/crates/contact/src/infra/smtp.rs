//! SMTP Mail Transport

use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::application::config::{SmtpConfig, SmtpEncryption};
use crate::domain::gateway::{MailAddress, MailTransport, OutgoingMail};
use crate::error::MailError;

/// SMTP reply codes meaning the credentials were refused
const AUTH_FAILURE_CODES: [u16; 3] = [530, 534, 535];

const AUTH_FAILURE_HINTS: [&str; 3] = ["authentication", "credentials", "username and password"];

const CONNECTION_FAILURE_HINTS: [&str; 7] = [
    "connection",
    "could not connect",
    "timed out",
    "unreachable",
    "tls",
    "resolve",
    "network",
];

/// Map a transport failure onto the three user-facing classes
fn classify(timed_out: bool, code: Option<u16>, message: &str) -> MailError {
    let lower = message.to_ascii_lowercase();

    if code.is_some_and(|c| AUTH_FAILURE_CODES.contains(&c))
        || AUTH_FAILURE_HINTS.iter().any(|hint| lower.contains(hint))
    {
        return MailError::Authentication(message.to_string());
    }

    if timed_out || CONNECTION_FAILURE_HINTS.iter().any(|hint| lower.contains(hint)) {
        return MailError::Connection(message.to_string());
    }

    MailError::Send(message.to_string())
}

fn classify_smtp_error(err: &lettre::transport::smtp::Error) -> MailError {
    let code = err
        .status()
        .and_then(|code| code.to_string().parse::<u16>().ok());
    classify(err.is_timeout(), code, &err.to_string())
}

fn to_mailbox(address: &MailAddress) -> Result<Mailbox, MailError> {
    let email: Address = address
        .email
        .parse()
        .map_err(|e| MailError::Send(format!("Invalid address: {}", e)))?;
    Ok(Mailbox::new(address.name.clone(), email))
}

/// Build the MIME message (HTML with plaintext alternative)
fn build_message(mail: &OutgoingMail) -> Result<Message, MailError> {
    let mut builder = Message::builder()
        .from(to_mailbox(&mail.from)?)
        .to(to_mailbox(&mail.to)?)
        .subject(mail.subject.clone());

    if let Some(reply_to) = &mail.reply_to {
        builder = builder.reply_to(to_mailbox(reply_to)?);
    }

    builder
        .multipart(MultiPart::alternative_plain_html(
            mail.text.clone(),
            mail.html.clone(),
        ))
        .map_err(|e| MailError::Send(e.to_string()))
}

/// Pooled async SMTP transport
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        config.validate().map_err(MailError::Connection)?;

        let builder = match config.encryption {
            SmtpEncryption::Ssl => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| MailError::Connection(e.to_string()))?,
            SmtpEncryption::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                    .map_err(|e| MailError::Connection(e.to_string()))?
            }
            SmtpEncryption::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            }
        };

        let builder = builder
            .port(config.port)
            .timeout(Some(config.timeout))
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));

        tracing::debug!(
            host = %config.host,
            port = config.port,
            encryption = ?config.encryption,
            "SMTP transport configured"
        );

        Ok(Self {
            transport: builder.build(),
        })
    }
}

impl MailTransport for SmtpMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        let message = build_message(mail)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| classify_smtp_error(&e))?;

        tracing::debug!(subject = %mail.subject, "Mail delivered to relay");
        Ok(())
    }
}
