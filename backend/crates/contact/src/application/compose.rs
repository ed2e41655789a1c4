//! Mail Composition
//!
//! Renders the notification and confirmation mails from askama templates.

use askama::Template;
use std::sync::Arc;

use crate::application::config::ContactConfig;
use crate::application::messages::{Lang, MessageCatalog};
use crate::domain::gateway::{MailAddress, OutgoingMail};
use crate::domain::submission::ValidSubmission;
use crate::error::ComposeError;

pub const NOTIFICATION_SENDER_NAME: &str = "Kontaktformular";
pub const CONTACT_EMAIL: &str = "vorstand@business-consulting.de";
pub const WEBSITE_URL: &str = "https://business-consulting.de";
pub const REFERENCES_URL: &str = "https://business-consulting.de/referenzen.html";
pub const PRIVACY_URL: &str = "https://business-consulting.de/datenschutz.html";

/// Fields shared by both notification bodies
struct NotificationView<'a> {
    name: &'a str,
    email: &'a str,
    subject: &'a str,
    short_code: &'a str,
    rating_stars: String,
    rating_value: String,
    message: &'a str,
    message_html: String,
    references_url: &'static str,
}

#[derive(Template)]
#[template(path = "notification.html")]
struct NotificationHtml<'a> {
    v: &'a NotificationView<'a>,
}

#[derive(Template)]
#[template(path = "notification.txt")]
struct NotificationText<'a> {
    v: &'a NotificationView<'a>,
}

/// Localized confirmation copy; `greeting` is pre-rendered for the target format
struct ConfirmationView<'a> {
    lang: &'static str,
    header_title: String,
    greeting: String,
    thankyou: String,
    response_time: String,
    summary_title: String,
    subject_label: String,
    subject: &'a str,
    short_code_label: String,
    short_code: &'a str,
    rating_label: String,
    rating_stars: String,
    rating_value: String,
    message_label: String,
    message: &'a str,
    message_html: String,
    closing: String,
    team: String,
    contact_title: String,
    org_name: String,
    address_lines: Vec<String>,
    email_label: String,
    contact_email: &'static str,
    website_label: String,
    website_url: &'static str,
    facebook_url: &'a str,
    instagram_url: &'a str,
    linkedin_url: &'a str,
    copyright: String,
    rights: String,
    privacy_label: String,
    privacy_url: &'static str,
    automated: String,
}

#[derive(Template)]
#[template(path = "confirmation.html")]
struct ConfirmationHtml<'a> {
    v: &'a ConfirmationView<'a>,
}

#[derive(Template)]
#[template(path = "confirmation.txt")]
struct ConfirmationText<'a> {
    v: &'a ConfirmationView<'a>,
}

/// Escaped text with line breaks turned into `<br>`
fn message_to_html(message: &str) -> String {
    html_escape::encode_safe(&message.replace("\r\n", "\n")).replace('\n', "<br>\n")
}

/// Composes outgoing mails for a validated submission
pub struct MailComposer {
    catalog: Arc<MessageCatalog>,
    config: Arc<ContactConfig>,
}

impl MailComposer {
    pub fn new(catalog: Arc<MessageCatalog>, config: Arc<ContactConfig>) -> Self {
        Self { catalog, config }
    }

    /// Mail to the organisation inbox; replies go to the submitter
    pub fn notification(&self, sub: &ValidSubmission) -> Result<OutgoingMail, ComposeError> {
        let view = NotificationView {
            name: &sub.name,
            email: sub.email.as_str(),
            subject: &sub.subject,
            short_code: sub.short_code.as_deref().unwrap_or_default(),
            rating_stars: sub
                .rating
                .map(|r| r.stars("⭐", "½⭐", "☆"))
                .unwrap_or_default(),
            rating_value: sub.rating.map(|r| r.to_string()).unwrap_or_default(),
            message: &sub.message,
            message_html: message_to_html(&sub.message),
            references_url: REFERENCES_URL,
        };

        Ok(OutgoingMail {
            from: MailAddress::new(Some(NOTIFICATION_SENDER_NAME), &self.config.sender_email),
            to: MailAddress::new(None, &self.config.recipient_email),
            reply_to: Some(MailAddress::new(Some(&sub.name), sub.email.as_str())),
            subject: format!("Neue Kontaktanfrage: {}", sub.subject),
            html: NotificationHtml { v: &view }.render()?,
            text: NotificationText { v: &view }.render()?,
        })
    }

    /// Localized acknowledgement to the submitter
    pub fn confirmation(
        &self,
        sub: &ValidSubmission,
        lang: Lang,
        year: i32,
    ) -> Result<OutgoingMail, ComposeError> {
        let html_view = self.confirmation_view(sub, lang, year, true);
        let text_view = self.confirmation_view(sub, lang, year, false);
        let org_name = self.catalog.text("email-confirm-contact-org-name", lang);

        Ok(OutgoingMail {
            from: MailAddress::new(Some(&org_name), &self.config.sender_email),
            to: MailAddress::new(Some(&sub.name), sub.email.as_str()),
            reply_to: None,
            subject: self.catalog.render_plain(
                "email-confirm-subject",
                lang,
                &[("subject", &sub.subject)],
            ),
            html: ConfirmationHtml { v: &html_view }.render()?,
            text: ConfirmationText { v: &text_view }.render()?,
        })
    }

    fn confirmation_view<'a>(
        &'a self,
        sub: &'a ValidSubmission,
        lang: Lang,
        year: i32,
        html: bool,
    ) -> ConfirmationView<'a> {
        let t = |key: &str| self.catalog.text(key, lang);
        let greeting_key = if sub.prefers_casual_greeting() {
            "email-confirm-greeting-casual"
        } else {
            "email-confirm-greeting-formal"
        };
        let name = [("name", sub.name.as_str())];
        let greeting = if html {
            self.catalog.render(greeting_key, lang, &name)
        } else {
            self.catalog.render_plain(greeting_key, lang, &name)
        };
        let links = &self.config.social_links;

        ConfirmationView {
            lang: lang.as_str(),
            header_title: t("email-confirm-header-title"),
            greeting,
            thankyou: t("email-confirm-thankyou"),
            response_time: t("email-confirm-response-time"),
            summary_title: t("email-confirm-summary-title"),
            subject_label: t("email-confirm-summary-subject"),
            subject: &sub.subject,
            short_code_label: t("email-confirm-summary-kuerzel"),
            short_code: sub.short_code.as_deref().unwrap_or_default(),
            rating_label: t("email-confirm-summary-rating"),
            rating_stars: sub
                .rating
                .map(|r| r.stars("★", "½", "☆"))
                .unwrap_or_default(),
            rating_value: sub.rating.map(|r| r.to_string()).unwrap_or_default(),
            message_label: t("email-confirm-summary-message"),
            message: &sub.message,
            message_html: message_to_html(&sub.message),
            closing: t("email-confirm-closing"),
            team: t("email-confirm-team"),
            contact_title: t("email-confirm-contact-title"),
            org_name: t("email-confirm-contact-org-name"),
            address_lines: t("email-confirm-contact-address")
                .lines()
                .map(str::to_string)
                .collect(),
            email_label: t("email-confirm-contact-email-label"),
            contact_email: CONTACT_EMAIL,
            website_label: t("email-confirm-contact-website-label"),
            website_url: WEBSITE_URL,
            facebook_url: &links.facebook,
            instagram_url: &links.instagram,
            linkedin_url: &links.linkedin,
            copyright: self.catalog.render_plain(
                "email-confirm-footer-copyright",
                lang,
                &[("year", &year.to_string())],
            ),
            rights: t("email-confirm-footer-rights"),
            privacy_label: t("email-confirm-footer-privacy"),
            privacy_url: PRIVACY_URL,
            automated: t("email-confirm-footer-automated"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::submission::SubmissionFields;

    fn composer() -> MailComposer {
        let config = ContactConfig {
            recipient_email: "inbox@business-consulting.de".into(),
            sender_email: "noreply@business-consulting.de".into(),
            ..Default::default()
        };
        MailComposer::new(Arc::new(MessageCatalog::builtin().clone()), Arc::new(config))
    }

    fn submission(subject: &str) -> ValidSubmission {
        ValidSubmission::validate(&SubmissionFields {
            name: Some("Anna <Admin>".into()),
            email: Some("a@b.de".into()),
            subject: Some(subject.into()),
            message: Some("Zeile 1\nZeile 2 & <script>".into()),
            short_code: Some("AB".into()),
            rating: Some("4.5".into()),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_notification_headers() {
        let mail = composer().notification(&submission("Info")).unwrap();
        assert_eq!(mail.subject, "Neue Kontaktanfrage: Info");
        assert_eq!(mail.from.name.as_deref(), Some("Kontaktformular"));
        assert_eq!(mail.from.email, "noreply@business-consulting.de");
        assert_eq!(mail.to.email, "inbox@business-consulting.de");
        assert_eq!(mail.reply_to.unwrap().email, "a@b.de");
    }

    #[test]
    fn test_notification_html_is_escaped() {
        let mail = composer().notification(&submission("Info")).unwrap();
        assert!(mail.html.contains("Anna &lt;Admin&gt;"));
        assert!(mail.html.contains("Zeile 1<br>"));
        assert!(mail.html.contains("&lt;script&gt;"));
        assert!(!mail.html.contains("<script>"));
        assert!(mail.html.contains("⭐⭐⭐⭐½⭐"));
    }

    #[test]
    fn test_notification_text_is_verbatim() {
        let mail = composer().notification(&submission("Info")).unwrap();
        assert!(mail.text.contains("Name: Anna <Admin>"));
        assert!(mail.text.contains("Kürzel: AB"));
        assert!(mail.text.contains("Bewertung: 4.5/5 Sternen"));
        assert!(mail.text.contains("Zeile 2 & <script>"));
    }

    #[test]
    fn test_confirmation_greeting_variants() {
        let c = composer();
        let formal = c.confirmation(&submission("Projekt"), Lang::En, 2026).unwrap();
        assert!(formal.text.contains("Dear Anna <Admin>,"));
        assert!(formal.html.contains("Dear Anna &lt;Admin&gt;,"));

        let casual = c.confirmation(&submission("Bewerbung"), Lang::En, 2026).unwrap();
        assert!(casual.text.contains("Hi Anna <Admin>,"));
    }

    #[test]
    fn test_confirmation_content() {
        let mail = composer()
            .confirmation(&submission("Info"), Lang::De, 2026)
            .unwrap();
        assert_eq!(mail.subject, "Deine Anfrage: Info");
        assert_eq!(mail.to.email, "a@b.de");
        assert_eq!(
            mail.from.name.as_deref(),
            Some("Institut für Business Consulting e.V.")
        );
        assert!(mail.text.contains("★★★★½"));
        assert!(mail.text.contains("© 2026"));
        assert!(mail.text.contains("https://www.instagram.com/ibc_e.v/"));
        assert!(mail.html.contains("lang=\"de\""));
    }
}
