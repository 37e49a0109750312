//! Best-effort upload notifications over SMTP.
//!
//! [`Notifier::notify`] mirrors the analyzer's contract: it never returns
//! an error. Every failure mode collapses to [`NotifyOutcome::Skipped`]
//! with a reason, logged and otherwise dropped, so a dead relay can never
//! fail an upload. Exactly one delivery attempt per item.
//!
//! Transport resolution prefers the user's own SMTP settings and falls
//! back to the process-wide environment defaults.

use std::path::PathBuf;

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{AppConfig, SmtpServerConfig};
use crate::intake;
use crate::models::{MailItem, User, UserSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    Sent,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Upload notifications are switched off in the user's settings.
    Disabled,
    /// The account has no email address to deliver to.
    NoEmailAddress,
    /// The stored upload is gone from disk; nothing to attach.
    AttachmentMissing,
    /// No SMTP transport resolvable from settings or environment.
    NotConfigured,
    /// The message itself would not assemble (bad address, bad MIME).
    BuildFailed,
    /// The relay refused or the connection failed.
    TransportFailed,
}

impl SkipReason {
    /// Wire form for the email test endpoints.
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::Disabled => "disabled",
            SkipReason::NoEmailAddress => "no_email_address",
            SkipReason::AttachmentMissing => "attachment_missing",
            SkipReason::NotConfigured => "not_configured",
            SkipReason::BuildFailed => "build_failed",
            SkipReason::TransportFailed => "transport_failed",
        }
    }
}

/// Where the resolved transport came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpSource {
    User,
    Environment,
}

/// The non-secret view of the resolved transport, for
/// `GET /api/email/test-config`. Credentials are structurally absent.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportInfo {
    pub source: SmtpSource,
    pub host: String,
    pub port: u16,
    pub secure: bool,
    pub from: String,
}

struct ResolvedSmtp {
    source: SmtpSource,
    host: String,
    port: u16,
    secure: bool,
    username: Option<String>,
    password: Option<String>,
    from_name: Option<String>,
    from_address: String,
}

#[derive(Debug, Error)]
enum ComposeError {
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("invalid attachment content type: {0}")]
    ContentType(#[from] lettre::message::header::ContentTypeErr),
    #[error("message assembly failed: {0}")]
    Message(#[from] lettre::error::Error),
}

pub struct Notifier {
    defaults: Option<SmtpServerConfig>,
    upload_dir: PathBuf,
}

impl Notifier {
    pub fn new(defaults: Option<SmtpServerConfig>, upload_dir: PathBuf) -> Self {
        Self { defaults, upload_dir }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        if cfg.smtp.is_none() {
            info!("no SMTP defaults configured; notifications need per-user SMTP settings");
        }
        Self::new(cfg.smtp.clone(), cfg.upload_dir.clone())
    }

    /// Send the "new mail scanned" email for a freshly persisted item.
    pub async fn notify(
        &self,
        user: &User,
        settings: &UserSettings,
        item: &MailItem,
    ) -> NotifyOutcome {
        let outcome = self.try_notify(user, settings, item).await;
        match outcome {
            NotifyOutcome::Sent => {
                info!(user = %user.id, item = item.id, "upload notification sent")
            }
            NotifyOutcome::Skipped(reason) => {
                warn!(user = %user.id, item = item.id, reason = reason.as_str(), "upload notification skipped")
            }
        }
        outcome
    }

    async fn try_notify(
        &self,
        user: &User,
        settings: &UserSettings,
        item: &MailItem,
    ) -> NotifyOutcome {
        if !settings.notify_on_upload {
            return NotifyOutcome::Skipped(SkipReason::Disabled);
        }
        let Some(email) = user.email.as_deref() else {
            return NotifyOutcome::Skipped(SkipReason::NoEmailAddress);
        };
        let Some(smtp) = self.resolve(settings) else {
            return NotifyOutcome::Skipped(SkipReason::NotConfigured);
        };

        let stored_name = item
            .image_url
            .strip_prefix("/uploads/")
            .unwrap_or(&item.image_url);
        let attachment = match tokio::fs::read(self.upload_dir.join(stored_name)).await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(error = %err, stored = stored_name, "stored upload unreadable, skipping attachment path");
                return NotifyOutcome::Skipped(SkipReason::AttachmentMissing);
            }
        };

        let message = match compose(&smtp, email, user, item, attachment) {
            Ok(m) => m,
            Err(err) => {
                warn!(error = %err, "could not compose notification email");
                return NotifyOutcome::Skipped(SkipReason::BuildFailed);
            }
        };

        self.deliver(&smtp, message).await
    }

    /// A short credential-check message, no attachment. Deliberately does
    /// not honour the `notify_on_upload` toggle: that gates uploads, and a
    /// test send is an explicit request.
    pub async fn send_test(&self, user: &User, settings: &UserSettings) -> NotifyOutcome {
        let Some(email) = user.email.as_deref() else {
            return NotifyOutcome::Skipped(SkipReason::NoEmailAddress);
        };
        let Some(smtp) = self.resolve(settings) else {
            return NotifyOutcome::Skipped(SkipReason::NotConfigured);
        };

        let message = match compose_test(&smtp, email, user) {
            Ok(m) => m,
            Err(err) => {
                warn!(error = %err, "could not compose test email");
                return NotifyOutcome::Skipped(SkipReason::BuildFailed);
            }
        };

        let outcome = self.deliver(&smtp, message).await;
        match outcome {
            NotifyOutcome::Sent => info!(user = %user.id, "test email sent"),
            NotifyOutcome::Skipped(reason) => {
                warn!(user = %user.id, reason = reason.as_str(), "test email not sent")
            }
        }
        outcome
    }

    /// The resolved transport with secrets removed, or `None` when neither
    /// the user nor the environment provides one.
    pub fn transport_info(&self, settings: &UserSettings) -> Option<TransportInfo> {
        self.resolve(settings).map(|smtp| TransportInfo {
            source: smtp.source,
            host: smtp.host,
            port: smtp.port,
            secure: smtp.secure,
            from: smtp.from_address,
        })
    }

    fn resolve(&self, settings: &UserSettings) -> Option<ResolvedSmtp> {
        if let Some(o) = settings.smtp_override() {
            // an override that cannot produce a sender falls through to
            // the environment defaults
            if let Some(from_address) = o.from.clone().or_else(|| o.username.clone()) {
                return Some(ResolvedSmtp {
                    source: SmtpSource::User,
                    host: o.host,
                    port: o.port.and_then(|p| u16::try_from(p).ok()).unwrap_or(587),
                    secure: o.secure.unwrap_or(false),
                    username: o.username,
                    password: o.password,
                    from_name: None,
                    from_address,
                });
            }
            warn!("per-user SMTP settings have no usable sender address; using environment defaults");
        }
        self.defaults.as_ref().map(|d| ResolvedSmtp {
            source: SmtpSource::Environment,
            host: d.host.clone(),
            port: d.port,
            secure: d.secure,
            username: d.username.clone(),
            password: d.password.clone(),
            from_name: d.from_name.clone(),
            from_address: d.from_address.clone(),
        })
    }

    async fn deliver(
        &self,
        smtp: &ResolvedSmtp,
        message: Message,
    ) -> NotifyOutcome {
        let transport = match build_transport(smtp) {
            Ok(t) => t,
            Err(err) => {
                warn!(error = %err, host = %smtp.host, "could not build SMTP transport");
                return NotifyOutcome::Skipped(SkipReason::TransportFailed);
            }
        };
        match transport.send(message).await {
            Ok(_) => NotifyOutcome::Sent,
            Err(err) => {
                warn!(error = %err, host = %smtp.host, "SMTP delivery failed");
                NotifyOutcome::Skipped(SkipReason::TransportFailed)
            }
        }
    }
}

/// `secure` means implicit TLS from the first byte (SMTPS); otherwise the
/// connection opens plain and upgrades via STARTTLS.
fn build_transport(
    smtp: &ResolvedSmtp,
) -> Result<AsyncSmtpTransport<Tokio1Executor>, lettre::transport::smtp::Error> {
    let mut builder = if smtp.secure {
        AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)?
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)?
    };
    builder = builder.port(smtp.port);
    if let (Some(username), Some(password)) = (&smtp.username, &smtp.password) {
        builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
    }
    Ok(builder.build())
}

fn compose(
    smtp: &ResolvedSmtp,
    to: &str,
    user: &User,
    item: &MailItem,
    attachment_bytes: Vec<u8>,
) -> Result<Message, ComposeError> {
    let extension = intake::extension_of(&item.file_name).unwrap_or_default();
    let content_type = ContentType::parse(intake::mime_for_extension(&extension))?;
    let attachment = Attachment::new(item.file_name.clone()).body(attachment_bytes, content_type);

    let alternative = MultiPart::alternative_plain_html(plain_body(user, item), html_body(user, item));

    Ok(Message::builder()
        .from(sender_mailbox(smtp)?)
        .to(Mailbox::new(Some(user.display_name()), to.parse::<Address>()?))
        .subject(format!("New mail scanned: {}", item.title))
        .multipart(MultiPart::mixed().multipart(alternative).singlepart(attachment))?)
}

fn compose_test(smtp: &ResolvedSmtp, to: &str, user: &User) -> Result<Message, ComposeError> {
    let body = format!(
        "Hi {},\n\nThis is a test message confirming that your email \
         notification settings work. Scanned mail notifications will be \
         delivered to this address.\n",
        user.display_name()
    );
    Ok(Message::builder()
        .from(sender_mailbox(smtp)?)
        .to(Mailbox::new(Some(user.display_name()), to.parse::<Address>()?))
        .subject("Test notification")
        .body(body)?)
}

fn sender_mailbox(smtp: &ResolvedSmtp) -> Result<Mailbox, ComposeError> {
    Ok(Mailbox::new(
        smtp.from_name.clone(),
        smtp.from_address.parse::<Address>()?,
    ))
}

fn plain_body(user: &User, item: &MailItem) -> String {
    let mut body = format!(
        "Hi {},\n\nA new piece of mail was scanned and filed.\n\n\
         Title:    {}\nFile:     {}\nCategory: {}\nUploaded: {}\n",
        user.display_name(),
        item.title,
        item.file_name,
        item.category,
        item.upload_date.format("%d %b %Y, %H:%M UTC"),
    );
    if let Some(date) = item.reminder_date {
        body.push_str(&format!("Reminder: {date}\n"));
    }
    if !item.summary.is_empty() {
        body.push_str(&format!("\nSummary:\n{}\n", item.summary));
    }
    if let Some(text) = item.extracted_text.as_deref() {
        body.push_str(&format!("\nExtracted text:\n{text}\n"));
    }
    body
}

fn html_body(user: &User, item: &MailItem) -> String {
    let mut rows = format!(
        "<tr><td><b>File</b></td><td>{}</td></tr>\
         <tr><td><b>Category</b></td><td>{}</td></tr>\
         <tr><td><b>Uploaded</b></td><td>{}</td></tr>",
        escape_html(&item.file_name),
        item.category,
        item.upload_date.format("%d %b %Y, %H:%M UTC"),
    );
    if let Some(date) = item.reminder_date {
        rows.push_str(&format!("<tr><td><b>Reminder</b></td><td>{date}</td></tr>"));
    }

    let mut html = format!(
        "<div style=\"font-family: sans-serif; max-width: 600px;\">\
         <h2 style=\"margin-bottom: 4px;\">{}</h2>\
         <p>Hi {}, a new piece of mail was scanned and filed.</p>\
         <table cellpadding=\"4\">{rows}</table>",
        escape_html(&item.title),
        escape_html(&user.display_name()),
    );
    if !item.summary.is_empty() {
        html.push_str(&format!("<p>{}</p>", escape_html(&item.summary)));
    }
    if let Some(text) = item.extracted_text.as_deref() {
        html.push_str(&format!(
            "<pre style=\"background: #f4f4f4; padding: 8px; white-space: pre-wrap;\">{}</pre>",
            escape_html(text)
        ));
    }
    html.push_str("</div>");
    html
}

/// Minimal escaping; titles, summaries and extracted text are model output
/// and must not inject markup into the notification.
fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuthProvider, Category};
    use chrono::Utc;

    fn user(email: Option<&str>) -> User {
        User {
            id: "email:u1".into(),
            email: email.map(String::from),
            first_name: Some("Ada".into()),
            last_name: None,
            auth_provider: AuthProvider::Email,
            password_hash: Some("x".into()),
            email_verified: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn settings(notify: bool, host: Option<&str>) -> UserSettings {
        UserSettings {
            user_id: "email:u1".into(),
            theme: "system".into(),
            language: "en".into(),
            timezone: "Europe/London".into(),
            notify_on_upload: notify,
            notify_reminders: true,
            auto_delete: "never".into(),
            smtp_host: host.map(String::from),
            smtp_port: Some(2525),
            smtp_secure: Some(false),
            smtp_username: Some("scanner@example.com".into()),
            smtp_password: Some("pw".into()),
            smtp_from: Some("scanner@example.com".into()),
            updated_at: Utc::now(),
        }
    }

    fn item() -> MailItem {
        MailItem {
            id: 1,
            user_id: "email:u1".into(),
            title: "Council Tax <2026>".into(),
            summary: "£120 due".into(),
            category: Category::Bill,
            categories: vec![],
            custom_categories: vec![],
            reminder_date: None,
            image_url: "/uploads/abc.pdf".into(),
            file_name: "council_tax.pdf".into(),
            extracted_text: Some("Reference & 42".into()),
            upload_date: Utc::now(),
        }
    }

    fn notifier(defaults: bool) -> Notifier {
        let d = defaults.then(|| SmtpServerConfig {
            host: "smtp.example.com".into(),
            port: 587,
            secure: false,
            username: None,
            password: None,
            from_name: Some("Posty".into()),
            from_address: "posty@example.com".into(),
        });
        Notifier::new(d, std::env::temp_dir().join("posty-notify-tests"))
    }

    #[tokio::test]
    async fn disabled_toggle_short_circuits() {
        let out = notifier(true)
            .notify(&user(Some("a@example.com")), &settings(false, None), &item())
            .await;
        assert_eq!(out, NotifyOutcome::Skipped(SkipReason::Disabled));
    }

    #[tokio::test]
    async fn missing_email_skips() {
        let out = notifier(true)
            .notify(&user(None), &settings(true, None), &item())
            .await;
        assert_eq!(out, NotifyOutcome::Skipped(SkipReason::NoEmailAddress));
    }

    #[tokio::test]
    async fn no_transport_anywhere_skips() {
        let out = notifier(false)
            .notify(&user(Some("a@example.com")), &settings(true, None), &item())
            .await;
        assert_eq!(out, NotifyOutcome::Skipped(SkipReason::NotConfigured));
    }

    #[tokio::test]
    async fn missing_attachment_skips_before_any_network_io() {
        let out = notifier(true)
            .notify(&user(Some("a@example.com")), &settings(true, None), &item())
            .await;
        assert_eq!(out, NotifyOutcome::Skipped(SkipReason::AttachmentMissing));
    }

    #[test]
    fn transport_resolution_prefers_user_settings() {
        let n = notifier(true);
        let info = n.transport_info(&settings(true, Some("mail.user.net"))).unwrap();
        assert_eq!(info.source, SmtpSource::User);
        assert_eq!(info.host, "mail.user.net");
        assert_eq!(info.port, 2525);

        let info = n.transport_info(&settings(true, None)).unwrap();
        assert_eq!(info.source, SmtpSource::Environment);
        assert_eq!(info.host, "smtp.example.com");
        assert_eq!(info.from, "posty@example.com");
    }

    #[test]
    fn transport_info_has_no_secret_fields() {
        let n = notifier(true);
        let json =
            serde_json::to_value(n.transport_info(&settings(true, Some("mail.user.net"))).unwrap())
                .unwrap();
        let text = json.to_string();
        assert!(!text.contains("pw"), "{text}");
        assert!(!text.contains("username"), "{text}");
        assert!(!text.contains("password"), "{text}");
    }

    #[test]
    fn bodies_embed_item_fields_and_escape_html() {
        let html = html_body(&user(Some("a@example.com")), &item());
        assert!(html.contains("Council Tax &lt;2026&gt;"));
        assert!(html.contains("Reference &amp; 42"));
        assert!(html.contains("<pre"));
        assert!(html.contains("council_tax.pdf"));

        let plain = plain_body(&user(Some("a@example.com")), &item());
        assert!(plain.contains("Council Tax <2026>"));
        assert!(plain.contains("council_tax.pdf"));
        assert!(plain.contains("Extracted text:"));
    }

    #[test]
    fn reminder_line_only_when_present() {
        let mut with_date = item();
        with_date.reminder_date = chrono::NaiveDate::from_ymd_opt(2026, 9, 8);
        assert!(plain_body(&user(None), &with_date).contains("Reminder: 2026-09-08"));
        assert!(!plain_body(&user(None), &item()).contains("Reminder:"));
    }
}
