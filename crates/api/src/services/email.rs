//! Email service for registration notifications.
//!
//! Supports multiple email providers:
//! - `console`: Logs emails (development)
//! - `smtp`: Delivers through an SMTP relay (lettre, STARTTLS by default)
//! - `sendgrid`: Uses the SendGrid v3 API

use chrono::{DateTime, Utc};
use domain::services::RegistrationNotice;
use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::{EmailConfig, EmailProvider, TemplateStyle};

const SENDGRID_ENDPOINT: &str = "https://api.sendgrid.com/v3/mail/send";

/// Errors that can occur during email operations.
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email service not configured")]
    NotConfigured,

    #[error("Failed to send email: {0}")]
    SendFailed(String),

    #[error("Provider error: {0}")]
    ProviderError(String),
}

/// Email message to be sent.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    /// Recipient email address
    pub to: String,
    /// Recipient name (optional)
    pub to_name: Option<String>,
    /// Email subject
    pub subject: String,
    /// Plain text body
    pub body_text: String,
    /// HTML body (optional)
    pub body_html: Option<String>,
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    config: Arc<EmailConfig>,
    client: reqwest::Client,
}

impl EmailService {
    /// Creates a new EmailService with the given configuration.
    pub fn new(config: EmailConfig) -> Self {
        Self {
            config: Arc::new(config),
            client: reqwest::Client::new(),
        }
    }

    /// Check if email service is enabled.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Send an email message.
    pub async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        if !self.config.enabled {
            debug!(
                to = %message.to,
                subject = %message.subject,
                "Email service disabled, skipping send"
            );
            return Ok(());
        }

        match self.config.provider {
            EmailProvider::Console => self.send_console(message),
            EmailProvider::Smtp => self.send_smtp(message).await,
            EmailProvider::Sendgrid => self.send_sendgrid(message).await,
        }
    }

    /// Renders the confirmation sent to the user who registered.
    pub fn registration_confirmation(&self, notice: &RegistrationNotice) -> EmailMessage {
        let event = &notice.event;
        let attendee = &notice.attendee;
        let events_url = self.events_url();

        let mut details = vec![
            ("Event Name", event.name.clone()),
            ("Event Date", long_date(event.date)),
            ("Description", event.description.clone()),
        ];
        if event.image.is_some() {
            details.push(("Event Image", format!("View the event at {}", events_url)));
        }

        let mut registration = vec![("Registered At", long_date(notice.registered_at))];
        if let Some(remaining) = notice.remaining_spots() {
            registration.push(("Event Capacity", format!("{} attendees", event.limit)));
            registration.push(("Current Attendees", notice.attendee_count.to_string()));
            registration.push(("Spots Remaining", remaining.to_string()));
        }

        let content = EmailContent {
            heading: "Event Registration Confirmation".to_string(),
            intro: vec![
                format!("Hello {},", attendee.name),
                format!("Thank you for registering for {}!", event.name),
            ],
            sections: vec![
                ("Event Details", details),
                ("Registration Information", registration),
            ],
            outro: Some("We look forward to seeing you at the event!".to_string()),
            button: ("View All Events", events_url),
        };

        EmailMessage {
            to: attendee.email.clone(),
            to_name: Some(attendee.name.clone()),
            subject: format!("Registration Confirmation: {}", event.name),
            body_text: content.render_text(&self.config.app_name),
            body_html: self.html_enabled().then(|| content.render_html(&self.config.app_name)),
        }
    }

    /// Renders the alert sent to the event owner. `None` when the notice has
    /// no owner to address.
    pub fn owner_alert(&self, notice: &RegistrationNotice) -> Option<EmailMessage> {
        let owner = notice.owner.as_ref()?;
        let event = &notice.event;
        let attendee = &notice.attendee;

        let mut status = vec![("Total Attendees", notice.attendee_count.to_string())];
        if let Some(remaining) = notice.remaining_spots() {
            status.push(("Event Limit", event.limit.to_string()));
            status.push(("Spots Remaining", remaining.to_string()));
        }

        let content = EmailContent {
            heading: "New Event Registration".to_string(),
            intro: vec![format!(
                "{} has registered for your event {}.",
                attendee.name, event.name
            )],
            sections: vec![
                (
                    "Event Details",
                    vec![
                        ("Event Name", event.name.clone()),
                        ("Event Date", short_date(event.date)),
                        ("Description", event.description.clone()),
                    ],
                ),
                (
                    "Attendee Information",
                    vec![
                        ("Name", attendee.name.clone()),
                        ("Email", attendee.email.clone()),
                        ("Registered At", short_date(notice.registered_at)),
                    ],
                ),
                ("Current Registration Status", status),
            ],
            outro: None,
            button: ("View events", self.events_url()),
        };

        Some(EmailMessage {
            to: owner.email.clone(),
            to_name: Some(owner.name.clone()),
            subject: format!("New Registration for: {}", event.name),
            body_text: content.render_text(&self.config.app_name),
            body_html: self.html_enabled().then(|| content.render_html(&self.config.app_name)),
        })
    }

    fn html_enabled(&self) -> bool {
        self.config.template_style == TemplateStyle::Html
    }

    fn events_url(&self) -> String {
        format!("{}/events", self.config.base_url.trim_end_matches('/'))
    }

    /// Console provider - logs the email.
    fn send_console(&self, message: EmailMessage) -> Result<(), EmailError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            from = %self.config.sender_email,
            from_name = %self.config.sender_name,
            "Email (console provider)"
        );

        info!(body_text = %message.body_text, "Email body (plain text)");

        if let Some(html) = &message.body_html {
            debug!(body_html_length = html.len(), "Email body (HTML)");
        }

        Ok(())
    }

    /// SMTP provider - delivers through the configured relay.
    async fn send_smtp(&self, message: EmailMessage) -> Result<(), EmailError> {
        if self.config.smtp_host.is_empty() {
            return Err(EmailError::NotConfigured);
        }

        let email = smtp_message(&self.config, &message)?;
        let transport = smtp_transport(&self.config)?;

        transport
            .send(email)
            .await
            .map_err(|e| EmailError::SendFailed(format!("SMTP delivery failed: {}", e)))?;

        info!(
            to = %message.to,
            subject = %message.subject,
            smtp_host = %self.config.smtp_host,
            "Email sent via SMTP"
        );

        Ok(())
    }

    /// SendGrid provider - sends via SendGrid API.
    async fn send_sendgrid(&self, message: EmailMessage) -> Result<(), EmailError> {
        if self.config.sendgrid_api_key.is_empty() {
            return Err(EmailError::NotConfigured);
        }

        let body = sendgrid_payload(&self.config, &message);

        let response = self
            .client
            .post(SENDGRID_ENDPOINT)
            .bearer_auth(&self.config.sendgrid_api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmailError::SendFailed(format!("SendGrid request failed: {}", e)))?;

        if response.status().is_success() {
            info!(
                to = %message.to,
                subject = %message.subject,
                "Email sent via SendGrid"
            );
            Ok(())
        } else {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            error!(
                status = %status,
                error = %error_body,
                "SendGrid API error"
            );
            Err(EmailError::ProviderError(format!(
                "SendGrid returned {}: {}",
                status, error_body
            )))
        }
    }
}

fn smtp_transport(config: &EmailConfig) -> Result<AsyncSmtpTransport<Tokio1Executor>, EmailError> {
    let builder = if config.smtp_starttls {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host).map_err(|e| {
            EmailError::ProviderError(format!("SMTP relay {}: {}", config.smtp_host, e))
        })?
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(config.smtp_host.as_str())
    };

    let builder = builder.port(config.smtp_port);
    let builder = if config.smtp_username.is_empty() {
        builder
    } else {
        builder.credentials(Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.clone(),
        ))
    };

    Ok(builder.build())
}

/// Builds the MIME message: plain text alone, or text plus an HTML alternative.
fn smtp_message(config: &EmailConfig, message: &EmailMessage) -> Result<Message, EmailError> {
    let from = Mailbox::new(
        Some(config.sender_name.clone()),
        config
            .sender_email
            .parse()
            .map_err(|e| EmailError::ProviderError(format!("Invalid sender address: {}", e)))?,
    );
    let to = Mailbox::new(
        message.to_name.clone(),
        message
            .to
            .parse()
            .map_err(|e| EmailError::ProviderError(format!("Invalid recipient address: {}", e)))?,
    );

    let builder = Message::builder()
        .from(from)
        .to(to)
        .subject(message.subject.clone());

    let built = match &message.body_html {
        Some(html) => builder.multipart(MultiPart::alternative_plain_html(
            message.body_text.clone(),
            html.clone(),
        )),
        None => builder.singlepart(SinglePart::plain(message.body_text.clone())),
    };

    built.map_err(|e| EmailError::ProviderError(format!("Failed to build email: {}", e)))
}

fn sendgrid_payload(config: &EmailConfig, message: &EmailMessage) -> serde_json::Value {
    let mut recipient = serde_json::json!({ "email": message.to });
    if let Some(name) = &message.to_name {
        recipient["name"] = serde_json::json!(name);
    }

    let mut content = vec![serde_json::json!({
        "type": "text/plain",
        "value": message.body_text
    })];
    if let Some(html) = &message.body_html {
        content.push(serde_json::json!({
            "type": "text/html",
            "value": html
        }));
    }

    serde_json::json!({
        "personalizations": [{ "to": [recipient] }],
        "from": {
            "email": config.sender_email,
            "name": config.sender_name
        },
        "subject": message.subject,
        "content": content
    })
}

/// `July 1, 2025 at 2:00 PM`
fn long_date(date: DateTime<Utc>) -> String {
    date.format("%B %-d, %Y at %-I:%M %p").to_string()
}

/// `2025.07.01. 14:00`
fn short_date(date: DateTime<Utc>) -> String {
    date.format("%Y.%m.%d. %H:%M").to_string()
}

/// Structure shared by both registration emails.
struct EmailContent {
    heading: String,
    intro: Vec<String>,
    sections: Vec<(&'static str, Vec<(&'static str, String)>)>,
    outro: Option<String>,
    button: (&'static str, String),
}

impl EmailContent {
    fn render_text(&self, app_name: &str) -> String {
        let mut out = format!("{}\n\n", self.heading);
        for line in &self.intro {
            out.push_str(line);
            out.push_str("\n\n");
        }
        for (title, rows) in &self.sections {
            out.push_str(title);
            out.push('\n');
            for (label, value) in rows {
                out.push_str(&format!("- {}: {}\n", label, value));
            }
            out.push('\n');
        }
        if let Some(outro) = &self.outro {
            out.push_str(outro);
            out.push_str("\n\n");
        }
        let (label, url) = &self.button;
        out.push_str(&format!("{}: {}\n\nThanks,\n{}", label, url, app_name));
        out
    }

    fn render_html(&self, app_name: &str) -> String {
        let mut body = String::new();
        for line in &self.intro {
            body.push_str(&format!("<p>{}</p>\n", escape_html(line)));
        }
        for (title, rows) in &self.sections {
            body.push_str(&format!("<h2 style=\"font-size: 18px;\">{}</h2>\n<ul>\n", title));
            for (label, value) in rows {
                body.push_str(&format!(
                    "<li><strong>{}:</strong> {}</li>\n",
                    label,
                    escape_html(value)
                ));
            }
            body.push_str("</ul>\n");
        }
        if let Some(outro) = &self.outro {
            body.push_str(&format!("<p>{}</p>\n", escape_html(outro)));
        }
        let (label, url) = &self.button;

        format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{heading}</title>
</head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Helvetica, Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
    <div style="background: #2d3748; padding: 30px; border-radius: 10px 10px 0 0;">
        <h1 style="color: white; margin: 0; font-size: 24px;">{heading}</h1>
    </div>
    <div style="background: #f9f9f9; padding: 30px; border-radius: 0 0 10px 10px;">
{body}        <div style="text-align: center; margin: 30px 0;">
            <a href="{url}" style="background: #2d3748; color: white; padding: 14px 28px; text-decoration: none; border-radius: 6px; font-weight: bold; display: inline-block;">{label}</a>
        </div>
        <p>Thanks,<br>{app_name}</p>
    </div>
</body>
</html>"#,
            heading = escape_html(&self.heading),
            body = body,
            url = escape_html(url),
            label = label,
            app_name = escape_html(app_name),
        )
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use domain::models::{Event, User};
    use uuid::Uuid;

    fn test_config() -> EmailConfig {
        EmailConfig {
            enabled: true,
            provider: EmailProvider::Console,
            smtp_host: String::new(),
            smtp_port: 587,
            smtp_username: String::new(),
            smtp_password: String::new(),
            smtp_starttls: true,
            sendgrid_api_key: String::new(),
            sender_email: "test@example.com".to_string(),
            sender_name: "Test".to_string(),
            base_url: "https://events.example.com/".to_string(),
            app_name: "Evently".to_string(),
            template_style: TemplateStyle::Html,
        }
    }

    fn notice(limit: i32, attendee_count: i64, image: Option<&str>) -> RegistrationNotice {
        let owner_id = Uuid::new_v4();
        let created = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        RegistrationNotice {
            event: Event {
                id: Uuid::new_v4(),
                owner_id,
                name: "Summer Music Festival".to_string(),
                description: "Three days of <live> music".to_string(),
                date: Utc.with_ymd_and_hms(2025, 7, 1, 14, 0, 0).unwrap(),
                image: image.map(str::to_string),
                limit,
                deleted_at: None,
                created_at: created,
                updated_at: created,
            },
            attendee: User {
                id: Uuid::new_v4(),
                name: "Ada Lovelace".to_string(),
                email: "ada@example.com".to_string(),
            },
            owner: Some(User {
                id: owner_id,
                name: "Grace Hopper".to_string(),
                email: "grace@example.com".to_string(),
            }),
            registered_at: Utc.with_ymd_and_hms(2025, 6, 15, 9, 5, 0).unwrap(),
            attendee_count,
        }
    }

    #[test]
    fn test_email_service_enabled_flag() {
        assert!(EmailService::new(test_config()).is_enabled());

        let mut config = test_config();
        config.enabled = false;
        assert!(!EmailService::new(config).is_enabled());
    }

    #[test]
    fn test_date_formats() {
        let date = Utc.with_ymd_and_hms(2025, 7, 1, 14, 0, 0).unwrap();
        assert_eq!(long_date(date), "July 1, 2025 at 2:00 PM");
        assert_eq!(short_date(date), "2025.07.01. 14:00");
    }

    #[test]
    fn test_confirmation_with_capacity() {
        let service = EmailService::new(test_config());
        let message = service.registration_confirmation(&notice(50, 12, None));

        assert_eq!(message.to, "ada@example.com");
        assert_eq!(message.subject, "Registration Confirmation: Summer Music Festival");
        assert!(message.body_text.contains("Hello Ada Lovelace,"));
        assert!(message
            .body_text
            .contains("- Event Date: July 1, 2025 at 2:00 PM"));
        assert!(message
            .body_text
            .contains("- Registered At: June 15, 2025 at 9:05 AM"));
        assert!(message.body_text.contains("- Event Capacity: 50 attendees"));
        assert!(message.body_text.contains("- Current Attendees: 12"));
        assert!(message.body_text.contains("- Spots Remaining: 38"));
        assert!(!message.body_text.contains("Event Image"));
        assert!(message
            .body_text
            .contains("View All Events: https://events.example.com/events"));
        assert!(message.body_text.ends_with("Thanks,\nEvently"));
    }

    #[test]
    fn test_confirmation_unlimited_event_omits_capacity() {
        let service = EmailService::new(test_config());
        let message = service.registration_confirmation(&notice(0, 120, Some("events/fest.png")));

        assert!(!message.body_text.contains("Event Capacity"));
        assert!(!message.body_text.contains("Spots Remaining"));
        assert!(message.body_text.contains("- Event Image: View the event at"));
    }

    #[test]
    fn test_owner_alert() {
        let service = EmailService::new(test_config());
        let message = service.owner_alert(&notice(10, 10, None)).unwrap();

        assert_eq!(message.to, "grace@example.com");
        assert_eq!(message.subject, "New Registration for: Summer Music Festival");
        assert!(message
            .body_text
            .contains("Ada Lovelace has registered for your event Summer Music Festival."));
        assert!(message.body_text.contains("- Email: ada@example.com"));
        assert!(message.body_text.contains("- Event Date: 2025.07.01. 14:00"));
        assert!(message.body_text.contains("- Total Attendees: 10"));
        assert!(message.body_text.contains("- Event Limit: 10"));
        assert!(message.body_text.contains("- Spots Remaining: 0"));
        assert!(message.body_text.contains("View events:"));
    }

    #[test]
    fn test_owner_alert_unlimited_reports_total_only() {
        let service = EmailService::new(test_config());
        let message = service.owner_alert(&notice(0, 3, None)).unwrap();

        assert!(message.body_text.contains("- Total Attendees: 3"));
        assert!(!message.body_text.contains("Event Limit"));
    }

    #[test]
    fn test_owner_alert_without_owner() {
        let service = EmailService::new(test_config());
        let mut n = notice(10, 1, None);
        n.owner = None;
        assert!(service.owner_alert(&n).is_none());
    }

    #[test]
    fn test_html_body_follows_template_style() {
        let service = EmailService::new(test_config());
        let html = service
            .registration_confirmation(&notice(10, 1, None))
            .body_html
            .unwrap();
        assert!(html.contains("Three days of &lt;live&gt; music"));
        assert!(!html.contains("<live>"));

        let mut config = test_config();
        config.template_style = TemplateStyle::Plain;
        let service = EmailService::new(config);
        assert!(service
            .registration_confirmation(&notice(10, 1, None))
            .body_html
            .is_none());
    }

    #[test]
    fn test_sendgrid_payload() {
        let message = EmailMessage {
            to: "user@example.com".to_string(),
            to_name: Some("User".to_string()),
            subject: "Subject".to_string(),
            body_text: "Text".to_string(),
            body_html: Some("<p>Html</p>".to_string()),
        };
        let payload = sendgrid_payload(&test_config(), &message);

        assert_eq!(payload["personalizations"][0]["to"][0]["email"], "user@example.com");
        assert_eq!(payload["personalizations"][0]["to"][0]["name"], "User");
        assert_eq!(payload["from"]["email"], "test@example.com");
        assert_eq!(payload["content"][0]["type"], "text/plain");
        assert_eq!(payload["content"][1]["type"], "text/html");
    }

    fn plain_message(to: &str) -> EmailMessage {
        EmailMessage {
            to: to.to_string(),
            to_name: Some("Grace".to_string()),
            subject: "Registration Confirmation: Jazz Night".to_string(),
            body_text: "See you there".to_string(),
            body_html: None,
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>Food & "Wine"</b> isn't"#),
            "&lt;b&gt;Food &amp; &quot;Wine&quot;&lt;/b&gt; isn&#39;t"
        );
        assert_eq!(escape_html("Jazz Concert"), "Jazz Concert");
    }

    #[test]
    fn test_smtp_message_with_html_is_multipart() {
        let mut message = plain_message("grace@example.com");
        message.body_html = Some("<p>See you there</p>".to_string());

        let email = smtp_message(&test_config(), &message).unwrap();
        let raw = String::from_utf8(email.formatted()).unwrap();

        assert!(raw.contains("Subject: Registration Confirmation: Jazz Night"));
        assert!(raw.contains("grace@example.com"));
        assert!(raw.contains("test@example.com"));
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("text/html"));
    }

    #[test]
    fn test_smtp_message_plain_only() {
        let email = smtp_message(&test_config(), &plain_message("grace@example.com")).unwrap();
        let raw = String::from_utf8(email.formatted()).unwrap();

        assert!(raw.contains("text/plain"));
        assert!(!raw.contains("multipart/alternative"));
    }

    #[test]
    fn test_smtp_message_rejects_bad_recipient() {
        let result = smtp_message(&test_config(), &plain_message("not-an-address"));
        assert!(matches!(result, Err(EmailError::ProviderError(_))));
    }

    #[test]
    fn test_smtp_transport_builds_for_local_relay() {
        let mut config = test_config();
        config.smtp_host = "localhost".to_string();
        config.smtp_port = 1025;
        config.smtp_starttls = false;
        assert!(smtp_transport(&config).is_ok());

        config.smtp_starttls = true;
        config.smtp_username = "mailer".to_string();
        config.smtp_password = "secret".to_string();
        assert!(smtp_transport(&config).is_ok());
    }

    #[tokio::test]
    async fn test_smtp_delivery_failure_is_an_error() {
        let mut config = test_config();
        config.provider = EmailProvider::Smtp;
        config.smtp_host = "127.0.0.1".to_string();
        config.smtp_port = 9;
        config.smtp_starttls = false;
        let service = EmailService::new(config);

        let result = service.send(plain_message("grace@example.com")).await;
        assert!(matches!(result, Err(EmailError::SendFailed(_))));
    }

    #[tokio::test]
    async fn test_send_console_email() {
        let service = EmailService::new(test_config());
        let message = service.registration_confirmation(&notice(10, 1, None));
        assert!(service.send(message).await.is_ok());
    }

    #[tokio::test]
    async fn test_send_disabled_silently_succeeds() {
        let mut config = test_config();
        config.enabled = false;
        let service = EmailService::new(config);
        let message = service.registration_confirmation(&notice(10, 1, None));
        assert!(service.send(message).await.is_ok());
    }

    #[tokio::test]
    async fn test_unconfigured_providers_fail() {
        let mut config = test_config();
        config.provider = EmailProvider::Sendgrid;
        let service = EmailService::new(config);
        let message = service.registration_confirmation(&notice(10, 1, None));
        assert!(matches!(
            service.send(message.clone()).await,
            Err(EmailError::NotConfigured)
        ));

        let mut config = test_config();
        config.provider = EmailProvider::Smtp;
        let service = EmailService::new(config);
        assert!(matches!(
            service.send(message).await,
            Err(EmailError::NotConfigured)
        ));
    }
}
