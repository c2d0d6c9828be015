//! Alert formatting and WhatsApp delivery via Twilio.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::config::AgentConfig;
use crate::error::NotifyError;
use crate::mailbox::MailMessage;

/// How much of the body goes into the alert.
const PREVIEW_CHARS: usize = 280;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Render the human-readable alert for a positive match. Deterministic.
pub fn format_alert(message: &MailMessage, reason: &str) -> String {
    let preview: String = message.body.chars().take(PREVIEW_CHARS).collect();
    format!(
        "New job invite detected!\nFrom: {}\nSubject: {}\nDate: {}\nWhy: {}\nPreview: {}",
        or_placeholder(&message.sender, "(unknown)"),
        or_placeholder(&message.subject, "(no subject)"),
        or_placeholder(&message.date, "(unknown)"),
        reason,
        preview,
    )
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.is_empty() { placeholder } else { value }
}

/// Outbound notification channel. Delivery failures are reported to the
/// caller but never abort the poll cycle.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `text`, returning the provider-assigned message id.
    async fn deliver(&self, text: &str) -> Result<String, NotifyError>;
}

/// Twilio WhatsApp delivery.
pub struct TwilioWhatsApp {
    http: reqwest::Client,
    account_sid: String,
    auth_token: SecretString,
    from: String,
    to: String,
}

impl TwilioWhatsApp {
    pub fn new(config: &AgentConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            account_sid: config.twilio_account_sid.clone(),
            auth_token: config.twilio_auth_token.clone(),
            from: config.twilio_from_whatsapp.clone(),
            to: config.twilio_to_whatsapp.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TwilioResponse {
    sid: Option<String>,
}

#[async_trait]
impl Notifier for TwilioWhatsApp {
    async fn deliver(&self, text: &str) -> Result<String, NotifyError> {
        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.account_sid
        );

        let form = [("From", self.from.as_str()), ("To", self.to.as_str()), ("Body", text)];

        let response = self
            .http
            .post(url)
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
            .form(&form)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TwilioResponse = response.json().await?;
        parsed
            .sid
            .filter(|sid| !sid.is_empty())
            .ok_or_else(|| NotifyError::MalformedResponse("missing message sid".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(body: &str) -> MailMessage {
        MailMessage {
            uid: 3,
            subject: "Interview invitation".to_string(),
            sender: "Recruiter <r@corp.com>".to_string(),
            date: "2026-08-30T09:00:00Z".to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn alert_embeds_all_fields() {
        let alert = format_alert(&message("short body"), "matched keywords: interview");
        assert!(alert.starts_with("New job invite detected!"));
        assert!(alert.contains("From: Recruiter <r@corp.com>"));
        assert!(alert.contains("Subject: Interview invitation"));
        assert!(alert.contains("Date: 2026-08-30T09:00:00Z"));
        assert!(alert.contains("Why: matched keywords: interview"));
        assert!(alert.contains("Preview: short body"));
    }

    #[test]
    fn alert_preview_is_bounded() {
        let long_body = "x".repeat(1000);
        let alert = format_alert(&message(&long_body), "r");
        let preview = alert.rsplit("Preview: ").next().unwrap();
        assert_eq!(preview.chars().count(), PREVIEW_CHARS);
    }

    #[test]
    fn alert_preview_respects_char_boundaries() {
        // Multi-byte characters must not split the preview mid-codepoint.
        let body = "é".repeat(400);
        let alert = format_alert(&message(&body), "r");
        let preview = alert.rsplit("Preview: ").next().unwrap();
        assert_eq!(preview.chars().count(), PREVIEW_CHARS);
    }

    #[test]
    fn alert_uses_placeholders_for_empty_fields() {
        let msg = MailMessage {
            uid: 4,
            subject: String::new(),
            sender: String::new(),
            date: String::new(),
            body: String::new(),
        };
        let alert = format_alert(&msg, "r");
        assert!(alert.contains("From: (unknown)"));
        assert!(alert.contains("Subject: (no subject)"));
        assert!(alert.contains("Date: (unknown)"));
    }

    #[test]
    fn alert_is_deterministic() {
        let msg = message("stable");
        assert_eq!(format_alert(&msg, "r"), format_alert(&msg, "r"));
    }
}
