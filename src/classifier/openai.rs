//! Remote AI tier — OpenAI-compatible chat-completions classifier.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::classifier::{RemoteClassifier, Verdict};
use crate::error::ClassifierError;
use crate::mailbox::MailMessage;

const ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(25);

/// Only this much of the body is submitted; enough signal, bounded cost.
const BODY_PREVIEW_CHARS: usize = 2500;

const SYSTEM_PROMPT: &str = "You classify if an email is a real job invite. \
     Return strict JSON with keys: is_job_invite (boolean), \
     confidence (number between 0 and 1), reason (string).";

/// Chat-completions classifier with strict-JSON verdicts.
pub struct OpenAiClassifier {
    http: reqwest::Client,
    api_key: SecretString,
    model: String,
}

impl OpenAiClassifier {
    pub fn new(api_key: SecretString, model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model,
        }
    }
}

#[async_trait]
impl RemoteClassifier for OpenAiClassifier {
    async fn classify(&self, message: &MailMessage) -> Result<Verdict, ClassifierError> {
        let preview: String = message.body.chars().take(BODY_PREVIEW_CHARS).collect();
        let user_prompt = format!(
            "From: {}\nSubject: {}\nDate: {}\nBody preview: {}",
            message.sender, message.subject, message.date, preview
        );

        let payload = serde_json::json!({
            "model": self.model,
            "temperature": 0,
            "response_format": {"type": "json_object"},
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": user_prompt},
            ],
        });

        let response = self
            .http
            .post(ENDPOINT)
            .bearer_auth(self.api_key.expose_secret())
            .json(&payload)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletion = response.json().await?;
        let content = completion
            .choices
            .first()
            .map(|c| c.message.content.trim())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                ClassifierError::MalformedResponse("no completion content".to_string())
            })?;

        parse_verdict(content)
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct AiVerdict {
    is_job_invite: bool,
    confidence: Option<f64>,
    reason: Option<String>,
}

/// Parse the model's JSON verdict. A missing match flag or non-JSON content
/// is an error; the caller falls back to the rule tier.
fn parse_verdict(content: &str) -> Result<Verdict, ClassifierError> {
    let verdict: AiVerdict = serde_json::from_str(content)
        .map_err(|e| ClassifierError::MalformedResponse(e.to_string()))?;

    let mut reason = verdict
        .reason
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| "AI classification".to_string());
    if let Some(confidence) = verdict.confidence {
        reason = format!("{reason} (confidence={confidence})");
    }

    Ok(Verdict {
        is_match: verdict.is_job_invite,
        reason,
    })
}
