//! Two-tier job-invite classification.
//!
//! Tier 1 is an optional remote AI classifier behind the [`RemoteClassifier`]
//! trait; tier 2 is the rule-based keyword matcher. The AI tier is never a
//! hard dependency: any typed failure from it is logged and the rule tier
//! decides instead, so [`Classifier::classify`] itself cannot fail.

pub mod openai;
pub mod rules;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::config::AgentConfig;
use crate::error::ClassifierError;
use crate::mailbox::MailMessage;

pub use openai::OpenAiClassifier;

/// Per-message classification result. Derived, never persisted or reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub is_match: bool,
    pub reason: String,
}

/// A remote classifier that may be unavailable. Failure is a value the
/// fallback branch consumes, not an exception path.
#[async_trait]
pub trait RemoteClassifier: Send + Sync {
    async fn classify(&self, message: &MailMessage) -> Result<Verdict, ClassifierError>;
}

/// Two-tier classifier: remote AI first when configured, rules otherwise.
pub struct Classifier {
    remote: Option<Arc<dyn RemoteClassifier>>,
    keywords: Vec<String>,
}

impl Classifier {
    /// Build from config, wiring the OpenAI tier when a key is present.
    pub fn from_config(config: &AgentConfig) -> Self {
        let remote: Option<Arc<dyn RemoteClassifier>> =
            config.openai_api_key.as_ref().map(|key| {
                Arc::new(OpenAiClassifier::new(key.clone(), config.openai_model.clone()))
                    as Arc<dyn RemoteClassifier>
            });
        Self::new(remote, config.keywords.clone())
    }

    pub fn new(remote: Option<Arc<dyn RemoteClassifier>>, keywords: Vec<String>) -> Self {
        Self { remote, keywords }
    }

    /// Classify a message. Infallible: a failing remote tier degrades to
    /// the rule-based verdict.
    pub async fn classify(&self, message: &MailMessage) -> Verdict {
        if let Some(remote) = &self.remote {
            match remote.classify(message).await {
                Ok(verdict) => return verdict,
                Err(e) => {
                    warn!(uid = message.uid, error = %e, "AI classifier failed, using keyword fallback");
                }
            }
        }

        rules::keyword_verdict(&self.keywords, message)
    }
}
