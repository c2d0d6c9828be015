//! Agent configuration, built from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default keyword list used when `JOB_INVITE_KEYWORDS` is unset.
pub const DEFAULT_KEYWORDS: [&str; 11] = [
    "job invite",
    "job opportunity",
    "career opportunity",
    "interview",
    "hiring",
    "recruiter",
    "application update",
    "screening call",
    "role match",
    "position open",
    "talent acquisition",
];

const DEFAULT_STATE_FILE: &str = ".job_invite_agent_state.json";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Immutable process-lifetime configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub imap_host: String,
    pub imap_port: u16,
    pub mailbox_address: String,
    pub mailbox_password: SecretString,
    pub twilio_account_sid: String,
    pub twilio_auth_token: SecretString,
    pub twilio_from_whatsapp: String,
    pub twilio_to_whatsapp: String,
    /// Lowercased, trimmed, non-empty keyword list.
    pub keywords: Vec<String>,
    pub poll_interval: Duration,
    pub state_file: PathBuf,
    pub bootstrap_skip_existing: bool,
    pub dry_run: bool,
    pub openai_api_key: Option<SecretString>,
    pub openai_model: String,
}

impl AgentConfig {
    /// Build config from environment variables.
    ///
    /// Missing required variables and unparseable numeric values are fatal;
    /// the caller exits before any cycle runs.
    pub fn from_env() -> Result<Self, ConfigError> {
        let imap_host =
            std::env::var("IMAP_HOST").unwrap_or_else(|_| "imap.gmail.com".to_string());
        let imap_port = env_parse("IMAP_PORT", 993)?;

        let keywords = parse_keywords(
            &std::env::var("JOB_INVITE_KEYWORDS")
                .unwrap_or_else(|_| DEFAULT_KEYWORDS.join(",")),
        );

        let poll_interval_secs: u64 =
            env_parse("POLL_INTERVAL_SECONDS", DEFAULT_POLL_INTERVAL_SECS)?;

        Ok(Self {
            imap_host,
            imap_port,
            mailbox_address: require_env("GMAIL_ADDRESS")?,
            mailbox_password: SecretString::from(require_env("GMAIL_APP_PASSWORD")?),
            twilio_account_sid: require_env("TWILIO_ACCOUNT_SID")?,
            twilio_auth_token: SecretString::from(require_env("TWILIO_AUTH_TOKEN")?),
            twilio_from_whatsapp: require_env("TWILIO_FROM_WHATSAPP")?,
            twilio_to_whatsapp: require_env("TWILIO_TO_WHATSAPP")?,
            keywords,
            poll_interval: Duration::from_secs(poll_interval_secs),
            state_file: std::env::var("STATE_FILE")
                .unwrap_or_else(|_| DEFAULT_STATE_FILE.to_string())
                .into(),
            bootstrap_skip_existing: env_bool("BOOTSTRAP_SKIP_EXISTING", true),
            dry_run: env_bool("DRY_RUN", false),
            openai_api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(SecretString::from),
            openai_model: std::env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| DEFAULT_OPENAI_MODEL.to_string()),
        })
    }

    /// Whether the AI classification tier is enabled.
    pub fn ai_enabled(&self) -> bool {
        self.openai_api_key.is_some()
    }
}

fn require_env(name: &str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(ConfigError::MissingEnvVar(name.to_string())),
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    std::env::var(name).map_or(default, |v| truthy(&v))
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: name.to_string(),
            message: format!("{raw:?} is not a valid number"),
        }),
    }
}

/// "1", "true", "yes" and "on" (any case) count as true.
fn truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Split a comma-separated keyword list, lowercasing and dropping blanks.
fn parse_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|token| token.trim().to_lowercase())
        .filter(|token| !token.is_empty())
        .collect()
}
