//! Configuration types, read from the environment.

use std::path::PathBuf;

use crate::channels::TelegramConfig;
use crate::error::ConfigError;
use crate::llm::LlmConfig;

/// Default libSQL database file.
pub const DEFAULT_DB_PATH: &str = "./data/numerologist.db";

/// Quota given to new profiles.
pub const DEFAULT_STARTING_QUOTA: u32 = 3;

/// Default `/feedback` contact.
pub const DEFAULT_FEEDBACK_CONTACT: &str = "@numerologist_support";

/// Whether completion requests consume quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaPolicy {
    pub enforced: bool,
    /// Quota assigned to a profile on first contact.
    pub starting_quota: u32,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            enforced: false,
            starting_quota: DEFAULT_STARTING_QUOTA,
        }
    }
}

/// Bot behaviour settings.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub quota: QuotaPolicy,
    /// System message placed before the profile prompt.
    pub system_prompt: String,
    pub feedback_contact: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            quota: QuotaPolicy::default(),
            system_prompt: crate::bot::messages::DEFAULT_SYSTEM_PROMPT.to_string(),
            feedback_contact: DEFAULT_FEEDBACK_CONTACT.to_string(),
        }
    }
}

/// Everything the binary needs to start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub telegram: TelegramConfig,
    pub llm: LlmConfig,
    pub bot: BotConfig,
    pub db_path: PathBuf,
    pub log_file: Option<PathBuf>,
}

impl AppConfig {
    /// Read the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through an arbitrary variable lookup.
    ///
    /// Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &str| var(key).ok_or_else(|| ConfigError::MissingEnvVar(key.into()));

        let bot_token = required("TELEGRAM_BOT_TOKEN")?;
        let api_key = match var("OPENAI_API_KEY").or_else(|| var("CHATGPT_KEY")) {
            Some(key) => key,
            None => return Err(ConfigError::MissingEnvVar("OPENAI_API_KEY".into())),
        };

        let mut telegram = TelegramConfig::new(bot_token);
        if let Some(users) = var("TELEGRAM_ALLOWED_USERS") {
            telegram.allowed_users = users
                .split(',')
                .map(|s| s.trim().trim_start_matches('@').to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        let mut llm = LlmConfig::new(api_key);
        if let Some(url) = var("OPENAI_API_URL") {
            llm.api_url = url;
        }
        if let Some(model) = var("OPENAI_MODEL") {
            llm.model = model;
        }
        llm.proxy_url = var("PROXY_URL");

        let mut bot = BotConfig::default();
        if let Some(enabled) = var("NUMEROLOGIST_QUOTA_ENABLED") {
            bot.quota.enforced = parse_bool("NUMEROLOGIST_QUOTA_ENABLED", &enabled)?;
        }
        if let Some(quota) = var("NUMEROLOGIST_STARTING_QUOTA") {
            bot.quota.starting_quota =
                quota.parse::<u32>().map_err(|e| ConfigError::InvalidValue {
                    key: "NUMEROLOGIST_STARTING_QUOTA".into(),
                    message: e.to_string(),
                })?;
        }
        if let Some(prompt) = var("NUMEROLOGIST_SYSTEM_PROMPT") {
            bot.system_prompt = prompt;
        }
        if let Some(contact) = var("NUMEROLOGIST_FEEDBACK_CONTACT") {
            bot.feedback_contact = contact;
        }

        Ok(Self {
            telegram,
            llm,
            bot,
            db_path: var("NUMEROLOGIST_DB_PATH")
                .unwrap_or_else(|| DEFAULT_DB_PATH.to_string())
                .into(),
            log_file: var("NUMEROLOGIST_LOG_FILE").map(PathBuf::from),
        })
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a boolean, got '{value}'"),
        }),
    }
}
