//! Bot configuration, loaded from environment variables after `.env`.

use anyhow::Result;
use std::env;

/// Runtime configuration: Telegram token, optional assistant key, snapshot
/// paths, log file.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// BOT_TOKEN (mandatory).
    pub bot_token: String,
    /// GEMINI_API_KEY; the assistant feature is disabled when unset.
    pub gemini_api_key: Option<String>,
    /// DATA_FILE: main snapshot path.
    pub data_file: String,
    /// CONVERSATIONS_FILE: conversation snapshot path.
    pub conversations_file: String,
    /// LOG_FILE: tracing output path.
    pub log_file: String,
}

impl BotConfig {
    /// Loads from environment variables. `token` overrides BOT_TOKEN when
    /// provided (e.g. from the CLI). A missing token is the one startup
    /// condition that terminates the process before serving traffic.
    pub fn from_env(token: Option<String>) -> Result<Self> {
        let bot_token = match token {
            Some(token) => token,
            None => env::var("BOT_TOKEN").map_err(|_| anyhow::anyhow!("BOT_TOKEN not set"))?,
        };
        Ok(Self {
            bot_token,
            gemini_api_key: env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty()),
            data_file: env::var("DATA_FILE").unwrap_or_else(|_| "bot_data.json".to_string()),
            conversations_file: env::var("CONVERSATIONS_FILE")
                .unwrap_or_else(|_| "conversations.json".to_string()),
            log_file: env::var("LOG_FILE").unwrap_or_else(|_| "logs/gagbot.log".to_string()),
        })
    }

    /// Config with the given token and defaults for everything else.
    pub fn with_token(bot_token: String) -> Self {
        Self {
            bot_token,
            gemini_api_key: None,
            data_file: "bot_data.json".to_string(),
            conversations_file: "conversations.json".to_string(),
            log_file: "logs/gagbot.log".to_string(),
        }
    }
}
