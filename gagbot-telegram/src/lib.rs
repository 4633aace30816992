//! # Telegram moderation bot
//!
//! Wires the moderation core (gagbot-core, gagbot-state, gagbot-scheduler)
//! to Telegram via teloxide and to Gemini via reqwest. Loads config from env
//! and runs the REPL.

pub mod adapters;
pub mod assistant;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod gateway;
pub mod runner;

pub use adapters::{TelegramMessageWrapper, TelegramUserWrapper};
pub use assistant::GeminiAssistant;
pub use cli::{load_config, Cli, Commands};
pub use config::BotConfig;
pub use dispatch::{CommandDispatch, ASSISTANT_GREETING, DENIAL_MESSAGE};
pub use gateway::TelegramGateway;
pub use runner::{run_bot, run_repl};
