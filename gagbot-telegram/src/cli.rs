//! Command-line interface for the gagbot binary.

use crate::config::BotConfig;
use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "gagbot", about = "Group moderation bot with timed mutes")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot.
    Run {
        /// Bot token; overrides BOT_TOKEN from the environment.
        #[arg(long)]
        token: Option<String>,
    },
}

/// Loads config for the Run command.
pub fn load_config(token: Option<String>) -> Result<BotConfig> {
    BotConfig::from_env(token)
}
