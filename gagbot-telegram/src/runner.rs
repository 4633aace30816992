//! Startup wiring and the teloxide REPL loop.
//!
//! `run_bot` loads the persisted snapshots, builds the registries, rebuilds
//! pending expiry timers, and then hands every incoming message to the
//! dispatcher on its own task so a slow assistant call never stalls polling.

use anyhow::Result;
use gagbot_core::{init_tracing, AdminGate, AssistantGateway, ChatGateway};
use gagbot_scheduler::ExpiryScheduler;
use gagbot_state::{
    ConversationContext, GroupRoster, ModerationRegistry, ReputationLedger, SnapshotStore,
    StateHandle,
};
use std::path::Path;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{info, instrument};

use crate::adapters::TelegramMessageWrapper;
use crate::assistant::GeminiAssistant;
use crate::config::BotConfig;
use crate::dispatch::CommandDispatch;
use crate::gateway::TelegramGateway;

/// Main entry: init logging, build the state and dispatch, reconcile pending
/// expiries against the clock, then run the REPL.
#[instrument(skip(config))]
pub async fn run_bot(config: BotConfig) -> Result<()> {
    if let Some(parent) = Path::new(&config.log_file).parent() {
        std::fs::create_dir_all(parent)?;
    }
    init_tracing(&config.log_file)?;

    let store = SnapshotStore::new(&config.data_file, &config.conversations_file);
    let state = StateHandle::load(store);

    let bot = Bot::new(config.bot_token.clone());
    let gateway: Arc<dyn ChatGateway> = Arc::new(TelegramGateway::new(bot.clone()));
    let assistant: Option<Arc<dyn AssistantGateway>> = config
        .gemini_api_key
        .clone()
        .map(|key| Arc::new(GeminiAssistant::new(key)) as Arc<dyn AssistantGateway>);
    if assistant.is_none() {
        info!("No assistant API key configured; assistant features disabled");
    }

    let moderation = ModerationRegistry::new(state.clone());
    let reputation = ReputationLedger::new(state.clone());
    let conversation = ConversationContext::new(state.clone());
    let roster = GroupRoster::new(state.clone());
    let admin_gate = AdminGate::new(gateway.clone());
    let scheduler = ExpiryScheduler::new(moderation.clone(), gateway.clone());

    scheduler.reconcile().await;

    let bot_username = Arc::new(tokio::sync::RwLock::new(None));
    let dispatch = Arc::new(CommandDispatch::new(
        gateway,
        assistant,
        admin_gate,
        moderation,
        scheduler,
        reputation,
        conversation,
        roster,
        bot_username.clone(),
    ));

    info!("Bot started successfully");
    run_repl(bot, dispatch, bot_username).await
}

/// Starts the REPL with the given teloxide Bot and dispatcher. Fetches the
/// bot's own username first so mention detection works from the first
/// message; each update is handled on a spawned task.
#[instrument(skip(bot, dispatch, bot_username))]
pub async fn run_repl(
    bot: teloxide::Bot,
    dispatch: Arc<CommandDispatch>,
    bot_username: Arc<tokio::sync::RwLock<Option<String>>>,
) -> Result<()> {
    if let Ok(me) = bot.get_me().await {
        if let Some(username) = &me.user.username {
            *bot_username.write().await = Some(username.clone());
            info!(username = %username, "Bot username set before repl");
        }
    }

    teloxide::repl(bot, move |_bot: Bot, msg: teloxide::types::Message| {
        let dispatch = dispatch.clone();
        let bot_username = bot_username.clone();

        async move {
            let username = bot_username.read().await.clone();
            if let Some(inbound) = TelegramMessageWrapper(&msg).to_inbound(username.as_deref()) {
                info!(
                    user_id = inbound.sender.id,
                    chat_id = inbound.chat_id,
                    message_content = %inbound.text,
                    "Received message"
                );
                tokio::spawn(async move {
                    dispatch.handle(inbound).await;
                });
            }

            Ok(())
        }
    })
    .await;

    Ok(())
}
