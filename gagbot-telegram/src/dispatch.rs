//! Command dispatch: routes inbound messages to the moderation core, the
//! reputation ledger, the profile roster, and the assistant.
//!
//! Every privileged command goes through the [`AdminGate`] first and answers
//! with the fixed denial message when refused. Triggering command messages
//! are best-effort deleted after a short delay; replies from the bot stay.

use chrono::Utc;
use gagbot_core::{
    build_prompt, parse_duration, AdminGate, AssistantGateway, ChatGateway, ChatKind, GagbotError,
    Inbound, ResolvedUser,
};
use gagbot_scheduler::ExpiryScheduler;
use gagbot_state::{ConversationContext, GroupRoster, ModerationRegistry, ReputationLedger};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

/// Fixed denial for non-admins attempting a privileged action.
pub const DENIAL_MESSAGE: &str = "Keep poking and the gag goes on you.";
/// Greeting for /sky with no text.
pub const ASSISTANT_GREETING: &str =
    "Hi! I keep an eye on this chat. Ask me anything. What shall we talk about?";
const ASSISTANT_UNCONFIGURED: &str = "The assistant is not configured.";
const ASSISTANT_UNAVAILABLE: &str = "The assistant is unavailable right now.";
const GROUPS_ONLY: &str = "This command only works in group chats.";

/// How long a triggering command message survives before auto-deletion.
const COMMAND_DELETE_DELAY: StdDuration = StdDuration::from_secs(10);

pub struct CommandDispatch {
    gateway: Arc<dyn ChatGateway>,
    assistant: Option<Arc<dyn AssistantGateway>>,
    admin_gate: AdminGate,
    moderation: ModerationRegistry,
    scheduler: Arc<ExpiryScheduler>,
    reputation: ReputationLedger,
    conversation: ConversationContext,
    roster: GroupRoster,
    bot_username: Arc<RwLock<Option<String>>>,
}

impl CommandDispatch {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        gateway: Arc<dyn ChatGateway>,
        assistant: Option<Arc<dyn AssistantGateway>>,
        admin_gate: AdminGate,
        moderation: ModerationRegistry,
        scheduler: Arc<ExpiryScheduler>,
        reputation: ReputationLedger,
        conversation: ConversationContext,
        roster: GroupRoster,
        bot_username: Arc<RwLock<Option<String>>>,
    ) -> Self {
        Self {
            gateway,
            assistant,
            admin_gate,
            moderation,
            scheduler,
            reputation,
            conversation,
            roster,
            bot_username,
        }
    }

    /// Routes one inbound message. Never errors: every failure path ends in a
    /// user-visible message or a log line.
    #[instrument(skip(self, inbound), fields(chat_id = inbound.chat_id, user_id = inbound.sender.id))]
    pub async fn handle(&self, inbound: Inbound) {
        if inbound.chat_kind == ChatKind::Group {
            let title = inbound
                .chat_title
                .clone()
                .unwrap_or_else(|| format!("Group {}", inbound.chat_id));
            self.roster.remember_group(inbound.chat_id, &title).await;
        }

        let text = inbound.text.trim();
        if text.starts_with('/') {
            let mut parts = text.split_whitespace();
            let command = parts.next().unwrap_or("").split('@').next().unwrap_or("");
            let args: Vec<&str> = parts.collect();
            match command {
                "/mute" => self.cmd_mute(&inbound, &args).await,
                "/unmute" => self.cmd_unmute(&inbound, &args).await,
                "/muty" => self.cmd_list_mutes(&inbound).await,
                "/sky" => self.cmd_assistant_chat(&inbound, &args).await,
                "/my_pepper" => self.cmd_own_score(&inbound).await,
                "/pepper" => self.cmd_leaderboard(&inbound).await,
                "/date" => self.cmd_save_profile(&inbound, &args).await,
                "/who" => self.cmd_show_profile(&inbound, &args).await,
                "/persona" => self.cmd_set_persona(&inbound, &args).await,
                _ => debug!(command, "Unknown command ignored"),
            }
            return;
        }

        if (text == "+" || text == "-")
            && inbound.chat_kind == ChatKind::Group
            && inbound.reply_to.is_some()
        {
            self.handle_vote(&inbound, if text == "+" { 1 } else { -1 })
                .await;
            return;
        }

        self.maybe_assistant_reply(&inbound).await;
    }

    /// `/mute` — restrict the target for a parsed duration. The platform
    /// restrict call defines success: nothing is committed when it fails.
    async fn cmd_mute(&self, inbound: &Inbound, args: &[&str]) {
        if !self
            .admin_gate
            .is_admin(inbound.chat_id, inbound.sender.id)
            .await
        {
            self.deny(inbound).await;
            return;
        }

        let (target, duration_str, reason) = match &inbound.reply_to {
            Some(reply) => match args.split_first() {
                Some((duration_str, rest)) => (
                    ResolvedUser::from_member(&reply.sender),
                    *duration_str,
                    rest.join(" "),
                ),
                None => {
                    self.send(inbound.chat_id, "Specify a mute duration (e.g. 5h).")
                        .await;
                    self.schedule_deletion(inbound.chat_id, inbound.message_id);
                    return;
                }
            },
            None => {
                if args.len() < 2 {
                    self.send(
                        inbound.chat_id,
                        "Specify a user (@username or id) and a duration, or reply to their message.",
                    )
                    .await;
                    self.schedule_deletion(inbound.chat_id, inbound.message_id);
                    return;
                }
                match self.resolve_target(inbound.chat_id, args[0]).await {
                    Some(target) => (target, args[1], args[2..].join(" ")),
                    None => {
                        self.send(inbound.chat_id, "User not found.").await;
                        self.schedule_deletion(inbound.chat_id, inbound.message_id);
                        return;
                    }
                }
            }
        };

        let duration = match parse_duration(duration_str) {
            Ok(duration) => duration,
            Err(e) => {
                self.send(inbound.chat_id, &e.to_string()).await;
                self.schedule_deletion(inbound.chat_id, inbound.message_id);
                return;
            }
        };

        let until = Utc::now() + duration;
        if let Err(e) = self
            .gateway
            .restrict_member(inbound.chat_id, target.id, until)
            .await
        {
            warn!(chat_id = inbound.chat_id, user_id = target.id, error = %e, "Platform restrict failed");
            self.send(inbound.chat_id, "Could not restrict that user.")
                .await;
            return;
        }

        let restriction = self
            .moderation
            .restrict(inbound.chat_id, target.id, &target.display_name, duration)
            .await;
        self.scheduler.schedule(restriction);
        info!(
            chat_id = inbound.chat_id,
            user_id = target.id,
            duration = duration_str,
            "Mute committed"
        );

        let admin_name = inbound.sender.display_name();
        self.send(
            inbound.chat_id,
            &format!(
                "@{}, gagged for {} by @{}. Behave.",
                target.display_name, duration_str, admin_name
            ),
        )
        .await;
        self.notify_admins(inbound, &admin_name, &target.display_name, &reason)
            .await;
        self.schedule_deletion(inbound.chat_id, inbound.message_id);
    }

    /// `/unmute` — lift the restriction early. Lift first: if the platform
    /// call fails, the timer stays armed and the registry stays intact.
    async fn cmd_unmute(&self, inbound: &Inbound, args: &[&str]) {
        if !self
            .admin_gate
            .is_admin(inbound.chat_id, inbound.sender.id)
            .await
        {
            self.deny(inbound).await;
            return;
        }

        let target = match &inbound.reply_to {
            Some(reply) => Some(ResolvedUser::from_member(&reply.sender)),
            None => match args.first() {
                Some(arg) => self.resolve_target(inbound.chat_id, arg).await,
                None => {
                    self.send(
                        inbound.chat_id,
                        "Specify a user or reply to their message.",
                    )
                    .await;
                    self.schedule_deletion(inbound.chat_id, inbound.message_id);
                    return;
                }
            },
        };
        let Some(target) = target else {
            self.send(inbound.chat_id, "User not found.").await;
            self.schedule_deletion(inbound.chat_id, inbound.message_id);
            return;
        };

        if let Err(e) = self
            .gateway
            .lift_restriction(inbound.chat_id, target.id)
            .await
        {
            warn!(chat_id = inbound.chat_id, user_id = target.id, error = %e, "Platform unmute failed");
            self.send(inbound.chat_id, "Could not lift the restriction.")
                .await;
            return;
        }

        self.scheduler.cancel(inbound.chat_id, target.id);
        self.moderation.release(inbound.chat_id, target.id).await;
        info!(chat_id = inbound.chat_id, user_id = target.id, "Manual unmute completed");
        self.send(
            inbound.chat_id,
            &format!(
                "@{}, the gag is off, courtesy of @{}. Don't make us do this again.",
                target.display_name,
                inbound.sender.display_name()
            ),
        )
        .await;
        self.schedule_deletion(inbound.chat_id, inbound.message_id);
    }

    /// `/muty` — in a group, the chat's active mutes; in private, the
    /// caller's admin groups and their mutes.
    async fn cmd_list_mutes(&self, inbound: &Inbound) {
        match inbound.chat_kind {
            ChatKind::Group => {
                if !self
                    .admin_gate
                    .is_admin(inbound.chat_id, inbound.sender.id)
                    .await
                {
                    self.deny(inbound).await;
                    return;
                }
                let text = self.format_mute_list(inbound.chat_id).await;
                self.send(inbound.chat_id, &text).await;
                self.schedule_deletion(inbound.chat_id, inbound.message_id);
            }
            ChatKind::Private => {
                let mut sections = Vec::new();
                for (group_id, title) in self.roster.known_groups().await {
                    if self.admin_gate.is_admin(group_id, inbound.sender.id).await {
                        sections.push(format!(
                            "{}:\n{}",
                            title,
                            self.format_mute_list(group_id).await
                        ));
                    }
                }
                if sections.is_empty() {
                    self.send(inbound.chat_id, DENIAL_MESSAGE).await;
                } else {
                    self.send(inbound.chat_id, &sections.join("\n\n")).await;
                }
            }
        }
    }

    async fn format_mute_list(&self, chat_id: i64) -> String {
        let active = self.moderation.list_active(chat_id).await;
        if active.is_empty() {
            return "No muted users.".to_string();
        }
        let mut lines = vec!["Currently gagged:".to_string()];
        for restriction in active {
            lines.push(format!(
                "@{} — until {}",
                restriction.display_name,
                restriction.expires_at.format("%Y-%m-%d %H:%M UTC")
            ));
        }
        lines.join("\n")
    }

    /// `/sky` — explicit assistant chat.
    async fn cmd_assistant_chat(&self, inbound: &Inbound, args: &[&str]) {
        let Some(assistant) = self.assistant.clone() else {
            self.send(inbound.chat_id, ASSISTANT_UNCONFIGURED).await;
            return;
        };
        if args.is_empty() {
            self.send(inbound.chat_id, ASSISTANT_GREETING).await;
            self.schedule_deletion(inbound.chat_id, inbound.message_id);
            return;
        }
        let message = args.join(" ");
        self.run_assistant_turn(inbound, &assistant, &message, None, message.clone())
            .await;
        self.schedule_deletion(inbound.chat_id, inbound.message_id);
    }

    /// One assistant exchange: build the prompt from persona + bounded
    /// history, call the backend, store the pair, reply.
    async fn run_assistant_turn(
        &self,
        inbound: &Inbound,
        assistant: &Arc<dyn AssistantGateway>,
        message: &str,
        reply_context: Option<String>,
        stored_user_message: String,
    ) {
        let persona = self.roster.persona().await;
        let history = self.conversation.history(inbound.sender.id).await;
        let name = inbound.sender.display_name();
        let prompt = build_prompt(&persona, &history, &name, message, reply_context.as_deref());

        match assistant.generate(&prompt).await {
            Ok(reply) => {
                self.conversation
                    .append(inbound.sender.id, &name, &stored_user_message, &reply)
                    .await;
                self.send(inbound.chat_id, &reply).await;
            }
            Err(e) => {
                warn!(user_id = inbound.sender.id, error = %e, "Assistant call failed");
                self.send(inbound.chat_id, ASSISTANT_UNAVAILABLE).await;
            }
        }
    }

    /// Mentions of the bot and replies to the bot's messages reach the
    /// assistant, with the replied-to text folded into the prompt.
    async fn maybe_assistant_reply(&self, inbound: &Inbound) {
        let Some(bot_username) = self.bot_username.read().await.clone() else {
            return;
        };
        let mention = format!("@{}", bot_username);
        let mentions_bot = inbound.text.contains(&mention);

        let is_direct_mention = mentions_bot && inbound.reply_to.is_none();
        let is_reply_to_bot = inbound
            .reply_to
            .as_ref()
            .map(|r| r.from_this_bot)
            .unwrap_or(false);
        let is_reply_with_mention = mentions_bot
            && inbound
                .reply_to
                .as_ref()
                .map(|r| !r.from_this_bot)
                .unwrap_or(false);

        if !(is_direct_mention || is_reply_to_bot || is_reply_with_mention) {
            return;
        }
        let Some(assistant) = self.assistant.clone() else {
            self.send(inbound.chat_id, ASSISTANT_UNCONFIGURED).await;
            return;
        };

        let clean = inbound.text.replace(&mention, "").trim().to_string();
        let (reply_context, stored) = match &inbound.reply_to {
            Some(reply) if is_reply_to_bot => (
                Some(format!("Replying to the bot's message: {}", reply.text)),
                format!("[Replying to '{}'] {}", reply.text, clean),
            ),
            Some(reply) => {
                let author = reply.sender.display_name();
                (
                    Some(format!(
                        "Replying to a message from {}: {}",
                        author, reply.text
                    )),
                    format!("[About the message '{}' from {}] {}", reply.text, author, clean),
                )
            }
            None => (None, clean.clone()),
        };
        self.run_assistant_turn(inbound, &assistant, &clean, reply_context, stored)
            .await;
    }

    /// A bare `+` or `-` reply adjusts the replied-to user's score.
    async fn handle_vote(&self, inbound: &Inbound, delta: i64) {
        let Some(reply) = &inbound.reply_to else {
            return;
        };
        let receiver = &reply.sender;
        // Self-votes are silently ignored.
        if receiver.id == inbound.sender.id {
            return;
        }
        let score = self
            .reputation
            .adjust(inbound.chat_id, inbound.sender.id, receiver.id, delta)
            .await;
        let giver = inbound.sender.display_name();
        let text = if delta > 0 {
            format!(
                "@{} bumped @{}'s score up by one. It is now {}.",
                giver,
                receiver.display_name(),
                score
            )
        } else {
            format!(
                "@{} knocked @{}'s score down by one. It is now {}.",
                giver,
                receiver.display_name(),
                score
            )
        };
        self.send(inbound.chat_id, &text).await;
        self.schedule_deletion(inbound.chat_id, inbound.message_id);
    }

    /// `/my_pepper` — the caller's own score.
    async fn cmd_own_score(&self, inbound: &Inbound) {
        if inbound.chat_kind != ChatKind::Group {
            self.send(inbound.chat_id, GROUPS_ONLY).await;
            return;
        }
        let score = self
            .reputation
            .score(inbound.chat_id, inbound.sender.id)
            .await;
        self.send(
            inbound.chat_id,
            &format!("@{}, your score is {}.", inbound.sender.display_name(), score),
        )
        .await;
        self.schedule_deletion(inbound.chat_id, inbound.message_id);
    }

    /// `/pepper` — the chat's top three scores.
    async fn cmd_leaderboard(&self, inbound: &Inbound) {
        if inbound.chat_kind != ChatKind::Group {
            self.send(inbound.chat_id, GROUPS_ONLY).await;
            return;
        }
        let top = self.reputation.top_n(inbound.chat_id, 3).await;
        if top.is_empty() {
            self.send(inbound.chat_id, "No scores in this chat yet.").await;
            self.schedule_deletion(inbound.chat_id, inbound.message_id);
            return;
        }
        let mut lines = vec!["Top 3 scores of this chat:".to_string()];
        for (rank, (user_id, score)) in top.into_iter().enumerate() {
            let name = match self.gateway.get_member(inbound.chat_id, user_id).await {
                Ok(member) => format!("@{}", member.display_name()),
                Err(_) => format!("user {}", user_id),
            };
            lines.push(format!("{}. {}: {}", rank + 1, name, score));
        }
        self.send(inbound.chat_id, &lines.join("\n")).await;
        self.schedule_deletion(inbound.chat_id, inbound.message_id);
    }

    /// `/date` — store the caller's profile text.
    async fn cmd_save_profile(&self, inbound: &Inbound, args: &[&str]) {
        if args.is_empty() {
            self.send(
                inbound.chat_id,
                "Usage: /date name, age, goals, interests\nExample: /date Sam, 25. Here for fun!",
            )
            .await;
            self.schedule_deletion(inbound.chat_id, inbound.message_id);
            return;
        }
        let profile_text = args.join(" ");
        self.roster
            .save_profile(
                inbound.sender.id,
                inbound.sender.username.as_deref(),
                inbound.sender.first_name.as_deref(),
                &profile_text,
            )
            .await;
        self.send(
            inbound.chat_id,
            &format!(
                "@{}, nice to meet you! Profile saved. Look others up with /who @username or by replying to their message.",
                inbound.sender.display_name()
            ),
        )
        .await;
        self.schedule_deletion(inbound.chat_id, inbound.message_id);
    }

    /// `/who` — show a stored profile. Usernames resolve through stored
    /// profiles only; no platform handle is ever fabricated.
    async fn cmd_show_profile(&self, inbound: &Inbound, args: &[&str]) {
        let target = match &inbound.reply_to {
            Some(reply) => Some(ResolvedUser::from_member(&reply.sender)),
            None => match args.first().and_then(|arg| arg.strip_prefix('@')) {
                Some(username) => self.roster.resolve_username(username).await,
                None => {
                    self.send(
                        inbound.chat_id,
                        "Usage: /who @username, or reply to the user's message.",
                    )
                    .await;
                    self.schedule_deletion(inbound.chat_id, inbound.message_id);
                    return;
                }
            },
        };
        let Some(target) = target else {
            self.send(inbound.chat_id, "User not found, or they have no profile.")
                .await;
            self.schedule_deletion(inbound.chat_id, inbound.message_id);
            return;
        };
        let text = match self.roster.profile(target.id).await {
            Some(profile) => format!("@{}\n{}", target.display_name, profile.profile),
            None => "This user has no profile.".to_string(),
        };
        self.send(inbound.chat_id, &text).await;
        self.schedule_deletion(inbound.chat_id, inbound.message_id);
    }

    /// `/persona` — set the assistant persona. Private chats only, for users
    /// who administer at least one known group.
    async fn cmd_set_persona(&self, inbound: &Inbound, args: &[&str]) {
        if inbound.chat_kind != ChatKind::Private {
            return;
        }
        let group_ids: Vec<i64> = self
            .roster
            .known_groups()
            .await
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        if !self
            .admin_gate
            .is_admin_anywhere(inbound.sender.id, &group_ids)
            .await
        {
            self.send(inbound.chat_id, DENIAL_MESSAGE).await;
            return;
        }
        if args.is_empty() {
            let current = self.roster.persona().await;
            self.send(
                inbound.chat_id,
                &format!("Current persona:\n{}\nUsage: /persona <description>", current),
            )
            .await;
            return;
        }
        self.roster.set_persona(&args.join(" ")).await;
        self.send(inbound.chat_id, "Persona updated.").await;
    }

    /// Resolves a `/mute`-style target argument: numeric id via live lookup,
    /// `@username` via live lookup of the profiled id, falling back to the
    /// stored profile projection.
    async fn resolve_target(&self, chat_id: i64, arg: &str) -> Option<ResolvedUser> {
        let arg = arg.trim();
        if let Ok(user_id) = arg.parse::<i64>() {
            return self
                .gateway
                .get_member(chat_id, user_id)
                .await
                .ok()
                .map(|member| ResolvedUser::from_member(&member));
        }
        let username = arg.strip_prefix('@')?;
        let resolved = self.roster.resolve_username(username).await?;
        match self.gateway.get_member(chat_id, resolved.id).await {
            Ok(member) => Some(ResolvedUser::from_member(&member)),
            Err(e) => {
                debug!(chat_id, user_id = resolved.id, error = %e, "Live lookup failed, using stored profile");
                Some(resolved)
            }
        }
    }

    /// Best-effort private notification of the chat's admins about a mute.
    async fn notify_admins(
        &self,
        inbound: &Inbound,
        admin_name: &str,
        target_name: &str,
        reason: &str,
    ) {
        let admins = match self.gateway.list_admins(inbound.chat_id).await {
            Ok(admins) => admins,
            Err(e) => {
                debug!(chat_id = inbound.chat_id, error = %e, "Admin notification skipped");
                return;
            }
        };
        let mut text = format!("@{} muted @{}", admin_name, target_name);
        if !reason.is_empty() {
            text.push_str(&format!("\nReason: {}", reason));
        }
        for admin in admins.iter().filter(|a| !a.is_bot) {
            // Some admins never opened a private chat with the bot; ignore.
            let _ = self.gateway.send_message(admin.id, &text).await;
        }
    }

    async fn deny(&self, inbound: &Inbound) {
        match self.gateway.send_message(inbound.chat_id, DENIAL_MESSAGE).await {
            Ok(handle) => self.schedule_deletion(handle.chat_id, handle.message_id),
            Err(e) => debug!(chat_id = inbound.chat_id, error = %e, "Denial message failed"),
        }
        self.schedule_deletion(inbound.chat_id, inbound.message_id);
    }

    /// Best-effort send; failures are logged, never propagated.
    async fn send(&self, chat_id: i64, text: &str) {
        if let Err(e) = self.gateway.send_message(chat_id, text).await {
            match e {
                GagbotError::Gateway(_) => {
                    warn!(chat_id, error = %e, "Failed to send message")
                }
                _ => warn!(chat_id, error = %e, "Unexpected send failure"),
            }
        }
    }

    /// Deletes a message after [`COMMAND_DELETE_DELAY`]; failures swallowed.
    fn schedule_deletion(&self, chat_id: i64, message_id: i32) {
        let gateway = self.gateway.clone();
        tokio::spawn(async move {
            tokio::time::sleep(COMMAND_DELETE_DELAY).await;
            if let Err(e) = gateway.delete_message(chat_id, message_id).await {
                debug!(chat_id, message_id, error = %e, "Scheduled deletion failed");
            }
        });
    }
}
