//! Teloxide-based implementation of [`ChatGateway`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gagbot_core::{ChatGateway, GagbotError, Member, MessageHandle, Result};
use teloxide::payloads::RestrictChatMemberSetters;
use teloxide::prelude::*;
use teloxide::types::{ChatPermissions, MessageId, UserId};

/// The permission set restored when a mute is lifted: everything a regular
/// member can normally do, nothing administrative.
fn full_member_permissions() -> ChatPermissions {
    ChatPermissions::SEND_MESSAGES
        | ChatPermissions::SEND_AUDIOS
        | ChatPermissions::SEND_DOCUMENTS
        | ChatPermissions::SEND_PHOTOS
        | ChatPermissions::SEND_VIDEOS
        | ChatPermissions::SEND_VIDEO_NOTES
        | ChatPermissions::SEND_VOICE_NOTES
        | ChatPermissions::SEND_POLLS
        | ChatPermissions::SEND_OTHER_MESSAGES
        | ChatPermissions::ADD_WEB_PAGE_PREVIEWS
        | ChatPermissions::INVITE_USERS
}

pub struct TelegramGateway {
    bot: Bot,
}

impl TelegramGateway {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn gateway_err(e: impl std::fmt::Display) -> GagbotError {
    GagbotError::Gateway(e.to_string())
}

fn to_member(member: teloxide::types::ChatMember) -> Member {
    Member {
        id: member.user.id.0 as i64,
        username: member.user.username.clone(),
        first_name: Some(member.user.first_name.clone()),
        is_bot: member.user.is_bot,
    }
}

#[async_trait]
impl ChatGateway for TelegramGateway {
    async fn restrict_member(
        &self,
        chat_id: i64,
        user_id: i64,
        until: DateTime<Utc>,
    ) -> Result<()> {
        self.bot
            .restrict_chat_member(ChatId(chat_id), UserId(user_id as u64), ChatPermissions::empty())
            .until_date(until)
            .await
            .map_err(gateway_err)?;
        Ok(())
    }

    async fn lift_restriction(&self, chat_id: i64, user_id: i64) -> Result<()> {
        self.bot
            .restrict_chat_member(
                ChatId(chat_id),
                UserId(user_id as u64),
                full_member_permissions(),
            )
            .await
            .map_err(gateway_err)?;
        Ok(())
    }

    async fn get_member(&self, chat_id: i64, user_id: i64) -> Result<Member> {
        let member = self
            .bot
            .get_chat_member(ChatId(chat_id), UserId(user_id as u64))
            .await
            .map_err(gateway_err)?;
        Ok(to_member(member))
    }

    async fn list_admins(&self, chat_id: i64) -> Result<Vec<Member>> {
        let admins = self
            .bot
            .get_chat_administrators(ChatId(chat_id))
            .await
            .map_err(gateway_err)?;
        Ok(admins.into_iter().map(to_member).collect())
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<MessageHandle> {
        let sent = self
            .bot
            .send_message(ChatId(chat_id), text)
            .await
            .map_err(gateway_err)?;
        Ok(MessageHandle {
            chat_id,
            message_id: sent.id.0,
        })
    }

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<()> {
        self.bot
            .delete_message(ChatId(chat_id), MessageId(message_id))
            .await
            .map_err(gateway_err)?;
        Ok(())
    }
}
