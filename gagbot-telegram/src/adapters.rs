//! Adapters from teloxide types to the core inbound types.

use gagbot_core::{ChatKind, Inbound, Member, ReplyContext};

/// Wraps a teloxide User for conversion to core [`Member`].
pub struct TelegramUserWrapper<'a>(pub &'a teloxide::types::User);

impl<'a> TelegramUserWrapper<'a> {
    pub fn to_member(&self) -> Member {
        Member {
            id: self.0.id.0 as i64,
            username: self.0.username.clone(),
            first_name: Some(self.0.first_name.clone()),
            is_bot: self.0.is_bot,
        }
    }
}

/// Wraps a teloxide Message for conversion to core [`Inbound`].
pub struct TelegramMessageWrapper<'a>(pub &'a teloxide::types::Message);

impl<'a> TelegramMessageWrapper<'a> {
    /// Converts to the core inbound message. `bot_username` marks replies to
    /// this bot's own messages. Returns `None` for messages with no text or
    /// no sender (service messages, channel posts).
    pub fn to_inbound(&self, bot_username: Option<&str>) -> Option<Inbound> {
        let text = self.0.text()?.to_string();
        let sender = TelegramUserWrapper(self.0.from.as_ref()?).to_member();
        let chat_kind = if self.0.chat.is_private() {
            ChatKind::Private
        } else {
            ChatKind::Group
        };

        let reply_to = self.0.reply_to_message().and_then(|replied| {
            let reply_sender = TelegramUserWrapper(replied.from.as_ref()?).to_member();
            let from_this_bot = reply_sender.is_bot
                && bot_username.is_some()
                && reply_sender.username.as_deref() == bot_username;
            Some(ReplyContext {
                sender: reply_sender,
                text: replied.text().or(replied.caption()).unwrap_or("").to_string(),
                from_this_bot,
            })
        });

        Some(Inbound {
            chat_id: self.0.chat.id.0,
            chat_kind,
            chat_title: self.0.chat.title().map(str::to_string),
            message_id: self.0.id.0,
            sender,
            text,
            reply_to,
        })
    }
}
