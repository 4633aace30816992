//! Gateway traits for the external collaborators.
//!
//! [`ChatGateway`] is the chat platform (restricting members, messaging),
//! [`AssistantGateway`] the LLM backend. Both are consumed as trait objects so
//! tests can substitute recording fakes.

use crate::error::Result;
use crate::types::{Member, MessageHandle};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Chat-platform capability the moderation core calls into.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Revokes the user's send permissions in the chat until `until`.
    async fn restrict_member(&self, chat_id: i64, user_id: i64, until: DateTime<Utc>)
        -> Result<()>;

    /// Restores the user's full send permissions in the chat.
    async fn lift_restriction(&self, chat_id: i64, user_id: i64) -> Result<()>;

    /// Looks up a member of the chat by user id.
    async fn get_member(&self, chat_id: i64, user_id: i64) -> Result<Member>;

    /// Lists the chat's administrators.
    async fn list_admins(&self, chat_id: i64) -> Result<Vec<Member>>;

    /// Sends a text message to a chat (or, for positive ids, a user).
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<MessageHandle>;

    /// Deletes a previously sent message.
    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<()>;
}

/// Text-in/text-out LLM backend. Prompt construction is the caller's job.
#[async_trait]
pub trait AssistantGateway: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}
