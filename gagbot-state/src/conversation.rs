//! Bounded per-user conversation history for the assistant.

use crate::snapshot::MAX_HISTORY_ENTRIES;
use crate::state::StateHandle;

/// Auxiliary memory for the assistant: a FIFO ring of the latest user and
/// assistant turns per user. Never consulted for moderation decisions.
#[derive(Clone)]
pub struct ConversationContext {
    state: StateHandle,
}

impl ConversationContext {
    pub fn new(state: StateHandle) -> Self {
        Self { state }
    }

    /// The stored history in chronological order.
    pub async fn history(&self, user_id: i64) -> Vec<String> {
        let state = self.state.lock().await;
        state
            .conversations
            .get(&user_id)
            .map(|record| record.history.clone())
            .unwrap_or_default()
    }

    /// Appends one exchange (user turn + assistant turn) as a unit, refreshes
    /// the stored display name, and trims the oldest entries until at most
    /// [`MAX_HISTORY_ENTRIES`] remain.
    pub async fn append(
        &self,
        user_id: i64,
        display_name: &str,
        user_message: &str,
        assistant_reply: &str,
    ) {
        let mut state = self.state.lock().await;
        let record = state.conversations.entry(user_id).or_default();
        record.name = display_name.to_string();
        record.history.push(user_message.to_string());
        record.history.push(assistant_reply.to_string());
        if record.history.len() > MAX_HISTORY_ENTRIES {
            let excess = record.history.len() - MAX_HISTORY_ENTRIES;
            record.history.drain(..excess);
        }
        state.flush_conversations();
    }
}
