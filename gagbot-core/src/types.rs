//! Core types: chat members, inbound messages, and display projections.

use serde::{Deserialize, Serialize};

/// A chat member as the platform reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub is_bot: bool,
}

impl Member {
    /// Display name: username, then first name, then the numeric id.
    pub fn display_name(&self) -> String {
        self.username
            .clone()
            .or_else(|| self.first_name.clone())
            .unwrap_or_else(|| format!("user {}", self.id))
    }
}

/// Handle to a sent message, enough to delete or edit it later.
#[derive(Debug, Clone, Copy)]
pub struct MessageHandle {
    pub chat_id: i64,
    pub message_id: i32,
}

/// Display-oriented projection of a user resolved either from a live
/// platform lookup or from a stored profile. Never a live platform handle:
/// `known_from_profile` marks entries reconstructed from persisted data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUser {
    pub id: i64,
    pub display_name: String,
    pub known_from_profile: bool,
}

impl ResolvedUser {
    /// Projects a live platform member.
    pub fn from_member(member: &Member) -> Self {
        Self {
            id: member.id,
            display_name: member.display_name(),
            known_from_profile: false,
        }
    }
}

/// Kind of chat a message arrived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
}

/// Transport-agnostic inbound message handed to the command dispatch.
#[derive(Debug, Clone)]
pub struct Inbound {
    pub chat_id: i64,
    pub chat_kind: ChatKind,
    pub chat_title: Option<String>,
    pub message_id: i32,
    pub sender: Member,
    pub text: String,
    pub reply_to: Option<ReplyContext>,
}

/// Context of the message an inbound message replies to.
#[derive(Debug, Clone)]
pub struct ReplyContext {
    pub sender: Member,
    pub text: String,
    pub from_this_bot: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_prefers_username() {
        let member = Member {
            id: 7,
            username: Some("ada".to_string()),
            first_name: Some("Ada".to_string()),
            is_bot: false,
        };
        assert_eq!(member.display_name(), "ada");
    }

    #[test]
    fn test_display_name_falls_back_to_id() {
        let member = Member {
            id: 7,
            username: None,
            first_name: None,
            is_bot: false,
        };
        assert_eq!(member.display_name(), "user 7");
    }

    #[test]
    fn test_resolved_user_from_member_is_live() {
        let member = Member {
            id: 1,
            username: None,
            first_name: Some("Eve".to_string()),
            is_bot: false,
        };
        let resolved = ResolvedUser::from_member(&member);
        assert_eq!(resolved.display_name, "Eve");
        assert!(!resolved.known_from_profile);
    }
}
