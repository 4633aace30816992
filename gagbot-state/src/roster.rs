//! Group roster, user profiles, and the assistant persona.
//!
//! Groups are discovered opportunistically from any inbound activity and are
//! never forgotten. Profiles back the /date and /who commands and the
//! username fallback when the platform cannot resolve a handle.

use crate::snapshot::{GroupRecord, Profile};
use crate::state::StateHandle;
use chrono::Utc;
use gagbot_core::ResolvedUser;
use tracing::info;

#[derive(Clone)]
pub struct GroupRoster {
    state: StateHandle,
}

impl GroupRoster {
    pub fn new(state: StateHandle) -> Self {
        Self { state }
    }

    /// Records (or retitles) a known group; flushes only when something
    /// actually changed.
    pub async fn remember_group(&self, chat_id: i64, title: &str) {
        let mut state = self.state.lock().await;
        let record = GroupRecord {
            title: title.to_string(),
        };
        if state.data.groups.get(&chat_id) == Some(&record) {
            return;
        }
        let known_before = state.data.groups.insert(chat_id, record).is_some();
        state.flush_data();
        if !known_before {
            info!(chat_id, title, "New group recorded");
        }
    }

    /// All known groups as (chat id, title), ordered by chat id.
    pub async fn known_groups(&self) -> Vec<(i64, String)> {
        let state = self.state.lock().await;
        state
            .data
            .groups
            .iter()
            .map(|(&chat_id, record)| (chat_id, record.title.clone()))
            .collect()
    }

    /// Stores the user's profile text, replacing any previous one.
    pub async fn save_profile(
        &self,
        user_id: i64,
        username: Option<&str>,
        first_name: Option<&str>,
        profile_text: &str,
    ) {
        let mut state = self.state.lock().await;
        state.data.profiles.insert(
            user_id,
            Profile {
                username: username.map(str::to_string),
                first_name: first_name.map(str::to_string),
                profile: profile_text.to_string(),
                created_at: Utc::now(),
            },
        );
        state.flush_data();
    }

    pub async fn profile(&self, user_id: i64) -> Option<Profile> {
        let state = self.state.lock().await;
        state.data.profiles.get(&user_id).cloned()
    }

    /// Resolves a username against stored profiles. The result is a display
    /// projection only, never a live platform handle.
    pub async fn resolve_username(&self, username: &str) -> Option<ResolvedUser> {
        let state = self.state.lock().await;
        state
            .data
            .profiles
            .iter()
            .find(|(_, profile)| profile.username.as_deref() == Some(username))
            .map(|(&user_id, profile)| ResolvedUser {
                id: user_id,
                display_name: profile
                    .username
                    .clone()
                    .or_else(|| profile.first_name.clone())
                    .unwrap_or_else(|| format!("user {}", user_id)),
                known_from_profile: true,
            })
    }

    pub async fn persona(&self) -> String {
        let state = self.state.lock().await;
        state.data.persona.clone()
    }

    pub async fn set_persona(&self, persona: &str) {
        let mut state = self.state.lock().await;
        state.data.persona = persona.to_string();
        state.flush_data();
    }
}
