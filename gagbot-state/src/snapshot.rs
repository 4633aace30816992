//! Durable snapshot documents and the store that reads/writes them.
//!
//! Two independent JSON files: the bot data document (groups, muted users,
//! reputations, profiles, assistant persona) and the conversation histories.
//! Loading is forgiving: a missing or unreadable file becomes the empty
//! default. Saving overwrites the whole document via a temp file + rename so
//! a failed write leaves the previous snapshot intact.

use chrono::{DateTime, Utc};
use gagbot_core::{GagbotError, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

/// A known group chat, discovered from inbound activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub title: String,
}

/// One active mute as persisted: display name and absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutedEntry {
    pub username: String,
    pub until: DateTime<Utc>,
}

/// A user profile stored by the /date command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub profile: String,
    pub created_at: DateTime<Utc>,
}

/// The main durable document. Field names are the wire format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BotData {
    #[serde(default)]
    pub groups: BTreeMap<i64, GroupRecord>,
    #[serde(default)]
    pub muted_users: BTreeMap<i64, BTreeMap<i64, MutedEntry>>,
    /// Keyed by `"{chat_id}_{user_id}"`, scores never go below zero.
    #[serde(default)]
    pub reputations: BTreeMap<String, u64>,
    #[serde(default)]
    pub profiles: BTreeMap<i64, Profile>,
    #[serde(default, rename = "gemini_personality")]
    pub persona: String,
}

/// Per-user assistant conversation: display name plus alternating
/// user/assistant turns, at most [`MAX_HISTORY_ENTRIES`] entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub name: String,
    #[serde(default)]
    pub history: Vec<String>,
}

/// The conversation snapshot document, keyed by user id.
pub type ConversationData = BTreeMap<i64, ConversationRecord>;

/// Upper bound on stored history entries (5 exchanges).
pub const MAX_HISTORY_ENTRIES: usize = 10;

/// Reads and writes the two snapshot files.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    data_path: PathBuf,
    conversations_path: PathBuf,
}

impl SnapshotStore {
    pub fn new(data_path: impl Into<PathBuf>, conversations_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            conversations_path: conversations_path.into(),
        }
    }

    /// Loads the bot data document; empty default when missing or unreadable.
    pub fn load_data(&self) -> BotData {
        load_json(&self.data_path)
    }

    /// Loads the conversation document; empty default when missing or unreadable.
    pub fn load_conversations(&self) -> ConversationData {
        load_json(&self.conversations_path)
    }

    /// Overwrites the bot data snapshot.
    pub fn save_data(&self, data: &BotData) -> Result<()> {
        save_json(&self.data_path, data)
    }

    /// Overwrites the conversation snapshot.
    pub fn save_conversations(&self, conversations: &ConversationData) -> Result<()> {
        save_json(&self.conversations_path, conversations)
    }
}

fn load_json<T: DeserializeOwned + Default>(path: &Path) -> T {
    if !path.exists() {
        return T::default();
    }
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read snapshot, starting empty");
            return T::default();
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Snapshot is corrupt, starting empty");
            T::default()
        }
    }
}

fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let raw = serde_json::to_string_pretty(value)
        .map_err(|e| GagbotError::Persistence(e.to_string()))?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, raw).map_err(|e| GagbotError::Persistence(e.to_string()))?;
    std::fs::rename(&tmp, path).map_err(|e| GagbotError::Persistence(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> SnapshotStore {
        SnapshotStore::new(
            dir.path().join("bot_data.json"),
            dir.path().join("conversations.json"),
        )
    }

    #[test]
    fn test_load_missing_is_default() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.load_data(), BotData::default());
        assert!(store.load_conversations().is_empty());
    }

    #[test]
    fn test_load_corrupt_is_default() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(dir.path().join("bot_data.json"), "{not json").unwrap();
        assert_eq!(store.load_data(), BotData::default());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let mut data = BotData::default();
        data.groups.insert(
            -100,
            GroupRecord {
                title: "test group".to_string(),
            },
        );
        data.muted_users.entry(-100).or_default().insert(
            42,
            MutedEntry {
                username: "ada".to_string(),
                until: Utc::now() + chrono::Duration::minutes(10),
            },
        );
        data.reputations.insert("-100_42".to_string(), 3);
        data.persona = "terse".to_string();

        store.save_data(&data).unwrap();
        assert_eq!(store.load_data(), data);
    }

    #[test]
    fn test_wire_format_field_names() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let mut data = BotData::default();
        data.reputations.insert("-100_42".to_string(), 1);
        data.persona = "p".to_string();
        store.save_data(&data).unwrap();

        let raw = std::fs::read_to_string(dir.path().join("bot_data.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["gemini_personality"], "p");
        assert_eq!(json["reputations"]["-100_42"], 1);
    }

    #[test]
    fn test_until_is_iso_8601() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let until = "2026-01-02T03:04:05Z".parse::<DateTime<Utc>>().unwrap();
        let mut data = BotData::default();
        data.muted_users.entry(-1).or_default().insert(
            2,
            MutedEntry {
                username: "ada".to_string(),
                until,
            },
        );
        store.save_data(&data).unwrap();

        let raw = std::fs::read_to_string(dir.path().join("bot_data.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let stored = json["muted_users"]["-1"]["2"]["until"].as_str().unwrap();
        assert_eq!(stored.parse::<DateTime<Utc>>().unwrap(), until);
    }

    #[test]
    fn test_partial_document_loads_with_defaults() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(
            dir.path().join("bot_data.json"),
            r#"{"groups": {"-5": {"title": "t"}}}"#,
        )
        .unwrap();
        let data = store.load_data();
        assert_eq!(data.groups.len(), 1);
        assert!(data.muted_users.is_empty());
        assert_eq!(data.persona, "");
    }

    #[test]
    fn test_conversations_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let mut conversations = ConversationData::new();
        conversations.insert(
            7,
            ConversationRecord {
                name: "Ada".to_string(),
                history: vec!["hi".to_string(), "hello".to_string()],
            },
        );
        store.save_conversations(&conversations).unwrap();
        assert_eq!(store.load_conversations(), conversations);
    }
}
