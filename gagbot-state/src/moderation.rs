//! Moderation registry: at most one active [`Restriction`] per (chat, user).
//!
//! Pure in-memory mutations plus a snapshot flush inside the serialization
//! domain. A platform action that already happened is never rolled back
//! because of a disk error, so flush failures stay local to the store.

use crate::state::StateHandle;
use crate::snapshot::MutedEntry;
use chrono::{DateTime, Duration, Utc};
use tracing::info;

/// One active mute: who, where, until when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restriction {
    pub chat_id: i64,
    pub user_id: i64,
    pub display_name: String,
    pub expires_at: DateTime<Utc>,
}

impl Restriction {
    /// Idempotency key for the pending expiry timer of this restriction.
    pub fn job_name(&self) -> String {
        format!("unmute_{}_{}", self.chat_id, self.user_id)
    }
}

#[derive(Clone)]
pub struct ModerationRegistry {
    state: StateHandle,
}

impl ModerationRegistry {
    pub fn new(state: StateHandle) -> Self {
        Self { state }
    }

    /// Records a mute expiring `duration` from now, replacing any existing
    /// entry for the pair. The caller cancels the superseded timer before
    /// arming the new one (see the scheduler). `duration` must be positive;
    /// the duration parser guarantees that for user input.
    pub async fn restrict(
        &self,
        chat_id: i64,
        user_id: i64,
        display_name: &str,
        duration: Duration,
    ) -> Restriction {
        let expires_at = Utc::now() + duration;
        let restriction = Restriction {
            chat_id,
            user_id,
            display_name: display_name.to_string(),
            expires_at,
        };

        let mut state = self.state.lock().await;
        state.data.muted_users.entry(chat_id).or_default().insert(
            user_id,
            MutedEntry {
                username: restriction.display_name.clone(),
                until: expires_at,
            },
        );
        state.flush_data();

        info!(
            chat_id,
            user_id,
            job = %restriction.job_name(),
            expires_at = %expires_at,
            "Restriction recorded"
        );
        restriction
    }

    /// Removes the entry for the pair. Returns whether anything was removed;
    /// releasing an absent pair is a no-op, which makes the expiry firing
    /// protocol idempotent.
    pub async fn release(&self, chat_id: i64, user_id: i64) -> bool {
        let mut state = self.state.lock().await;
        let removed = match state.data.muted_users.get_mut(&chat_id) {
            Some(chat_mutes) => {
                let removed = chat_mutes.remove(&user_id).is_some();
                if chat_mutes.is_empty() {
                    state.data.muted_users.remove(&chat_id);
                }
                removed
            }
            None => false,
        };
        if removed {
            state.flush_data();
            info!(chat_id, user_id, "Restriction released");
        }
        removed
    }

    /// Removes the entry for the pair only when its stored expiry still
    /// equals `expires_at`. A mismatch means the restriction was replaced
    /// after the caller snapshotted it; the live entry is left untouched.
    /// This is the compare-and-delete the expiry firing protocol relies on.
    pub async fn release_exact(
        &self,
        chat_id: i64,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> bool {
        let mut state = self.state.lock().await;
        let removed = match state.data.muted_users.get_mut(&chat_id) {
            Some(chat_mutes) => {
                let matches = chat_mutes
                    .get(&user_id)
                    .map(|entry| entry.until == expires_at)
                    .unwrap_or(false);
                if matches {
                    chat_mutes.remove(&user_id);
                }
                if chat_mutes.is_empty() {
                    state.data.muted_users.remove(&chat_id);
                }
                matches
            }
            None => false,
        };
        if removed {
            state.flush_data();
            info!(chat_id, user_id, "Restriction released");
        }
        removed
    }

    /// Snapshot of the chat's active restrictions, ordered by user id.
    pub async fn list_active(&self, chat_id: i64) -> Vec<Restriction> {
        let state = self.state.lock().await;
        state
            .data
            .muted_users
            .get(&chat_id)
            .map(|chat_mutes| {
                chat_mutes
                    .iter()
                    .map(|(&user_id, entry)| Restriction {
                        chat_id,
                        user_id,
                        display_name: entry.username.clone(),
                        expires_at: entry.until,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Snapshot of every active restriction across all chats. Used by the
    /// scheduler's startup reconciliation.
    pub async fn all_active(&self) -> Vec<Restriction> {
        let state = self.state.lock().await;
        state
            .data
            .muted_users
            .iter()
            .flat_map(|(&chat_id, chat_mutes)| {
                chat_mutes.iter().map(move |(&user_id, entry)| Restriction {
                    chat_id,
                    user_id,
                    display_name: entry.username.clone(),
                    expires_at: entry.until,
                })
            })
            .collect()
    }

    pub async fn get(&self, chat_id: i64, user_id: i64) -> Option<Restriction> {
        let state = self.state.lock().await;
        state
            .data
            .muted_users
            .get(&chat_id)
            .and_then(|chat_mutes| chat_mutes.get(&user_id))
            .map(|entry| Restriction {
                chat_id,
                user_id,
                display_name: entry.username.clone(),
                expires_at: entry.until,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SnapshotStore;
    use tempfile::TempDir;

    fn registry_in(dir: &TempDir) -> ModerationRegistry {
        let store = SnapshotStore::new(
            dir.path().join("bot_data.json"),
            dir.path().join("conversations.json"),
        );
        ModerationRegistry::new(StateHandle::load(store))
    }

    #[tokio::test]
    async fn test_restrict_records_future_expiry() {
        let dir = TempDir::new().unwrap();
        let registry = registry_in(&dir);

        let before = Utc::now();
        let restriction = registry
            .restrict(-100, 42, "ada", Duration::minutes(10))
            .await;
        assert!(restriction.expires_at >= before + Duration::minutes(10));
        assert_eq!(restriction.job_name(), "unmute_-100_42");

        let found = registry.get(-100, 42).await.unwrap();
        assert_eq!(found, restriction);
    }

    #[tokio::test]
    async fn test_restrict_replaces_existing_entry() {
        let dir = TempDir::new().unwrap();
        let registry = registry_in(&dir);

        registry.restrict(-100, 42, "ada", Duration::minutes(1)).await;
        let second = registry
            .restrict(-100, 42, "ada", Duration::hours(2))
            .await;

        let active = registry.list_active(-100).await;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].expires_at, second.expires_at);
    }

    #[tokio::test]
    async fn test_release_removes_and_reports() {
        let dir = TempDir::new().unwrap();
        let registry = registry_in(&dir);

        registry.restrict(-100, 42, "ada", Duration::minutes(5)).await;
        assert!(registry.release(-100, 42).await);
        assert!(!registry.release(-100, 42).await);
        assert!(registry.get(-100, 42).await.is_none());
        assert!(registry.list_active(-100).await.is_empty());
    }

    #[tokio::test]
    async fn test_release_exact_requires_matching_expiry() {
        let dir = TempDir::new().unwrap();
        let registry = registry_in(&dir);

        let first = registry
            .restrict(-100, 42, "ada", Duration::minutes(10))
            .await;
        let second = registry.restrict(-100, 42, "ada", Duration::hours(1)).await;

        // A snapshot of the replaced restriction must not delete the live one.
        assert!(!registry.release_exact(-100, 42, first.expires_at).await);
        assert_eq!(
            registry.get(-100, 42).await.unwrap().expires_at,
            second.expires_at
        );

        assert!(registry.release_exact(-100, 42, second.expires_at).await);
        assert!(registry.get(-100, 42).await.is_none());
    }

    #[tokio::test]
    async fn test_restrictions_survive_reload() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(
            dir.path().join("bot_data.json"),
            dir.path().join("conversations.json"),
        );

        let registry = ModerationRegistry::new(StateHandle::load(store.clone()));
        let restriction = registry
            .restrict(-100, 42, "ada", Duration::minutes(5))
            .await;

        let reloaded = ModerationRegistry::new(StateHandle::load(store));
        let found = reloaded.get(-100, 42).await.unwrap();
        assert_eq!(found.expires_at, restriction.expires_at);
        assert_eq!(found.display_name, "ada");
    }

    #[tokio::test]
    async fn test_all_active_spans_chats() {
        let dir = TempDir::new().unwrap();
        let registry = registry_in(&dir);

        registry.restrict(-1, 10, "a", Duration::minutes(1)).await;
        registry.restrict(-2, 11, "b", Duration::minutes(1)).await;
        registry.restrict(-2, 12, "c", Duration::minutes(1)).await;

        let all = registry.all_active().await;
        assert_eq!(all.len(), 3);
    }
}
