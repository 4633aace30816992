//! Reputation ledger: per-(chat, user) non-negative counters.

use crate::state::StateHandle;
use std::cmp::Reverse;

/// Builds the persisted reputation key for a (chat, user) pair.
fn rep_key(chat_id: i64, user_id: i64) -> String {
    format!("{}_{}", chat_id, user_id)
}

#[derive(Clone)]
pub struct ReputationLedger {
    state: StateHandle,
}

impl ReputationLedger {
    pub fn new(state: StateHandle) -> Self {
        Self { state }
    }

    /// Applies a ±1 step from `giver_id` to `receiver_id` and returns the
    /// receiver's new score. Decrements clamp at zero. A self-adjustment is a
    /// no-op returning the unchanged score.
    pub async fn adjust(
        &self,
        chat_id: i64,
        giver_id: i64,
        receiver_id: i64,
        delta: i64,
    ) -> u64 {
        if giver_id == receiver_id {
            return self.score(chat_id, receiver_id).await;
        }

        let mut state = self.state.lock().await;
        let entry = state
            .data
            .reputations
            .entry(rep_key(chat_id, receiver_id))
            .or_insert(0);
        *entry = if delta >= 0 {
            entry.saturating_add(delta as u64)
        } else {
            entry.saturating_sub(delta.unsigned_abs())
        };
        let new_score = *entry;
        state.flush_data();
        new_score
    }

    /// Current score for the pair, zero if never adjusted.
    pub async fn score(&self, chat_id: i64, user_id: i64) -> u64 {
        let state = self.state.lock().await;
        state
            .data
            .reputations
            .get(&rep_key(chat_id, user_id))
            .copied()
            .unwrap_or(0)
    }

    /// Top `n` scores of the chat, descending; ties break by ascending user
    /// id so the order is deterministic.
    pub async fn top_n(&self, chat_id: i64, n: usize) -> Vec<(i64, u64)> {
        let prefix = format!("{}_", chat_id);
        let state = self.state.lock().await;
        let mut scores: Vec<(i64, u64)> = state
            .data
            .reputations
            .iter()
            .filter_map(|(key, &score)| {
                let user_id: i64 = key.strip_prefix(&prefix)?.parse().ok()?;
                Some((user_id, score))
            })
            .collect();
        scores.sort_by_key(|&(user_id, score)| (Reverse(score), user_id));
        scores.truncate(n);
        scores
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SnapshotStore;
    use tempfile::TempDir;

    fn ledger_in(dir: &TempDir) -> ReputationLedger {
        let store = SnapshotStore::new(
            dir.path().join("bot_data.json"),
            dir.path().join("conversations.json"),
        );
        ReputationLedger::new(StateHandle::load(store))
    }

    #[tokio::test]
    async fn test_increment_accumulates() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger_in(&dir);

        for expected in 1..=5u64 {
            assert_eq!(ledger.adjust(-100, 1, 2, 1).await, expected);
        }
        assert_eq!(ledger.score(-100, 2).await, 5);
    }

    #[tokio::test]
    async fn test_decrement_clamps_at_zero() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger_in(&dir);

        assert_eq!(ledger.adjust(-100, 1, 2, -1).await, 0);
        ledger.adjust(-100, 1, 2, 1).await;
        assert_eq!(ledger.adjust(-100, 1, 2, -1).await, 0);
        assert_eq!(ledger.adjust(-100, 1, 2, -1).await, 0);
    }

    #[tokio::test]
    async fn test_self_adjustment_is_noop() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger_in(&dir);

        ledger.adjust(-100, 1, 2, 1).await;
        assert_eq!(ledger.adjust(-100, 2, 2, 1).await, 1);
        assert_eq!(ledger.score(-100, 2).await, 1);
    }

    #[tokio::test]
    async fn test_top_n_orders_and_breaks_ties_by_user_id() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger_in(&dir);

        ledger.adjust(-100, 1, 20, 1).await;
        ledger.adjust(-100, 1, 20, 1).await;
        ledger.adjust(-100, 1, 30, 1).await;
        ledger.adjust(-100, 1, 10, 1).await;
        // Other chat's scores must not leak in.
        ledger.adjust(-200, 1, 99, 1).await;

        let top = ledger.top_n(-100, 3).await;
        assert_eq!(top, vec![(20, 2), (10, 1), (30, 1)]);
    }

    #[tokio::test]
    async fn test_top_n_truncates() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger_in(&dir);

        for user in 1..=5 {
            ledger.adjust(-100, 0, user, 1).await;
        }
        assert_eq!(ledger.top_n(-100, 3).await.len(), 3);
    }
}
