//! The single serialization domain for all shared-state mutations.
//!
//! Every registry clones a [`StateHandle`] and locks it for the in-memory
//! transition plus the snapshot flush, never across gateway calls. Flush
//! failures are logged and do not roll back the in-memory mutation; the next
//! mutation retries the write.

use crate::snapshot::{BotData, ConversationData, SnapshotStore};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::error;

pub(crate) struct StateInner {
    pub data: BotData,
    pub conversations: ConversationData,
    store: SnapshotStore,
}

impl StateInner {
    /// Persists the bot data document; failure is logged, never propagated.
    pub fn flush_data(&self) {
        if let Err(e) = self.store.save_data(&self.data) {
            error!(error = %e, "Failed to persist bot data snapshot");
        }
    }

    /// Persists the conversation document; failure is logged, never propagated.
    pub fn flush_conversations(&self) {
        if let Err(e) = self.store.save_conversations(&self.conversations) {
            error!(error = %e, "Failed to persist conversation snapshot");
        }
    }
}

/// Cloneable handle to the process-wide mutable state.
#[derive(Clone)]
pub struct StateHandle {
    inner: Arc<Mutex<StateInner>>,
}

impl StateHandle {
    /// Loads both snapshots once and wraps them in the mutation lock.
    pub fn load(store: SnapshotStore) -> Self {
        let data = store.load_data();
        let conversations = store.load_conversations();
        Self {
            inner: Arc::new(Mutex::new(StateInner {
                data,
                conversations,
                store,
            })),
        }
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, StateInner> {
        self.inner.lock().await
    }
}
