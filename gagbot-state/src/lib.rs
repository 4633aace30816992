//! # gagbot-state
//!
//! Persistence-backed shared state. One [`StateHandle`] is the serialization
//! domain: every mutation locks it for the in-memory transition plus the
//! snapshot flush. The registries ([`ModerationRegistry`],
//! [`ReputationLedger`], [`ConversationContext`], [`GroupRoster`]) are thin
//! components over that handle.

pub mod conversation;
pub mod moderation;
pub mod reputation;
pub mod roster;
pub mod snapshot;
pub mod state;

pub use conversation::ConversationContext;
pub use moderation::{ModerationRegistry, Restriction};
pub use reputation::ReputationLedger;
pub use roster::GroupRoster;
pub use snapshot::{
    BotData, ConversationData, ConversationRecord, GroupRecord, MutedEntry, Profile,
    SnapshotStore, MAX_HISTORY_ENTRIES,
};
pub use state::StateHandle;
