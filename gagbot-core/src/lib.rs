//! # gagbot-core
//!
//! Transport-agnostic types and traits for the gagbot moderation bot:
//! [`ChatGateway`] and [`AssistantGateway`] seams, the [`AdminGate`], mute
//! duration parsing, prompt construction, the error taxonomy, and tracing
//! initialization. Used by gagbot-state, gagbot-scheduler, and gagbot-telegram.

pub mod admin;
pub mod duration;
pub mod error;
pub mod gateway;
pub mod logger;
pub mod prompt;
pub mod types;

pub use admin::AdminGate;
pub use duration::{parse_duration, DURATION_FORMAT_HINT};
pub use error::{GagbotError, Result};
pub use gateway::{AssistantGateway, ChatGateway};
pub use logger::init_tracing;
pub use prompt::build_prompt;
pub use types::{ChatKind, Inbound, Member, MessageHandle, ReplyContext, ResolvedUser};
