//! Admin authorization gate. Fails closed: any lookup failure means "not admin".

use crate::gateway::ChatGateway;
use std::sync::Arc;
use tracing::warn;

/// Authorization check for privileged commands, delegating to the platform's
/// admin listing. Every mutating command goes through this gate before
/// touching shared state.
#[derive(Clone)]
pub struct AdminGate {
    gateway: Arc<dyn ChatGateway>,
}

impl AdminGate {
    pub fn new(gateway: Arc<dyn ChatGateway>) -> Self {
        Self { gateway }
    }

    /// Returns true iff the user is in the chat's admin set. Never errors:
    /// failed lookups resolve to false.
    pub async fn is_admin(&self, chat_id: i64, user_id: i64) -> bool {
        match self.gateway.list_admins(chat_id).await {
            Ok(admins) => admins.iter().any(|a| a.id == user_id),
            Err(e) => {
                warn!(chat_id, user_id, error = %e, "Admin lookup failed, treating as not admin");
                false
            }
        }
    }

    /// Returns true iff the user is an admin in at least one of the chats.
    pub async fn is_admin_anywhere(&self, user_id: i64, chat_ids: &[i64]) -> bool {
        for &chat_id in chat_ids {
            if self.is_admin(chat_id, user_id).await {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GagbotError, Result};
    use crate::types::{Member, MessageHandle};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    struct FixedAdmins {
        admins: Vec<(i64, i64)>,
        fail: bool,
    }

    #[async_trait]
    impl ChatGateway for FixedAdmins {
        async fn restrict_member(&self, _: i64, _: i64, _: DateTime<Utc>) -> Result<()> {
            Ok(())
        }
        async fn lift_restriction(&self, _: i64, _: i64) -> Result<()> {
            Ok(())
        }
        async fn get_member(&self, _: i64, user_id: i64) -> Result<Member> {
            Ok(Member {
                id: user_id,
                username: None,
                first_name: None,
                is_bot: false,
            })
        }
        async fn list_admins(&self, chat_id: i64) -> Result<Vec<Member>> {
            if self.fail {
                return Err(GagbotError::Gateway("boom".to_string()));
            }
            Ok(self
                .admins
                .iter()
                .filter(|(c, _)| *c == chat_id)
                .map(|&(_, id)| Member {
                    id,
                    username: None,
                    first_name: None,
                    is_bot: false,
                })
                .collect())
        }
        async fn send_message(&self, chat_id: i64, _: &str) -> Result<MessageHandle> {
            Ok(MessageHandle {
                chat_id,
                message_id: 0,
            })
        }
        async fn delete_message(&self, _: i64, _: i32) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_is_admin_matches_admin_set() {
        let gate = AdminGate::new(Arc::new(FixedAdmins {
            admins: vec![(1, 10)],
            fail: false,
        }));
        assert!(gate.is_admin(1, 10).await);
        assert!(!gate.is_admin(1, 11).await);
        assert!(!gate.is_admin(2, 10).await);
    }

    #[tokio::test]
    async fn test_is_admin_fails_closed() {
        let gate = AdminGate::new(Arc::new(FixedAdmins {
            admins: vec![(1, 10)],
            fail: true,
        }));
        assert!(!gate.is_admin(1, 10).await);
    }

    #[tokio::test]
    async fn test_is_admin_anywhere() {
        let gate = AdminGate::new(Arc::new(FixedAdmins {
            admins: vec![(2, 10)],
            fail: false,
        }));
        assert!(gate.is_admin_anywhere(10, &[1, 2, 3]).await);
        assert!(!gate.is_admin_anywhere(11, &[1, 2, 3]).await);
        assert!(!gate.is_admin_anywhere(10, &[]).await);
    }
}
