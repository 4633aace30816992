//! # gagbot-scheduler
//!
//! Schedules and executes exactly-once automatic unmutes. Each active
//! [`Restriction`] owns one pending timer task, keyed by (chat, user) and
//! named `unmute_{chat}_{user}`. Re-restricting a pair replaces its timer
//! under the job-map lock; manual release cancels it. On startup,
//! [`ExpiryScheduler::reconcile`] re-arms a timer for every persisted
//! restriction, firing immediately when the expiry already passed.

use chrono::Utc;
use gagbot_core::ChatGateway;
use gagbot_state::{ModerationRegistry, Restriction};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// One pending timer: a generation token plus the spawned task handle. The
/// token lets a firing task detect that it has been superseded.
struct Job {
    token: u64,
    handle: JoinHandle<()>,
}

pub struct ExpiryScheduler {
    registry: ModerationRegistry,
    gateway: Arc<dyn ChatGateway>,
    jobs: Mutex<HashMap<(i64, i64), Job>>,
    next_token: AtomicU64,
}

impl ExpiryScheduler {
    pub fn new(registry: ModerationRegistry, gateway: Arc<dyn ChatGateway>) -> Arc<Self> {
        Arc::new(Self {
            registry,
            gateway,
            jobs: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(1),
        })
    }

    /// Arms a timer for the restriction's expiry, replacing any pending timer
    /// for the same pair. Replacement happens under the job-map lock: the old
    /// task is aborted before the new one is visible, so at no point can two
    /// timers for one key both fire.
    pub fn schedule(self: &Arc<Self>, restriction: Restriction) {
        let key = (restriction.chat_id, restriction.user_id);
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let job_name = restriction.job_name();

        let remaining = (restriction.expires_at - Utc::now())
            .to_std()
            .unwrap_or(StdDuration::ZERO);
        info!(
            job = %job_name,
            remaining_secs = remaining.as_secs(),
            "Scheduling automatic unmute"
        );

        let scheduler = Arc::clone(self);
        let mut jobs = self.jobs.lock().expect("job map lock poisoned");
        let handle = tokio::spawn(async move {
            tokio::time::sleep(remaining).await;
            scheduler.fire(restriction, token).await;
        });
        if let Some(old) = jobs.insert(key, Job { token, handle }) {
            old.handle.abort();
            debug!(job = %job_name, "Replaced pending unmute timer");
        }
    }

    /// Cancels the pending timer for the pair, if any. Returns whether a
    /// timer was pending.
    pub fn cancel(&self, chat_id: i64, user_id: i64) -> bool {
        let mut jobs = self.jobs.lock().expect("job map lock poisoned");
        match jobs.remove(&(chat_id, user_id)) {
            Some(job) => {
                job.handle.abort();
                info!(job = format!("unmute_{}_{}", chat_id, user_id), "Cancelled unmute timer");
                true
            }
            None => false,
        }
    }

    /// Re-arms timers for every persisted restriction. Entries whose expiry
    /// passed while the process was down get a zero-length timer and fire
    /// immediately instead of being dropped.
    pub async fn reconcile(self: &Arc<Self>) {
        let active = self.registry.all_active().await;
        let count = active.len();
        for restriction in active {
            self.schedule(restriction);
        }
        info!(count, "Reconciled persisted restrictions with timers");
    }

    /// Number of pending timers. Exposed for observability and tests.
    pub fn pending(&self) -> usize {
        self.jobs.lock().expect("job map lock poisoned").len()
    }

    /// The firing protocol. Idempotent: a stale timer (superseded while this
    /// task was already running) backs out at the token check, and the
    /// registry is only ever touched by compare-and-delete against the
    /// restriction this timer was armed for.
    ///
    /// (a) confirm the registry entry still belongs to this restriction —
    /// a mismatch means it was released or replaced while this task waited,
    /// and nothing of the live entry may be reversed; (b) lift the platform
    /// restriction — failure is logged but never leaves the registry out of
    /// sync; (c) remove the entry and persist, again only if it still matches
    /// (a re-restrict can slip in during the lift call); (d) best-effort
    /// in-chat notification, errors swallowed.
    async fn fire(self: &Arc<Self>, restriction: Restriction, token: u64) {
        let key = (restriction.chat_id, restriction.user_id);
        let job_name = restriction.job_name();

        {
            let mut jobs = self.jobs.lock().expect("job map lock poisoned");
            match jobs.get(&key) {
                Some(job) if job.token == token => {
                    jobs.remove(&key);
                }
                _ => {
                    debug!(job = %job_name, "Stale unmute timer, skipping");
                    return;
                }
            }
        }

        match self.registry.get(restriction.chat_id, restriction.user_id).await {
            Some(current) if current.expires_at == restriction.expires_at => {}
            _ => {
                debug!(job = %job_name, "Restriction released or replaced before timer fired");
                return;
            }
        }

        if let Err(e) = self
            .gateway
            .lift_restriction(restriction.chat_id, restriction.user_id)
            .await
        {
            warn!(job = %job_name, error = %e, "Platform unmute failed, cleaning registry anyway");
        }

        let removed = self
            .registry
            .release_exact(
                restriction.chat_id,
                restriction.user_id,
                restriction.expires_at,
            )
            .await;
        if !removed {
            debug!(job = %job_name, "Restriction replaced during lift, leaving the live entry");
            return;
        }

        let text = format!(
            "Mute timer for @{} is over. Restriction lifted automatically.",
            restriction.display_name
        );
        if let Err(e) = self.gateway.send_message(restriction.chat_id, &text).await {
            debug!(job = %job_name, error = %e, "Unmute notification failed");
        }

        info!(job = %job_name, "Automatic unmute completed");
    }
}
