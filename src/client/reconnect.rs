//! Reconnection policy for unexpected SDK disconnections
//!
//! When the SDK reports a logout outside the post-login grace window, the
//! controller tries to recover silently: a bounded sequence of probes on an
//! exponential backoff. Three mechanisms keep overlapping triggers from
//! multiplying work:
//!
//! - an exclusive lock (`try_lock`) - a trigger while an attempt chain is
//!   running is a no-op, so at most one backoff timer exists at any instant;
//! - a [`ReconnectBroker`] - an explicit coordination service all
//!   reconnection-triggering subsystems share, which skips triggers arriving
//!   within a short window of any recorded attempt;
//! - an attempt budget - after the configured maximum the policy surfaces a
//!   terminal error exactly once and schedules nothing further.
//!
//! The lock is released before recursing into the next attempt. Holding it
//! across the retry boundary would permanently block legitimate triggers
//! arriving after the chain dies.
//!
//! # Examples
//!
//! ```rust
//! use aircall_client_core::client::reconnect::backoff_delay;
//! use std::time::Duration;
//!
//! let base = Duration::from_secs(1);
//! assert_eq!(backoff_delay(base, 1), Duration::from_secs(2));
//! assert_eq!(backoff_delay(base, 2), Duration::from_secs(4));
//! assert_eq!(backoff_delay(base, 3), Duration::from_secs(8));
//! ```

use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use crate::client::types::{ClientEvent, SharedState};
use crate::sdk::PhoneSdk;

/// Remediation text surfaced when reconnection gives up
pub(crate) const RELOAD_REMEDIATION: &str =
    "Unable to reconnect to the call workspace. Reload the page to try again.";

/// Backoff delay for a given attempt count: `base * 2^attempt`
///
/// Strictly increasing in `attempt`, saturating instead of overflowing.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

/// Shared coordination point for reconnection triggers
///
/// Any subsystem that may trigger reconnection records its attempts here,
/// and checks for recent attempts before starting its own. This replaces
/// the loose convention of a shared storage timestamp with a single broker
/// everything calls through.
#[derive(Debug, Default)]
pub struct ReconnectBroker {
    last_attempt: StdMutex<Option<Instant>>,
}

impl ReconnectBroker {
    /// Create a broker with no recorded attempts
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a reconnection attempt is being made now
    pub fn note_attempt(&self) {
        *self.last_attempt.lock().unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());
    }

    /// Whether any attempt was recorded within the given window
    pub fn attempted_within(&self, window: Duration) -> bool {
        self.last_attempt
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some_and(|at| at.elapsed() < window)
    }
}

/// The reconnection policy itself
///
/// Owns the attempt counter exclusively. The counter resets to zero on any
/// successful login - here on a successful probe, and from the
/// confirmed-login path when the user logs in by hand.
pub(crate) struct ReconnectPolicy {
    sdk: Arc<dyn PhoneSdk>,
    state: SharedState,
    broker: Arc<ReconnectBroker>,
    lock: Mutex<()>,
    attempts: AtomicU32,
    fatal_reported: AtomicBool,
    base_delay: Duration,
    debounce: Duration,
    max_attempts: u32,
    grace_period: Duration,
}

impl ReconnectPolicy {
    pub(crate) fn new(
        sdk: Arc<dyn PhoneSdk>,
        state: SharedState,
        broker: Arc<ReconnectBroker>,
        base_delay: Duration,
        debounce: Duration,
        max_attempts: u32,
        grace_period: Duration,
    ) -> Self {
        Self {
            sdk,
            state,
            broker,
            lock: Mutex::new(()),
            attempts: AtomicU32::new(0),
            fatal_reported: AtomicBool::new(false),
            base_delay,
            debounce,
            max_attempts,
            grace_period,
        }
    }

    /// Current attempt count
    pub(crate) fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Reset the counter and the fatal latch after a successful login
    pub(crate) fn reset(&self) {
        self.attempts.store(0, Ordering::SeqCst);
        self.fatal_reported.store(false, Ordering::SeqCst);
    }

    /// External entry point for reconnection triggers
    ///
    /// Debounced against attempts recorded by any cooperating subsystem;
    /// runs the attempt chain to completion otherwise.
    pub(crate) async fn attempt_reconnect(self: Arc<Self>) {
        if self.broker.attempted_within(self.debounce) {
            debug!("reconnection attempted recently, skipping trigger");
            return;
        }
        Self::next_attempt(self).await;
    }

    /// One attempt, then recursion into the next
    ///
    /// Boxed because the future recurses. The lock guard is dropped before
    /// the recursive call on the failure path.
    fn next_attempt(this: Arc<Self>) -> BoxFuture<'static, ()> {
        async move {
            let Ok(guard) = this.lock.try_lock() else {
                debug!("reconnection already in progress, trigger is a no-op");
                return;
            };

            let attempt = this.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt > this.max_attempts {
                drop(guard);
                if !this.fatal_reported.swap(true, Ordering::SeqCst) {
                    error!(
                        attempts = this.max_attempts,
                        "reconnection attempts exhausted, giving up"
                    );
                    this.state.mark_failed().await;
                    this.state.emit(ClientEvent::ReconnectExhausted {
                        attempts: this.max_attempts,
                        remediation: RELOAD_REMEDIATION.to_string(),
                    });
                }
                return;
            }

            this.broker.note_attempt();
            let delay = backoff_delay(this.base_delay, attempt);
            debug!(
                attempt,
                max_attempts = this.max_attempts,
                delay_ms = delay.as_millis() as u64,
                "scheduling reconnection attempt"
            );
            sleep(delay).await;

            if this.sdk.is_ready() && this.sdk.login_status() {
                this.attempts.store(0, Ordering::SeqCst);
                drop(guard);
                // A recovered session gets a fresh grace window, the same
                // as a confirmed login.
                this.state
                    .begin_login_grace(Instant::now() + this.grace_period)
                    .await;
                this.state.mark_connected().await;
                this.state.emit(ClientEvent::Connected);
                info!(attempt, "reconnection succeeded");
            } else {
                warn!(attempt, "reconnection attempt failed");
                // Release before recursing or later triggers would block
                // forever on a lock the dead chain still held.
                drop(guard);
                Self::next_attempt(this).await;
            }
        }
        .boxed()
    }
}
