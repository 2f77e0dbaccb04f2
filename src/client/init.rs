//! The initialization state machine
//!
//! One run per application session, guarded by an "already attempted" flag:
//! a second `start` while one is in flight (or after one finished) is a
//! no-op. The machine walks `idle -> diagnostics -> creating-workspace ->
//! workspace-ready -> needs-login`, with fallback branches for blocked and
//! failed conditions, and hands confirmed logins to
//! [`AircallClient::handle_login_confirmed`].
//!
//! Initialization failures are classified three ways (see
//! [`InitFailureKind`]): blocked conditions land in the terminal `failed`
//! phase with a blocked-state notice; auth failures route to the login
//! surface; unknown failures are surfaced but still offer a login attempt -
//! optimistic degradation is a deliberate product decision here, because
//! misclassifying a recoverable issue as fatal strands the user completely.

use chrono::Utc;
use std::future::Future;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::client::types::{ClientEvent, InitializationPhase};
use crate::client::AircallClient;
use crate::diagnostics::run_diagnostics;
use crate::error::{ClientError, ClientResult, InitFailureKind};
use crate::store::{
    bump_connection_attempts, connection_is_recent, record_connection, OPTED_OUT_KEY,
};

/// Remediation text surfaced with blocked-state notices
pub(crate) const BLOCKED_REMEDIATION: &str =
    "The call workspace could not load. Disable ad or tracking blockers for \
     this site, use a supported browser (Chrome, Firefox or Edge), or try a \
     private window, then retry.";

/// Await a future with a deadline, translating expiry into a typed error
pub(crate) async fn with_timeout<T, F>(
    operation_name: &str,
    timeout: Duration,
    future: F,
) -> ClientResult<T>
where
    F: Future<Output = ClientResult<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => {
            error!(
                operation = operation_name,
                timeout_ms = timeout.as_millis() as u64,
                "operation timed out"
            );
            Err(ClientError::OperationTimeout {
                duration_ms: timeout.as_millis() as u64,
            })
        }
    }
}

impl AircallClient {
    /// Drive the state machine from `idle` to a resting state
    ///
    /// Idempotent per session: only the first call does anything.
    pub(crate) async fn run_initialization(&self) -> ClientResult<()> {
        if self.inner.init_attempted.swap(true, Ordering::SeqCst) {
            debug!("initialization already attempted this session, skipping");
            return Ok(());
        }
        if self.is_opted_out() {
            info!("integration opted out for this session, skipping initialization");
            return Ok(());
        }
        if !self.inner.config.has_credentials() {
            warn!("no vendor credentials configured, skipping initialization");
            return Ok(());
        }

        self.inner
            .state
            .set_phase(InitializationPhase::Diagnostics)
            .await;
        let report = run_diagnostics(self.inner.env.as_ref()).await;
        self.inner.state.set_diagnostics(report.issues.clone()).await;

        if report.is_fatal() {
            let reason = report
                .issues
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            error!(%reason, "environment cannot support the call workspace");
            self.inner.state.mark_failed().await;
            self.inner.state.emit(ClientEvent::Blocked {
                reason,
                remediation: BLOCKED_REMEDIATION.to_string(),
            });
            return Ok(());
        }
        if report.browser.requires_configuration {
            warn!(
                browser = %report.browser.name,
                "browser requires configuration, continuing with a warning"
            );
        }

        self.inner
            .state
            .set_phase(InitializationPhase::CreatingWorkspace)
            .await;
        bump_connection_attempts(self.inner.prefs.as_ref());

        let init_result = with_timeout(
            "sdk_initialize",
            self.inner.config.init_timeout,
            self.inner.sdk.initialize(self.inner.config.sdk_config()),
        )
        .await;
        if let Err(e) = init_result {
            return self.handle_init_failure(e).await;
        }

        if !self.inner.sdk.is_workspace_created() {
            error!("SDK reported no workspace after initialization");
            self.inner.state.mark_failed().await;
            self.inner.state.emit(ClientEvent::FatalError {
                reason: "workspace creation failed".to_string(),
                remediation: "Reload the page to try again.".to_string(),
            });
            return Ok(());
        }
        self.inner.state.mark_workspace_ready().await;

        if !connection_is_recent(
            self.inner.prefs.as_ref(),
            self.inner.config.cached_login_ttl,
            Utc::now(),
        ) {
            debug!("no recent login on record, forcing a fresh login");
            self.inner.sdk.clear_login_status();
        }

        self.inner
            .state
            .set_phase(InitializationPhase::NeedsLogin)
            .await;
        self.inner.visibility.show(true).await;
        self.inner.state.emit(ClientEvent::LoginRequired { reason: None });
        self.spawn_login_poll().await;

        if self.inner.sdk.login_status() {
            debug!("cached login still active, confirming immediately");
            self.handle_login_confirmed().await;
        }
        Ok(())
    }

    /// Route a classified initialization failure to the right surface
    async fn handle_init_failure(&self, e: ClientError) -> ClientResult<()> {
        let message = e.to_string();
        match InitFailureKind::classify(&message) {
            InitFailureKind::Blocked => {
                error!(error = %e, category = e.category(), "initialization blocked");
                self.inner.state.mark_failed().await;
                self.inner.state.emit(ClientEvent::Blocked {
                    reason: message,
                    remediation: BLOCKED_REMEDIATION.to_string(),
                });
            }
            InitFailureKind::AuthRequired => {
                warn!(error = %e, "initialization needs authentication, routing to login");
                self.inner
                    .state
                    .set_phase(InitializationPhase::NeedsLogin)
                    .await;
                self.inner.state.emit(ClientEvent::LoginRequired {
                    reason: Some(message),
                });
                self.inner.visibility.show(true).await;
                self.spawn_login_poll().await;
            }
            InitFailureKind::Unknown => {
                // Optimistic degradation: surface the error but still offer
                // a login attempt instead of failing closed.
                warn!(error = %e, "unclassified initialization failure, still offering login");
                self.inner.state.emit(ClientEvent::UserPrompt {
                    message: format!(
                        "The call workspace hit an unexpected error ({message}). \
                         You can still try logging in."
                    ),
                });
                self.inner
                    .state
                    .set_phase(InitializationPhase::NeedsLogin)
                    .await;
                self.inner.visibility.show(true).await;
                self.spawn_login_poll().await;
            }
        }
        Ok(())
    }

    /// Successful-login handling
    ///
    /// Stops the login poll, resets the reconnection counter, records the
    /// connection moment, opens the grace window during which logout events
    /// are presumed spurious, and reveals the workspace. Idempotent: a poll
    /// tick and an SDK login event can both land here.
    pub(crate) async fn handle_login_confirmed(&self) {
        if !self.inner.state.begin_login().await {
            return;
        }
        let _ = self.inner.login_poll_stop.send(true);

        self.inner.reconnect.reset();
        record_connection(self.inner.prefs.as_ref(), Utc::now());
        self.inner.state.mark_connected().await;
        self.inner
            .state
            .begin_login_grace(Instant::now() + self.inner.config.login_grace_period)
            .await;
        self.inner.state.emit(ClientEvent::Connected);
        info!(
            grace_secs = self.inner.config.login_grace_period.as_secs(),
            "login confirmed"
        );

        self.inner.visibility.show(false).await;
    }

    /// Poll the SDK login status while the user logs in by hand
    ///
    /// The SDK's login event is the primary signal; the poll is a belt for
    /// deployments where that event is unreliable. Both funnel into
    /// [`Self::handle_login_confirmed`].
    pub(crate) async fn spawn_login_poll(&self) {
        let mut guard = self.inner.login_poll.lock().await;
        if guard.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }
        let _ = self.inner.login_poll_stop.send(false);

        let client = self.clone();
        let interval = self.inner.config.login_poll_interval;
        *guard = Some(tokio::spawn(async move {
            let mut stop_rx = client.inner.login_poll_stop.subscribe();
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            debug!("login poll stopped");
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        if client.inner.sdk.login_status() {
                            debug!("login detected by poll");
                            client.handle_login_confirmed().await;
                            break;
                        }
                    }
                }
            }
        }));
    }

    /// Clear the opt-out and reset the machine so `start` can run again
    ///
    /// The `failed -> idle` transition of the phase table. The caller is
    /// expected to invoke [`AircallClient::start`] afterwards.
    pub async fn force_retry(&self) {
        info!("forced retry requested");
        self.inner.prefs.session_remove(OPTED_OUT_KEY);
        self.inner.reconnect.reset();
        let _ = self.inner.login_poll_stop.send(true);
        self.inner.init_attempted.store(false, Ordering::SeqCst);
        self.inner.state.reset_to_idle().await;
    }
}
