//! Workspace visibility management
//!
//! Single source of truth for showing and hiding the embedded widget's
//! container. Both operations run under one exclusive lock - a show can
//! never interleave with a hide, so the container cannot be left with a
//! hide's DOM write landing after a show's. A trigger while an operation is
//! in flight is a no-op, which is what makes `show` and `hide` idempotent
//! under rapid repeated calls.
//!
//! `show` favors availability over internal bookkeeping: if the controller
//! is not fully connected the widget is shown anyway with a warning,
//! because a hidden widget is a worse failure mode than a premature one.
//! With `for_login` the readiness check is skipped entirely - the login
//! surface must always be reachable.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::client::types::SharedState;
use crate::sdk::{PhoneSdk, WorkspaceSurface};
use crate::store::{PreferenceStore, WORKSPACE_VISIBLE_KEY};

/// Serializes all visibility operations on the widget container
pub(crate) struct VisibilityManager {
    sdk: Arc<dyn PhoneSdk>,
    surface: Arc<dyn WorkspaceSurface>,
    prefs: Arc<dyn PreferenceStore>,
    state: SharedState,
    op_lock: Mutex<()>,
    retry_attempts: u32,
    retry_interval: Duration,
}

impl VisibilityManager {
    pub(crate) fn new(
        sdk: Arc<dyn PhoneSdk>,
        surface: Arc<dyn WorkspaceSurface>,
        prefs: Arc<dyn PreferenceStore>,
        state: SharedState,
        retry_attempts: u32,
        retry_interval: Duration,
    ) -> Self {
        Self {
            sdk,
            surface,
            prefs,
            state,
            op_lock: Mutex::new(()),
            retry_attempts,
            retry_interval,
        }
    }

    /// Reveal the workspace container
    ///
    /// `for_login` bypasses the readiness warning: login must be reachable
    /// even when nothing else is ready. The container lookup is retried a
    /// bounded number of times to ride out the startup race where the host
    /// page has not mounted the element yet; giving up is logged, never
    /// raised.
    pub(crate) async fn show(&self, for_login: bool) {
        let Ok(_guard) = self.op_lock.try_lock() else {
            debug!("visibility operation already in flight, show is a no-op");
            return;
        };

        if !for_login {
            let snapshot = self.state.snapshot().await;
            if !snapshot.is_connected || !snapshot.is_workspace_ready {
                warn!(
                    phase = %snapshot.phase,
                    is_connected = snapshot.is_connected,
                    "showing workspace before the integration is fully ready"
                );
            }
        }

        let mut retries = 0;
        while !self.surface.container_present() {
            if retries >= self.retry_attempts {
                warn!(
                    retries,
                    "workspace container never appeared, giving up on show"
                );
                return;
            }
            retries += 1;
            debug!(retries, "workspace container not mounted yet, retrying");
            sleep(self.retry_interval).await;
        }

        if self.sdk.is_workspace_created() {
            if let Err(e) = self.sdk.show_workspace().await {
                warn!(error = %e, "SDK show_workspace failed, revealing container anyway");
            }
        }

        self.surface.apply_visible();
        self.surface.force_pointer_events();
        self.prefs.set(WORKSPACE_VISIBLE_KEY, "true");
        debug!(for_login, "workspace shown");
    }

    /// Conceal the workspace container
    ///
    /// Already-hidden is a no-op: no SDK call, no DOM write. The SDK-side
    /// hide only runs when the SDK reports a workspace actually exists.
    pub(crate) async fn hide(&self) {
        let Ok(_guard) = self.op_lock.try_lock() else {
            debug!("visibility operation already in flight, hide is a no-op");
            return;
        };

        if self.surface.is_hidden() {
            debug!("workspace already hidden");
            return;
        }

        if self.sdk.is_workspace_created() {
            if let Err(e) = self.sdk.hide_workspace().await {
                warn!(error = %e, "SDK hide_workspace failed, hiding container anyway");
            }
        }

        self.surface.apply_hidden();
        self.prefs.set(WORKSPACE_VISIBLE_KEY, "false");
        debug!("workspace hidden");
    }

    /// The persisted visibility preference
    pub(crate) fn preferred_visible(&self) -> bool {
        self.prefs
            .get(WORKSPACE_VISIBLE_KEY)
            .is_some_and(|v| v == "true")
    }
}
