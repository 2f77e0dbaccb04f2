//! The call integration controller
//!
//! [`AircallClient`] is the long-lived coordinator that owns the connection
//! state and drives the four cooperating pieces: environment diagnostics,
//! the initialization state machine ([`init`]), the reconnection policy
//! ([`reconnect`]) and the workspace visibility manager ([`visibility`]).
//! All SDK callbacks arrive as messages on one event stream and are
//! dispatched by a single event loop, so every state mutation happens in
//! one place.
//!
//! The client is a cheap-to-clone handle; clones share the same state.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use aircall_client_core::{AircallClient, ClientConfig};
//! use aircall_client_core::store::{MemoryPreferences, NullCallStore};
//! # use aircall_client_core::sdk::{PhoneSdk, WorkspaceSurface};
//! # use aircall_client_core::diagnostics::EnvironmentProbe;
//! # async fn example(
//! #     sdk: Arc<dyn PhoneSdk>,
//! #     surface: Arc<dyn WorkspaceSurface>,
//! #     env: Arc<dyn EnvironmentProbe>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::new("app-id", "app-token", "support.example.com");
//! let client = AircallClient::new(
//!     config,
//!     sdk,
//!     surface,
//!     env,
//!     Arc::new(MemoryPreferences::new()),
//!     Arc::new(NullCallStore),
//! )?;
//!
//! let mut events = client.subscribe_events();
//! client.start().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod reconnect;
pub mod types;

mod calls;
mod init;
mod visibility;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::diagnostics::EnvironmentProbe;
use crate::error::ClientResult;
use crate::sdk::{PhoneSdk, SdkEvent, WorkspaceSurface};
use crate::store::{CallRecordStore, PreferenceStore, OPTED_OUT_KEY};

use config::ClientConfig;
use reconnect::{ReconnectBroker, ReconnectPolicy};
use types::{ActiveCall, CallDirection, ClientEvent, ConnectionState, InitializationPhase, SharedState};
use visibility::VisibilityManager;

pub(crate) struct ClientInner {
    config: ClientConfig,
    sdk: Arc<dyn PhoneSdk>,
    env: Arc<dyn EnvironmentProbe>,
    prefs: Arc<dyn PreferenceStore>,
    call_store: Arc<dyn CallRecordStore>,
    state: SharedState,
    visibility: VisibilityManager,
    reconnect: Arc<ReconnectPolicy>,
    broker: Arc<ReconnectBroker>,
    init_attempted: AtomicBool,
    login_poll_stop: watch::Sender<bool>,
    login_poll: Mutex<Option<JoinHandle<()>>>,
    event_loop: Mutex<Option<JoinHandle<()>>>,
    call_clear: Mutex<Option<JoinHandle<()>>>,
}

/// Handle to the call integration controller
#[derive(Clone)]
pub struct AircallClient {
    pub(crate) inner: Arc<ClientInner>,
}

impl AircallClient {
    /// Build a controller from its collaborators
    ///
    /// Validates the configuration; nothing runs until
    /// [`start`](Self::start) is called.
    pub fn new(
        config: ClientConfig,
        sdk: Arc<dyn PhoneSdk>,
        surface: Arc<dyn WorkspaceSurface>,
        env: Arc<dyn EnvironmentProbe>,
        prefs: Arc<dyn PreferenceStore>,
        call_store: Arc<dyn CallRecordStore>,
    ) -> ClientResult<Self> {
        config.validate()?;

        let state = SharedState::new();
        let broker = Arc::new(ReconnectBroker::new());
        let reconnect = Arc::new(ReconnectPolicy::new(
            Arc::clone(&sdk),
            state.clone(),
            Arc::clone(&broker),
            config.reconnect_base_delay,
            config.reconnect_debounce,
            config.max_reconnect_attempts,
            config.login_grace_period,
        ));
        let visibility = VisibilityManager::new(
            Arc::clone(&sdk),
            surface,
            Arc::clone(&prefs),
            state.clone(),
            config.container_retry_attempts,
            config.container_retry_interval,
        );
        let (login_poll_stop, _) = watch::channel(false);

        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                sdk,
                env,
                prefs,
                call_store,
                state,
                visibility,
                reconnect,
                broker,
                init_attempted: AtomicBool::new(false),
                login_poll_stop,
                login_poll: Mutex::new(None),
                event_loop: Mutex::new(None),
                call_clear: Mutex::new(None),
            }),
        })
    }

    /// Start the event loop and run initialization
    ///
    /// The event loop is spawned once; repeated calls only re-enter the
    /// (itself idempotent) initialization machine, which matters after
    /// [`force_retry`](Self::force_retry).
    pub async fn start(&self) -> ClientResult<()> {
        {
            let mut guard = self.inner.event_loop.lock().await;
            if guard.is_none() {
                let client = self.clone();
                let rx = self.inner.sdk.subscribe();
                *guard = Some(tokio::spawn(async move {
                    client.run_event_loop(rx).await;
                }));
            }
        }
        self.run_initialization().await
    }

    /// Stop all background work and disconnect the SDK
    pub async fn stop(&self) {
        let _ = self.inner.login_poll_stop.send(true);
        for slot in [
            &self.inner.event_loop,
            &self.inner.login_poll,
            &self.inner.call_clear,
        ] {
            if let Some(handle) = slot.lock().await.take() {
                handle.abort();
            }
        }
        if let Err(e) = self.inner.sdk.disconnect().await {
            warn!(error = %e, "SDK disconnect failed during stop");
        }
        info!("call integration stopped");
    }

    async fn run_event_loop(&self, mut rx: broadcast::Receiver<SdkEvent>) {
        loop {
            match rx.recv().await {
                Ok(event) => self.dispatch_sdk_event(event).await,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "SDK event stream lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("SDK event stream closed, event loop exiting");
                    break;
                }
            }
        }
    }

    async fn dispatch_sdk_event(&self, event: SdkEvent) {
        match event {
            SdkEvent::LoggedIn => self.handle_login_confirmed().await,
            SdkEvent::LoggedOut => self.handle_logout().await,
            SdkEvent::IncomingCall(info) => {
                self.handle_call_started(info, CallDirection::Inbound).await;
            }
            SdkEvent::OutgoingCall(info) => {
                self.handle_call_started(info, CallDirection::Outbound).await;
            }
            SdkEvent::CallEnded(info) => self.handle_call_ended(info).await,
        }
    }

    /// Route a logout signal through the grace window and the policy
    async fn handle_logout(&self) {
        if self.inner.state.in_login_grace(Instant::now()).await {
            debug!("logout within the post-login grace window, treating as noise");
            return;
        }
        if !self.inner.state.is_connected().await {
            debug!("logout while not connected, ignoring");
            return;
        }
        warn!("SDK reported an unexpected disconnection");
        self.inner
            .state
            .mark_disconnected(Some("sdk logout".to_string()))
            .await;
        let policy = Arc::clone(&self.inner.reconnect);
        tokio::spawn(async move {
            policy.attempt_reconnect().await;
        });
    }

    /// Trigger the reconnection policy directly
    ///
    /// For cooperating subsystems that detect disconnection through their
    /// own channels. Debounced and mutex-guarded like any other trigger.
    pub async fn trigger_reconnect(&self) {
        Arc::clone(&self.inner.reconnect).attempt_reconnect().await;
    }

    /// Reveal the workspace container
    pub async fn show_workspace(&self, for_login: bool) {
        self.inner.visibility.show(for_login).await;
    }

    /// Conceal the workspace container
    pub async fn hide_workspace(&self) {
        self.inner.visibility.hide().await;
    }

    /// The persisted visibility preference
    pub fn workspace_visible_preference(&self) -> bool {
        self.inner.visibility.preferred_visible()
    }

    /// Disable the integration for the rest of the browser session
    pub fn opt_out(&self) {
        info!("integration opted out for this session");
        self.inner.prefs.session_set(OPTED_OUT_KEY, "true");
    }

    /// Whether the session-scoped opt-out is set
    pub fn is_opted_out(&self) -> bool {
        self.inner.prefs.session_get(OPTED_OUT_KEY).is_some()
    }

    /// Subscribe to controller events
    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.inner.state.subscribe()
    }

    /// Snapshot of the connection state
    pub async fn snapshot(&self) -> ConnectionState {
        self.inner.state.snapshot().await
    }

    /// Current initialization phase
    pub async fn phase(&self) -> InitializationPhase {
        self.inner.state.phase().await
    }

    /// Whether login is currently confirmed
    pub async fn is_connected(&self) -> bool {
        self.inner.state.is_connected().await
    }

    /// The call currently tracked, if any
    pub async fn current_call(&self) -> Option<ActiveCall> {
        self.inner.state.current_call().await
    }

    /// Current reconnection attempt count
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.reconnect.attempts()
    }

    /// The broker cooperating subsystems should record their own
    /// reconnection attempts through
    pub fn reconnect_broker(&self) -> Arc<ReconnectBroker> {
        Arc::clone(&self.inner.broker)
    }
}
