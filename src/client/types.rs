//! Type definitions for the call integration controller
//!
//! The central piece is [`ConnectionState`]: the single process-wide record
//! of what the integration is doing. It is owned by [`SharedState`] and only
//! mutated through the named operations defined there - no other code path
//! writes the fields directly. Every mutation that changes an observable
//! condition emits a [`ClientEvent`] on the broadcast channel so the rest of
//! the application can react without polling.
//!
//! # Examples
//!
//! ```rust
//! use aircall_client_core::client::types::InitializationPhase;
//!
//! let phase = InitializationPhase::CreatingWorkspace;
//! assert_eq!(phase.to_string(), "creating-workspace");
//! assert!(!phase.is_terminal());
//! assert!(InitializationPhase::Failed.is_terminal());
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio::time::Instant;
use tracing::debug;

use crate::diagnostics::DiagnosticIssue;

/// Discrete state of the initialization state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InitializationPhase {
    /// Nothing has happened yet
    Idle,
    /// Environment diagnostics are running
    Diagnostics,
    /// The SDK `initialize` call is in flight
    CreatingWorkspace,
    /// The SDK created its embedded widget
    WorkspaceReady,
    /// A confirmed login is being processed
    LoggingIn,
    /// The SDK confirmed login
    LoggedIn,
    /// The workspace is up but the user must log in
    NeedsLogin,
    /// Initialization failed terminally for this session
    Failed,
}

impl InitializationPhase {
    /// Whether this phase ends the state machine for the session
    pub fn is_terminal(&self) -> bool {
        matches!(self, InitializationPhase::Failed)
    }
}

impl std::fmt::Display for InitializationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            InitializationPhase::Idle => "idle",
            InitializationPhase::Diagnostics => "diagnostics",
            InitializationPhase::CreatingWorkspace => "creating-workspace",
            InitializationPhase::WorkspaceReady => "workspace-ready",
            InitializationPhase::LoggingIn => "logging-in",
            InitializationPhase::LoggedIn => "logged-in",
            InitializationPhase::NeedsLogin => "needs-login",
            InitializationPhase::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// Direction of a tracked call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallDirection {
    /// Call received by the workspace
    Inbound,
    /// Call placed from the workspace
    Outbound,
}

/// Status of a tracked call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    /// Ringing or dialing
    Ringing,
    /// Connected and in progress
    Ongoing,
    /// Finished
    Ended,
}

/// The single call the controller tracks at a time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveCall {
    /// Vendor-assigned call identifier
    pub id: String,
    /// Direction of the call
    pub direction: CallDirection,
    /// Originating phone number
    pub from: String,
    /// Destination phone number
    pub to: String,
    /// Current status
    pub status: CallStatus,
}

/// Process-wide connection state, one instance per application lifetime
///
/// Invariant: `is_connected` is never true while `phase` is
/// [`InitializationPhase::Failed`] or [`InitializationPhase::Idle`]. The
/// named operations on [`SharedState`] enforce this; there is no other
/// write path.
#[derive(Debug, Clone)]
pub struct ConnectionState {
    /// Current phase of the initialization state machine
    pub phase: InitializationPhase,
    /// True only once the SDK has confirmed login
    pub is_connected: bool,
    /// True once the SDK has created its embedded widget; independent of
    /// login state
    pub is_workspace_ready: bool,
    /// Issues found by environment diagnostics, immutable once set
    pub diagnostic_issues: Vec<DiagnosticIssue>,
    /// The call currently tracked, if any
    pub current_call: Option<ActiveCall>,
    /// Deadline until which logout events are treated as noise
    pub login_grace_until: Option<Instant>,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self {
            phase: InitializationPhase::Idle,
            is_connected: false,
            is_workspace_ready: false,
            diagnostic_issues: Vec::new(),
            current_call: None,
            login_grace_until: None,
        }
    }
}

/// Events emitted by the controller for the application to consume
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// The initialization phase changed
    PhaseChanged {
        /// Phase before the transition
        previous: InitializationPhase,
        /// Phase after the transition
        current: InitializationPhase,
    },
    /// Environment diagnostics finished
    DiagnosticsCompleted {
        /// Issues found, advisory ones included
        issues: Vec<DiagnosticIssue>,
    },
    /// The SDK confirmed login
    Connected,
    /// The SDK reported a real (non-grace) disconnection
    Disconnected {
        /// Reason, when one is known
        reason: Option<String>,
    },
    /// Initialization was blocked by the environment
    Blocked {
        /// What went wrong
        reason: String,
        /// Concrete steps the user can take
        remediation: String,
    },
    /// The user must log in through the workspace
    LoginRequired {
        /// Underlying failure, when login was triggered by one
        reason: Option<String>,
    },
    /// Initialization failed for a reason that is not the environment
    FatalError {
        /// What went wrong
        reason: String,
        /// Concrete steps the user can take
        remediation: String,
    },
    /// Automatic reconnection gave up
    ReconnectExhausted {
        /// Attempts made before giving up
        attempts: u32,
        /// Concrete steps the user can take
        remediation: String,
    },
    /// A call started ringing or dialing
    CallStarted(ActiveCall),
    /// The tracked call ended
    CallEnded(ActiveCall),
    /// A message the UI should show the user
    UserPrompt {
        /// The message text
        message: String,
    },
}

/// Owner of the shared [`ConnectionState`]
///
/// Cloning is cheap; all clones observe the same state and the same event
/// channel.
#[derive(Clone)]
pub struct SharedState {
    inner: Arc<RwLock<ConnectionState>>,
    events: broadcast::Sender<ClientEvent>,
}

impl SharedState {
    /// Create a fresh state in the `idle` phase
    pub(crate) fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(RwLock::new(ConnectionState::default())),
            events,
        }
    }

    /// Subscribe to controller events
    pub(crate) fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// Emit an event, ignoring the no-subscriber case
    pub(crate) fn emit(&self, event: ClientEvent) {
        let _ = self.events.send(event);
    }

    /// Snapshot of the current state
    pub(crate) async fn snapshot(&self) -> ConnectionState {
        self.inner.read().await.clone()
    }

    /// Current phase
    pub(crate) async fn phase(&self) -> InitializationPhase {
        self.inner.read().await.phase
    }

    /// Whether login is currently confirmed
    pub(crate) async fn is_connected(&self) -> bool {
        self.inner.read().await.is_connected
    }

    /// Transition to a new phase
    ///
    /// Entering `idle` or `failed` drops the connected flag, keeping the
    /// state invariant without relying on callers.
    pub(crate) async fn set_phase(&self, phase: InitializationPhase) {
        let previous = {
            let mut state = self.inner.write().await;
            let previous = state.phase;
            state.phase = phase;
            if matches!(
                phase,
                InitializationPhase::Idle | InitializationPhase::Failed
            ) {
                state.is_connected = false;
            }
            previous
        };
        if previous != phase {
            debug!(from = %previous, to = %phase, "phase transition");
            self.emit(ClientEvent::PhaseChanged {
                previous,
                current: phase,
            });
        }
    }

    /// Record the diagnostics outcome
    pub(crate) async fn set_diagnostics(&self, issues: Vec<DiagnosticIssue>) {
        self.inner.write().await.diagnostic_issues = issues.clone();
        self.emit(ClientEvent::DiagnosticsCompleted { issues });
    }

    /// Mark the embedded widget as created
    pub(crate) async fn mark_workspace_ready(&self) {
        self.inner.write().await.is_workspace_ready = true;
        self.set_phase(InitializationPhase::WorkspaceReady).await;
    }

    /// Atomically claim the login-confirmation path
    ///
    /// Returns false when login is already confirmed or another
    /// confirmation already holds the `logging-in` phase. The SDK login
    /// event and the login poll can both observe the same login; the claim
    /// collapses them into one confirmation.
    pub(crate) async fn begin_login(&self) -> bool {
        let previous = {
            let mut state = self.inner.write().await;
            if state.is_connected || state.phase == InitializationPhase::LoggingIn {
                return false;
            }
            let previous = state.phase;
            state.phase = InitializationPhase::LoggingIn;
            previous
        };
        debug!(from = %previous, to = %InitializationPhase::LoggingIn, "phase transition");
        self.emit(ClientEvent::PhaseChanged {
            previous,
            current: InitializationPhase::LoggingIn,
        });
        true
    }

    /// Record a confirmed login
    pub(crate) async fn mark_connected(&self) {
        {
            let mut state = self.inner.write().await;
            state.is_connected = true;
            state.is_workspace_ready = true;
        }
        self.set_phase(InitializationPhase::LoggedIn).await;
    }

    /// Record a real disconnection; the phase is left alone so the
    /// reconnection policy can restore it silently
    pub(crate) async fn mark_disconnected(&self, reason: Option<String>) {
        self.inner.write().await.is_connected = false;
        self.emit(ClientEvent::Disconnected { reason });
    }

    /// Enter the terminal failed state
    pub(crate) async fn mark_failed(&self) {
        self.set_phase(InitializationPhase::Failed).await;
    }

    /// Reset to `idle` for a forced retry
    pub(crate) async fn reset_to_idle(&self) {
        {
            let mut state = self.inner.write().await;
            state.is_connected = false;
            state.is_workspace_ready = false;
            state.login_grace_until = None;
        }
        self.set_phase(InitializationPhase::Idle).await;
    }

    /// Start the post-login grace window
    pub(crate) async fn begin_login_grace(&self, until: Instant) {
        self.inner.write().await.login_grace_until = Some(until);
    }

    /// Whether a logout at `now` falls inside the grace window
    pub(crate) async fn in_login_grace(&self, now: Instant) -> bool {
        self.inner
            .read()
            .await
            .login_grace_until
            .is_some_and(|until| now < until)
    }

    /// Replace the tracked call
    pub(crate) async fn set_current_call(&self, call: ActiveCall) {
        self.inner.write().await.current_call = Some(call);
    }

    /// Current tracked call, if any
    pub(crate) async fn current_call(&self) -> Option<ActiveCall> {
        self.inner.read().await.current_call.clone()
    }

    /// Clear the tracked call, but only if it is still the given one
    ///
    /// A new call may have replaced the ended one while the grace delay ran.
    pub(crate) async fn clear_current_call(&self, call_id: &str) {
        let mut state = self.inner.write().await;
        if state
            .current_call
            .as_ref()
            .is_some_and(|call| call.id == call_id)
        {
            state.current_call = None;
        }
    }
}
