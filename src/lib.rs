//! # Aircall Client Coordination Library
//!
//! This library manages the lifecycle of an embedded third-party telephony
//! workspace: environment diagnostics, a one-shot initialization state
//! machine, login tracking, bounded exponential-backoff reconnection, and
//! visibility of the embedded widget container. It sits between a host
//! application and the vendor SDK, absorbing the vendor's callback-driven
//! surface into one message-driven event loop with a single source of truth
//! for connection state.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           Host Application              │
//! │        (UI, routing, business logic)    │
//! └─────────────────┬───────────────────────┘
//!                   │ subscribe_events / call actions
//! ┌─────────────────▼───────────────────────┐
//! │          aircall-client-core            │
//! │  diagnostics · init machine · reconnect │
//! │  policy · visibility manager · calls    │
//! └─────────────────┬───────────────────────┘
//!                   │ PhoneSdk / WorkspaceSurface
//! ┌─────────────────▼───────────────────────┐
//! │        Vendor telephony SDK             │
//! │     (embedded workspace widget)         │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Key design points
//!
//! - **One event loop.** SDK callbacks arrive as [`SdkEvent`] messages on a
//!   broadcast stream; a single loop dispatches them, so no callback ever
//!   mutates shared state directly.
//! - **Named state operations.** [`ConnectionState`] is only written through
//!   the operations on its owner, which enforce the invariant that the
//!   connected flag never survives entry into the `idle` or `failed` phase.
//! - **Real locks, no settle delays.** Reconnection exclusivity and
//!   visibility serialization use `try_lock` on async mutexes; an operation
//!   arriving while another runs is a logged no-op.
//! - **Graceful degradation.** Blocked environments get a remediation
//!   notice; unclassified initialization failures still offer a login
//!   attempt rather than failing closed.
//!
//! ## Usage
//!
//! See [`AircallClient`] for a complete example.

pub mod client;
pub mod diagnostics;
pub mod error;
pub mod sdk;
pub mod store;

pub use client::config::ClientConfig;
pub use client::reconnect::{backoff_delay, ReconnectBroker};
pub use client::types::{
    ActiveCall, CallDirection, CallStatus, ClientEvent, ConnectionState, InitializationPhase,
};
pub use client::AircallClient;
pub use diagnostics::{
    classify_browser, run_diagnostics, BrowserCompatibility, CookieSupport, DiagnosticIssue,
    DiagnosticsReport, EnvironmentProbe,
};
pub use error::{ClientError, ClientResult, InitFailureKind};
pub use sdk::{PhoneSdk, SdkCallInfo, SdkConfig, SdkEvent, WorkspaceSurface};
pub use store::{
    CallRecordStore, CallRow, MemoryPreferences, NullCallStore, PreferenceStore,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
