//! Persisted preferences and the external call record mirror
//!
//! Two storage collaborators live behind traits here:
//!
//! - [`PreferenceStore`] - browser-local string key/value storage with a
//!   persistent scope (survives reload) and a session scope (cleared when
//!   the tab closes). Writes are fire-and-forget, last-write-wins.
//! - [`CallRecordStore`] - the remote `calls` record set that call
//!   lifecycle events are mirrored into for downstream reporting. Mirroring
//!   is best-effort: failures are logged by the caller and never affect the
//!   controller's own correctness, which is why the trait surfaces opaque
//!   [`anyhow::Error`]s instead of typed ones.
//!
//! # Examples
//!
//! ```rust
//! use aircall_client_core::store::{MemoryPreferences, PreferenceStore, WORKSPACE_VISIBLE_KEY};
//!
//! let prefs = MemoryPreferences::new();
//! prefs.set(WORKSPACE_VISIBLE_KEY, "true");
//! assert_eq!(prefs.get(WORKSPACE_VISIBLE_KEY).as_deref(), Some("true"));
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::client::types::{CallDirection, CallStatus};

/// Persisted workspace visibility preference, `"true"` or `"false"`
pub const WORKSPACE_VISIBLE_KEY: &str = "aircall_workspace_visible";
/// Millisecond timestamp of the last confirmed login
pub const CONNECTION_TIMESTAMP_KEY: &str = "aircall_connection_timestamp";
/// Count of connection attempts since the last confirmed login
pub const CONNECTION_ATTEMPTS_KEY: &str = "aircall_connection_attempts";
/// Session-scoped opt-out marker; presence disables the integration
pub const OPTED_OUT_KEY: &str = "aircall_opted_out";

/// Browser-local key/value storage
///
/// Persistent methods map to storage that survives reload; `session_*`
/// methods map to storage scoped to the current browser session. All
/// operations are infallible by contract - storage failures on the host
/// side are swallowed there, matching last-write-wins semantics.
pub trait PreferenceStore: Send + Sync {
    /// Read a persistent value
    fn get(&self, key: &str) -> Option<String>;
    /// Write a persistent value
    fn set(&self, key: &str, value: &str);
    /// Remove a persistent value
    fn remove(&self, key: &str);
    /// Read a session-scoped value
    fn session_get(&self, key: &str) -> Option<String>;
    /// Write a session-scoped value
    fn session_set(&self, key: &str, value: &str);
    /// Remove a session-scoped value
    fn session_remove(&self, key: &str);
}

/// In-memory [`PreferenceStore`] backed by concurrent maps
///
/// The default store for tests and embedded use where no real browser
/// storage exists.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    local: DashMap<String, String>,
    session: DashMap<String, String>,
}

impl MemoryPreferences {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.local.get(key).map(|v| v.clone())
    }

    fn set(&self, key: &str, value: &str) {
        self.local.insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.local.remove(key);
    }

    fn session_get(&self, key: &str) -> Option<String> {
        self.session.get(key).map(|v| v.clone())
    }

    fn session_set(&self, key: &str, value: &str) {
        self.session.insert(key.to_string(), value.to_string());
    }

    fn session_remove(&self, key: &str) {
        self.session.remove(key);
    }
}

/// Record the moment of a confirmed login and reset the attempt count
pub fn record_connection(store: &dyn PreferenceStore, now: DateTime<Utc>) {
    store.set(CONNECTION_TIMESTAMP_KEY, &now.timestamp_millis().to_string());
    store.set(CONNECTION_ATTEMPTS_KEY, "0");
}

/// Bump the persisted connection attempt count
pub fn bump_connection_attempts(store: &dyn PreferenceStore) {
    let attempts = store
        .get(CONNECTION_ATTEMPTS_KEY)
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(0);
    store.set(CONNECTION_ATTEMPTS_KEY, &(attempts + 1).to_string());
}

/// Whether the last confirmed login is recent enough to trust
///
/// When true, the cached SDK login status is left intact instead of forcing
/// a fresh login. Unparseable or missing timestamps count as not recent.
pub fn connection_is_recent(store: &dyn PreferenceStore, ttl: Duration, now: DateTime<Utc>) -> bool {
    let Some(raw) = store.get(CONNECTION_TIMESTAMP_KEY) else {
        return false;
    };
    let Ok(millis) = raw.parse::<i64>() else {
        return false;
    };
    let Some(then) = DateTime::<Utc>::from_timestamp_millis(millis) else {
        return false;
    };
    now.signed_duration_since(then).num_milliseconds() >= 0
        && (now.signed_duration_since(then).num_milliseconds() as u128) < ttl.as_millis()
}

/// A row in the remote `calls` record set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRow {
    /// Row identifier assigned by the controller
    pub id: Uuid,
    /// Vendor-assigned call identifier
    pub external_id: String,
    /// Organization the call belongs to, when known
    pub organization_id: Option<Uuid>,
    /// Call direction
    pub direction: CallDirection,
    /// Current call status
    pub status: CallStatus,
    /// Originating phone number
    pub from_number: String,
    /// Destination phone number
    pub to_number: String,
    /// When the call started
    pub started_at: DateTime<Utc>,
    /// When the call ended, once it has
    pub ended_at: Option<DateTime<Utc>>,
    /// Opaque vendor metadata blob
    pub metadata: serde_json::Value,
}

/// The remote record set call lifecycle events are mirrored into
#[async_trait]
pub trait CallRecordStore: Send + Sync {
    /// Insert a freshly started call
    async fn insert(&self, row: CallRow) -> anyhow::Result<()>;

    /// Update the status of a call identified by its vendor id
    async fn update_status(
        &self,
        external_id: &str,
        status: CallStatus,
        ended_at: Option<DateTime<Utc>>,
    ) -> anyhow::Result<()>;
}

/// A [`CallRecordStore`] that discards everything
///
/// Used when no reporting backend is configured.
///
/// # Examples
///
/// ```rust
/// use aircall_client_core::store::{CallRecordStore, NullCallStore};
/// use aircall_client_core::CallStatus;
///
/// let store = NullCallStore;
/// tokio_test::block_on(async {
///     store
///         .update_status("call-1", CallStatus::Ended, None)
///         .await
///         .unwrap();
/// });
/// ```
#[derive(Debug, Default)]
pub struct NullCallStore;

#[async_trait]
impl CallRecordStore for NullCallStore {
    async fn insert(&self, _row: CallRow) -> anyhow::Result<()> {
        Ok(())
    }

    async fn update_status(
        &self,
        _external_id: &str,
        _status: CallStatus,
        _ended_at: Option<DateTime<Utc>>,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}
