//! Boundary traits for the vendor telephony SDK and its host page
//!
//! The embedded call workspace is driven by a vendor-controlled client
//! library. The controller never talks to it directly; everything goes
//! through [`PhoneSdk`], which mirrors the vendor surface one-to-one:
//! asynchronous `initialize`, synchronous status getters, workspace
//! show/hide, and the four call actions. SDK callbacks are modelled as a
//! broadcast stream of [`SdkEvent`] messages so the controller's event loop
//! owns all state mutation and no callback ever closes over mutable state.
//!
//! [`WorkspaceSurface`] is the second seam: the container element the vendor
//! widget is mounted into. It exists so visibility logic can be tested
//! without a real page, and so the controller never reaches into the
//! document on its own.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::ClientResult;

/// Credentials and tenant settings passed to the vendor SDK
///
/// # Examples
///
/// ```rust
/// use aircall_client_core::sdk::SdkConfig;
///
/// let config = SdkConfig {
///     api_id: "app-id".to_string(),
///     api_token: "app-token".to_string(),
///     domain_name: "support.example.com".to_string(),
/// };
/// assert_eq!(config.domain_name, "support.example.com");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdkConfig {
    /// Vendor API identifier
    pub api_id: String,
    /// Vendor API token
    pub api_token: String,
    /// Tenant domain the workspace is embedded under
    pub domain_name: String,
}

/// Call details carried on SDK call events
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkCallInfo {
    /// Vendor-assigned call identifier
    pub id: String,
    /// Originating phone number
    pub from: String,
    /// Destination phone number
    pub to: String,
}

/// Events emitted by the vendor SDK
///
/// Delivered over a broadcast channel obtained from
/// [`PhoneSdk::subscribe`]. Login and logout carry no payload; call events
/// carry the vendor's call record.
#[derive(Debug, Clone)]
pub enum SdkEvent {
    /// An inbound call started ringing
    IncomingCall(SdkCallInfo),
    /// An outbound call was placed from the workspace
    OutgoingCall(SdkCallInfo),
    /// The tracked call ended
    CallEnded(SdkCallInfo),
    /// The SDK confirmed a completed login
    LoggedIn,
    /// The SDK reported a logout or lost session
    LoggedOut,
}

/// The opaque vendor telephony SDK
///
/// Implementations wrap the vendor's embedded client library. Every method
/// that reaches the vendor's servers is async and may fail; the synchronous
/// getters reflect cached local state only. The controller does not retry
/// call actions - their failures are converted into a user prompt to use
/// the embedded widget UI directly.
#[async_trait]
pub trait PhoneSdk: Send + Sync {
    /// Create the embedded workspace and connect to the vendor backend
    async fn initialize(&self, config: SdkConfig) -> ClientResult<()>;

    /// Whether the SDK has created its embedded widget
    fn is_workspace_created(&self) -> bool;

    /// Whether the SDK considers itself operational
    fn is_ready(&self) -> bool;

    /// Cached login state as last reported by the SDK
    fn login_status(&self) -> bool;

    /// Overwrite the cached login state
    fn set_login_status(&self, logged_in: bool);

    /// Drop any cached login state, forcing a fresh login
    fn clear_login_status(&self);

    /// Ask the SDK to reveal its workspace UI
    async fn show_workspace(&self) -> ClientResult<()>;

    /// Ask the SDK to conceal its workspace UI
    async fn hide_workspace(&self) -> ClientResult<()>;

    /// Tear down the SDK connection
    async fn disconnect(&self) -> ClientResult<()>;

    /// Answer the ringing call
    async fn answer_call(&self) -> ClientResult<()>;

    /// Reject the ringing call
    async fn reject_call(&self) -> ClientResult<()>;

    /// Hang up the call in progress
    async fn hang_up(&self) -> ClientResult<()>;

    /// Place an outbound call
    async fn dial_number(&self, phone_number: &str) -> ClientResult<()>;

    /// Subscribe to the SDK event stream
    fn subscribe(&self) -> broadcast::Receiver<SdkEvent>;
}

/// The container element the vendor widget is mounted into
///
/// All DOM interaction for visibility goes through this trait. Methods are
/// synchronous because the underlying operations are plain class/style
/// mutations on a single element.
pub trait WorkspaceSurface: Send + Sync {
    /// Whether the container element currently exists in the page
    ///
    /// Can be false briefly at startup while the host page is still
    /// mounting; the visibility manager retries around this.
    fn container_present(&self) -> bool;

    /// Swap the container to its visible styling
    fn apply_visible(&self);

    /// Swap the container to its hidden styling
    fn apply_hidden(&self);

    /// Whether the container currently carries the hidden styling
    fn is_hidden(&self) -> bool;

    /// Re-enable pointer events on the container
    ///
    /// Stale inline styles can leave the container visible but inert, so
    /// pointer events are forced on after every show.
    fn force_pointer_events(&self);
}
