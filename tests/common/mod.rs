//! Shared test doubles for the integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use aircall_client_core::diagnostics::{CookieSupport, EnvironmentProbe};
use aircall_client_core::sdk::{PhoneSdk, SdkCallInfo, SdkConfig, SdkEvent, WorkspaceSurface};
use aircall_client_core::store::{CallRecordStore, CallRow, MemoryPreferences, NullCallStore};
use aircall_client_core::{AircallClient, CallStatus, ClientConfig, ClientError, ClientResult};

pub const CHROME_UA: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                             (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Scriptable vendor SDK double
///
/// Flags control what the getters report; counters record every controller
/// interaction so tests can assert on exact call counts. Events are injected
/// through the same broadcast channel the controller subscribes to.
pub struct MockSdk {
    events: broadcast::Sender<SdkEvent>,
    init_error: Mutex<Option<ClientError>>,
    workspace_created: AtomicBool,
    ready: AtomicBool,
    logged_in: AtomicBool,
    pub init_calls: AtomicU32,
    pub ready_probes: AtomicU32,
    pub show_calls: AtomicU32,
    pub hide_calls: AtomicU32,
    pub clear_login_calls: AtomicU32,
    pub answer_calls: AtomicU32,
    pub dial_calls: AtomicU32,
}

impl MockSdk {
    pub fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            events,
            init_error: Mutex::new(None),
            workspace_created: AtomicBool::new(false),
            ready: AtomicBool::new(false),
            logged_in: AtomicBool::new(false),
            init_calls: AtomicU32::new(0),
            ready_probes: AtomicU32::new(0),
            show_calls: AtomicU32::new(0),
            hide_calls: AtomicU32::new(0),
            clear_login_calls: AtomicU32::new(0),
            answer_calls: AtomicU32::new(0),
            dial_calls: AtomicU32::new(0),
        })
    }

    /// Make every `initialize` call fail with the given error
    pub fn fail_init(&self, error: ClientError) {
        *self.init_error.lock().unwrap() = Some(error);
    }

    pub fn set_logged_in(&self, logged_in: bool) {
        self.logged_in.store(logged_in, Ordering::SeqCst);
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn set_workspace_created(&self, created: bool) {
        self.workspace_created.store(created, Ordering::SeqCst);
    }

    /// Inject an SDK event as if the vendor library raised it
    pub fn emit(&self, event: SdkEvent) {
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl PhoneSdk for MockSdk {
    async fn initialize(&self, _config: SdkConfig) -> ClientResult<()> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.init_error.lock().unwrap().clone() {
            return Err(error);
        }
        self.workspace_created.store(true, Ordering::SeqCst);
        self.ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_workspace_created(&self) -> bool {
        self.workspace_created.load(Ordering::SeqCst)
    }

    fn is_ready(&self) -> bool {
        self.ready_probes.fetch_add(1, Ordering::SeqCst);
        self.ready.load(Ordering::SeqCst)
    }

    fn login_status(&self) -> bool {
        self.logged_in.load(Ordering::SeqCst)
    }

    fn set_login_status(&self, logged_in: bool) {
        self.logged_in.store(logged_in, Ordering::SeqCst);
    }

    fn clear_login_status(&self) {
        self.clear_login_calls.fetch_add(1, Ordering::SeqCst);
        self.logged_in.store(false, Ordering::SeqCst);
    }

    async fn show_workspace(&self) -> ClientResult<()> {
        self.show_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn hide_workspace(&self) -> ClientResult<()> {
        self.hide_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> ClientResult<()> {
        Ok(())
    }

    async fn answer_call(&self) -> ClientResult<()> {
        self.answer_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn reject_call(&self) -> ClientResult<()> {
        Ok(())
    }

    async fn hang_up(&self) -> ClientResult<()> {
        Ok(())
    }

    async fn dial_number(&self, _phone_number: &str) -> ClientResult<()> {
        self.dial_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<SdkEvent> {
        self.events.subscribe()
    }
}

/// Container double with a scriptable mount delay
///
/// `present_after` is how many lookups return absent before the container
/// is considered mounted; `u32::MAX` means it never mounts.
pub struct MockSurface {
    present_after: u32,
    hidden: AtomicBool,
    pub lookups: AtomicU32,
    pub visible_applied: AtomicU32,
    pub hidden_applied: AtomicU32,
    pub pointer_forced: AtomicU32,
}

impl MockSurface {
    pub fn mounted() -> Arc<Self> {
        Self::mounting_after(0)
    }

    pub fn mounting_after(lookups: u32) -> Arc<Self> {
        Arc::new(Self {
            present_after: lookups,
            hidden: AtomicBool::new(true),
            lookups: AtomicU32::new(0),
            visible_applied: AtomicU32::new(0),
            hidden_applied: AtomicU32::new(0),
            pointer_forced: AtomicU32::new(0),
        })
    }

    pub fn set_hidden(&self, hidden: bool) {
        self.hidden.store(hidden, Ordering::SeqCst);
    }
}

impl WorkspaceSurface for MockSurface {
    fn container_present(&self) -> bool {
        let lookup = self.lookups.fetch_add(1, Ordering::SeqCst) + 1;
        lookup > self.present_after
    }

    fn apply_visible(&self) {
        self.visible_applied.fetch_add(1, Ordering::SeqCst);
        self.hidden.store(false, Ordering::SeqCst);
    }

    fn apply_hidden(&self) {
        self.hidden_applied.fetch_add(1, Ordering::SeqCst);
        self.hidden.store(true, Ordering::SeqCst);
    }

    fn is_hidden(&self) -> bool {
        self.hidden.load(Ordering::SeqCst)
    }

    fn force_pointer_events(&self) {
        self.pointer_forced.fetch_add(1, Ordering::SeqCst);
    }
}

/// Environment double with fixed probe answers
pub struct MockEnvironment {
    pub cookies: bool,
    pub user_agent: &'static str,
}

impl MockEnvironment {
    pub fn supported() -> Arc<Self> {
        Arc::new(Self {
            cookies: true,
            user_agent: CHROME_UA,
        })
    }

    pub fn cookies_blocked() -> Arc<Self> {
        Arc::new(Self {
            cookies: false,
            user_agent: CHROME_UA,
        })
    }
}

#[async_trait]
impl EnvironmentProbe for MockEnvironment {
    async fn third_party_cookies(&self) -> CookieSupport {
        CookieSupport {
            supported: self.cookies,
            method: "mock".to_string(),
            details: None,
        }
    }

    fn user_agent(&self) -> String {
        self.user_agent.to_string()
    }
}

/// Call record store that captures everything it is handed
#[derive(Default)]
pub struct RecordingCallStore {
    pub inserted: Mutex<Vec<CallRow>>,
    pub status_updates: Mutex<Vec<(String, CallStatus, Option<DateTime<Utc>>)>>,
}

#[async_trait]
impl CallRecordStore for RecordingCallStore {
    async fn insert(&self, row: CallRow) -> anyhow::Result<()> {
        self.inserted.lock().unwrap().push(row);
        Ok(())
    }

    async fn update_status(
        &self,
        external_id: &str,
        status: CallStatus,
        ended_at: Option<DateTime<Utc>>,
    ) -> anyhow::Result<()> {
        self.status_updates
            .lock()
            .unwrap()
            .push((external_id.to_string(), status, ended_at));
        Ok(())
    }
}

pub fn test_config() -> ClientConfig {
    ClientConfig::new("app-id", "app-token", "support.example.com")
}

pub fn call_info(id: &str) -> SdkCallInfo {
    SdkCallInfo {
        id: id.to_string(),
        from: "+15550100".to_string(),
        to: "+15550200".to_string(),
    }
}

/// Everything a test needs to poke at the controller and its doubles
pub struct Harness {
    pub client: AircallClient,
    pub sdk: Arc<MockSdk>,
    pub surface: Arc<MockSurface>,
    pub prefs: Arc<MemoryPreferences>,
}

impl Harness {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_parts(config, MockSdk::new(), MockSurface::mounted(), MockEnvironment::supported())
    }

    pub fn with_parts(
        config: ClientConfig,
        sdk: Arc<MockSdk>,
        surface: Arc<MockSurface>,
        env: Arc<MockEnvironment>,
    ) -> Self {
        let prefs = Arc::new(MemoryPreferences::new());
        let client = AircallClient::new(
            config,
            sdk.clone(),
            surface.clone(),
            env,
            prefs.clone(),
            Arc::new(NullCallStore),
        )
        .expect("valid test configuration");
        Self {
            client,
            sdk,
            surface,
            prefs,
        }
    }
}
