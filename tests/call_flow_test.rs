//! Integration tests for call tracking, mirroring and call actions

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use aircall_client_core::store::MemoryPreferences;
use aircall_client_core::{
    AircallClient, CallDirection, CallStatus, ClientError, SdkEvent,
};

use common::{
    call_info, test_config, MockEnvironment, MockSdk, MockSurface, RecordingCallStore,
};

struct CallHarness {
    client: AircallClient,
    sdk: Arc<MockSdk>,
    store: Arc<RecordingCallStore>,
}

impl CallHarness {
    fn new() -> Self {
        let sdk = MockSdk::new();
        let store = Arc::new(RecordingCallStore::default());
        let client = AircallClient::new(
            test_config(),
            sdk.clone(),
            MockSurface::mounted(),
            MockEnvironment::supported(),
            Arc::new(MemoryPreferences::new()),
            store.clone(),
        )
        .expect("valid test configuration");
        Self { client, sdk, store }
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

#[tokio::test(start_paused = true)]
async fn incoming_call_is_tracked_and_mirrored() {
    let h = CallHarness::new();
    h.client.start().await.unwrap();

    h.sdk.emit(SdkEvent::IncomingCall(call_info("call-1")));
    settle().await;

    let call = h.client.current_call().await.expect("call tracked");
    assert_eq!(call.id, "call-1");
    assert_eq!(call.direction, CallDirection::Inbound);
    assert_eq!(call.status, CallStatus::Ringing);

    let inserted = h.store.inserted.lock().unwrap();
    assert_eq!(inserted.len(), 1);
    assert_eq!(inserted[0].external_id, "call-1");
    assert_eq!(inserted[0].direction, CallDirection::Inbound);
    assert!(inserted[0].ended_at.is_none());
}

#[tokio::test(start_paused = true)]
async fn ended_call_lingers_then_clears() {
    let h = CallHarness::new();
    h.client.start().await.unwrap();

    h.sdk.emit(SdkEvent::OutgoingCall(call_info("call-2")));
    settle().await;
    h.sdk.emit(SdkEvent::CallEnded(call_info("call-2")));
    settle().await;

    // the ended call is still visible for the wrap-up window
    let call = h.client.current_call().await.expect("call still tracked");
    assert_eq!(call.status, CallStatus::Ended);

    let updates = h.store.status_updates.lock().unwrap().clone();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].0, "call-2");
    assert_eq!(updates[0].1, CallStatus::Ended);
    assert!(updates[0].2.is_some());

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert!(h.client.current_call().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn new_call_survives_the_previous_clear_delay() {
    let h = CallHarness::new();
    h.client.start().await.unwrap();

    h.sdk.emit(SdkEvent::IncomingCall(call_info("call-3")));
    settle().await;
    h.sdk.emit(SdkEvent::CallEnded(call_info("call-3")));
    settle().await;

    // a new call arrives before the old one's clear delay elapses
    h.sdk.emit(SdkEvent::IncomingCall(call_info("call-4")));
    settle().await;
    tokio::time::sleep(Duration::from_secs(10)).await;

    let call = h.client.current_call().await.expect("new call tracked");
    assert_eq!(call.id, "call-4");
}

#[tokio::test(start_paused = true)]
async fn ending_an_untracked_call_changes_nothing() {
    let h = CallHarness::new();
    h.client.start().await.unwrap();

    h.sdk.emit(SdkEvent::IncomingCall(call_info("call-5")));
    settle().await;
    h.sdk.emit(SdkEvent::CallEnded(call_info("call-other")));
    settle().await;

    let call = h.client.current_call().await.expect("call still tracked");
    assert_eq!(call.id, "call-5");
    assert_eq!(call.status, CallStatus::Ringing);
}

#[tokio::test(start_paused = true)]
async fn call_actions_require_a_tracked_call() {
    let h = CallHarness::new();
    h.client.start().await.unwrap();

    assert!(matches!(
        h.client.answer_call().await,
        Err(ClientError::NoActiveCall)
    ));
    assert!(matches!(
        h.client.hangup_call().await,
        Err(ClientError::NoActiveCall)
    ));

    h.sdk.emit(SdkEvent::IncomingCall(call_info("call-6")));
    settle().await;

    h.client.answer_call().await.unwrap();
    assert_eq!(h.sdk.answer_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn dialing_an_empty_number_is_rejected() {
    let h = CallHarness::new();
    h.client.start().await.unwrap();

    assert!(matches!(
        h.client.dial_number("   ").await,
        Err(ClientError::InvalidConfiguration { field, .. }) if field == "phone_number"
    ));

    h.client.dial_number("+15550300").await.unwrap();
    assert_eq!(h.sdk.dial_calls.load(Ordering::SeqCst), 1);
}
