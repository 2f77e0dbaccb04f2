//! Call tracking and call-control operations
//!
//! The controller tracks exactly one call at a time. Call lifecycle events
//! from the SDK update the tracked call and are mirrored best-effort into
//! the external call record set; mirror failures are logged and dropped,
//! never propagated - the mirror exists for downstream reporting, not for
//! the controller's correctness.
//!
//! Call-control actions (`answer`, `reject`, `hang up`, `dial`) are thin
//! wrappers over the SDK. They are not retried: when one fails the user is
//! prompted to use the embedded widget's own controls, and the connection
//! state is left untouched.

use chrono::Utc;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::types::{ActiveCall, CallDirection, CallStatus, ClientEvent};
use crate::client::AircallClient;
use crate::error::{ClientError, ClientResult};
use crate::sdk::SdkCallInfo;
use crate::store::CallRow;

impl AircallClient {
    /// Track a newly started call and mirror it
    pub(crate) async fn handle_call_started(&self, info: SdkCallInfo, direction: CallDirection) {
        if let Some(handle) = self.inner.call_clear.lock().await.take() {
            handle.abort();
        }

        let call = ActiveCall {
            id: info.id.clone(),
            direction,
            from: info.from.clone(),
            to: info.to.clone(),
            status: CallStatus::Ringing,
        };
        info!(call_id = %call.id, direction = ?direction, "call started");
        self.inner.state.set_current_call(call.clone()).await;
        self.inner.state.emit(ClientEvent::CallStarted(call));

        let row = CallRow {
            id: Uuid::new_v4(),
            external_id: info.id,
            organization_id: None,
            direction,
            status: CallStatus::Ringing,
            from_number: info.from,
            to_number: info.to,
            started_at: Utc::now(),
            ended_at: None,
            metadata: serde_json::json!({ "source": "sdk" }),
        };
        if let Err(e) = self.inner.call_store.insert(row).await {
            warn!(error = %e, "failed to mirror call start");
        }
    }

    /// Mark the tracked call ended and schedule its removal
    ///
    /// The tracked call lingers for a fixed grace delay after ending so the
    /// UI can render the wrap-up, then clears itself unless a new call has
    /// replaced it in the meantime.
    pub(crate) async fn handle_call_ended(&self, info: SdkCallInfo) {
        let ended_at = Utc::now();
        if let Err(e) = self
            .inner
            .call_store
            .update_status(&info.id, CallStatus::Ended, Some(ended_at))
            .await
        {
            warn!(error = %e, "failed to mirror call end");
        }

        let Some(mut call) = self.inner.state.current_call().await else {
            debug!(call_id = %info.id, "call ended but none was tracked");
            return;
        };
        if call.id != info.id {
            debug!(
                tracked = %call.id,
                ended = %info.id,
                "ended call is not the tracked one, ignoring"
            );
            return;
        }

        call.status = CallStatus::Ended;
        info!(call_id = %call.id, "call ended");
        self.inner.state.set_current_call(call.clone()).await;
        self.inner.state.emit(ClientEvent::CallEnded(call));

        let client = self.clone();
        let call_id = info.id;
        let delay = self.inner.config.call_clear_delay;
        let handle = tokio::spawn(async move {
            sleep(delay).await;
            client.inner.state.clear_current_call(&call_id).await;
            debug!(call_id = %call_id, "tracked call cleared");
        });
        if let Some(previous) = self.inner.call_clear.lock().await.replace(handle) {
            previous.abort();
        }
    }

    /// Answer the ringing call
    ///
    /// Requires a tracked call. SDK failure does not propagate; the user is
    /// prompted to use the widget controls instead.
    pub async fn answer_call(&self) -> ClientResult<()> {
        if self.inner.state.current_call().await.is_none() {
            return Err(ClientError::NoActiveCall);
        }
        if let Err(e) = self.inner.sdk.answer_call().await {
            self.prompt_widget_fallback("answer the call", &e);
        }
        Ok(())
    }

    /// Reject the ringing call
    pub async fn reject_call(&self) -> ClientResult<()> {
        if self.inner.state.current_call().await.is_none() {
            return Err(ClientError::NoActiveCall);
        }
        if let Err(e) = self.inner.sdk.reject_call().await {
            self.prompt_widget_fallback("reject the call", &e);
        }
        Ok(())
    }

    /// Hang up the call in progress
    pub async fn hangup_call(&self) -> ClientResult<()> {
        if self.inner.state.current_call().await.is_none() {
            return Err(ClientError::NoActiveCall);
        }
        if let Err(e) = self.inner.sdk.hang_up().await {
            self.prompt_widget_fallback("hang up", &e);
        }
        Ok(())
    }

    /// Place an outbound call
    pub async fn dial_number(&self, phone_number: &str) -> ClientResult<()> {
        if phone_number.trim().is_empty() {
            return Err(ClientError::InvalidConfiguration {
                field: "phone_number".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if let Err(e) = self.inner.sdk.dial_number(phone_number).await {
            self.prompt_widget_fallback("place the call", &e);
        }
        Ok(())
    }

    fn prompt_widget_fallback(&self, action: &str, e: &ClientError) {
        warn!(error = %e, action, "call action failed, prompting widget fallback");
        self.inner.state.emit(ClientEvent::UserPrompt {
            message: format!(
                "Could not {action} automatically. Use the call widget controls directly."
            ),
        });
    }
}
