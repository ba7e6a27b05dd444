//! Scheduled-message dispatcher: redrives queued messages whose time has come.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use billnudge_core::{MessageGateway, MessageStatus};
use billnudge_store::SharedStore;

use crate::delivery::{self, Outbound, PassReport};

pub struct ScheduledDispatcher {
    store: SharedStore,
    gateway: Arc<dyn MessageGateway>,
}

impl ScheduledDispatcher {
    pub fn new(store: SharedStore, gateway: Arc<dyn MessageGateway>) -> Self {
        Self { store, gateway }
    }

    /// Send every `scheduled` message with `scheduled_for <= now`.
    ///
    /// Each message goes scheduled → pending → sent | failed on its own; a
    /// failure is recorded and the pass moves on. Nothing is retried here.
    /// Messages whose client has been deleted go straight to `failed`.
    pub async fn run_scheduled_pass(&self, now: DateTime<Utc>) -> PassReport {
        let mut report = PassReport::default();
        let due = self.store.lock().await.due_scheduled(now);
        if due.is_empty() {
            return report;
        }
        tracing::debug!("📬 {} scheduled message(s) due", due.len());

        for message in due {
            let claimed = {
                let mut store = self.store.lock().await;
                let phone = store.client(&message.client_id).map(|c| c.phone.clone());
                match phone {
                    Some(phone) => store
                        .transition_message(&message.id, MessageStatus::Pending, now)
                        .map(|_| Some(phone)),
                    None => store
                        .transition_message(&message.id, MessageStatus::Failed, now)
                        .map(|_| None),
                }
            };

            let phone = match claimed {
                Ok(Some(phone)) => phone,
                Ok(None) => {
                    tracing::warn!(message_id = %message.id, "⚠️ Client {} no longer exists, scheduled message failed", message.client_id);
                    report.failed += 1;
                    continue;
                }
                Err(e) => {
                    tracing::warn!(message_id = %message.id, "⚠️ Skipping scheduled message: {e}");
                    continue;
                }
            };

            delivery::deliver(
                &self.store,
                self.gateway.as_ref(),
                Outbound {
                    message_id: &message.id,
                    phone: &phone,
                    content: &message.content,
                    channel: message.channel,
                },
                now,
                &mut report,
            )
            .await;
        }

        tracing::info!(
            "📬 Scheduled pass: {} sent, {} failed",
            report.sent,
            report.failed
        );
        report
    }
}
