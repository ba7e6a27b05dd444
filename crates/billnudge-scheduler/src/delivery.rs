//! Shared send step: push one pending message through the gateway and
//! record the outcome in the store.

use chrono::{DateTime, Utc};

use billnudge_core::{Channel, MessageGateway, MessageStatus, SendOutcome};
use billnudge_store::SharedStore;

/// Per-pass counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Rules that fired (automation passes only).
    pub rules_fired: usize,
    /// Gateway calls made.
    pub attempted: usize,
    pub sent: usize,
    /// Messages that ended up `failed`, including ones never sent.
    pub failed: usize,
}

impl PassReport {
    pub fn is_empty(&self) -> bool {
        self.rules_fired == 0 && self.attempted == 0 && self.failed == 0
    }

    fn record(&mut self, outcome: &SendOutcome) {
        self.attempted += 1;
        if outcome.success {
            self.sent += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// One message already in `pending`, ready to go out.
pub(crate) struct Outbound<'a> {
    pub message_id: &'a str,
    pub phone: &'a str,
    pub content: &'a str,
    pub channel: Channel,
}

/// Send `out` and move its message to `sent` (stamped `sent_at`) or
/// `failed`. The store lock is not held across the gateway call.
pub(crate) async fn deliver(
    store: &SharedStore,
    gateway: &dyn MessageGateway,
    out: Outbound<'_>,
    sent_at: DateTime<Utc>,
    report: &mut PassReport,
) -> SendOutcome {
    let outcome = gateway.send(out.phone, out.content, out.channel).await;
    report.record(&outcome);

    let status = if outcome.success {
        MessageStatus::Sent
    } else {
        MessageStatus::Failed
    };
    let recorded = store
        .lock()
        .await
        .transition_message(out.message_id, status, sent_at);
    if let Err(e) = recorded {
        tracing::warn!("⚠️ Could not record {} for message {}: {e}", status, out.message_id);
    }

    match &outcome.error {
        Some(err) if !outcome.success => {
            tracing::warn!(message_id = %out.message_id, "❌ {} send via {} failed: {}", out.channel, gateway.name(), err);
        }
        _ => {
            tracing::info!(message_id = %out.message_id, "✅ {} message {}", out.channel, status);
        }
    }
    outcome
}
