//! Dry-run gateway: logs every send and reports success.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use billnudge_core::{BalanceReport, Channel, MessageGateway, SendOutcome};

use crate::phone::normalize_phone;

#[derive(Default)]
pub struct DryRunGateway {
    sent: AtomicU64,
}

impl DryRunGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages "sent" so far.
    pub fn sent_count(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl MessageGateway for DryRunGateway {
    fn name(&self) -> &str {
        "dry-run"
    }

    async fn send(&self, phone: &str, message: &str, channel: Channel) -> SendOutcome {
        let n = self.sent.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!("📨 [dry-run] {} → {}: {}", channel, normalize_phone(phone), message);
        SendOutcome::delivered(Some(format!("dry-{n}")))
    }

    async fn check_balance(&self) -> BalanceReport {
        BalanceReport {
            balance: 0.0,
            error: Some("dry-run gateway has no provider balance".into()),
        }
    }
}
