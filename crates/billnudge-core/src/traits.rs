//! Delivery gateway trait: the seam between the scheduler and a provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::Channel;

/// Result of a single send attempt.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SendOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SendOutcome {
    pub fn delivered(message_id: Option<String>) -> Self {
        Self {
            success: true,
            message_id,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message_id: None,
            error: Some(error.into()),
        }
    }
}

/// Remaining provider credit.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BalanceReport {
    pub balance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// An outbound SMS/WhatsApp provider.
///
/// Implementations never fail past this boundary: transport and provider
/// errors come back as `SendOutcome { success: false, .. }` or a zero
/// balance with an error string. One call is one request, no retries.
#[async_trait]
pub trait MessageGateway: Send + Sync {
    /// Provider name, used in logs.
    fn name(&self) -> &str;

    /// Deliver `message` to `phone` over `channel`.
    async fn send(&self, phone: &str, message: &str, channel: Channel) -> SendOutcome;

    /// Query remaining account credit.
    async fn check_balance(&self) -> BalanceReport;
}
