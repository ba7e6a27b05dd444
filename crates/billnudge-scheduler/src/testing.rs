//! Recording gateway for tests.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use billnudge_core::{BalanceReport, Channel, MessageGateway, SendOutcome};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SentRecord {
    pub phone: String,
    pub content: String,
    pub channel: Channel,
}

#[derive(Default)]
pub(crate) struct MockGateway {
    sent: Mutex<Vec<SentRecord>>,
    failing: Mutex<HashSet<String>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send to `phone` fail.
    pub fn fail_for(&self, phone: &str) {
        self.failing.lock().unwrap().insert(phone.to_string());
    }

    pub fn records(&self) -> Vec<SentRecord> {
        self.sent.lock().unwrap().clone()
    }

    pub fn send_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn sent_contents(&self) -> Vec<String> {
        self.records().into_iter().map(|r| r.content).collect()
    }
}

#[async_trait]
impl MessageGateway for MockGateway {
    fn name(&self) -> &str {
        "mock"
    }

    async fn send(&self, phone: &str, message: &str, channel: Channel) -> SendOutcome {
        let n = {
            let mut sent = self.sent.lock().unwrap();
            sent.push(SentRecord {
                phone: phone.to_string(),
                content: message.to_string(),
                channel,
            });
            sent.len()
        };
        if self.failing.lock().unwrap().contains(phone) {
            SendOutcome::failed("provider rejected recipient")
        } else {
            SendOutcome::delivered(Some(format!("mock-{n}")))
        }
    }

    async fn check_balance(&self) -> BalanceReport {
        BalanceReport {
            balance: 100.0,
            error: None,
        }
    }
}
