//! Operator-initiated sends: compose now, schedule for later, resend.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};

use billnudge_core::config::AutomationConfig;
use billnudge_core::{
    BillNudgeError, Channel, Client, Message, MessageGateway, MessageKind, MessageStatus,
    NewMessage, Result, SendOutcome,
};
use billnudge_store::SharedStore;

use crate::delivery::{self, Outbound, PassReport};
use crate::template;

/// A message composed by an operator for a set of clients.
#[derive(Debug, Clone)]
pub struct ComposeRequest {
    pub client_ids: Vec<String>,
    pub kind: MessageKind,
    pub channel: Channel,
    /// Raw body; placeholders are rendered per client.
    pub content: String,
}

pub struct Composer {
    store: SharedStore,
    gateway: Arc<dyn MessageGateway>,
    config: AutomationConfig,
    offset: FixedOffset,
}

impl Composer {
    pub fn new(
        store: SharedStore,
        gateway: Arc<dyn MessageGateway>,
        config: AutomationConfig,
        offset: FixedOffset,
    ) -> Self {
        Self {
            store,
            gateway,
            config,
            offset,
        }
    }

    /// Start a request from a library template, taking its body and type.
    pub async fn request_from_template(
        &self,
        template_id: &str,
        client_ids: Vec<String>,
        channel: Channel,
    ) -> Result<ComposeRequest> {
        let store = self.store.lock().await;
        let template = store
            .template(template_id)
            .ok_or_else(|| BillNudgeError::not_found("template", template_id))?;
        Ok(ComposeRequest {
            client_ids,
            kind: template.kind,
            channel,
            content: template.content.clone(),
        })
    }

    /// Render and send to every recipient now, one after another.
    ///
    /// Validation happens up front: blank content, an empty recipient list
    /// or an unknown client id rejects the whole request before anything is
    /// recorded or sent.
    pub async fn send_now(&self, request: &ComposeRequest) -> Result<PassReport> {
        let recipients = self.resolve(request).await?;
        let due = self.due_date();
        let mut report = PassReport::default();

        for (i, client) in recipients.iter().enumerate() {
            if i > 0 && self.config.send_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.send_delay_ms)).await;
            }
            let content = template::render_with_due_date(&request.content, client, due);
            let recorded = self.store.lock().await.add_message(NewMessage::pending(
                &client.id,
                request.kind,
                request.channel,
                content.clone(),
            ));
            let message = match recorded {
                Ok(message) => message,
                Err(e) => {
                    tracing::warn!("⚠️ Could not record message for {}: {e}", client.name);
                    continue;
                }
            };
            delivery::deliver(
                &self.store,
                self.gateway.as_ref(),
                Outbound {
                    message_id: &message.id,
                    phone: &client.phone,
                    content: &content,
                    channel: request.channel,
                },
                Utc::now(),
                &mut report,
            )
            .await;
        }
        Ok(report)
    }

    /// Render now and park one `scheduled` message per recipient until `at`.
    pub async fn schedule(&self, request: &ComposeRequest, at: DateTime<Utc>) -> Result<Vec<Message>> {
        let recipients = self.resolve(request).await?;
        let due = self.due_date();
        let mut store = self.store.lock().await;
        let mut scheduled = Vec::with_capacity(recipients.len());
        for client in &recipients {
            let content = template::render_with_due_date(&request.content, client, due);
            scheduled.push(store.add_message(NewMessage::scheduled(
                &client.id,
                request.kind,
                request.channel,
                content,
                at,
            ))?);
        }
        tracing::info!("🗓️ {} message(s) scheduled for {}", scheduled.len(), at);
        Ok(scheduled)
    }

    /// Retry a `failed` message once, reusing its rendered content.
    pub async fn resend(&self, message_id: &str) -> Result<SendOutcome> {
        let (message, phone) = {
            let mut store = self.store.lock().await;
            let message = store
                .message(message_id)
                .cloned()
                .ok_or_else(|| BillNudgeError::not_found("message", message_id))?;
            if message.status != MessageStatus::Failed {
                return Err(BillNudgeError::Validation(format!(
                    "only failed messages can be resent, {message_id} is {}",
                    message.status
                )));
            }
            let phone = store
                .client(&message.client_id)
                .map(|c| c.phone.clone())
                .ok_or_else(|| BillNudgeError::not_found("client", message.client_id.clone()))?;
            store.transition_message(message_id, MessageStatus::Pending, Utc::now())?;
            (message, phone)
        };

        let mut report = PassReport::default();
        Ok(delivery::deliver(
            &self.store,
            self.gateway.as_ref(),
            Outbound {
                message_id: &message.id,
                phone: &phone,
                content: &message.content,
                channel: message.channel,
            },
            Utc::now(),
            &mut report,
        )
        .await)
    }

    async fn resolve(&self, request: &ComposeRequest) -> Result<Vec<Client>> {
        if request.content.trim().is_empty() {
            return Err(BillNudgeError::Validation("message content is required".into()));
        }
        if request.client_ids.is_empty() {
            return Err(BillNudgeError::Validation(
                "select at least one client".into(),
            ));
        }
        let store = self.store.lock().await;
        request
            .client_ids
            .iter()
            .map(|id| {
                store
                    .client(id)
                    .cloned()
                    .ok_or_else(|| BillNudgeError::not_found("client", id.clone()))
            })
            .collect()
    }

    fn due_date(&self) -> chrono::NaiveDate {
        template::due_date_from(Utc::now().with_timezone(&self.offset), self.config.due_in_days)
    }
}
