//! The authoritative in-memory record of clients, messages, reminder rules
//! and templates.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use billnudge_core::{
    new_id, AutomatedReminder, BillNudgeError, Client, ClientUpdate, DashboardStats, Message,
    MessageKind, MessageStatus, MessageTemplate, NewClient, NewMessage, NewReminder,
    ReminderConditions, ReminderSchedule, ReminderUpdate, Result, ScheduleKind,
};

use crate::seed::DEFAULT_TEMPLATES;
use crate::stats;
use crate::templates::extract_variables;

/// Store handle shared between the scheduler, the dispatcher and callers.
/// All mutations go through this one lock.
pub type SharedStore = Arc<Mutex<ReminderStore>>;

/// Partial update for a template. Changing `content` re-derives `variables`.
#[derive(Debug, Clone, Default)]
pub struct TemplateUpdate {
    pub name: Option<String>,
    pub kind: Option<MessageKind>,
    pub content: Option<String>,
}

#[derive(Debug, Default)]
pub struct ReminderStore {
    clients: Vec<Client>,
    messages: Vec<Message>,
    reminders: Vec<AutomatedReminder>,
    templates: Vec<MessageTemplate>,
    stats: DashboardStats,
}

impl ReminderStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store preloaded with the built-in template library.
    pub fn with_default_templates() -> Self {
        let mut store = Self::new();
        for (name, kind, content) in DEFAULT_TEMPLATES {
            store.templates.push(MessageTemplate {
                id: new_id(),
                name: name.to_string(),
                kind,
                content: content.to_string(),
                variables: extract_variables(content),
            });
        }
        store
    }

    /// Wrap the store for sharing.
    pub fn into_shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    // ── Clients ─────────────────────────────────────────────

    pub fn add_client(&mut self, input: NewClient) -> Result<Client> {
        require_non_blank("client name", &input.name)?;
        require_non_blank("client phone", &input.phone)?;

        let client = Client {
            id: new_id(),
            name: input.name,
            phone: input.phone,
            email: input.email,
            address: input.address,
            balance: input.balance,
            status: input.status,
            created_at: Utc::now(),
            last_payment: input.last_payment,
        };
        tracing::info!("👤 Client added: '{}' ({})", client.name, client.id);
        self.clients.push(client.clone());
        self.recompute_stats();
        Ok(client)
    }

    /// Apply a partial update. Balance and status are independent: neither
    /// is adjusted when the other changes.
    pub fn update_client(&mut self, id: &str, update: ClientUpdate) -> Result<Client> {
        if let Some(name) = &update.name {
            require_non_blank("client name", name)?;
        }
        if let Some(phone) = &update.phone {
            require_non_blank("client phone", phone)?;
        }
        let client = self
            .clients
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| BillNudgeError::not_found("client", id))?;

        if let Some(name) = update.name {
            client.name = name;
        }
        if let Some(phone) = update.phone {
            client.phone = phone;
        }
        if let Some(email) = update.email {
            client.email = Some(email);
        }
        if let Some(address) = update.address {
            client.address = Some(address);
        }
        if let Some(balance) = update.balance {
            client.balance = balance;
        }
        if let Some(status) = update.status {
            client.status = status;
        }
        if let Some(at) = update.last_payment {
            client.last_payment = Some(at);
        }

        let updated = client.clone();
        self.recompute_stats();
        Ok(updated)
    }

    /// Remove a client. Their message history is kept.
    pub fn delete_client(&mut self, id: &str) -> bool {
        let len = self.clients.len();
        self.clients.retain(|c| c.id != id);
        let removed = self.clients.len() < len;
        if removed {
            self.recompute_stats();
        }
        removed
    }

    pub fn client(&self, id: &str) -> Option<&Client> {
        self.clients.iter().find(|c| c.id == id)
    }

    pub fn clients(&self) -> &[Client] {
        &self.clients
    }

    // ── Messages ────────────────────────────────────────────

    pub fn add_message(&mut self, input: NewMessage) -> Result<Message> {
        require_non_blank("message content", &input.content)?;
        if self.client(&input.client_id).is_none() {
            return Err(BillNudgeError::not_found("client", input.client_id));
        }
        match input.status {
            MessageStatus::Pending => {}
            MessageStatus::Scheduled if input.scheduled_for.is_some() => {}
            MessageStatus::Scheduled => {
                return Err(BillNudgeError::Validation(
                    "scheduled message needs a scheduled-for time".into(),
                ));
            }
            other => {
                return Err(BillNudgeError::Validation(format!(
                    "new messages start as pending or scheduled, not {other}"
                )));
            }
        }

        let message = Message {
            id: new_id(),
            client_id: input.client_id,
            kind: input.kind,
            channel: input.channel,
            content: input.content,
            status: input.status,
            scheduled_for: input.scheduled_for,
            sent_at: None,
            created_at: Utc::now(),
        };
        self.messages.push(message.clone());
        self.recompute_stats();
        Ok(message)
    }

    /// Move a message along its status machine. Reaching `sent` stamps
    /// `sent_at = at`; any other target clears it.
    pub fn transition_message(
        &mut self,
        id: &str,
        status: MessageStatus,
        at: DateTime<Utc>,
    ) -> Result<Message> {
        let message = self
            .messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| BillNudgeError::not_found("message", id))?;

        if !message.status.can_transition_to(status) {
            return Err(BillNudgeError::InvalidTransition {
                id: id.to_string(),
                from: message.status,
                to: status,
            });
        }

        message.status = status;
        message.sent_at = (status == MessageStatus::Sent).then_some(at);

        let updated = message.clone();
        self.recompute_stats();
        Ok(updated)
    }

    pub fn message(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn messages_of_kind(&self, kind: MessageKind) -> Vec<&Message> {
        self.messages.iter().filter(|m| m.kind == kind).collect()
    }

    pub fn messages_for_client(&self, client_id: &str) -> Vec<&Message> {
        self.messages
            .iter()
            .filter(|m| m.client_id == client_id)
            .collect()
    }

    /// Scheduled messages whose time is at or before `now`, oldest first.
    pub fn due_scheduled(&self, now: DateTime<Utc>) -> Vec<Message> {
        let mut due: Vec<Message> = self
            .messages
            .iter()
            .filter(|m| m.is_due(now))
            .cloned()
            .collect();
        due.sort_by_key(|m| m.scheduled_for);
        due
    }

    // ── Automated reminders ─────────────────────────────────

    pub fn add_reminder(&mut self, input: NewReminder) -> Result<AutomatedReminder> {
        require_non_blank("reminder name", &input.name)?;
        require_non_blank("reminder template", &input.template)?;
        validate_schedule(&input.schedule)?;
        if let Some(cond) = &input.conditions {
            validate_conditions(cond)?;
        }

        let reminder = AutomatedReminder {
            id: new_id(),
            name: input.name,
            kind: input.kind,
            channel: input.channel,
            template: input.template,
            enabled: input.enabled,
            schedule: input.schedule,
            conditions: input.conditions,
            created_at: Utc::now(),
        };
        tracing::info!("📅 Reminder added: '{}' ({})", reminder.name, reminder.id);
        self.reminders.push(reminder.clone());
        Ok(reminder)
    }

    pub fn update_reminder(&mut self, id: &str, update: ReminderUpdate) -> Result<AutomatedReminder> {
        if let Some(schedule) = &update.schedule {
            validate_schedule(schedule)?;
        }
        if let Some(Some(cond)) = &update.conditions {
            validate_conditions(cond)?;
        }
        if let Some(name) = &update.name {
            require_non_blank("reminder name", name)?;
        }
        if let Some(template) = &update.template {
            require_non_blank("reminder template", template)?;
        }

        let reminder = self
            .reminders
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| BillNudgeError::not_found("reminder", id))?;

        if let Some(name) = update.name {
            reminder.name = name;
        }
        if let Some(kind) = update.kind {
            reminder.kind = kind;
        }
        if let Some(channel) = update.channel {
            reminder.channel = channel;
        }
        if let Some(template) = update.template {
            reminder.template = template;
        }
        if let Some(enabled) = update.enabled {
            reminder.enabled = enabled;
        }
        if let Some(schedule) = update.schedule {
            reminder.schedule = schedule;
        }
        if let Some(conditions) = update.conditions {
            reminder.conditions = conditions;
        }
        Ok(reminder.clone())
    }

    pub fn delete_reminder(&mut self, id: &str) -> bool {
        let len = self.reminders.len();
        self.reminders.retain(|r| r.id != id);
        self.reminders.len() < len
    }

    /// Flip a rule's enabled flag, returning the new value.
    pub fn toggle_reminder(&mut self, id: &str) -> Result<bool> {
        let reminder = self
            .reminders
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| BillNudgeError::not_found("reminder", id))?;
        reminder.enabled = !reminder.enabled;
        tracing::info!(
            "🔁 Reminder '{}' {}",
            reminder.name,
            if reminder.enabled { "enabled" } else { "disabled" }
        );
        Ok(reminder.enabled)
    }

    pub fn reminders(&self) -> &[AutomatedReminder] {
        &self.reminders
    }

    pub fn enabled_reminders(&self) -> Vec<AutomatedReminder> {
        self.reminders.iter().filter(|r| r.enabled).cloned().collect()
    }

    // ── Templates ───────────────────────────────────────────

    pub fn add_template(&mut self, name: &str, kind: MessageKind, content: &str) -> Result<MessageTemplate> {
        require_non_blank("template name", name)?;
        require_non_blank("template content", content)?;
        let template = MessageTemplate {
            id: new_id(),
            name: name.to_string(),
            kind,
            content: content.to_string(),
            variables: extract_variables(content),
        };
        self.templates.push(template.clone());
        Ok(template)
    }

    pub fn update_template(&mut self, id: &str, update: TemplateUpdate) -> Result<MessageTemplate> {
        if let Some(name) = &update.name {
            require_non_blank("template name", name)?;
        }
        if let Some(content) = &update.content {
            require_non_blank("template content", content)?;
        }
        let template = self
            .templates
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| BillNudgeError::not_found("template", id))?;

        if let Some(name) = update.name {
            template.name = name;
        }
        if let Some(kind) = update.kind {
            template.kind = kind;
        }
        if let Some(content) = update.content {
            template.variables = extract_variables(&content);
            template.content = content;
        }
        Ok(template.clone())
    }

    pub fn delete_template(&mut self, id: &str) -> bool {
        let len = self.templates.len();
        self.templates.retain(|t| t.id != id);
        self.templates.len() < len
    }

    pub fn template(&self, id: &str) -> Option<&MessageTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }

    pub fn templates(&self) -> &[MessageTemplate] {
        &self.templates
    }

    // ── Stats ───────────────────────────────────────────────

    pub fn stats(&self) -> &DashboardStats {
        &self.stats
    }

    fn recompute_stats(&mut self) {
        self.stats = stats::compute(&self.clients, &self.messages);
    }
}

fn require_non_blank(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(BillNudgeError::Validation(format!("{field} is required")));
    }
    Ok(())
}

fn validate_schedule(schedule: &ReminderSchedule) -> Result<()> {
    match schedule.kind {
        ScheduleKind::Immediate => {}
        ScheduleKind::Scheduled => {
            if schedule.time.is_none() {
                return Err(BillNudgeError::Validation(
                    "scheduled reminders need a time (HH:MM)".into(),
                ));
            }
        }
        ScheduleKind::Recurring => {
            if schedule.time.is_none() {
                return Err(BillNudgeError::Validation(
                    "recurring reminders need a time (HH:MM)".into(),
                ));
            }
            if schedule.recurring_days.is_empty() {
                return Err(BillNudgeError::Validation(
                    "recurring reminders need at least one weekday".into(),
                ));
            }
        }
    }
    if let Some(day) = schedule.recurring_days.iter().find(|d| **d > 6) {
        return Err(BillNudgeError::Validation(format!(
            "weekday index {day} out of range 0-6"
        )));
    }
    Ok(())
}

fn validate_conditions(cond: &ReminderConditions) -> Result<()> {
    if let (Some(min), Some(max)) = (cond.min_balance, cond.max_balance) {
        if min > max {
            return Err(BillNudgeError::Validation(format!(
                "minimum balance {min} exceeds maximum {max}"
            )));
        }
    }
    Ok(())
}
