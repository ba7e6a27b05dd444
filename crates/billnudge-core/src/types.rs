//! Domain model: clients, messages, automated reminders, templates.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BillNudgeError;

/// Generate a fresh entity ID.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Account standing of a client.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    Active,
    Inactive,
    Overdue,
}

impl fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientStatus::Active => write!(f, "active"),
            ClientStatus::Inactive => write!(f, "inactive"),
            ClientStatus::Overdue => write!(f, "overdue"),
        }
    }
}

/// Semantic type shared by messages, reminders and templates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Invoice,
    Receipt,
    Dunning,
    General,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKind::Invoice => write!(f, "invoice"),
            MessageKind::Receipt => write!(f, "receipt"),
            MessageKind::Dunning => write!(f, "dunning"),
            MessageKind::General => write!(f, "general"),
        }
    }
}

impl FromStr for MessageKind {
    type Err = BillNudgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "invoice" => Ok(MessageKind::Invoice),
            "receipt" => Ok(MessageKind::Receipt),
            "dunning" => Ok(MessageKind::Dunning),
            "general" => Ok(MessageKind::General),
            other => Err(BillNudgeError::Validation(format!(
                "unknown message type '{other}'"
            ))),
        }
    }
}

/// A concrete delivery channel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Sms,
    Whatsapp,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Sms => write!(f, "sms"),
            Channel::Whatsapp => write!(f, "whatsapp"),
        }
    }
}

impl FromStr for Channel {
    type Err = BillNudgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sms" => Ok(Channel::Sms),
            "whatsapp" => Ok(Channel::Whatsapp),
            other => Err(BillNudgeError::Validation(format!(
                "unknown channel '{other}'"
            ))),
        }
    }
}

/// Channel preference configured on a reminder rule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReminderChannel {
    Sms,
    Whatsapp,
    Both,
}

impl ReminderChannel {
    /// Channels a rule actually dispatches over.
    ///
    /// `Both` collapses to sms unless `fan_out` is set, in which case it
    /// yields sms followed by whatsapp.
    pub fn delivery_channels(self, fan_out: bool) -> Vec<Channel> {
        match self {
            ReminderChannel::Sms => vec![Channel::Sms],
            ReminderChannel::Whatsapp => vec![Channel::Whatsapp],
            ReminderChannel::Both if fan_out => vec![Channel::Sms, Channel::Whatsapp],
            ReminderChannel::Both => vec![Channel::Sms],
        }
    }
}

/// Message delivery status.
///
/// ```text
/// scheduled ──► pending ──► sent
///     │            │
///     └──► failed ◄┘
///            │
///            └──► pending   (operator resend)
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Pending,
    Sent,
    Failed,
    Scheduled,
}

impl MessageStatus {
    pub fn can_transition_to(self, next: MessageStatus) -> bool {
        use MessageStatus::*;
        matches!(
            (self, next),
            (Scheduled, Pending) | (Scheduled, Failed) | (Pending, Sent) | (Pending, Failed) | (Failed, Pending)
        )
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageStatus::Pending => write!(f, "pending"),
            MessageStatus::Sent => write!(f, "sent"),
            MessageStatus::Failed => write!(f, "failed"),
            MessageStatus::Scheduled => write!(f, "scheduled"),
        }
    }
}

/// A billed client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    pub name: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Outstanding balance in currency units. Negative means credit.
    pub balance: f64,
    pub status: ClientStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_payment: Option<DateTime<Utc>>,
}

/// Input for creating a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewClient {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub balance: f64,
    pub status: ClientStatus,
    #[serde(default)]
    pub last_payment: Option<DateTime<Utc>>,
}

impl NewClient {
    pub fn new(name: &str, phone: &str, balance: f64, status: ClientStatus) -> Self {
        Self {
            name: name.to_string(),
            phone: phone.to_string(),
            email: None,
            address: None,
            balance,
            status,
            last_payment: None,
        }
    }
}

/// Partial update for a client. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub balance: Option<f64>,
    pub status: Option<ClientStatus>,
    pub last_payment: Option<DateTime<Utc>>,
}

/// A message addressed to one client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub client_id: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub channel: Channel,
    /// Rendered content, placeholders already substituted.
    pub content: String,
    pub status: MessageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Whether this is a scheduled message whose time has come.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == MessageStatus::Scheduled && self.scheduled_for.is_some_and(|at| at <= now)
    }
}

/// Input for recording a message.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub client_id: String,
    pub kind: MessageKind,
    pub channel: Channel,
    pub content: String,
    pub status: MessageStatus,
    pub scheduled_for: Option<DateTime<Utc>>,
}

impl NewMessage {
    /// A message about to be sent right away.
    pub fn pending(client_id: &str, kind: MessageKind, channel: Channel, content: String) -> Self {
        Self {
            client_id: client_id.to_string(),
            kind,
            channel,
            content,
            status: MessageStatus::Pending,
            scheduled_for: None,
        }
    }

    /// A message parked until `at`.
    pub fn scheduled(
        client_id: &str,
        kind: MessageKind,
        channel: Channel,
        content: String,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            client_id: client_id.to_string(),
            kind,
            channel,
            content,
            status: MessageStatus::Scheduled,
            scheduled_for: Some(at),
        }
    }
}

/// Wall-clock minute in 24-hour `HH:MM` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }
}

impl FromStr for TimeOfDay {
    type Err = BillNudgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || BillNudgeError::Validation(format!("invalid time '{s}', expected HH:MM"));
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        if h.len() != 2 || m.len() != 2 {
            return Err(invalid());
        }
        let hour: u8 = h.parse().map_err(|_| invalid())?;
        let minute: u8 = m.parse().map_err(|_| invalid())?;
        TimeOfDay::new(hour, minute).ok_or_else(invalid)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = BillNudgeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(t: TimeOfDay) -> Self {
        t.to_string()
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// How a reminder rule is triggered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleKind {
    /// Manual, on-demand sends only. Never fires on a tick.
    Immediate,
    /// Every day at `time`.
    Scheduled,
    /// At `time` on the listed weekdays.
    Recurring,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReminderSchedule {
    #[serde(rename = "type")]
    pub kind: ScheduleKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<TimeOfDay>,
    /// Carried for display; firing does not consult it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_before_due: Option<u32>,
    /// Weekday indices, 0 = Sunday through 6 = Saturday.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recurring_days: Vec<u8>,
}

impl ReminderSchedule {
    pub fn immediate() -> Self {
        Self {
            kind: ScheduleKind::Immediate,
            time: None,
            days_before_due: None,
            recurring_days: Vec::new(),
        }
    }

    pub fn daily(time: TimeOfDay) -> Self {
        Self {
            kind: ScheduleKind::Scheduled,
            time: Some(time),
            days_before_due: None,
            recurring_days: Vec::new(),
        }
    }

    pub fn recurring(time: TimeOfDay, days: &[u8]) -> Self {
        Self {
            kind: ScheduleKind::Recurring,
            time: Some(time),
            days_before_due: None,
            recurring_days: days.to_vec(),
        }
    }
}

/// Targeting filters applied before the type-specific narrowing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReminderConditions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_balance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_balance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_status: Option<Vec<ClientStatus>>,
}

impl ReminderConditions {
    pub fn admits(&self, client: &Client) -> bool {
        if self.min_balance.is_some_and(|min| client.balance < min) {
            return false;
        }
        if self.max_balance.is_some_and(|max| client.balance > max) {
            return false;
        }
        match &self.client_status {
            Some(allowed) => allowed.contains(&client.status),
            None => true,
        }
    }
}

/// An automated reminder rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AutomatedReminder {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub channel: ReminderChannel,
    /// Raw template body, rendered per client at dispatch time.
    pub template: String,
    pub enabled: bool,
    pub schedule: ReminderSchedule,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<ReminderConditions>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a reminder rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReminder {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub channel: ReminderChannel,
    pub template: String,
    #[serde(default = "bool_true")]
    pub enabled: bool,
    pub schedule: ReminderSchedule,
    #[serde(default)]
    pub conditions: Option<ReminderConditions>,
}

fn bool_true() -> bool {
    true
}

/// Partial update for a reminder rule.
#[derive(Debug, Clone, Default)]
pub struct ReminderUpdate {
    pub name: Option<String>,
    pub kind: Option<MessageKind>,
    pub channel: Option<ReminderChannel>,
    pub template: Option<String>,
    pub enabled: Option<bool>,
    pub schedule: Option<ReminderSchedule>,
    /// `Some(None)` clears the conditions.
    pub conditions: Option<Option<ReminderConditions>>,
}

/// A reusable message body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageTemplate {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub content: String,
    /// Placeholder names found in `content`.
    pub variables: Vec<String>,
}

/// Aggregates shown on the dashboard. Derived, never edited directly.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_clients: usize,
    pub active_clients: usize,
    pub overdue_clients: usize,
    pub total_balance: f64,
    pub messages_sent: usize,
    pub messages_failed: usize,
    pub messages_pending: usize,
    pub messages_scheduled: usize,
    /// `sent / (sent + failed + pending)`, 0 when nothing was attempted.
    pub success_rate: f64,
}

impl DashboardStats {
    pub fn success_percent(&self) -> f64 {
        self.success_rate * 100.0
    }
}
