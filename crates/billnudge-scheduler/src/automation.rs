//! Automation pass: fires due reminder rules and sends to their targets.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};

use billnudge_core::config::AutomationConfig;
use billnudge_core::{AutomatedReminder, Channel, Client, MessageGateway, NewMessage};
use billnudge_store::SharedStore;

use crate::delivery::{self, Outbound, PassReport};
use crate::{rules, template};

pub struct AutomationRunner {
    store: SharedStore,
    gateway: Arc<dyn MessageGateway>,
    config: AutomationConfig,
    offset: FixedOffset,
}

impl AutomationRunner {
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

    /// Rules from `candidates` that fire at `now`. Any rule set may be
    /// passed; disabled rules never fire.
    ///
    /// With `catch_up_missed` and a known previous tick, a rule fires when
    /// its time fell in `(previous_tick, now]`; otherwise the current minute
    /// must match exactly.
    pub fn firing_rules(
        &self,
        candidates: Vec<AutomatedReminder>,
        now: DateTime<Utc>,
        previous_tick: Option<DateTime<Utc>>,
    ) -> Vec<AutomatedReminder> {
        let local = now.with_timezone(&self.offset);
        let previous = previous_tick
            .filter(|_| self.config.catch_up_missed)
            .map(|p| p.with_timezone(&self.offset));

        candidates
            .into_iter()
            .filter(|r| r.enabled)
            .filter(|r| match &previous {
                Some(prev) => rules::fires_within(r, prev, &local),
                None => rules::fires_now(r, &local),
            })
            .collect()
    }

    /// Run every firing rule against the current client set.
    ///
    /// Sends are strictly sequential with `send_delay_ms` between them. A
    /// failed recipient is logged and recorded as `failed`; remaining
    /// recipients and rules still run.
    pub async fn run_automation_pass(
        &self,
        now: DateTime<Utc>,
        previous_tick: Option<DateTime<Utc>>,
    ) -> PassReport {
        let mut report = PassReport::default();
        let (candidates, clients) = {
            let store = self.store.lock().await;
            (store.reminders().to_vec(), store.clients().to_vec())
        };

        let firing = self.firing_rules(candidates, now, previous_tick);
        if firing.is_empty() {
            return report;
        }

        let due = template::due_date_from(now.with_timezone(&self.offset), self.config.due_in_days);
        let channels_for = |r: &AutomatedReminder| r.channel.delivery_channels(self.config.fan_out_both_channels);

        for rule in &firing {
            let targets = rules::select_targets(rule, &clients);
            report.rules_fired += 1;
            tracing::info!(
                rule = %rule.id,
                "⏰ Reminder '{}' fired ({}): {} target client(s)",
                rule.name,
                rule.kind,
                targets.len()
            );

            for client in targets {
                let content = template::render_with_due_date(&rule.template, client, due);
                for channel in channels_for(rule) {
                    if report.attempted > 0 && self.config.send_delay_ms > 0 {
                        tokio::time::sleep(Duration::from_millis(self.config.send_delay_ms)).await;
                    }
                    self.send_one(rule, client, channel, &content, &mut report).await;
                }
            }
        }

        tracing::info!(
            "🤖 Automation pass: {} rule(s) fired, {} sent, {} failed",
            report.rules_fired,
            report.sent,
            report.failed
        );
        report
    }

    async fn send_one(
        &self,
        rule: &AutomatedReminder,
        client: &Client,
        channel: Channel,
        content: &str,
        report: &mut PassReport,
    ) {
        let recorded = self.store.lock().await.add_message(NewMessage::pending(
            &client.id,
            rule.kind,
            channel,
            content.to_string(),
        ));
        let message = match recorded {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(rule = %rule.id, "⚠️ Skipping {} for reminder '{}': {e}", client.name, rule.name);
                return;
            }
        };

        delivery::deliver(
            &self.store,
            self.gateway.as_ref(),
            Outbound {
                message_id: &message.id,
                phone: &client.phone,
                content,
                channel,
            },
            Utc::now(),
            report,
        )
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockGateway;
    use billnudge_core::{
        ClientStatus, MessageKind, MessageStatus, NewClient, NewReminder, ReminderChannel,
        ReminderSchedule, TimeOfDay,
    };
    use billnudge_store::ReminderStore;
    use chrono::TimeZone;

    const UTC: i32 = 0;

    fn config() -> AutomationConfig {
        AutomationConfig::default()
    }

    fn runner(store: &SharedStore, gateway: Arc<MockGateway>, config: AutomationConfig) -> AutomationRunner {
        AutomationRunner::new(store.clone(), gateway, config, FixedOffset::east_opt(UTC).unwrap())
    }

    fn nine_am() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 15, 9, 0, 12).unwrap()
    }

    fn reminder(kind: MessageKind, channel: ReminderChannel) -> NewReminder {
        NewReminder {
            name: format!("{kind} at nine"),
            kind,
            channel,
            template: "Dear {name}, you owe {amount}".into(),
            enabled: true,
            schedule: ReminderSchedule::daily(TimeOfDay::new(9, 0).unwrap()),
            conditions: None,
        }
    }

    async fn add_clients(store: &SharedStore, clients: &[(&str, &str, f64, ClientStatus)]) {
        let mut s = store.lock().await;
        for (name, phone, balance, status) in clients {
            s.add_client(NewClient::new(name, phone, *balance, *status)).unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_failed_recipient_does_not_stop_the_pass() {
        let store = ReminderStore::new().into_shared();
        add_clients(
            &store,
            &[
                ("Ann", "0711000001", 100.0, ClientStatus::Active),
                ("Ben", "0711000002", 200.0, ClientStatus::Active),
                ("Cat", "0711000003", 300.0, ClientStatus::Active),
            ],
        )
        .await;
        store
            .lock()
            .await
            .add_reminder(reminder(MessageKind::General, ReminderChannel::Sms))
            .unwrap();

        let gateway = Arc::new(MockGateway::new());
        gateway.fail_for("0711000002");
        let report = runner(&store, gateway.clone(), config())
            .run_automation_pass(nine_am(), None)
            .await;

        assert_eq!(report.rules_fired, 1);
        assert_eq!(report.attempted, 3);
        assert_eq!(report.sent, 2);
        assert_eq!(report.failed, 1);

        let store = store.lock().await;
        let status_of = |name: &str| {
            let client = store.clients().iter().find(|c| c.name == name).unwrap();
            store.messages_for_client(&client.id)[0].status
        };
        assert_eq!(status_of("Ann"), MessageStatus::Sent);
        assert_eq!(status_of("Ben"), MessageStatus::Failed);
        assert_eq!(status_of("Cat"), MessageStatus::Sent);
        assert!((store.stats().success_rate - 2.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_renders_and_records_message_kind() {
        let store = ReminderStore::new().into_shared();
        add_clients(
            &store,
            &[
                ("Ann", "0711000001", 1500.0, ClientStatus::Overdue),
                ("Ben", "0711000002", 0.0, ClientStatus::Active),
            ],
        )
        .await;
        store
            .lock()
            .await
            .add_reminder(reminder(MessageKind::Invoice, ReminderChannel::Whatsapp))
            .unwrap();

        let gateway = Arc::new(MockGateway::new());
        runner(&store, gateway.clone(), config())
            .run_automation_pass(nine_am(), None)
            .await;

        let records = gateway.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].content, "Dear Ann, you owe 1500");
        assert_eq!(records[0].channel, Channel::Whatsapp);

        let store = store.lock().await;
        let msg = &store.messages()[0];
        assert_eq!(msg.kind, MessageKind::Invoice);
        assert_eq!(msg.status, MessageStatus::Sent);
        assert!(msg.sent_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_off_minute_and_disabled_rules_do_nothing() {
        let store = ReminderStore::new().into_shared();
        add_clients(&store, &[("Ann", "0711000001", 10.0, ClientStatus::Active)]).await;
        let id = store
            .lock()
            .await
            .add_reminder(reminder(MessageKind::General, ReminderChannel::Sms))
            .unwrap()
            .id;

        let gateway = Arc::new(MockGateway::new());
        let runner = runner(&store, gateway.clone(), config());
        let report = runner
            .run_automation_pass(nine_am() + chrono::Duration::minutes(1), None)
            .await;
        assert!(report.is_empty());

        store.lock().await.toggle_reminder(&id).unwrap();
        let report = runner.run_automation_pass(nine_am(), None).await;
        assert!(report.is_empty());
        assert_eq!(gateway.send_count(), 0);
    }

    #[tokio::test]
    async fn test_firing_rules_skips_disabled_candidates() {
        let store = ReminderStore::new().into_shared();
        let (on, off) = {
            let mut s = store.lock().await;
            let on = s.add_reminder(reminder(MessageKind::General, ReminderChannel::Sms)).unwrap();
            let mut disabled = reminder(MessageKind::Receipt, ReminderChannel::Sms);
            disabled.enabled = false;
            let off = s.add_reminder(disabled).unwrap();
            (on, off)
        };

        let runner = runner(&store, Arc::new(MockGateway::new()), config());
        let firing = runner.firing_rules(vec![off, on.clone()], nine_am(), None);
        assert_eq!(firing.len(), 1);
        assert_eq!(firing[0].id, on.id);
    }

    #[tokio::test(start_paused = true)]
    async fn test_both_channel_sends_sms_only_by_default() {
        let store = ReminderStore::new().into_shared();
        add_clients(&store, &[("Ann", "0711000001", 10.0, ClientStatus::Active)]).await;
        store
            .lock()
            .await
            .add_reminder(reminder(MessageKind::General, ReminderChannel::Both))
            .unwrap();

        let gateway = Arc::new(MockGateway::new());
        runner(&store, gateway.clone(), config())
            .run_automation_pass(nine_am(), None)
            .await;
        let channels: Vec<Channel> = gateway.records().iter().map(|r| r.channel).collect();
        assert_eq!(channels, vec![Channel::Sms]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_both_channel_fan_out_when_enabled() {
        let store = ReminderStore::new().into_shared();
        add_clients(&store, &[("Ann", "0711000001", 10.0, ClientStatus::Active)]).await;
        store
            .lock()
            .await
            .add_reminder(reminder(MessageKind::General, ReminderChannel::Both))
            .unwrap();

        let gateway = Arc::new(MockGateway::new());
        let mut cfg = config();
        cfg.fan_out_both_channels = true;
        runner(&store, gateway.clone(), cfg)
            .run_automation_pass(nine_am(), None)
            .await;
        let channels: Vec<Channel> = gateway.records().iter().map(|r| r.channel).collect();
        assert_eq!(channels, vec![Channel::Sms, Channel::Whatsapp]);
        assert_eq!(store.lock().await.messages().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sends_are_spaced_by_the_delay() {
        let store = ReminderStore::new().into_shared();
        add_clients(
            &store,
            &[
                ("Ann", "0711000001", 10.0, ClientStatus::Active),
                ("Ben", "0711000002", 10.0, ClientStatus::Active),
                ("Cat", "0711000003", 10.0, ClientStatus::Active),
            ],
        )
        .await;
        store
            .lock()
            .await
            .add_reminder(reminder(MessageKind::General, ReminderChannel::Sms))
            .unwrap();

        let gateway = Arc::new(MockGateway::new());
        let started = tokio::time::Instant::now();
        runner(&store, gateway.clone(), config())
            .run_automation_pass(nine_am(), None)
            .await;
        assert_eq!(started.elapsed(), Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_catch_up_fires_missed_minute() {
        let store = ReminderStore::new().into_shared();
        add_clients(&store, &[("Ann", "0711000001", 10.0, ClientStatus::Active)]).await;
        store
            .lock()
            .await
            .add_reminder(reminder(MessageKind::General, ReminderChannel::Sms))
            .unwrap();

        let gateway = Arc::new(MockGateway::new());
        let late = nine_am() + chrono::Duration::minutes(4);
        let previous = Some(nine_am() - chrono::Duration::minutes(10));

        let exact = runner(&store, gateway.clone(), config());
        assert!(exact.run_automation_pass(late, previous).await.is_empty());

        let mut cfg = config();
        cfg.catch_up_missed = true;
        let report = runner(&store, gateway.clone(), cfg)
            .run_automation_pass(late, previous)
            .await;
        assert_eq!(report.sent, 1);
    }
}
