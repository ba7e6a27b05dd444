//! Dashboard statistics, derived from the client and message collections.

use billnudge_core::{Client, ClientStatus, DashboardStats, Message, MessageStatus};

/// Compute dashboard aggregates from scratch.
pub fn compute(clients: &[Client], messages: &[Message]) -> DashboardStats {
    let count_clients = |status| clients.iter().filter(|c| c.status == status).count();
    let count_messages = |status| messages.iter().filter(|m| m.status == status).count();

    let messages_sent = count_messages(MessageStatus::Sent);
    let messages_failed = count_messages(MessageStatus::Failed);
    let messages_pending = count_messages(MessageStatus::Pending);
    let attempted = messages_sent + messages_failed + messages_pending;

    DashboardStats {
        total_clients: clients.len(),
        active_clients: count_clients(ClientStatus::Active),
        overdue_clients: count_clients(ClientStatus::Overdue),
        total_balance: clients.iter().map(|c| c.balance).sum(),
        messages_sent,
        messages_failed,
        messages_pending,
        messages_scheduled: count_messages(MessageStatus::Scheduled),
        success_rate: if attempted == 0 {
            0.0
        } else {
            messages_sent as f64 / attempted as f64
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billnudge_core::{Channel, MessageKind};
    use chrono::Utc;

    fn client(status: ClientStatus, balance: f64) -> Client {
        Client {
            id: billnudge_core::new_id(),
            name: "c".into(),
            phone: "0700000000".into(),
            email: None,
            address: None,
            balance,
            status,
            created_at: Utc::now(),
            last_payment: None,
        }
    }

    fn message(status: MessageStatus) -> Message {
        Message {
            id: billnudge_core::new_id(),
            client_id: "c".into(),
            kind: MessageKind::General,
            channel: Channel::Sms,
            content: "hi".into(),
            status,
            scheduled_for: None,
            sent_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_stats() {
        let stats = compute(&[], &[]);
        assert_eq!(stats, DashboardStats::default());
        assert_eq!(stats.success_rate, 0.0);
    }

    #[test]
    fn test_counts_and_rate() {
        let clients = vec![
            client(ClientStatus::Active, 100.0),
            client(ClientStatus::Overdue, 250.5),
            client(ClientStatus::Inactive, -50.0),
        ];
        let messages = vec![
            message(MessageStatus::Sent),
            message(MessageStatus::Sent),
            message(MessageStatus::Failed),
            message(MessageStatus::Pending),
            message(MessageStatus::Scheduled),
        ];
        let stats = compute(&clients, &messages);
        assert_eq!(stats.total_clients, 3);
        assert_eq!(stats.active_clients, 1);
        assert_eq!(stats.overdue_clients, 1);
        assert!((stats.total_balance - 300.5).abs() < f64::EPSILON);
        assert_eq!(stats.messages_sent, 2);
        assert_eq!(stats.messages_scheduled, 1);
        assert!((stats.success_rate - 0.5).abs() < f64::EPSILON);
        assert!((stats.success_percent() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_scheduled_only_gives_zero_rate() {
        let stats = compute(&[], &[message(MessageStatus::Scheduled)]);
        assert_eq!(stats.success_rate, 0.0);
        assert_eq!(stats.messages_scheduled, 1);
    }
}
