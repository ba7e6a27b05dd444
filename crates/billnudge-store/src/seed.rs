//! Built-in template library and demo clients.

use billnudge_core::{ClientStatus, MessageKind, NewClient};

/// The four templates every fresh store starts with: (name, kind, content).
pub const DEFAULT_TEMPLATES: [(&str, MessageKind, &str); 4] = [
    (
        "Payment Reminder",
        MessageKind::Invoice,
        "Dear {name}, this is a reminder that your payment of {amount} is due on {dueDate}. Please pay before the deadline. Thank you!",
    ),
    (
        "Payment Received",
        MessageKind::Receipt,
        "Dear {name}, we have received your payment of {amount}. Thank you for your prompt payment!",
    ),
    (
        "Overdue Notice",
        MessageKind::Dunning,
        "Dear {name}, your payment of {amount} is now overdue. Please settle your account as soon as possible to avoid service interruption.",
    ),
    (
        "Garbage Removal Reminder",
        MessageKind::General,
        "Dear {name}, reminder to remove your garbage bag for collection. Thank you!",
    ),
];

/// Sample clients for `--demo` runs.
pub fn demo_clients() -> Vec<NewClient> {
    let mut john = NewClient::new("John Doe", "+254712345678", 5000.0, ClientStatus::Active);
    john.email = Some("john@example.com".into());
    john.address = Some("Nairobi, Kenya".into());

    let mut jane = NewClient::new("Jane Smith", "+254723456789", 0.0, ClientStatus::Active);
    jane.email = Some("jane@example.com".into());
    jane.address = Some("Mombasa, Kenya".into());

    let bob = NewClient::new("Bob Johnson", "+254734567890", 12000.0, ClientStatus::Overdue);

    vec![john, jane, bob]
}
