//! # BillNudge Scheduler
//!
//! Decides, once a minute, which scheduled messages and automated reminder
//! rules are due, renders per-client content and drives delivery through a
//! [`billnudge_core::MessageGateway`].
//!
//! ## Architecture
//! ```text
//! SchedulerEngine (tokio interval, 60s, first tick immediate)
//!   └── tick
//!         ├── ScheduledDispatcher: scheduled & due → pending → sent | failed
//!         └── AutomationRunner (after the dispatcher finishes)
//!               ├── rules: HH:MM / weekday match → targeting
//!               ├── template: {name} {amount} {phone} {dueDate}
//!               └── per client: record pending → send → sent | failed
//!                   (sequential, fixed delay between sends)
//! ```
//!
//! Sends never run concurrently and a failed recipient never stops the
//! rest of a pass.

pub mod automation;
pub mod compose;
pub mod delivery;
pub mod dispatch;
pub mod engine;
pub mod rules;
pub mod template;

#[cfg(test)]
pub(crate) mod testing;

pub use automation::AutomationRunner;
pub use compose::{ComposeRequest, Composer};
pub use delivery::PassReport;
pub use dispatch::ScheduledDispatcher;
pub use engine::{SchedulerEngine, TickReport, TickRunner};
pub use template::render;
