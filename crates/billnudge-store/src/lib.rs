//! # BillNudge Store
//!
//! Process-lifetime state: clients, messages, reminder rules and the
//! template library. Every client or message mutation recomputes the
//! dashboard statistics before returning, so readers never observe stale
//! aggregates.
//!
//! The store is a plain struct; callers share it as [`SharedStore`] and
//! hold the lock only for the duration of a mutation, never across a
//! network send.

pub mod seed;
pub mod stats;
pub mod store;
pub mod templates;

pub use store::{ReminderStore, SharedStore, TemplateUpdate};
pub use templates::extract_variables;
