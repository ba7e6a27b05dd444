//! # BillNudge Core
//!
//! Shared vocabulary for the reminder engine: the client/message/reminder
//! data model, the error type, TOML configuration, and the delivery gateway
//! trait every channel implementation plugs into.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::BillNudgeConfig;
pub use error::{BillNudgeError, Result};
pub use traits::{BalanceReport, MessageGateway, SendOutcome};
pub use types::*;
