//! # BillNudge Channels
//! Delivery gateway implementations.
//!
//! - `fluxsms`: PesaFlux FluxSMS HTTP API (sms + whatsapp)
//! - `dry_run`: logs instead of sending, for demos and rehearsals

pub mod dry_run;
pub mod fluxsms;
pub mod phone;

pub use dry_run::DryRunGateway;
pub use fluxsms::FluxSmsGateway;
pub use phone::normalize_phone;
