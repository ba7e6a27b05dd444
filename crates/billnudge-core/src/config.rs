//! BillNudge configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{BillNudgeError, Result};

/// Environment variable that overrides `gateway.api_key`.
pub const API_KEY_ENV: &str = "BILLNUDGE_API_KEY";

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BillNudgeConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub automation: AutomationConfig,
}

impl BillNudgeConfig {
    /// Load config from the default path (~/.billnudge/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default().with_env_overrides())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| BillNudgeError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| BillNudgeError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config.with_env_overrides())
    }

    /// Save config to the given path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| BillNudgeError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the BillNudge home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".billnudge")
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.is_empty() {
                self.gateway.api_key = key;
            }
        }
        self
    }
}

/// Outbound SMS/WhatsApp provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String { "https://api.pesaflux.co.ke/fluxsms".into() }
fn default_timeout_secs() -> u64 { 30 }

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Tick loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,
    /// Offset of the business wall clock from UTC. Rule times and weekdays
    /// are matched against this clock.
    #[serde(default = "default_utc_offset")]
    pub utc_offset_minutes: i32,
}

fn default_tick_interval() -> u64 { 60 }
fn default_utc_offset() -> i32 { 180 }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval(),
            utc_offset_minutes: default_utc_offset(),
        }
    }
}

impl SchedulerConfig {
    /// The configured wall-clock offset, falling back to UTC when out of range.
    pub fn offset(&self) -> chrono::FixedOffset {
        chrono::FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .unwrap_or_else(|| chrono::Offset::fix(&chrono::Utc))
    }
}

/// Automated reminder dispatch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationConfig {
    /// Pause between consecutive sends within a pass.
    #[serde(default = "default_send_delay")]
    pub send_delay_ms: u64,
    /// `{dueDate}` renders as today plus this many days.
    #[serde(default = "default_due_in_days")]
    pub due_in_days: i64,
    /// Send `both`-channel reminders over sms and whatsapp instead of sms only.
    #[serde(default)]
    pub fan_out_both_channels: bool,
    /// Fire rules whose minute fell between the previous tick and now,
    /// instead of requiring an exact minute match.
    #[serde(default)]
    pub catch_up_missed: bool,
}

fn default_send_delay() -> u64 { 500 }
fn default_due_in_days() -> i64 { 7 }

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            send_delay_ms: default_send_delay(),
            due_in_days: default_due_in_days(),
            fan_out_both_channels: false,
            catch_up_missed: false,
        }
    }
}
