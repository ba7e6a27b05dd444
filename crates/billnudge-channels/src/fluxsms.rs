//! PesaFlux FluxSMS gateway.
//!
//! `POST {base_url}/send` with `{api_key, phone, message, type}` and
//! `GET {base_url}/balance?api_key=...`. Every failure (transport, non-2xx,
//! unparseable body) is folded into the returned value.

use std::time::Duration;

use async_trait::async_trait;
use billnudge_core::config::GatewayConfig;
use billnudge_core::{BalanceReport, BillNudgeError, Channel, MessageGateway, Result, SendOutcome};
use serde_json::Value;

use crate::phone::normalize_phone;

const DEFAULT_SEND_ERROR: &str = "Failed to send message";

pub struct FluxSmsGateway {
    config: GatewayConfig,
    client: reqwest::Client,
}

impl FluxSmsGateway {
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BillNudgeError::Gateway(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl MessageGateway for FluxSmsGateway {
    fn name(&self) -> &str {
        "fluxsms"
    }

    async fn send(&self, phone: &str, message: &str, channel: Channel) -> SendOutcome {
        let formatted = normalize_phone(phone);
        let body = serde_json::json!({
            "api_key": self.config.api_key,
            "phone": &formatted,
            "message": message,
            "type": channel.to_string(),
        });

        let resp = match self.client.post(self.url("send")).json(&body).send().await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!("⚠️ FluxSMS send to {} failed: {e}", formatted);
                return SendOutcome::failed(e.to_string());
            }
        };

        let status = resp.status().as_u16();
        let payload: Value = resp.json().await.unwrap_or(Value::Null);
        let outcome = interpret_send_response(status, &payload);
        if outcome.success {
            tracing::debug!("FluxSMS {} message accepted for {}", channel, formatted);
        } else {
            tracing::warn!(
                "⚠️ FluxSMS rejected {} message for {}: {}",
                channel,
                formatted,
                outcome.error.as_deref().unwrap_or(DEFAULT_SEND_ERROR)
            );
        }
        outcome
    }

    async fn check_balance(&self) -> BalanceReport {
        let resp = self
            .client
            .get(self.url("balance"))
            .query(&[("api_key", self.config.api_key.as_str())])
            .send()
            .await;

        match resp {
            Ok(resp) if resp.status().is_success() => {
                let payload: Value = resp.json().await.unwrap_or(Value::Null);
                BalanceReport {
                    balance: parse_balance(&payload),
                    error: None,
                }
            }
            Ok(resp) => {
                let status = resp.status();
                let payload: Value = resp.json().await.unwrap_or(Value::Null);
                BalanceReport {
                    balance: 0.0,
                    error: Some(
                        payload["message"]
                            .as_str()
                            .map(String::from)
                            .unwrap_or_else(|| format!("Balance request failed with HTTP {status}")),
                    ),
                }
            }
            Err(e) => BalanceReport {
                balance: 0.0,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Map a provider reply to a [`SendOutcome`].
///
/// Accepted when the body says `success: true` or the status is 200. The
/// provider id is read from `message_id`, falling back to `id`.
pub fn interpret_send_response(status: u16, payload: &Value) -> SendOutcome {
    if payload["success"].as_bool() == Some(true) || status == 200 {
        let message_id = ["message_id", "id"]
            .iter()
            .find_map(|key| json_scalar(&payload[*key]));
        return SendOutcome::delivered(message_id);
    }

    let error = payload["message"]
        .as_str()
        .filter(|m| !m.is_empty())
        .map(String::from)
        .unwrap_or_else(|| format!("{DEFAULT_SEND_ERROR} (HTTP {status})"));
    SendOutcome::failed(error)
}

fn parse_balance(payload: &Value) -> f64 {
    match &payload["balance"] {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn json_scalar(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_accepts_200_and_reads_id() {
        let out = interpret_send_response(200, &json!({"message_id": "abc123"}));
        assert!(out.success);
        assert_eq!(out.message_id.as_deref(), Some("abc123"));

        let out = interpret_send_response(200, &json!({"id": 42}));
        assert_eq!(out.message_id.as_deref(), Some("42"));

        let out = interpret_send_response(200, &Value::Null);
        assert!(out.success);
        assert!(out.message_id.is_none());
    }

    #[test]
    fn test_success_flag_wins_over_status() {
        let out = interpret_send_response(202, &json!({"success": true, "id": "x"}));
        assert!(out.success);
    }

    #[test]
    fn test_failure_extracts_provider_message() {
        let out = interpret_send_response(400, &json!({"success": false, "message": "Insufficient credit"}));
        assert!(!out.success);
        assert_eq!(out.error.as_deref(), Some("Insufficient credit"));

        let out = interpret_send_response(500, &Value::Null);
        assert_eq!(out.error.as_deref(), Some("Failed to send message (HTTP 500)"));
    }

    #[test]
    fn test_parse_balance() {
        assert_eq!(parse_balance(&json!({"balance": 120.5})), 120.5);
        assert_eq!(parse_balance(&json!({"balance": "99"})), 99.0);
        assert_eq!(parse_balance(&json!({})), 0.0);
    }

    fn unreachable_gateway() -> FluxSmsGateway {
        FluxSmsGateway::new(GatewayConfig {
            base_url: "http://127.0.0.1:9".into(),
            api_key: "test".into(),
            timeout_secs: 2,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_transport_failure_becomes_outcome() {
        let gw = unreachable_gateway();
        let out = gw.send("0712345678", "hello", Channel::Sms).await;
        assert!(!out.success);
        assert!(out.error.is_some());
    }

    #[tokio::test]
    async fn test_balance_failure_is_zero_with_error() {
        let gw = unreachable_gateway();
        let report = gw.check_balance().await;
        assert_eq!(report.balance, 0.0);
        assert!(report.error.is_some());
    }
}
