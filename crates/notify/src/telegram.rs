use anyhow::{Context, Result};
use async_trait::async_trait;
use gmxlp_core::{Alert, Notifier, TelegramConfig};
use reqwest::Client;

/// Delivers alerts to a Telegram chat via the bot API.
pub struct TelegramNotifier {
    http_client: Client,
    bot_token: String,
    chat_id: String,
    enabled: bool,
}

impl TelegramNotifier {
    #[must_use]
    pub fn new(config: &TelegramConfig) -> Self {
        let enabled = config.enabled && !config.bot_token.is_empty() && !config.chat_id.is_empty();
        if config.enabled && !enabled {
            tracing::warn!("telegram enabled but bot_token or chat_id missing, disabling");
        }

        Self {
            http_client: Client::new(),
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
            enabled,
        }
    }

    async fn send(&self, text: String) -> Result<()> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let body = serde_json::json!({
            "chat_id": self.chat_id,
            "text": text,
            "parse_mode": "HTML",
        });

        let response = self
            .http_client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("telegram sendMessage request failed")?;
        response
            .error_for_status()
            .context("telegram sendMessage rejected")?;

        Ok(())
    }

    fn format(alert: &Alert) -> String {
        let scope = alert.market_key.as_deref().unwrap_or("portfolio");
        format!(
            "{} <b>{:?} / {:?}</b>\n{}\nmeasured {:.4} vs threshold {:.4}\n<i>{scope}</i>",
            alert.emoji(),
            alert.severity,
            alert.category,
            alert.message,
            alert.value,
            alert.threshold,
        )
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, alert: &Alert) -> Result<()> {
        if !self.enabled {
            tracing::debug!(message = %alert.message, "telegram disabled, alert not sent");
            return Ok(());
        }
        self.send(Self::format(alert)).await
    }
}

/// Notifier that only writes to the log. Used for dry runs and as the
/// fallback when Telegram is not configured.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, alert: &Alert) -> Result<()> {
        match alert.severity {
            gmxlp_core::AlertSeverity::Critical => {
                tracing::error!(category = ?alert.category, market = ?alert.market_key, "{}", alert.message);
            }
            gmxlp_core::AlertSeverity::Warning => {
                tracing::warn!(category = ?alert.category, market = ?alert.market_key, "{}", alert.message);
            }
            gmxlp_core::AlertSeverity::Info => {
                tracing::info!(category = ?alert.category, market = ?alert.market_key, "{}", alert.message);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use gmxlp_core::{AlertCategory, AlertSeverity};

    #[test]
    fn disabled_when_credentials_missing() {
        let notifier = TelegramNotifier::new(&TelegramConfig {
            enabled: true,
            bot_token: String::new(),
            chat_id: "123".to_string(),
        });
        assert!(!notifier.enabled);
    }

    #[test]
    fn formats_portfolio_scope_for_nullable_market() {
        let alert = Alert {
            severity: AlertSeverity::Critical,
            category: AlertCategory::StopLoss,
            market_key: None,
            message: "portfolio loss 20.0% breaches stop-loss".to_string(),
            value: 0.2,
            threshold: 0.15,
            timestamp: Utc::now(),
        };
        let text = TelegramNotifier::format(&alert);
        assert!(text.contains("portfolio"));
        assert!(text.contains("StopLoss"));
        assert!(text.contains("0.2000"));
    }

    #[tokio::test]
    async fn disabled_notifier_is_a_no_op() {
        let notifier = TelegramNotifier::new(&TelegramConfig::default());
        let alert = Alert {
            severity: AlertSeverity::Info,
            category: AlertCategory::Drawdown,
            market_key: Some("eth".to_string()),
            message: "test".to_string(),
            value: 0.0,
            threshold: 0.0,
            timestamp: Utc::now(),
        };
        assert!(notifier.notify(&alert).await.is_ok());
    }
}
