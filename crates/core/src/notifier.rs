//! Booking notifications for business owners.

use crate::{appointments::Appointment, error::NotifyError};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::info;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    NewBooking,
    Cancellation,
}

/// Renders the Markdown message sent to the owner.
pub fn render_notification(kind: NotificationKind, appointment: &Appointment) -> String {
    let date = appointment.starts_at.format("%A, %B %-d");
    let time = appointment.starts_at.format("%-I:%M %p");

    match kind {
        NotificationKind::NewBooking => {
            let notes = appointment
                .notes
                .as_deref()
                .map(|n| format!("\n💬 Notes: {n}"))
                .unwrap_or_default();
            format!(
                "🔔 *New Appointment Booked!*\n\n\
                 👤 Customer: {}\n\
                 📞 Phone: {}\n\
                 ✂️ Service: {}\n\
                 🕐 Time: {date} at {time}\n\
                 ⏱️ Duration: {} minutes{notes}\n\n\
                 📱 Reply with /confirm or /cancel to manage",
                appointment.customer_name,
                appointment.customer_phone,
                appointment.service,
                appointment.duration_minutes,
            )
        }
        NotificationKind::Cancellation => format!(
            "❌ *Appointment Cancelled*\n\n\
             👤 Customer: {}\n\
             📞 Phone: {}\n\
             🕐 Was scheduled for: {date} at {time}",
            appointment.customer_name, appointment.customer_phone,
        ),
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        chat_id: &str,
        kind: NotificationKind,
        appointment: &Appointment,
    ) -> Result<(), NotifyError>;
}

/// Sends notifications through the Telegram Bot API.
pub struct TelegramNotifier {
    client: reqwest::Client,
    bot_token: SecretString,
    api_base: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: SecretString) -> Self {
        Self::with_api_base(bot_token, TELEGRAM_API_BASE)
    }

    pub fn with_api_base(bot_token: SecretString, api_base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            bot_token,
            api_base: api_base.into(),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(
        &self,
        chat_id: &str,
        kind: NotificationKind,
        appointment: &Appointment,
    ) -> Result<(), NotifyError> {
        let url = format!(
            "{}/bot{}/sendMessage",
            self.api_base.trim_end_matches('/'),
            self.bot_token.expose_secret()
        );
        let response = self
            .client
            .post(url)
            .json(&json!({
                "chat_id": chat_id,
                "text": render_notification(kind, appointment),
                "parse_mode": "Markdown",
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotifyError::Rejected(response.status()));
        }
        Ok(())
    }
}

/// Writes notifications to the log when no bot token is configured.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(
        &self,
        chat_id: &str,
        kind: NotificationKind,
        appointment: &Appointment,
    ) -> Result<(), NotifyError> {
        info!(
            chat_id,
            ?kind,
            appointment_id = %appointment.id,
            "Telegram bot token not configured, notification logged only"
        );
        Ok(())
    }
}
