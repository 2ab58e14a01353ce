//! Messaging sink configuration. Credentials are optional; without them
//! the session runs silently and notes the fact in its summary.

use std::env;

#[derive(Debug, Clone, Default)]
pub struct MessagingConfig {
    pub bot_token: String,
    pub chat_id: String,
    pub send_timeout_secs: u64,
}

impl MessagingConfig {
    pub fn from_env() -> Self {
        Self {
            bot_token: env::var("TELEGRAM_BOT_TOKEN").unwrap_or_default(),
            chat_id: env::var("TELEGRAM_CHAT_ID").unwrap_or_default(),
            send_timeout_secs: env::var("MESSAGING_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.bot_token.is_empty() && !self.chat_id.is_empty()
    }
}
