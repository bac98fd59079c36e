//! Chat limits.

use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct ChatConfig {
    pub max_message_len: usize,
    pub rate_limit_max_messages: u32,
    pub rate_limit_window: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_message_len: 500,
            rate_limit_max_messages: 50,
            rate_limit_window: Duration::from_secs(60),
        }
    }
}
