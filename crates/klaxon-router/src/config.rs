use klaxon_common::types::MediumType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// System default timezone (IANA name) used when a contact has none
    /// configured. Falls back to UTC if this is itself invalid.
    #[serde(default = "default_timezone")]
    pub default_timezone: String,

    #[serde(default)]
    pub intervals: MediumIntervals,
}

/// Minimum seconds between repeated notifications for the same
/// (contact, medium, check, state) key, per medium type. Individual media
/// may override their type's interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediumIntervals {
    #[serde(default = "default_email_secs")]
    pub email_secs: u64,
    #[serde(default = "default_sms_secs")]
    pub sms_secs: u64,
    #[serde(default = "default_pagerduty_secs")]
    pub pagerduty_secs: u64,
    #[serde(default = "default_webhook_secs")]
    pub webhook_secs: u64,
}

impl MediumIntervals {
    pub fn for_type(&self, medium_type: MediumType) -> u64 {
        match medium_type {
            MediumType::Email => self.email_secs,
            MediumType::Sms => self.sms_secs,
            MediumType::Pagerduty => self.pagerduty_secs,
            MediumType::Webhook => self.webhook_secs,
        }
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            default_timezone: default_timezone(),
            intervals: MediumIntervals::default(),
        }
    }
}

impl Default for MediumIntervals {
    fn default() -> Self {
        Self {
            email_secs: default_email_secs(),
            sms_secs: default_sms_secs(),
            pagerduty_secs: default_pagerduty_secs(),
            webhook_secs: default_webhook_secs(),
        }
    }
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_email_secs() -> u64 {
    900
}

fn default_sms_secs() -> u64 {
    60
}

fn default_pagerduty_secs() -> u64 {
    180
}

fn default_webhook_secs() -> u64 {
    300
}
