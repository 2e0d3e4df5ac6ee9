use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// State reported for a monitored check.
///
/// Any state may follow any other; the router only acts on genuine
/// transitions (`old != new`).
///
/// # Examples
///
/// ```
/// use klaxon_common::types::CheckState;
///
/// let state: CheckState = "critical".parse().unwrap();
/// assert_eq!(state, CheckState::Critical);
/// assert_eq!(state.to_string(), "critical");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckState {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl std::fmt::Display for CheckState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckState::Ok => write!(f, "ok"),
            CheckState::Warning => write!(f, "warning"),
            CheckState::Critical => write!(f, "critical"),
            CheckState::Unknown => write!(f, "unknown"),
        }
    }
}

impl std::str::FromStr for CheckState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ok" => Ok(CheckState::Ok),
            "warning" => Ok(CheckState::Warning),
            "critical" => Ok(CheckState::Critical),
            "unknown" => Ok(CheckState::Unknown),
            _ => Err(format!("unknown check state: {s}")),
        }
    }
}

/// Severity attached to a state-change event.
///
/// Mirrors the check-state vocabulary but is carried separately: rules
/// filter on sets of severities, so no ordering is imposed beyond what
/// `Ord` needs for set storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl From<CheckState> for Severity {
    fn from(state: CheckState) -> Self {
        match state {
            CheckState::Ok => Severity::Ok,
            CheckState::Warning => Severity::Warning,
            CheckState::Critical => Severity::Critical,
            CheckState::Unknown => Severity::Unknown,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Ok => write!(f, "ok"),
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
            Severity::Unknown => write!(f, "unknown"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ok" => Ok(Severity::Ok),
            "warning" => Ok(Severity::Warning),
            "critical" => Ok(Severity::Critical),
            "unknown" => Ok(Severity::Unknown),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

/// The kind of notification channel a medium delivers through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediumType {
    Email,
    Sms,
    Pagerduty,
    Webhook,
}

impl std::fmt::Display for MediumType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediumType::Email => write!(f, "email"),
            MediumType::Sms => write!(f, "sms"),
            MediumType::Pagerduty => write!(f, "pagerduty"),
            MediumType::Webhook => write!(f, "webhook"),
        }
    }
}

impl std::str::FromStr for MediumType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "email" => Ok(MediumType::Email),
            "sms" => Ok(MediumType::Sms),
            "pagerduty" => Ok(MediumType::Pagerduty),
            "webhook" => Ok(MediumType::Webhook),
            _ => Err(format!("unknown medium type: {s}")),
        }
    }
}

/// Identifier of a monitored check, in `entity:check` form
/// (e.g. `db01:disk`).
///
/// # Examples
///
/// ```
/// use klaxon_common::types::CheckId;
///
/// let id = CheckId::new("db01", "disk");
/// assert_eq!(id.as_str(), "db01:disk");
/// assert_eq!(id.entity(), "db01");
/// assert_eq!(id.check_name(), "disk");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckId(String);

impl CheckId {
    pub fn new(entity: &str, check_name: &str) -> Self {
        Self(format!("{entity}:{check_name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The entity part (before the first `:`). The whole identifier if no
    /// separator is present.
    pub fn entity(&self) -> &str {
        self.0.split_once(':').map_or(self.0.as_str(), |(e, _)| e)
    }

    /// The check-name part (after the first `:`), or the empty string if
    /// no separator is present.
    pub fn check_name(&self) -> &str {
        self.0.split_once(':').map_or("", |(_, c)| c)
    }
}

impl std::fmt::Display for CheckId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CheckId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CheckId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One routing decision: notify `contact_id` through `medium_id` about
/// `check_id` entering `state`.
///
/// Instructions are values handed to the delivery subsystem; the router
/// never retries or re-issues them on delivery failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchInstruction {
    pub contact_id: String,
    pub medium_id: String,
    pub medium_type: MediumType,
    /// Delivery address for the medium (email address, phone number,
    /// service key, or URL).
    pub address: String,
    pub check_id: CheckId,
    pub state: CheckState,
    pub severity: Severity,
    pub at: DateTime<Utc>,
}
