//! Notification routing core for check-based monitoring.
//!
//! Given a check state transition, the [`router::Router`] decides which
//! contacts must be told, through which media, and when: tag/rule
//! matching, maintenance-window suppression, and per-(contact, medium,
//! check, state) throttling. Delivery itself is the caller's job; the
//! router only produces [`klaxon_common::types::DispatchInstruction`]
//! values and records what it allowed.

pub mod config;
pub mod entities;
pub mod error;
pub mod maintenance;
pub mod router;
pub mod rules;
pub mod tags;
pub mod throttle;
pub mod timezone;

#[cfg(test)]
mod tests;

pub use config::{MediumIntervals, RouterConfig};
pub use entities::{Check, Contact, EntityRepo, Medium, MediumSpec};
pub use error::RouterError;
pub use maintenance::{MaintenanceTracker, ScheduledMaintenance, UnscheduledMaintenance};
pub use router::Router;
pub use rules::{Rule, RuleMatch, RuleMatcher, TimeRestriction};
pub use tags::TagIndex;
pub use throttle::{NotificationRecord, SuppressionScope, ThrottleEngine};
