use crate::config::MediumIntervals;
use crate::entities::Medium;
use crate::error::Result;
use chrono::{DateTime, Duration, Utc};
use klaxon_common::types::{CheckId, CheckState, MediumType, Severity};
use klaxon_store::Store;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub(crate) fn suppressions_key(contact_id: &str) -> String {
    format!("suppressions:{contact_id}")
}

// Records for one (check, state) share a hash so a state-change reset
// drops the whole key space in one operation.
fn records_key(check: &CheckId, state: CheckState) -> String {
    format!("notification_records:{check}:{state}")
}

fn record_field(contact_id: &str, medium_id: &str) -> String {
    format!("{contact_id}:{medium_id}")
}

/// Scope of a notification suppression flag for one contact. Every unset
/// field is a wildcard; all unset is the contact-wide "drop all" flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppressionScope {
    #[serde(default)]
    pub medium: Option<MediumType>,
    #[serde(default)]
    pub check: Option<CheckId>,
    #[serde(default)]
    pub state: Option<CheckState>,
}

impl SuppressionScope {
    /// The contact-wide flag: drops everything.
    pub fn drop_all() -> Self {
        Self {
            medium: None,
            check: None,
            state: None,
        }
    }

    pub fn covers(&self, medium: MediumType, check: &CheckId, state: CheckState) -> bool {
        self.medium.is_none_or(|m| m == medium)
            && self.check.as_ref().is_none_or(|c| c == check)
            && self.state.is_none_or(|s| s == state)
    }
}

/// Last-sent bookkeeping for one (contact, medium, check, state) key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub last_sent_at: DateTime<Utc>,
    pub count: u64,
}

/// Decides whether a notification is allowed now, given suppression flags,
/// notification history, and configured intervals.
///
/// The engine never records a send on its own: the caller invokes
/// [`ThrottleEngine::record_sent`] after dispatch scheduling succeeds, so
/// an allow that was never recorded is simply reissued on the next event
/// (at-least-once, favoring over-notification over silent drops).
#[derive(Clone)]
pub struct ThrottleEngine {
    store: Arc<dyn Store>,
    intervals: MediumIntervals,
}

impl ThrottleEngine {
    pub fn new(store: Arc<dyn Store>, intervals: MediumIntervals) -> Self {
        Self { store, intervals }
    }

    pub async fn set_suppression(&self, contact_id: &str, scope: &SuppressionScope) -> Result<()> {
        let member = serde_json::to_string(scope)?;
        self.store
            .set_add(&suppressions_key(contact_id), &member)
            .await?;
        Ok(())
    }

    pub async fn clear_suppression(
        &self,
        contact_id: &str,
        scope: &SuppressionScope,
    ) -> Result<bool> {
        let member = serde_json::to_string(scope)?;
        Ok(self
            .store
            .set_remove(&suppressions_key(contact_id), &member)
            .await?)
    }

    /// Current suppression flags for a contact, for introspection.
    pub async fn suppressions(&self, contact_id: &str) -> Result<Vec<SuppressionScope>> {
        let mut scopes = Vec::new();
        for member in self.store.set_members(&suppressions_key(contact_id)).await? {
            match serde_json::from_str(&member) {
                Ok(scope) => scopes.push(scope),
                Err(_) => {
                    tracing::warn!(contact_id, member = %member, "unparseable suppression flag ignored");
                }
            }
        }
        Ok(scopes)
    }

    async fn is_dropped(
        &self,
        contact_id: &str,
        medium: MediumType,
        check: &CheckId,
        state: CheckState,
    ) -> Result<bool> {
        for scope in self.suppressions(contact_id).await? {
            if scope.covers(medium, check, state) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Whether a notification may go out now for this key.
    ///
    /// Denies on any covering suppression flag, then rate-limits against
    /// the key's [`NotificationRecord`]: absent means the first
    /// notification for this state and always passes; present passes only
    /// once the medium's interval has elapsed since the last send.
    pub async fn allow(
        &self,
        contact_id: &str,
        medium: &Medium,
        check: &CheckId,
        state: CheckState,
        severity: Severity,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        if self
            .is_dropped(contact_id, medium.spec.medium_type(), check, state)
            .await?
        {
            tracing::debug!(
                contact_id,
                medium_id = %medium.id,
                check_id = %check,
                state = %state,
                "notification dropped (suppression flag)"
            );
            return Ok(false);
        }

        match self.record(contact_id, &medium.id, check, state).await? {
            None => Ok(true),
            Some(record) => {
                let interval = medium.effective_interval(&self.intervals);
                let allowed = at - record.last_sent_at >= Duration::seconds(interval as i64);
                if !allowed {
                    tracing::debug!(
                        contact_id,
                        medium_id = %medium.id,
                        check_id = %check,
                        state = %state,
                        severity = %severity,
                        interval_secs = interval,
                        "notification throttled"
                    );
                }
                Ok(allowed)
            }
        }
    }

    /// The stored record for one key, for introspection and rate
    /// decisions.
    pub async fn record(
        &self,
        contact_id: &str,
        medium_id: &str,
        check: &CheckId,
        state: CheckState,
    ) -> Result<Option<NotificationRecord>> {
        match self
            .store
            .hash_get(&records_key(check, state), &record_field(contact_id, medium_id))
            .await?
        {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Records a send for future throttle decisions. Called by the
    /// routing coordinator after dispatch scheduling, never by
    /// [`ThrottleEngine::allow`] itself.
    pub async fn record_sent(
        &self,
        contact_id: &str,
        medium_id: &str,
        check: &CheckId,
        state: CheckState,
        at: DateTime<Utc>,
    ) -> Result<()> {
        // Read-modify-write is safe here: cycles for one check are
        // serialized by the coordinator, and the key embeds the check.
        let count = self
            .record(contact_id, medium_id, check, state)
            .await?
            .map_or(0, |r| r.count);
        let record = NotificationRecord {
            last_sent_at: at,
            count: count + 1,
        };
        let json = serde_json::to_string(&record)?;
        self.store
            .hash_set(&records_key(check, state), &record_field(contact_id, medium_id), &json)
            .await?;
        Ok(())
    }

    /// Abandons the throttle key space for a state the check has left,
    /// so a transition back into it starts fresh.
    pub async fn reset_state(&self, check: &CheckId, state: CheckState) -> Result<()> {
        self.store.delete(&records_key(check, state)).await?;
        Ok(())
    }
}
