use crate::error::{Result, RouterError};
use chrono::{DateTime, Duration, Utc};
use klaxon_common::id;
use klaxon_common::types::CheckId;
use klaxon_store::Store;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

fn scheduled_key(check: &CheckId) -> String {
    format!("scheduled_maintenance:{check}")
}

fn unscheduled_key(check: &CheckId) -> String {
    format!("unscheduled_maintenance:{check}")
}

// Pointer to the at-most-one open unscheduled window per check.
fn open_key(check: &CheckId) -> String {
    format!("unscheduled_open:{check}")
}

/// An operator-planned suppression interval, half-open `[start, end)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledMaintenance {
    pub id: String,
    pub check_id: CheckId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub summary: String,
}

impl ScheduledMaintenance {
    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    pub fn covers(&self, at: DateTime<Utc>) -> bool {
        self.start_time <= at && at < self.end_time
    }
}

/// A reactively-opened suppression interval (e.g. acknowledging an
/// outage). Open while `end_time` is unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnscheduledMaintenance {
    pub id: String,
    pub check_id: CheckId,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub summary: String,
    pub notified: bool,
    pub last_notification_count: u64,
}

impl UnscheduledMaintenance {
    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    pub fn covers(&self, at: DateTime<Utc>) -> bool {
        self.start_time <= at && self.end_time.is_none_or(|end| end > at)
    }
}

/// Tracks scheduled and unscheduled suppression intervals per check and
/// answers "is check C currently suppressed".
#[derive(Clone)]
pub struct MaintenanceTracker {
    store: Arc<dyn Store>,
}

impl MaintenanceTracker {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// True iff any scheduled window with `start <= at < end` or any
    /// unscheduled window with `start <= at` and (no end or `end > at`)
    /// exists for the check.
    pub async fn is_suppressed(&self, check: &CheckId, at: DateTime<Utc>) -> Result<bool> {
        for raw in self.store.hash_get_all(&scheduled_key(check)).await?.values() {
            let window: ScheduledMaintenance = serde_json::from_str(raw)?;
            if window.covers(at) {
                return Ok(true);
            }
        }
        for raw in self
            .store
            .hash_get_all(&unscheduled_key(check))
            .await?
            .values()
        {
            let window: UnscheduledMaintenance = serde_json::from_str(raw)?;
            if window.covers(at) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub async fn create_scheduled(
        &self,
        check: &CheckId,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        summary: &str,
    ) -> Result<ScheduledMaintenance> {
        if end_time <= start_time {
            return Err(RouterError::InvalidConfiguration(format!(
                "scheduled maintenance for '{check}' must end after it starts"
            )));
        }
        let window = ScheduledMaintenance {
            id: id::next_id(),
            check_id: check.clone(),
            start_time,
            end_time,
            summary: summary.to_string(),
        };
        let json = serde_json::to_string(&window)?;
        self.store
            .hash_set(&scheduled_key(check), &window.id, &json)
            .await?;
        tracing::info!(
            check_id = %check,
            window_id = %window.id,
            start = %start_time,
            end = %end_time,
            "scheduled maintenance created"
        );
        Ok(window)
    }

    pub async fn delete_scheduled(&self, check: &CheckId, window_id: &str) -> Result<bool> {
        Ok(self
            .store
            .hash_remove(&scheduled_key(check), window_id)
            .await?)
    }

    /// Removes scheduled windows whose end has passed. Returns how many
    /// were removed.
    pub async fn expire_scheduled(&self, check: &CheckId, at: DateTime<Utc>) -> Result<u32> {
        let mut expired = 0;
        for (field, raw) in self.store.hash_get_all(&scheduled_key(check)).await? {
            let window: ScheduledMaintenance = serde_json::from_str(&raw)?;
            if window.end_time <= at {
                self.store.hash_remove(&scheduled_key(check), &field).await?;
                expired += 1;
            }
        }
        Ok(expired)
    }

    pub async fn list_scheduled(&self, check: &CheckId) -> Result<Vec<ScheduledMaintenance>> {
        let mut windows = Vec::new();
        for raw in self.store.hash_get_all(&scheduled_key(check)).await?.values() {
            windows.push(serde_json::from_str(raw)?);
        }
        windows.sort_by_key(|w: &ScheduledMaintenance| w.start_time);
        Ok(windows)
    }

    /// Opens an unscheduled window. At most one may be open per check;
    /// a second open fails with [`RouterError::Conflict`] and the caller
    /// decides whether to close-then-reopen.
    pub async fn open_unscheduled(
        &self,
        check: &CheckId,
        at: DateTime<Utc>,
        summary: &str,
    ) -> Result<UnscheduledMaintenance> {
        if self.store.get(&open_key(check)).await?.is_some() {
            return Err(RouterError::Conflict {
                check: check.clone(),
            });
        }
        let window = UnscheduledMaintenance {
            id: id::next_id(),
            check_id: check.clone(),
            start_time: at,
            end_time: None,
            summary: summary.to_string(),
            notified: false,
            last_notification_count: 0,
        };
        let json = serde_json::to_string(&window)?;
        self.store
            .hash_set(&unscheduled_key(check), &window.id, &json)
            .await?;
        self.store.set(&open_key(check), &window.id).await?;
        tracing::info!(check_id = %check, window_id = %window.id, "unscheduled maintenance opened");
        Ok(window)
    }

    /// Closes the open unscheduled window by setting its end time.
    /// Idempotent: a no-op when none is open. Closing never triggers
    /// notifications; the next state-change event does.
    pub async fn close_unscheduled(&self, check: &CheckId, at: DateTime<Utc>) -> Result<()> {
        let Some(window_id) = self.store.get(&open_key(check)).await? else {
            return Ok(());
        };
        match self.store.hash_get(&unscheduled_key(check), &window_id).await? {
            Some(raw) => {
                let mut window: UnscheduledMaintenance = serde_json::from_str(&raw)?;
                window.end_time = Some(at);
                let json = serde_json::to_string(&window)?;
                self.store
                    .hash_set(&unscheduled_key(check), &window_id, &json)
                    .await?;
                tracing::info!(check_id = %check, window_id = %window_id, "unscheduled maintenance closed");
            }
            None => {
                tracing::warn!(check_id = %check, window_id = %window_id, "open pointer without window record");
            }
        }
        self.store.delete(&open_key(check)).await?;
        Ok(())
    }

    /// The currently open unscheduled window, if any.
    pub async fn open_unscheduled_window(
        &self,
        check: &CheckId,
    ) -> Result<Option<UnscheduledMaintenance>> {
        let Some(window_id) = self.store.get(&open_key(check)).await? else {
            return Ok(None);
        };
        match self.store.hash_get(&unscheduled_key(check), &window_id).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Marks the open unscheduled window as having been notified about,
    /// bumping its notification count. Returns false when none is open.
    pub async fn mark_notified(&self, check: &CheckId) -> Result<bool> {
        let Some(mut window) = self.open_unscheduled_window(check).await? else {
            return Ok(false);
        };
        window.notified = true;
        window.last_notification_count += 1;
        let json = serde_json::to_string(&window)?;
        self.store
            .hash_set(&unscheduled_key(check), &window.id, &json)
            .await?;
        Ok(true)
    }

    pub async fn list_unscheduled(&self, check: &CheckId) -> Result<Vec<UnscheduledMaintenance>> {
        let mut windows = Vec::new();
        for raw in self
            .store
            .hash_get_all(&unscheduled_key(check))
            .await?
            .values()
        {
            windows.push(serde_json::from_str(raw)?);
        }
        windows.sort_by_key(|w: &UnscheduledMaintenance| w.start_time);
        Ok(windows)
    }
}
