use crate::config::RouterConfig;
use crate::entities::EntityRepo;
use crate::error::Result;
use crate::maintenance::MaintenanceTracker;
use crate::rules::{RuleMatch, RuleMatcher};
use crate::throttle::ThrottleEngine;
use chrono::{DateTime, Utc};
use klaxon_common::types::{CheckId, CheckState, DispatchInstruction, Severity};
use klaxon_store::Store;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Orchestrates one state-change event end to end: candidate contacts,
/// maintenance veto, rule resolution, throttling, and the recording of
/// sends for future throttle decisions.
///
/// Routing for different checks may run fully in parallel; cycles for the
/// same check are serialized by a per-check lock held for the whole
/// resolve-then-record cycle. Maintenance open/close takes the same lock.
pub struct Router {
    repo: EntityRepo,
    maintenance: MaintenanceTracker,
    matcher: RuleMatcher,
    throttle: ThrottleEngine,
    check_locks: Mutex<HashMap<CheckId, Arc<Mutex<()>>>>,
}

impl Router {
    pub fn new(store: Arc<dyn Store>, config: RouterConfig) -> Self {
        let repo = EntityRepo::new(store.clone());
        let maintenance = MaintenanceTracker::new(store.clone());
        let matcher = RuleMatcher::new(repo.clone(), config.default_timezone.clone());
        let throttle = ThrottleEngine::new(store, config.intervals.clone());
        Self {
            repo,
            maintenance,
            matcher,
            throttle,
            check_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn repo(&self) -> &EntityRepo {
        &self.repo
    }

    pub fn maintenance(&self) -> &MaintenanceTracker {
        &self.maintenance
    }

    pub fn throttle(&self) -> &ThrottleEngine {
        &self.throttle
    }

    async fn check_lock(&self, check: &CheckId) -> Arc<Mutex<()>> {
        self.check_locks
            .lock()
            .await
            .entry(check.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Routes one state-change event, returning the ordered dispatch
    /// instructions the delivery subsystem must act on.
    ///
    /// Repeated events reporting the same state are no-ops. On a genuine
    /// transition, every contact associated with the check (directly or
    /// via rule tags) is evaluated: maintenance suppression vetoes the
    /// whole check upstream of rate limiting, a blackhole rule match
    /// vetoes the contact, and the throttle engine vetoes individual
    /// media. Surviving sends are recorded, and the old state's throttle
    /// key space is abandoned so a later return to it starts fresh.
    ///
    /// Throttle mutations are staged until every contact has resolved, so
    /// a store failure mid-evaluation aborts the cycle with nothing
    /// recorded. The caller must not re-invoke routing on transient
    /// delivery failure; redelivery belongs to the transport layer.
    ///
    /// # Errors
    ///
    /// [`crate::error::RouterError::NotFound`] when the check or a
    /// referenced contact/rule/medium is absent;
    /// [`crate::error::RouterError::Store`] when the store fails, in which
    /// case nothing was notified and the whole cycle may be retried.
    pub async fn route_state_change(
        &self,
        check_id: &CheckId,
        old_state: CheckState,
        new_state: CheckState,
        severity: Severity,
        at: DateTime<Utc>,
    ) -> Result<Vec<DispatchInstruction>> {
        if old_state == new_state {
            tracing::debug!(check_id = %check_id, state = %new_state, "repeated state, nothing to route");
            return Ok(Vec::new());
        }

        let lock = self.check_lock(check_id).await;
        let _cycle = lock.lock().await;

        let check = self.repo.get_check(check_id).await?;

        if self.maintenance.is_suppressed(check_id, at).await? {
            tracing::info!(
                check_id = %check_id,
                old = %old_state,
                new = %new_state,
                "transition suppressed (maintenance window active)"
            );
            return Ok(Vec::new());
        }

        // Candidates: directly associated contacts plus owners of rules
        // sharing a tag with the check. BTreeSet keeps the dispatch list
        // ordering deterministic.
        let mut contact_ids = self.repo.contacts_for(check_id).await?;
        for tag in &check.tags {
            for rule_id in self.repo.tags().find_rules_for_tag(tag).await? {
                let rule = self.repo.get_rule(&rule_id).await?;
                contact_ids.insert(rule.contact_id);
            }
        }

        let mut dispatches = Vec::new();
        let mut sent: Vec<(String, String)> = Vec::new();
        for contact_id in &contact_ids {
            let contact = self.repo.get_contact(contact_id).await?;
            let matches = self
                .matcher
                .resolve(&contact, &check, new_state, severity, at)
                .await?;
            if matches.is_empty() {
                continue;
            }
            if matches.iter().any(RuleMatch::is_blackhole) {
                tracing::debug!(contact_id = %contact_id, check_id = %check_id, "contact blackholed");
                continue;
            }
            for medium in RuleMatcher::media_union(&matches) {
                if self
                    .throttle
                    .allow(contact_id, &medium, check_id, new_state, severity, at)
                    .await?
                {
                    dispatches.push(DispatchInstruction {
                        contact_id: contact_id.clone(),
                        medium_id: medium.id.clone(),
                        medium_type: medium.spec.medium_type(),
                        address: medium.spec.address().to_string(),
                        check_id: check_id.clone(),
                        state: new_state,
                        severity,
                        at,
                    });
                    sent.push((contact_id.clone(), medium.id));
                }
            }
        }

        // Apply phase: the first throttle mutation happens only after
        // every contact has resolved.
        self.throttle.reset_state(check_id, old_state).await?;
        for (contact_id, medium_id) in sent {
            self.throttle
                .record_sent(&contact_id, &medium_id, check_id, new_state, at)
                .await?;
        }

        tracing::info!(
            check_id = %check_id,
            old = %old_state,
            new = %new_state,
            dispatches = dispatches.len(),
            "routed state change"
        );
        Ok(dispatches)
    }

    /// Opens an unscheduled maintenance window for a check, serialized
    /// against routing cycles for the same check.
    ///
    /// # Errors
    ///
    /// [`crate::error::RouterError::NotFound`] when the check is unknown;
    /// [`crate::error::RouterError::Conflict`] when a window is already
    /// open.
    pub async fn open_unscheduled_maintenance(
        &self,
        check_id: &CheckId,
        at: DateTime<Utc>,
        summary: &str,
    ) -> Result<String> {
        let lock = self.check_lock(check_id).await;
        let _guard = lock.lock().await;
        self.repo.get_check(check_id).await?;
        let window = self.maintenance.open_unscheduled(check_id, at, summary).await?;
        Ok(window.id)
    }

    /// Closes the open unscheduled maintenance window for a check, if
    /// any. Idempotent.
    pub async fn close_unscheduled_maintenance(
        &self,
        check_id: &CheckId,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let lock = self.check_lock(check_id).await;
        let _guard = lock.lock().await;
        self.maintenance.close_unscheduled(check_id, at).await
    }

    /// Which of a contact's rules would match an event, for operator
    /// introspection. Does not touch throttle state.
    pub async fn matched_rules(
        &self,
        contact_id: &str,
        check_id: &CheckId,
        state: CheckState,
        severity: Severity,
        at: DateTime<Utc>,
    ) -> Result<Vec<RuleMatch>> {
        let contact = self.repo.get_contact(contact_id).await?;
        let check = self.repo.get_check(check_id).await?;
        self.matcher.resolve(&contact, &check, state, severity, at).await
    }
}
