use crate::entities::{Check, Contact, EntityRepo, Medium};
use crate::error::Result;
use crate::tags::TagIndex;
use crate::timezone;
use chrono::{DateTime, Datelike, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use klaxon_common::types::{CheckState, Severity};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// A weekly recurring window during which a rule applies, evaluated in
/// the contact's timezone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeRestriction {
    /// Days the window applies to; empty means every day.
    #[serde(with = "weekday_names", default)]
    pub days: Vec<Weekday>,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeRestriction {
    /// Whether the window covers the given instant in `tz`. Windows with
    /// `end < start` wrap past midnight, anchored to the local day
    /// containing the instant.
    pub fn contains(&self, at: DateTime<Utc>, tz: Tz) -> bool {
        let local = at.with_timezone(&tz);
        if !self.days.is_empty() && !self.days.contains(&local.weekday()) {
            return false;
        }
        let t = local.time();
        if self.start <= self.end {
            t >= self.start && t <= self.end
        } else {
            // Overnight window (e.g. 23:00 - 03:00)
            t >= self.start || t <= self.end
        }
    }
}

// Weekdays stored as their short names ("Mon".."Sun") so rule JSON stays
// readable in the store.
mod weekday_names {
    use chrono::Weekday;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(days: &[Weekday], serializer: S) -> Result<S::Ok, S::Error> {
        let names: Vec<String> = days.iter().map(|d| d.to_string()).collect();
        names.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Weekday>, D::Error> {
        let names = Vec::<String>::deserialize(deserializer)?;
        names
            .iter()
            .map(|n| {
                n.parse::<Weekday>()
                    .map_err(|_| serde::de::Error::custom(format!("invalid weekday: {n}")))
            })
            .collect()
    }
}

/// A contact-owned filter authorizing notification via specific media.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub contact_id: String,
    /// Empty set matches every check for the owning contact.
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Empty set allows every severity.
    #[serde(default)]
    pub severities: BTreeSet<Severity>,
    #[serde(default)]
    pub time_restrictions: Vec<TimeRestriction>,
    #[serde(default)]
    pub media_ids: Vec<String>,
    /// A blackhole rule matches but suppresses notification entirely.
    #[serde(default)]
    pub blackhole: bool,
}

impl Rule {
    pub fn allows_severity(&self, severity: Severity) -> bool {
        self.severities.is_empty() || self.severities.contains(&severity)
    }

    /// True when no restriction is configured or any window covers `at`.
    pub fn in_time_restrictions(&self, at: DateTime<Utc>, tz: Tz) -> bool {
        self.time_restrictions.is_empty()
            || self.time_restrictions.iter().any(|r| r.contains(at, tz))
    }
}

/// One rule resolved against one check: the rule and the media it
/// authorizes. A blackhole match carries zero media. This is a value, not
/// stored state.
#[derive(Debug, Clone)]
pub struct RuleMatch {
    pub rule: Rule,
    pub media: Vec<Medium>,
}

impl RuleMatch {
    pub fn is_blackhole(&self) -> bool {
        self.rule.blackhole
    }
}

/// Determines which of a contact's rules apply to a check's state-change
/// event and which media they authorize.
#[derive(Clone)]
pub struct RuleMatcher {
    repo: EntityRepo,
    default_timezone: String,
}

impl RuleMatcher {
    pub fn new(repo: EntityRepo, default_timezone: String) -> Self {
        Self {
            repo,
            default_timezone,
        }
    }

    /// Resolves a contact's rules against one event, in the contact's
    /// rule insertion order:
    ///
    /// 1. tag match (empty rule tag set matches everything)
    /// 2. severity filter (unset allows all)
    /// 3. time restriction in the contact's timezone
    /// 4. first matching blackhole rule wins and stops evaluation
    /// 5. otherwise the rule contributes its authorized media
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::RouterError::NotFound`] when a rule
    /// references a medium that no longer exists.
    pub async fn resolve(
        &self,
        contact: &Contact,
        check: &Check,
        state: CheckState,
        severity: Severity,
        at: DateTime<Utc>,
    ) -> Result<Vec<RuleMatch>> {
        let tz = timezone::resolve(contact.timezone.as_deref(), &self.default_timezone);
        let mut matches = Vec::new();
        for rule in self.repo.contact_rules(&contact.id).await? {
            if !TagIndex::matches(&rule.tags, &check.tags) {
                continue;
            }
            if !rule.allows_severity(severity) {
                continue;
            }
            if !rule.in_time_restrictions(at, tz) {
                tracing::debug!(
                    rule_id = %rule.id,
                    contact_id = %contact.id,
                    "rule outside its time restrictions"
                );
                continue;
            }
            if rule.blackhole {
                tracing::debug!(
                    rule_id = %rule.id,
                    contact_id = %contact.id,
                    check_id = %check.id,
                    state = %state,
                    "blackhole rule matched"
                );
                matches.push(RuleMatch {
                    rule,
                    media: Vec::new(),
                });
                break;
            }
            let mut media = Vec::with_capacity(rule.media_ids.len());
            for medium_id in &rule.media_ids {
                media.push(self.repo.get_medium(medium_id).await?);
            }
            matches.push(RuleMatch { rule, media });
        }
        Ok(matches)
    }

    /// Union of authorized media across matches, deduplicated by medium
    /// identity, preserving first-seen order. A medium is notified at
    /// most once per event regardless of how many rules authorized it.
    pub fn media_union(matches: &[RuleMatch]) -> Vec<Medium> {
        let mut seen = HashSet::new();
        let mut union = Vec::new();
        for m in matches {
            for medium in &m.media {
                if seen.insert(medium.id.clone()) {
                    union.push(medium.clone());
                }
            }
        }
        union
    }
}
