use crate::config::MediumIntervals;
use crate::error::{Result, RouterError};
use crate::rules::Rule;
use crate::tags::TagIndex;
use crate::throttle;
use klaxon_common::types::{CheckId, CheckState, MediumType};
use klaxon_store::Store;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

fn contact_key(id: &str) -> String {
    format!("contact:{id}")
}

fn contact_media_key(id: &str) -> String {
    format!("contact_media:{id}")
}

fn contact_rules_key(id: &str) -> String {
    format!("contact_rules:{id}")
}

fn medium_key(id: &str) -> String {
    format!("medium:{id}")
}

fn rule_key(id: &str) -> String {
    format!("rule:{id}")
}

fn check_key(id: &CheckId) -> String {
    format!("check:{id}")
}

fn contacts_for_key(check: &CheckId) -> String {
    format!("contacts_for:{check}")
}

/// A person (or escalation target) that can be notified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub name: String,
    /// IANA timezone name used to evaluate rule time restrictions.
    /// `None` falls back to the configured system default.
    pub timezone: Option<String>,
}

/// Type-specific delivery configuration for a medium.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MediumSpec {
    Email {
        address: String,
    },
    Sms {
        number: String,
    },
    Pagerduty {
        service_key: String,
        subdomain: Option<String>,
        username: Option<String>,
        password: Option<String>,
    },
    Webhook {
        url: String,
    },
}

impl MediumSpec {
    pub fn medium_type(&self) -> MediumType {
        match self {
            MediumSpec::Email { .. } => MediumType::Email,
            MediumSpec::Sms { .. } => MediumType::Sms,
            MediumSpec::Pagerduty { .. } => MediumType::Pagerduty,
            MediumSpec::Webhook { .. } => MediumType::Webhook,
        }
    }

    /// The deliverable address shape common to all types.
    pub fn address(&self) -> &str {
        match self {
            MediumSpec::Email { address } => address,
            MediumSpec::Sms { number } => number,
            MediumSpec::Pagerduty { service_key, .. } => service_key,
            MediumSpec::Webhook { url } => url,
        }
    }
}

/// A notification channel owned by exactly one contact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medium {
    pub id: String,
    pub contact_id: String,
    pub spec: MediumSpec,
    /// Overrides the per-type default notification interval when set.
    #[serde(default)]
    pub interval_override: Option<u64>,
}

impl Medium {
    /// Minimum seconds between repeated notifications through this medium
    /// for the same check+state.
    pub fn effective_interval(&self, intervals: &MediumIntervals) -> u64 {
        self.interval_override
            .unwrap_or_else(|| intervals.for_type(self.spec.medium_type()))
    }
}

/// A monitored check as this core sees it: identifier, last known state,
/// and tag set. The state is owned by the monitoring subsystem; this core
/// only reads it.
#[derive(Debug, Clone)]
pub struct Check {
    pub id: CheckId,
    pub state: CheckState,
    pub tags: BTreeSet<String>,
}

/// Reads and writes routing entities through the key-value store.
///
/// Layout follows the store's hash/set/list primitives: contacts are
/// hashes, media and rules are JSON scalars referenced from per-contact
/// ordered lists (rule evaluation order is insertion order), check/contact
/// association is a membership set per check.
#[derive(Clone)]
pub struct EntityRepo {
    store: Arc<dyn Store>,
    tags: TagIndex,
}

impl EntityRepo {
    pub fn new(store: Arc<dyn Store>) -> Self {
        let tags = TagIndex::new(store.clone());
        Self { store, tags }
    }

    pub fn tags(&self) -> &TagIndex {
        &self.tags
    }

    pub async fn create_contact(&self, contact: &Contact) -> Result<()> {
        let key = contact_key(&contact.id);
        self.store.hash_set(&key, "name", &contact.name).await?;
        if let Some(tz) = &contact.timezone {
            self.store.hash_set(&key, "timezone", tz).await?;
        }
        Ok(())
    }

    pub async fn get_contact(&self, id: &str) -> Result<Contact> {
        let fields = self.store.hash_get_all(&contact_key(id)).await?;
        if fields.is_empty() {
            return Err(RouterError::NotFound {
                entity: "contact",
                id: id.to_string(),
            });
        }
        Ok(Contact {
            id: id.to_string(),
            name: fields.get("name").cloned().unwrap_or_default(),
            timezone: fields.get("timezone").cloned(),
        })
    }

    /// Deletes a contact and, synchronously, everything it owns: media,
    /// rules (with their tag-index entries), and suppression flags.
    pub async fn delete_contact(&self, id: &str) -> Result<()> {
        self.get_contact(id).await?;

        for medium_id in self.store.list_all(&contact_media_key(id)).await? {
            self.store.delete(&medium_key(&medium_id)).await?;
        }
        self.store.delete(&contact_media_key(id)).await?;

        for rule_id in self.store.list_all(&contact_rules_key(id)).await? {
            self.tags.clear_rule_tags(&rule_id).await?;
            self.store.delete(&rule_key(&rule_id)).await?;
        }
        self.store.delete(&contact_rules_key(id)).await?;

        self.store.delete(&throttle::suppressions_key(id)).await?;
        self.store.delete(&contact_key(id)).await?;
        Ok(())
    }

    pub async fn add_medium(&self, medium: &Medium) -> Result<()> {
        self.get_contact(&medium.contact_id).await?;
        let json = serde_json::to_string(medium)?;
        self.store.set(&medium_key(&medium.id), &json).await?;
        self.store
            .list_push(&contact_media_key(&medium.contact_id), &medium.id)
            .await?;
        Ok(())
    }

    pub async fn get_medium(&self, id: &str) -> Result<Medium> {
        let raw = self
            .store
            .get(&medium_key(id))
            .await?
            .ok_or_else(|| RouterError::NotFound {
                entity: "medium",
                id: id.to_string(),
            })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// A contact's media in insertion order.
    pub async fn contact_media(&self, contact_id: &str) -> Result<Vec<Medium>> {
        let ids = self.store.list_all(&contact_media_key(contact_id)).await?;
        let mut media = Vec::with_capacity(ids.len());
        for id in ids {
            media.push(self.get_medium(&id).await?);
        }
        Ok(media)
    }

    pub async fn remove_medium(&self, id: &str) -> Result<()> {
        let medium = self.get_medium(id).await?;
        self.store
            .list_remove(&contact_media_key(&medium.contact_id), id)
            .await?;
        self.store.delete(&medium_key(id)).await?;
        Ok(())
    }

    /// Adds a rule to its owning contact's rule list (evaluation order is
    /// insertion order) and indexes its tags.
    pub async fn add_rule(&self, rule: &Rule) -> Result<()> {
        self.get_contact(&rule.contact_id).await?;
        for medium_id in &rule.media_ids {
            let medium = self.get_medium(medium_id).await?;
            if medium.contact_id != rule.contact_id {
                return Err(RouterError::InvalidConfiguration(format!(
                    "rule '{}' references medium '{}' owned by another contact",
                    rule.id, medium_id
                )));
            }
        }
        let json = serde_json::to_string(rule)?;
        self.store.set(&rule_key(&rule.id), &json).await?;
        self.store
            .list_push(&contact_rules_key(&rule.contact_id), &rule.id)
            .await?;
        for tag in &rule.tags {
            self.tags.tag_rule(&rule.id, tag).await?;
        }
        Ok(())
    }

    pub async fn get_rule(&self, id: &str) -> Result<Rule> {
        let raw = self
            .store
            .get(&rule_key(id))
            .await?
            .ok_or_else(|| RouterError::NotFound {
                entity: "rule",
                id: id.to_string(),
            })?;
        match serde_json::from_str::<Rule>(&raw) {
            Ok(rule) => Ok(rule),
            Err(_) => {
                // A malformed time-restriction schedule must not take the
                // rule out entirely: strip it and treat as always open.
                let mut value: serde_json::Value = serde_json::from_str(&raw)?;
                if let Some(obj) = value.as_object_mut() {
                    obj.remove("time_restrictions");
                }
                let rule: Rule = serde_json::from_value(value)?;
                tracing::warn!(
                    rule_id = id,
                    "malformed time restriction schedule, treating rule as always open"
                );
                Ok(rule)
            }
        }
    }

    /// A contact's rules in evaluation (insertion) order.
    pub async fn contact_rules(&self, contact_id: &str) -> Result<Vec<Rule>> {
        let ids = self.store.list_all(&contact_rules_key(contact_id)).await?;
        let mut rules = Vec::with_capacity(ids.len());
        for id in ids {
            rules.push(self.get_rule(&id).await?);
        }
        Ok(rules)
    }

    pub async fn remove_rule(&self, id: &str) -> Result<()> {
        let rule = self.get_rule(id).await?;
        self.tags.clear_rule_tags(id).await?;
        self.store
            .list_remove(&contact_rules_key(&rule.contact_id), id)
            .await?;
        self.store.delete(&rule_key(id)).await?;
        Ok(())
    }

    pub async fn register_check(&self, check: &Check) -> Result<()> {
        self.store
            .hash_set(&check_key(&check.id), "state", &check.state.to_string())
            .await?;
        for tag in &check.tags {
            self.tags.tag_check(&check.id, tag).await?;
        }
        Ok(())
    }

    pub async fn get_check(&self, id: &CheckId) -> Result<Check> {
        let fields = self.store.hash_get_all(&check_key(id)).await?;
        if fields.is_empty() {
            return Err(RouterError::NotFound {
                entity: "check",
                id: id.to_string(),
            });
        }
        let state = fields
            .get("state")
            .and_then(|s| s.parse().ok())
            .unwrap_or(CheckState::Unknown);
        let tags = self.tags.check_tags(id).await?;
        Ok(Check {
            id: id.clone(),
            state,
            tags,
        })
    }

    /// Updates the stored state. Called by the monitoring subsystem, never
    /// by the router itself.
    pub async fn set_check_state(&self, id: &CheckId, state: CheckState) -> Result<()> {
        self.get_check(id).await?;
        self.store
            .hash_set(&check_key(id), "state", &state.to_string())
            .await?;
        Ok(())
    }

    /// Removes a retired check, its tag-index entries, and its contact
    /// associations. Maintenance windows are keyed separately and expire
    /// with their intervals.
    pub async fn delete_check(&self, id: &CheckId) -> Result<()> {
        self.get_check(id).await?;
        self.tags.clear_check_tags(id).await?;
        self.store.delete(&contacts_for_key(id)).await?;
        self.store.delete(&check_key(id)).await?;
        Ok(())
    }

    pub async fn associate_contact(&self, check: &CheckId, contact_id: &str) -> Result<()> {
        self.store
            .set_add(&contacts_for_key(check), contact_id)
            .await?;
        Ok(())
    }

    pub async fn dissociate_contact(&self, check: &CheckId, contact_id: &str) -> Result<()> {
        self.store
            .set_remove(&contacts_for_key(check), contact_id)
            .await?;
        Ok(())
    }

    /// Contacts directly associated with a check.
    pub async fn contacts_for(&self, check: &CheckId) -> Result<BTreeSet<String>> {
        Ok(self.store.set_members(&contacts_for_key(check)).await?)
    }
}
