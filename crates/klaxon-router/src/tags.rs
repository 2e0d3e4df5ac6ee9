use crate::error::Result;
use klaxon_common::types::CheckId;
use klaxon_store::Store;
use std::collections::BTreeSet;
use std::sync::Arc;

fn tag_checks_key(tag: &str) -> String {
    format!("tag:checks:{tag}")
}

fn tag_rules_key(tag: &str) -> String {
    format!("tag:rules:{tag}")
}

fn check_tags_key(check: &CheckId) -> String {
    format!("check_tags:{check}")
}

fn rule_tags_key(rule_id: &str) -> String {
    format!("rule_tags:{rule_id}")
}

/// Bidirectional set-membership index between tag values and the taggable
/// entities (checks, rules) carrying them.
///
/// Both directions are written on every update; the store offers per-key
/// atomicity only, so a reader can briefly observe one direction ahead of
/// the other. Matching reads the check side, which tolerates that.
#[derive(Clone)]
pub struct TagIndex {
    store: Arc<dyn Store>,
}

impl TagIndex {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Whether a rule's tag set matches a check's tag set: true if the
    /// rule's set is empty or the two intersect. Absent sets are empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use klaxon_router::tags::TagIndex;
    /// use std::collections::BTreeSet;
    ///
    /// let rule: BTreeSet<String> = ["db".into()].into();
    /// let check: BTreeSet<String> = ["db".into(), "prod".into()].into();
    /// assert!(TagIndex::matches(&rule, &check));
    /// assert!(TagIndex::matches(&BTreeSet::new(), &check));
    /// ```
    pub fn matches(rule_tags: &BTreeSet<String>, check_tags: &BTreeSet<String>) -> bool {
        rule_tags.is_empty() || rule_tags.iter().any(|t| check_tags.contains(t))
    }

    pub async fn tag_check(&self, check: &CheckId, tag: &str) -> Result<()> {
        self.store.set_add(&check_tags_key(check), tag).await?;
        self.store.set_add(&tag_checks_key(tag), check.as_str()).await?;
        Ok(())
    }

    pub async fn untag_check(&self, check: &CheckId, tag: &str) -> Result<()> {
        self.store.set_remove(&check_tags_key(check), tag).await?;
        self.store
            .set_remove(&tag_checks_key(tag), check.as_str())
            .await?;
        Ok(())
    }

    pub async fn tag_rule(&self, rule_id: &str, tag: &str) -> Result<()> {
        self.store.set_add(&rule_tags_key(rule_id), tag).await?;
        self.store.set_add(&tag_rules_key(tag), rule_id).await?;
        Ok(())
    }

    pub async fn untag_rule(&self, rule_id: &str, tag: &str) -> Result<()> {
        self.store.set_remove(&rule_tags_key(rule_id), tag).await?;
        self.store.set_remove(&tag_rules_key(tag), rule_id).await?;
        Ok(())
    }

    pub async fn check_tags(&self, check: &CheckId) -> Result<BTreeSet<String>> {
        Ok(self.store.set_members(&check_tags_key(check)).await?)
    }

    pub async fn rule_tags(&self, rule_id: &str) -> Result<BTreeSet<String>> {
        Ok(self.store.set_members(&rule_tags_key(rule_id)).await?)
    }

    pub async fn find_checks_for_tag(&self, tag: &str) -> Result<BTreeSet<CheckId>> {
        let members = self.store.set_members(&tag_checks_key(tag)).await?;
        Ok(members.into_iter().map(CheckId::from).collect())
    }

    pub async fn find_rules_for_tag(&self, tag: &str) -> Result<BTreeSet<String>> {
        Ok(self.store.set_members(&tag_rules_key(tag)).await?)
    }

    /// Drops every index entry for a rule. Used when the rule (or its
    /// owning contact) is deleted.
    pub async fn clear_rule_tags(&self, rule_id: &str) -> Result<()> {
        for tag in self.rule_tags(rule_id).await? {
            self.store.set_remove(&tag_rules_key(&tag), rule_id).await?;
        }
        self.store.delete(&rule_tags_key(rule_id)).await?;
        Ok(())
    }

    /// Drops every index entry for a check.
    pub async fn clear_check_tags(&self, check: &CheckId) -> Result<()> {
        for tag in self.check_tags(check).await? {
            self.store
                .set_remove(&tag_checks_key(&tag), check.as_str())
                .await?;
        }
        self.store.delete(&check_tags_key(check)).await?;
        Ok(())
    }
}
