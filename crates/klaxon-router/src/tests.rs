use crate::config::MediumIntervals;
use crate::entities::{Check, Contact, EntityRepo, Medium, MediumSpec};
use crate::error::RouterError;
use crate::maintenance::MaintenanceTracker;
use crate::rules::{Rule, RuleMatcher, TimeRestriction};
use crate::tags::TagIndex;
use crate::throttle::{SuppressionScope, ThrottleEngine};
use crate::timezone;
use chrono::{DateTime, NaiveTime, TimeZone, Utc, Weekday};
use klaxon_common::types::{CheckId, CheckState, MediumType, Severity};
use klaxon_store::{MemoryStore, Store};
use std::collections::BTreeSet;
use std::sync::Arc;

fn store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

fn tags(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn email_medium(id: &str, contact_id: &str) -> Medium {
    Medium {
        id: id.to_string(),
        contact_id: contact_id.to_string(),
        spec: MediumSpec::Email {
            address: format!("{contact_id}@example.com"),
        },
        interval_override: None,
    }
}

fn sms_medium(id: &str, contact_id: &str) -> Medium {
    Medium {
        id: id.to_string(),
        contact_id: contact_id.to_string(),
        spec: MediumSpec::Sms {
            number: "+61400000000".to_string(),
        },
        interval_override: None,
    }
}

async fn seed_contact(repo: &EntityRepo, id: &str) {
    repo.create_contact(&Contact {
        id: id.to_string(),
        name: id.to_string(),
        timezone: None,
    })
    .await
    .unwrap();
}

// ── Tag matching ──

#[test]
fn empty_rule_tag_set_matches_everything() {
    assert!(TagIndex::matches(&BTreeSet::new(), &tags(&["db", "prod"])));
    assert!(TagIndex::matches(&BTreeSet::new(), &BTreeSet::new()));
}

#[test]
fn tag_sets_match_on_intersection() {
    assert!(TagIndex::matches(&tags(&["a", "b"]), &tags(&["b", "c"])));
    assert!(!TagIndex::matches(&tags(&["a", "b"]), &tags(&["c", "d"])));
    assert!(!TagIndex::matches(&tags(&["a"]), &BTreeSet::new()));
}

#[tokio::test]
async fn untagging_updates_both_directions() {
    let index = TagIndex::new(store());
    let check = CheckId::new("db01", "disk");

    index.tag_check(&check, "db").await.unwrap();
    index.tag_check(&check, "prod").await.unwrap();
    index.untag_check(&check, "db").await.unwrap();

    assert_eq!(index.check_tags(&check).await.unwrap(), tags(&["prod"]));
    assert!(index.find_checks_for_tag("db").await.unwrap().is_empty());
}

#[tokio::test]
async fn tag_index_reverse_lookups() {
    let index = TagIndex::new(store());
    let check = CheckId::new("db01", "disk");

    index.tag_check(&check, "db").await.unwrap();
    index.tag_rule("r1", "db").await.unwrap();
    index.tag_rule("r2", "db").await.unwrap();

    assert!(index.find_checks_for_tag("db").await.unwrap().contains(&check));
    assert_eq!(index.find_rules_for_tag("db").await.unwrap().len(), 2);
    assert!(index.find_rules_for_tag("web").await.unwrap().is_empty());

    index.clear_rule_tags("r1").await.unwrap();
    assert_eq!(index.find_rules_for_tag("db").await.unwrap().len(), 1);
    assert!(index.rule_tags("r1").await.unwrap().is_empty());
}

// ── Time restrictions ──

#[test]
fn time_restriction_plain_window() {
    let restriction = TimeRestriction {
        days: vec![],
        start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        end: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
    };
    // 2023-11-14 was a Tuesday; 22:13 UTC
    let evening = ts(0);
    assert!(!restriction.contains(evening, chrono_tz::Tz::UTC));
    // Same instant is 12:13 in Honolulu (UTC-10)
    assert!(restriction.contains(evening, chrono_tz::Tz::Pacific__Honolulu));
}

#[test]
fn time_restriction_overnight_window() {
    let restriction = TimeRestriction {
        days: vec![],
        start: NaiveTime::from_hms_opt(21, 0, 0).unwrap(),
        end: NaiveTime::from_hms_opt(3, 0, 0).unwrap(),
    };
    let late_evening = ts(0); // 22:13 UTC
    assert!(restriction.contains(late_evening, chrono_tz::Tz::UTC));
    let midday = ts(-36_000); // 12:13 UTC
    assert!(!restriction.contains(midday, chrono_tz::Tz::UTC));
}

#[test]
fn time_restriction_weekday_filter() {
    let weekdays_only = TimeRestriction {
        days: vec![
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
        ],
        start: NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
        end: NaiveTime::from_hms_opt(23, 59, 59).unwrap(),
    };
    let tuesday = ts(0);
    let saturday = ts(4 * 86_400);
    assert!(weekdays_only.contains(tuesday, chrono_tz::Tz::UTC));
    assert!(!weekdays_only.contains(saturday, chrono_tz::Tz::UTC));
}

#[test]
fn time_restriction_weekday_names_roundtrip() {
    let restriction = TimeRestriction {
        days: vec![Weekday::Mon, Weekday::Fri],
        start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        end: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
    };
    let json = serde_json::to_string(&restriction).unwrap();
    assert!(json.contains("Mon"), "json was: {json}");
    let back: TimeRestriction = serde_json::from_str(&json).unwrap();
    assert_eq!(back.days, restriction.days);
}

// ── Timezone resolution ──

#[test]
fn timezone_fallback_chain() {
    assert_eq!(
        timezone::resolve(Some("Australia/Perth"), "UTC").name(),
        "Australia/Perth"
    );
    assert_eq!(
        timezone::resolve(Some("Not/AZone"), "Europe/Berlin").name(),
        "Europe/Berlin"
    );
    assert_eq!(timezone::resolve(None, "Not/AZone"), chrono_tz::Tz::UTC);
}

// ── Suppression scopes ──

#[test]
fn suppression_scope_wildcards() {
    let check = CheckId::new("db01", "disk");
    let other = CheckId::new("web01", "http");

    let drop_all = SuppressionScope::drop_all();
    assert!(drop_all.covers(MediumType::Email, &check, CheckState::Critical));
    assert!(drop_all.covers(MediumType::Sms, &other, CheckState::Ok));

    let per_medium = SuppressionScope {
        medium: Some(MediumType::Sms),
        check: None,
        state: None,
    };
    assert!(per_medium.covers(MediumType::Sms, &check, CheckState::Warning));
    assert!(!per_medium.covers(MediumType::Email, &check, CheckState::Warning));

    let fully_scoped = SuppressionScope {
        medium: Some(MediumType::Email),
        check: Some(check.clone()),
        state: Some(CheckState::Critical),
    };
    assert!(fully_scoped.covers(MediumType::Email, &check, CheckState::Critical));
    assert!(!fully_scoped.covers(MediumType::Email, &check, CheckState::Warning));
    assert!(!fully_scoped.covers(MediumType::Email, &other, CheckState::Critical));
}

// ── Media ──

#[test]
fn medium_spec_address_shapes() {
    let pagerduty = MediumSpec::Pagerduty {
        service_key: "pd-key-1".into(),
        subdomain: Some("acme".into()),
        username: None,
        password: None,
    };
    assert_eq!(pagerduty.medium_type(), MediumType::Pagerduty);
    assert_eq!(pagerduty.address(), "pd-key-1");

    let webhook = MediumSpec::Webhook {
        url: "https://hooks.example.com/notify".into(),
    };
    assert_eq!(webhook.medium_type(), MediumType::Webhook);
    assert_eq!(webhook.address(), "https://hooks.example.com/notify");
}

// ── Intervals ──

#[test]
fn config_defaults_from_empty_json() {
    let config: crate::config::RouterConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config.default_timezone, "UTC");
    assert_eq!(config.intervals.email_secs, 900);

    let partial: crate::config::RouterConfig =
        serde_json::from_str(r#"{"intervals":{"sms_secs":30}}"#).unwrap();
    assert_eq!(partial.intervals.sms_secs, 30);
    assert_eq!(partial.intervals.email_secs, 900);
}

#[test]
fn interval_defaults_and_override() {
    let intervals = MediumIntervals::default();
    assert_eq!(intervals.for_type(MediumType::Email), 900);
    assert_eq!(intervals.for_type(MediumType::Sms), 60);

    let mut medium = email_medium("m1", "alice");
    assert_eq!(medium.effective_interval(&intervals), 900);
    medium.interval_override = Some(30);
    assert_eq!(medium.effective_interval(&intervals), 30);
}

// ── Maintenance windows ──

#[tokio::test]
async fn scheduled_window_boundaries_are_half_open() {
    let tracker = MaintenanceTracker::new(store());
    let check = CheckId::new("db01", "disk");
    tracker
        .create_scheduled(&check, ts(0), ts(3600), "kernel patching")
        .await
        .unwrap();

    assert!(!tracker.is_suppressed(&check, ts(-1)).await.unwrap());
    assert!(tracker.is_suppressed(&check, ts(0)).await.unwrap());
    assert!(tracker.is_suppressed(&check, ts(1800)).await.unwrap());
    assert!(!tracker.is_suppressed(&check, ts(3600)).await.unwrap());

    let windows = tracker.list_scheduled(&check).await.unwrap();
    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0].duration(), chrono::Duration::seconds(3600));

    assert!(tracker.delete_scheduled(&check, &windows[0].id).await.unwrap());
    assert!(!tracker.is_suppressed(&check, ts(1800)).await.unwrap());
}

#[tokio::test]
async fn scheduled_window_must_end_after_start() {
    let tracker = MaintenanceTracker::new(store());
    let check = CheckId::new("db01", "disk");
    let err = tracker
        .create_scheduled(&check, ts(3600), ts(0), "backwards")
        .await
        .unwrap_err();
    assert!(matches!(err, RouterError::InvalidConfiguration(_)));
}

#[tokio::test]
async fn expire_scheduled_removes_finished_windows() {
    let tracker = MaintenanceTracker::new(store());
    let check = CheckId::new("db01", "disk");
    tracker
        .create_scheduled(&check, ts(0), ts(100), "early")
        .await
        .unwrap();
    tracker
        .create_scheduled(&check, ts(0), ts(9000), "late")
        .await
        .unwrap();

    assert_eq!(tracker.expire_scheduled(&check, ts(100)).await.unwrap(), 1);
    let remaining = tracker.list_scheduled(&check).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].summary, "late");
}

#[tokio::test]
async fn at_most_one_open_unscheduled_window() {
    let tracker = MaintenanceTracker::new(store());
    let check = CheckId::new("db01", "disk");

    tracker.open_unscheduled(&check, ts(0), "ack").await.unwrap();
    let err = tracker
        .open_unscheduled(&check, ts(10), "ack again")
        .await
        .unwrap_err();
    assert!(matches!(err, RouterError::Conflict { .. }));

    tracker.close_unscheduled(&check, ts(20)).await.unwrap();
    // closed: reopening is allowed again
    tracker.open_unscheduled(&check, ts(30), "ack 2").await.unwrap();
}

#[tokio::test]
async fn close_unscheduled_is_idempotent() {
    let tracker = MaintenanceTracker::new(store());
    let check = CheckId::new("db01", "disk");
    tracker.close_unscheduled(&check, ts(0)).await.unwrap();

    tracker.open_unscheduled(&check, ts(0), "ack").await.unwrap();
    tracker.close_unscheduled(&check, ts(50)).await.unwrap();
    tracker.close_unscheduled(&check, ts(60)).await.unwrap();

    let windows = tracker.list_unscheduled(&check).await.unwrap();
    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0].end_time, Some(ts(50)));
    assert!(!windows[0].is_open());
}

#[tokio::test]
async fn open_unscheduled_suppresses_until_closed() {
    let tracker = MaintenanceTracker::new(store());
    let check = CheckId::new("db01", "disk");
    tracker.open_unscheduled(&check, ts(0), "ack").await.unwrap();

    assert!(tracker.is_suppressed(&check, ts(10_000)).await.unwrap());
    tracker.close_unscheduled(&check, ts(100)).await.unwrap();
    assert!(tracker.is_suppressed(&check, ts(50)).await.unwrap());
    assert!(!tracker.is_suppressed(&check, ts(100)).await.unwrap());
}

#[tokio::test]
async fn mark_notified_bumps_count_on_open_window() {
    let tracker = MaintenanceTracker::new(store());
    let check = CheckId::new("db01", "disk");

    assert!(!tracker.mark_notified(&check).await.unwrap());

    tracker.open_unscheduled(&check, ts(0), "ack").await.unwrap();
    assert!(tracker.mark_notified(&check).await.unwrap());
    assert!(tracker.mark_notified(&check).await.unwrap());

    let window = tracker.open_unscheduled_window(&check).await.unwrap().unwrap();
    assert!(window.notified);
    assert_eq!(window.last_notification_count, 2);
}

// ── Throttle engine ──

#[tokio::test]
async fn interval_throttling() {
    let engine = ThrottleEngine::new(store(), MediumIntervals::default());
    let medium = email_medium("m-email", "alice"); // 900s default
    let check = CheckId::new("db01", "disk");
    let state = CheckState::Critical;
    let sev = Severity::Critical;

    // first notification for a new key always goes through
    assert!(engine.allow("alice", &medium, &check, state, sev, ts(0)).await.unwrap());
    engine
        .record_sent("alice", &medium.id, &check, state, ts(0))
        .await
        .unwrap();

    assert!(!engine.allow("alice", &medium, &check, state, sev, ts(500)).await.unwrap());
    assert!(engine.allow("alice", &medium, &check, state, sev, ts(901)).await.unwrap());
}

#[tokio::test]
async fn unrecorded_allow_is_reissued() {
    let engine = ThrottleEngine::new(store(), MediumIntervals::default());
    let medium = email_medium("m-email", "alice");
    let check = CheckId::new("db01", "disk");

    // allow twice without recording: still allowed (at-least-once)
    for _ in 0..2 {
        assert!(engine
            .allow("alice", &medium, &check, CheckState::Critical, Severity::Critical, ts(0))
            .await
            .unwrap());
    }
}

#[tokio::test]
async fn state_reset_abandons_old_records() {
    let engine = ThrottleEngine::new(store(), MediumIntervals::default());
    let medium = email_medium("m-email", "alice");
    let check = CheckId::new("db01", "disk");
    let state = CheckState::Critical;

    engine
        .record_sent("alice", &medium.id, &check, state, ts(0))
        .await
        .unwrap();
    assert!(!engine
        .allow("alice", &medium, &check, state, Severity::Critical, ts(10))
        .await
        .unwrap());

    engine.reset_state(&check, state).await.unwrap();
    assert_eq!(engine.record("alice", &medium.id, &check, state).await.unwrap(), None);
    assert!(engine
        .allow("alice", &medium, &check, state, Severity::Critical, ts(10))
        .await
        .unwrap());
}

#[tokio::test]
async fn record_sent_increments_count() {
    let engine = ThrottleEngine::new(store(), MediumIntervals::default());
    let check = CheckId::new("db01", "disk");
    let state = CheckState::Warning;

    engine.record_sent("alice", "m1", &check, state, ts(0)).await.unwrap();
    engine.record_sent("alice", "m1", &check, state, ts(1000)).await.unwrap();

    let record = engine.record("alice", "m1", &check, state).await.unwrap().unwrap();
    assert_eq!(record.count, 2);
    assert_eq!(record.last_sent_at, ts(1000));
}

#[tokio::test]
async fn drop_all_flag_denies_unconditionally() {
    let engine = ThrottleEngine::new(store(), MediumIntervals::default());
    let medium = email_medium("m-email", "alice");
    let check = CheckId::new("db01", "disk");

    engine
        .set_suppression("alice", &SuppressionScope::drop_all())
        .await
        .unwrap();
    assert!(!engine
        .allow("alice", &medium, &check, CheckState::Critical, Severity::Critical, ts(0))
        .await
        .unwrap());

    engine
        .clear_suppression("alice", &SuppressionScope::drop_all())
        .await
        .unwrap();
    assert!(engine
        .allow("alice", &medium, &check, CheckState::Critical, Severity::Critical, ts(0))
        .await
        .unwrap());
}

#[tokio::test]
async fn scoped_flag_only_denies_covered_sends() {
    let engine = ThrottleEngine::new(store(), MediumIntervals::default());
    let email = email_medium("m-email", "alice");
    let sms = sms_medium("m-sms", "alice");
    let check = CheckId::new("db01", "disk");

    engine
        .set_suppression(
            "alice",
            &SuppressionScope {
                medium: Some(MediumType::Sms),
                check: None,
                state: None,
            },
        )
        .await
        .unwrap();

    assert!(!engine
        .allow("alice", &sms, &check, CheckState::Critical, Severity::Critical, ts(0))
        .await
        .unwrap());
    assert!(engine
        .allow("alice", &email, &check, CheckState::Critical, Severity::Critical, ts(0))
        .await
        .unwrap());
}

// ── Rule matching ──

async fn seed_check(repo: &EntityRepo, id: &CheckId, check_tags: &[&str]) -> Check {
    let check = Check {
        id: id.clone(),
        state: CheckState::Ok,
        tags: tags(check_tags),
    };
    repo.register_check(&check).await.unwrap();
    check
}

#[tokio::test]
async fn blackhole_rule_short_circuits() {
    let repo = EntityRepo::new(store());
    seed_contact(&repo, "alice").await;
    repo.add_medium(&email_medium("m1", "alice")).await.unwrap();

    repo.add_rule(&Rule {
        id: "r-blackhole".into(),
        contact_id: "alice".into(),
        tags: BTreeSet::new(),
        severities: BTreeSet::new(),
        time_restrictions: vec![],
        media_ids: vec![],
        blackhole: true,
    })
    .await
    .unwrap();
    repo.add_rule(&Rule {
        id: "r-email".into(),
        contact_id: "alice".into(),
        tags: BTreeSet::new(),
        severities: BTreeSet::new(),
        time_restrictions: vec![],
        media_ids: vec!["m1".into()],
        blackhole: false,
    })
    .await
    .unwrap();

    let check = seed_check(&repo, &CheckId::new("db01", "disk"), &["db"]).await;
    let contact = repo.get_contact("alice").await.unwrap();
    let matcher = RuleMatcher::new(repo.clone(), "UTC".into());
    let matches = matcher
        .resolve(&contact, &check, CheckState::Critical, Severity::Critical, ts(0))
        .await
        .unwrap();

    assert_eq!(matches.len(), 1);
    assert!(matches[0].is_blackhole());
    assert!(matches[0].media.is_empty());
}

#[tokio::test]
async fn severity_filter_skips_rules() {
    let repo = EntityRepo::new(store());
    seed_contact(&repo, "alice").await;
    repo.add_medium(&email_medium("m1", "alice")).await.unwrap();
    repo.add_rule(&Rule {
        id: "r-critical-only".into(),
        contact_id: "alice".into(),
        tags: BTreeSet::new(),
        severities: [Severity::Critical].into(),
        time_restrictions: vec![],
        media_ids: vec!["m1".into()],
        blackhole: false,
    })
    .await
    .unwrap();

    let check = seed_check(&repo, &CheckId::new("db01", "disk"), &[]).await;
    let contact = repo.get_contact("alice").await.unwrap();
    let matcher = RuleMatcher::new(repo.clone(), "UTC".into());

    let critical = matcher
        .resolve(&contact, &check, CheckState::Critical, Severity::Critical, ts(0))
        .await
        .unwrap();
    assert_eq!(critical.len(), 1);

    let ok = matcher
        .resolve(&contact, &check, CheckState::Ok, Severity::Ok, ts(0))
        .await
        .unwrap();
    assert!(ok.is_empty());
}

#[tokio::test]
async fn media_union_deduplicates_across_rules() {
    let repo = EntityRepo::new(store());
    seed_contact(&repo, "alice").await;
    repo.add_medium(&email_medium("m1", "alice")).await.unwrap();
    repo.add_medium(&sms_medium("m2", "alice")).await.unwrap();
    for (rule_id, media) in [("r1", vec!["m1", "m2"]), ("r2", vec!["m1"])] {
        repo.add_rule(&Rule {
            id: rule_id.into(),
            contact_id: "alice".into(),
            tags: BTreeSet::new(),
            severities: BTreeSet::new(),
            time_restrictions: vec![],
            media_ids: media.into_iter().map(String::from).collect(),
            blackhole: false,
        })
        .await
        .unwrap();
    }

    let check = seed_check(&repo, &CheckId::new("db01", "disk"), &[]).await;
    let contact = repo.get_contact("alice").await.unwrap();
    let matcher = RuleMatcher::new(repo.clone(), "UTC".into());
    let matches = matcher
        .resolve(&contact, &check, CheckState::Critical, Severity::Critical, ts(0))
        .await
        .unwrap();

    assert_eq!(matches.len(), 2);
    let union = RuleMatcher::media_union(&matches);
    let ids: Vec<&str> = union.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["m1", "m2"]);
}

#[tokio::test]
async fn rule_rejects_foreign_medium() {
    let repo = EntityRepo::new(store());
    seed_contact(&repo, "alice").await;
    seed_contact(&repo, "bob").await;
    repo.add_medium(&email_medium("m-bob", "bob")).await.unwrap();

    let err = repo
        .add_rule(&Rule {
            id: "r1".into(),
            contact_id: "alice".into(),
            tags: BTreeSet::new(),
            severities: BTreeSet::new(),
            time_restrictions: vec![],
            media_ids: vec!["m-bob".into()],
            blackhole: false,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RouterError::InvalidConfiguration(_)));
}

#[tokio::test]
async fn malformed_time_restriction_degrades_to_always_open() {
    let st = store();
    let repo = EntityRepo::new(st.clone());
    st.set(
        "rule:r-bad",
        r#"{"id":"r-bad","contact_id":"alice","time_restrictions":[{"days":["Funday"],"start":"09:00:00","end":"17:00:00"}]}"#,
    )
    .await
    .unwrap();

    let rule = repo.get_rule("r-bad").await.unwrap();
    assert!(rule.time_restrictions.is_empty());
    assert!(rule.in_time_restrictions(ts(0), chrono_tz::Tz::UTC));
}

// ── Entity repo ──

#[tokio::test]
async fn contact_media_keeps_insertion_order() {
    let repo = EntityRepo::new(store());
    seed_contact(&repo, "alice").await;
    repo.add_medium(&sms_medium("m-sms", "alice")).await.unwrap();
    repo.add_medium(&email_medium("m-email", "alice")).await.unwrap();

    let media = repo.contact_media("alice").await.unwrap();
    let ids: Vec<&str> = media.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["m-sms", "m-email"]);

    repo.remove_medium("m-sms").await.unwrap();
    assert_eq!(repo.contact_media("alice").await.unwrap().len(), 1);
    assert!(matches!(
        repo.get_medium("m-sms").await.unwrap_err(),
        RouterError::NotFound { entity: "medium", .. }
    ));
}

#[tokio::test]
async fn removing_rule_clears_its_tag_entries() {
    let repo = EntityRepo::new(store());
    seed_contact(&repo, "alice").await;
    repo.add_rule(&Rule {
        id: "r1".into(),
        contact_id: "alice".into(),
        tags: tags(&["db"]),
        severities: BTreeSet::new(),
        time_restrictions: vec![],
        media_ids: vec![],
        blackhole: false,
    })
    .await
    .unwrap();

    repo.remove_rule("r1").await.unwrap();
    assert!(repo.tags().find_rules_for_tag("db").await.unwrap().is_empty());
    assert!(repo.contact_rules("alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn check_state_updates_and_deletion() {
    let repo = EntityRepo::new(store());
    let id = CheckId::new("db01", "disk");
    seed_check(&repo, &id, &["db"]).await;

    repo.set_check_state(&id, CheckState::Critical).await.unwrap();
    let check = repo.get_check(&id).await.unwrap();
    assert_eq!(check.state, CheckState::Critical);
    assert_eq!(check.tags, tags(&["db"]));

    repo.delete_check(&id).await.unwrap();
    assert!(matches!(
        repo.get_check(&id).await.unwrap_err(),
        RouterError::NotFound { entity: "check", .. }
    ));
    assert!(repo.tags().find_checks_for_tag("db").await.unwrap().is_empty());
}

#[tokio::test]
async fn deleting_contact_cascades_to_owned_records() {
    let repo = EntityRepo::new(store());
    seed_contact(&repo, "alice").await;
    repo.add_medium(&email_medium("m1", "alice")).await.unwrap();
    repo.add_rule(&Rule {
        id: "r1".into(),
        contact_id: "alice".into(),
        tags: tags(&["db"]),
        severities: BTreeSet::new(),
        time_restrictions: vec![],
        media_ids: vec!["m1".into()],
        blackhole: false,
    })
    .await
    .unwrap();

    repo.delete_contact("alice").await.unwrap();

    assert!(matches!(
        repo.get_contact("alice").await.unwrap_err(),
        RouterError::NotFound { entity: "contact", .. }
    ));
    assert!(matches!(
        repo.get_medium("m1").await.unwrap_err(),
        RouterError::NotFound { entity: "medium", .. }
    ));
    assert!(matches!(
        repo.get_rule("r1").await.unwrap_err(),
        RouterError::NotFound { entity: "rule", .. }
    ));
    assert!(repo.tags().find_rules_for_tag("db").await.unwrap().is_empty());
}
