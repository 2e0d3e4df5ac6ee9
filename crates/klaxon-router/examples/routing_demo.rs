/// Routing core demo.
///
/// Purpose: walk one check through a maintenance window, a state change,
/// and the throttle interval, printing the dispatch decisions.
///
/// Run: cargo run --example routing_demo
use anyhow::Result;
use chrono::{Duration, Utc};
use klaxon_common::types::{CheckId, CheckState, Severity};
use klaxon_router::{Check, Contact, Medium, MediumSpec, Router, RouterConfig, Rule};
use klaxon_store::MemoryStore;
use std::collections::BTreeSet;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let store = Arc::new(MemoryStore::new());
    let router = Router::new(store, RouterConfig::default());
    let repo = router.repo();
    let check = CheckId::new("db01", "disk");

    // 1. Seed a contact with an email medium and a db-tagged rule
    println!("step 1: seed contact, medium, rule, check");
    repo.create_contact(&Contact {
        id: "alice".into(),
        name: "Alice".into(),
        timezone: Some("Australia/Perth".into()),
    })
    .await?;
    repo.add_medium(&Medium {
        id: "alice-email".into(),
        contact_id: "alice".into(),
        spec: MediumSpec::Email {
            address: "alice@example.com".into(),
        },
        interval_override: None,
    })
    .await?;
    repo.add_rule(&Rule {
        id: "alice-db".into(),
        contact_id: "alice".into(),
        tags: ["db".to_string()].into(),
        severities: BTreeSet::new(),
        time_restrictions: vec![],
        media_ids: vec!["alice-email".into()],
        blackhole: false,
    })
    .await?;
    repo.register_check(&Check {
        id: check.clone(),
        state: CheckState::Ok,
        tags: ["db".to_string()].into(),
    })
    .await?;
    repo.associate_contact(&check, "alice").await?;

    // 2. A transition during maintenance routes nothing
    println!("step 2: transition during a maintenance window");
    let now = Utc::now();
    let window = router
        .maintenance()
        .create_scheduled(&check, now - Duration::minutes(5), now + Duration::minutes(5), "demo")
        .await?;
    let suppressed = router
        .route_state_change(&check, CheckState::Ok, CheckState::Critical, Severity::Critical, now)
        .await?;
    println!("   dispatches during maintenance: {}", suppressed.len());
    router.maintenance().delete_scheduled(&check, &window.id).await?;

    // 3. The same transition without maintenance dispatches
    println!("step 3: transition without maintenance");
    let dispatches = router
        .route_state_change(&check, CheckState::Ok, CheckState::Critical, Severity::Critical, now)
        .await?;
    for d in &dispatches {
        println!("   notify {} via {} ({})", d.contact_id, d.medium_type, d.address);
    }

    // 4. A repeat inside the email interval is throttled
    println!("step 4: repeat transition inside the 900s email interval");
    let repeat = router
        .route_state_change(
            &check,
            CheckState::Ok,
            CheckState::Critical,
            Severity::Critical,
            now + Duration::seconds(30),
        )
        .await?;
    println!("   dispatches 30s later: {}", repeat.len());

    Ok(())
}
