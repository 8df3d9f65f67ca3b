use std::sync::Arc;

use chrono::Duration;

use super::common::{
    assigned_lead, base_now, build_cycle, follow_up, followed_up_lead, notifications, owner,
    audit_entries, seeded_store, supervisor, FixedClock,
};
use crate::domain::{
    DropReason, NotificationCategory, StaffId, StaffRole, TransferAction, SYSTEM_OPERATOR,
};
use crate::engine::runner::RecycleOutcome;
use crate::repository::{FollowUpStore, LeadStore, RuleSource};

#[test]
fn stale_assignment_is_reclaimed_with_audit_and_stamp() {
    let store = seeded_store();
    let clock = Arc::new(FixedClock::at(base_now()));
    store
        .insert_lead(assigned_lead("L-1", 4))
        .expect("lead inserted");

    let outcome = build_cycle(Arc::clone(&store), clock).run_once().expect("pass runs");
    assert_eq!(
        outcome,
        RecycleOutcome {
            recycled_count: 1,
            before_notified_count: 0,
            after_notified_count: 0,
        }
    );

    let lead = store
        .lead(&assigned_lead("L-1", 4).id)
        .expect("lead readable")
        .expect("lead present");
    assert!(lead.is_pooled());
    let stamp = lead.reclaim.expect("reclaim stamped");
    assert_eq!(stamp.reason, DropReason::NeverFollowedUp);
    assert_eq!(stamp.previous_owner, owner().name);
    assert_eq!(stamp.dropped_at, base_now());

    let entries = audit_entries(&store, &lead.id);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, TransferAction::AutoRecycle);
    assert_eq!(entries[0].from_owner, Some(owner().id));
    assert_eq!(entries[0].to_owner, None);
    assert_eq!(entries[0].operator, SYSTEM_OPERATOR);
    assert_eq!(
        entries[0].note.as_deref(),
        Some("自动回收: 分配后未及时跟进")
    );
}

#[test]
fn warning_is_delivered_once_per_day() {
    let store = seeded_store();
    let clock = Arc::new(FixedClock::at(base_now()));
    let lead = followed_up_lead("L-2", 14);
    let record = follow_up(&lead, &owner().id.0, 14);
    store.insert_lead(lead.clone()).expect("lead inserted");
    store.insert_follow_up(record).expect("follow-up inserted");

    let cycle = build_cycle(Arc::clone(&store), Arc::clone(&clock));
    let first = cycle.run_once().expect("first pass");
    assert_eq!(first.before_notified_count, 1);
    assert_eq!(first.recycled_count, 0);

    let inbox = notifications(&store, &owner().id);
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].title, "客户即将自动回收");
    assert_eq!(inbox[0].category, NotificationCategory::RecycleWarning);
    assert_eq!(inbox[0].event_key, "before_rule2:L-2:sales-1:2026-03-10");
    assert!(!inbox[0].read);

    // Re-running within the same day changes nothing.
    let second = cycle.run_once().expect("second pass");
    assert_eq!(second, RecycleOutcome::default());
    assert_eq!(notifications(&store, &owner().id).len(), 1);
}

#[test]
fn warned_lead_is_reclaimed_the_next_day() {
    let store = seeded_store();
    let clock = Arc::new(FixedClock::at(base_now()));
    store
        .insert_lead(assigned_lead("L-3", 2))
        .expect("lead inserted");

    let cycle = build_cycle(Arc::clone(&store), Arc::clone(&clock));
    let warned = cycle.run_once().expect("warning pass");
    assert_eq!(warned.before_notified_count, 1);
    assert_eq!(warned.recycled_count, 0);

    clock.advance(Duration::days(1));
    let reclaimed = cycle.run_once().expect("reclaim pass");
    assert_eq!(reclaimed.recycled_count, 1);
    assert_eq!(reclaimed.before_notified_count, 0);
}

#[test]
fn disabled_master_switch_skips_the_pass() {
    let store = seeded_store();
    let clock = Arc::new(FixedClock::at(base_now()));
    store
        .insert_lead(assigned_lead("L-4", 30))
        .expect("lead inserted");
    let mut rules = store.recycle_rules().expect("rules readable");
    rules.enabled = false;
    store.set_recycle_rules(rules);

    let outcome = build_cycle(Arc::clone(&store), clock).run_once().expect("pass runs");
    assert_eq!(outcome, RecycleOutcome::default());
    let lead = store
        .lead(&assigned_lead("L-4", 30).id)
        .expect("lead readable")
        .expect("lead present");
    assert!(!lead.is_pooled());
}

#[test]
fn missing_owner_record_is_skipped_not_fatal() {
    let store = seeded_store();
    let clock = Arc::new(FixedClock::at(base_now()));
    let mut orphan = assigned_lead("L-5", 30);
    orphan.owner = Some(StaffId("ghost-1".to_string()));
    store.insert_lead(orphan).expect("lead inserted");
    store
        .insert_lead(assigned_lead("L-6", 30))
        .expect("lead inserted");

    let outcome = build_cycle(Arc::clone(&store), clock).run_once().expect("pass runs");
    // The orphan is skipped; the healthy lead is still processed.
    assert_eq!(outcome.recycled_count, 1);
}

#[test]
fn supervisors_are_notified_after_drop_at_most_once() {
    let store = seeded_store();
    let clock = Arc::new(FixedClock::at(base_now()));
    store.upsert_staff(supervisor("admin-1", "系统管理员", StaffRole::Admin));
    store.upsert_staff(supervisor("mgr-1", "销售主管", StaffRole::Manager));
    store
        .insert_lead(assigned_lead("L-7", 4))
        .expect("lead inserted");
    let mut rules = store.recycle_rules().expect("rules readable");
    rules.notify.after_drop = true;
    store.set_recycle_rules(rules);

    let cycle = build_cycle(Arc::clone(&store), Arc::clone(&clock));
    let outcome = cycle.run_once().expect("pass runs");
    assert_eq!(outcome.recycled_count, 1);
    assert_eq!(outcome.after_notified_count, 2);

    let admin_inbox = notifications(&store, &StaffId("admin-1".to_string()));
    assert_eq!(admin_inbox.len(), 1);
    assert_eq!(admin_inbox[0].title, "客户已自动回收");
    assert_eq!(admin_inbox[0].category, NotificationCategory::RecycleSummary);
    assert_eq!(admin_inbox[0].event_key, "after_drop:L-7:admin-1:2026-03-10");

    // The owner is not a supervisor and receives no summary.
    assert!(notifications(&store, &owner().id).is_empty());

    // A later pass the same day finds the lead already pooled.
    let again = cycle.run_once().expect("second pass");
    assert_eq!(again, RecycleOutcome::default());
}

#[test]
fn pooled_and_terminal_leads_are_never_touched() {
    let store = seeded_store();
    let clock = Arc::new(FixedClock::at(base_now()));
    let mut pooled = assigned_lead("L-8", 30);
    pooled.owner = None;
    store.insert_lead(pooled).expect("lead inserted");
    let mut signed = assigned_lead("L-9", 30);
    signed.status = "已签约".to_string();
    store.insert_lead(signed).expect("lead inserted");

    let outcome = build_cycle(Arc::clone(&store), clock).run_once().expect("pass runs");
    assert_eq!(outcome, RecycleOutcome::default());
}
