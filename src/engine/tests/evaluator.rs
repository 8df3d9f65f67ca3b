use super::common::{assigned_lead, base_now, follow_up, followed_up_lead, owner, rules};
use crate::domain::DropReason;
use crate::engine::evaluator::{evaluate, Decision, WarnRule};

#[test]
fn fresh_assignment_is_left_alone() {
    let lead = assigned_lead("L-1", 1);
    let decision = evaluate(&lead, &[], &owner(), &rules(), base_now());
    assert_eq!(decision, Decision::None);
}

#[test]
fn never_followed_up_warns_one_day_before_reclaim() {
    // rule1.days defaults to 3, so day 2 is the warning day.
    let lead = assigned_lead("L-1", 2);
    let decision = evaluate(&lead, &[], &owner(), &rules(), base_now());
    assert_eq!(decision, Decision::Warn(WarnRule::StaleAssignment));
}

#[test]
fn never_followed_up_reclaims_at_threshold() {
    for days_ago in [3, 4, 30] {
        let lead = assigned_lead("L-1", days_ago);
        let decision = evaluate(&lead, &[], &owner(), &rules(), base_now());
        assert_eq!(
            decision,
            Decision::Reclaim(DropReason::NeverFollowedUp),
            "gap of {days_ago} days should reclaim"
        );
    }
}

#[test]
fn warning_requires_before_drop_toggle() {
    let lead = assigned_lead("L-1", 2);
    let mut rules = rules();
    rules.notify.before_drop = false;
    let decision = evaluate(&lead, &[], &owner(), &rules, base_now());
    assert_eq!(decision, Decision::None);
}

#[test]
fn terminal_status_exempts_from_every_rule() {
    for status in ["signed", "已签约", "无效客户", "战败流失"] {
        let mut lead = assigned_lead("L-1", 30);
        lead.status = status.to_string();
        let decision = evaluate(&lead, &[], &owner(), &rules(), base_now());
        assert_eq!(decision, Decision::None, "status {status:?} should exempt");
    }
}

#[test]
fn zero_day_threshold_is_floored_to_one() {
    let mut rules = rules();
    rules.rule1.days = 0;
    rules.notify.before_drop = false;

    let today = assigned_lead("L-1", 0);
    assert_eq!(evaluate(&today, &[], &owner(), &rules, base_now()), Decision::None);

    let yesterday = assigned_lead("L-2", 1);
    assert_eq!(
        evaluate(&yesterday, &[], &owner(), &rules, base_now()),
        Decision::Reclaim(DropReason::NeverFollowedUp)
    );
}

#[test]
fn contact_silence_warns_then_reclaims() {
    // rule2.days defaults to 15.
    let owner = owner();
    let warn_lead = followed_up_lead("L-1", 14);
    let history = [follow_up(&warn_lead, &owner.id.0, 14)];
    assert_eq!(
        evaluate(&warn_lead, &history, &owner, &rules(), base_now()),
        Decision::Warn(WarnRule::ContactSilence)
    );

    let stale_lead = followed_up_lead("L-2", 15);
    let history = [follow_up(&stale_lead, &owner.id.0, 15)];
    assert_eq!(
        evaluate(&stale_lead, &history, &owner, &rules(), base_now()),
        Decision::Reclaim(DropReason::ContactSilence)
    );
}

#[test]
fn grade_a_leads_are_protected_from_silence_reclaim() {
    let owner = owner();
    let mut lead = followed_up_lead("L-1", 90);
    lead.level = "A".to_string();
    let history = [follow_up(&lead, &owner.id.0, 90)];
    assert_eq!(
        evaluate(&lead, &history, &owner, &rules(), base_now()),
        Decision::None
    );

    // Protection is a toggle, not a property of the grade itself.
    let mut rules = rules();
    rules.rule2.protect_high_intent = false;
    assert_eq!(
        evaluate(&lead, &history, &owner, &rules, base_now()),
        Decision::Reclaim(DropReason::ContactSilence)
    );
}

#[test]
fn silence_rule_needs_a_recorded_follow_up() {
    let mut lead = assigned_lead("L-1", 60);
    lead.last_follow_up = None;
    let mut rules = rules();
    rules.rule1.active = false;
    assert_eq!(evaluate(&lead, &[], &owner(), &rules, base_now()), Decision::None);
}

#[test]
fn stalled_deal_fires_at_the_contact_ceiling() {
    let owner = owner();
    let lead = followed_up_lead("L-1", 1);
    let mut rules = rules();
    rules.rule3.active = true;
    rules.rule3.count = 3;

    let below: Vec<_> = (0..2).map(|i| follow_up(&lead, &owner.id.0, i)).collect();
    assert_eq!(evaluate(&lead, &below, &owner, &rules, base_now()), Decision::None);

    let at_ceiling: Vec<_> = (0..3).map(|i| follow_up(&lead, &owner.id.0, i)).collect();
    assert_eq!(
        evaluate(&lead, &at_ceiling, &owner, &rules, base_now()),
        Decision::Reclaim(DropReason::StalledDeal)
    );
}

#[test]
fn stalled_deal_matches_operator_by_id_or_display_name() {
    let owner = owner();
    let lead = followed_up_lead("L-1", 1);
    let mut rules = rules();
    rules.rule3.active = true;
    rules.rule3.count = 2;

    // One record keyed by staff id, one by display name, one by a colleague.
    let history = [
        follow_up(&lead, &owner.id.0, 3),
        follow_up(&lead, &owner.name, 2),
        follow_up(&lead, "sales-2", 1),
    ];
    assert_eq!(
        evaluate(&lead, &history, &owner, &rules, base_now()),
        Decision::Reclaim(DropReason::StalledDeal)
    );
}

#[test]
fn silence_reclaim_takes_precedence_over_stalled_deal() {
    let owner = owner();
    let lead = followed_up_lead("L-1", 20);
    let mut rules = rules();
    rules.rule3.active = true;
    rules.rule3.count = 2;
    let history = [
        follow_up(&lead, &owner.id.0, 25),
        follow_up(&lead, &owner.id.0, 20),
    ];
    assert_eq!(
        evaluate(&lead, &history, &owner, &rules, base_now()),
        Decision::Reclaim(DropReason::ContactSilence)
    );
}

#[test]
fn inactive_rules_never_fire() {
    let owner = owner();
    let mut rules = rules();
    rules.rule1.active = false;
    rules.rule2.active = false;
    rules.rule3.active = false;

    let lead = assigned_lead("L-1", 365);
    assert_eq!(evaluate(&lead, &[], &owner, &rules, base_now()), Decision::None);

    let silent = followed_up_lead("L-2", 365);
    let history = [follow_up(&silent, &owner.id.0, 365)];
    assert_eq!(evaluate(&silent, &history, &owner, &rules, base_now()), Decision::None);
}
