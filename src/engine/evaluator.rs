//! Per-lead recycling decision.
//!
//! `evaluate` is a pure function over the lead, its contact history, its
//! owner, and the rule configuration. The first qualifying terminal decision
//! wins (rule 1 > rule 2 > rule 3), so a lead is never both warned and
//! reclaimed in the same pass.

use chrono::{DateTime, Utc};

use crate::domain::{DropReason, FollowUpRecord, Lead, RecycleRules, Staff};

/// Outcome of evaluating one lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// No rule fired.
    None,
    /// The lead reclaims tomorrow unless contacted; notify the owner today.
    Warn(WarnRule),
    /// Reclaim into the pool now.
    Reclaim(DropReason),
}

/// Which day-based rule produced a warning. Part of the notification event
/// key, so the same rule warns an owner at most once per day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarnRule {
    StaleAssignment,
    ContactSilence,
}

impl WarnRule {
    pub const fn event_prefix(self) -> &'static str {
        match self {
            WarnRule::StaleAssignment => "before_rule1",
            WarnRule::ContactSilence => "before_rule2",
        }
    }

    /// Localized notification body for the owner.
    pub fn warning_body(self, lead: &Lead) -> String {
        match self {
            WarnRule::StaleAssignment => {
                format!("客户 {} 将在 1 天后因未跟进被回收至公海，请及时处理。", lead.id)
            }
            WarnRule::ContactSilence => {
                format!("客户 {} 将在 1 天后因长时间未联系被回收至公海。", lead.id)
            }
        }
    }
}

pub fn evaluate(
    lead: &Lead,
    follow_ups: &[FollowUpRecord],
    owner: &Staff,
    rules: &RecycleRules,
    now: DateTime<Utc>,
) -> Decision {
    if lead.in_terminal_status() {
        return Decision::None;
    }

    // Rule 1: assigned but never followed up.
    if rules.rule1.active && follow_ups.is_empty() {
        let days = floor_days(rules.rule1.days);
        let gap = (now - lead.assigned_at()).num_days();
        if rules.notify.before_drop && gap == warn_gap(days) {
            return Decision::Warn(WarnRule::StaleAssignment);
        }
        if gap >= days {
            return Decision::Reclaim(DropReason::NeverFollowedUp);
        }
    }

    // Rule 2: contact silence after at least one follow-up.
    if rules.rule2.active {
        if let Some(last_follow_up) = lead.last_follow_up {
            let days = floor_days(rules.rule2.days);
            let mut gap = (now - last_follow_up).num_days();
            if rules.rule2.protect_high_intent && lead.is_high_intent() {
                // Sentinel: protected leads never reach the warn or reclaim
                // thresholds regardless of elapsed silence.
                gap = -1;
            }
            if rules.notify.before_drop && gap == warn_gap(days) {
                return Decision::Warn(WarnRule::ContactSilence);
            }
            if gap >= days {
                return Decision::Reclaim(DropReason::ContactSilence);
            }
        }
    }

    // Rule 3: worked to the contact ceiling without closing. Fires
    // immediately, no day-based warning.
    if rules.rule3.active {
        let ceiling = rules.rule3.count.max(1) as usize;
        let by_owner = follow_ups
            .iter()
            .filter(|record| record.operator == owner.id.0 || record.operator == owner.name)
            .count();
        if by_owner >= ceiling {
            return Decision::Reclaim(DropReason::StalledDeal);
        }
    }

    Decision::None
}

/// Configured day counts are floored at one; zero would reclaim on the
/// assignment day itself.
fn floor_days(days: u32) -> i64 {
    i64::from(days.max(1))
}

fn warn_gap(days: i64) -> i64 {
    (days - 1).max(0)
}
