//! One full recycling pass over every assigned lead.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::clock::Clock;
use super::evaluator::{evaluate, Decision, WarnRule};
use crate::domain::{
    Lead, NotificationCategory, NotificationDraft, ReclaimInfo, Staff, TransferAction,
    TransferDraft, SYSTEM_OPERATOR,
};
use crate::repository::{Store, StoreError};

/// Counters returned by one pass. Running a second pass on unchanged data
/// within the same calendar day yields all zeros.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecycleOutcome {
    pub recycled_count: u32,
    pub before_notified_count: u32,
    pub after_notified_count: u32,
}

/// Orchestrates one evaluation pass and its side effects.
///
/// Evaluation is sequential by design: correctness and auditability, not
/// throughput, are the binding constraints at sales-org scale.
pub struct RecycleCycle<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S> RecycleCycle<S>
where
    S: Store + 'static,
{
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Runs one full pass and commits it as a unit of work.
    ///
    /// Storage failures propagate to the caller; the scheduler discards a
    /// failed pass wholesale and retries on the next tick.
    pub fn run_once(&self) -> Result<RecycleOutcome, StoreError> {
        let rules = self.store.recycle_rules()?;
        let mut outcome = RecycleOutcome::default();
        if !rules.enabled {
            return Ok(outcome);
        }

        let now = self.clock.now_utc();
        let date_key = now.format("%Y-%m-%d").to_string();

        for lead in self.store.assigned_leads()? {
            let Some(owner_id) = lead.owner.clone() else {
                continue;
            };
            let Some(owner) = self.store.staff(&owner_id)? else {
                // Data-integrity gap, not fatal to the pass.
                warn!(lead = %lead.id, staff = %owner_id, "lead owner missing, skipping");
                continue;
            };

            let follow_ups = self.store.follow_ups(&lead.id)?;
            match evaluate(&lead, &follow_ups, &owner, &rules, now) {
                Decision::None => {}
                Decision::Warn(rule) => {
                    if self.warn_owner(&lead, &owner, rule, &date_key)? {
                        outcome.before_notified_count += 1;
                    }
                }
                Decision::Reclaim(reason) => {
                    let info = ReclaimInfo {
                        reason,
                        dropped_at: now,
                        previous_owner: owner.name.clone(),
                    };
                    // No-op when a manual drop or claim won the race; the
                    // audit log then carries exactly one entry for the lead.
                    let Some(released) = self.store.release_if_owned(&lead.id, &owner.id, info)?
                    else {
                        continue;
                    };
                    self.store.append_transfer(TransferDraft {
                        lead: lead.id.clone(),
                        action: TransferAction::AutoRecycle,
                        from_owner: Some(released),
                        to_owner: None,
                        operator: SYSTEM_OPERATOR.to_string(),
                        note: Some(format!("自动回收: {}", reason.label())),
                        created_at: now,
                    })?;
                    outcome.recycled_count += 1;
                    info!(lead = %lead.id, owner = %owner.id, reason = reason.label(), "lead reclaimed into pool");

                    if rules.notify.after_drop {
                        outcome.after_notified_count +=
                            self.notify_supervisors(&lead, &owner, reason.label(), &date_key)?;
                    }
                }
            }
        }

        self.store.commit()?;
        Ok(outcome)
    }

    fn warn_owner(
        &self,
        lead: &Lead,
        owner: &Staff,
        rule: WarnRule,
        date_key: &str,
    ) -> Result<bool, StoreError> {
        let event_key = format!("{}:{}:{}:{}", rule.event_prefix(), lead.id, owner.id, date_key);
        self.store.insert_notification_if_absent(NotificationDraft {
            recipient: owner.id.clone(),
            title: "客户即将自动回收".to_string(),
            body: rule.warning_body(lead),
            category: NotificationCategory::RecycleWarning,
            event_key,
            created_at: self.clock.now_utc(),
        })
    }

    fn notify_supervisors(
        &self,
        lead: &Lead,
        previous_owner: &Staff,
        reason_label: &str,
        date_key: &str,
    ) -> Result<u32, StoreError> {
        let mut delivered = 0;
        for supervisor in self.store.active_supervisors()? {
            let event_key = format!("after_drop:{}:{}:{}", lead.id, supervisor.id, date_key);
            let created = self.store.insert_notification_if_absent(NotificationDraft {
                recipient: supervisor.id.clone(),
                title: "客户已自动回收".to_string(),
                body: format!(
                    "客户 {} 已从 {} 处回收到公海，原因：{}。",
                    lead.id, previous_owner.name, reason_label
                ),
                category: NotificationCategory::RecycleSummary,
                event_key,
                created_at: self.clock.now_utc(),
            })?;
            if created {
                delivered += 1;
            }
        }
        Ok(delivered)
    }
}
