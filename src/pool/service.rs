//! Request-driven operations on the shared pool: claim, assign, manual
//! drop, and administrative deletion, all sharing the ownership invariants
//! and audit trail of the automatic engine.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{
    DropReason, Lead, LeadId, ReclaimInfo, StaffId, TransferAction, TransferDraft, TransferRecord,
};
use crate::engine::Clock;
use crate::repository::{ClaimOutcome, Page, PoolFilter, Store, StoreError, TransferFilter};

/// Error raised by pool operations. Precondition violations are rejected to
/// the caller and never auto-retried.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("lead not found")]
    LeadNotFound,
    #[error("lead is not in the pool")]
    NotInPool,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Pool listing row. Unstamped leads (pooled before reclaim metadata
/// existed) fall back to a generic reason and their last-updated time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolLeadView {
    pub id: LeadId,
    pub name: String,
    pub phone: String,
    pub source: String,
    pub drop_reason: String,
    pub drop_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_owner: Option<String>,
}

impl PoolLeadView {
    fn from_lead(lead: Lead) -> Self {
        let (drop_reason, drop_time, original_owner) = match &lead.reclaim {
            Some(info) => (
                info.reason.label().to_string(),
                info.dropped_at,
                Some(info.previous_owner.clone()),
            ),
            None => ("超时未跟进".to_string(), lead.updated_at, None),
        };
        Self {
            id: lead.id,
            name: lead.name,
            phone: lead.phone,
            source: lead.source,
            drop_reason,
            drop_time,
            original_owner,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolPage {
    pub list: Vec<PoolLeadView>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferView {
    pub id: u64,
    pub lead_id: LeadId,
    pub action: &'static str,
    pub from_owner_id: Option<StaffId>,
    pub to_owner_id: Option<StaffId>,
    pub operator_staff_id: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TransferView {
    fn from_record(record: TransferRecord) -> Self {
        Self {
            id: record.id,
            lead_id: record.lead,
            action: record.action.label(),
            from_owner_id: record.from_owner,
            to_owner_id: record.to_owner,
            operator_staff_id: record.operator,
            note: record.note,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TransferPage {
    pub list: Vec<TransferView>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimReceipt {
    pub lead_id: LeadId,
    pub claimer: StaffId,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignReceipt {
    pub lead_ids: Vec<LeadId>,
    pub assignee: StaffId,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnReceipt {
    pub lead_ids: Vec<LeadId>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteReceipt {
    pub lead_ids: Vec<LeadId>,
    pub count: usize,
}

/// Service composing the lead store, transfer audit log, and staff
/// directory behind the pool endpoints.
pub struct PoolTransferService<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S> PoolTransferService<S>
where
    S: Store + 'static,
{
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn pool_leads(&self, filter: &PoolFilter, page: Page) -> Result<PoolPage, PoolError> {
        let (leads, total) = self.store.pooled_leads(filter, page)?;
        Ok(PoolPage {
            list: leads.into_iter().map(PoolLeadView::from_lead).collect(),
            total,
        })
    }

    /// A salesperson takes one lead out of the pool. Conflicts if the lead
    /// is no longer unassigned.
    pub fn claim(&self, lead_id: &LeadId, staff_id: &StaffId) -> Result<ClaimReceipt, PoolError> {
        match self.store.claim_if_pooled(lead_id, staff_id)? {
            ClaimOutcome::NotFound => Err(PoolError::LeadNotFound),
            ClaimOutcome::AlreadyOwned => Err(PoolError::NotInPool),
            ClaimOutcome::Claimed => {
                self.store.append_transfer(TransferDraft {
                    lead: lead_id.clone(),
                    action: TransferAction::Claim,
                    from_owner: None,
                    to_owner: Some(staff_id.clone()),
                    operator: staff_id.0.clone(),
                    note: Some("销售捞取公海客户".to_string()),
                    created_at: self.clock.now_utc(),
                })?;
                self.store.commit()?;
                Ok(ClaimReceipt {
                    lead_id: lead_id.clone(),
                    claimer: staff_id.clone(),
                })
            }
        }
    }

    /// A supervisor moves unassigned leads to a target owner. Leads that
    /// are missing or already claimed are skipped, tolerating concurrent
    /// claims without aborting the batch.
    pub fn assign(
        &self,
        lead_ids: &[LeadId],
        assignee: &StaffId,
        operator: &StaffId,
    ) -> Result<AssignReceipt, PoolError> {
        let mut assigned = Vec::new();
        for lead_id in lead_ids {
            match self.store.claim_if_pooled(lead_id, assignee)? {
                ClaimOutcome::Claimed => {
                    self.store.append_transfer(TransferDraft {
                        lead: lead_id.clone(),
                        action: TransferAction::Assign,
                        from_owner: None,
                        to_owner: Some(assignee.clone()),
                        operator: operator.0.clone(),
                        note: Some("管理员批量分配".to_string()),
                        created_at: self.clock.now_utc(),
                    })?;
                    assigned.push(lead_id.clone());
                }
                ClaimOutcome::AlreadyOwned | ClaimOutcome::NotFound => {}
            }
        }
        self.store.commit()?;
        Ok(AssignReceipt {
            count: assigned.len(),
            lead_ids: assigned,
            assignee: assignee.clone(),
        })
    }

    /// Owner or admin releases leads back into the pool, stamping the same
    /// metadata shape the automatic engine uses. Already-pooled leads are
    /// skipped.
    pub fn return_to_pool(
        &self,
        lead_ids: &[LeadId],
        operator: &StaffId,
    ) -> Result<ReturnReceipt, PoolError> {
        let now = self.clock.now_utc();
        let mut returned = Vec::new();
        for lead_id in lead_ids {
            let Some(lead) = self.store.lead(lead_id)? else {
                continue;
            };
            let Some(owner_id) = lead.owner.clone() else {
                continue;
            };
            let previous_owner = match self.store.staff(&owner_id)? {
                Some(staff) => staff.name,
                None => owner_id.0.clone(),
            };
            let info = ReclaimInfo {
                reason: DropReason::ManualReturn,
                dropped_at: now,
                previous_owner,
            };
            let Some(released) = self.store.release_if_owned(lead_id, &owner_id, info)? else {
                // Lost a race with a claim, reassignment, or the engine.
                continue;
            };
            self.store.append_transfer(TransferDraft {
                lead: lead_id.clone(),
                action: TransferAction::ManualDrop,
                from_owner: Some(released),
                to_owner: None,
                operator: operator.0.clone(),
                note: Some("客户页手动转入公海".to_string()),
                created_at: now,
            })?;
            returned.push(lead_id.clone());
        }
        self.store.commit()?;
        Ok(ReturnReceipt {
            count: returned.len(),
            lead_ids: returned,
        })
    }

    /// Administrative deletion, permitted only while unassigned. Removes the
    /// lead and its follow-up history; audit entries are retained.
    pub fn delete(&self, lead_id: &LeadId) -> Result<DeleteReceipt, PoolError> {
        let lead = self.store.lead(lead_id)?.ok_or(PoolError::LeadNotFound)?;
        if !lead.is_pooled() {
            return Err(PoolError::NotInPool);
        }
        if !self.store.delete_if_pooled(lead_id)? {
            return Err(PoolError::NotInPool);
        }
        self.store.delete_follow_ups(lead_id)?;
        self.store.commit()?;
        Ok(DeleteReceipt {
            lead_ids: vec![lead_id.clone()],
            count: 1,
        })
    }

    /// Batch variant: skips missing or owned leads instead of failing.
    pub fn delete_batch(&self, lead_ids: &[LeadId]) -> Result<DeleteReceipt, PoolError> {
        let mut deleted = Vec::new();
        for lead_id in lead_ids {
            if self.store.delete_if_pooled(lead_id)? {
                self.store.delete_follow_ups(lead_id)?;
                deleted.push(lead_id.clone());
            }
        }
        self.store.commit()?;
        Ok(DeleteReceipt {
            count: deleted.len(),
            lead_ids: deleted,
        })
    }

    pub fn transfers(
        &self,
        filter: &TransferFilter,
        page: Page,
    ) -> Result<TransferPage, PoolError> {
        let (records, total) = self.store.transfers(filter, page)?;
        Ok(TransferPage {
            list: records.into_iter().map(TransferView::from_record).collect(),
            total,
        })
    }
}
