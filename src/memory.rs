//! In-memory store backing the demo server and the test suites.
//!
//! Every trait method holds one mutex for its whole critical section, which
//! gives the same atomicity the storage contract demands from a database
//! backend: compare-and-set ownership changes and a uniqueness constraint on
//! notification event keys.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::domain::{
    FollowUpRecord, Lead, LeadId, Notification, NotificationDraft, RecycleRules, ReclaimInfo,
    Staff, StaffId, TransferDraft, TransferRecord,
};
use crate::repository::{
    ClaimOutcome, FollowUpStore, LeadStore, NotificationSink, Page, PoolFilter, RuleSource,
    StaffDirectory, Store, StoreError, TransferFilter, TransferLog,
};

#[derive(Default)]
struct TransferTable {
    rows: Vec<TransferRecord>,
    next_id: u64,
}

#[derive(Default)]
struct NotificationTable {
    rows: Vec<Notification>,
    event_keys: HashSet<String>,
    next_id: u64,
}

/// Mutex-guarded implementation of the full [`Store`] surface.
#[derive(Default)]
pub struct MemoryStore {
    leads: Mutex<HashMap<LeadId, Lead>>,
    follow_ups: Mutex<Vec<FollowUpRecord>>,
    staff: Mutex<HashMap<StaffId, Staff>>,
    transfers: Mutex<TransferTable>,
    notifications: Mutex<NotificationTable>,
    rules: Mutex<RecycleRules>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_staff(&self, staff: Staff) {
        let mut guard = self.staff.lock().expect("staff mutex poisoned");
        guard.insert(staff.id.clone(), staff);
    }

    /// Replaces the singleton rule configuration. Stands in for the settings
    /// surface that owns rule mutation in the full CRM.
    pub fn set_recycle_rules(&self, rules: RecycleRules) {
        let mut guard = self.rules.lock().expect("rules mutex poisoned");
        *guard = rules;
    }
}

impl LeadStore for MemoryStore {
    fn lead(&self, id: &LeadId) -> Result<Option<Lead>, StoreError> {
        let guard = self.leads.lock().expect("lead mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn insert_lead(&self, lead: Lead) -> Result<(), StoreError> {
        let mut guard = self.leads.lock().expect("lead mutex poisoned");
        guard.insert(lead.id.clone(), lead);
        Ok(())
    }

    fn assigned_leads(&self) -> Result<Vec<Lead>, StoreError> {
        let guard = self.leads.lock().expect("lead mutex poisoned");
        let mut leads: Vec<Lead> = guard
            .values()
            .filter(|lead| lead.owner.is_some())
            .cloned()
            .collect();
        leads.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(leads)
    }

    fn pooled_leads(
        &self,
        filter: &PoolFilter,
        page: Page,
    ) -> Result<(Vec<Lead>, usize), StoreError> {
        let guard = self.leads.lock().expect("lead mutex poisoned");
        let mut matches: Vec<Lead> = guard
            .values()
            .filter(|lead| lead.is_pooled())
            .filter(|lead| {
                filter.keyword.as_deref().is_none_or(|keyword| {
                    lead.name.contains(keyword) || lead.phone.contains(keyword)
                })
            })
            .filter(|lead| {
                filter.drop_reason.as_deref().is_none_or(|reason| {
                    lead.reclaim
                        .as_ref()
                        .is_some_and(|info| info.reason.label() == reason)
                })
            })
            .filter(|lead| {
                filter.previous_owner.as_deref().is_none_or(|owner| {
                    lead.reclaim
                        .as_ref()
                        .is_some_and(|info| info.previous_owner == owner)
                })
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.id.0.cmp(&b.id.0)));

        let total = matches.len();
        let items = matches
            .into_iter()
            .skip(page.offset())
            .take(page.size)
            .collect();
        Ok((items, total))
    }

    fn leads_by_ids(&self, ids: &[LeadId]) -> Result<Vec<Lead>, StoreError> {
        let guard = self.leads.lock().expect("lead mutex poisoned");
        Ok(ids.iter().filter_map(|id| guard.get(id).cloned()).collect())
    }

    fn claim_if_pooled(&self, id: &LeadId, owner: &StaffId) -> Result<ClaimOutcome, StoreError> {
        let mut guard = self.leads.lock().expect("lead mutex poisoned");
        match guard.get_mut(id) {
            None => Ok(ClaimOutcome::NotFound),
            Some(lead) if lead.owner.is_some() => Ok(ClaimOutcome::AlreadyOwned),
            Some(lead) => {
                lead.owner = Some(owner.clone());
                Ok(ClaimOutcome::Claimed)
            }
        }
    }

    fn release_if_owned(
        &self,
        id: &LeadId,
        expected_owner: &StaffId,
        info: ReclaimInfo,
    ) -> Result<Option<StaffId>, StoreError> {
        let mut guard = self.leads.lock().expect("lead mutex poisoned");
        let Some(lead) = guard.get_mut(id) else {
            return Ok(None);
        };
        if lead.owner.as_ref() != Some(expected_owner) {
            return Ok(None);
        }
        let released = lead.owner.take();
        lead.updated_at = info.dropped_at;
        lead.reclaim = Some(info);
        Ok(released)
    }

    fn delete_if_pooled(&self, id: &LeadId) -> Result<bool, StoreError> {
        let mut guard = self.leads.lock().expect("lead mutex poisoned");
        match guard.get(id) {
            Some(lead) if lead.is_pooled() => {
                guard.remove(id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

impl FollowUpStore for MemoryStore {
    fn follow_ups(&self, lead: &LeadId) -> Result<Vec<FollowUpRecord>, StoreError> {
        let guard = self.follow_ups.lock().expect("follow-up mutex poisoned");
        let mut records: Vec<FollowUpRecord> = guard
            .iter()
            .filter(|record| &record.lead == lead)
            .cloned()
            .collect();
        records.sort_by_key(|record| record.recorded_at);
        Ok(records)
    }

    fn insert_follow_up(&self, record: FollowUpRecord) -> Result<(), StoreError> {
        let mut guard = self.follow_ups.lock().expect("follow-up mutex poisoned");
        guard.push(record);
        Ok(())
    }

    fn delete_follow_ups(&self, lead: &LeadId) -> Result<(), StoreError> {
        let mut guard = self.follow_ups.lock().expect("follow-up mutex poisoned");
        guard.retain(|record| &record.lead != lead);
        Ok(())
    }
}

impl StaffDirectory for MemoryStore {
    fn staff(&self, id: &StaffId) -> Result<Option<Staff>, StoreError> {
        let guard = self.staff.lock().expect("staff mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn active_supervisors(&self) -> Result<Vec<Staff>, StoreError> {
        let guard = self.staff.lock().expect("staff mutex poisoned");
        let mut supervisors: Vec<Staff> = guard
            .values()
            .filter(|staff| staff.active && staff.is_supervisor())
            .cloned()
            .collect();
        supervisors.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(supervisors)
    }
}

impl TransferLog for MemoryStore {
    fn append_transfer(&self, draft: TransferDraft) -> Result<TransferRecord, StoreError> {
        let mut guard = self.transfers.lock().expect("transfer mutex poisoned");
        guard.next_id += 1;
        let record = TransferRecord {
            id: guard.next_id,
            lead: draft.lead,
            action: draft.action,
            from_owner: draft.from_owner,
            to_owner: draft.to_owner,
            operator: draft.operator,
            note: draft.note,
            created_at: draft.created_at,
        };
        guard.rows.push(record.clone());
        Ok(record)
    }

    fn transfers(
        &self,
        filter: &TransferFilter,
        page: Page,
    ) -> Result<(Vec<TransferRecord>, usize), StoreError> {
        let guard = self.transfers.lock().expect("transfer mutex poisoned");
        let matches: Vec<TransferRecord> = guard
            .rows
            .iter()
            .rev()
            .filter(|record| filter.lead.as_ref().is_none_or(|lead| &record.lead == lead))
            .filter(|record| {
                filter
                    .action
                    .is_none_or(|action| record.action == action)
            })
            .cloned()
            .collect();

        let total = matches.len();
        let items = matches
            .into_iter()
            .skip(page.offset())
            .take(page.size)
            .collect();
        Ok((items, total))
    }
}

impl NotificationSink for MemoryStore {
    fn insert_notification_if_absent(&self, draft: NotificationDraft) -> Result<bool, StoreError> {
        let mut guard = self
            .notifications
            .lock()
            .expect("notification mutex poisoned");
        if !guard.event_keys.insert(draft.event_key.clone()) {
            return Ok(false);
        }
        guard.next_id += 1;
        let row = Notification {
            id: guard.next_id,
            recipient: draft.recipient,
            title: draft.title,
            body: draft.body,
            category: draft.category,
            event_key: draft.event_key,
            read: false,
            created_at: draft.created_at,
            read_at: None,
        };
        guard.rows.push(row);
        Ok(true)
    }

    fn notifications_for(&self, recipient: &StaffId) -> Result<Vec<Notification>, StoreError> {
        let guard = self
            .notifications
            .lock()
            .expect("notification mutex poisoned");
        Ok(guard
            .rows
            .iter()
            .rev()
            .filter(|row| &row.recipient == recipient)
            .cloned()
            .collect())
    }
}

impl RuleSource for MemoryStore {
    fn recycle_rules(&self) -> Result<RecycleRules, StoreError> {
        let guard = self.rules.lock().expect("rules mutex poisoned");
        Ok(guard.clone())
    }
}

impl Store for MemoryStore {}
