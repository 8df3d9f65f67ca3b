//! Storage abstractions shared by the recycling engine and the pool
//! transfer service, so both can be exercised against an in-memory store in
//! tests and against a database in production.
//!
//! Ownership mutations are expressed as compare-and-set operations
//! (`claim_if_pooled`, `release_if_owned`) rather than read-modify-write, so
//! concurrent manual and automatic transitions converge without a per-lead
//! application lock.

use crate::domain::{
    FollowUpRecord, Lead, LeadId, Notification, NotificationDraft, RecycleRules, ReclaimInfo,
    Staff, StaffId, TransferAction, TransferDraft, TransferRecord,
};

/// Error enumeration for storage failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Pagination window. Pages are 1-based as in the upstream API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: usize,
    pub size: usize,
}

impl Page {
    pub fn new(number: usize, size: usize) -> Self {
        Self {
            number: number.max(1),
            size: size.clamp(1, 100),
        }
    }

    pub fn offset(&self) -> usize {
        (self.number - 1) * self.size
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            number: 1,
            size: 20,
        }
    }
}

/// Filters accepted by the pool listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoolFilter {
    /// Substring match against lead name or phone.
    pub keyword: Option<String>,
    /// Exact match against the stamped drop reason label.
    pub drop_reason: Option<String>,
    /// Exact match against the stamped previous owner name.
    pub previous_owner: Option<String>,
}

/// Filters accepted by the audit listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransferFilter {
    pub lead: Option<LeadId>,
    pub action: Option<TransferAction>,
}

/// Result of an atomic claim attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    Claimed,
    /// The lead is no longer in the pool.
    AlreadyOwned,
    NotFound,
}

/// Persistent lead state.
pub trait LeadStore: Send + Sync {
    fn lead(&self, id: &LeadId) -> Result<Option<Lead>, StoreError>;

    fn insert_lead(&self, lead: Lead) -> Result<(), StoreError>;

    /// All currently assigned leads, the scan set of one recycling pass.
    fn assigned_leads(&self) -> Result<Vec<Lead>, StoreError>;

    /// Pooled leads matching `filter`, newest-updated first, with the total
    /// match count for pagination.
    fn pooled_leads(
        &self,
        filter: &PoolFilter,
        page: Page,
    ) -> Result<(Vec<Lead>, usize), StoreError>;

    fn leads_by_ids(&self, ids: &[LeadId]) -> Result<Vec<Lead>, StoreError>;

    /// Atomically assigns `owner` if the lead is currently pooled.
    fn claim_if_pooled(&self, id: &LeadId, owner: &StaffId) -> Result<ClaimOutcome, StoreError>;

    /// Atomically clears ownership and stamps `info` if the lead is still
    /// owned by `expected_owner`. Returns the released owner, or `None` when
    /// the lead is missing, already pooled, or owned by someone else — which
    /// makes a redundant reclaim a no-op by construction.
    fn release_if_owned(
        &self,
        id: &LeadId,
        expected_owner: &StaffId,
        info: ReclaimInfo,
    ) -> Result<Option<StaffId>, StoreError>;

    /// Removes the lead if it is pooled. Returns whether a row was deleted.
    fn delete_if_pooled(&self, id: &LeadId) -> Result<bool, StoreError>;
}

/// Append-only contact history.
pub trait FollowUpStore: Send + Sync {
    /// Follow-ups for one lead, oldest first.
    fn follow_ups(&self, lead: &LeadId) -> Result<Vec<FollowUpRecord>, StoreError>;

    fn insert_follow_up(&self, record: FollowUpRecord) -> Result<(), StoreError>;

    fn delete_follow_ups(&self, lead: &LeadId) -> Result<(), StoreError>;
}

/// Staff lookups needed to resolve owners and fan out summaries.
pub trait StaffDirectory: Send + Sync {
    fn staff(&self, id: &StaffId) -> Result<Option<Staff>, StoreError>;

    /// Active admins and managers, the after-drop notification audience.
    fn active_supervisors(&self) -> Result<Vec<Staff>, StoreError>;
}

/// Append-only transfer audit log. Entries are never mutated or deleted,
/// even when the referenced lead is removed.
pub trait TransferLog: Send + Sync {
    fn append_transfer(&self, draft: TransferDraft) -> Result<TransferRecord, StoreError>;

    /// Matching entries newest first, with the total match count.
    fn transfers(
        &self,
        filter: &TransferFilter,
        page: Page,
    ) -> Result<(Vec<TransferRecord>, usize), StoreError>;
}

/// Per-recipient notification inbox with idempotent insertion.
pub trait NotificationSink: Send + Sync {
    /// Inserts unless a notification with the same event key already exists.
    /// Returns whether a new row was created; a duplicate is expected
    /// idempotent behavior, not an error.
    fn insert_notification_if_absent(&self, draft: NotificationDraft) -> Result<bool, StoreError>;

    /// Inbox for one recipient, newest first.
    fn notifications_for(&self, recipient: &StaffId) -> Result<Vec<Notification>, StoreError>;
}

/// Read access to the singleton rule configuration.
pub trait RuleSource: Send + Sync {
    fn recycle_rules(&self) -> Result<RecycleRules, StoreError>;
}

/// The full storage surface the engine and pool service run against.
///
/// `commit` marks the end of one cycle-runner unit of work: a transactional
/// backend flushes there, the in-memory store treats it as a no-op because
/// each operation is already atomic.
pub trait Store:
    LeadStore + FollowUpStore + StaffDirectory + TransferLog + NotificationSink + RuleSource
{
    fn commit(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Page;

    #[test]
    fn page_clamps_number_and_size() {
        let page = Page::new(0, 500);
        assert_eq!(page.number, 1);
        assert_eq!(page.size, 100);
        assert_eq!(page.offset(), 0);

        let page = Page::new(3, 20);
        assert_eq!(page.offset(), 40);
    }
}
