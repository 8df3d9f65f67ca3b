use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};

use crate::domain::{
    FollowUpRecord, Lead, LeadId, Notification, NotificationDraft, RecycleRules, ReclaimInfo,
    Staff, StaffId, StaffRole, TransferDraft, TransferRecord,
};
use crate::engine::clock::Clock;
use crate::engine::runner::RecycleCycle;
use crate::memory::MemoryStore;
use crate::repository::{
    ClaimOutcome, FollowUpStore, LeadStore, NotificationSink, Page, PoolFilter, RuleSource,
    StaffDirectory, Store, StoreError, TransferFilter, TransferLog,
};

/// Deterministic clock for daily-run and event-key assertions.
pub(super) struct FixedClock {
    now: Mutex<DateTime<Utc>>,
    offset: FixedOffset,
}

impl FixedClock {
    pub(super) fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
            offset: FixedOffset::east_opt(8 * 3600).expect("valid offset"),
        }
    }

    pub(super) fn advance(&self, delta: Duration) {
        let mut guard = self.now.lock().expect("clock mutex poisoned");
        *guard += delta;
    }
}

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock mutex poisoned")
    }

    fn now_local(&self) -> DateTime<FixedOffset> {
        self.now_utc().with_timezone(&self.offset)
    }
}

/// A reference instant: 2026-03-10 02:00 UTC (10:00 local at +08:00).
pub(super) fn base_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, 2, 0, 0).single().expect("valid instant")
}

pub(super) fn owner() -> Staff {
    Staff {
        id: StaffId("sales-1".to_string()),
        name: "王敏".to_string(),
        role: StaffRole::Sales,
        active: true,
    }
}

pub(super) fn supervisor(id: &str, name: &str, role: StaffRole) -> Staff {
    Staff {
        id: StaffId(id.to_string()),
        name: name.to_string(),
        role,
        active: true,
    }
}

pub(super) fn assigned_lead(id: &str, assigned_days_ago: i64) -> Lead {
    let assigned_at = base_now() - Duration::days(assigned_days_ago);
    Lead {
        id: LeadId(id.to_string()),
        name: format!("客户{id}"),
        phone: "13800000000".to_string(),
        source: "douyin".to_string(),
        status: "following".to_string(),
        level: "B".to_string(),
        owner: Some(owner().id),
        last_follow_up: None,
        created_at: Some(assigned_at),
        updated_at: assigned_at,
        reclaim: None,
    }
}

pub(super) fn followed_up_lead(id: &str, silent_days: i64) -> Lead {
    let mut lead = assigned_lead(id, silent_days + 5);
    lead.last_follow_up = Some(base_now() - Duration::days(silent_days));
    lead
}

pub(super) fn follow_up(lead: &Lead, operator: &str, days_ago: i64) -> FollowUpRecord {
    FollowUpRecord {
        lead: lead.id.clone(),
        kind: "call".to_string(),
        content: "电话跟进".to_string(),
        operator: operator.to_string(),
        recorded_at: base_now() - Duration::days(days_ago),
    }
}

pub(super) fn rules() -> RecycleRules {
    RecycleRules::default()
}

pub(super) fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.upsert_staff(owner());
    store
}

pub(super) fn build_cycle(store: Arc<MemoryStore>, clock: Arc<FixedClock>) -> RecycleCycle<MemoryStore> {
    RecycleCycle::new(store, clock)
}

pub(super) fn notifications(store: &MemoryStore, staff: &StaffId) -> Vec<Notification> {
    store.notifications_for(staff).expect("inbox readable")
}

pub(super) fn audit_entries(store: &MemoryStore, lead: &LeadId) -> Vec<TransferRecord> {
    let filter = TransferFilter {
        lead: Some(lead.clone()),
        action: None,
    };
    store
        .transfers(&filter, Page::new(1, 100))
        .expect("audit readable")
        .0
}

/// Store whose every operation fails, for exercising error paths the way
/// the scheduler must survive them.
pub(super) struct UnavailableStore;

fn unavailable() -> StoreError {
    StoreError::Unavailable("database offline".to_string())
}

impl LeadStore for UnavailableStore {
    fn lead(&self, _id: &LeadId) -> Result<Option<Lead>, StoreError> {
        Err(unavailable())
    }

    fn insert_lead(&self, _lead: Lead) -> Result<(), StoreError> {
        Err(unavailable())
    }

    fn assigned_leads(&self) -> Result<Vec<Lead>, StoreError> {
        Err(unavailable())
    }

    fn pooled_leads(
        &self,
        _filter: &PoolFilter,
        _page: Page,
    ) -> Result<(Vec<Lead>, usize), StoreError> {
        Err(unavailable())
    }

    fn leads_by_ids(&self, _ids: &[LeadId]) -> Result<Vec<Lead>, StoreError> {
        Err(unavailable())
    }

    fn claim_if_pooled(&self, _id: &LeadId, _owner: &StaffId) -> Result<ClaimOutcome, StoreError> {
        Err(unavailable())
    }

    fn release_if_owned(
        &self,
        _id: &LeadId,
        _expected_owner: &StaffId,
        _info: ReclaimInfo,
    ) -> Result<Option<StaffId>, StoreError> {
        Err(unavailable())
    }

    fn delete_if_pooled(&self, _id: &LeadId) -> Result<bool, StoreError> {
        Err(unavailable())
    }
}

impl FollowUpStore for UnavailableStore {
    fn follow_ups(&self, _lead: &LeadId) -> Result<Vec<FollowUpRecord>, StoreError> {
        Err(unavailable())
    }

    fn insert_follow_up(&self, _record: FollowUpRecord) -> Result<(), StoreError> {
        Err(unavailable())
    }

    fn delete_follow_ups(&self, _lead: &LeadId) -> Result<(), StoreError> {
        Err(unavailable())
    }
}

impl StaffDirectory for UnavailableStore {
    fn staff(&self, _id: &StaffId) -> Result<Option<Staff>, StoreError> {
        Err(unavailable())
    }

    fn active_supervisors(&self) -> Result<Vec<Staff>, StoreError> {
        Err(unavailable())
    }
}

impl TransferLog for UnavailableStore {
    fn append_transfer(&self, _draft: TransferDraft) -> Result<TransferRecord, StoreError> {
        Err(unavailable())
    }

    fn transfers(
        &self,
        _filter: &TransferFilter,
        _page: Page,
    ) -> Result<(Vec<TransferRecord>, usize), StoreError> {
        Err(unavailable())
    }
}

impl NotificationSink for UnavailableStore {
    fn insert_notification_if_absent(
        &self,
        _draft: NotificationDraft,
    ) -> Result<bool, StoreError> {
        Err(unavailable())
    }

    fn notifications_for(&self, _recipient: &StaffId) -> Result<Vec<Notification>, StoreError> {
        Err(unavailable())
    }
}

impl RuleSource for UnavailableStore {
    fn recycle_rules(&self) -> Result<RecycleRules, StoreError> {
        Err(unavailable())
    }
}

impl Store for UnavailableStore {}
