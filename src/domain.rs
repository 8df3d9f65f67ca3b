//! Domain model for the lead ownership lifecycle.
//!
//! A lead is either assigned to exactly one salesperson or sitting in the
//! shared pool (`owner == None`); every transition between those two states
//! is recorded in the transfer audit log regardless of whether it was
//! triggered manually or by the recycling engine.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for leads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeadId(pub String);

impl fmt::Display for LeadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for staff members.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StaffId(pub String);

impl fmt::Display for StaffId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A sales lead as the recycling engine sees it.
///
/// `status` and `level` are dictionary-managed free strings elsewhere in the
/// CRM; this subsystem only inspects them for terminal-status exemption and
/// high-intent protection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub name: String,
    pub phone: String,
    pub source: String,
    pub status: String,
    pub level: String,
    pub owner: Option<StaffId>,
    pub last_follow_up: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub reclaim: Option<ReclaimInfo>,
}

impl Lead {
    pub fn is_pooled(&self) -> bool {
        self.owner.is_none()
    }

    /// The timestamp ownership is measured from.
    ///
    /// No distinct assigned-at column exists upstream, so this falls back
    /// from creation time to last-updated time. The fallback conflates "row
    /// created" with "ownership assigned" and is inexact after reassignment;
    /// it is isolated here so a dedicated column has one landing spot.
    pub fn assigned_at(&self) -> DateTime<Utc> {
        self.created_at.unwrap_or(self.updated_at)
    }

    pub fn in_terminal_status(&self) -> bool {
        TerminalStatus::from_label(&self.status).is_some()
    }

    /// Grade-A leads are protected from silence-based reclamation.
    pub fn is_high_intent(&self) -> bool {
        self.level.trim().to_ascii_uppercase().starts_with('A')
    }
}

/// Canonical terminal statuses. Leads in one of these are exempt from
/// recycling entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminalStatus {
    Signed,
    Invalid,
    Lost,
}

impl TerminalStatus {
    /// Resolves a raw status label, accepting both canonical and legacy
    /// localized synonyms. The table is built once; the vocabulary is not
    /// runtime-extensible by this engine.
    pub fn from_label(label: &str) -> Option<Self> {
        static SYNONYMS: OnceLock<HashMap<&'static str, TerminalStatus>> = OnceLock::new();
        let table = SYNONYMS.get_or_init(|| {
            HashMap::from([
                ("signed", TerminalStatus::Signed),
                ("已签约", TerminalStatus::Signed),
                ("invalid", TerminalStatus::Invalid),
                ("无效线索", TerminalStatus::Invalid),
                ("无效客户", TerminalStatus::Invalid),
                ("lost", TerminalStatus::Lost),
                ("战败流失", TerminalStatus::Lost),
            ])
        });
        table.get(label.trim()).copied()
    }
}

/// Why a lead was returned to the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropReason {
    /// Rule 1: assigned but never followed up.
    NeverFollowedUp,
    /// Rule 2: no contact for too long after the last follow-up.
    ContactSilence,
    /// Rule 3: heavily worked by the same owner without closing.
    StalledDeal,
    /// Owner or admin returned the lead manually.
    ManualReturn,
}

impl DropReason {
    /// Localized label shown in the pool UI, identical for manual and
    /// automatic drops of the same kind.
    pub const fn label(self) -> &'static str {
        match self {
            DropReason::NeverFollowedUp => "分配后未及时跟进",
            DropReason::ContactSilence => "跟进后长时间无联系",
            DropReason::StalledDeal => "久攻不下死单",
            DropReason::ManualReturn => "手动转入公海",
        }
    }
}

/// Fixed reclaim metadata stamped on a lead when it returns to the pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReclaimInfo {
    pub reason: DropReason,
    pub dropped_at: DateTime<Utc>,
    /// Display name of the owner the lead was taken from.
    pub previous_owner: String,
}

/// Immutable contact history entry. Read-only input to the evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowUpRecord {
    pub lead: LeadId,
    pub kind: String,
    pub content: String,
    /// Operator identity as recorded upstream: either a staff id or a
    /// display name, which is why rule 3 matches on both.
    pub operator: String,
    pub recorded_at: DateTime<Utc>,
}

/// Staff roles relevant to pool operations and notification fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Admin,
    Manager,
    Sales,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Staff {
    pub id: StaffId,
    pub name: String,
    pub role: StaffRole,
    pub active: bool,
}

impl Staff {
    pub fn is_supervisor(&self) -> bool {
        matches!(self.role, StaffRole::Admin | StaffRole::Manager)
    }
}

/// Kind of ownership transition recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferAction {
    Claim,
    Assign,
    ManualDrop,
    AutoRecycle,
}

impl TransferAction {
    pub const fn label(self) -> &'static str {
        match self {
            TransferAction::Claim => "claim",
            TransferAction::Assign => "assign",
            TransferAction::ManualDrop => "manual_drop",
            TransferAction::AutoRecycle => "auto_recycle",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "claim" => Some(TransferAction::Claim),
            "assign" => Some(TransferAction::Assign),
            "manual_drop" => Some(TransferAction::ManualDrop),
            "auto_recycle" => Some(TransferAction::AutoRecycle),
            _ => None,
        }
    }
}

/// Operator recorded on audit entries written by the recycling engine.
pub const SYSTEM_OPERATOR: &str = "system";

/// Audit entry before the log assigns its sequence number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferDraft {
    pub lead: LeadId,
    pub action: TransferAction,
    pub from_owner: Option<StaffId>,
    pub to_owner: Option<StaffId>,
    pub operator: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One immutable row of the transfer audit log, the sole source of truth for
/// ownership history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub id: u64,
    pub lead: LeadId,
    pub action: TransferAction,
    pub from_owner: Option<StaffId>,
    pub to_owner: Option<StaffId>,
    pub operator: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Recycling rule configuration. Mutated elsewhere in the CRM; strictly
/// read-only to this engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecycleRules {
    pub enabled: bool,
    pub rule1: StaleAssignmentRule,
    pub rule2: ContactSilenceRule,
    pub rule3: StalledDealRule,
    pub notify: NotifyToggles,
}

/// Rule 1: reclaim leads that were assigned but never followed up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StaleAssignmentRule {
    pub active: bool,
    pub days: u32,
}

/// Rule 2: reclaim leads with no contact for too long after a follow-up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSilenceRule {
    pub active: bool,
    pub days: u32,
    pub protect_high_intent: bool,
}

/// Rule 3: reclaim leads the owner has contacted many times without closing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StalledDealRule {
    pub active: bool,
    pub count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyToggles {
    pub before_drop: bool,
    pub after_drop: bool,
}

impl Default for RecycleRules {
    fn default() -> Self {
        Self {
            enabled: true,
            rule1: StaleAssignmentRule {
                active: true,
                days: 3,
            },
            rule2: ContactSilenceRule {
                active: true,
                days: 15,
                protect_high_intent: true,
            },
            rule3: StalledDealRule {
                active: false,
                count: 20,
            },
            notify: NotifyToggles {
                before_drop: true,
                after_drop: false,
            },
        }
    }
}

/// Notification inbox categories used by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    RecycleWarning,
    RecycleSummary,
}

impl NotificationCategory {
    pub const fn label(self) -> &'static str {
        match self {
            NotificationCategory::RecycleWarning => "recycle_warning",
            NotificationCategory::RecycleSummary => "recycle_summary",
        }
    }
}

/// A notification before the sink assigns identity and read state.
///
/// `event_key` names one logical occurrence; the sink's uniqueness
/// constraint on it is what makes delivery at-most-once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationDraft {
    pub recipient: StaffId,
    pub title: String,
    pub body: String,
    pub category: NotificationCategory,
    pub event_key: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: u64,
    pub recipient: StaffId,
    pub title: String,
    pub body: String,
    pub category: NotificationCategory,
    pub event_key: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}
