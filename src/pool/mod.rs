//! Manual side of the ownership state machine: pool listings, claims,
//! assignments, drops, and administrative deletion.

pub mod router;
pub mod service;


pub use router::pool_router;
pub use service::{
    AssignReceipt, ClaimReceipt, DeleteReceipt, PoolError, PoolLeadView, PoolPage,
    PoolTransferService, ReturnReceipt, TransferPage, TransferView,
};
