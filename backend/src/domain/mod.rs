//! # Domain Module
//!
//! Business rules of the blood bank.
//!
//! ## Services
//!
//! - **LedgerService** - every operation that changes unit counts, each one an
//!   atomic unit of work guarded by per-group locks
//! - **DonorService** - donor registration, corrections, scheduling and history
//! - **RequestService** - read access to hospital requests
//! - **InventoryService** - counts, severity banding, statistics and alerts
//!
//! All services report failures as [`LedgerError`]. Mutating calls take a
//! [`SessionContext`] naming the operator and the calendar day.

pub mod donor_service;
pub mod error;
pub mod inventory_service;
pub mod ledger_service;
pub mod locks;
pub mod request_service;
pub mod session;

pub use donor_service::DonorService;
pub use error::LedgerError;
pub use inventory_service::InventoryService;
pub use ledger_service::LedgerService;
pub use locks::InventoryLocks;
pub use request_service::RequestService;
pub use session::SessionContext;
