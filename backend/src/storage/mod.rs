//! # Storage Module
//!
//! Persistence for the blood bank: a single SQLite database accessed through
//! sqlx.
//!
//! ## Components
//!
//! - **connection.rs** - pool ownership, canonical schema, counter seeding
//! - **repositories/** - one repository per table
//!
//! Repository functions are generic over the sqlx executor, so the same call
//! works against the pool for reads and against an open transaction when the
//! ledger composes several writes into one unit of work.

pub mod connection;
pub mod repositories;

pub use connection::{DbConnection, WriteTransaction};
pub use repositories::{
    AlertRepository, DonationRepository, DonorRepository, InventoryRepository, NewBloodRequest,
    NewDonationEvent, NewDonor, ReceiptRepository, RequestRepository, UnitReceipt,
};
