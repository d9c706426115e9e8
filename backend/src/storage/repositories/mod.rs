// Repository modules
pub mod alert_repository;
pub mod donation_repository;
pub mod donor_repository;
pub mod inventory_repository;
pub mod receipt_repository;
pub mod request_repository;

// Re-export repository types
pub use alert_repository::AlertRepository;
pub use donation_repository::{DonationRepository, NewDonationEvent};
pub use donor_repository::{DonorRepository, NewDonor};
pub use inventory_repository::InventoryRepository;
pub use receipt_repository::{ReceiptRepository, UnitReceipt};
pub use request_repository::{NewBloodRequest, RequestRepository};

use shared::ParseEnumError;
use sqlx::{sqlite::SqliteRow, Row};
use std::str::FromStr;

/// Decode a TEXT column holding one of the shared enum codes
pub(crate) fn parse_column<T>(row: &SqliteRow, column: &str) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = ParseEnumError>,
{
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|e: ParseEnumError| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}
