use shared::BloodGroup;
use sqlx::{sqlite::SqliteRow, Executor, Row, Sqlite};

use super::parse_column;

/// Units taken into stock on one day, tracked until they expire.
///
/// Receipts are independent of donors and donation events, so deleting a
/// donor never hides units from the expiry sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitReceipt {
    pub id: i64,
    pub blood_group: BloodGroup,
    pub units: i64,
    pub received_date: String,
    pub donation_event_id: Option<i64>,
}

pub struct ReceiptRepository;

impl ReceiptRepository {
    pub async fn insert<'e, E>(
        executor: E,
        group: BloodGroup,
        units: i64,
        received_date: &str,
        donation_event_id: Option<i64>,
    ) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO unit_receipts (blood_group, units, received_date, donation_event_id)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(group.code())
        .bind(units)
        .bind(received_date)
        .bind(donation_event_id)
        .execute(executor)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Unexpired receipts dated on or before `cutoff`, oldest first
    pub async fn list_expirable<'e, E>(executor: E, cutoff: &str) -> Result<Vec<UnitReceipt>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let rows = sqlx::query(
            r#"
            SELECT id, blood_group, units, received_date, donation_event_id
            FROM unit_receipts
            WHERE expired = 0 AND received_date <= ?
            ORDER BY received_date ASC, id ASC
            "#,
        )
        .bind(cutoff)
        .fetch_all(executor)
        .await?;

        rows.iter().map(receipt_from_row).collect()
    }

    pub async fn mark_expired<'e, E>(executor: E, receipt_id: i64) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("UPDATE unit_receipts SET expired = 1 WHERE id = ?")
            .bind(receipt_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Groups with unexpired units received in `(expiry_cutoff, warning_cutoff]`
    pub async fn groups_nearing_expiry<'e, E>(
        executor: E,
        warning_cutoff: &str,
        expiry_cutoff: &str,
    ) -> Result<Vec<BloodGroup>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT blood_group FROM unit_receipts
            WHERE expired = 0 AND received_date <= ? AND received_date > ?
            "#,
        )
        .bind(warning_cutoff)
        .bind(expiry_cutoff)
        .fetch_all(executor)
        .await?;

        let mut groups = rows
            .iter()
            .map(|row| parse_column(row, "blood_group"))
            .collect::<Result<Vec<BloodGroup>, _>>()?;
        groups.sort_by_key(|group| group.index());
        Ok(groups)
    }
}

fn receipt_from_row(row: &SqliteRow) -> Result<UnitReceipt, sqlx::Error> {
    Ok(UnitReceipt {
        id: row.try_get("id")?,
        blood_group: parse_column(row, "blood_group")?,
        units: row.try_get("units")?,
        received_date: row.try_get("received_date")?,
        donation_event_id: row.try_get("donation_event_id")?,
    })
}
