use shared::{BloodGroup, BloodUnitCounter};
use sqlx::{sqlite::SqliteRow, Executor, Row, Sqlite};

use super::parse_column;

/// Repository for the per-group unit counters
///
/// Only the ledger calls the mutating functions here, always inside a unit of work.
pub struct InventoryRepository;

impl InventoryRepository {
    /// Get the counter for one group
    pub async fn find<'e, E>(executor: E, group: BloodGroup) -> Result<Option<BloodUnitCounter>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let row = sqlx::query(
            r#"
            SELECT blood_group, units_available, last_updated
            FROM blood_inventory
            WHERE blood_group = ?
            "#,
        )
        .bind(group.code())
        .fetch_optional(executor)
        .await?;

        row.as_ref().map(counter_from_row).transpose()
    }

    /// List every counter in display order
    pub async fn list<'e, E>(executor: E) -> Result<Vec<BloodUnitCounter>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let rows = sqlx::query(
            r#"
            SELECT blood_group, units_available, last_updated
            FROM blood_inventory
            "#,
        )
        .fetch_all(executor)
        .await?;

        let mut counters = rows
            .iter()
            .map(counter_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        counters.sort_by_key(|counter| counter.blood_group.index());
        Ok(counters)
    }

    /// Current count for one group
    pub async fn units_available<'e, E>(executor: E, group: BloodGroup) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar("SELECT units_available FROM blood_inventory WHERE blood_group = ?")
            .bind(group.code())
            .fetch_one(executor)
            .await
    }

    /// Sum of all counters
    pub async fn total_units<'e, E>(executor: E) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar("SELECT COALESCE(SUM(units_available), 0) FROM blood_inventory")
            .fetch_one(executor)
            .await
    }

    /// Add units to a group; unbounded upward. Returns the new count.
    pub async fn credit<'e, E>(executor: E, group: BloodGroup, units: i64, now: &str) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar(
            r#"
            UPDATE blood_inventory
            SET units_available = units_available + ?, last_updated = ?
            WHERE blood_group = ?
            RETURNING units_available
            "#,
        )
        .bind(units)
        .bind(now)
        .bind(group.code())
        .fetch_one(executor)
        .await
    }

    /// Remove units from a group only if enough are available.
    ///
    /// Returns the new count, or `None` when the group holds fewer than `units`.
    pub async fn debit<'e, E>(
        executor: E,
        group: BloodGroup,
        units: i64,
        now: &str,
    ) -> Result<Option<i64>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar(
            r#"
            UPDATE blood_inventory
            SET units_available = units_available - ?, last_updated = ?
            WHERE blood_group = ? AND units_available >= ?
            RETURNING units_available
            "#,
        )
        .bind(units)
        .bind(now)
        .bind(group.code())
        .bind(units)
        .fetch_optional(executor)
        .await
    }
}

fn counter_from_row(row: &SqliteRow) -> Result<BloodUnitCounter, sqlx::Error> {
    Ok(BloodUnitCounter {
        blood_group: parse_column(row, "blood_group")?,
        units_available: row.try_get("units_available")?,
        last_updated: row.try_get("last_updated")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::DbConnection;

    const NOW: &str = "2026-03-01T10:00:00+00:00";

    async fn setup_test() -> DbConnection {
        DbConnection::init_test().await.expect("Failed to create test database")
    }

    #[tokio::test]
    async fn test_list_returns_groups_in_display_order() {
        let db = setup_test().await;

        let counters = InventoryRepository::list(db.pool()).await.unwrap();
        let groups: Vec<BloodGroup> = counters.iter().map(|c| c.blood_group).collect();
        assert_eq!(groups, BloodGroup::ALL.to_vec());
    }

    #[tokio::test]
    async fn test_credit_then_debit() {
        let db = setup_test().await;

        let count = InventoryRepository::credit(db.pool(), BloodGroup::AbNegative, 6, NOW)
            .await
            .unwrap();
        assert_eq!(count, 6);

        let count = InventoryRepository::debit(db.pool(), BloodGroup::AbNegative, 4, NOW)
            .await
            .unwrap();
        assert_eq!(count, Some(2));

        let counter = InventoryRepository::find(db.pool(), BloodGroup::AbNegative)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(counter.units_available, 2);
        assert_eq!(counter.last_updated, NOW);
    }

    #[tokio::test]
    async fn test_debit_refuses_to_go_negative() {
        let db = setup_test().await;
        InventoryRepository::credit(db.pool(), BloodGroup::BPositive, 3, NOW)
            .await
            .unwrap();

        let result = InventoryRepository::debit(db.pool(), BloodGroup::BPositive, 4, NOW)
            .await
            .unwrap();
        assert_eq!(result, None);

        let units = InventoryRepository::units_available(db.pool(), BloodGroup::BPositive)
            .await
            .unwrap();
        assert_eq!(units, 3);
    }

    #[tokio::test]
    async fn test_total_units_sums_all_groups() {
        let db = setup_test().await;
        assert_eq!(InventoryRepository::total_units(db.pool()).await.unwrap(), 0);

        InventoryRepository::credit(db.pool(), BloodGroup::APositive, 5, NOW)
            .await
            .unwrap();
        InventoryRepository::credit(db.pool(), BloodGroup::ONegative, 11, NOW)
            .await
            .unwrap();

        assert_eq!(InventoryRepository::total_units(db.pool()).await.unwrap(), 16);
    }
}
