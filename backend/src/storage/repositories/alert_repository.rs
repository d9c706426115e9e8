use shared::{AlertType, BloodGroup, InventoryAlert};
use sqlx::{sqlite::SqliteRow, Executor, Row, Sqlite};

use super::parse_column;

/// Repository for low/critical inventory alerts
pub struct AlertRepository;

impl AlertRepository {
    pub async fn insert<'e, E>(
        executor: E,
        group: BloodGroup,
        alert_type: AlertType,
        message: &str,
        now: &str,
    ) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO inventory_alerts (blood_group, alert_type, message, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(group.code())
        .bind(alert_type.as_str())
        .bind(message)
        .bind(now)
        .execute(executor)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Most recent alerts first
    pub async fn list<'e, E>(executor: E, limit: u32) -> Result<Vec<InventoryAlert>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let rows = sqlx::query(
            r#"
            SELECT id, blood_group, alert_type, message, created_at
            FROM inventory_alerts
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(executor)
        .await?;

        rows.iter().map(alert_from_row).collect()
    }
}

fn alert_from_row(row: &SqliteRow) -> Result<InventoryAlert, sqlx::Error> {
    Ok(InventoryAlert {
        id: row.try_get("id")?,
        blood_group: parse_column(row, "blood_group")?,
        alert_type: parse_column(row, "alert_type")?,
        message: row.try_get("message")?,
        created_at: row.try_get("created_at")?,
    })
}
