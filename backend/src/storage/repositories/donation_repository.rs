use shared::{BloodGroup, DonationEvent, DonationStatus};
use sqlx::{sqlite::SqliteRow, Executor, Row, Sqlite};

use super::parse_column;

/// Fields of a donation event that does not exist yet
#[derive(Debug, Clone)]
pub struct NewDonationEvent {
    pub donor_id: i64,
    pub blood_group: BloodGroup,
    pub scheduled_date: String,
    pub time_slot: String,
    pub status: DonationStatus,
    pub units: i64,
    pub notes: String,
    pub created_at: String,
}

/// Repository for scheduled and completed donations
pub struct DonationRepository;

const EVENT_COLUMNS: &str =
    "id, donor_id, blood_group, scheduled_date, time_slot, status, units, notes, expired, created_at";

impl DonationRepository {
    /// Store a donation event and return its ID
    pub async fn insert<'e, E>(executor: E, event: &NewDonationEvent) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO donation_events (
                donor_id, blood_group, scheduled_date, time_slot, status, units, notes, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(event.donor_id)
        .bind(event.blood_group.code())
        .bind(&event.scheduled_date)
        .bind(&event.time_slot)
        .bind(event.status.as_str())
        .bind(event.units)
        .bind(&event.notes)
        .bind(&event.created_at)
        .execute(executor)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Get a donation event by ID
    pub async fn find<'e, E>(executor: E, event_id: i64) -> Result<Option<DonationEvent>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let row = sqlx::query(&format!("SELECT {} FROM donation_events WHERE id = ?", EVENT_COLUMNS))
            .bind(event_id)
            .fetch_optional(executor)
            .await?;

        row.as_ref().map(event_from_row).transpose()
    }

    /// All events for one donor, most recent first
    pub async fn list_for_donor<'e, E>(executor: E, donor_id: i64) -> Result<Vec<DonationEvent>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM donation_events WHERE donor_id = ? ORDER BY scheduled_date DESC, id DESC",
            EVENT_COLUMNS
        ))
        .bind(donor_id)
        .fetch_all(executor)
        .await?;

        rows.iter().map(event_from_row).collect()
    }

    /// Mark a scheduled event as completed with the units actually received
    pub async fn complete<'e, E>(executor: E, event_id: i64, units: i64, date: &str) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE donation_events
            SET status = 'Completed', units = ?, scheduled_date = ?
            WHERE id = ? AND status = 'Scheduled'
            "#,
        )
        .bind(units)
        .bind(date)
        .bind(event_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Mark a scheduled event as cancelled
    pub async fn cancel<'e, E>(executor: E, event_id: i64) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "UPDATE donation_events SET status = 'Cancelled' WHERE id = ? AND status = 'Scheduled'",
        )
        .bind(event_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete every event belonging to a donor, returning how many were removed
    pub async fn delete_for_donor<'e, E>(executor: E, donor_id: i64) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM donation_events WHERE donor_id = ?")
            .bind(donor_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    /// Flag an event whose units the expiry sweep has removed
    pub async fn mark_expired<'e, E>(executor: E, event_id: i64) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("UPDATE donation_events SET expired = 1 WHERE id = ?")
            .bind(event_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn event_from_row(row: &SqliteRow) -> Result<DonationEvent, sqlx::Error> {
    Ok(DonationEvent {
        id: row.try_get("id")?,
        donor_id: row.try_get("donor_id")?,
        blood_group: parse_column(row, "blood_group")?,
        scheduled_date: row.try_get("scheduled_date")?,
        time_slot: row.try_get("time_slot")?,
        status: parse_column(row, "status")?,
        units: row.try_get("units")?,
        notes: row.try_get("notes")?,
        expired: row.try_get("expired")?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::repositories::{DonorRepository, NewDonor};
    use crate::storage::DbConnection;

    async fn setup_test() -> (DbConnection, i64) {
        let db = DbConnection::init_test().await.expect("Failed to create test database");
        let donor_id = DonorRepository::insert(
            db.pool(),
            &NewDonor {
                name: "Kofi".to_string(),
                age: 41,
                blood_group: BloodGroup::BNegative,
                contact_info: "555-0199".to_string(),
                email: None,
                address: None,
                health_status: None,
                created_at: "2026-01-01T08:00:00+00:00".to_string(),
            },
        )
        .await
        .unwrap();
        (db, donor_id)
    }

    fn event(donor_id: i64, date: &str, status: DonationStatus, units: i64) -> NewDonationEvent {
        NewDonationEvent {
            donor_id,
            blood_group: BloodGroup::BNegative,
            scheduled_date: date.to_string(),
            time_slot: "09:00 AM".to_string(),
            status,
            units,
            notes: String::new(),
            created_at: "2026-01-01T08:00:00+00:00".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_list_for_donor() {
        let (db, donor_id) = setup_test().await;

        DonationRepository::insert(db.pool(), &event(donor_id, "2026-01-10", DonationStatus::Completed, 1))
            .await
            .unwrap();
        DonationRepository::insert(db.pool(), &event(donor_id, "2026-02-10", DonationStatus::Scheduled, 0))
            .await
            .unwrap();

        let events = DonationRepository::list_for_donor(db.pool(), donor_id).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].scheduled_date, "2026-02-10");
        assert_eq!(events[0].status, DonationStatus::Scheduled);
        assert!(!events[1].expired);
    }

    #[tokio::test]
    async fn test_complete_only_applies_to_scheduled_events() {
        let (db, donor_id) = setup_test().await;
        let id = DonationRepository::insert(db.pool(), &event(donor_id, "2026-02-10", DonationStatus::Scheduled, 0))
            .await
            .unwrap();

        assert!(DonationRepository::complete(db.pool(), id, 2, "2026-02-11").await.unwrap());
        assert!(!DonationRepository::complete(db.pool(), id, 2, "2026-02-11").await.unwrap());
        assert!(!DonationRepository::cancel(db.pool(), id).await.unwrap());

        let stored = DonationRepository::find(db.pool(), id).await.unwrap().unwrap();
        assert_eq!(stored.status, DonationStatus::Completed);
        assert_eq!(stored.units, 2);
        assert_eq!(stored.scheduled_date, "2026-02-11");
    }

    #[tokio::test]
    async fn test_mark_expired() {
        let (db, donor_id) = setup_test().await;
        let id = DonationRepository::insert(db.pool(), &event(donor_id, "2026-01-01", DonationStatus::Completed, 2))
            .await
            .unwrap();

        assert!(DonationRepository::mark_expired(db.pool(), id).await.unwrap());
        assert!(DonationRepository::find(db.pool(), id).await.unwrap().unwrap().expired);
        assert!(!DonationRepository::mark_expired(db.pool(), id + 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_for_donor() {
        let (db, donor_id) = setup_test().await;
        for date in ["2026-01-01", "2026-01-02", "2026-01-03"] {
            DonationRepository::insert(db.pool(), &event(donor_id, date, DonationStatus::Scheduled, 0))
                .await
                .unwrap();
        }

        assert_eq!(DonationRepository::delete_for_donor(db.pool(), donor_id).await.unwrap(), 3);
        assert!(DonationRepository::list_for_donor(db.pool(), donor_id).await.unwrap().is_empty());
    }
}
