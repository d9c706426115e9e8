use shared::{BloodGroup, BloodRequest, Priority, RequestStatus};
use sqlx::{sqlite::SqliteRow, Executor, Row, Sqlite};

use super::parse_column;

/// Fields of a hospital request that does not exist yet
#[derive(Debug, Clone)]
pub struct NewBloodRequest {
    pub hospital_name: String,
    pub blood_group: BloodGroup,
    pub units_requested: i64,
    pub request_date: String,
    pub priority: Priority,
    pub notes: String,
    pub created_at: String,
}

/// Repository for hospital blood requests
pub struct RequestRepository;

const REQUEST_COLUMNS: &str = "id, hospital_name, blood_group, units_requested, request_date, \
     priority, status, notes, created_at, updated_at";

impl RequestRepository {
    /// Store a new request with status Pending and return its ID
    pub async fn insert<'e, E>(executor: E, request: &NewBloodRequest) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO blood_requests (
                hospital_name, blood_group, units_requested, request_date,
                priority, status, notes, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, 'Pending', ?, ?, ?)
            "#,
        )
        .bind(&request.hospital_name)
        .bind(request.blood_group.code())
        .bind(request.units_requested)
        .bind(&request.request_date)
        .bind(request.priority.as_str())
        .bind(&request.notes)
        .bind(&request.created_at)
        .bind(&request.created_at)
        .execute(executor)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Get a request by ID
    pub async fn find<'e, E>(executor: E, request_id: i64) -> Result<Option<BloodRequest>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let row = sqlx::query(&format!("SELECT {} FROM blood_requests WHERE id = ?", REQUEST_COLUMNS))
            .bind(request_id)
            .fetch_optional(executor)
            .await?;

        row.as_ref().map(request_from_row).transpose()
    }

    /// List requests newest first, optionally restricted to one status
    pub async fn list<'e, E>(executor: E, status: Option<RequestStatus>) -> Result<Vec<BloodRequest>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM blood_requests
            WHERE ? IS NULL OR status = ?
            ORDER BY request_date DESC, id DESC
            "#,
            REQUEST_COLUMNS
        ))
        .bind(status.map(|s| s.as_str()))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(executor)
        .await?;

        rows.iter().map(request_from_row).collect()
    }

    /// Overwrite every editable field of a request, including status
    pub async fn update<'e, E>(executor: E, request: &BloodRequest) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE blood_requests
            SET hospital_name = ?, blood_group = ?, units_requested = ?, priority = ?,
                status = ?, notes = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&request.hospital_name)
        .bind(request.blood_group.code())
        .bind(request.units_requested)
        .bind(request.priority.as_str())
        .bind(request.status.as_str())
        .bind(&request.notes)
        .bind(&request.updated_at)
        .bind(request.id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn set_status<'e, E>(
        executor: E,
        request_id: i64,
        status: RequestStatus,
        now: &str,
    ) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("UPDATE blood_requests SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(now)
            .bind(request_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete<'e, E>(executor: E, request_id: i64) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM blood_requests WHERE id = ?")
            .bind(request_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Count requests, optionally restricted to one status
    pub async fn count<'e, E>(executor: E, status: Option<RequestStatus>) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar("SELECT COUNT(*) FROM blood_requests WHERE ? IS NULL OR status = ?")
            .bind(status.map(|s| s.as_str()))
            .bind(status.map(|s| s.as_str()))
            .fetch_one(executor)
            .await
    }
}

fn request_from_row(row: &SqliteRow) -> Result<BloodRequest, sqlx::Error> {
    Ok(BloodRequest {
        id: row.try_get("id")?,
        hospital_name: row.try_get("hospital_name")?,
        blood_group: parse_column(row, "blood_group")?,
        units_requested: row.try_get("units_requested")?,
        request_date: row.try_get("request_date")?,
        priority: parse_column(row, "priority")?,
        status: parse_column(row, "status")?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
