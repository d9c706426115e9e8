use shared::{BloodGroup, Donor};
use sqlx::{sqlite::SqliteRow, Executor, Row, Sqlite};

use super::parse_column;

/// Fields of a donor that does not exist yet
#[derive(Debug, Clone)]
pub struct NewDonor {
    pub name: String,
    pub age: i64,
    pub blood_group: BloodGroup,
    pub contact_info: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub health_status: Option<String>,
    pub created_at: String,
}

/// Repository for donor records
pub struct DonorRepository;

const DONOR_COLUMNS: &str = "id, name, age, blood_group, contact_info, email, address, \
     health_status, last_donation_date, created_at, updated_at";

impl DonorRepository {
    /// Store a donor and return its ID
    pub async fn insert<'e, E>(executor: E, donor: &NewDonor) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO donors (
                name, age, blood_group, contact_info, email, address,
                health_status, last_donation_date, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, NULL, ?, ?)
            "#,
        )
        .bind(&donor.name)
        .bind(donor.age)
        .bind(donor.blood_group.code())
        .bind(&donor.contact_info)
        .bind(&donor.email)
        .bind(&donor.address)
        .bind(&donor.health_status)
        .bind(&donor.created_at)
        .bind(&donor.created_at)
        .execute(executor)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Get a donor by ID
    pub async fn find<'e, E>(executor: E, donor_id: i64) -> Result<Option<Donor>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let row = sqlx::query(&format!("SELECT {} FROM donors WHERE id = ?", DONOR_COLUMNS))
            .bind(donor_id)
            .fetch_optional(executor)
            .await?;

        row.as_ref().map(donor_from_row).transpose()
    }

    /// List all donors ordered by name
    pub async fn list<'e, E>(executor: E) -> Result<Vec<Donor>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let rows = sqlx::query(&format!("SELECT {} FROM donors ORDER BY name ASC, id ASC", DONOR_COLUMNS))
            .fetch_all(executor)
            .await?;

        rows.iter().map(donor_from_row).collect()
    }

    /// Donors whose last donation falls in `[from, to]`, newest first,
    /// each paired with their number of completed donations
    pub async fn list_by_last_donation<'e, E>(
        executor: E,
        from: &str,
        to: &str,
    ) -> Result<Vec<(Donor, i64)>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {},
                (SELECT COUNT(*) FROM donation_events e
                 WHERE e.donor_id = donors.id AND e.status = 'Completed') AS completed_donations
            FROM donors
            WHERE last_donation_date BETWEEN ? AND ?
            ORDER BY last_donation_date DESC, id DESC
            "#,
            DONOR_COLUMNS
        ))
        .bind(from)
        .bind(to)
        .fetch_all(executor)
        .await?;

        rows.iter()
            .map(|row| -> Result<(Donor, i64), sqlx::Error> {
                Ok((donor_from_row(row)?, row.try_get("completed_donations")?))
            })
            .collect()
    }

    /// Overwrite the editable fields of a donor
    pub async fn update<'e, E>(executor: E, donor: &Donor) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE donors
            SET name = ?, age = ?, blood_group = ?, contact_info = ?, email = ?,
                address = ?, health_status = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&donor.name)
        .bind(donor.age)
        .bind(donor.blood_group.code())
        .bind(&donor.contact_info)
        .bind(&donor.email)
        .bind(&donor.address)
        .bind(&donor.health_status)
        .bind(&donor.updated_at)
        .bind(donor.id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Record that a donor just donated
    pub async fn set_last_donation_date<'e, E>(
        executor: E,
        donor_id: i64,
        date: &str,
        now: &str,
    ) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("UPDATE donors SET last_donation_date = ?, updated_at = ? WHERE id = ?")
            .bind(date)
            .bind(now)
            .bind(donor_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a donor. Donation events must be removed first by the caller.
    pub async fn delete<'e, E>(executor: E, donor_id: i64) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM donors WHERE id = ?")
            .bind(donor_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count<'e, E>(executor: E) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar("SELECT COUNT(*) FROM donors")
            .fetch_one(executor)
            .await
    }
}

fn donor_from_row(row: &SqliteRow) -> Result<Donor, sqlx::Error> {
    Ok(Donor {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        age: row.try_get("age")?,
        blood_group: parse_column(row, "blood_group")?,
        contact_info: row.try_get("contact_info")?,
        email: row.try_get("email")?,
        address: row.try_get("address")?,
        health_status: row.try_get("health_status")?,
        last_donation_date: row.try_get("last_donation_date")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
