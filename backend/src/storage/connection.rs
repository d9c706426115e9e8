use anyhow::Result;
use shared::BloodGroup;
use sqlx::{migrate::MigrateDatabase, Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::info;

/// DbConnection owns the SQLite pool and the canonical schema.
///
/// SQLite allows one writer at a time, and a deferred transaction that reads
/// before it writes cannot be upgraded while another one is doing the same.
/// Every write unit of work therefore goes through [`DbConnection::begin`],
/// which holds the writer gate until the transaction ends.
#[derive(Clone)]
pub struct DbConnection {
    pool: Arc<SqlitePool>,
    writer: Arc<Mutex<()>>,
}

/// An open write transaction holding the writer gate.
///
/// Derefs to the underlying connection, so repositories take `&mut *tx`.
/// Dropping it without `commit` rolls back and releases the gate.
pub struct WriteTransaction {
    tx: Transaction<'static, Sqlite>,
    _writer: OwnedMutexGuard<()>,
}

impl WriteTransaction {
    pub async fn commit(self) -> Result<(), sqlx::Error> {
        let Self { tx, _writer } = self;
        tx.commit().await
    }

    pub async fn rollback(self) -> Result<(), sqlx::Error> {
        let Self { tx, _writer } = self;
        tx.rollback().await
    }
}

impl Deref for WriteTransaction {
    type Target = SqliteConnection;

    fn deref(&self) -> &SqliteConnection {
        &self.tx
    }
}

impl DerefMut for WriteTransaction {
    fn deref_mut(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }
}

impl DbConnection {
    /// Create a new database connection
    pub async fn new(url: &str) -> Result<Self> {
        // Create database if it doesn't exist
        if !Sqlite::database_exists(url).await.unwrap_or(false) {
            Sqlite::create_database(url).await?
        }

        let pool = SqlitePool::connect(url).await?;

        Self::setup_schema(&pool).await?;
        Self::seed_inventory(&pool).await?;

        info!("Database ready at {}", url);
        Ok(Self {
            pool: Arc::new(pool),
            writer: Arc::new(Mutex::new(())),
        })
    }

    /// Initialize a test database with a unique name
    #[cfg(test)]
    pub async fn init_test() -> Result<Self> {
        let test_id = uuid::Uuid::new_v4().to_string();
        let db_url = format!("file:memdb_{}?mode=memory&cache=shared", test_id);

        Self::new(&db_url).await
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Begin a write unit of work once no other one is open
    pub async fn begin(&self) -> Result<WriteTransaction, sqlx::Error> {
        let writer = Arc::clone(&self.writer).lock_owned().await;
        let tx = self.pool.begin().await?;
        Ok(WriteTransaction { tx, _writer: writer })
    }

    /// Set up the required database schema
    async fn setup_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS blood_inventory (
                blood_group TEXT PRIMARY KEY
                    CHECK (blood_group IN ('A+', 'A-', 'B+', 'B-', 'AB+', 'AB-', 'O+', 'O-')),
                units_available INTEGER NOT NULL DEFAULT 0 CHECK (units_available >= 0),
                last_updated TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS donors (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                age INTEGER NOT NULL CHECK (age BETWEEN 18 AND 65),
                blood_group TEXT NOT NULL,
                contact_info TEXT NOT NULL,
                email TEXT,
                address TEXT,
                health_status TEXT,
                last_donation_date TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_donors_last_donation_date
            ON donors(last_donation_date);
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS donation_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                donor_id INTEGER NOT NULL,
                blood_group TEXT NOT NULL,
                scheduled_date TEXT NOT NULL,
                time_slot TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'Scheduled'
                    CHECK (status IN ('Scheduled', 'Completed', 'Cancelled')),
                units INTEGER NOT NULL DEFAULT 0 CHECK (units >= 0),
                notes TEXT NOT NULL DEFAULT '',
                expired INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                FOREIGN KEY (donor_id) REFERENCES donors (id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_donation_events_donor_id
            ON donation_events(donor_id);
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS blood_requests (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                hospital_name TEXT NOT NULL,
                blood_group TEXT NOT NULL,
                units_requested INTEGER NOT NULL CHECK (units_requested > 0),
                request_date TEXT NOT NULL,
                priority TEXT NOT NULL DEFAULT 'Normal'
                    CHECK (priority IN ('Normal', 'Urgent', 'Emergency')),
                status TEXT NOT NULL DEFAULT 'Pending'
                    CHECK (status IN ('Pending', 'Approved', 'Rejected')),
                notes TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_blood_requests_status
            ON blood_requests(status);
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS unit_receipts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                blood_group TEXT NOT NULL,
                units INTEGER NOT NULL CHECK (units > 0),
                received_date TEXT NOT NULL,
                donation_event_id INTEGER,
                expired INTEGER NOT NULL DEFAULT 0
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_unit_receipts_received_date
            ON unit_receipts(received_date);
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS inventory_alerts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                blood_group TEXT NOT NULL,
                alert_type TEXT NOT NULL CHECK (alert_type IN ('Low', 'Critical')),
                message TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Insert a zero counter for every group that has none yet
    async fn seed_inventory(pool: &SqlitePool) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        for group in BloodGroup::ALL {
            sqlx::query(
                r#"
                INSERT OR IGNORE INTO blood_inventory (blood_group, units_available, last_updated)
                VALUES (?, 0, ?)
                "#,
            )
            .bind(group.code())
            .bind(&now)
            .execute(pool)
            .await?;
        }
        Ok(())
    }
}
