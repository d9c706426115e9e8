use shared::{
    BloodGroup, BloodUnitCounter, InventoryAlert, InventoryLevel, InventoryStatistics, InventorySummaryResponse,
    RequestStatus, Severity,
};
use std::collections::BTreeMap;
use tracing::info;

use super::error::LedgerError;
use crate::storage::{AlertRepository, DbConnection, DonorRepository, InventoryRepository, RequestRepository};

/// Read-only view over the counters
#[derive(Clone)]
pub struct InventoryService {
    db: DbConnection,
}

impl InventoryService {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Count and last-updated time of one group
    pub async fn get_counter(&self, group: BloodGroup) -> Result<BloodUnitCounter, LedgerError> {
        InventoryRepository::find(self.db.pool(), group)
            .await?
            .ok_or_else(|| LedgerError::invalid(format!("No inventory counter for {}", group)))
    }

    /// Current count of every group
    pub async fn get_inventory(&self) -> Result<BTreeMap<BloodGroup, i64>, LedgerError> {
        let counters = InventoryRepository::list(self.db.pool()).await?;
        Ok(counters
            .into_iter()
            .map(|counter| (counter.blood_group, counter.units_available))
            .collect())
    }

    pub async fn total_units(&self) -> Result<i64, LedgerError> {
        Ok(InventoryRepository::total_units(self.db.pool()).await?)
    }

    pub async fn get_severity(&self, group: BloodGroup) -> Result<Severity, LedgerError> {
        let units = InventoryRepository::units_available(self.db.pool(), group).await?;
        Ok(Severity::classify(units))
    }

    /// Per-group count with severity, in display order
    pub async fn summary(&self) -> Result<InventorySummaryResponse, LedgerError> {
        let counters = InventoryRepository::list(self.db.pool()).await?;
        let total_units = counters.iter().map(|counter| counter.units_available).sum();
        let levels = counters.into_iter().map(level_of).collect();

        Ok(InventorySummaryResponse { levels, total_units })
    }

    /// Dashboard totals
    pub async fn statistics(&self) -> Result<InventoryStatistics, LedgerError> {
        let pool = self.db.pool();
        let statistics = InventoryStatistics {
            total_donors: DonorRepository::count(pool).await?,
            total_requests: RequestRepository::count(pool, None).await?,
            total_units: InventoryRepository::total_units(pool).await?,
            approved_requests: RequestRepository::count(pool, Some(RequestStatus::Approved)).await?,
            pending_requests: RequestRepository::count(pool, Some(RequestStatus::Pending)).await?,
        };

        info!("Statistics: {:?}", statistics);
        Ok(statistics)
    }

    /// Most recent alerts first
    pub async fn list_alerts(&self, limit: u32) -> Result<Vec<InventoryAlert>, LedgerError> {
        Ok(AlertRepository::list(self.db.pool(), limit).await?)
    }
}

pub fn level_of(counter: BloodUnitCounter) -> InventoryLevel {
    InventoryLevel {
        blood_group: counter.blood_group,
        units_available: counter.units_available,
        severity: Severity::classify(counter.units_available),
        last_updated: counter.last_updated,
    }
}
