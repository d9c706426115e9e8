//! The ledger: sole writer of per-group unit counts.
//!
//! Every public operation is one unit of work. It locks the groups it may
//! touch, begins a write transaction (waiting for any other open one to
//! finish), applies all related writes, and commits. On any business-rule
//! failure the transaction is rolled back before the error is returned, so
//! callers never observe a partial update.
//!
//! Group locks are always taken before the writer gate, never while holding it.

use chrono::Duration;
use shared::{
    AlertType, BloodGroup, BloodRequest, DonationStatus, EditBloodRequest, ExpirySweepResponse,
    RecordDonationRequest, RecordDonationResponse, RequestStatus, SetRequestStatusResponse, Severity,
    SubmitBloodRequest, SubmitRequestResponse,
};
use sqlx::SqliteConnection;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::error::LedgerError;
use super::locks::{GroupGuards, InventoryLocks};
use super::request_service::validate_request_fields;
use super::session::{format_date, SessionContext};
use crate::storage::{
    AlertRepository, DbConnection, DonationRepository, DonorRepository, InventoryRepository, NewBloodRequest,
    NewDonationEvent, ReceiptRepository, RequestRepository, WriteTransaction,
};

/// Units received more than this many days ago are swept out of inventory
pub const EXPIRY_DAYS: i64 = 42;
/// Units at least this many days old raise an expiry warning
pub const EXPIRY_WARNING_DAYS: i64 = 35;

#[derive(Clone)]
pub struct LedgerService {
    db: DbConnection,
    locks: Arc<InventoryLocks>,
}

impl LedgerService {
    pub fn new(db: DbConnection) -> Self {
        Self {
            db,
            locks: Arc::new(InventoryLocks::new()),
        }
    }

    /// Credit donated units, stamp the donor's last donation date, and log a
    /// completed donation event
    pub async fn record_donation(
        &self,
        session: &SessionContext,
        request: RecordDonationRequest,
    ) -> Result<RecordDonationResponse, LedgerError> {
        info!(
            "[{}] Recording donation: group={}, units={}, donor={}",
            session.operator(),
            request.blood_group,
            request.units,
            request.donor_id
        );
        validate_units(request.units)?;

        let _guards = self.locks.acquire(&[request.blood_group]).await;
        let mut tx = self.db.begin().await?;

        if DonorRepository::find(&mut *tx, request.donor_id).await?.is_none() {
            return abort(tx, LedgerError::not_found("Donor", request.donor_id)).await;
        }

        let now = session.timestamp();
        let today = session.today_iso();

        let new_count = InventoryRepository::credit(&mut *tx, request.blood_group, request.units, &now).await?;
        DonorRepository::set_last_donation_date(&mut *tx, request.donor_id, &today, &now).await?;
        let donation_event_id = DonationRepository::insert(
            &mut *tx,
            &NewDonationEvent {
                donor_id: request.donor_id,
                blood_group: request.blood_group,
                scheduled_date: today.clone(),
                time_slot: session.time_slot(),
                status: DonationStatus::Completed,
                units: request.units,
                notes: request.notes.trim().to_string(),
                created_at: now,
            },
        )
        .await?;
        ReceiptRepository::insert(&mut *tx, request.blood_group, request.units, &today, Some(donation_event_id)).await?;

        tx.commit().await?;

        info!(
            "Donation {} recorded: {} now has {} units",
            donation_event_id, request.blood_group, new_count
        );
        Ok(RecordDonationResponse {
            new_count,
            donation_event_id,
        })
    }

    /// Turn a scheduled donation into a completed one once the units arrive
    pub async fn complete_scheduled_donation(
        &self,
        session: &SessionContext,
        event_id: i64,
        units: i64,
    ) -> Result<RecordDonationResponse, LedgerError> {
        info!(
            "[{}] Completing scheduled donation {} with {} units",
            session.operator(),
            event_id,
            units
        );
        validate_units(units)?;

        // An event's group never changes, so the snapshot is safe to lock on
        let snapshot = DonationRepository::find(self.db.pool(), event_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Donation", event_id))?;

        let _guards = self.locks.acquire(&[snapshot.blood_group]).await;
        let mut tx = self.db.begin().await?;

        let found = DonationRepository::find(&mut *tx, event_id).await?;
        let event = match found {
            Some(event) => event,
            None => return abort(tx, LedgerError::not_found("Donation", event_id)).await,
        };
        if event.status != DonationStatus::Scheduled {
            return abort(tx, LedgerError::transition(event.status, DonationStatus::Completed)).await;
        }

        let now = session.timestamp();
        let today = session.today_iso();

        let new_count = InventoryRepository::credit(&mut *tx, event.blood_group, units, &now).await?;
        DonorRepository::set_last_donation_date(&mut *tx, event.donor_id, &today, &now).await?;
        DonationRepository::complete(&mut *tx, event_id, units, &today).await?;
        ReceiptRepository::insert(&mut *tx, event.blood_group, units, &today, Some(event_id)).await?;

        tx.commit().await?;

        info!(
            "Scheduled donation {} completed: {} now has {} units",
            event_id, event.blood_group, new_count
        );
        Ok(RecordDonationResponse {
            new_count,
            donation_event_id: event_id,
        })
    }

    /// Store a new Pending request. Reserves nothing.
    pub async fn submit_request(
        &self,
        session: &SessionContext,
        request: SubmitBloodRequest,
    ) -> Result<SubmitRequestResponse, LedgerError> {
        info!(
            "[{}] Submitting request: hospital={}, group={}, units={}, priority={}",
            session.operator(),
            request.hospital_name,
            request.blood_group,
            request.units,
            request.priority
        );
        validate_request_fields(&request.hospital_name, request.units)?;

        let mut tx = self.db.begin().await?;
        let request_id = RequestRepository::insert(
            &mut *tx,
            &NewBloodRequest {
                hospital_name: request.hospital_name.trim().to_string(),
                blood_group: request.blood_group,
                units_requested: request.units,
                request_date: session.today_iso(),
                priority: request.priority,
                notes: request.notes.trim().to_string(),
                created_at: session.timestamp(),
            },
        )
        .await?;
        tx.commit().await?;

        info!("Request {} submitted as Pending", request_id);
        Ok(SubmitRequestResponse { request_id })
    }

    /// Approve or reject a Pending request. Approval debits the request's group.
    pub async fn set_request_status(
        &self,
        session: &SessionContext,
        request_id: i64,
        new_status: RequestStatus,
    ) -> Result<SetRequestStatusResponse, LedgerError> {
        info!(
            "[{}] Setting request {} to {}",
            session.operator(),
            request_id,
            new_status
        );
        if new_status == RequestStatus::Pending {
            return Err(LedgerError::invalid(
                "Request status can only be set to Approved or Rejected",
            ));
        }

        let (_guards, mut tx, request) = self.begin_for_request(request_id, None).await?;

        if request.status != RequestStatus::Pending {
            return abort(tx, LedgerError::transition(request.status, new_status)).await;
        }

        let now = session.timestamp();
        let new_count = if new_status == RequestStatus::Approved {
            let debited = debit_units(&mut tx, request.blood_group, request.units_requested, &now).await;
            match debited {
                Ok(count) => count,
                Err(err) => return abort(tx, err).await,
            }
        } else {
            InventoryRepository::units_available(&mut *tx, request.blood_group).await?
        };

        RequestRepository::set_status(&mut *tx, request_id, new_status, &now).await?;
        tx.commit().await?;

        info!(
            "Request {} is now {}; {} has {} units",
            request_id, new_status, request.blood_group, new_count
        );
        Ok(SetRequestStatusResponse { new_count })
    }

    /// Replace a request's fields, reconciling inventory against its previous
    /// committed effect
    pub async fn edit_request(
        &self,
        session: &SessionContext,
        request_id: i64,
        edit: EditBloodRequest,
    ) -> Result<BloodRequest, LedgerError> {
        info!(
            "[{}] Editing request {}: hospital={}, group={}, units={}, status={}",
            session.operator(),
            request_id,
            edit.hospital_name,
            edit.blood_group,
            edit.units,
            edit.status
        );
        validate_request_fields(&edit.hospital_name, edit.units)?;

        let (_guards, mut tx, current) = self.begin_for_request(request_id, Some(edit.blood_group)).await?;
        let now = session.timestamp();

        for (group, delta) in inventory_deltas(&current, &edit) {
            debug!("Request {} edit moves {} units of {}", request_id, delta, group);
            let applied = if delta > 0 {
                InventoryRepository::credit(&mut *tx, group, delta, &now)
                    .await
                    .map_err(LedgerError::from)
            } else {
                debit_units(&mut tx, group, -delta, &now).await
            };
            if let Err(err) = applied {
                return abort(tx, err).await;
            }
        }

        let updated = BloodRequest {
            id: current.id,
            hospital_name: edit.hospital_name.trim().to_string(),
            blood_group: edit.blood_group,
            units_requested: edit.units,
            request_date: current.request_date.clone(),
            priority: edit.priority,
            status: edit.status,
            notes: edit.notes.trim().to_string(),
            created_at: current.created_at.clone(),
            updated_at: now,
        };
        RequestRepository::update(&mut *tx, &updated).await?;
        tx.commit().await?;

        info!("Request {} updated", request_id);
        Ok(updated)
    }

    /// Remove a request; an Approved request's units go back to its group
    pub async fn delete_request(&self, session: &SessionContext, request_id: i64) -> Result<(), LedgerError> {
        info!("[{}] Deleting request {}", session.operator(), request_id);

        let (_guards, mut tx, request) = self.begin_for_request(request_id, None).await?;

        if request.status == RequestStatus::Approved {
            let now = session.timestamp();
            let count =
                InventoryRepository::credit(&mut *tx, request.blood_group, request.units_requested, &now).await?;
            info!(
                "Restored {} units of {} from approved request {}; now {}",
                request.units_requested, request.blood_group, request_id, count
            );
        }

        RequestRepository::delete(&mut *tx, request_id).await?;
        tx.commit().await?;

        info!("Deleted request {}", request_id);
        Ok(())
    }

    /// Remove a donor and their donation events.
    ///
    /// Inventory is left as is, and units the donor gave still expire on
    /// schedule because expiry works from unit receipts.
    pub async fn delete_donor(&self, session: &SessionContext, donor_id: i64) -> Result<(), LedgerError> {
        info!("[{}] Deleting donor {}", session.operator(), donor_id);

        let mut tx = self.db.begin().await?;

        if DonorRepository::find(&mut *tx, donor_id).await?.is_none() {
            return abort(tx, LedgerError::not_found("Donor", donor_id)).await;
        }

        let events_removed = DonationRepository::delete_for_donor(&mut *tx, donor_id).await?;
        DonorRepository::delete(&mut *tx, donor_id).await?;
        tx.commit().await?;

        info!(
            "Deleted donor {} and {} donation events; inventory unchanged",
            donor_id, events_removed
        );
        Ok(())
    }

    /// Best-effort removal of expired units, clamped so no count goes negative
    pub async fn sweep_expired(&self, session: &SessionContext) -> Result<ExpirySweepResponse, LedgerError> {
        let today = session.today();
        let expiry_cutoff = format_date(today - Duration::days(EXPIRY_DAYS));
        let warning_cutoff = format_date(today - Duration::days(EXPIRY_WARNING_DAYS));
        info!(
            "[{}] Sweeping units received on or before {}",
            session.operator(),
            expiry_cutoff
        );

        let _guards = self.locks.acquire_all().await;
        let mut tx = self.db.begin().await?;
        let now = session.timestamp();

        let mut expired_units: BTreeMap<BloodGroup, i64> = BTreeMap::new();
        for receipt in ReceiptRepository::list_expirable(&mut *tx, &expiry_cutoff).await? {
            let available = InventoryRepository::units_available(&mut *tx, receipt.blood_group).await?;
            let removed = receipt.units.min(available);
            if removed > 0 {
                InventoryRepository::debit(&mut *tx, receipt.blood_group, removed, &now).await?;
                *expired_units.entry(receipt.blood_group).or_insert(0) += removed;
            }
            if removed < receipt.units {
                warn!(
                    "Receipt {} expired {} units of {} but only {} were still in stock",
                    receipt.id, receipt.units, receipt.blood_group, removed
                );
            }
            ReceiptRepository::mark_expired(&mut *tx, receipt.id).await?;
            if let Some(event_id) = receipt.donation_event_id {
                DonationRepository::mark_expired(&mut *tx, event_id).await?;
            }
        }

        for group in expired_units.keys() {
            let count = InventoryRepository::units_available(&mut *tx, *group).await?;
            raise_alert_if_low(&mut tx, *group, count, &now).await?;
        }

        let expiring_soon = ReceiptRepository::groups_nearing_expiry(&mut *tx, &warning_cutoff, &expiry_cutoff).await?;
        for group in &expiring_soon {
            AlertRepository::insert(
                &mut *tx,
                *group,
                AlertType::Critical,
                &format!("{} has donated units expiring within a week", group),
                &now,
            )
            .await?;
        }

        tx.commit().await?;

        info!(
            "Expiry sweep removed {:?}; {} groups nearing expiry",
            expired_units,
            expiring_soon.len()
        );
        Ok(ExpirySweepResponse {
            expired_units,
            expiring_soon,
        })
    }

    /// Lock the request's current group (plus `also_lock`) and open a unit of
    /// work holding a fresh read of the request.
    ///
    /// Retries if another edit moved the request to a different group while
    /// this call was waiting for the locks.
    async fn begin_for_request(
        &self,
        request_id: i64,
        also_lock: Option<BloodGroup>,
    ) -> Result<(GroupGuards, WriteTransaction, BloodRequest), LedgerError> {
        loop {
            let snapshot = RequestRepository::find(self.db.pool(), request_id)
                .await?
                .ok_or_else(|| LedgerError::not_found("Request", request_id))?;

            let mut groups = vec![snapshot.blood_group];
            groups.extend(also_lock);
            let guards = self.locks.acquire(&groups).await;

            let mut tx = self.db.begin().await?;
            let current = RequestRepository::find(&mut *tx, request_id).await?;
            match current {
                Some(current) if current.blood_group == snapshot.blood_group => {
                    return Ok((guards, tx, current));
                }
                Some(_) => {
                    tx.rollback().await?;
                    debug!("Request {} changed group while waiting for locks; retrying", request_id);
                }
                None => return abort(tx, LedgerError::not_found("Request", request_id)).await,
            }
        }
    }
}

/// Net per-group change needed to move from `current`'s committed effect to
/// the effect `edit` describes. Only Approved requests hold units.
pub fn inventory_deltas(current: &BloodRequest, edit: &EditBloodRequest) -> Vec<(BloodGroup, i64)> {
    let mut deltas: BTreeMap<BloodGroup, i64> = BTreeMap::new();
    if current.status == RequestStatus::Approved {
        *deltas.entry(current.blood_group).or_insert(0) += current.units_requested;
    }
    if edit.status == RequestStatus::Approved {
        *deltas.entry(edit.blood_group).or_insert(0) -= edit.units;
    }
    deltas.into_iter().filter(|(_, delta)| *delta != 0).collect()
}

fn validate_units(units: i64) -> Result<(), LedgerError> {
    if units <= 0 {
        return Err(LedgerError::invalid("Units must be a positive number"));
    }
    Ok(())
}

/// Debit `units` from `group`, or report how many were actually available
async fn debit_units(
    conn: &mut SqliteConnection,
    group: BloodGroup,
    units: i64,
    now: &str,
) -> Result<i64, LedgerError> {
    match InventoryRepository::debit(&mut *conn, group, units, now).await? {
        Some(count) => {
            raise_alert_if_low(conn, group, count, now).await?;
            Ok(count)
        }
        None => {
            let available = InventoryRepository::units_available(&mut *conn, group).await?;
            Err(LedgerError::InsufficientInventory {
                blood_group: group,
                available,
                requested: units,
            })
        }
    }
}

async fn raise_alert_if_low(
    conn: &mut SqliteConnection,
    group: BloodGroup,
    count: i64,
    now: &str,
) -> Result<(), sqlx::Error> {
    let severity = Severity::classify(count);
    if let Some(alert_type) = severity.alert_type() {
        let message = format!("{} inventory is {} with {} units remaining", group, severity, count);
        warn!("{}", message);
        AlertRepository::insert(&mut *conn, group, alert_type, &message, now).await?;
    }
    Ok(())
}

/// Roll back and surface `err`
async fn abort<T>(tx: WriteTransaction, err: LedgerError) -> Result<T, LedgerError> {
    tx.rollback().await?;
    warn!("Unit of work rolled back: {}", err);
    Err(err)
}
