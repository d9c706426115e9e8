use shared::{
    DonationEvent, DonationHistoryEntry, DonationStatus, Donor, RegisterDonorRequest, RegisterDonorResponse,
    UpdateDonorRequest,
};
use tracing::{info, warn};

use super::error::LedgerError;
use super::session::{format_date, parse_date, SessionContext};
use crate::storage::{DbConnection, DonationRepository, DonorRepository, NewDonationEvent, NewDonor};

pub const MIN_DONOR_AGE: i64 = 18;
pub const MAX_DONOR_AGE: i64 = 65;

/// Donor registry: identity records and donation scheduling.
///
/// Nothing here changes inventory. Deleting a donor is a ledger operation.
#[derive(Clone)]
pub struct DonorService {
    db: DbConnection,
}

impl DonorService {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Register a donor together with their first scheduled donation
    pub async fn register_donor(
        &self,
        session: &SessionContext,
        request: RegisterDonorRequest,
    ) -> Result<RegisterDonorResponse, LedgerError> {
        info!(
            "[{}] Registering donor: name={}, group={}, scheduled={} {}",
            session.operator(),
            request.name,
            request.blood_group,
            request.scheduled_date,
            request.time_slot
        );

        // Validate the registration
        validate_name(&request.name)?;
        validate_age(request.age)?;
        validate_contact(&request.contact_info)?;
        let email = normalize_optional(request.email);
        if let Some(email) = &email {
            validate_email(email)?;
        }
        let time_slot = request.time_slot.trim().to_string();
        if time_slot.is_empty() {
            return Err(LedgerError::invalid("Time slot cannot be empty"));
        }
        let scheduled_date = parse_date(&request.scheduled_date)
            .ok_or_else(|| LedgerError::invalid(format!("Invalid scheduled date: '{}'", request.scheduled_date)))?;

        let now = session.timestamp();
        let mut tx = self.db.begin().await?;

        let donor_id = DonorRepository::insert(
            &mut *tx,
            &NewDonor {
                name: request.name.trim().to_string(),
                age: request.age,
                blood_group: request.blood_group,
                contact_info: request.contact_info.trim().to_string(),
                email,
                address: normalize_optional(request.address),
                health_status: normalize_optional(request.health_status),
                created_at: now.clone(),
            },
        )
        .await?;

        let event_id = DonationRepository::insert(
            &mut *tx,
            &NewDonationEvent {
                donor_id,
                blood_group: request.blood_group,
                scheduled_date: format_date(scheduled_date),
                time_slot,
                status: DonationStatus::Scheduled,
                units: 0,
                notes: request.notes.trim().to_string(),
                created_at: now,
            },
        )
        .await?;

        let donor = DonorRepository::find(&mut *tx, donor_id).await?;
        let scheduled_donation = DonationRepository::find(&mut *tx, event_id).await?;
        let (donor, scheduled_donation) = match (donor, scheduled_donation) {
            (Some(donor), Some(event)) => (donor, event),
            _ => {
                tx.rollback().await?;
                return Err(LedgerError::Storage(sqlx::Error::RowNotFound));
            }
        };

        tx.commit().await?;

        info!(
            "Registered donor {} with ID {}; donation {} scheduled",
            donor.name, donor.id, scheduled_donation.id
        );
        Ok(RegisterDonorResponse {
            donor,
            scheduled_donation,
        })
    }

    /// Correct a donor's record. Past donations keep the group they were
    /// credited to.
    pub async fn update_donor(
        &self,
        session: &SessionContext,
        donor_id: i64,
        request: UpdateDonorRequest,
    ) -> Result<Donor, LedgerError> {
        info!("[{}] Updating donor: {}", session.operator(), donor_id);

        let mut donor = self.get_donor(donor_id).await?;

        // Update fields if provided
        if let Some(name) = request.name {
            validate_name(&name)?;
            donor.name = name.trim().to_string();
        }
        if let Some(age) = request.age {
            validate_age(age)?;
            donor.age = age;
        }
        if let Some(blood_group) = request.blood_group {
            donor.blood_group = blood_group;
        }
        if let Some(contact_info) = request.contact_info {
            validate_contact(&contact_info)?;
            donor.contact_info = contact_info.trim().to_string();
        }
        if let Some(email) = request.email {
            donor.email = normalize_optional(Some(email));
            if let Some(email) = &donor.email {
                validate_email(email)?;
            }
        }
        if let Some(address) = request.address {
            donor.address = normalize_optional(Some(address));
        }
        if let Some(health_status) = request.health_status {
            donor.health_status = normalize_optional(Some(health_status));
        }
        donor.updated_at = session.timestamp();

        let mut tx = self.db.begin().await?;
        if !DonorRepository::update(&mut *tx, &donor).await? {
            tx.rollback().await?;
            warn!("Donor disappeared during update: {}", donor_id);
            return Err(LedgerError::not_found("Donor", donor_id));
        }
        tx.commit().await?;

        info!("Updated donor: {} with ID: {}", donor.name, donor.id);
        Ok(donor)
    }

    /// Get a donor by ID
    pub async fn get_donor(&self, donor_id: i64) -> Result<Donor, LedgerError> {
        match DonorRepository::find(self.db.pool(), donor_id).await? {
            Some(donor) => Ok(donor),
            None => {
                warn!("Donor not found: {}", donor_id);
                Err(LedgerError::not_found("Donor", donor_id))
            }
        }
    }

    pub async fn list_donors(&self) -> Result<Vec<Donor>, LedgerError> {
        let donors = DonorRepository::list(self.db.pool()).await?;
        info!("Found {} donors", donors.len());
        Ok(donors)
    }

    /// Every donation event of one donor, newest first
    pub async fn list_donation_events(&self, donor_id: i64) -> Result<Vec<DonationEvent>, LedgerError> {
        self.get_donor(donor_id).await?;
        Ok(DonationRepository::list_for_donor(self.db.pool(), donor_id).await?)
    }

    /// Donors whose last donation falls within `[from, to]`
    pub async fn donation_history(&self, from: &str, to: &str) -> Result<Vec<DonationHistoryEntry>, LedgerError> {
        info!("Donation history from {} to {}", from, to);

        let from = parse_date(from).ok_or_else(|| LedgerError::invalid(format!("Invalid start date: '{}'", from)))?;
        let to = parse_date(to).ok_or_else(|| LedgerError::invalid(format!("Invalid end date: '{}'", to)))?;
        if from > to {
            return Err(LedgerError::invalid("Start date must not be after end date"));
        }

        let rows = DonorRepository::list_by_last_donation(self.db.pool(), &format_date(from), &format_date(to)).await?;
        Ok(rows
            .into_iter()
            .map(|(donor, completed_donations)| DonationHistoryEntry {
                donor,
                completed_donations,
            })
            .collect())
    }

    /// Cancel a donation that has not happened yet
    pub async fn cancel_scheduled_donation(
        &self,
        session: &SessionContext,
        event_id: i64,
    ) -> Result<DonationEvent, LedgerError> {
        info!("[{}] Cancelling scheduled donation {}", session.operator(), event_id);

        let event = DonationRepository::find(self.db.pool(), event_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Donation", event_id))?;

        // The update only matches Scheduled rows, so a concurrent completion wins cleanly
        let mut tx = self.db.begin().await?;
        if !DonationRepository::cancel(&mut *tx, event_id).await? {
            let current = DonationRepository::find(&mut *tx, event_id)
                .await?
                .map(|event| event.status)
                .unwrap_or(event.status);
            tx.rollback().await?;
            warn!("Donation {} cannot be cancelled from {}", event_id, current);
            return Err(LedgerError::transition(current, DonationStatus::Cancelled));
        }
        tx.commit().await?;

        info!("Cancelled donation {} for donor {}", event_id, event.donor_id);
        Ok(DonationEvent {
            status: DonationStatus::Cancelled,
            ..event
        })
    }
}

fn validate_name(name: &str) -> Result<(), LedgerError> {
    if name.trim().is_empty() {
        return Err(LedgerError::invalid("Donor name cannot be empty"));
    }
    Ok(())
}

fn validate_age(age: i64) -> Result<(), LedgerError> {
    if !(MIN_DONOR_AGE..=MAX_DONOR_AGE).contains(&age) {
        return Err(LedgerError::invalid(format!(
            "Age must be between {} and {}",
            MIN_DONOR_AGE, MAX_DONOR_AGE
        )));
    }
    Ok(())
}

fn validate_contact(contact_info: &str) -> Result<(), LedgerError> {
    if contact_info.trim().is_empty() {
        return Err(LedgerError::invalid("Contact information cannot be empty"));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), LedgerError> {
    if !is_valid_email(email) {
        return Err(LedgerError::invalid(format!("Invalid email format: '{}'", email)));
    }
    Ok(())
}

/// local@host.tld where the TLD is at least two letters
fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };

    let local_ok = !local.is_empty()
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '%' | '+' | '-'));
    let host_ok = !host.is_empty() && host.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-'));
    let tld_ok = tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic());

    local_ok && host_ok && tld_ok
}

/// Blank optional text is stored as NULL
fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LedgerService;
    use chrono::NaiveDate;
    use shared::{BloodGroup, RecordDonationRequest};

    async fn setup_test() -> (DonorService, DbConnection, SessionContext) {
        let db = DbConnection::init_test().await.expect("Failed to create test database");
        let session = SessionContext::on_date("registrar", NaiveDate::from_ymd_opt(2026, 6, 15).unwrap());
        (DonorService::new(db.clone()), db, session)
    }

    fn registration(name: &str, age: i64) -> RegisterDonorRequest {
        RegisterDonorRequest {
            name: name.to_string(),
            age,
            blood_group: BloodGroup::OPositive,
            contact_info: "555-0100".to_string(),
            email: Some("donor@example.org".to_string()),
            address: Some("  ".to_string()),
            health_status: None,
            scheduled_date: "2026-06-20".to_string(),
            time_slot: "10:00 AM".to_string(),
            notes: "first visit".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_donor_schedules_first_donation() {
        let (service, db, session) = setup_test().await;

        let response = service.register_donor(&session, registration(" Maria ", 30)).await.unwrap();

        assert_eq!(response.donor.name, "Maria");
        assert_eq!(response.donor.email.as_deref(), Some("donor@example.org"));
        assert_eq!(response.donor.address, None);
        assert_eq!(response.donor.last_donation_date, None);

        let event = &response.scheduled_donation;
        assert_eq!(event.donor_id, response.donor.id);
        assert_eq!(event.status, DonationStatus::Scheduled);
        assert_eq!(event.scheduled_date, "2026-06-20");
        assert_eq!(event.time_slot, "10:00 AM");
        assert_eq!(event.units, 0);

        let total = crate::storage::InventoryRepository::total_units(db.pool()).await.unwrap();
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_register_donor_validation() {
        let (service, _db, session) = setup_test().await;

        for age in [17, 66] {
            let err = service.register_donor(&session, registration("Young", age)).await.unwrap_err();
            assert!(matches!(err, LedgerError::InvalidArgument(_)), "age {}", age);
        }
        assert!(service.register_donor(&session, registration("Edge", 18)).await.is_ok());
        assert!(service.register_donor(&session, registration("Edge", 65)).await.is_ok());

        let err = service.register_donor(&session, registration("", 30)).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidArgument(_)));

        let mut bad_email = registration("Mail", 30);
        bad_email.email = Some("not-an-email".to_string());
        assert!(service.register_donor(&session, bad_email).await.is_err());

        let mut bad_date = registration("Date", 30);
        bad_date.scheduled_date = "next week".to_string();
        assert!(service.register_donor(&session, bad_date).await.is_err());

        let mut no_slot = registration("Slot", 30);
        no_slot.time_slot = " ".to_string();
        assert!(service.register_donor(&session, no_slot).await.is_err());

        assert_eq!(service.list_donors().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_donor_applies_only_given_fields() {
        let (service, _db, session) = setup_test().await;
        let donor = service.register_donor(&session, registration("Ravi", 40)).await.unwrap().donor;

        let updated = service
            .update_donor(
                &session,
                donor.id,
                UpdateDonorRequest {
                    blood_group: Some(BloodGroup::BNegative),
                    address: Some("12 Elm St".to_string()),
                    email: Some(String::new()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Ravi");
        assert_eq!(updated.age, 40);
        assert_eq!(updated.blood_group, BloodGroup::BNegative);
        assert_eq!(updated.address.as_deref(), Some("12 Elm St"));
        assert_eq!(updated.email, None);
        assert_eq!(service.get_donor(donor.id).await.unwrap(), updated);

        let err = service
            .update_donor(
                &session,
                donor.id,
                UpdateDonorRequest {
                    age: Some(70),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidArgument(_)));

        let err = service
            .update_donor(&session, donor.id + 50, UpdateDonorRequest::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_cancel_scheduled_donation() {
        let (service, db, session) = setup_test().await;
        let response = service.register_donor(&session, registration("Lena", 28)).await.unwrap();
        let event_id = response.scheduled_donation.id;

        let cancelled = service.cancel_scheduled_donation(&session, event_id).await.unwrap();
        assert_eq!(cancelled.status, DonationStatus::Cancelled);

        let stored = DonationRepository::find(db.pool(), event_id).await.unwrap().unwrap();
        assert_eq!(stored.status, DonationStatus::Cancelled);

        let err = service.cancel_scheduled_donation(&session, event_id).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTransition { .. }));

        let err = service.cancel_scheduled_donation(&session, 999).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_cancelled_donation_cannot_be_completed() {
        let (service, db, session) = setup_test().await;
        let ledger = LedgerService::new(db.clone());
        let event_id = service
            .register_donor(&session, registration("Omar", 50))
            .await
            .unwrap()
            .scheduled_donation
            .id;

        service.cancel_scheduled_donation(&session, event_id).await.unwrap();
        let err = ledger
            .complete_scheduled_donation(&session, event_id, 1)
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_donation_history_range_and_counts() {
        let (service, db, session) = setup_test().await;
        let ledger = LedgerService::new(db.clone());

        let early = service.register_donor(&session, registration("Early", 30)).await.unwrap().donor;
        let late = service.register_donor(&session, registration("Late", 30)).await.unwrap().donor;
        service.register_donor(&session, registration("Never", 30)).await.unwrap();

        let donate = |donor_id: i64| RecordDonationRequest {
            blood_group: BloodGroup::OPositive,
            units: 1,
            donor_id,
            notes: String::new(),
        };
        let march = SessionContext::on_date("registrar", NaiveDate::from_ymd_opt(2026, 3, 5).unwrap());
        let may = SessionContext::on_date("registrar", NaiveDate::from_ymd_opt(2026, 5, 9).unwrap());
        ledger.record_donation(&march, donate(early.id)).await.unwrap();
        ledger.record_donation(&march, donate(late.id)).await.unwrap();
        ledger.record_donation(&may, donate(late.id)).await.unwrap();

        let history = service.donation_history("2026-01-01", "2026-12-31").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].donor.id, late.id);
        assert_eq!(history[0].completed_donations, 2);
        assert_eq!(history[1].donor.id, early.id);
        assert_eq!(history[1].completed_donations, 1);

        let march_only = service.donation_history("2026-03-05", "2026-03-05").await.unwrap();
        assert_eq!(march_only.len(), 1);
        assert_eq!(march_only[0].donor.id, early.id);

        assert!(service.donation_history("2026-12-31", "2026-01-01").await.is_err());
        assert!(service.donation_history("yesterday", "2026-01-01").await.is_err());
    }

    #[tokio::test]
    async fn test_list_donation_events_requires_known_donor() {
        let (service, _db, session) = setup_test().await;
        let donor = service.register_donor(&session, registration("Ida", 33)).await.unwrap().donor;

        assert_eq!(service.list_donation_events(donor.id).await.unwrap().len(), 1);
        assert!(service.list_donation_events(donor.id + 1).await.unwrap_err().is_not_found());
    }

    #[test]
    fn test_email_shape() {
        assert!(is_valid_email("a.b+c@mail.example.com"));
        assert!(is_valid_email("x_y%z@host-1.io"));
        assert!(!is_valid_email("no-at-sign.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@localhost"));
        assert!(!is_valid_email("user@example.c"));
        assert!(!is_valid_email("user@exa mple.com"));
        assert!(!is_valid_email("a@b@example.com"));
    }
}
