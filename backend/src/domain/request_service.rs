use shared::{BloodRequest, RequestStatus};
use tracing::{info, warn};

use super::error::LedgerError;
use crate::storage::{DbConnection, RequestRepository};

/// Read side of hospital blood requests. Writes go through the ledger.
#[derive(Clone)]
pub struct RequestService {
    db: DbConnection,
}

impl RequestService {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Get a request by ID
    pub async fn get_request(&self, request_id: i64) -> Result<BloodRequest, LedgerError> {
        info!("Getting request: {}", request_id);

        match RequestRepository::find(self.db.pool(), request_id).await? {
            Some(request) => Ok(request),
            None => {
                warn!("Request not found: {}", request_id);
                Err(LedgerError::not_found("Request", request_id))
            }
        }
    }

    /// List requests, newest first, optionally limited to one status
    pub async fn list_requests(&self, status: Option<RequestStatus>) -> Result<Vec<BloodRequest>, LedgerError> {
        info!("Listing requests with status filter: {:?}", status);

        let requests = RequestRepository::list(self.db.pool(), status).await?;

        info!("Found {} requests", requests.len());
        Ok(requests)
    }
}

/// Shared field rules for submitted and edited requests
pub fn validate_request_fields(hospital_name: &str, units: i64) -> Result<(), LedgerError> {
    if hospital_name.trim().is_empty() {
        return Err(LedgerError::invalid("Hospital name cannot be empty"));
    }
    if units <= 0 {
        return Err(LedgerError::invalid("Units requested must be a positive number"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LedgerService, SessionContext};
    use chrono::NaiveDate;
    use shared::{BloodGroup, Priority, SubmitBloodRequest};

    async fn setup_test() -> (RequestService, LedgerService, SessionContext) {
        let db = DbConnection::init_test().await.expect("Failed to create test database");
        let session = SessionContext::on_date("desk", NaiveDate::from_ymd_opt(2026, 5, 2).unwrap());
        (RequestService::new(db.clone()), LedgerService::new(db), session)
    }

    async fn submit(ledger: &LedgerService, session: &SessionContext, hospital: &str, units: i64) -> i64 {
        ledger
            .submit_request(
                session,
                SubmitBloodRequest {
                    hospital_name: format!("  {}  ", hospital),
                    blood_group: BloodGroup::ANegative,
                    units,
                    priority: Priority::Urgent,
                    notes: String::new(),
                },
            )
            .await
            .unwrap()
            .request_id
    }

    #[tokio::test]
    async fn test_get_request() {
        let (service, ledger, session) = setup_test().await;
        let request_id = submit(&ledger, &session, "St. Jude", 2).await;

        let request = service.get_request(request_id).await.unwrap();
        assert_eq!(request.hospital_name, "St. Jude");
        assert_eq!(request.priority, Priority::Urgent);
        assert_eq!(request.status, RequestStatus::Pending);

        let err = service.get_request(request_id + 1).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_requests_filters_by_status() {
        let (service, ledger, session) = setup_test().await;
        let first = submit(&ledger, &session, "North", 1).await;
        let second = submit(&ledger, &session, "South", 1).await;
        ledger
            .set_request_status(&session, first, RequestStatus::Rejected)
            .await
            .unwrap();

        let all = service.list_requests(None).await.unwrap();
        assert_eq!(all.len(), 2);

        let pending = service.list_requests(Some(RequestStatus::Pending)).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, second);

        let approved = service.list_requests(Some(RequestStatus::Approved)).await.unwrap();
        assert!(approved.is_empty());
    }

    #[test]
    fn test_validate_request_fields() {
        assert!(validate_request_fields("General", 1).is_ok());
        assert!(validate_request_fields("", 1).is_err());
        assert!(validate_request_fields(" \t", 1).is_err());
        assert!(validate_request_fields("General", 0).is_err());
        assert!(validate_request_fields("General", -4).is_err());
    }
}
