use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Counts strictly below this are classified as critical
pub const CRITICAL_THRESHOLD: i64 = 5;
/// Counts strictly below this (and not critical) are classified as low
pub const LOW_THRESHOLD: i64 = 10;

/// One of the eight ABO/Rh blood groups, the sole partition key for inventory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BloodGroup {
    #[serde(rename = "A+")]
    APositive,
    #[serde(rename = "A-")]
    ANegative,
    #[serde(rename = "B+")]
    BPositive,
    #[serde(rename = "B-")]
    BNegative,
    #[serde(rename = "AB+")]
    AbPositive,
    #[serde(rename = "AB-")]
    AbNegative,
    #[serde(rename = "O+")]
    OPositive,
    #[serde(rename = "O-")]
    ONegative,
}

impl BloodGroup {
    /// All groups in display order
    pub const ALL: [BloodGroup; 8] = [
        BloodGroup::APositive,
        BloodGroup::ANegative,
        BloodGroup::BPositive,
        BloodGroup::BNegative,
        BloodGroup::AbPositive,
        BloodGroup::AbNegative,
        BloodGroup::OPositive,
        BloodGroup::ONegative,
    ];

    /// The code stored in the database and shown to users
    pub fn code(&self) -> &'static str {
        match self {
            BloodGroup::APositive => "A+",
            BloodGroup::ANegative => "A-",
            BloodGroup::BPositive => "B+",
            BloodGroup::BNegative => "B-",
            BloodGroup::AbPositive => "AB+",
            BloodGroup::AbNegative => "AB-",
            BloodGroup::OPositive => "O+",
            BloodGroup::ONegative => "O-",
        }
    }

    /// Position of this group in `ALL`
    pub fn index(&self) -> usize {
        match self {
            BloodGroup::APositive => 0,
            BloodGroup::ANegative => 1,
            BloodGroup::BPositive => 2,
            BloodGroup::BNegative => 3,
            BloodGroup::AbPositive => 4,
            BloodGroup::AbNegative => 5,
            BloodGroup::OPositive => 6,
            BloodGroup::ONegative => 7,
        }
    }
}

impl fmt::Display for BloodGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for BloodGroup {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        BloodGroup::ALL
            .into_iter()
            .find(|group| group.code() == normalized)
            .ok_or_else(|| ParseEnumError::new("blood group", s))
    }
}

/// Urgency of a hospital request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Priority {
    #[default]
    Normal,
    Urgent,
    Emergency,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Normal => "Normal",
            Priority::Urgent => "Urgent",
            Priority::Emergency => "Emergency",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Normal" => Ok(Priority::Normal),
            "Urgent" => Ok(Priority::Urgent),
            "Emergency" => Ok(Priority::Emergency),
            other => Err(ParseEnumError::new("priority", other)),
        }
    }
}

/// Lifecycle status of a hospital request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RequestStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "Pending",
            RequestStatus::Approved => "Approved",
            RequestStatus::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(RequestStatus::Pending),
            "Approved" => Ok(RequestStatus::Approved),
            "Rejected" => Ok(RequestStatus::Rejected),
            other => Err(ParseEnumError::new("request status", other)),
        }
    }
}

/// Status of a scheduled or completed donation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DonationStatus {
    #[default]
    Scheduled,
    Completed,
    Cancelled,
}

impl DonationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DonationStatus::Scheduled => "Scheduled",
            DonationStatus::Completed => "Completed",
            DonationStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for DonationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DonationStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Scheduled" => Ok(DonationStatus::Scheduled),
            "Completed" => Ok(DonationStatus::Completed),
            "Cancelled" => Ok(DonationStatus::Cancelled),
            other => Err(ParseEnumError::new("donation status", other)),
        }
    }
}

/// Severity banding of a group's current count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Critical,
    Low,
    Sufficient,
}

impl Severity {
    /// Classify a unit count using the fixed thresholds at 5 and 10
    pub fn classify(units_available: i64) -> Self {
        if units_available < CRITICAL_THRESHOLD {
            Severity::Critical
        } else if units_available < LOW_THRESHOLD {
            Severity::Low
        } else {
            Severity::Sufficient
        }
    }

    /// The alert raised for this severity, if any
    pub fn alert_type(&self) -> Option<AlertType> {
        match self {
            Severity::Critical => Some(AlertType::Critical),
            Severity::Low => Some(AlertType::Low),
            Severity::Sufficient => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Critical => write!(f, "Critical"),
            Severity::Low => write!(f, "Low"),
            Severity::Sufficient => write!(f, "Sufficient"),
        }
    }
}

/// Kind of inventory alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertType {
    Low,
    Critical,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Low => "Low",
            AlertType::Critical => "Critical",
        }
    }
}

impl FromStr for AlertType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Low" => Ok(AlertType::Low),
            "Critical" => Ok(AlertType::Critical),
            other => Err(ParseEnumError::new("alert type", other)),
        }
    }
}

/// Error returned when a stored or submitted code does not name a known variant
#[derive(Debug, Clone, PartialEq)]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid {}: '{}'", self.kind, self.value)
    }
}

impl std::error::Error for ParseEnumError {}

/// Per-group unit counter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BloodUnitCounter {
    pub blood_group: BloodGroup,
    pub units_available: i64,
    /// RFC 3339 timestamp of the last change
    pub last_updated: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Donor {
    pub id: i64,
    pub name: String,
    pub age: i64,
    pub blood_group: BloodGroup,
    pub contact_info: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub health_status: Option<String>,
    /// ISO date (YYYY-MM-DD) of the most recent completed donation
    pub last_donation_date: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonationEvent {
    pub id: i64,
    pub donor_id: i64,
    /// Group the units were credited to (or will be, while scheduled)
    pub blood_group: BloodGroup,
    /// ISO date (YYYY-MM-DD)
    pub scheduled_date: String,
    pub time_slot: String,
    pub status: DonationStatus,
    /// Units received; zero until completed
    pub units: i64,
    pub notes: String,
    /// Set once the expiry sweep has removed these units from inventory
    pub expired: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BloodRequest {
    pub id: i64,
    pub hospital_name: String,
    pub blood_group: BloodGroup,
    pub units_requested: i64,
    /// ISO date (YYYY-MM-DD)
    pub request_date: String,
    pub priority: Priority,
    pub status: RequestStatus,
    pub notes: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryAlert {
    pub id: i64,
    pub blood_group: BloodGroup,
    pub alert_type: AlertType,
    pub message: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterDonorRequest {
    pub name: String,
    pub age: i64,
    pub blood_group: BloodGroup,
    pub contact_info: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub health_status: Option<String>,
    /// ISO date (YYYY-MM-DD) of the first scheduled donation
    pub scheduled_date: String,
    pub time_slot: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterDonorResponse {
    pub donor: Donor,
    pub scheduled_donation: DonationEvent,
}

/// Partial correction of a donor record; absent fields are left unchanged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct UpdateDonorRequest {
    pub name: Option<String>,
    pub age: Option<i64>,
    pub blood_group: Option<BloodGroup>,
    pub contact_info: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub health_status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordDonationRequest {
    pub blood_group: BloodGroup,
    pub units: i64,
    pub donor_id: i64,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordDonationResponse {
    pub new_count: i64,
    pub donation_event_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteDonationRequest {
    pub units: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitBloodRequest {
    pub hospital_name: String,
    pub blood_group: BloodGroup,
    pub units: i64,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitRequestResponse {
    pub request_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetRequestStatusRequest {
    pub status: RequestStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetRequestStatusResponse {
    pub new_count: i64,
}

/// Full replacement of a request's editable fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditBloodRequest {
    pub hospital_name: String,
    pub blood_group: BloodGroup,
    pub units: i64,
    pub priority: Priority,
    pub status: RequestStatus,
    #[serde(default)]
    pub notes: String,
}

impl EditBloodRequest {
    /// An edit that keeps every field of `request` as it is
    pub fn from_request(request: &BloodRequest) -> Self {
        Self {
            hospital_name: request.hospital_name.clone(),
            blood_group: request.blood_group,
            units: request.units_requested,
            priority: request.priority,
            status: request.status,
            notes: request.notes.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryLevel {
    pub blood_group: BloodGroup,
    pub units_available: i64,
    pub severity: Severity,
    pub last_updated: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventorySummaryResponse {
    pub levels: Vec<InventoryLevel>,
    pub total_units: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryStatistics {
    pub total_donors: i64,
    pub total_requests: i64,
    pub total_units: i64,
    pub approved_requests: i64,
    pub pending_requests: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpirySweepResponse {
    /// Units removed per group; groups with nothing expired are absent
    pub expired_units: BTreeMap<BloodGroup, i64>,
    /// Groups holding donations within a week of expiry
    pub expiring_soon: Vec<BloodGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonationHistoryEntry {
    pub donor: Donor,
    pub completed_donations: i64,
}
