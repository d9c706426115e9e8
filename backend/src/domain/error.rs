use shared::BloodGroup;

/// Typed failure of a ledger or registry operation.
///
/// Every variant is returned only after the unit of work has been rolled back.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Insufficient inventory for {blood_group}: {available} units available, {requested} required")]
    InsufficientInventory {
        blood_group: BloodGroup,
        available: i64,
        requested: i64,
    },
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl LedgerError {
    pub fn invalid(message: impl Into<String>) -> Self {
        LedgerError::InvalidArgument(message.into())
    }

    /// Unknown IDs are argument errors
    pub fn not_found(entity: &str, id: i64) -> Self {
        LedgerError::InvalidArgument(format!("{} not found: {}", entity, id))
    }

    pub fn transition(from: impl ToString, to: impl ToString) -> Self {
        LedgerError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Stable name of the error kind, used by the REST layer
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::InvalidArgument(_) => "InvalidArgument",
            LedgerError::InsufficientInventory { .. } => "InsufficientInventory",
            LedgerError::InvalidTransition { .. } => "InvalidTransition",
            LedgerError::Storage(_) => "Storage",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LedgerError::InvalidArgument(message) if message.contains("not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_and_kinds() {
        let err = LedgerError::InsufficientInventory {
            blood_group: BloodGroup::ONegative,
            available: 12,
            requested: 15,
        };
        assert_eq!(err.kind(), "InsufficientInventory");
        assert_eq!(
            err.to_string(),
            "Insufficient inventory for O-: 12 units available, 15 required"
        );

        let err = LedgerError::transition("Rejected", "Approved");
        assert_eq!(err.kind(), "InvalidTransition");
        assert_eq!(err.to_string(), "Invalid transition from Rejected to Approved");
    }

    #[test]
    fn test_not_found_is_an_invalid_argument() {
        let err = LedgerError::not_found("Donor", 7);
        assert_eq!(err.kind(), "InvalidArgument");
        assert!(err.is_not_found());
        assert!(!LedgerError::invalid("Units must be positive").is_not_found());
    }
}
