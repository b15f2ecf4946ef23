use sea_orm::{DbErr, SqlErr, TransactionError};
use thiserror::Error;

/// Classified errors surfaced by the persistence core.
///
/// Callers (HTTP handlers, seeding scripts) branch on the variant, never on
/// storage-engine error text. Validation failures are raised before any row
/// is staged; duplicate and conflict failures are detected at commit time,
/// after the unit of work has been fully rolled back.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A single field failed a precondition before any write was attempted.
    #[error("validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    /// A uniqueness constraint (username, email, category name) would be
    /// violated.
    #[error("duplicate: {0}")]
    Duplicate(String),

    /// A foreign-key or referential-integrity violation surfaced at commit.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A lookup by key found no row.
    #[error("not found: {0}")]
    NotFound(String),

    /// Credential verification failed.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The password hasher itself failed (not a wrong password).
    #[error("password hash error: {0}")]
    PasswordHash(String),

    /// Infrastructure-level database failure. Constraint violations never
    /// surface through this variant; they are classified above.
    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

impl ServiceError {
    /// Convenience constructor for single-field validation failures.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ServiceError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Classifies a commit-time database error for a unit of work.
    ///
    /// Uniqueness violations become [`ServiceError::Duplicate`], foreign-key
    /// violations become [`ServiceError::Conflict`]; anything else is an
    /// infrastructure failure. `what` names the entity in domain terms so the
    /// raw engine message never crosses the crate boundary.
    pub fn classify_commit(err: DbErr, what: &str) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                ServiceError::Duplicate(format!("{what} already exists"))
            }
            Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
                ServiceError::Conflict(format!("{what} references a row that does not exist"))
            }
            _ => ServiceError::Database(err),
        }
    }

    /// Flattens sea-orm's transaction error wrapper back into the taxonomy.
    pub fn from_transaction(err: TransactionError<ServiceError>) -> Self {
        match err {
            TransactionError::Connection(e) => ServiceError::Database(e),
            TransactionError::Transaction(e) => e,
        }
    }

    /// True when the error was raised before any row was staged.
    pub fn is_validation(&self) -> bool {
        matches!(self, ServiceError::Validation { .. })
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        let field = err
            .field_errors()
            .keys()
            .next()
            .map(|k| (*k).to_string())
            .unwrap_or_else(|| "input".to_string());
        ServiceError::Validation {
            field,
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_carries_field_and_reason() {
        let err = ServiceError::validation("price", "non-positive");
        assert_eq!(
            err.to_string(),
            "validation failed for price: non-positive"
        );
        assert!(err.is_validation());
    }

    #[test]
    fn duplicate_and_conflict_messages_stay_in_domain_terms() {
        let dup = ServiceError::Duplicate("category 'Genesis' already exists".to_string());
        assert!(dup.to_string().contains("Genesis"));
        assert!(!dup.is_validation());
    }
}
