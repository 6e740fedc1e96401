use sea_orm::{DbErr, SqlErr};
use thiserror::Error;
use tracing::{error, warn};
use validator::ValidationErrors;

/// Error types for the data access layer
#[derive(Error, Debug)]
pub enum StoreError {
    /// The referenced row does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// A required field is empty, a reference dangles, a uniqueness rule
    /// is broken or a delete is restricted by dependent rows
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Any other error from the database
    #[error("Database error: {0}")]
    Database(#[source] DbErr),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn constraint(message: impl Into<String>) -> Self {
        StoreError::ConstraintViolation(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, StoreError::ConstraintViolation(_))
    }
}

// Storage-level constraint failures surface as ConstraintViolation so that
// a writer racing past the explicit checks gets the same error kind.
impl From<DbErr> for StoreError {
    fn from(error: DbErr) -> Self {
        match error.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                let err = StoreError::ConstraintViolation(format!("uniqueness violated: {}", detail));
                warn!(?err, "Storage rejected duplicate row");
                err
            }
            Some(SqlErr::ForeignKeyConstraintViolation(detail)) => {
                let err = StoreError::ConstraintViolation(format!("foreign key violated: {}", detail));
                warn!(?err, "Storage rejected dangling reference");
                err
            }
            _ => match error {
                DbErr::RecordNotFound(what) => StoreError::NotFound {
                    entity: "Record",
                    id: what,
                },
                DbErr::RecordNotUpdated => StoreError::NotFound {
                    entity: "Record",
                    id: "to update".to_string(),
                },
                other => {
                    error!(error = %other, "Database error");
                    StoreError::Database(other)
                }
            },
        }
    }
}

impl From<ValidationErrors> for StoreError {
    fn from(errors: ValidationErrors) -> Self {
        StoreError::ConstraintViolation(errors.to_string())
    }
}

/// Type alias for Result with StoreError
pub type Result<T> = std::result::Result<T, StoreError>;
