//! # Error Handling
//!
//! Errors raised at the inventory/store boundary. Store failures are
//! classified into constraint kinds from the driver error so callers can
//! tell a duplicate or a dangling reference apart from other failures.
//! Nothing here is retried.

use std::fmt::Display;

use sea_orm::{DbErr, RuntimeErr};
use thiserror::Error;
use uuid::Uuid;

/// Errors produced by inventory repositories.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Duplicate `(tenant_id, hostname)`, `(tenant_id, ip_address)`, tag name or key.
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    /// Reference to a nonexistent row, or deletion of a still-referenced row.
    #[error("foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },
    /// Malformed input such as an IP address or a non-serializable value.
    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },
    #[error(
        "host tenant {host_tenant} does not match tenant {secret_tenant} of access secret {access_secret_id}"
    )]
    TenantMismatch {
        host_tenant: Uuid,
        access_secret_id: i32,
        secret_tenant: Uuid,
    },
    #[error("database error: {0}")]
    Database(#[source] DbErr),
}

impl RepositoryError {
    pub fn database_error(err: DbErr) -> Self {
        err.into()
    }

    pub fn validation_error<S: Into<String>>(field: &'static str, message: S) -> Self {
        RepositoryError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn not_found<K: Display>(entity: &'static str, key: K) -> Self {
        RepositoryError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound { .. })
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, RepositoryError::UniqueViolation(_))
    }

    pub fn is_foreign_key_violation(&self) -> bool {
        matches!(self, RepositoryError::ForeignKeyViolation(_))
    }
}

impl From<DbErr> for RepositoryError {
    fn from(err: DbErr) -> Self {
        match constraint_violation(&err) {
            Some(ConstraintKind::Unique(message)) => RepositoryError::UniqueViolation(message),
            Some(ConstraintKind::ForeignKey(message)) => {
                RepositoryError::ForeignKeyViolation(message)
            }
            None => match err {
                DbErr::RecordNotFound(message) => RepositoryError::NotFound {
                    entity: "record",
                    key: message,
                },
                other => RepositoryError::Database(other),
            },
        }
    }
}

enum ConstraintKind {
    Unique(String),
    ForeignKey(String),
}

const PG_UNIQUE: &str = "23505";
const PG_FOREIGN_KEY: &str = "23503";
const SQLITE_UNIQUE_CODES: &[&str] = &["1555", "2067"];
const SQLITE_FOREIGN_KEY: &str = "787";

fn constraint_violation(error: &DbErr) -> Option<ConstraintKind> {
    let runtime_err = match error {
        DbErr::Query(RuntimeErr::SqlxError(sqlx_err))
        | DbErr::Exec(RuntimeErr::SqlxError(sqlx_err))
        | DbErr::Conn(RuntimeErr::SqlxError(sqlx_err)) => sqlx_err,
        _ => return None,
    };

    let db_error = runtime_err.as_database_error()?;
    let message = db_error.message().to_string();

    if db_error.is_unique_violation() {
        return Some(ConstraintKind::Unique(message));
    }
    if db_error.is_foreign_key_violation() {
        return Some(ConstraintKind::ForeignKey(message));
    }

    let code = db_error.code()?;
    let code_str = code.as_ref();
    if code_str == PG_UNIQUE || SQLITE_UNIQUE_CODES.contains(&code_str) {
        Some(ConstraintKind::Unique(message))
    } else if code_str == PG_FOREIGN_KEY || code_str == SQLITE_FOREIGN_KEY {
        Some(ConstraintKind::ForeignKey(message))
    } else {
        None
    }
}
