//! Database errors

use thiserror::Error;

/// Database errors
#[derive(Error, Debug)]
pub enum DbError {
    /// SQLx error
    #[error("database error: {0}")]
    Sqlx(sqlx::Error),

    /// Record not found
    #[error("record not found")]
    NotFound,

    /// Duplicate key violation
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// Foreign key violation
    #[error("foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// A stored value could not be mapped to its domain representation
    #[error("decode error: {0}")]
    Decode(String),

    /// Connection error
    #[error("connection error: {0}")]
    Connection(String),

    /// Migration error
    #[error("migration error: {0}")]
    Migration(String),
}

impl DbError {
    /// Check if the error is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Check if the error is a duplicate key error
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, Self::DuplicateKey(_))
    }
}

/// Result type alias for database operations
pub type DbResult<T> = Result<T, DbError>;

// Helper to convert SQLx errors to more specific DbError variants
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::NotFound,
            sqlx::Error::Database(db_err) => {
                if let Some(mysql_err) =
                    db_err.try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>()
                {
                    // MySQL error numbers
                    match mysql_err.number() {
                        // ER_DUP_ENTRY
                        1062 => {
                            return Self::DuplicateKey(mysql_err.message().to_string());
                        }
                        // ER_NO_REFERENCED_ROW_2
                        1452 => {
                            return Self::ForeignKeyViolation(mysql_err.message().to_string());
                        }
                        _ => {}
                    }
                }
                Self::Sqlx(err)
            }
            _ => Self::Sqlx(err),
        }
    }
}
