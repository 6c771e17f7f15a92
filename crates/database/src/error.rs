use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Invalid database configuration: {0}")]
    ConnectionConfig(String),

    #[error("Database migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("The requested record was not found.")]
    NotFound,

    /// A uniqueness, foreign-key or CHECK constraint was violated. The store
    /// is unchanged.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// The store was busy or a lock conflicted; the operation was rolled
    /// back and is safe to retry.
    #[error("Transient database failure: {0}")]
    Transient(String),

    #[error("Database error: {0}")]
    Sqlx(sqlx::Error),
}

impl DbError {
    /// True when the failed operation left the store unchanged and may be
    /// retried by the caller.
    pub fn is_transient(&self) -> bool {
        matches!(self, DbError::Transient(_))
    }
}

// SQLite reports lock contention through a handful of primary and extended
// result codes; everything else we care about is a constraint class that
// sqlx already categorizes for us.
const SQLITE_BUSY_CODES: &[&str] = &["5", "6", "261", "517"];

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound,
            sqlx::Error::PoolTimedOut => {
                DbError::Transient("timed out acquiring a connection from the pool".to_string())
            }
            sqlx::Error::Database(db_err) => {
                use sqlx::error::ErrorKind;
                match db_err.kind() {
                    ErrorKind::UniqueViolation
                    | ErrorKind::ForeignKeyViolation
                    | ErrorKind::NotNullViolation
                    | ErrorKind::CheckViolation => {
                        DbError::ConstraintViolation(db_err.message().to_string())
                    }
                    _ => {
                        let code = db_err.code().map(|c| c.to_string()).unwrap_or_default();
                        if SQLITE_BUSY_CODES.contains(&code.as_str()) {
                            DbError::Transient(db_err.message().to_string())
                        } else {
                            DbError::Sqlx(sqlx::Error::Database(db_err))
                        }
                    }
                }
            }
            other => DbError::Sqlx(other),
        }
    }
}
