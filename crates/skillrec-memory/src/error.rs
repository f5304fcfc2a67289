use skillrec_skills::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("database error: {0}")]
    Sqlite(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupt skill row {id}: {reason}")]
    CorruptRow { id: String, reason: String },
}

impl From<MemoryError> for StoreError {
    fn from(e: MemoryError) -> Self {
        match e {
            MemoryError::Sqlite(
                ref inner @ (sqlx::Error::PoolTimedOut
                | sqlx::Error::PoolClosed
                | sqlx::Error::Io(_)
                | sqlx::Error::Tls(_)),
            ) => StoreError::Unavailable(inner.to_string()),
            MemoryError::Json(inner) => StoreError::Serialization(inner),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_errors_map_to_unavailable() {
        let err: StoreError = MemoryError::Sqlite(sqlx::Error::PoolClosed).into();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[test]
    fn row_errors_map_to_backend() {
        let err: StoreError = MemoryError::Sqlite(sqlx::Error::RowNotFound).into();
        assert!(matches!(err, StoreError::Backend(_)));
    }
}
