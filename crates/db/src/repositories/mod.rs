use async_trait::async_trait;
use thiserror::Error;

use estimator_core::domain::estimate::EstimateRecord;
use estimator_core::errors::ApplicationError;

pub mod estimate_record;
pub mod memory;

pub use estimate_record::SqlEstimateRecordRepository;
pub use memory::InMemoryEstimateRecordRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        ApplicationError::Persistence(value.to_string())
    }
}

/// A persisted estimate row with its storage-assigned id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredEstimateRecord {
    pub id: i64,
    pub record: EstimateRecord,
}

/// Append-only store of flattened estimate rows.
#[async_trait]
pub trait EstimateRecordRepository: Send + Sync {
    async fn append(&self, record: EstimateRecord) -> Result<i64, RepositoryError>;

    /// Newest first.
    async fn list_recent(&self, limit: u32) -> Result<Vec<StoredEstimateRecord>, RepositoryError>;
}
