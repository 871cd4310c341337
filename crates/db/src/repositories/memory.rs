use tokio::sync::RwLock;

use estimator_core::domain::estimate::EstimateRecord;

use super::{EstimateRecordRepository, RepositoryError, StoredEstimateRecord};

#[derive(Default)]
pub struct InMemoryEstimateRecordRepository {
    records: RwLock<Vec<StoredEstimateRecord>>,
}

#[async_trait::async_trait]
impl EstimateRecordRepository for InMemoryEstimateRecordRepository {
    async fn append(&self, record: EstimateRecord) -> Result<i64, RepositoryError> {
        let mut records = self.records.write().await;
        let id = records.last().map_or(1, |stored| stored.id + 1);
        records.push(StoredEstimateRecord { id, record });
        Ok(id)
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<StoredEstimateRecord>, RepositoryError> {
        let records = self.records.read().await;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(records.iter().rev().take(limit).cloned().collect())
    }
}
