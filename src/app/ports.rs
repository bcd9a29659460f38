use crate::error::Result;
use crate::types::{Sample, Table};
use async_trait::async_trait;

#[derive(Clone, Debug)]
pub struct HttpGetResult {
    pub status: u16,
    pub bytes: Vec<u8>,
}

/// Source-side HTTP retrieval.
#[async_trait]
pub trait HttpClientPort: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpGetResult>;
}

/// Durable blob storage holding the staging and transformed slots.
/// `put` overwrites; re-running a stage produces the same object.
#[async_trait]
pub trait ObjectStorePort: Send + Sync {
    async fn put(&self, bucket: &str, key: &str, bytes: &[u8]) -> Result<()>;
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;
}

/// Destination warehouse for the cleaned dataset.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Ensures the destination table exists and replaces its entire
    /// contents with the given artifact. Returns the number of rows
    /// loaded. Full replace, never append: this is what keeps re-runs
    /// idempotent at the storage layer.
    async fn replace_all(&self, table: &Table) -> Result<u64>;

    /// Runs the fixed verification query (bounded projection of a few
    /// columns) against the destination table.
    async fn verification_sample(&self) -> Result<Sample>;
}
