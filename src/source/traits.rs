use async_trait::async_trait;

use crate::source::types::SourceError;

/// Pull side of the event source service.
///
/// Implementations return the raw JSON objects of one full-set fetch; field
/// mapping and validation happen in the sync engine.
#[async_trait]
pub trait EventSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_records(&self) -> Result<Vec<serde_json::Value>, SourceError>;
}
