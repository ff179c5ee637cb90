// src/ingest/types.rs
use anyhow::Result;

use crate::model::{RawItem, Source};

/// Supplies the source list at the start of every cycle.
#[async_trait::async_trait]
pub trait SourceSupplier: Send + Sync {
    async fn sources(&self) -> Result<Vec<Source>>;
}

/// Fetches raw items for one source. Timeouts are the adapter's business.
#[async_trait::async_trait]
pub trait FetchAdapter: Send + Sync {
    async fn fetch(&self, source: &Source) -> Result<Vec<RawItem>>;
    fn name(&self) -> &'static str;
}
