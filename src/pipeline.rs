use anyhow::Result;
use rusqlite::Connection;
use tracing::{info, warn};

use crate::catalog::client::{list_classifications, CatalogSource, FALLBACK_CLASSIFICATIONS};
use crate::catalog::fetcher::{fetch, FetchOptions};
use crate::database::predefined;
use crate::database::query::{execute, QueryError, QueryResult};
use crate::database::repo::{self, LoadSummary};
use crate::transform::normalizer::{normalize, NormalizedBatch};

/// Remote half of the pipeline: category listing and fetch + normalize.
/// Needs no store, so front ends can browse the catalog without one.
pub struct Collector<S> {
    source: S,
    options: FetchOptions,
    fallback: Vec<String>,
}

impl<S: CatalogSource> Collector<S> {
    pub fn new(source: S, options: FetchOptions) -> Self {
        Self {
            source,
            options,
            fallback: FALLBACK_CLASSIFICATIONS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_fallback(mut self, fallback: Vec<String>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Without a key the endpoint cannot answer, so the fallback list is used.
    pub fn list_classifications(&self, api_key: Option<&str>) -> Vec<String> {
        let fallback: Vec<&str> = self.fallback.iter().map(String::as_str).collect();
        match api_key {
            Some(key) => list_classifications(&self.source, key, &fallback),
            None => {
                warn!("No API key configured, using fallback classifications");
                fallback.iter().map(|s| s.to_string()).collect()
            }
        }
    }

    pub fn fetch_and_normalize(&self, api_key: &str, classification: &str) -> NormalizedBatch {
        let records = fetch(&self.source, api_key, classification, &self.options);
        let batch = normalize(&records);
        info!(
            classification,
            metadata = batch.metadata.len(),
            colors = batch.colors.len(),
            "Normalized records"
        );
        batch
    }
}

/// Local half: persisting batches and querying the store.
pub struct Archive {
    conn: Connection,
}

impl Archive {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn open(path: &str) -> Result<Self> {
        Ok(Self::new(repo::open(path)?))
    }

    pub fn persist(&mut self, batch: &NormalizedBatch) -> Result<LoadSummary> {
        repo::load(&mut self.conn, batch)
    }

    /// Runs a predefined query when `sql_or_label` matches a label, otherwise
    /// treats it as SQL text.
    pub fn run_query(&self, sql_or_label: &str) -> Result<QueryResult, QueryError> {
        let sql = predefined::lookup(sql_or_label.trim()).unwrap_or(sql_or_label);
        execute(&self.conn, sql)
    }

    pub fn recent_metadata(&self) -> Result<QueryResult, QueryError> {
        execute(&self.conn, predefined::RECENT_METADATA)
    }
}
