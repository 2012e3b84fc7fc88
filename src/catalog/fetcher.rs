use std::thread;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::catalog::client::{CatalogSource, PageRequest};
use crate::catalog::record::RawRecord;

pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const DEFAULT_LIMIT: usize = 2500;
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(200);

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub page_size: u32,
    pub limit: usize,
    /// Pause between successful pages; skipped after the last one.
    pub page_delay: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            limit: DEFAULT_LIMIT,
            page_delay: DEFAULT_PAGE_DELAY,
        }
    }
}

/// Walks the object listing page by page.
///
/// Stops on an empty page, on reaching `limit` (the result is truncated to exactly
/// `limit`), or on the first failed request. A failure is logged and whatever was
/// gathered so far is returned; this function never errors.
pub fn fetch<S: CatalogSource + ?Sized>(
    source: &S,
    api_key: &str,
    classification: &str,
    options: &FetchOptions,
) -> Vec<RawRecord> {
    let page_size = options.page_size.max(1);
    let mut records: Vec<RawRecord> = Vec::new();
    let mut page: u32 = 1;

    let progress = ProgressBar::new(options.limit as u64);
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} [{bar:30}] {pos}/{len}") {
        progress.set_style(style);
    }
    progress.set_message(classification.to_string());

    while records.len() < options.limit {
        let request = PageRequest {
            api_key,
            classification,
            size: page_size,
            page,
        };

        let batch = match source.object_page(&request) {
            Ok(batch) => batch,
            Err(e) => {
                warn!(page, collected = records.len(), "Stopping pagination: {:#}", e);
                break;
            }
        };

        if batch.is_empty() {
            info!(page, "Reached end of collection");
            break;
        }

        records.extend(batch.iter().map(RawRecord::from_json));
        if records.len() >= options.limit {
            records.truncate(options.limit);
            progress.set_position(records.len() as u64);
            break;
        }
        progress.set_position(records.len() as u64);

        page += 1;
        if !options.page_delay.is_zero() {
            thread::sleep(options.page_delay);
        }
    }

    progress.finish_and_clear();
    info!(classification, pages = page, records = records.len(), "Fetch complete");
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use serde_json::{json, Value};
    use std::cell::RefCell;

    /// Serves `supply` records in pages, optionally failing at one page.
    struct FakeCatalog {
        supply: usize,
        fail_at: Option<u32>,
        requested: RefCell<Vec<u32>>,
    }

    impl FakeCatalog {
        fn new(supply: usize) -> Self {
            Self { supply, fail_at: None, requested: RefCell::new(Vec::new()) }
        }
    }

    impl CatalogSource for FakeCatalog {
        fn classifications(&self, _api_key: &str) -> Result<Vec<String>> {
            Ok(vec!["Paintings".into()])
        }

        fn object_page(&self, request: &PageRequest<'_>) -> Result<Vec<Value>> {
            self.requested.borrow_mut().push(request.page);
            if self.fail_at == Some(request.page) {
                return Err(anyhow!("HTTP 503"));
            }
            let start = (request.page as usize - 1) * request.size as usize;
            let end = (start + request.size as usize).min(self.supply);
            Ok((start..end).map(|i| json!({ "id": i })).collect())
        }
    }

    fn options(page_size: u32, limit: usize) -> FetchOptions {
        FetchOptions { page_size, limit, page_delay: Duration::ZERO }
    }

    #[test]
    fn test_stops_exactly_at_limit() {
        let source = FakeCatalog::new(1000);
        let records = fetch(&source, "key", "Paintings", &options(100, 250));
        assert_eq!(records.len(), 250);
        assert_eq!(*source.requested.borrow(), vec![1, 2, 3]);
        assert_eq!(records.last().and_then(|r| r.id), Some(249));
    }

    #[test]
    fn test_short_supply_ends_on_empty_page() {
        let source = FakeCatalog::new(230);
        let records = fetch(&source, "key", "Paintings", &options(100, 250));
        assert_eq!(records.len(), 230);
        assert_eq!(*source.requested.borrow(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_failure_returns_partial_results() {
        let mut source = FakeCatalog::new(1000);
        source.fail_at = Some(2);
        let records = fetch(&source, "key", "Paintings", &options(100, 2500));
        assert_eq!(records.len(), 100);
        assert_eq!(*source.requested.borrow(), vec![1, 2]);
    }

    #[test]
    fn test_failure_on_first_page_is_empty() {
        let mut source = FakeCatalog::new(1000);
        source.fail_at = Some(1);
        assert!(fetch(&source, "key", "Paintings", &options(100, 2500)).is_empty());
    }

    #[test]
    fn test_zero_limit_makes_no_requests() {
        let source = FakeCatalog::new(1000);
        assert!(fetch(&source, "key", "Paintings", &options(100, 0)).is_empty());
        assert!(source.requested.borrow().is_empty());
    }
}
