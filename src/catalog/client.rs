use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Used when the classification endpoint cannot be reached.
pub const FALLBACK_CLASSIFICATIONS: [&str; 5] =
    ["Prints", "Paintings", "Drawings", "Sculpture", "Coins"];

#[derive(Debug, Clone)]
pub struct PageRequest<'a> {
    pub api_key: &'a str,
    pub classification: &'a str,
    pub size: u32,
    pub page: u32,
}

/// The two remote endpoints the pipeline reads from.
pub trait CatalogSource {
    /// Names of every classification the catalog knows about.
    fn classifications(&self, api_key: &str) -> Result<Vec<String>>;

    /// Raw records of a single page of the filtered object listing.
    fn object_page(&self, request: &PageRequest<'_>) -> Result<Vec<Value>>;
}

#[derive(Debug, Deserialize)]
struct Listing {
    #[serde(default)]
    records: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct NamedRecord {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ClassificationListing {
    #[serde(default)]
    records: Vec<NamedRecord>,
}

pub struct HttpCatalog {
    client: Client,
    base_url: String,
}

impl HttpCatalog {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .query(query)
            .send()
            .with_context(|| format!("Request to {} failed", url))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("{} returned HTTP {}", url, status));
        }
        resp.json::<T>()
            .with_context(|| format!("Failed to decode response from {}", url))
    }
}

impl CatalogSource for HttpCatalog {
    fn classifications(&self, api_key: &str) -> Result<Vec<String>> {
        let listing: ClassificationListing = self.get_json(
            "classification",
            &[("apikey", api_key.to_string()), ("size", "100".to_string())],
        )?;
        let mut names: Vec<String> = listing.records.into_iter().map(|r| r.name).collect();
        names.sort();
        Ok(names)
    }

    fn object_page(&self, request: &PageRequest<'_>) -> Result<Vec<Value>> {
        let listing: Listing = self.get_json(
            "object",
            &[
                ("apikey", request.api_key.to_string()),
                ("classification", request.classification.to_string()),
                ("size", request.size.to_string()),
                ("page", request.page.to_string()),
            ],
        )?;
        debug!(page = request.page, count = listing.records.len(), "Object page received");
        Ok(listing.records)
    }
}

/// Lists classifications, substituting `fallback` when the endpoint fails or
/// comes back empty. Never errors.
pub fn list_classifications<S: CatalogSource + ?Sized>(
    source: &S,
    api_key: &str,
    fallback: &[&str],
) -> Vec<String> {
    match source.classifications(api_key) {
        Ok(names) if !names.is_empty() => names,
        Ok(_) => {
            warn!("Classification listing was empty, using fallback list");
            fallback.iter().map(|s| s.to_string()).collect()
        }
        Err(e) => {
            warn!("Classification listing unavailable, using fallback list: {:#}", e);
            fallback.iter().map(|s| s.to_string()).collect()
        }
    }
}
