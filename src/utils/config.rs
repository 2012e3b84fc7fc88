use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, info};

use crate::catalog::fetcher::{FetchOptions, DEFAULT_LIMIT, DEFAULT_PAGE_SIZE};

pub const DEFAULT_API_BASE: &str = "https://api.harvardartmuseums.org";
pub const DEFAULT_DB_PATH: &str = "museum.db";

const API_KEY_VAR: &str = "ARCHIVE_API_KEY";
const API_BASE_VAR: &str = "ARCHIVE_API_BASE";
const DB_PATH_VAR: &str = "ARCHIVE_DB_PATH";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_key: Option<String>,
    pub api_base: String,
    pub db_path: String,
    pub page_size: u32,
    pub limit: usize,
    pub page_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            db_path: DEFAULT_DB_PATH.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            limit: DEFAULT_LIMIT,
            page_delay_ms: 200,
            timeout_secs: 30,
        }
    }
}

impl Settings {
    /// Resolves settings from the process environment, then the `.env` file at
    /// `env_path` (if it exists), then defaults. CLI flags are applied by the caller.
    pub fn load(env_path: &Path) -> Result<Self> {
        let file_vars = if env_path.exists() {
            info!("Loading settings from {:?}", env_path);
            load_from_env(env_path)?
        } else {
            debug!("No settings file at {:?}", env_path);
            HashMap::new()
        };

        let lookup = |key: &str| {
            std::env::var(key)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .or_else(|| file_vars.get(key).cloned())
        };

        let defaults = Self::default();
        Ok(Self {
            api_key: lookup(API_KEY_VAR),
            api_base: lookup(API_BASE_VAR).unwrap_or(defaults.api_base),
            db_path: lookup(DB_PATH_VAR).unwrap_or(defaults.db_path),
            ..defaults
        })
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| anyhow!("No API key configured. Pass --api-key, set {} or run `configure`.", API_KEY_VAR))
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            page_size: self.page_size,
            limit: self.limit,
            page_delay: Duration::from_millis(self.page_delay_ms),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Persists the API key, endpoint and database path so later runs pick them up.
    pub fn save(&self, env_path: &Path) -> Result<()> {
        save_to_env(env_path, self.api_key.as_deref(), &self.api_base, &self.db_path)
    }
}

fn load_from_env(path: &Path) -> Result<HashMap<String, String>> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let reader = BufReader::new(file);

    let mut vars = HashMap::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            match key.trim() {
                k @ (API_KEY_VAR | API_BASE_VAR | DB_PATH_VAR) => {
                    vars.insert(k.to_string(), value.trim().to_string());
                }
                _ => {}
            }
        }
    }
    Ok(vars)
}

fn save_to_env(path: &Path, api_key: Option<&str>, api_base: &str, db_path: &str) -> Result<()> {
    let mut file = File::create(path).context("Failed to create .env file")?;
    if let Some(key) = api_key {
        writeln!(file, "{}={}", API_KEY_VAR, key)?;
    }
    writeln!(file, "{}={}", API_BASE_VAR, api_base)?;
    writeln!(file, "{}={}", DB_PATH_VAR, db_path)?;
    Ok(())
}
