use std::fs;
use std::time::Duration;

use camino::Utf8PathBuf;
use directories::BaseDirs;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::domain::Threshold;
use crate::error::ChemFetchError;

pub const CONFIG_FILE_NAME: &str = "chemfetch.json";
pub const DEFAULT_BASE_URL: &str = "https://pubchem.ncbi.nlm.nih.gov/rest/pug";

pub const DEFAULT_PROPERTIES: &[&str] = &[
    "MolecularFormula",
    "MolecularWeight",
    "IUPACName",
    "ExactMass",
    "MonoisotopicMass",
    "TPSA",
    "XLogP",
    "Complexity",
    "HBondDonorCount",
    "HBondAcceptorCount",
    "RotatableBondCount",
    "Charge",
    "InChI",
    "InChIKey",
    "CanonicalSMILES",
    "IsomericSMILES",
];

/// On-disk shape of `chemfetch.json`. Every key is optional.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub similarity_threshold: Option<u16>,
    #[serde(default)]
    pub similarity_max_results: Option<usize>,
    #[serde(default)]
    pub search_max_results: Option<usize>,
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,
    #[serde(default)]
    pub poll_deadline_secs: Option<u64>,
    #[serde(default)]
    pub max_polls: Option<u32>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_in_flight: Option<usize>,
    #[serde(default)]
    pub retry: Option<RetryEntry>,
    #[serde(default)]
    pub properties: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetryEntry {
    #[serde(default)]
    pub max_retries: Option<u32>,
    #[serde(default)]
    pub base_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Linear backoff: the n-th retry waits `base_delay * n`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub deadline: Duration,
    pub max_polls: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            deadline: Duration::from_secs(300),
            max_polls: None,
        }
    }
}

/// Validated runtime limits consumed by the client and the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub base_url: Url,
    pub threshold: Threshold,
    pub similarity_max_results: usize,
    pub search_max_results: usize,
    pub poll: PollPolicy,
    pub request_timeout: Duration,
    pub max_in_flight: usize,
    pub retry: RetryPolicy,
    pub properties: Vec<String>,
}

impl Settings {
    /// Overrides go through the same limits as the config file.
    pub fn apply(&mut self, overrides: &Overrides) -> Result<(), ChemFetchError> {
        if let Some(threshold) = overrides.threshold {
            self.threshold = threshold;
        }
        if let Some(max_results) = overrides.max_results {
            let max_results = positive("max_results", max_results)?;
            self.similarity_max_results = max_results;
            self.search_max_results = max_results;
        }
        Ok(())
    }
}

/// Per-invocation knobs taken from the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct Overrides {
    pub threshold: Option<Threshold>,
    pub max_results: Option<usize>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Explicit path, then `./chemfetch.json`, then the user config dir, then defaults.
    pub fn resolve(path: Option<&str>) -> Result<Settings, ChemFetchError> {
        let config_path = match path {
            Some(path) => Some(Utf8PathBuf::from(path)),
            None => Self::discover(),
        };

        let Some(config_path) = config_path else {
            tracing::debug!("no config file found, using defaults");
            return Self::resolve_config(Config::default());
        };

        tracing::debug!(path = %config_path, "loading config");
        let content = fs::read_to_string(&config_path)
            .map_err(|_| ChemFetchError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| ChemFetchError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    fn discover() -> Option<Utf8PathBuf> {
        let local = Utf8PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Some(local);
        }
        BaseDirs::new()
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(
                    dirs.config_dir().join("chemfetch").join(CONFIG_FILE_NAME),
                )
                .ok()
            })
            .filter(|path| path.exists())
    }

    pub fn resolve_config(config: Config) -> Result<Settings, ChemFetchError> {
        let raw_base = config
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = Url::parse(raw_base.trim_end_matches('/'))
            .map_err(|err| ChemFetchError::InvalidConfig(format!("base_url: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ChemFetchError::InvalidConfig(format!(
                "base_url: {raw_base} cannot be used as a base"
            )));
        }

        let threshold = match config.similarity_threshold {
            Some(value) => Threshold::new(value)?,
            None => Threshold::DEFAULT,
        };

        let similarity_max_results = positive(
            "similarity_max_results",
            config.similarity_max_results.unwrap_or(10),
        )?;
        let search_max_results =
            positive("search_max_results", config.search_max_results.unwrap_or(100))?;
        let max_in_flight = positive("max_in_flight", config.max_in_flight.unwrap_or(8))?;

        let defaults = PollPolicy::default();
        let interval = config
            .poll_interval_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.interval);
        let deadline = config
            .poll_deadline_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.deadline);
        if interval.is_zero() {
            return Err(ChemFetchError::InvalidConfig(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if deadline.is_zero() {
            return Err(ChemFetchError::InvalidConfig(
                "poll_deadline_secs must be greater than zero".to_string(),
            ));
        }
        if config.max_polls == Some(0) {
            return Err(ChemFetchError::InvalidConfig(
                "max_polls must be greater than zero".to_string(),
            ));
        }

        let request_timeout = Duration::from_secs(positive(
            "request_timeout_secs",
            config.request_timeout_secs.unwrap_or(30),
        )?);

        let retry_defaults = RetryPolicy::default();
        let retry = match config.retry {
            Some(entry) => RetryPolicy {
                max_retries: entry.max_retries.unwrap_or(retry_defaults.max_retries),
                base_delay: entry
                    .base_delay_ms
                    .map(Duration::from_millis)
                    .unwrap_or(retry_defaults.base_delay),
            },
            None => retry_defaults,
        };

        let properties = match config.properties {
            Some(list) => {
                let cleaned = list
                    .into_iter()
                    .map(|name| name.trim().to_string())
                    .filter(|name| !name.is_empty())
                    .collect::<Vec<_>>();
                if cleaned.is_empty() {
                    return Err(ChemFetchError::InvalidConfig(
                        "properties must name at least one property".to_string(),
                    ));
                }
                cleaned
            }
            None => default_properties(),
        };

        Ok(Settings {
            base_url,
            threshold,
            similarity_max_results,
            search_max_results,
            poll: PollPolicy {
                interval,
                deadline,
                max_polls: config.max_polls,
            },
            request_timeout,
            max_in_flight,
            retry,
            properties,
        })
    }
}

pub fn default_properties() -> Vec<String> {
    DEFAULT_PROPERTIES.iter().map(|name| name.to_string()).collect()
}

fn positive<T>(key: &str, value: T) -> Result<T, ChemFetchError>
where
    T: PartialEq + Default,
{
    if value == T::default() {
        return Err(ChemFetchError::InvalidConfig(format!(
            "{key} must be greater than zero"
        )));
    }
    Ok(value)
}
