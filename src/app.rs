use std::fmt;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tokio::time::{Instant, sleep};
use tracing::{info, warn};

use crate::catalog::{Catalog, StructureExport};
use crate::config::{RetryPolicy, Settings};
use crate::domain::{MoleculeId, StructureFormat, StructureQuery, Threshold};
use crate::error::ChemFetchError;
use crate::properties::{MoleculeRecord, PropertyFetcher};
use crate::remote::{RemoteClient, Transport};
use crate::similarity::SimilaritySearch;

/// Records for every candidate of one similarity query, in the order
/// PubChem ranked them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSet {
    pub query: StructureQuery,
    pub threshold: Threshold,
    pub records: Vec<MoleculeRecord>,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn failed_count(&self) -> usize {
        self.records.iter().filter(|record| record.is_failed()).count()
    }

    pub fn has_failures(&self) -> bool {
        self.records.iter().any(|record| !record.is_complete())
    }

    pub fn ids(&self) -> Vec<MoleculeId> {
        self.records.iter().map(|record| record.id).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Searching,
    Enriching,
    Done,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "Idle",
            Phase::Searching => "Searching",
            Phase::Enriching => "Enriching",
            Phase::Done => "Done",
            Phase::Failed => "Failed",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub phase: Phase,
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink: Send + Sync {
    fn event(&self, event: ProgressEvent);
}

/// Entry point for callers: similarity search plus concurrent enrichment,
/// and the direct single-compound lookups.
pub struct App<T: Transport> {
    similarity: SimilaritySearch<T>,
    fetcher: PropertyFetcher<T>,
    catalog: Catalog<T>,
    threshold: Threshold,
    similarity_max_results: usize,
    search_max_results: usize,
    retry: RetryPolicy,
}

impl<T: Transport> App<T> {
    pub fn new(client: RemoteClient<T>, settings: &Settings) -> Self {
        Self {
            similarity: SimilaritySearch::new(client.clone(), settings.poll),
            fetcher: PropertyFetcher::new(client.clone(), settings.properties.clone()),
            catalog: Catalog::new(client),
            threshold: settings.threshold,
            similarity_max_results: settings.similarity_max_results,
            search_max_results: settings.search_max_results,
            retry: settings.retry,
        }
    }

    pub async fn search_and_enrich(
        &self,
        query: &StructureQuery,
        sink: &dyn ProgressSink,
    ) -> Result<ResultSet, ChemFetchError> {
        let started = Instant::now();
        sink.event(ProgressEvent {
            phase: Phase::Searching,
            message: format!(
                "similarity search for {query} (threshold={}, max_results={})",
                self.threshold, self.similarity_max_results
            ),
            elapsed: None,
        });

        let ids = match self
            .similarity
            .find_similar(query, self.threshold, self.similarity_max_results)
            .await
        {
            Ok(ids) => ids,
            Err(err) => {
                sink.event(ProgressEvent {
                    phase: Phase::Failed,
                    message: err.to_string(),
                    elapsed: Some(started.elapsed()),
                });
                return Err(err);
            }
        };

        sink.event(ProgressEvent {
            phase: Phase::Enriching,
            message: format!("enriching {} candidates", ids.len()),
            elapsed: Some(started.elapsed()),
        });

        let records = join_all(ids.iter().map(|id| self.fetch_record(*id))).await;
        for record in records.iter().filter(|record| !record.is_complete()) {
            for failure in record.outcome.failures() {
                warn!(
                    cid = %record.id,
                    lookup = %failure.lookup,
                    error = %failure.message,
                    "lookup failed"
                );
            }
        }

        let result = ResultSet {
            query: query.clone(),
            threshold: self.threshold,
            records,
        };
        info!(
            candidates = result.len(),
            failed = result.failed_count(),
            "enrichment finished"
        );
        sink.event(ProgressEvent {
            phase: Phase::Done,
            message: format!(
                "{} records ({} failed)",
                result.len(),
                result.failed_count()
            ),
            elapsed: Some(started.elapsed()),
        });
        Ok(result)
    }

    /// One compound's record. Lookups with a transient failure are repeated
    /// while the retry budget allows; values already fetched are kept.
    pub async fn fetch_record(&self, id: MoleculeId) -> MoleculeRecord {
        let (mut smiles, mut properties) = tokio::join!(
            self.fetcher.fetch_smiles(id),
            self.fetcher.fetch_properties(id)
        );
        let mut attempt = 0u32;
        while attempt < self.retry.max_retries
            && (failed_transiently(&smiles) || failed_transiently(&properties))
        {
            attempt += 1;
            let delay = self.retry.delay_for(attempt);
            warn!(cid = %id, attempt, delay_ms = delay.as_millis() as u64, "retrying lookup");
            sleep(delay).await;

            let retry_smiles = failed_transiently(&smiles);
            let retry_properties = failed_transiently(&properties);
            let (next_smiles, next_properties) = tokio::join!(
                async {
                    if retry_smiles {
                        Some(self.fetcher.fetch_smiles(id).await)
                    } else {
                        None
                    }
                },
                async {
                    if retry_properties {
                        Some(self.fetcher.fetch_properties(id).await)
                    } else {
                        None
                    }
                }
            );
            if let Some(result) = next_smiles {
                smiles = result;
            }
            if let Some(result) = next_properties {
                properties = result;
            }
        }
        MoleculeRecord::assemble(id, smiles, properties)
    }

    pub async fn search_by_name(&self, name: &str) -> Result<Vec<MoleculeId>, ChemFetchError> {
        self.catalog
            .search_by_name(name, self.search_max_results)
            .await
    }

    pub async fn fetch_structure(
        &self,
        id: MoleculeId,
        format: StructureFormat,
    ) -> Result<StructureExport, ChemFetchError> {
        self.catalog.fetch_structure(id, format).await
    }
}

fn failed_transiently<V>(result: &Result<V, ChemFetchError>) -> bool {
    matches!(result, Err(err) if err.is_retryable())
}
