use tokio::time::{Instant, sleep};
use tracing::{debug, info};

use crate::config::PollPolicy;
use crate::domain::{ListKey, MoleculeId, StructureQuery, Threshold};
use crate::error::ChemFetchError;
use crate::pubchem::{extract_cids, extract_list_key};
use crate::remote::{Body, BodyKind, Reply, RemoteClient, Transport};

/// Submits a structure similarity job and polls it to completion.
pub struct SimilaritySearch<T: Transport> {
    client: RemoteClient<T>,
    poll: PollPolicy,
}

impl<T: Transport> SimilaritySearch<T> {
    pub fn new(client: RemoteClient<T>, poll: PollPolicy) -> Self {
        Self { client, poll }
    }

    pub async fn find_similar(
        &self,
        query: &StructureQuery,
        threshold: Threshold,
        max_results: usize,
    ) -> Result<Vec<MoleculeId>, ChemFetchError> {
        let started = Instant::now();
        let url = self
            .client
            .endpoints()
            .similarity(query, threshold, max_results);
        debug!(
            query = %query,
            threshold = threshold.get(),
            max_results,
            "submitting similarity job"
        );

        match self.client.get(&url, BodyKind::Json).await? {
            Reply::Pending(body) => {
                let key = extract_list_key(&body).ok_or_else(|| {
                    ChemFetchError::Decode(
                        "similarity job accepted without Waiting.ListKey".to_string(),
                    )
                })?;
                self.poll_job(&key, started, max_results).await
            }
            // PubChem occasionally answers synchronously for cached queries.
            Reply::Ready(Body::Json(body)) => Ok(truncate(extract_cids(&body)?, max_results)),
            Reply::Ready(Body::Bytes(_)) => Err(ChemFetchError::Decode(
                "expected a JSON similarity response".to_string(),
            )),
        }
    }

    async fn poll_job(
        &self,
        key: &ListKey,
        started: Instant,
        max_results: usize,
    ) -> Result<Vec<MoleculeId>, ChemFetchError> {
        let url = self.client.endpoints().list_key_cids(key);
        let deadline = started + self.poll.deadline;
        let mut polls = 0u32;

        loop {
            polls += 1;
            match self.client.get(&url, BodyKind::Json).await? {
                Reply::Ready(Body::Json(body)) => {
                    let ids = truncate(extract_cids(&body)?, max_results);
                    info!(list_key = %key, polls, hits = ids.len(), "similarity job resolved");
                    return Ok(ids);
                }
                Reply::Ready(Body::Bytes(_)) => {
                    return Err(ChemFetchError::Decode(
                        "expected a JSON job status".to_string(),
                    ));
                }
                Reply::Pending(_) => {
                    debug!(list_key = %key, polls, "similarity job still running");
                }
            }

            let now = Instant::now();
            let exhausted = self.poll.max_polls.is_some_and(|max| polls >= max);
            if exhausted || now >= deadline {
                return Err(ChemFetchError::PollTimeout {
                    list_key: key.to_string(),
                    polls,
                    elapsed: now.duration_since(started),
                });
            }
            sleep(self.poll.interval.min(deadline - now)).await;
        }
    }
}

fn truncate(mut ids: Vec<MoleculeId>, max_results: usize) -> Vec<MoleculeId> {
    ids.truncate(max_results);
    ids
}
