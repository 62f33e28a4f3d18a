use serde_json::Value;

use crate::domain::{MoleculeId, StructureFormat};
use crate::error::ChemFetchError;
use crate::pubchem::extract_cids;
use crate::remote::{RemoteClient, Transport};

#[derive(Debug, Clone, PartialEq)]
pub enum StructureExport {
    Json(Value),
    Raw(Vec<u8>),
}

/// Direct lookups that need no job polling.
pub struct Catalog<T: Transport> {
    client: RemoteClient<T>,
}

impl<T: Transport> Catalog<T> {
    pub fn new(client: RemoteClient<T>) -> Self {
        Self { client }
    }

    pub async fn search_by_name(
        &self,
        name: &str,
        max_results: usize,
    ) -> Result<Vec<MoleculeId>, ChemFetchError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ChemFetchError::InvalidQuery(
                "compound name is empty".to_string(),
            ));
        }
        let url = self.client.endpoints().cids_by_name(name);
        let body = self.client.get_json(&url).await?;
        let mut ids = extract_cids(&body)?;
        ids.truncate(max_results);
        Ok(ids)
    }

    pub async fn fetch_structure(
        &self,
        id: MoleculeId,
        format: StructureFormat,
    ) -> Result<StructureExport, ChemFetchError> {
        let url = self.client.endpoints().record(id, format);
        if format.is_json() {
            return self.client.get_json(&url).await.map(StructureExport::Json);
        }
        self.client.get_bytes(&url).await.map(StructureExport::Raw)
    }
}
