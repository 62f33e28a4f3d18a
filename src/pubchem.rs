//! PUG REST endpoint layout and response-shape helpers.
//!
//! URLs are built segment by segment so structure notation containing `/`,
//! `#` or `?` stays a single percent-encoded path segment.

use reqwest::Url;
use serde_json::{Map, Value};

use crate::domain::{ListKey, MoleculeId, StructureFormat, StructureQuery, Threshold};
use crate::error::ChemFetchError;

#[derive(Debug, Clone)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {
    pub fn new(base: Url) -> Result<Self, ChemFetchError> {
        if base.cannot_be_a_base() {
            return Err(ChemFetchError::InvalidConfig(format!(
                "base_url: {base} cannot be used as a base"
            )));
        }
        Ok(Self { base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn join(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub fn cids_by_name(&self, name: &str) -> Url {
        self.join(&["compound", "name", name, "cids", "JSON"])
    }

    pub fn canonical_smiles(&self, id: MoleculeId) -> Url {
        let id = id.to_string();
        self.join(&["compound", "cid", &id, "property", "CanonicalSMILES", "JSON"])
    }

    pub fn properties(&self, id: MoleculeId, names: &[String]) -> Url {
        let id = id.to_string();
        let list = names.join(",");
        self.join(&["compound", "cid", &id, "property", &list, "JSON"])
    }

    pub fn record(&self, id: MoleculeId, format: StructureFormat) -> Url {
        let id = id.to_string();
        self.join(&["compound", "cid", &id, "record", format.path_segment()])
    }

    pub fn similarity(
        &self,
        query: &StructureQuery,
        threshold: Threshold,
        max_records: usize,
    ) -> Url {
        let mut url = self.join(&["compound", "similarity", "smiles", query.as_str(), "JSON"]);
        url.query_pairs_mut()
            .append_pair("Threshold", &threshold.to_string())
            .append_pair("MaxRecords", &max_records.to_string());
        url
    }

    pub fn list_key_cids(&self, key: &ListKey) -> Url {
        self.join(&["compound", "listkey", key.as_str(), "cids", "JSON"])
    }
}

/// `IdentifierList.CID`. A body without an identifier list means no hits.
pub fn extract_cids(body: &Value) -> Result<Vec<MoleculeId>, ChemFetchError> {
    let Some(list) = body.get("IdentifierList") else {
        return Ok(Vec::new());
    };
    let Some(cids) = list.get("CID") else {
        return Ok(Vec::new());
    };
    let cids = cids
        .as_array()
        .ok_or_else(|| ChemFetchError::Decode("IdentifierList.CID is not an array".to_string()))?;
    cids.iter()
        .map(|value| {
            value
                .as_u64()
                .and_then(|raw| MoleculeId::new(raw).ok())
                .ok_or_else(|| ChemFetchError::Decode(format!("invalid CID in response: {value}")))
        })
        .collect()
}

/// `Waiting.ListKey` of an accepted asynchronous request.
pub fn extract_list_key(body: &Value) -> Option<ListKey> {
    let key = body.get("Waiting")?.get("ListKey")?;
    match key {
        Value::String(text) if !text.is_empty() => Some(ListKey::new(text.clone())),
        Value::Number(number) => Some(ListKey::new(number.to_string())),
        _ => None,
    }
}

/// First row of `PropertyTable.Properties`.
pub fn first_property_row(body: &Value) -> Option<&Map<String, Value>> {
    body.get("PropertyTable")?
        .get("Properties")?
        .as_array()?
        .first()?
        .as_object()
}

pub fn extract_smiles(row: &Map<String, Value>) -> Option<String> {
    // Newer PUG REST answers a CanonicalSMILES request with ConnectivitySMILES.
    ["CanonicalSMILES", "ConnectivitySMILES"]
        .iter()
        .find_map(|key| row.get(*key).and_then(Value::as_str))
        .map(|value| value.to_string())
}

/// Human-readable text of a PUG REST `Fault` document.
pub fn fault_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    let fault = value.get("Fault")?;
    let message = fault
        .get("Message")
        .and_then(Value::as_str)
        .or_else(|| fault.get("Code").and_then(Value::as_str))?;
    let details = fault
        .get("Details")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join("; ")
        })
        .filter(|joined| !joined.is_empty());
    Some(match details {
        Some(details) => format!("{message} ({details})"),
        None => message.to_string(),
    })
}
