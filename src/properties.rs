use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::MoleculeId;
use crate::error::ChemFetchError;
use crate::pubchem::{extract_smiles, first_property_row};
use crate::remote::{RemoteClient, Transport};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl PropertyValue {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(number) => number
                .as_i64()
                .map(PropertyValue::Integer)
                .or_else(|| number.as_f64().map(PropertyValue::Float)),
            Value::String(text) => Some(PropertyValue::Text(text.clone())),
            Value::Bool(flag) => Some(PropertyValue::Text(flag.to_string())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }
}

/// Named properties of one compound, as reported by PubChem.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyBag(BTreeMap<String, PropertyValue>);

impl PropertyBag {
    pub fn from_row(row: &Map<String, Value>) -> Self {
        Self(
            row.iter()
                .filter_map(|(name, value)| {
                    PropertyValue::from_json(value).map(|value| (name.clone(), value))
                })
                .collect(),
        )
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropertyValue)> {
        self.0.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lookup {
    CanonicalSmiles,
    Properties,
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookup::CanonicalSmiles => write!(f, "canonical_smiles"),
            Lookup::Properties => write!(f, "properties"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupFailure {
    pub lookup: Lookup,
    pub status: Option<u16>,
    pub message: String,
    pub retryable: bool,
}

impl LookupFailure {
    fn new(lookup: Lookup, err: &ChemFetchError) -> Self {
        Self {
            lookup,
            status: err.status(),
            message: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecordOutcome {
    Complete,
    Partial { failures: Vec<LookupFailure> },
    Failed { failures: Vec<LookupFailure> },
}

impl RecordOutcome {
    pub fn failures(&self) -> &[LookupFailure] {
        match self {
            RecordOutcome::Complete => &[],
            RecordOutcome::Partial { failures } | RecordOutcome::Failed { failures } => {
                failures.as_slice()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoleculeRecord {
    pub id: MoleculeId,
    pub smiles: Option<String>,
    pub properties: Option<PropertyBag>,
    #[serde(flatten)]
    pub outcome: RecordOutcome,
}

impl MoleculeRecord {
    pub fn assemble(
        id: MoleculeId,
        smiles: Result<Option<String>, ChemFetchError>,
        properties: Result<Option<PropertyBag>, ChemFetchError>,
    ) -> Self {
        let mut failures = Vec::new();
        let smiles = smiles.unwrap_or_else(|err| {
            failures.push(LookupFailure::new(Lookup::CanonicalSmiles, &err));
            None
        });
        let properties = properties.unwrap_or_else(|err| {
            failures.push(LookupFailure::new(Lookup::Properties, &err));
            None
        });
        let outcome = match failures.len() {
            0 => RecordOutcome::Complete,
            1 => RecordOutcome::Partial { failures },
            _ => RecordOutcome::Failed { failures },
        };
        Self {
            id,
            smiles,
            properties,
            outcome,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, RecordOutcome::Failed { .. })
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.outcome, RecordOutcome::Complete)
    }

    pub fn has_retryable_failure(&self) -> bool {
        self.outcome.failures().iter().any(|failure| failure.retryable)
    }
}

/// Resolves the canonical SMILES and the property set of one compound.
pub struct PropertyFetcher<T: Transport> {
    client: RemoteClient<T>,
    properties: Vec<String>,
}

impl<T: Transport> PropertyFetcher<T> {
    pub fn new(client: RemoteClient<T>, properties: Vec<String>) -> Self {
        Self { client, properties }
    }

    /// Both lookups run concurrently; neither failure discards the record.
    pub async fn fetch_record(&self, id: MoleculeId) -> MoleculeRecord {
        let (smiles, properties) = tokio::join!(self.fetch_smiles(id), self.fetch_properties(id));
        MoleculeRecord::assemble(id, smiles, properties)
    }

    pub async fn fetch_smiles(&self, id: MoleculeId) -> Result<Option<String>, ChemFetchError> {
        let url = self.client.endpoints().canonical_smiles(id);
        let body = self.client.get_json(&url).await?;
        Ok(first_property_row(&body).and_then(extract_smiles))
    }

    pub async fn fetch_properties(
        &self,
        id: MoleculeId,
    ) -> Result<Option<PropertyBag>, ChemFetchError> {
        let url = self.client.endpoints().properties(id, &self.properties);
        let body = self.client.get_json(&url).await?;
        Ok(first_property_row(&body).map(PropertyBag::from_row))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn cid(value: u64) -> MoleculeId {
        MoleculeId::new(value).unwrap()
    }

    #[test]
    fn bag_keeps_numbers_and_strings() {
        let row = json!({"CID": 2244, "MolecularWeight": "180.16", "XLogP": 1.2, "Charge": 0});
        let bag = PropertyBag::from_row(row.as_object().unwrap());
        assert_eq!(bag.get("CID"), Some(&PropertyValue::Integer(2244)));
        assert_eq!(
            bag.get("MolecularWeight"),
            Some(&PropertyValue::Text("180.16".to_string()))
        );
        assert_eq!(bag.get("XLogP"), Some(&PropertyValue::Float(1.2)));
    }

    #[test]
    fn outcome_follows_failed_lookups() {
        let busy = || ChemFetchError::RemoteStatus {
            status: 503,
            message: "busy".to_string(),
        };

        let complete = MoleculeRecord::assemble(cid(1), Ok(Some("C".to_string())), Ok(None));
        assert!(complete.is_complete());

        let partial =
            MoleculeRecord::assemble(cid(1), Err(busy()), Ok(Some(PropertyBag::default())));
        assert!(matches!(partial.outcome, RecordOutcome::Partial { .. }));
        assert!(partial.smiles.is_none());
        assert!(partial.properties.is_some());
        assert!(partial.has_retryable_failure());

        let failed = MoleculeRecord::assemble(cid(1), Err(busy()), Err(busy()));
        assert!(failed.is_failed());
        assert_eq!(failed.outcome.failures().len(), 2);
    }

    #[test]
    fn record_serializes_outcome_inline() {
        let record = MoleculeRecord::assemble(cid(702), Ok(Some("CCO".to_string())), Ok(None));
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["id"], json!(702));
        assert_eq!(value["status"], json!("complete"));
    }
}
