use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ChemFetchError;

/// PubChem compound identifier (CID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoleculeId(u64);

impl MoleculeId {
    pub fn new(value: u64) -> Result<Self, ChemFetchError> {
        if value == 0 {
            return Err(ChemFetchError::InvalidMoleculeId(value.to_string()));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MoleculeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MoleculeId {
    type Err = ChemFetchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let is_digits = !trimmed.is_empty() && trimmed.chars().all(|ch| ch.is_ascii_digit());
        if !is_digits {
            return Err(ChemFetchError::InvalidMoleculeId(value.to_string()));
        }
        let parsed = trimmed
            .parse::<u64>()
            .map_err(|_| ChemFetchError::InvalidMoleculeId(value.to_string()))?;
        Self::new(parsed).map_err(|_| ChemFetchError::InvalidMoleculeId(value.to_string()))
    }
}

/// A structure in SMILES notation. Chemistry is validated by PubChem, not here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructureQuery(String);

impl StructureQuery {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StructureQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StructureQuery {
    type Err = ChemFetchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ChemFetchError::InvalidQuery(
                "structure query is empty".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// Handle of an asynchronous PubChem job (`Waiting.ListKey`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListKey(String);

impl ListKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tanimoto similarity threshold in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Threshold(u8);

impl Threshold {
    pub const DEFAULT: Threshold = Threshold(70);

    pub fn new(value: u16) -> Result<Self, ChemFetchError> {
        if value > 100 {
            return Err(ChemFetchError::InvalidThreshold(value));
        }
        Ok(Self(value as u8))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u16> for Threshold {
    type Error = ChemFetchError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Threshold> for u16 {
    fn from(value: Threshold) -> Self {
        value.0 as u16
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StructureFormat {
    Json,
    Sdf,
    Xml,
    Asnt,
}

impl StructureFormat {
    pub fn path_segment(self) -> &'static str {
        match self {
            StructureFormat::Json => "JSON",
            StructureFormat::Sdf => "SDF",
            StructureFormat::Xml => "XML",
            StructureFormat::Asnt => "ASNT",
        }
    }

    pub fn is_json(self) -> bool {
        matches!(self, StructureFormat::Json)
    }
}

impl fmt::Display for StructureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructureFormat::Json => write!(f, "json"),
            StructureFormat::Sdf => write!(f, "sdf"),
            StructureFormat::Xml => write!(f, "xml"),
            StructureFormat::Asnt => write!(f, "asnt"),
        }
    }
}
