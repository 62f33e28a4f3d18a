use std::time::Duration;

use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ChemFetchError {
    #[error("invalid molecule id: {0}")]
    InvalidMoleculeId(String),

    #[error("invalid structure query: {0}")]
    #[diagnostic(help("pass the structure as a SMILES string, e.g. CC(=O)OC1=CC=CC=C1C(=O)O"))]
    InvalidQuery(String),

    #[error("invalid similarity threshold: {0} (expected 0..=100)")]
    InvalidThreshold(u16),

    #[error("failed to read config file at {0}")]
    ConfigRead(Utf8PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid config value: {0}")]
    InvalidConfig(String),

    #[error("PubChem request failed: {0}")]
    Transport(String),

    #[error("PubChem returned status {status}: {message}")]
    RemoteStatus { status: u16, message: String },

    #[error("PubChem request timed out after {0:?}")]
    RequestTimeout(Duration),

    #[error("similarity job {list_key} did not resolve after {polls} polls ({elapsed:?})")]
    #[diagnostic(help("raise poll_deadline_secs or max_polls in chemfetch.json"))]
    PollTimeout {
        list_key: String,
        polls: u32,
        elapsed: Duration,
    },

    #[error("unexpected PubChem response: {0}")]
    Decode(String),

    #[error("failed to write output: {0}")]
    Output(String),
}

impl ChemFetchError {
    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            ChemFetchError::RemoteStatus { status, .. } => is_retryable_status(*status),
            ChemFetchError::Transport(_) | ChemFetchError::RequestTimeout(_) => true,
            _ => false,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ChemFetchError::RemoteStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}
