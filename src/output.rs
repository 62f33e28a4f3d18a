use std::io::{self, Write};

use camino::Utf8Path;
use serde::Serialize;

use crate::app::{ProgressEvent, ProgressSink, ResultSet};
use crate::catalog::StructureExport;
use crate::domain::MoleculeId;
use crate::properties::MoleculeRecord;

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_result_set(result: &ResultSet) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_record(record: &MoleculeRecord) -> io::Result<()> {
        Self::print_json(record)
    }

    pub fn print_ids(ids: &[MoleculeId]) -> io::Result<()> {
        Self::print_json(&ids)
    }

    /// JSON exports are pretty-printed, other formats are written verbatim.
    pub fn write_structure(
        export: &StructureExport,
        destination: Option<&Utf8Path>,
    ) -> io::Result<()> {
        let bytes = match export {
            StructureExport::Json(value) => {
                let mut text = serde_json::to_vec_pretty(value).map_err(io::Error::other)?;
                text.push(b'\n');
                text
            }
            StructureExport::Raw(bytes) => bytes.clone(),
        };
        match destination {
            Some(path) => std::fs::write(path, bytes),
            None => io::stdout().write_all(&bytes),
        }
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

/// Reports orchestrator phases through `tracing`.
pub struct LogSink;

impl ProgressSink for LogSink {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => tracing::info!(
                phase = %event.phase,
                elapsed_ms = elapsed.as_millis() as u64,
                "{}",
                event.message
            ),
            None => tracing::info!(phase = %event.phase, "{}", event.message),
        }
    }
}
