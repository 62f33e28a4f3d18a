//! Asynchronous PubChem client.
//!
//! [`app::App::search_and_enrich`] runs a structure similarity job, polls it
//! to completion and fetches the canonical SMILES and property set of every
//! hit concurrently. Per-compound failures stay inside the returned records.

pub mod app;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod output;
pub mod properties;
pub mod pubchem;
pub mod remote;
pub mod similarity;
