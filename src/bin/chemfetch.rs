use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use chemfetch::app::{App, ResultSet};
use chemfetch::config::{ConfigLoader, Overrides};
use chemfetch::domain::{MoleculeId, StructureFormat, StructureQuery, Threshold};
use chemfetch::error::ChemFetchError;
use chemfetch::output::{JsonOutput, LogSink};
use chemfetch::remote::RemoteClient;

#[derive(Parser)]
#[command(name = "chemfetch")]
#[command(about = "Query PubChem: similarity search, compound properties and structure export")]
#[command(version, author)]
struct Cli {
    /// Path to a chemfetch.json config file
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Find compounds similar to a SMILES structure and fetch their properties")]
    Similar(SimilarArgs),
    #[command(about = "Fetch canonical SMILES and properties of one compound")]
    Molecule(MoleculeArgs),
    #[command(about = "Look up compound ids by name")]
    Search(SearchArgs),
    #[command(about = "Export the full structure record of one compound")]
    Structure(StructureArgs),
}

#[derive(Args)]
struct SimilarArgs {
    smiles: String,

    #[arg(long)]
    threshold: Option<u16>,

    #[arg(long)]
    max_results: Option<usize>,
}

#[derive(Args)]
struct MoleculeArgs {
    cid: String,
}

#[derive(Args)]
struct SearchArgs {
    name: String,

    #[arg(long)]
    max_results: Option<usize>,
}

#[derive(Args)]
struct StructureArgs {
    cid: String,

    #[arg(long, default_value_t = StructureFormat::Json)]
    format: StructureFormat,

    #[arg(long)]
    output: Option<Utf8PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(report) = run().await {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<ChemFetchError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &ChemFetchError) -> u8 {
    match error {
        ChemFetchError::InvalidMoleculeId(_)
        | ChemFetchError::InvalidQuery(_)
        | ChemFetchError::InvalidThreshold(_)
        | ChemFetchError::ConfigRead(_)
        | ChemFetchError::ConfigParse(_)
        | ChemFetchError::InvalidConfig(_) => 2,
        ChemFetchError::Transport(_)
        | ChemFetchError::RemoteStatus { .. }
        | ChemFetchError::Decode(_) => 3,
        ChemFetchError::PollTimeout { .. } | ChemFetchError::RequestTimeout(_) => 4,
        ChemFetchError::Output(_) => 1,
    }
}

async fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = ConfigLoader::resolve(cli.config.as_deref())?;

    let overrides = match &cli.command {
        Command::Similar(args) => Overrides {
            threshold: args.threshold.map(Threshold::new).transpose()?,
            max_results: args.max_results,
        },
        Command::Search(args) => Overrides {
            threshold: None,
            max_results: args.max_results,
        },
        Command::Molecule(_) | Command::Structure(_) => Overrides::default(),
    };
    settings.apply(&overrides)?;

    let client = RemoteClient::from_settings(&settings)?;
    let app = App::new(client, &settings);

    match cli.command {
        Command::Similar(args) => {
            let query: StructureQuery = args.smiles.parse()?;
            let result = app.search_and_enrich(&query, &LogSink).await?;
            JsonOutput::print_result_set(&result).into_diagnostic()?;
            print_summary(&result);
        }
        Command::Molecule(args) => {
            let id: MoleculeId = args.cid.parse()?;
            let record = app.fetch_record(id).await;
            JsonOutput::print_record(&record).into_diagnostic()?;
        }
        Command::Search(args) => {
            let ids = app.search_by_name(&args.name).await?;
            JsonOutput::print_ids(&ids).into_diagnostic()?;
        }
        Command::Structure(args) => {
            let id: MoleculeId = args.cid.parse()?;
            let export = app.fetch_structure(id, args.format).await?;
            JsonOutput::write_structure(&export, args.output.as_deref())
                .map_err(|err| ChemFetchError::Output(err.to_string()))?;
        }
    }
    Ok(())
}

fn print_summary(result: &ResultSet) {
    if result.is_empty() {
        eprintln!("no compounds above threshold {} for {}", result.threshold, result.query);
        return;
    }
    let incomplete = result
        .records
        .iter()
        .filter(|record| !record.is_complete())
        .count();
    eprintln!(
        "{} compounds, {} complete, {} partial, {} failed",
        result.len(),
        result.len() - incomplete,
        incomplete - result.failed_count(),
        result.failed_count()
    );
}
