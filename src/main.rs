use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgGroup, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod aggregate;
mod config;
mod dates;
mod db;
mod error;
mod lookup;
mod memory;
mod models;
mod report;
mod resolve;
mod sources;
mod store;

use crate::lookup::{Lookup, Target};
use crate::resolve::SearchCriteria;

#[derive(Parser)]
#[command(name = "claims-history")]
#[command(about = "Workers' compensation claim history lookup", long_about = None)]
struct Cli {
    #[command(flatten)]
    settings: config::Settings,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the claims a reference or worker name could refer to
    #[command(group(
        ArgGroup::new("search")
            .args(["reference", "first_name", "last_name"])
            .required(true)
            .multiple(true)
    ))]
    Resolve {
        #[arg(long)]
        reference: Option<String>,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
    },
    /// Show the decision and payment history of one claim
    #[command(group(
        ArgGroup::new("target")
            .args(["claim_id", "reference", "first_name", "last_name"])
            .required(true)
            .multiple(true)
    ))]
    History {
        #[arg(long, conflicts_with_all = ["reference", "first_name", "last_name"])]
        claim_id: Option<i64>,
        #[arg(long)]
        reference: Option<String>,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        /// Print the case view as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown report for one claim
    Report {
        #[arg(long)]
        claim_id: i64,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Export the decision history of one claim as CSV
    Export {
        #[arg(long)]
        claim_id: i64,
        #[arg(long)]
        csv: PathBuf,
    },
}

fn search_target(
    claim_id: Option<i64>,
    reference: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
) -> Target {
    match claim_id {
        Some(claim_id) => Target::Claim(claim_id),
        None => Target::Search(SearchCriteria {
            reference,
            first_name,
            last_name,
        }),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = cli.settings;
    let boxed = settings.open_store().await?;
    let store = &*boxed;

    match cli.command {
        Commands::Resolve {
            reference,
            first_name,
            last_name,
        } => {
            let criteria = SearchCriteria {
                reference,
                first_name,
                last_name,
            };
            let candidates =
                lookup::within(settings.timeout(), resolve::resolve(store, &criteria)).await?;

            println!("{} matching claims:", candidates.len());
            for candidate in &candidates {
                println!("- {}: {}", candidate.claim_id, candidate.label());
            }
        }
        Commands::History {
            claim_id,
            reference,
            first_name,
            last_name,
            json,
        } => {
            let target = search_target(claim_id, reference, first_name, last_name);
            match lookup::lookup(store, &target, settings.timeout()).await? {
                Lookup::Resolved(view) if json => {
                    println!("{}", serde_json::to_string_pretty(&view)?);
                }
                Lookup::Resolved(view) => print!("{}", report::render_text(&view)),
                Lookup::Ambiguous(choices) if json => {
                    let body = serde_json::json!({ "choices": choices });
                    println!("{}", serde_json::to_string_pretty(&body)?);
                }
                Lookup::Ambiguous(choices) => print!("{}", report::render_choices(&choices)),
            }
        }
        Commands::Report { claim_id, out } => {
            let view = lookup::within(settings.timeout(), aggregate::aggregate(store, claim_id))
                .await?;
            std::fs::write(&out, report::build_report(&view))
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export { claim_id, csv } => {
            let view = lookup::within(settings.timeout(), aggregate::aggregate(store, claim_id))
                .await?;
            let written = report::export_csv(&view, &csv)
                .with_context(|| format!("failed to export {}", csv.display()))?;
            println!("Exported {written} decisions to {}.", csv.display());
        }
    }

    Ok(())
}
