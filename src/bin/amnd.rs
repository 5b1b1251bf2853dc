use std::path::PathBuf;

use anyhow::Result;
use assoc_memory::{
    associator::{Associator, HttpAssociator},
    config::AssocMemConfig,
    retrieve_context, run_batch_process, Index,
};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "amnd", version = env!("CARGO_PKG_VERSION"), about = "Associative memory retriever")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Retrieve context for a free-text query
    Retrieve {
        #[arg(long)]
        query: String,
        #[arg(long)]
        docs_dir: Option<PathBuf>,
        #[arg(long, default_value_t = 4096)]
        max_length: usize,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Run the nightly graph maintenance pipeline (association, forgetting, consolidation)
    Maintain {
        #[arg(long)]
        docs_dir: Option<PathBuf>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Retrieve {
            query,
            docs_dir,
            max_length,
            json,
        } => {
            let config = AssocMemConfig::from_env();
            let docs_dir = docs_dir.unwrap_or(config.docs_dir);
            let index = Index::build(&docs_dir);
            let context = retrieve_context(&index, &query, max_length);
            if json {
                println!("{}", serde_json::to_string_pretty(&context)?);
            } else {
                println!("{context}");
            }
        }
        Commands::Maintain { docs_dir, json } => {
            let config = AssocMemConfig::from_env();
            let docs_dir = docs_dir.unwrap_or_else(|| config.docs_dir.clone());
            let associator = HttpAssociator::new(&config)?;
            let report = run_batch_process(&docs_dir, &associator as &dyn Associator);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "MAINTAIN_OK links_added={} links_forgotten={} notes_consolidated={}",
                    report.links_added, report.links_forgotten, report.notes_consolidated
                );
                for detail in &report.details {
                    println!("  {detail}");
                }
            }
        }
    }

    Ok(())
}
