//! ferry-import: Stream a JSON array of records into a dataset
//!
//! Reads the payload from a file or stdin, persists one element at a
//! time into the dataset, and reports the number of root records
//! imported. On failure the records persisted before the failing
//! element are kept, so a partial import is visible and accountable.
//!
//! Usage:
//!   # Import from a file
//!   ferry-import --model model.json --data data.json --entity Books books.json
//!
//!   # Import from stdin
//!   cat books.json | ferry-import --model model.json --data data.json --entity Books

// Use MiMalloc allocator for better performance
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::Parser;
use ferry::{Catalog, Importer, MemoryStore};
use std::fs::File;
use std::io::{BufRead, BufReader};

#[derive(Parser, Debug)]
#[command(name = "ferry-import")]
#[command(about = "Stream a JSON array of records into a dataset", long_about = None)]
struct Args {
    /// Entity model document (JSON)
    #[arg(long)]
    model: String,

    /// Dataset document (JSON) to import into; updated in place
    #[arg(long)]
    data: String,

    /// Entity set to import into (namespaced or short name)
    #[arg(long)]
    entity: String,

    /// Input payload file (use stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let model = std::fs::read_to_string(&args.model)
        .with_context(|| format!("Failed to read model file: {}", args.model))?;
    let catalog = Catalog::from_model_json(&model).context("Failed to load entity model")?;

    let dataset = std::fs::read_to_string(&args.data)
        .with_context(|| format!("Failed to read dataset file: {}", args.data))?;
    let mut store =
        MemoryStore::from_dataset_json(catalog.clone(), &dataset).context("Failed to load dataset")?;

    let reader: Box<dyn BufRead> = if let Some(path) = &args.input {
        Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Failed to open: {path}"))?,
        ))
    } else {
        Box::new(BufReader::new(std::io::stdin()))
    };

    let outcome = Importer::new(&catalog)
        .with_progress(|count| {
            if count % 1000 == 0 {
                eprintln!("... {count} records persisted");
            }
        })
        .run(&args.entity, reader, &mut store);

    // Persist whatever landed, even on a failed run: partial imports
    // are visible to the caller, not rolled back.
    std::fs::write(&args.data, store.to_dataset_json()?)
        .with_context(|| format!("Failed to write dataset file: {}", args.data))?;

    match outcome {
        Ok(summary) => {
            println!("Imported {} records into {}", summary.persisted, summary.entity);
            Ok(())
        }
        Err(err) => {
            eprintln!("Import failed after {} records: {}", err.persisted, err.kind);
            std::process::exit(1);
        }
    }
}
