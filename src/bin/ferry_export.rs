//! ferry-export: Export selected root records as deep JSON or flat CSV
//!
//! Reads an entity model and a dataset file, resolves a projection plan
//! for the requested entity set, and streams the export to stdout or a
//! file.
//!
//! Usage:
//!   # Deep JSON export of two Books to stdout
//!   ferry-export --model model.json --data data.json --entity Books --keys 1,2
//!
//!   # Flat CSV export to a file
//!   ferry-export --model model.json --data data.json --entity Books \
//!       --keys 1,2,3 --format csv --output books.csv

// Use MiMalloc allocator for better performance
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::Parser;
use ferry::{export_to_writer, Catalog, ExportFormat, MemoryStore, DEFAULT_MAX_DEPTH};
use serde_json::Value;
use std::fs::File;
use std::io::{BufWriter, Write};

#[derive(Parser, Debug)]
#[command(name = "ferry-export")]
#[command(about = "Export root records as deep JSON or flat CSV", long_about = None)]
struct Args {
    /// Entity model document (JSON)
    #[arg(long)]
    model: String,

    /// Dataset document (JSON) to read records from
    #[arg(long)]
    data: String,

    /// Entity set to export (namespaced or short name)
    #[arg(long)]
    entity: String,

    /// Comma-separated root keys to export
    #[arg(long)]
    keys: String,

    /// Export format: json or csv (default: json)
    #[arg(long, default_value = "json")]
    format: String,

    /// Depth bound for recursive JSON expansion (default: 5)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Output file (use stdout if omitted)
    #[arg(long, short = 'o')]
    output: Option<String>,
}

/// Keys are given as raw text; take each as a JSON value when it parses
/// as one (numbers, quoted strings), otherwise as a plain string key.
fn parse_keys(raw: &str) -> Vec<Value> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(|k| serde_json::from_str(k).unwrap_or_else(|_| Value::String(k.to_string())))
        .collect()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let format: ExportFormat = args.format.parse()?;
    let max_depth = args.max_depth.unwrap_or(DEFAULT_MAX_DEPTH);
    let keys = parse_keys(&args.keys);

    let model = std::fs::read_to_string(&args.model)
        .with_context(|| format!("Failed to read model file: {}", args.model))?;
    let catalog = Catalog::from_model_json(&model).context("Failed to load entity model")?;

    let dataset = std::fs::read_to_string(&args.data)
        .with_context(|| format!("Failed to read dataset file: {}", args.data))?;
    let store =
        MemoryStore::from_dataset_json(catalog.clone(), &dataset).context("Failed to load dataset")?;

    let receipt = if let Some(path) = &args.output {
        let file = File::create(path).with_context(|| format!("Failed to create: {path}"))?;
        let mut sink = BufWriter::new(file);
        let receipt = export_to_writer(
            &store,
            &catalog,
            &args.entity,
            &keys,
            format,
            max_depth,
            &mut sink,
        )?;
        sink.flush()?;
        receipt
    } else {
        let stdout = std::io::stdout();
        let mut sink = BufWriter::new(stdout.lock());
        let receipt = export_to_writer(
            &store,
            &catalog,
            &args.entity,
            &keys,
            format,
            max_depth,
            &mut sink,
        )?;
        sink.flush()?;
        receipt
    };

    eprintln!(
        "Exported {} ({}) as {}",
        args.entity, receipt.content_type, receipt.filename
    );
    Ok(())
}
