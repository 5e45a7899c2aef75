//! Ingest research papers into the vector store.
//!
//! Usage: paperlink-ingest <paths...> [--title T] [--authors A] [--year Y] [--reset]
//!
//! Paths may be files or directories; directories are listed directly
//! (no recursion) and filtered to .pdf/.txt/.md. Exits nonzero if any
//! file failed to ingest.

use std::env;
use std::path::Path;
use std::sync::Arc;

use anyhow::anyhow;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;

use paperlink_core::config::{resolve_with_base, Settings};
use paperlink_core::processor::{ChunkingConfig, DocumentProcessor};
use paperlink_core::types::Metadata;
use paperlink_embed::default_embedder;
use paperlink_engine::{default_file_metadata, IngestReport, IngestionPipeline};
use paperlink_store::{EndeeClient, VectorStore};

struct Args {
    paths: Vec<String>,
    title: Option<String>,
    authors: Option<String>,
    year: Option<i64>,
    reset: bool,
}

fn parse_args() -> Args {
    let argv: Vec<String> = env::args().skip(1).collect();
    let mut args = Args {
        paths: Vec::new(),
        title: None,
        authors: None,
        year: None,
        reset: false,
    };

    let mut i = 0;
    while i < argv.len() {
        match argv[i].as_str() {
            "--title" => {
                args.title = argv.get(i + 1).cloned();
                i += 1;
            }
            "--authors" => {
                args.authors = argv.get(i + 1).cloned();
                i += 1;
            }
            "--year" => {
                match argv.get(i + 1).and_then(|v| v.parse::<i64>().ok()) {
                    Some(year) => args.year = Some(year),
                    None => {
                        eprintln!("Error: --year requires a number");
                        std::process::exit(1);
                    }
                }
                i += 1;
            }
            "--reset" => args.reset = true,
            flag if flag.starts_with('-') => {
                eprintln!("Unknown flag: {flag}");
                std::process::exit(1);
            }
            path => args.paths.push(path.to_string()),
        }
        i += 1;
    }

    if args.paths.is_empty() {
        eprintln!(
            "Usage: paperlink-ingest <paths...> [--title T] [--authors A] [--year Y] [--reset]"
        );
        std::process::exit(1);
    }
    args
}

fn base_metadata(args: &Args) -> Metadata {
    let mut metadata = Metadata::new();
    if let Some(title) = &args.title {
        metadata.insert("title".to_string(), json!(title));
    }
    if let Some(authors) = &args.authors {
        metadata.insert("authors".to_string(), json!(authors));
    }
    if let Some(year) = args.year {
        metadata.insert("year".to_string(), json!(year));
    }
    metadata
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let settings = Settings::load().map_err(|e| {
        eprintln!("Error loading config: {e}");
        e
    })?;
    let args = parse_args();

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run(settings, args))
}

async fn run(settings: Settings, args: Args) -> anyhow::Result<()> {
    let embedder = default_embedder(&settings)?;
    let store: Arc<dyn VectorStore> = Arc::new(EndeeClient::from_settings(&settings)?);
    let processor = DocumentProcessor::with_config(ChunkingConfig::from_settings(&settings));
    let pipeline = IngestionPipeline::new(Arc::clone(&store), embedder, processor);

    if args.reset {
        println!("Resetting collection (explicit delete requested)");
        store
            .delete_collection()
            .await
            .map_err(|e| anyhow!("failed to reset collection: {e}"))?;
    }
    pipeline.initialize_collection().await?;

    let defaults = base_metadata(&args);
    let cwd = env::current_dir()?;

    let pb = ProgressBar::new(args.paths.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} paths {msg}")
            .expect("static template")
            .progress_chars("#>-"),
    );

    let mut report = IngestReport::default();
    for raw_path in &args.paths {
        let path = resolve_with_base(&cwd, raw_path);
        pb.set_message(path.display().to_string());

        if path.is_file() {
            let ok = pipeline
                .ingest_single_paper(&path, None, defaults.clone())
                .await;
            report.record(path, ok);
        } else if path.is_dir() {
            let defaults = defaults.clone();
            let extractor = move |file: &Path| {
                // File-level defaults first, then the shared CLI flags on top.
                let mut metadata = default_file_metadata(file);
                for (key, value) in &defaults {
                    metadata.insert(key.clone(), value.clone());
                }
                metadata
            };
            let dir_report = pipeline.ingest_from_directory(&path, Some(&extractor)).await;
            report.merge(dir_report);
        } else {
            eprintln!("Path not found: {}", path.display());
            report.record(path, false);
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    println!("\n{}", "=".repeat(80));
    println!("INGESTION SUMMARY");
    println!("{}", "=".repeat(80));
    println!("\nTotal files: {}", report.total());
    println!("Successful: {}", report.successful());
    println!("Failed: {}", report.failed());
    if report.failed() > 0 {
        println!("\nFailed files:");
        for path in report.failed_paths() {
            println!("  {}", path.display());
        }
    }
    println!("\n{}", "=".repeat(80));

    if report.failed() > 0 {
        std::process::exit(1);
    }
    Ok(())
}
