//! Query the research paper system.
//!
//! Usage:
//!   paperlink-query search <query> [--top-k N] [--min-similarity S] [--summarize]
//!   paperlink-query related <paper_id> [--top-k N]
//!   paperlink-query contradictions <query> [--top-k N]

use std::env;
use std::sync::Arc;

use paperlink_core::config::Settings;
use paperlink_embed::default_embedder;
use paperlink_engine::{LlmSummarizer, SearchEngine};
use paperlink_store::{EndeeClient, VectorStore};

const MAX_DISPLAY_TEXT: usize = 300;

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  paperlink-query search <query> [--top-k N] [--min-similarity S] [--summarize]");
    eprintln!("  paperlink-query related <paper_id> [--top-k N]");
    eprintln!("  paperlink-query contradictions <query> [--top-k N]");
}

struct Args {
    command: String,
    target: String,
    top_k: Option<usize>,
    min_similarity: Option<f32>,
    summarize: bool,
}

fn parse_args() -> Args {
    let mut argv: Vec<String> = env::args().skip(1).collect();
    if argv.len() < 2 {
        print_usage();
        std::process::exit(1);
    }
    let command = argv.remove(0);
    let target = argv.remove(0);

    let mut args = Args {
        command,
        target,
        top_k: None,
        min_similarity: None,
        summarize: false,
    };

    let mut i = 0;
    while i < argv.len() {
        match argv[i].as_str() {
            "--top-k" => {
                match argv.get(i + 1).and_then(|v| v.parse::<usize>().ok()) {
                    Some(k) => args.top_k = Some(k),
                    None => {
                        eprintln!("Error: --top-k requires a number");
                        std::process::exit(1);
                    }
                }
                i += 1;
            }
            "--min-similarity" => {
                match argv.get(i + 1).and_then(|v| v.parse::<f32>().ok()) {
                    Some(s) => args.min_similarity = Some(s),
                    None => {
                        eprintln!("Error: --min-similarity requires a number");
                        std::process::exit(1);
                    }
                }
                i += 1;
            }
            "--summarize" => args.summarize = true,
            flag => {
                eprintln!("Unknown flag: {flag}");
                std::process::exit(1);
            }
        }
        i += 1;
    }
    args
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
    let engine = SearchEngine::new(store, embedder, &settings);

    match args.command.as_str() {
        "search" => {
            let results = engine
                .search(&args.target, args.top_k, args.min_similarity, None)
                .await;
            println!("{}", SearchEngine::format_results(&results, MAX_DISPLAY_TEXT));

            if args.summarize {
                println!("\n{}", "=".repeat(80));
                println!("AI SUMMARY");
                println!("{}\n", "=".repeat(80));

                let summarizer = LlmSummarizer::from_settings(&settings);
                match summarizer.summarize_search_results(&args.target, &results).await {
                    Some(summary) => println!("{summary}"),
                    None => println!("Could not generate summary. Check LLM configuration."),
                }
            }
        }
        "related" => {
            let top_k = args.top_k.unwrap_or(5);
            let results = engine.find_related_papers(&args.target, top_k).await;
            println!("{}", SearchEngine::format_results(&results, MAX_DISPLAY_TEXT));
        }
        "contradictions" => {
            let top_k = args.top_k.unwrap_or(settings.top_k_results);
            let results = engine.find_contradictions(&args.target, top_k).await;
            println!("{}", SearchEngine::format_results(&results, MAX_DISPLAY_TEXT));
        }
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            std::process::exit(1);
        }
    }
    Ok(())
}
