use anyhow::{Context, Result};
use cds_embed::{EmbedConfig, GeminiEmbedProvider};
use cds_retriever::loader::{PROCESSED_LIST_FILE, load_records};
use cds_retriever::pipeline::{IndexingPipeline, PipelineConfig};
use cds_retriever::search::{DEFAULT_TOP_K, RetrievalService};
use cds_retriever::store::pinecone::{PineconeConfig, PineconeStore};
use cds_retriever::tracker::ProcessedLog;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

/// CLI for the college-admissions indexing and retrieval core.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Index extracted records from a data directory into the vector store
    Index {
        /// Directory containing extracted *.json records
        #[arg(short, long, default_value = "data/json")]
        data_dir: PathBuf,
        /// Delay between records in milliseconds (rate limiting)
        #[arg(long, default_value_t = 1000)]
        delay_ms: u64,
    },
    /// Run a semantic query against the indexed records
    Search {
        /// Query text (already normalized/translated upstream)
        query: String,
        /// Number of matches to return
        #[arg(short = 'k', long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
    },
}

/// Connection settings pulled from the environment, passed down explicitly.
struct Backends {
    provider: Arc<GeminiEmbedProvider>,
    store: Arc<PineconeStore>,
}

fn required_env(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("{name} is not set in the environment"))
}

fn connect_backends() -> Result<Backends> {
    let google_api_key = required_env("GOOGLE_API_KEY")?;
    let pinecone_api_key = required_env("PINECONE_API_KEY")?;
    let index_host = required_env("PINECONE_INDEX_HOST")?;

    let provider = GeminiEmbedProvider::new(EmbedConfig::new(google_api_key))?;
    let store = PineconeStore::new(PineconeConfig::new(pinecone_api_key, index_host))?;
    Ok(Backends {
        provider: Arc::new(provider),
        store: Arc::new(store),
    })
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();
    let backends = connect_backends()?;

    match args.command {
        Commands::Index { data_dir, delay_ms } => {
            let records = load_records(&data_dir).await?;
            println!("Found {} records in {}", records.len(), data_dir.display());

            let tracker = ProcessedLog::new(data_dir.join(PROCESSED_LIST_FILE));
            let config =
                PipelineConfig::default().with_record_delay(Duration::from_millis(delay_ms));
            let pipeline =
                IndexingPipeline::new(backends.provider, backends.store, tracker, config);

            let stats = pipeline.run(&records).await?;
            println!(
                "Indexing complete: {} newly indexed, {} already processed, {} deferred, {} chunks upserted",
                stats.records_indexed,
                stats.records_skipped,
                stats.records_deferred,
                stats.chunks_upserted
            );
        }
        Commands::Search { query, top_k } => {
            let service = RetrievalService::new(backends.provider, backends.store);
            let report = service.search(&query, top_k).await;
            println!("{report}");
        }
    }

    Ok(())
}
