pub mod error;
pub mod messages;
pub mod repl;
pub mod reveal;

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use acs_chat_core::CallOptions;
use acs_chat_core::ChatSession;
use acs_chat_core::Credentials;
use acs_chat_core::RagConfig;
use acs_chat_core::RagErr;
use acs_chat_core::RagOrchestrator;
use acs_chat_core::embeddings::OpenAiCompatibleEmbeddings;
use acs_chat_core::generation::ChatCompletionsBackend;
use acs_chat_core::index::InMemoryVectorIndex;
use acs_chat_core::index::PineconeIndex;
use acs_chat_core::index::VectorIndex;
use acs_chat_core::retrieval::ExcerptRetriever;
use clap::Parser;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::CliError;
use crate::error::Result;
use crate::repl::Repl;
use crate::reveal::DEFAULT_REVEAL_DELAY_MS;
use crate::reveal::Reveal;

/// Ask questions about Census American Community Survey tables.
#[derive(Parser, Debug)]
#[command(name = "acs-chat", version, about)]
pub struct Cli {
    /// Ask a single question, print the answer and exit.
    #[arg(short, long)]
    pub question: Option<String>,

    /// Config file. Defaults to ~/.acs-chat/config.toml when present.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Environment file with API keys. Defaults to ./.env when present.
    #[arg(long, value_name = "FILE")]
    pub env_file: Option<PathBuf>,

    /// Query a local JSONL vector dump instead of the hosted index.
    #[arg(long, value_name = "FILE")]
    pub index_file: Option<PathBuf>,

    /// Per-character delay when printing answers; 0 prints at once.
    #[arg(long, value_name = "MS", default_value_t = DEFAULT_REVEAL_DELAY_MS)]
    pub reveal_delay_ms: u64,

    /// Log filter, e.g. `debug` or `acs_chat_core=trace`. Overrides RUST_LOG.
    #[arg(long, value_name = "FILTER")]
    pub log_level: Option<String>,
}

pub async fn run_main(cli: Cli) -> Result<()> {
    init_tracing(cli.log_level.as_deref())?;
    load_env_file(cli.env_file.as_deref())?;

    let config = RagConfig::load(cli.config.as_deref())?;
    let credentials = Credentials::from_env();
    let orchestrator = build_orchestrator(&config, &credentials, cli.index_file.as_deref()).await?;
    info!(model = %config.model, top_k = config.top_k, "ready");

    let session = ChatSession::new(Arc::new(orchestrator));
    let mut options = CallOptions::new();
    if let Some(timeout) = config.request_timeout() {
        options = options.with_timeout(timeout);
    }
    let reveal = Reveal::new(Duration::from_millis(cli.reveal_delay_ms));

    match cli.question {
        Some(question) => ask_once(session, &question, &options, reveal).await,
        None => {
            let mut repl = Repl::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout(), session)
                .with_options(options)
                .with_reveal(reveal)
                .with_ctrl_c(true);
            repl.run().await?;
            Ok(())
        }
    }
}

async fn ask_once(
    mut session: ChatSession,
    question: &str,
    options: &CallOptions,
    reveal: Reveal,
) -> Result<()> {
    let answer = session.ask(question, options).await?;
    let mut stdout = tokio::io::stdout();
    reveal.write(&mut stdout, &answer).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;
    Ok(())
}

/// Wire the HTTP adapters (or a local index dump) into an orchestrator.
pub async fn build_orchestrator(
    config: &RagConfig,
    credentials: &Credentials,
    index_file: Option<&Path>,
) -> Result<RagOrchestrator> {
    let mut embedder = OpenAiCompatibleEmbeddings::new(&config.embedding_model, &config.embedding_url);
    if let Some(api_key) = &credentials.embedding_api_key {
        embedder = embedder.with_api_key(api_key.as_str());
    }

    let index: Arc<dyn VectorIndex> = match index_file {
        Some(path) => {
            let index = InMemoryVectorIndex::load_jsonl(path).await.map_err(|e| {
                RagErr::invalid_config(format!("cannot load {}: {e}", path.display()))
            })?;
            info!(path = %path.display(), records = index.len(), "using local index");
            Arc::new(index)
        }
        None => {
            let host = config.index_host.as_deref().ok_or_else(|| {
                RagErr::invalid_config("index_host is not set (PINECONE_INDEX_HOST)")
            })?;
            let mut index =
                PineconeIndex::new(credentials.require_index_key()?, &config.index_name, host);
            if let Some(namespace) = &config.namespace {
                index = index.with_namespace(namespace.as_str());
            }
            Arc::new(index)
        }
    };

    let backend = ChatCompletionsBackend::new(credentials.require_generation_key()?, &config.model)
        .with_base_url(&config.generation_base_url)
        .with_max_tokens(config.max_tokens);

    let retriever = ExcerptRetriever::new(Arc::new(embedder), index, config.top_k);
    Ok(RagOrchestrator::new(retriever, Arc::new(backend)).with_assembler(config.assembler()))
}

fn load_env_file(path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            dotenvy::from_path(path)?;
        }
        None => match dotenvy::dotenv() {
            Ok(_) => {}
            Err(err) if err.not_found() => {}
            Err(err) => return Err(err.into()),
        },
    }
    Ok(())
}

fn init_tracing(filter: Option<&str>) -> Result<()> {
    let filter = match filter {
        Some(directives) => EnvFilter::try_new(directives)
            .map_err(|e| CliError::General(format!("invalid --log-level {directives:?}: {e}")))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;
    Ok(())
}
