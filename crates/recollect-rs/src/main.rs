//! Command-line client for the on-device record memory.

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use log::{debug, info};
use recollect_rs::config::RecollectConfig;
use recollect_rs::core::setup::{FileBackend, data_root};
use recollect_rs::core::{AnswerSource, FileImportProcessor, QueryContext};
use recollect_rs::memory::{IdentityState, KeyPair, derive_namespace};
use recollect_rs::protocol::{ChatMessage, PendingUpload, UploadProcessor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default data directory under the working directory.
const DEFAULT_DATA_DIR: &str = ".recollect";

/// Command-line options for the Recollect client.
#[derive(Parser)]
#[command(name = "recollect", version)]
struct Cli {
    /// Optional path to a recollect.json5 config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Data directory (overrides `storage.path` from config)
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// File holding the hex-encoded public key
    #[arg(long, requires = "private_key_file")]
    public_key_file: Option<PathBuf>,
    /// File holding the hex-encoded private key
    #[arg(long, requires = "public_key_file")]
    private_key_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the storage namespace for the active identity
    Namespace,
    /// Ask a question, answered locally when possible
    Ask {
        /// Question text
        #[arg(required = true)]
        text: Vec<String>,
        /// Restrict local counts to one record type
        #[arg(long = "type")]
        record_type: Option<String>,
        /// Search box contents used when the question has no keywords
        #[arg(long)]
        search: Option<String>,
    },
    /// Print the chat transcript for the active identity
    Transcript,
    /// Print the recent-record ledger as JSON
    Ledger,
    /// Import files as records
    Import {
        /// Files to import
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    recollect_rs::init_logging();

    let cli = Cli::parse();
    info!(
        "starting recollect (config_set={}, data_dir_set={}, keys_set={})",
        cli.config.is_some(),
        cli.data_dir.is_some(),
        cli.private_key_file.is_some()
    );
    let cwd = std::env::current_dir().context("cwd")?;
    let config = if let Some(path) = cli.config.as_ref() {
        RecollectConfig::load_from_path(path).context("failed to load config")?
    } else {
        let layered =
            RecollectConfig::load_layered(&cwd).context("failed to load layered config")?;
        debug!("layered config loaded (layers={})", layered.layers.len());
        layered.config
    };
    let identity = load_identity(
        cli.public_key_file.as_deref(),
        cli.private_key_file.as_deref(),
    )?;
    let root = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| data_root(&config, cwd.join(DEFAULT_DATA_DIR)));

    if let Command::Namespace = cli.command {
        println!(
            "{}",
            derive_namespace(identity.key_pair().map(KeyPair::private))
        );
        return Ok(());
    }

    let backend = FileBackend::open(&config, &root)
        .await
        .context("failed to open data directory")?;
    match cli.command {
        Command::Namespace => {}
        Command::Ledger => {
            let entries = backend.ledger.entries().await;
            println!(
                "{}",
                serde_json::to_string_pretty(&entries).context("failed to encode ledger")?
            );
        }
        Command::Transcript => {
            let session = backend.session(&config, identity, None).await?;
            if session.is_awaiting_keys().await {
                bail!("transcript cannot be read with the provided keys");
            }
            for message in session.messages().await {
                println!("{}", render_message(&message));
            }
        }
        Command::Ask {
            text,
            record_type,
            search,
        } => {
            let session = backend.session(&config, identity, None).await?;
            let context = QueryContext {
                type_filter: record_type.as_deref(),
                search_box: search.as_deref(),
            };
            let outcome = session.send(&text.join(" "), &context).await?;
            debug!(
                "answered (source={})",
                match outcome.source {
                    AnswerSource::Local => "local",
                    AnswerSource::Remote => "remote",
                    AnswerSource::Notice => "notice",
                }
            );
            println!("{}", outcome.reply.content);
        }
        Command::Import { files } => {
            let mut uploads = Vec::with_capacity(files.len());
            for path in files {
                uploads.push(read_upload(&path)?);
            }
            let processor: Arc<dyn UploadProcessor> = Arc::new(FileImportProcessor);
            let session = backend.session(&config, identity, Some(processor)).await?;
            for outcome in session.upload(uploads).await? {
                match &outcome.error {
                    Some(err) => println!("{}: {err}", outcome.name),
                    None => println!(
                        "{}: {} stored, {} failed",
                        outcome.name,
                        outcome.stored.len(),
                        outcome.failed_writes
                    ),
                }
            }
        }
    }
    Ok(())
}

/// Build the identity from optional hex key files.
fn load_identity(
    public: Option<&Path>,
    private: Option<&Path>,
) -> anyhow::Result<IdentityState> {
    let (Some(public), Some(private)) = (public, private) else {
        return Ok(IdentityState::Missing);
    };
    let public = std::fs::read_to_string(public)
        .with_context(|| format!("failed to read {}", public.display()))?;
    let private = std::fs::read_to_string(private)
        .with_context(|| format!("failed to read {}", private.display()))?;
    let keys = KeyPair::from_hex(&public, &private).context("invalid key material")?;
    Ok(IdentityState::Ready(keys))
}

fn read_upload(path: &Path) -> anyhow::Result<PendingUpload> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(PendingUpload::new(name, bytes).with_source(path))
}

fn render_message(message: &ChatMessage) -> String {
    match message.error_count {
        Some(count) if count > 1 => {
            format!("{}: {} (x{count})", message.role.as_str(), message.content)
        }
        _ => format!("{}: {}", message.role.as_str(), message.content),
    }
}
