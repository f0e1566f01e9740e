//! Ingest CLI: upload room media through the ingestion pipeline.
//!
//! Storage and classification settings come from the environment (`.env` is honored).
//! Rooms live in a JSON file, `rooms.json` unless `--rooms-file` is given.

use anyhow::{bail, Context};
use clap::{ArgGroup, Args, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ingest_core::models::{KindFilter, MediaFile, TargetId, TargetRecord};
use ingest_core::IngestConfig;
use ingest_infra::{init_telemetry, shutdown_telemetry};
use ingest_storage::create_storage;
use ingest_worker::{
    BatchSnapshot, BatchStatus, JsonFileTargetStore, Orchestrator, TargetRequest, TargetStore,
    UploadRequest,
};

#[derive(Parser)]
#[command(name = "ingest", about = "Room media ingestion CLI")]
struct Cli {
    /// Path to the rooms JSON file
    #[arg(long, global = true, default_value = "rooms.json")]
    rooms_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Room operations
    Rooms {
        #[command(subcommand)]
        sub: RoomCommands,
    },
    /// Upload images and/or one video to one or more rooms
    Upload(UploadArgs),
}

#[derive(Subcommand)]
enum RoomCommands {
    /// List all rooms
    List,
    /// Add a room
    Add {
        /// Room name
        name: String,
        /// Room type, used by `upload --category`
        #[arg(long)]
        category: String,
    },
}

#[derive(Args)]
#[command(group(ArgGroup::new("target").required(true).args(["room", "rooms", "category"])))]
struct UploadArgs {
    /// Upload to a single room
    #[arg(long)]
    room: Option<TargetId>,
    /// Upload to these rooms (comma separated ids)
    #[arg(long, value_delimiter = ',')]
    rooms: Vec<TargetId>,
    /// Upload to every room of this type
    #[arg(long)]
    category: Option<String>,
    /// Ignore videos in the selection
    #[arg(long, conflicts_with = "videos_only")]
    images_only: bool,
    /// Ignore images in the selection
    #[arg(long)]
    videos_only: bool,
    /// Keep only the first image
    #[arg(long)]
    single: bool,
    /// Files to upload
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

impl UploadArgs {
    fn target(&self) -> TargetRequest {
        match self.room {
            Some(id) => TargetRequest::Single(id),
            None => TargetRequest::Bulk {
                selected: self.rooms.clone(),
                category: self.category.clone(),
            },
        }
    }

    fn filter(&self) -> KindFilter {
        if self.images_only {
            KindFilter::ImagesOnly
        } else if self.videos_only {
            KindFilter::VideosOnly
        } else {
            KindFilter::Both
        }
    }
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

async fn read_file(path: &Path) -> anyhow::Result<MediaFile> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("Not a file: {}", path.display()))?;
    Ok(MediaFile::from_name(name, data))
}

fn print_progress(snapshot: &BatchSnapshot) {
    let finished = snapshot.completed_count + snapshot.error_count + snapshot.cancelled_count;
    let current = snapshot
        .tasks
        .iter()
        .find(|t| !t.is_terminal())
        .map(|t| format!(" {} ({}, {}%)", t.file_name, t.stage(), t.progress()))
        .unwrap_or_default();
    println!(
        "[{:>5.1}%] {}/{} files done{}",
        snapshot.progress,
        finished,
        snapshot.tasks.len(),
        current
    );
}

async fn upload(
    config: &IngestConfig,
    store: Arc<JsonFileTargetStore>,
    args: UploadArgs,
) -> anyhow::Result<()> {
    let mut files = Vec::with_capacity(args.files.len());
    for path in &args.files {
        files.push(read_file(path).await?);
    }

    let storage = create_storage(config)
        .await
        .context("Failed to initialize storage")?;
    let orchestrator = Orchestrator::new(config, storage, store);

    let mut request = UploadRequest::new(args.target(), files).with_filter(args.filter());
    if args.single {
        request = request.single_file();
    }

    let handle = orchestrator.start(request).await?;
    for rejected in handle.rejected() {
        eprintln!("skipped {} ({:?})", rejected.name, rejected.reason);
    }

    let mut rx = handle.subscribe();
    let mut last_printed = None;
    loop {
        let snapshot = rx.borrow_and_update().clone();
        let finished = snapshot.tasks.iter().filter(|t| t.is_terminal()).count();
        let key = (snapshot.progress as u32, snapshot.status, finished);
        if last_printed != Some(key) {
            print_progress(&snapshot);
            last_printed = Some(key);
        }
        if snapshot.status == BatchStatus::Complete {
            break;
        }
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                let cancelled = handle.cancel_all();
                eprintln!("cancelling {} remaining file(s)...", cancelled);
            }
        }
    }

    let outcome = handle.wait().await?;
    for task in outcome.tasks() {
        if let Some(failure) = task.failure() {
            eprintln!("failed {}: {}", task.file_name, failure.message);
        }
    }
    let retry = outcome.retryable_files();
    if !retry.is_empty() {
        eprintln!("retry with: {}", retry.join(" "));
    }
    print_json(&outcome.summary())?;

    if let Err(e) = &outcome.apply {
        bail!("{}", e);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = IngestConfig::from_env().context("Invalid configuration")?;
    init_telemetry(config.log_format)
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    let store = Arc::new(JsonFileTargetStore::new(&cli.rooms_file));
    tracing::debug!(rooms_file = %store.path().display(), "Using rooms file");

    let result = match cli.command {
        Commands::Rooms { sub } => match sub {
            RoomCommands::List => {
                let rooms = store.list().await?;
                print_json(&rooms)
            }
            RoomCommands::Add { name, category } => {
                let room = store.create(TargetRecord::new(name, category)).await?;
                print_json(&room)
            }
        },
        Commands::Upload(args) => upload(&config, store, args).await,
    };

    shutdown_telemetry().await;
    result
}
