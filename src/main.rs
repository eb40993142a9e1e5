use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use simrec_api::RestApi;
use simrec_core::{
    Engine, EngineConfig, IndexKind, Item, ItemId, RecommendationService, TokenizerConfig,
};
use simrec_storage::{load_items_json, MovieLensLoader, SnapshotManager};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Item-to-item recommendations from TF-IDF features
#[derive(Parser, Debug)]
#[command(name = "simrec")]
#[command(about = "Content-based item recommendations", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// MovieLens movies.csv
    #[arg(long, global = true)]
    movies: Option<PathBuf>,

    /// MovieLens tags.csv
    #[arg(long, global = true)]
    tags: Option<PathBuf>,

    /// JSON array of {id, title, attributes}
    #[arg(long, global = true, conflicts_with = "movies")]
    items_json: Option<PathBuf>,

    /// Snapshot directory
    #[arg(long, global = true, default_value = "./data/snapshots")]
    snapshot_dir: PathBuf,

    /// HTTP API port
    #[arg(long, global = true, default_value_t = 8000)]
    http_port: u16,

    /// Index layout: flat or inverted
    #[arg(long, global = true, default_value = "inverted")]
    index: IndexKind,

    /// Minimum token length kept by the tokenizer
    #[arg(long, global = true, default_value_t = 1)]
    min_token_len: usize,

    /// Log level
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API (default)
    Serve,
    /// Build from the corpus and save a snapshot
    Build,
    /// Print recommendations for one item
    Recommend {
        #[arg(long, conflicts_with = "id")]
        title: Option<String>,
        #[arg(long)]
        id: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

impl Args {
    fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            tokenizer: TokenizerConfig {
                min_token_len: self.min_token_len,
                ..Default::default()
            },
            index_kind: self.index,
            ..Default::default()
        }
    }

    fn load_corpus(&self) -> anyhow::Result<Option<Vec<Item>>> {
        if let Some(path) = &self.items_json {
            return Ok(Some(load_items_json(path)?));
        }
        match &self.movies {
            Some(movies) => {
                let mut loader = MovieLensLoader::new(movies);
                if let Some(tags) = &self.tags {
                    loader = loader.with_tags(tags);
                }
                Ok(Some(loader.load()?))
            }
            None => Ok(None),
        }
    }

    /// Build from the corpus if one is given, otherwise restore the latest snapshot
    fn open_engine(&self, snapshots: &SnapshotManager) -> anyhow::Result<Engine> {
        if let Some(items) = self.load_corpus()? {
            return Ok(Engine::build(&items, self.engine_config())?);
        }
        match snapshots.load_latest()? {
            Some(generation) => Ok(Engine::from_generation(generation)),
            None => bail!(
                "no corpus given and no snapshot found in {}",
                snapshots.snapshot_dir().display()
            ),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting simrec v{}", env!("CARGO_PKG_VERSION"));
    let snapshots = SnapshotManager::new(&args.snapshot_dir)
        .with_context(|| format!("opening snapshot directory {}", args.snapshot_dir.display()))?;

    match &args.command {
        Some(Command::Build) => {
            let Some(items) = args.load_corpus()? else {
                bail!("build needs --movies or --items-json");
            };
            let engine = Engine::build(&items, args.engine_config())?;
            let description = snapshots.save(&engine.current())?;
            println!("{}", serde_json::to_string_pretty(&description)?);
        }
        Some(Command::Recommend { title, id, limit }) => {
            let service = RecommendationService::new(Arc::new(args.open_engine(&snapshots)?));
            let recs = match (title, id) {
                (Some(title), _) => service.recommend_by_title(title, *limit)?,
                (None, Some(id)) => service.recommend_scored(&ItemId::parse(id), *limit)?,
                (None, None) => bail!("recommend needs --title or --id"),
            };
            for rec in recs {
                println!("{:.4}\t{}\t{}", rec.score, rec.id, rec.title);
            }
        }
        Some(Command::Serve) | None => serve(&args, &snapshots).await?,
    }

    Ok(())
}

async fn serve(args: &Args, snapshots: &SnapshotManager) -> anyhow::Result<()> {
    let engine = Arc::new(args.open_engine(snapshots)?);
    let generation = engine.current();
    info!(
        "Engine ready: generation {}, {} items, {} dimensions, {} index",
        generation.number(),
        generation.len(),
        generation.dim(),
        generation.index().kind()
    );

    let service = RecommendationService::new(engine);
    let http_port = args.http_port;
    let http_handle = std::thread::spawn(move || {
        info!("Starting HTTP server on port {}", http_port);
        let sys = actix_web::rt::System::new();
        sys.block_on(async {
            if let Err(e) = RestApi::start(service, http_port).await {
                tracing::error!("HTTP server error: {}", e);
            }
        })
    });

    info!("HTTP API: http://localhost:{}/", http_port);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        _ = tokio::task::spawn_blocking(move || {
            http_handle.join().ok();
        }) => {
            info!("HTTP server stopped");
        }
    }

    info!("Shutting down...");
    Ok(())
}
