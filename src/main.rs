use clap::{Parser, Subcommand};
use image_repo::batch::{self, BatchParams};
use image_repo::import::{self, ImportOptions, ImportRequest};
use image_repo::imaging::RustCodec;
use image_repo::store::FileStore;
use image_repo::{config, output, retrieval};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Resize parameters shared by `import` and `import-dir`.
#[derive(clap::Args, Clone)]
struct ResizeArgs {
    /// Target width in pixels (0 = derive from height with --keep-aspect-ratio)
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    width: i32,

    /// Target height in pixels (0 = derive from width with --keep-aspect-ratio)
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    height: i32,

    /// Derive the missing side from the source aspect ratio
    #[arg(long)]
    keep_aspect_ratio: bool,

    /// Output format: png or jpeg
    #[arg(long)]
    format: String,
}

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "image-repo")]
#[command(about = "Content-addressed image store with resize-on-import")]
#[command(long_about = "\
Content-addressed image store with resize-on-import

Every import is resized, re-encoded to PNG or JPEG at full quality, and
stored once. Importing content that encodes to bytes already in the store
returns the existing id instead of writing a copy.

Resize modes:

  --width 640 --height 480                 exact size, aspect ratio ignored
  --width 640 --keep-aspect-ratio          height derived from the source
  --height 480 --keep-aspect-ratio         width derived from the source

Store layout:

  .image-repo/
  ├── config.toml      # optional; see 'image-repo gen-config'
  ├── index.json       # record metadata
  └── blobs/           # one encoded payload per record

Set RUST_LOG (e.g. RUST_LOG=image_repo=debug) for pipeline logs on stderr.")]
#[command(version = version_string())]
struct Cli {
    /// Store directory
    #[arg(long, default_value = ".image-repo", global = true)]
    store: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import one image
    Import {
        /// Source image file
        file: PathBuf,
        #[command(flatten)]
        resize: ResizeArgs,
    },
    /// Import every image under a directory
    ImportDir {
        /// Directory to walk
        dir: PathBuf,
        #[command(flatten)]
        resize: ResizeArgs,
    },
    /// Write a stored image to disk
    Get {
        id: Uuid,
        /// Destination file (default: <id>.<ext> in the current directory)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Show metadata for a stored image
    Info {
        id: Uuid,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Import { file, resize } => {
            let (store, repo_config) = open_store(&cli.store)?;
            let options = ImportOptions::from_config(&repo_config);
            let request = ImportRequest {
                target_width: resize.width,
                target_height: resize.height,
                keep_aspect_ratio: resize.keep_aspect_ratio,
                target_format: resize.format,
                source: std::fs::read(&file)?,
                file_name: file_name_of(&file),
            };
            let outcome = import::import(&store, &request, &options)?;
            output::print_import_outcome(&outcome, &file);
        }
        Command::ImportDir { dir, resize } => {
            let (store, repo_config) = open_store(&cli.store)?;
            let options = ImportOptions::from_config(&repo_config);
            init_thread_pool(&repo_config.processing);
            let params = BatchParams {
                target_width: resize.width,
                target_height: resize.height,
                keep_aspect_ratio: resize.keep_aspect_ratio,
                target_format: resize.format,
            };
            let root = dir.clone();
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_batch_event(&event, &root) {
                        println!("{}", line);
                    }
                }
            });
            let codec = RustCodec::with_filter(options.filter);
            let summary = batch::import_dir(&codec, &store, &dir, &params, &options, Some(tx))?;
            printer
                .join()
                .map_err(|_| "batch output thread panicked")?;
            output::print_batch_summary(&summary);
        }
        Command::Get { id, output: dest } => {
            let store = FileStore::open(&cli.store)?;
            let payload = retrieval::fetch_payload(&store, id)?;
            let dest = dest.unwrap_or_else(|| {
                PathBuf::from(format!("{id}.{}", payload.format.extension()))
            });
            std::fs::write(&dest, &payload.bytes)?;
            output::print_payload_written(id, &payload, &dest);
        }
        Command::Info { id, json } => {
            let store = FileStore::open(&cli.store)?;
            let info = retrieval::fetch_info(&store, id)?;
            output::print_info(&info, json)?;
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Install the stderr log subscriber. `RUST_LOG` overrides the default filter.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "image_repo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Load the store's config, then open the store itself.
fn open_store(
    root: &Path,
) -> Result<(FileStore, config::RepoConfig), Box<dyn std::error::Error>> {
    let repo_config = config::load_config(root)?;
    let store = FileStore::open(root)?;
    Ok((store, repo_config))
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; config can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
