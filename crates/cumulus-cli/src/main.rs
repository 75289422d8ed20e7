//! cumulus-cli - Command-line interface for browsing object stores
//!
//! This crate provides the `cumulus` binary:
//! - Shell-like listing and glob search over bucket keys
//! - A tree view of the simulated directories and containers
//! - Streaming downloads and uploads with multipart support
//! - Copy, move and space usage summaries
//! - Pattern-based removal

use anyhow::Result;
use clap::{Parser, Subcommand};
use cumulus_cloud::CloudStore;
use cumulus_core::config::Config;
use std::path::PathBuf;
use std::process;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod store_handler;

/// cumulus - browse flat object stores as directory trees
///
/// Object keys such as `proj/sub01.grp/data` are shown as nested folders,
/// and glob patterns are resolved with as few listing calls as possible.
#[derive(Parser)]
#[command(name = "cumulus")]
#[command(author, version, about = "Browse and search object stores as if they were file systems", long_about = None)]
struct Cli {
    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Store URL (s3://bucket, gs://bucket, az://container, file:///dir)
    #[arg(short, long, global = true, env = "CUMULUS_STORE")]
    store: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List a directory, or the entries matching a pattern
    Ls {
        /// Directory, key or glob pattern (defaults to the store root)
        #[arg(default_value = "")]
        pattern: String,
    },

    /// Print every key matching a glob pattern
    Glob {
        /// Glob pattern, e.g. "proj/*/data"
        pattern: String,

        /// Show size and modification time
        #[arg(short, long)]
        long: bool,

        /// Output matches with metadata as JSON
        #[arg(long, conflicts_with = "long")]
        json: bool,
    },

    /// Show the simulated directory tree
    Tree {
        /// Directory to start from (defaults to the store root)
        #[arg(default_value = "")]
        path: String,

        /// Maximum depth to descend
        #[arg(short, long)]
        depth: Option<usize>,
    },

    /// Show metadata for a key
    Stat {
        /// Object key or directory
        key: String,
    },

    /// Write an object to stdout
    Cat {
        /// Object key
        key: String,
    },

    /// Download an object, or a whole directory with -r
    Get {
        /// Object key or directory
        key: String,

        /// Output file or directory (defaults to the key's name)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Download every object below a directory
        #[arg(short, long)]
        recursive: bool,
    },

    /// Upload a local file
    Put {
        /// Local file to upload
        file: PathBuf,

        /// Destination key; a trailing '/' keeps the file name
        key: String,
    },

    /// Copy an object, or a directory with -r
    Cp {
        /// Source key or directory
        source: String,

        /// Destination key; a trailing '/' keeps the source name
        destination: String,

        /// Copy every object below a directory
        #[arg(short, long)]
        recursive: bool,

        /// Replace existing destination keys
        #[arg(short, long)]
        force: bool,
    },

    /// Move an object, or a directory with -r
    Mv {
        /// Source key or directory
        source: String,

        /// Destination key; a trailing '/' keeps the source name
        destination: String,

        /// Move every object below a directory
        #[arg(short, long)]
        recursive: bool,

        /// Replace existing destination keys
        #[arg(short, long)]
        force: bool,
    },

    /// Show space used below a directory
    Du {
        /// Directory or key (defaults to the store root)
        #[arg(default_value = "")]
        path: String,

        /// Only print the total
        #[arg(long)]
        summarize: bool,
    },

    /// Remove objects
    Rm {
        /// Key, directory or glob pattern
        pattern: String,

        /// Remove directories and everything below them
        #[arg(short, long)]
        recursive: bool,
    },

    /// Show configuration
    Config {
        /// Show current configuration
        #[arg(long, conflicts_with = "path")]
        show: bool,

        /// Show configuration file path
        #[arg(long, conflicts_with = "show")]
        path: bool,
    },
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else if quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let result = run();

    match result {
        Ok(_) => process::exit(0),
        Err(e) => {
            error!("Error: {:#}", e);

            let exit_code = map_error_to_exit_code(&e);
            process::exit(exit_code);
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = Config::load()?;

    match cli.command {
        Commands::Config { show, path } => show_config(&config, show, path),
        command => {
            let url = store_handler::resolve_store_url(cli.store.as_deref(), &config)?;
            let store = store_handler::open_store(&url, &config)?;
            run_store_command(&store, &config, command)
        }
    }
}

fn run_store_command(store: &CloudStore, config: &Config, command: Commands) -> Result<()> {
    match command {
        Commands::Ls { pattern } => commands::ls(store, &pattern),
        Commands::Glob {
            pattern,
            long,
            json,
        } => commands::glob(store, &pattern, long, json),
        Commands::Tree { path, depth } => commands::tree(store, config, &path, depth),
        Commands::Stat { key } => commands::stat(store, &key),
        Commands::Cat { key } => commands::cat(store, &key),
        Commands::Get {
            key,
            output,
            recursive,
        } => {
            info!("Downloading {} from {}", key, store.location());
            commands::get(store, &key, output, recursive)
        }
        Commands::Put { file, key } => {
            info!("Uploading {} to {}", file.display(), store.location());
            commands::put(store, &file, &key)
        }
        Commands::Cp {
            source,
            destination,
            recursive,
            force,
        } => commands::transfer(store, &source, &destination, recursive, force, false),
        Commands::Mv {
            source,
            destination,
            recursive,
            force,
        } => commands::transfer(store, &source, &destination, recursive, force, true),
        Commands::Du { path, summarize } => commands::du(store, &path, summarize),
        Commands::Rm { pattern, recursive } => commands::rm(store, &pattern, recursive),
        Commands::Config { show, path } => show_config(config, show, path),
    }
}

fn show_config(config: &Config, show: bool, path: bool) -> Result<()> {
    if show {
        println!("{}", toml::to_string_pretty(config)?);
    } else if path {
        println!("{}", Config::config_path()?.display());
    } else {
        eprintln!("Please specify --show or --path");
    }
    Ok(())
}

/// Map errors to exit codes:
/// - 0: Success
/// - 1: General or configuration error, or destination already exists
/// - 2: Store unavailable or IO error
/// - 3: Invalid pattern
/// - 4: Key not found
/// - 5: Name collision while building the tree
fn map_error_to_exit_code(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(core_err) = cause.downcast_ref::<cumulus_core::Error>() {
            return match core_err {
                cumulus_core::Error::Config(_) => 1,
                cumulus_core::Error::AlreadyExists(_) => 1,
                cumulus_core::Error::BackendUnavailable { .. } => 2,
                cumulus_core::Error::Io(_) => 2,
                cumulus_core::Error::InvalidPattern { .. } => 3,
                cumulus_core::Error::NotFound(_) => 4,
                cumulus_core::Error::NameCollision { .. } => 5,
            };
        }
        if let Some(cloud_err) = cause.downcast_ref::<cumulus_cloud::CloudError>() {
            return match cloud_err {
                e if e.is_not_found() => 4,
                cumulus_cloud::CloudError::InvalidPath(_) => 1,
                _ => 2,
            };
        }
        if cause.is::<std::io::Error>() {
            return 2;
        }
    }
    1
}
