//! kgmirror - command-line interface
//!
//! `kgmirror mirror` performs one full run and exits non-zero on any
//! unrecovered failure.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use kgmirror::{
    CancelFlag, ConfigError, ErrorCode, LocalStore, LogLevel, Mirror, MirrorConfig, MirrorError, SparqlClient,
};

#[derive(Parser)]
#[command(name = "kgmirror")]
#[command(version = env!("KGMIRROR_VERSION"))]
#[command(about = "Mirror a slice of a remote knowledge graph into a local triple store", long_about = None)]
struct Cli {
    /// Configuration file (skips the default search path)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode (warnings and errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one full mirror
    Mirror {
        /// Local store location
        #[arg(long, value_name = "PATH")]
        store: Option<PathBuf>,

        /// Remote SPARQL endpoint
        #[arg(long, value_name = "URL")]
        endpoint: Option<String>,

        /// Identifiers per join / closure query
        #[arg(long, value_name = "N")]
        join_chunk: Option<usize>,

        /// Identifiers per predicate enumeration query
        #[arg(long, value_name = "N")]
        flat_chunk: Option<usize>,
    },

    /// Print the effective configuration
    Config,

    /// Print the number of statements in the local store
    Count {
        /// Local store location
        #[arg(long, value_name = "PATH")]
        store: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match MirrorConfig::load_with(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(ErrorCode::ConfigError.exit_code());
        }
    };

    init_tracing(&cli, config.general.log_level);

    if let Err(err) = run(cli, config).await {
        error!("{:#}", err);
        std::process::exit(exit_code(&err));
    }
}

fn init_tracing(cli: &Cli, configured: LogLevel) {
    let level = if cli.verbose {
        LogLevel::Verbose
    } else if cli.quiet {
        LogLevel::Quiet
    } else {
        configured
    };

    // RUST_LOG wins over flags and config
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.filter_directive()));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn exit_code(err: &anyhow::Error) -> i32 {
    if let Some(e) = err.downcast_ref::<MirrorError>() {
        return e.code().exit_code();
    }
    if err.downcast_ref::<ConfigError>().is_some() {
        return ErrorCode::ConfigError.exit_code();
    }
    1
}

async fn run(cli: Cli, mut config: MirrorConfig) -> Result<()> {
    match cli.command {
        Commands::Mirror {
            store,
            endpoint,
            join_chunk,
            flat_chunk,
        } => {
            if let Some(path) = store {
                config.store.path = path;
            }
            if let Some(url) = endpoint {
                config.endpoint.url = url;
            }
            if let Some(n) = join_chunk {
                config.mirror.join_chunk_size = n;
            }
            if let Some(n) = flat_chunk {
                config.mirror.flat_chunk_size = n;
            }
            config.validate()?;
            mirror(config).await
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
        Commands::Count { store } => {
            let path = store.unwrap_or(config.store.path);
            let store = LocalStore::open_reader(&path)
                .with_context(|| format!("cannot open store {}", path.display()))?;
            println!("{}", store.len()?);
            Ok(())
        }
    }
}

async fn mirror(config: MirrorConfig) -> Result<()> {
    info!(
        endpoint = %config.endpoint.url,
        store = %config.store.path.display(),
        version = %kgmirror::version_string(),
        "starting mirror"
    );

    let client = SparqlClient::from_config(&config.endpoint).map_err(MirrorError::from)?;
    let cancel = CancelFlag::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing committed batches");
            on_signal.cancel();
        }
    });

    let report = Mirror::new(Arc::new(client), config).with_cancel(cancel).run().await?;

    info!(
        discovered = report.discovered_compounds,
        occurrences = report.occurrences,
        compounds = report.compounds,
        taxa = report.extended_taxa,
        references = report.references,
        batches = report.batches,
        inserted = report.inserted,
        elapsed_secs = report.elapsed.as_secs(),
        "run summary"
    );
    println!("{}", report.store_len);
    Ok(())
}
