//! hypernotes CLI - inspect and browse a note store

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use hypernotes::config::{AppConfig, LogFormat};
use hypernotes::note::timestamp;
use hypernotes::store::{NoteStore, Store};
use hypernotes::view::{self, ViewState};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hypernotes", about = "Notes on machine-learning experiments", version)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List stored notes, most recent first
    List {
        /// Store file
        store: PathBuf,
    },
    /// Print one note as JSON
    Show {
        /// Store file
        store: PathBuf,
        /// Identifier of the note
        identifier: String,
    },
    /// Browse the store as a table in the web browser
    View {
        /// Store file
        store: PathBuf,
        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
        /// Interface to bind
        #[arg(long)]
        host: Option<String>,
        /// Do not open a browser tab
        #[arg(long)]
        no_browser: bool,
    },
    /// Write the flattened store to a Parquet file
    Export {
        /// Store file
        store: PathBuf,
        /// Output Parquet file
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config).context("loading configuration")?;
    init_tracing(&config);

    match cli.command {
        Commands::List { store } => list(&open_existing(&store)?),
        Commands::Show { store, identifier } => show(&open_existing(&store)?, &identifier),
        Commands::View {
            store,
            port,
            host,
            no_browser,
        } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(host) = host {
                config.server.host = host;
            }
            if no_browser {
                config.server.open_browser = false;
            }
            let state = ViewState::load(&open_existing(&store)?)?;
            view::serve(state, &config.server).await?;
            Ok(())
        }
        Commands::Export { store, output } => export(&open_existing(&store)?, &output),
    }
}

fn init_tracing(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match config.log.format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Text => subscriber.init(),
    }
}

fn open_existing(path: &Path) -> Result<Store> {
    if !path.exists() {
        bail!("store {} does not exist", path.display());
    }
    Store::open(path).with_context(|| format!("opening store {}", path.display()))
}

fn list(store: &Store) -> Result<()> {
    let notes = store.load()?;
    if notes.is_empty() {
        println!("(no notes in {})", store.path().display());
        return Ok(());
    }

    for note in notes {
        let ended = note
            .end_datetime()
            .map_or_else(|| "open".to_string(), |dt| timestamp::format(&dt));
        println!("{ended:<19}  {}  {}", note.identifier(), note.text());
    }
    Ok(())
}

fn show(store: &Store, identifier: &str) -> Result<()> {
    let note = store
        .load()?
        .into_iter()
        .find(|n| n.identifier() == identifier)
        .with_context(|| format!("no note with identifier {identifier}"))?;

    println!("{}", serde_json::to_string_pretty(&note)?);
    Ok(())
}

fn export(store: &Store, output: &Path) -> Result<()> {
    let table = store.load_table()?;
    table
        .write_parquet(output)
        .with_context(|| format!("writing {}", output.display()))?;

    println!(
        "exported {} notes ({} columns) to {}",
        table.num_rows(),
        table.num_columns(),
        output.display()
    );
    Ok(())
}
