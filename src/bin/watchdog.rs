use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use watchdog::codec::encode_chunk;
use watchdog::contract::{self, Function};
use watchdog::core::{digest_hex, Clock, FixedClock, SystemClock};
use watchdog::model::wire::parse_instant;
use watchdog::{ChunkData, EngineConfig, Watchdog, WorldState};

#[derive(Parser)]
#[command(name = "watchdog", version, about = "Sensor chunk retention ledger")]
struct Cli {
    /// Engine configuration file (JSON).
    #[arg(long = "config", global = true)]
    config: Option<PathBuf>,

    /// Journal backing the world state; overrides the config file.
    #[arg(long = "journal", global = true)]
    journal: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute one contract function as a transaction.
    Invoke {
        function: String,
        args: Vec<String>,
        /// Transaction timestamp (RFC 3339) instead of the local clock.
        #[arg(long = "at")]
        at: Option<String>,
        /// Transaction id instead of a derived one.
        #[arg(long = "tx-id")]
        tx_id: Option<String>,
    },
    /// Print the transport encoding of a chunk JSON document.
    Encode { chunk_path: PathBuf },
    /// List registered policies.
    Policies,
}

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if cli.journal.is_some() {
        config.journal_path = cli.journal.clone();
    }

    let mut out = io::BufWriter::new(io::stdout());
    match cli.command {
        Commands::Invoke {
            function,
            args,
            at,
            tx_id,
        } => {
            let clock: Box<dyn Clock> = match at {
                Some(at) => Box::new(FixedClock::new(parse_instant(&at)?)),
                None => Box::new(SystemClock),
            };
            cmd_invoke(config, clock.as_ref(), &function, &args, tx_id, &mut out)?
        }
        Commands::Encode { chunk_path } => cmd_encode(&chunk_path, &mut out)?,
        Commands::Policies => cmd_policies(&config, &mut out)?,
    }
    out.flush()?;
    Ok(())
}

fn cmd_invoke(
    config: EngineConfig,
    clock: &dyn Clock,
    function: &str,
    args: &[String],
    tx_id: Option<String>,
    out: &mut dyn Write,
) -> Result<()> {
    let parsed: Function = function.parse()?;
    let mut world = match &config.journal_path {
        Some(path) => WorldState::open(path)
            .with_context(|| format!("opening journal {}", path.display()))?,
        None => WorldState::new(),
    };
    let engine = Watchdog::new(config);

    let timestamp = clock.now();
    let tx_id = tx_id.unwrap_or_else(|| derive_tx_id(timestamp, function, args));
    if parsed.is_query() {
        let mut tx = world.begin(tx_id, timestamp);
        let result = contract::invoke(&engine, &mut tx, function, args)?;
        out.write_all(&result)?;
    } else {
        let result = world.execute(tx_id.clone(), timestamp, |tx| {
            contract::invoke(&engine, tx, function, args)
        })?;
        info!("committed {parsed} as {tx_id}");
        out.write_all(&result)?;
    }
    writeln!(out)?;
    Ok(())
}

fn cmd_encode(chunk_path: &Path, out: &mut dyn Write) -> Result<()> {
    let raw = fs::read(chunk_path).with_context(|| format!("reading {}", chunk_path.display()))?;
    let chunk: ChunkData = serde_json::from_slice(&raw)
        .with_context(|| format!("{} is not a chunk document", chunk_path.display()))?;
    if chunk.id.is_empty() {
        bail!("{} has no chunk id", chunk_path.display());
    }
    writeln!(out, "{}", encode_chunk(&chunk)?)?;
    Ok(())
}

fn cmd_policies(config: &EngineConfig, out: &mut dyn Write) -> Result<()> {
    let engine = Watchdog::new(config.clone());
    writeln!(out, "{}", engine.registry().describe())?;
    Ok(())
}

/// Deterministic id for a submission: digest of stamp, function and arguments.
fn derive_tx_id(timestamp: time::OffsetDateTime, function: &str, args: &[String]) -> String {
    let mut material = format!("{}|{function}", timestamp.unix_timestamp_nanos());
    for arg in args {
        material.push('|');
        material.push_str(arg);
    }
    digest_hex(material.as_bytes())[..32].to_string()
}
