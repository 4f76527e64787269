//! EmberKV CLI
//!
//! Opens a store directory, runs one command and exits.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use emberkv::wal::WalReader;
use emberkv::{Config, Store};
use tracing_subscriber::{fmt, EnvFilter};

/// EmberKV CLI
#[derive(Parser, Debug)]
#[command(name = "emberkv")]
#[command(about = "Embedded key-value store with a B-tree index and write-ahead log")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./emberkv_data")]
    data_dir: PathBuf,

    /// LRU cache capacity (entries)
    #[arg(short, long, default_value = "100")]
    cache_capacity: usize,

    /// Pending writes that force a flush
    #[arg(short, long, default_value = "100")]
    batch_capacity: usize,

    /// Seconds a pending batch may wait before it is flushed
    #[arg(short, long, default_value = "60")]
    flush_interval_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Set several pairs given as KEY=VALUE
    Batch {
        /// Pairs to set
        #[arg(required = true)]
        pairs: Vec<String>,
    },

    /// Flush pending writes
    Flush,

    /// Print store counters
    Stats,

    /// Print the entries of the write-ahead log
    Wal,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,emberkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> emberkv::Result<ExitCode> {
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .cache_capacity(args.cache_capacity)
        .batch_capacity(args.batch_capacity)
        .flush_interval(Duration::from_secs(args.flush_interval_secs))
        .build();

    if let Commands::Wal = args.command {
        let mut reader = WalReader::open(&config.wal_path)?;
        for entry in reader.by_ref() {
            println!("{} {}", entry.key, String::from_utf8_lossy(&entry.payload));
        }
        if reader.malformed_lines() > 0 {
            tracing::warn!("{} malformed WAL lines skipped", reader.malformed_lines());
        }
        return Ok(ExitCode::SUCCESS);
    }

    tracing::debug!("EmberKV v{} at {}", emberkv::VERSION, args.data_dir.display());
    let store = Store::open(config)?;

    let code = match args.command {
        Commands::Get { key } => match store.get(&key) {
            Some(value) => {
                println!("{}", String::from_utf8_lossy(&value));
                ExitCode::SUCCESS
            }
            None => {
                eprintln!("(not found)");
                ExitCode::from(2)
            }
        },
        Commands::Set { key, value } => {
            store.set(&key, value.into_bytes())?;
            println!("OK");
            ExitCode::SUCCESS
        }
        Commands::Batch { pairs } => {
            let mut parsed = Vec::with_capacity(pairs.len());
            for pair in pairs {
                match pair.split_once('=') {
                    Some((key, value)) => parsed.push((key.to_string(), value.as_bytes().to_vec())),
                    None => {
                        eprintln!("invalid pair (expected KEY=VALUE): {}", pair);
                        return Ok(ExitCode::FAILURE);
                    }
                }
            }
            let count = parsed.len();
            store.batch_set(parsed)?;
            println!("OK ({} pairs)", count);
            ExitCode::SUCCESS
        }
        Commands::Flush => {
            let flushed = store.flush()?;
            println!("flushed {} writes", flushed);
            ExitCode::SUCCESS
        }
        Commands::Stats => {
            let stats = store.stats();
            println!("cached:           {}", stats.cached);
            println!("pending:          {}", stats.pending);
            println!("indexed:          {}", stats.indexed);
            println!("record log bytes: {}", stats.record_log_bytes);
            println!("wal entries:      {}", stats.wal_entries);
            ExitCode::SUCCESS
        }
        Commands::Wal => ExitCode::SUCCESS,
    };

    store.close()?;
    Ok(code)
}
