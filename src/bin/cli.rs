//! LineDB CLI
//!
//! Maintenance tool operating on a single table.

use clap::{Parser, Subcommand};
use linedb::{LineDbError, Record, Result, TableConfig, TableEngine};
use serde_json::Value;
use tracing_subscriber::{fmt, EnvFilter};

/// LineDB CLI
#[derive(Parser, Debug)]
#[command(name = "linedb-cli")]
#[command(about = "Inspect and maintain a LineDB table")]
#[command(version)]
struct Args {
    /// Directory holding the table files
    #[arg(short, long, default_value = "./linedb_data")]
    dir: String,

    /// Table name (files are {table}.jsonl, {table}.idx.json, {table}.log)
    #[arg(short, long, default_value = "table")]
    table: String,

    /// Only persist the index on explicit commit/exit
    #[arg(long)]
    no_auto_commit: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Insert a JSON object, optionally under a given id
    Insert {
        /// Record body, e.g. '{"name":"Ann"}'
        json: String,

        /// Explicit id (next free id when omitted)
        #[arg(long)]
        id: Option<String>,
    },

    /// Print a record by id
    Get {
        id: String,
    },

    /// Merge a JSON object into a record
    Update {
        id: String,
        json: String,
    },

    /// Delete a record by id
    Del {
        id: String,
    },

    /// Print every live record
    List,

    /// Scan for records whose field equals a JSON value
    Find {
        field: String,

        /// JSON literal ('31', '"Ann"', 'true'); bare words are taken as strings
        value: String,

        #[arg(long)]
        limit: Option<usize>,

        #[arg(long, default_value = "0")]
        offset: usize,

        /// Include superseded and deleted versions
        #[arg(long)]
        raw: bool,
    },

    /// Print the number of live records
    Count,

    /// Compact the data file
    Compact,

    /// Rebuild the index from the data file
    RebuildIndex,

    /// Copy the data file into the backup directory
    Backup,

    /// Print journal entries
    Log {
        #[arg(long)]
        limit: Option<usize>,

        #[arg(long, default_value = "0")]
        offset: usize,
    },

    /// Rotate the journal into the backup directory
    RotateLog,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,linedb=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = TableConfig::for_table(&args.dir, &args.table);
    config.auto_commit = !args.no_auto_commit;

    let engine = match TableEngine::open(config) {
        Ok(e) => e,
        Err(e) => {
            tracing::error!("Failed to open table: {}", e);
            std::process::exit(1);
        }
    };

    let outcome = run(&engine, args.command);
    let closed = engine.close();

    if let Err(e) = outcome.and(closed) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(engine: &TableEngine, command: Commands) -> Result<()> {
    match command {
        Commands::Insert { json, id } => {
            let data = parse_object(&json)?;
            match id {
                Some(id) => {
                    if engine.insert(&id, &data)? {
                        println!("{}", id);
                    } else {
                        println!("id {} already exists", id);
                    }
                }
                None => println!("{}", engine.insert_next(&data)?),
            }
        }
        Commands::Get { id } => match engine.select(&id)? {
            Some(record) => print_record(&record)?,
            None => println!("(not found)"),
        },
        Commands::Update { id, json } => {
            let data = parse_object(&json)?;
            println!("{}", engine.update(&id, &data)?);
        }
        Commands::Del { id } => println!("{}", engine.delete(&id)?),
        Commands::List => {
            for record in engine.select_all()? {
                print_record(&record)?;
            }
        }
        Commands::Find {
            field,
            value,
            limit,
            offset,
            raw,
        } => {
            let wanted = serde_json::from_str::<Value>(&value).unwrap_or(Value::String(value));
            let predicate = |record: &Record| record.get(&field) == Some(&wanted);
            let records = if raw {
                engine.find(predicate, limit, offset)?
            } else {
                engine.find_current(predicate, limit, offset)?
            };
            for record in records {
                print_record(&record)?;
            }
        }
        Commands::Count => println!("{}", engine.count()),
        Commands::Compact => {
            let outcome = engine.compact_table()?;
            println!(
                "scanned {} lines ({} unreadable), kept {} records, {} -> {} bytes (backup: {})",
                outcome.lines_scanned,
                outcome.lines_skipped,
                outcome.records_retained,
                outcome.bytes_before,
                outcome.bytes_after,
                outcome.backup_path.display()
            );
        }
        Commands::RebuildIndex => println!("{} records indexed", engine.rebuild_index()?),
        Commands::Backup => println!("{}", engine.backup()?.display()),
        Commands::Log { limit, offset } => {
            for entry in engine.read_log(limit, offset)? {
                println!("{}", serde_json::to_string(&entry)?);
            }
        }
        Commands::RotateLog => match engine.rotate_log()? {
            Some(path) => println!("{}", path.display()),
            None => println!("journal is empty, nothing to rotate"),
        },
    }

    Ok(())
}

fn parse_object(json: &str) -> Result<Record> {
    match serde_json::from_str::<Value>(json)? {
        Value::Object(map) => Ok(map),
        other => Err(LineDbError::Config(format!(
            "expected a JSON object, got {}",
            other
        ))),
    }
}

fn print_record(record: &Record) -> Result<()> {
    println!("{}", serde_json::to_string(record)?);
    Ok(())
}
