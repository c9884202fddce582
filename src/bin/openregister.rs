//! OpenRegister CLI
//!
//! Lists registers and prints records as JSON.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use openregister::config::CacheKind;
use openregister::{ClientConfig, Derived, PageFormat, Record, RegisterClient};
use serde_json::{json, Map, Value};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "openregister")]
#[command(about = "Read registers and their records")]
struct Cli {
    /// Config file
    #[arg(short, long)]
    config: Option<String>,

    /// Phase tag (alpha, beta, discovery)
    #[arg(long, conflicts_with = "base_url")]
    phase: Option<String>,

    /// Base-URL template containing "register"
    #[arg(long)]
    base_url: Option<String>,

    /// Request JSON pages instead of TSV
    #[arg(long)]
    json: bool,

    /// Cache raw pages in this directory
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all registers
    Registers,

    /// Show one register and its fields
    Register {
        code: String,
    },

    /// List the records of a register
    Records {
        register: String,
        /// Follow pagination to the last page
        #[arg(long)]
        all: bool,
        #[arg(long)]
        page_size: Option<usize>,
    },

    /// Show one record
    Record {
        register: String,
        key: String,
        /// Replace references with the records they point to
        #[arg(long)]
        resolve: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = ClientConfig::load_from(cli.config.as_deref()).context("loading configuration")?;
    if cli.phase.is_some() || cli.base_url.is_some() {
        config.endpoint.phase = cli.phase;
        config.endpoint.base_url = cli.base_url;
    }
    if cli.json {
        config.fetch.format = PageFormat::Json;
    }
    if let Some(dir) = cli.cache_dir {
        config.cache.kind = CacheKind::Disk;
        config.cache.dir = Some(dir);
    }

    let locator = config.locator()?;
    let client = RegisterClient::from_config(&config)?;

    let output = match cli.command {
        Commands::Registers => {
            let registers = client.registers(&locator)?;
            Value::Array(
                registers
                    .iter()
                    .map(|register| {
                        json!({
                            "register": register.code(),
                            "uri": register.uri(),
                            "phase": register.phase(),
                            "text": register.text(),
                        })
                    })
                    .collect(),
            )
        }

        Commands::Register { code } => {
            let Some(register) = client.register(&code, &locator)? else {
                bail!("register '{}' not found at {}", code, locator);
            };
            let fields = register.fields()?;
            json!({
                "register": register.code(),
                "uri": register.uri(),
                "registry": register.registry(),
                "phase": register.phase(),
                "text": register.text(),
                "fields": fields.iter().map(|field| &**field).collect::<Vec<_>>(),
            })
        }

        Commands::Records {
            register,
            all,
            page_size,
        } => {
            let page_size = page_size.unwrap_or(config.fetch.page_size);
            let records = client.records_for(&register, &locator, all, page_size)?;
            serde_json::to_value(records.iter().map(|r| &**r).collect::<Vec<_>>())?
        }

        Commands::Record {
            register,
            key,
            resolve,
        } => {
            let Some(record) = client.record(&register, &key, &locator)? else {
                bail!("no record '{}' in register '{}'", key, register);
            };
            if resolve {
                resolved_json(&record)?
            } else {
                serde_json::to_value(&*record)?
            }
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Record as JSON with one level of references replaced by their targets
fn resolved_json(record: &Record) -> anyhow::Result<Value> {
    let mut object = Map::new();
    for name in record.attribute_names() {
        let value = match record.resolve(name)? {
            Some(Derived::Text(text)) => json!(text),
            Some(Derived::List(tokens)) => json!(tokens),
            Some(Derived::Record(linked)) => serde_json::to_value(linked.map(|r| &**r))?,
            Some(Derived::Records(linked)) => {
                serde_json::to_value(linked.iter().map(|r| &**r).collect::<Vec<_>>())?
            }
            None => Value::Null,
        };
        object.insert(name.to_string(), value);
    }
    Ok(Value::Object(object))
}
