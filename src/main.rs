use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use ruta::command::{index_name_for, CreateIndexes, Document, IndexModel, IndexOptions, Namespace, Renderable};
use ruta::config::{Config, ConfigError};
use ruta::selection::{Mode, ReadPreference, ServerSelector, TagSet};
use ruta::utils::format_duration;
use ruta::TopologySnapshot;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ruta")]
#[command(about = "Server selection and command construction core for MongoDB clients")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "Ruta Team")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which members of a topology are eligible under a read preference
    Select {
        /// Topology snapshot file (TOML)
        #[arg(short, long)]
        topology: PathBuf,
        /// Read preference mode (primary, primaryPreferred, secondary, secondaryPreferred, nearest)
        #[arg(short, long, default_value = "primary")]
        mode: String,
        /// Tag set as key=value pairs; repeat for fallbacks, in order
        #[arg(long = "tags")]
        tag_sets: Vec<String>,
        /// Maximum replication lag in seconds
        #[arg(long)]
        max_staleness_secs: Option<u64>,
        /// Optional configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Render a createIndexes command document
    CreateIndex {
        /// Target namespace as database.collection
        #[arg(short, long)]
        namespace: String,
        /// Key field with direction, e.g. foo:1 or loc:2dsphere; repeatable
        #[arg(short, long = "key", required = true)]
        keys: Vec<String>,
        /// Index name; generated from the key when omitted
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        unique: bool,
        #[arg(long)]
        sparse: bool,
    },
    /// Generate an example configuration file
    Config {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Validate configuration file
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show version information
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Select {
            topology,
            mode,
            tag_sets,
            max_staleness_secs,
            config,
        } => {
            let config = match config {
                Some(path) => Config::load_from_file(&path)
                    .with_context(|| format!("Failed to load config from {:?}", path))?,
                None => Config::default(),
            };
            init_logging(&config)?;
            run_select(&config, topology, &mode, &tag_sets, max_staleness_secs)?;
        }
        Commands::CreateIndex {
            namespace,
            keys,
            name,
            unique,
            sparse,
        } => {
            render_create_index(&namespace, &keys, name, unique, sparse)?;
        }
        Commands::Config { output } => {
            generate_config(output)?;
        }
        Commands::Validate { config } => {
            validate_config(config)?;
        }
        Commands::Version => {
            show_version();
        }
    }

    Ok(())
}

fn run_select(
    config: &Config,
    topology_path: PathBuf,
    mode: &str,
    tag_sets: &[String],
    max_staleness_secs: Option<u64>,
) -> anyhow::Result<()> {
    let snapshot = TopologySnapshot::load_from_file(&topology_path)
        .with_context(|| format!("Failed to load topology from {:?}", topology_path))?;

    let mode: Mode = mode.parse()?;
    let tag_sets = tag_sets
        .iter()
        .map(|raw| raw.parse::<TagSet>())
        .collect::<Result<Vec<_>, _>>()?;
    let preference = ReadPreference::new(mode, tag_sets, max_staleness_secs.map(Duration::from_secs))?;

    let selector = ServerSelector::from_config(&config.selection);
    info!(
        "Selecting from {} topology with {} members, read preference {}, window {}",
        snapshot.kind(),
        snapshot.members().len(),
        preference,
        format_duration(selector.local_threshold())
    );

    let eligible = selector.select(&snapshot, &preference);
    if eligible.is_empty() {
        println!("No eligible members for {}", preference);
    } else {
        println!("Eligible members for {}:", preference);
        for (i, member) in eligible.iter().enumerate() {
            println!(
                "  {}: {} ({}, rtt {})",
                i + 1,
                member.address(),
                member.role,
                format_duration(member.round_trip_time)
            );
        }
    }
    println!("Routing document: {}", preference.to_routing_document());

    Ok(())
}

fn render_create_index(
    namespace: &str,
    keys: &[String],
    name: Option<String>,
    unique: bool,
    sparse: bool,
) -> anyhow::Result<()> {
    let namespace: Namespace = namespace.parse()?;

    let mut key = Document::new();
    for raw in keys {
        let Some((field, direction)) = raw.split_once(':') else {
            bail!("Invalid key '{}': expected field:direction", raw);
        };
        let direction = match direction.parse::<i64>() {
            Ok(n) => Value::from(n),
            Err(_) => Value::String(direction.to_string()),
        };
        key.insert(field.to_string(), direction);
    }

    let name = name.unwrap_or_else(|| index_name_for(&key));
    let options = IndexOptions {
        unique: unique.then_some(true),
        sparse: sparse.then_some(true),
        ..IndexOptions::default()
    };
    let command = CreateIndexes::new(namespace, vec![IndexModel::new(key, name).options(options)]);

    let rendered = command.render()?;
    println!("{}", serde_json::to_string_pretty(&rendered)?);
    Ok(())
}

fn generate_config(output: PathBuf) -> anyhow::Result<()> {
    println!("Generating configuration file: {:?}", output);

    Config::create_example_config(&output).context("Failed to generate config")?;

    println!("Configuration file generated successfully!");
    println!("Edit the file to match your environment and run:");
    println!("  ruta select --config {:?} --topology <snapshot.toml>", output);

    Ok(())
}

fn validate_config(config_path: PathBuf) -> anyhow::Result<()> {
    println!("Validating configuration file: {:?}", config_path);

    match Config::load_from_file(&config_path) {
        Ok(config) => {
            println!("✓ Configuration file is valid");
            println!("  Local threshold: {} ms", config.selection.local_threshold_ms);
            println!(
                "  Server selection timeout: {} ms",
                config.selection.server_selection_timeout_ms
            );
            println!("  Poll interval: {} ms", config.selection.poll_interval_ms);
            println!("  Logging: {} ({})", config.logging.level, config.logging.format);
        }
        Err(e) => {
            eprintln!("✗ Configuration file validation failed:");
            match &e {
                ConfigError::IoError(msg) => eprintln!("  File error: {}", msg),
                ConfigError::ParseError(msg) => eprintln!("  Parse error: {}", msg),
                ConfigError::ValidationError(msg) => eprintln!("  Validation error: {}", msg),
                ConfigError::SerializeError(msg) => eprintln!("  Serialization error: {}", msg),
            }
            return Err(e.into());
        }
    }

    Ok(())
}

fn show_version() {
    println!("ruta v{}", env!("CARGO_PKG_VERSION"));
    println!("Server selection and command construction core for MongoDB clients");
    println!();
    println!("Target: {}", std::env::consts::ARCH);
    println!();
    println!("Features:");
    println!("  • Read preference modes with tag sets and max staleness");
    println!("  • Latency-window server selection over immutable topology snapshots");
    println!("  • createIndexes, insert, update, delete and findAndModify command building");
}

fn init_logging(config: &Config) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if config.logging.format == "json" {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = result {
        bail!("Failed to initialize logging: {}", e);
    }

    info!("Logging initialized at level: {}", config.logging.level);
    Ok(())
}
