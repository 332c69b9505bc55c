use anyhow::{Context, Result};
use asa_provider::asa::http::format_asa_error;
use asa_provider::config::ProviderConfig;
use asa_provider::resource::{dispatch, Operation, ResourceKind};
use asa_provider::VERSION;
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Manage ASA projects, sudo entitlements and their assignments
#[derive(Parser, Debug)]
#[command(name = "asa", version = VERSION, about, long_about = None)]
struct Args {
    /// ASA team (overrides OKTAASA_TEAM and the config file)
    #[arg(short, long, global = true)]
    team: Option<String>,

    /// API base URL (overrides OKTAASA_API_URL and the config file)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a resource from a state file
    Create(StateArgs),
    /// Refresh a resource's state from the API
    Read(StateArgs),
    /// Push a resource's attributes to the API
    Update(StateArgs),
    /// Delete a resource
    Delete(StateArgs),
    /// Import an existing resource by id
    Import {
        /// Resource type, e.g. oktaasa_project
        resource_type: String,
        /// Resource id (project name, entitlement id or project/group/sudo_id)
        id: String,
    },
    /// List supported resource types
    Resources,
    /// Save the team and API URL to the config file
    Configure,
}

#[derive(ClapArgs, Debug)]
struct StateArgs {
    /// Resource type, e.g. oktaasa_sudo_entitlement
    resource_type: String,

    /// YAML or JSON state file (`id` plus attributes)
    #[arg(short, long)]
    file: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {:?}", log_path))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("asa {} started with log level: {:?}", VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("asa").join("asa.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".asa").join("asa.log");
    }
    PathBuf::from("asa.log")
}

fn read_state(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read state file {:?}", path))?;
    // YAML is a superset of JSON, so this covers both formats
    serde_yaml::from_str(&content).with_context(|| format!("Failed to parse state file {:?}", path))
}

fn parse_kind(resource_type: &str) -> Result<ResourceKind> {
    resource_type.parse::<ResourceKind>().map_err(|e| {
        let known: Vec<_> = ResourceKind::all().iter().map(|k| k.type_name()).collect();
        anyhow::anyhow!("{}. Known types: {}", e, known.join(", "))
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_guard = setup_logging(args.log_level)?;

    let mut config = ProviderConfig::load();
    if let Some(team) = args.team {
        config.team = Some(team);
    }
    if let Some(api_url) = args.api_url {
        config.api_url = Some(api_url);
    }

    let (kind, operation, state) = match args.command {
        Command::Resources => {
            for kind in ResourceKind::all() {
                println!("{kind}");
            }
            return Ok(());
        }
        Command::Configure => {
            config.team()?;
            let path = config.save()?;
            println!("Saved configuration to {}", path.display());
            return Ok(());
        }
        Command::Create(state) => (
            parse_kind(&state.resource_type)?,
            Operation::Create,
            read_state(&state.file)?,
        ),
        Command::Read(state) => (
            parse_kind(&state.resource_type)?,
            Operation::Read,
            read_state(&state.file)?,
        ),
        Command::Update(state) => (
            parse_kind(&state.resource_type)?,
            Operation::Update,
            read_state(&state.file)?,
        ),
        Command::Delete(state) => (
            parse_kind(&state.resource_type)?,
            Operation::Delete,
            read_state(&state.file)?,
        ),
        Command::Import { resource_type, id } => {
            (parse_kind(&resource_type)?, Operation::Import, serde_json::json!({ "id": id }))
        }
    };

    let client = config.client()?;
    tracing::info!("Using team: {}, API: {}", client.team(), config.api_url());

    match dispatch(&client, kind, operation, state).await {
        Ok(state) => {
            println!("{}", serde_json::to_string_pretty(&state)?);
            Ok(())
        }
        Err(err) => {
            tracing::error!("{} {:?} failed: {}", kind, operation, err);
            eprintln!("Error: {}", format_asa_error(&err));
            drop(log_guard);
            std::process::exit(1);
        }
    }
}
