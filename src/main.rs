// MIT License - Copyright (c) 2026 Peter Wright
// Command-line client

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::{error, info, warn};

use eone_cloud::{
    Account, AlarmController, ClientConfig, EOneError, HttpTransport, LocaleMap, SessionManager,
};

/// Exit status of a run stopped by a fatal service error.
const EXIT_FATAL: i32 = 10;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "eone")]
#[command(about = "Control a Diagral e-ONE alarm through the vendor cloud")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "eone.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the armed state and armed groups
    Status,
    /// Arm every group
    Arm,
    /// Arm the given groups (1-8)
    ArmGroups {
        #[arg(required = true)]
        groups: Vec<u8>,
    },
    /// Arm the presence groups
    ArmPresence,
    /// Disarm everything
    Disarm,
    /// Print the event log as JSON
    Events {
        /// Start of the range, "YYYY-MM-DD HH:MM:SS"
        #[arg(long)]
        from: Option<String>,
        /// End of the range, "YYYY-MM-DD HH:MM:SS" (default: now)
        #[arg(long)]
        to: Option<String>,
    },
    /// List the installations of the account
    Systems,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Config {
    account: AccountToml,
    installation: InstallationToml,
    #[serde(default)]
    client: ClientToml,
}

#[derive(Deserialize)]
struct AccountToml {
    username: String,
    password: String,
}

impl std::fmt::Debug for AccountToml {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountToml")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct InstallationToml {
    /// Position of the installation in the account's system list
    #[serde(default)]
    system: usize,
    master_code: String,
    /// Vendor locale file used to render events
    #[serde(default)]
    locale: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct ClientToml {
    base_url: Option<String>,
    events_poll_attempts: Option<u32>,
    devices_poll_attempts: Option<u32>,
    poll_interval_ms: Option<u64>,
    request_timeout_secs: Option<u64>,
    max_connect_attempts: Option<u32>,
}

fn build_client_config(toml: &ClientToml) -> ClientConfig {
    let mut builder = ClientConfig::builder();
    if let Some(url) = &toml.base_url {
        builder = builder.base_url(url);
    }
    if let Some(n) = toml.events_poll_attempts {
        builder = builder.events_poll_attempts(n);
    }
    if let Some(n) = toml.devices_poll_attempts {
        builder = builder.devices_poll_attempts(n);
    }
    if let Some(ms) = toml.poll_interval_ms {
        builder = builder.poll_interval(Duration::from_millis(ms));
    }
    if let Some(secs) = toml.request_timeout_secs {
        builder = builder
            .request_timeout(Duration::from_secs(secs))
            .connect_timeout(Duration::from_secs(secs));
    }
    if let Some(n) = toml.max_connect_attempts {
        builder = builder.max_connect_attempts(n);
    }
    builder.build()
}

fn load_locale(path: Option<&PathBuf>) -> Result<LocaleMap> {
    let Some(path) = path else {
        warn!("No locale file configured; event texts will be empty");
        return Ok(LocaleMap::new());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read locale file {}", path.display()))?;
    let locale = LocaleMap::from_json_str(&text).context("Failed to parse locale file")?;
    info!("Loaded {} locale entries", locale.len());
    Ok(locale)
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

async fn run(cli: Cli) -> Result<()> {
    let config_text =
        std::fs::read_to_string(&cli.config).context("Failed to read config file")?;
    let config: Config = toml::from_str(&config_text).context("Failed to parse config file")?;

    let client_config = build_client_config(&config.client);
    let transport = HttpTransport::new(&client_config)?;
    let account = Account::new(config.account.username, config.account.password);
    let mut session = SessionManager::new(transport, client_config, account)?;

    session.login().await?;
    let systems = session.list_systems().await?;

    if let Command::Systems = cli.command {
        for (idx, system) in systems.iter().enumerate() {
            println!(
                "{}: {} (id {}, role {}, {})",
                idx,
                system.name.as_deref().unwrap_or("-"),
                system.id,
                system.role,
                if system.installation_complete { "complete" } else { "incomplete" }
            );
        }
        session.logout().await?;
        return Ok(());
    }

    session.select_system(config.installation.system)?;
    session.fetch_configuration().await?;
    session.connect(&config.installation.master_code).await?;

    let mut alarm = AlarmController::new(session);
    let outcome = perform(&mut alarm, cli.command, &config.installation).await;

    // Always release the transmitter session, even after a failed command
    if let Err(e) = alarm.session_mut().logout().await {
        warn!("Logout failed: {}", e);
    }
    outcome
}

async fn perform(
    alarm: &mut AlarmController<HttpTransport>,
    command: Command,
    installation: &InstallationToml,
) -> Result<()> {
    match command {
        Command::Status => {
            let status = alarm.get_status().await?;
            let groups = status.group_indices();
            let names = if groups.is_empty() {
                Vec::new()
            } else {
                alarm.group_names(&groups).await?
            };
            println!("{} {:?} {:?}", status.state, groups, names);
        }
        Command::Arm => alarm.arm_complete().await?,
        Command::ArmGroups { groups } => alarm.arm_partial(&groups).await?,
        Command::ArmPresence => {
            let groups = alarm.arm_presence().await?;
            println!("Armed presence groups {:?}", groups);
        }
        Command::Disarm => alarm.disarm_complete().await?,
        Command::Events { from, to } => {
            let locale = load_locale(installation.locale.as_ref())?;
            let events = alarm
                .events(&locale, from.as_deref(), to.as_deref())
                .await?;
            println!("{}", serde_json::to_string_pretty(&events)?);
        }
        Command::Systems => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG controls verbosity (e.g. RUST_LOG=debug or RUST_LOG=eone_cloud=trace).
    // Default: info.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // systemd journal already adds timestamps, so omit them when running under systemd
    if std::env::var_os("JOURNAL_STREAM").is_some() {
        tracing_subscriber::fmt().without_time().with_env_filter(env_filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => Ok(()),
        Err(e) => match e.downcast_ref::<EOneError>() {
            Some(fatal) if fatal.is_fatal() => {
                error!("{}", fatal);
                std::process::exit(EXIT_FATAL);
            }
            _ => Err(e),
        },
    }
}
