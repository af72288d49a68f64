mod config;
mod host;
mod logging;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use rate_gate::{ChannelUiDispatcher, GateServices, RatingGate};
use rate_gate_core::{
    from_timestamp, Clock, ManualClock, NetworkReachability, PreferenceKeys, PromptChoice,
    SystemClock, UrlOpener,
};
use rate_gate_storage::SqlitePreferences;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

const UI_POLL: Duration = Duration::from_millis(20);

#[derive(Parser)]
#[command(name = "rate-gate")]
#[command(about = "Decide when to ask for an app store rating", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Config file (default: $XDG_CONFIG_HOME/rate-gate/config.toml)
    #[arg(long, global = true, env = "RATE_GATE_CONFIG")]
    config: Option<PathBuf>,
    /// SQLite preference database
    #[arg(long, global = true)]
    store: Option<PathBuf>,
    #[arg(long, global = true)]
    app_id: Option<u64>,
    #[arg(long, global = true)]
    app_name: Option<String>,
    #[arg(long, global = true)]
    app_version: Option<String>,
    /// Prompt on every call and log counter traces
    #[arg(long, global = true, default_value_t = false)]
    debug: bool,
    /// Treat the store as unreachable
    #[arg(long, global = true, default_value_t = false)]
    offline: bool,
    /// Print the review URL instead of opening it
    #[arg(long, global = true, default_value_t = false)]
    print_url: bool,
    /// Evaluate as of this RFC 3339 instant
    #[arg(long, global = true)]
    now: Option<DateTime<Utc>>,
}

#[derive(Subcommand)]
enum Commands {
    /// Count an app launch
    Launch {
        #[arg(long)]
        no_prompt: bool,
    },
    /// Count a return to the foreground
    Foreground {
        #[arg(long)]
        no_prompt: bool,
    },
    /// Count a significant event
    Event {
        #[arg(long)]
        no_prompt: bool,
    },
    /// Record an answer to the rating prompt
    Respond { choice: PromptChoice },
    /// Open the review page and stop asking for this version
    Rate,
    /// Show counters and whether the prompt would appear
    Status,
    /// Start a fresh tracking cycle for the running version
    Reset,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.debug);

    let config_path = cli.config.clone().unwrap_or_else(config::config_path);
    let mut file_config = config::load_config(&config_path)?;
    if cli.debug {
        file_config.rating.debug = Some(true);
    }
    if let Some(app_id) = cli.app_id {
        file_config.rating.app_id = Some(app_id);
    }
    if let Some(app_name) = cli.app_name.clone() {
        file_config.rating.app_name = Some(app_name);
    }

    let store_path = cli.store.clone().unwrap_or_else(|| file_config.store_path());
    if let Some(parent) = store_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let store = Arc::new(
        SqlitePreferences::open(&store_path)
            .with_context(|| format!("failed to open {}", store_path.display()))?,
    );

    let version = cli
        .app_version
        .clone()
        .or_else(|| file_config.app_version.clone())
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());
    let settings = file_config.rating.clone().into_settings("this app");
    let metadata = Arc::new(host::StaticMetadata {
        version,
        display_name: settings.app_name.clone(),
    });

    let reachability: Arc<dyn NetworkReachability> = if cli.offline {
        Arc::new(host::Offline)
    } else {
        Arc::new(host::TcpReachability {
            target: file_config.reachability_host().to_string(),
            timeout: Duration::from_millis(file_config.reachability_timeout_ms()),
        })
    };
    let opener: Arc<dyn UrlOpener> = if cli.print_url {
        Arc::new(host::PrintUrlOpener)
    } else {
        Arc::new(host::SystemUrlOpener)
    };
    let clock: Arc<dyn Clock> = match cli.now {
        Some(now) => Arc::new(ManualClock::new(now)),
        None => Arc::new(SystemClock),
    };

    let (dispatcher, ui_queue) = ChannelUiDispatcher::new();
    let gate = RatingGate::with_keys(
        settings,
        PreferenceKeys::with_prefix(file_config.key_prefix()),
        store,
        GateServices {
            metadata,
            reachability,
            prompt: Arc::new(host::TerminalPrompt),
            opener,
            ui: Arc::new(dispatcher),
            clock,
        },
    );

    match cli.command {
        Commands::Launch { no_prompt } => {
            let worker = gate.record_launch(!no_prompt)?;
            wait_for_worker(worker, &ui_queue)?;
            print_status(&gate)?;
        }
        Commands::Foreground { no_prompt } => {
            let worker = gate.record_foreground(!no_prompt)?;
            wait_for_worker(worker, &ui_queue)?;
            print_status(&gate)?;
        }
        Commands::Event { no_prompt } => {
            let worker = gate.record_significant_event(!no_prompt)?;
            wait_for_worker(worker, &ui_queue)?;
            print_status(&gate)?;
        }
        Commands::Respond { choice } => {
            gate.record_user_response(choice)?;
            println!("recorded: {choice}");
        }
        Commands::Rate => gate.rate_app()?,
        Commands::Status => print_status(&gate)?,
        Commands::Reset => {
            gate.reset_tracking()?;
            print_status(&gate)?;
        }
    }

    Ok(())
}

/// The main thread owns the terminal, so it runs prompt jobs while the
/// worker counts.
fn wait_for_worker(worker: JoinHandle<()>, ui_queue: &rate_gate::UiQueue) -> Result<()> {
    ui_queue.run_until(UI_POLL, || worker.is_finished());
    worker
        .join()
        .map_err(|_| anyhow::anyhow!("background worker panicked"))
}

fn print_status(gate: &RatingGate) -> Result<()> {
    let snapshot = gate.snapshot()?;
    let format_date = |seconds: f64| {
        from_timestamp(seconds)
            .map(|at| at.to_rfc3339())
            .unwrap_or_else(|| "never".to_string())
    };

    println!(
        "version: {}",
        snapshot.current_version.as_deref().unwrap_or("untracked")
    );
    println!("first use: {}", format_date(snapshot.first_use_date));
    println!(
        "uses: {}/{}",
        snapshot.use_count,
        gate.settings().uses_until_prompt
    );
    println!(
        "significant events: {}/{}",
        snapshot.significant_event_count,
        gate.settings().significant_events_until_prompt
    );
    println!("rated: {}", snapshot.rated_current_version);
    println!("declined: {}", snapshot.declined_to_rate);
    println!("reminder requested: {}", format_date(snapshot.reminder_request_date));

    match gate.unmet_condition()? {
        _ if gate.settings().debug => println!("eligible: yes (debug)"),
        None => println!("eligible: yes"),
        Some(reason) => println!("eligible: no ({reason})"),
    }
    Ok(())
}
