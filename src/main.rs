//! Relay operator console.
//!
//! Monitors the pump-discover relay, edits its configuration and makes
//! changes take effect.
//!
//! # Architecture Overview
//!
//! ```text
//!     operator ──► CLI (main.rs) ──► Console
//!                                      │
//!        ┌──────────────┬──────────────┼────────────────┬───────────────┐
//!        ▼              ▼              ▼                ▼               ▼
//!   ConfigStore    RelayClient   ServiceController  LogRetriever  DatabaseProbe
//!   config.toml    /health          │        │          │             Postgres
//!   + .env         /metrics         ▼        ▼          │
//!                  /reload-config  Docker   compose ◄───┘
//!                  /logs           socket   CLI
//! ```
//!
//! Every network or process call carries a deadline; nothing is retried.

use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use relay_console::config::{load_settings, ConfigSource, RelayConfig, SaveReport};
use relay_console::probe::{metrics, HealthSnapshot};
use relay_console::{observability, Console, ControlState};

#[derive(Parser)]
#[command(name = "relay-console")]
#[command(version, about = "Operator console for the pump-discover relay", long_about = None)]
struct Cli {
    /// Console settings file (TOML). Defaults apply when omitted.
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Debug logging (overridden by RUST_LOG).
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Relay health
    Status,
    /// Relay metrics
    Metrics {
        /// Print every parsed sample instead of the summary
        #[arg(long)]
        raw: bool,
    },
    /// Show or edit the relay configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Ask the relay to reload its configuration
    Reload,
    /// Restart the relay container (direct mode)
    Restart,
    /// Make the saved configuration take effect (reload or restart)
    Apply,
    /// Recent relay logs, newest first
    Logs {
        #[arg(short = 'n', long)]
        lines: Option<u32>,
    },
    /// Check database connectivity and tables
    DbCheck,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the current configuration
    Show,
    /// Set KEY=VALUE and save
    Set {
        #[arg(value_name = "KEY=VALUE", required = true)]
        assignments: Vec<String>,
    },
    /// Restore defaults and save
    Reset,
    /// Validate the stored configuration
    Validate,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    observability::init(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Failures are returned, never printed here; `main` reports them once.
async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let settings = load_settings(cli.settings.as_deref())?;
    tracing::debug!(
        mode = %settings.mode,
        relay = %settings.relay_url(),
        document = %settings.document_path.display(),
        "Settings loaded"
    );

    let mut console = Console::new(settings)?;

    match cli.command {
        Commands::Status => {
            let health = console
                .health()
                .await
                .map_err(|e| format!("Relay unreachable: {}", e))?;
            print_health(&health);
        }
        Commands::Metrics { raw } => {
            let (_, snapshot) = console.metrics().await?;
            if raw {
                for (name, value) in snapshot.iter() {
                    println!("{} {}", name, value);
                }
            } else {
                println!("Coins received:   {}", snapshot.coins_received());
                println!("Coins sent:       {}", snapshot.coins_sent());
                println!("Coins filtered:   {}", snapshot.coins_filtered());
                println!("Batches sent:     {}", snapshot.batches_sent());
                println!("Buffer size:      {}", snapshot.buffer_size());
                println!("WS reconnects:    {}", snapshot.ws_reconnects());
                println!("WS connected:     {}", yes_no(snapshot.ws_connected()));
                println!("n8n available:    {}", yes_no(snapshot.n8n_available()));
                if snapshot.get(metrics::COINS_RECEIVED).is_none() {
                    println!("(relay exposes no pumpfun metrics yet)");
                }
            }
        }
        Commands::Config { action } => run_config(&console, action)?,
        Commands::Reload => finish(console.reload().await)?,
        Commands::Restart => finish(console.restart().await)?,
        Commands::Apply => finish(console.apply().await)?,
        Commands::Logs { lines } => println!("{}", console.logs(lines).await),
        Commands::DbCheck => {
            let status = console.check_database().await;
            println!("Configured: {}", yes_no(status.configured));
            println!("Connected:  {}", yes_no(status.connected));
            for (table, present) in &status.tables {
                println!("  {:<18} {}", table, if *present { "present" } else { "missing" });
            }
            if let Some(error) = &status.error {
                println!("Error: {}", error);
            }
        }
    }

    Ok(())
}

fn run_config(console: &Console, action: ConfigAction) -> Result<(), Box<dyn Error>> {
    match action {
        ConfigAction::Show => {
            let (config, source) = console.load_config();
            print_config(&config, &source);
        }
        ConfigAction::Set { assignments } => {
            let pairs = parse_assignments(&assignments)?;
            let report = console.set_values(pairs.iter().copied())?;
            for (key, _) in &pairs {
                println!("{} updated", key);
            }
            print_save_report(&report);
        }
        ConfigAction::Reset => {
            let report = console.reset_config()?;
            println!("Configuration reset to defaults");
            print_save_report(&report);
        }
        ConfigAction::Validate => match console.validate_stored() {
            Ok(()) => println!("Configuration is valid"),
            Err(errors) => {
                for error in &errors {
                    println!("  {}", error);
                }
                return Err(format!("{} invalid field(s)", errors.len()).into());
            }
        },
    }
    Ok(())
}

/// Split every `KEY=VALUE` before anything is applied.
fn parse_assignments(assignments: &[String]) -> Result<Vec<(&str, &str)>, String> {
    assignments
        .iter()
        .map(|assignment| {
            assignment
                .split_once('=')
                .map(|(key, value)| (key.trim(), value))
                .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", assignment))
        })
        .collect()
}

fn finish(state: ControlState) -> Result<(), Box<dyn Error>> {
    if state.is_success() {
        println!("{}", state.message().unwrap_or_default());
        Ok(())
    } else {
        Err(state.to_string().into())
    }
}

fn print_health(health: &HealthSnapshot) {
    println!("WebSocket:        {}", if health.ws_connected { "connected" } else { "disconnected" });
    println!("n8n:              {}", if health.n8n_available { "available" } else { "unavailable" });
    println!("Uptime:           {}", health.uptime_display());
    println!("Coins:            {}", health.total_coins);
    println!("Batches:          {}", health.total_batches);
    println!("Reconnects:       {}", health.reconnect_count);
    if let Some(ago) = health.last_message_ago {
        println!("Last message:     {}s ago", ago);
    }
    if let Some(ago) = health.last_coin_ago {
        println!("Last coin:        {}s ago", ago);
    }
    if let Some(error) = &health.last_error {
        println!("Last error:       {}", error);
    }
}

fn print_config(config: &RelayConfig, source: &ConfigSource) {
    println!("# source: {}", source);
    for (key, value) in config.iter() {
        if key == "DB_PASSWORD" && !value.is_unset() {
            println!("{} = ********", key);
        } else {
            println!("{} = {}", key, value);
        }
    }
}

fn print_save_report(report: &SaveReport) {
    println!("Saved {}", report.document.display());
    match &report.env_file {
        Ok(path) => println!("Env file written to {}", path.display()),
        Err(warning) => println!("Warning: {}", warning),
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignments_rejects_before_applying() {
        let args = vec!["BATCH_SIZE=5".to_string(), "WS_URI=wss://a/b?x=1".to_string()];
        assert_eq!(
            parse_assignments(&args).unwrap(),
            vec![("BATCH_SIZE", "5"), ("WS_URI", "wss://a/b?x=1")]
        );

        let args = vec!["BATCH_SIZE=5".to_string(), "oops".to_string()];
        assert!(parse_assignments(&args).unwrap_err().contains("oops"));
    }

    #[test]
    fn test_failed_state_is_returned_not_printed() {
        let err = finish(ControlState::ReloadFailed("HTTP 500".into())).unwrap_err();
        assert_eq!(err.to_string(), "reload failed: HTTP 500");
        assert!(finish(ControlState::Reloaded("ok".into())).is_ok());
    }
}
