use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info};

use channelbus::cli::{Cli, Command};
use channelbus::config::Config;
use channelbus::{ChannelCatalog, ChannelDiagnostics, ChannelManifest, Environment, Inspector, KindRegistry, inspect};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Priority: CLI --log-level > config file > default (WARN)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to WARN", s);
                tracing::Level::WARN
            }
        },
        None => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    debug!("Logging initialized (level: {:?})", level);
    Ok(())
}

fn load_catalog(config: &Config) -> Result<ChannelCatalog> {
    let manifest = ChannelManifest::load(&config.manifest_path)
        .context(format!("Failed to load manifest from {}", config.manifest_path.display()))?;
    let catalog = ChannelCatalog::from_manifest(&manifest, KindRegistry::standard(), config.channel_options())?;
    Ok(catalog)
}

fn save_catalog(config: &Config, catalog: &ChannelCatalog) -> Result<()> {
    catalog
        .manifest()
        .save(&config.manifest_path)
        .context(format!("Failed to save manifest to {}", config.manifest_path.display()))?;
    Ok(())
}

fn print_diagnostics(diag: &ChannelDiagnostics) {
    println!("Channel: {}", diag.name.cyan());
    println!("  Id: {}", diag.id.to_string().dimmed());
    println!("  Payload: {}", diag.payload);
    println!("  State: {}", diag.lifecycle);
    println!("  Listeners: {}", diag.listener_count);
    match &diag.last_value {
        Some(value) => println!("  Last value: {}", value),
        None => println!("  Last value: {}", "(none)".dimmed()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;

    info!(manifest = %config.manifest_path.display(), "channelbus starting");

    match cli.command {
        Command::Kinds => {
            for kind in KindRegistry::standard().kinds() {
                println!("{:<10} {}", kind.id.yellow(), kind.payload);
            }
        }
        Command::List => {
            let catalog = load_catalog(&config)?;
            if catalog.is_empty() {
                println!("No channels found");
            } else {
                for info in catalog.list() {
                    println!("{} {}", info.name, info.kind.dimmed());
                }
            }
        }
        Command::Create { name, kind } => {
            let mut catalog = load_catalog(&config)?;
            catalog.create(&name, &kind)?;
            save_catalog(&config, &catalog)?;
            println!("{} Created channel: {} ({})", "✓".green(), name.cyan(), kind);
        }
        Command::Delete { name } => {
            let mut catalog = load_catalog(&config)?;
            catalog.delete(&name)?;
            save_catalog(&config, &catalog)?;
            println!("{} Deleted channel: {}", "✓".green(), name);
        }
        Command::Inspect { name } => {
            let catalog = load_catalog(&config)?;
            let env = Environment::new();
            catalog.activate_all(&env);

            let channel = catalog.get(&name)?;
            print_diagnostics(&inspect(channel.as_ref()));

            env.end_session();
        }
        Command::Raise { name, value } => {
            let catalog = load_catalog(&config)?;
            let env = Environment::new();
            catalog.activate_all(&env);

            let channel = catalog.get(&name)?;
            let mut inspector = Inspector::new();
            if let Some(input) = value {
                inspector.edit_scratch(channel.as_ref(), &input)?;
            }
            let raised = inspector.scratch_value(channel.as_ref());
            let report = inspector.raise_scratch(channel.as_ref())?;

            println!(
                "{} Raised {} with {} ({} invoked, {} failed, {} stale)",
                "✓".green(),
                name.cyan(),
                raised,
                report.invoked,
                report.failed,
                report.stale
            );
            print_diagnostics(&inspect(channel.as_ref()));

            env.end_session();
        }
    }

    Ok(())
}
