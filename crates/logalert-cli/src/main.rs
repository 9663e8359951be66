// logalert - scheduled log alerting for Elasticsearch / OpenSearch

use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};
use logalert_core::Rule;
use logalert_engine::config::{load_config, AlertConfig};
use logalert_engine::schedule::{resolve_timezone, RuleSchedule};
use logalert_engine::{build_backend, build_notifiers, load_rules, AlertEngine, Scheduler};
use std::collections::HashSet;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "./config/logalert.toml";

#[derive(Parser)]
#[command(name = "logalert")]
#[command(version = "0.1.0")]
#[command(about = "Scheduled log alerting for Elasticsearch / OpenSearch", long_about = None)]
struct Cli {
    /// Config file (or set LOGALERT_CONFIG env var)
    #[arg(short, long, env = "LOGALERT_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log level or filter directive, overrides the config file
    #[arg(short = 'l', long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Evaluate rules on their schedules until SIGINT/SIGTERM (default)
    Run,

    /// Check config and rules, print the rule table and exit
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)?;
    config.validate()?;
    init_tracing(cli.log_level.as_deref().unwrap_or(&config.logging.level));

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(config).await,
        Commands::Validate => validate(&config),
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(config: AlertConfig) -> Result<(), Box<dyn Error>> {
    let rules = load_rules(&config.rules.directory)?;
    info!(
        count = rules.len(),
        dir = %config.rules.directory.display(),
        "rules loaded"
    );

    let backend = build_backend(&config.backend)?;
    let notifiers = build_notifiers(&config.notifications)?;
    let channels: Vec<&str> = notifiers.iter().map(|n| n.name()).collect();
    info!(provider = backend.provider(), channels = ?channels, "engine ready");

    let engine = Arc::new(AlertEngine::from_config(&config, rules, backend, notifiers));
    let scheduler = Scheduler::new(engine).with_shutdown_timeout(config.scheduler.shutdown_timeout());
    scheduler.start()?;

    shutdown_signal().await;
    info!("shutdown signal received, stopping scheduler");
    if !scheduler.stop().await {
        warn!("exiting with evaluations still in flight");
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "install ctrl-c handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn validate(config: &AlertConfig) -> Result<(), Box<dyn Error>> {
    let rules = load_rules(&config.rules.directory)?;
    let notifiers = build_notifiers(&config.notifications)?;
    let registered: HashSet<&str> = notifiers.iter().map(|n| n.name()).collect();

    let tz = resolve_timezone(&config.scheduler.timezone);
    let now = Utc::now().with_timezone(&tz);

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        "Rule", "Severity", "Index", "Schedule", "Window", "Threshold", "Channels", "Next run",
    ]);

    let mut invalid = 0;
    for rule in &rules {
        let next_run = match RuleSchedule::parse(&rule.name, &rule.cron) {
            Ok(schedule) => schedule
                .next_after(&now)
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string()),
            Err(e) => {
                invalid += 1;
                println!("{} {}", "Error:".red().bold(), e);
                "invalid".red().to_string()
            }
        };

        for channel in unknown_channels(rule, &registered) {
            println!(
                "{} rule '{}' names channel '{}' which is not configured",
                "Warning:".yellow().bold(),
                rule.name,
                channel
            );
        }

        table.add_row(vec![
            rule.name.clone(),
            rule.severity().to_string(),
            rule.index.clone(),
            rule.cron.clone(),
            rule.time_window.clone(),
            rule.threshold
                .count_gt
                .map(|n| format!("> {}", n))
                .unwrap_or_else(|| "-".to_string()),
            rule.alerts.channels.join(", "),
            next_run,
        ]);
    }

    println!("{table}");
    println!(
        "{} rule(s) from {} (timezone {})",
        rules.len(),
        config.rules.directory.display(),
        tz.name()
    );

    if invalid > 0 {
        return Err(format!("{} rule(s) have an invalid schedule", invalid).into());
    }
    println!("{}", "Configuration OK".green().bold());
    Ok(())
}

fn unknown_channels<'a>(rule: &'a Rule, registered: &HashSet<&str>) -> Vec<&'a str> {
    rule.alerts
        .channels
        .iter()
        .map(String::as_str)
        .filter(|c| !registered.contains(c))
        .collect()
}
