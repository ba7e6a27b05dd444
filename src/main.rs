//! # BillNudge: billing reminder engine
//!
//! Sends scheduled and automated payment reminders over SMS/WhatsApp.
//!
//! Usage:
//!   billnudge init                        # Write a default config file
//!   billnudge run --demo --dry-run        # Run the scheduler with sample data, no real sends
//!   billnudge send --phone 0712345678 --message "Hello"
//!   billnudge balance                     # Show gateway credit balance
//!   billnudge preview                     # Render the built-in templates for the demo clients

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use billnudge_channels::{DryRunGateway, FluxSmsGateway};
use billnudge_core::{
    BillNudgeConfig, Channel, MessageGateway, MessageKind, NewReminder, ReminderChannel,
    ReminderConditions, ReminderSchedule, TimeOfDay,
};
use billnudge_scheduler::SchedulerEngine;
use billnudge_store::ReminderStore;
use billnudge_store::seed::{DEFAULT_TEMPLATES, demo_clients};

#[derive(Parser)]
#[command(
    name = "billnudge",
    version,
    about = "📨 BillNudge — scheduled and automated billing reminders"
)]
struct Cli {
    /// Config file (defaults to ~/.billnudge/config.toml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Run the scheduler until Ctrl-C
    Run {
        /// Seed demo clients and an overdue reminder rule
        #[arg(long)]
        demo: bool,
        /// Log sends instead of calling the gateway
        #[arg(long)]
        dry_run: bool,
    },
    /// Send a single message right away
    Send {
        #[arg(long)]
        phone: String,
        #[arg(long)]
        message: String,
        /// sms or whatsapp
        #[arg(long, default_value = "sms")]
        channel: String,
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the gateway account balance
    Balance,
    /// Render the built-in templates for the demo clients
    Preview,
}

fn expand_path(p: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(p).to_string())
}

fn load_config(path: Option<&PathBuf>) -> Result<BillNudgeConfig> {
    let config = match path {
        Some(path) => BillNudgeConfig::load_from(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => BillNudgeConfig::load()?,
    };
    Ok(config)
}

fn build_gateway(config: &BillNudgeConfig, dry_run: bool) -> Result<Arc<dyn MessageGateway>> {
    if dry_run {
        tracing::info!("🧪 Dry run: messages are logged, not sent");
        return Ok(Arc::new(DryRunGateway::new()));
    }
    if config.gateway.api_key.is_empty() {
        anyhow::bail!(
            "no gateway API key configured; set [gateway].api_key or {}",
            billnudge_core::config::API_KEY_ENV
        );
    }
    Ok(Arc::new(FluxSmsGateway::new(config.gateway.clone())?))
}

fn seed_demo(store: &mut ReminderStore) -> Result<()> {
    for client in demo_clients() {
        store.add_client(client)?;
    }
    let (_, _, overdue_text) = DEFAULT_TEMPLATES[2];
    store.add_reminder(NewReminder {
        name: "Morning overdue notice".into(),
        kind: MessageKind::Dunning,
        channel: ReminderChannel::Sms,
        template: overdue_text.into(),
        enabled: true,
        schedule: ReminderSchedule::daily(TimeOfDay::new(9, 0).context("09:00")?),
        conditions: Some(ReminderConditions {
            min_balance: Some(1.0),
            max_balance: None,
            client_status: None,
        }),
    })?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "billnudge=debug,billnudge_scheduler=debug,billnudge_channels=debug"
    } else {
        "billnudge=info,billnudge_scheduler=info,billnudge_channels=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let config_path = cli.config.as_deref().map(expand_path);

    match cli.command {
        Commands::Init { force } => {
            let path = config_path.unwrap_or_else(BillNudgeConfig::default_path);
            if path.exists() && !force {
                println!("⚠️  {} already exists (use --force to overwrite)", path.display());
                return Ok(());
            }
            BillNudgeConfig::default().save_to(&path)?;
            println!("✅ Config written to {}", path.display());
        }

        Commands::Run { demo, dry_run } => {
            let config = load_config(config_path.as_ref())?;
            let gateway = build_gateway(&config, dry_run)?;

            let mut store = ReminderStore::with_default_templates();
            if demo {
                seed_demo(&mut store)?;
            }
            let store = store.into_shared();

            println!("📨 BillNudge v{}", env!("CARGO_PKG_VERSION"));
            println!("   📡 Gateway:   {}", gateway.name());
            println!("   ⏱️  Tick:      every {}s", config.scheduler.tick_interval_secs);
            println!("   🌍 UTC offset: {} min", config.scheduler.utc_offset_minutes);
            println!();

            let mut engine = SchedulerEngine::new(store.clone(), gateway, &config);
            engine.start();

            tokio::signal::ctrl_c().await?;
            tracing::info!("🛑 Ctrl-C received, shutting down");
            engine.shutdown().await;

            let stats = store.lock().await.stats().clone();
            println!(
                "📊 {} tick(s): {} sent, {} failed, {} pending, {} scheduled ({:.1}% success)",
                engine.ticks_completed(),
                stats.messages_sent,
                stats.messages_failed,
                stats.messages_pending,
                stats.messages_scheduled,
                stats.success_percent()
            );
        }

        Commands::Send {
            phone,
            message,
            channel,
            dry_run,
        } => {
            let channel: Channel = channel.parse()?;
            if message.trim().is_empty() {
                anyhow::bail!("message content is required");
            }
            let config = load_config(config_path.as_ref())?;
            let gateway = build_gateway(&config, dry_run)?;
            let outcome = gateway.send(&phone, &message, channel).await;
            if outcome.success {
                println!(
                    "✅ Sent via {} (id: {})",
                    channel,
                    outcome.message_id.as_deref().unwrap_or("-")
                );
            } else {
                anyhow::bail!(
                    "send failed: {}",
                    outcome.error.unwrap_or_else(|| "unknown error".into())
                );
            }
        }

        Commands::Balance => {
            let config = load_config(config_path.as_ref())?;
            let gateway = build_gateway(&config, false)?;
            let report = gateway.check_balance().await;
            match report.error {
                Some(err) => anyhow::bail!("balance check failed: {err}"),
                None => println!("💰 Balance: {}", report.balance),
            }
        }

        Commands::Preview => {
            let config = load_config(config_path.as_ref())?;
            let now = chrono::Utc::now().with_timezone(&config.scheduler.offset());
            let due = billnudge_scheduler::template::due_date_from(now, config.automation.due_in_days);

            let mut store = ReminderStore::with_default_templates();
            for client in demo_clients() {
                store.add_client(client)?;
            }
            for template in store.templates() {
                println!("📝 {} ({}) vars: {}", template.name, template.kind, template.variables.join(", "));
                for client in store.clients() {
                    let text = billnudge_scheduler::template::render_with_due_date(&template.content, client, due);
                    println!("   → {}: {}", client.name, text);
                }
                println!();
            }
        }
    }

    Ok(())
}
