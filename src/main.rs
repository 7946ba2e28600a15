//! pushcount CLI - runs the background worker and a page controller in one
//! process and drives them from stdin.
//!
//! See the `pushcount` library for the core functionality.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use pushcount::env::Environment;
use pushcount::notifications::{SubscriptionApi, VapidPublicKey};
use pushcount::page::PagePlatform;
use pushcount::platform::{
    ConsoleBadge, ConsoleHost, FixedPermission, InProcessRegistrar, LocalPushManager, Permission,
};
use pushcount::worker::{NotificationOptions, PushOutcome};
use pushcount::{Config, CounterStore, FileCounterStore, PageController, Visibility};

/// Global allocator configured per M-MIMALLOC-APPS guideline.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[command(name = "pushcount")]
#[command(version)]
#[command(about = "Push notification worker with a synchronized unread counter")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a worker and a page, reading events from stdin
    Run {
        /// URL of the simulated page
        #[arg(long, default_value = "http://localhost/")]
        page_url: String,
        /// Answer to the notification permission prompt (granted, denied, default)
        #[arg(long, default_value = "granted")]
        permission: String,
    },
    /// Print the persisted notification count
    Count,
    /// Persist a notification count of zero
    Reset,
}

const HELP: &str = "\
Commands:
  {\"title\": ..., \"option\": {...}}   deliver a push payload
  visible | hidden                   change page visibility
  click [tag]                        click a notification
  subscribe | unsubscribe            toggle the push subscription
  status                             show page and counter state
  quit                               exit";

#[tokio::main]
async fn main() -> Result<()> {
    let environment = Environment::current();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(environment.default_log_filter()),
    )
    .format_timestamp_secs()
    .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let data_dir = config.resolved_data_dir()?;
    log::debug!(
        "Starting pushcount ({environment}), data in {}",
        data_dir.display()
    );

    match cli.command {
        Commands::Run {
            page_url,
            permission,
        } => run(&config, FileCounterStore::new(data_dir), &page_url, &permission).await,
        Commands::Count => {
            let count = FileCounterStore::new(data_dir).get().await?;
            println!("{count}");
            Ok(())
        }
        Commands::Reset => {
            FileCounterStore::new(data_dir).set(0).await?;
            println!("0");
            Ok(())
        }
    }
}

async fn run(config: &Config, store: FileCounterStore, page_url: &str, permission: &str) -> Result<()> {
    let permission: Permission = permission.parse()?;
    let server_key = VapidPublicKey::from_base64url(&config.vapid_public_key)
        .context("Configured VAPID public key is invalid")?;

    let registrar = Arc::new(InProcessRegistrar::new(
        Arc::new(store),
        Arc::new(ConsoleHost),
        config.notification_target_url.clone(),
    ));
    let platform = PagePlatform {
        registrar: registrar.clone(),
        push: Arc::new(LocalPushManager::default()),
        permissions: Arc::new(FixedPermission(permission)),
        badge: Arc::new(ConsoleBadge),
        api: SubscriptionApi::new(config.api_url.clone())?,
    };
    log::debug!("Subscription changes are posted to {}", platform.api.api_url());

    let mut page = PageController::new(platform, page_url, server_key);
    if let Err(e) = page.load().await {
        eprintln!("{e}");
    }
    println!("{}", page.ui());
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (command, arg) = line
            .split_once(char::is_whitespace)
            .map_or((line, None), |(c, a)| (c, Some(a.trim())));

        match command {
            _ if line.starts_with('{') => match registrar.active().await {
                Some(worker) => match worker.push(line).await {
                    Ok(PushOutcome::Skipped) => println!("Push ignored (malformed payload)"),
                    Ok(PushOutcome::Handled { count, .. }) => {
                        log::debug!("Push handled, count {count:?}");
                    }
                    Err(e) => log::error!("Push not delivered: {e:#}"),
                },
                None => println!("No worker registered"),
            },
            "visible" => page.on_visibility_change(Visibility::Visible).await,
            "hidden" => page.on_visibility_change(Visibility::Hidden).await,
            "click" => match registrar.active().await {
                Some(worker) => {
                    let notification = pushcount::worker::Notification {
                        title: "notification".into(),
                        options: NotificationOptions {
                            tag: arg.map(str::to_string),
                            ..NotificationOptions::default()
                        },
                        timestamp: chrono::Utc::now(),
                    };
                    if let Err(e) = worker.notification_click(notification).await {
                        log::error!("Click not delivered: {e:#}");
                    }
                }
                None => println!("No worker registered"),
            },
            "subscribe" => {
                if let Err(e) = page.subscribe().await {
                    println!("{e}");
                }
            }
            "unsubscribe" => {
                if let Err(e) = page.unsubscribe().await {
                    println!("{e}");
                }
            }
            "status" => {
                println!("state: {}", page.state());
                if let Some(worker) = page.worker() {
                    match worker.count().await {
                        Ok(count) => println!("persisted count: {count}"),
                        Err(e) => log::error!("Failed to read persisted count: {e:#}"),
                    }
                }
            }
            "quit" | "exit" => break,
            "help" => println!("{HELP}"),
            other => println!("Unknown command: {other}"),
        }

        if let Some(worker) = page.worker() {
            if let Err(e) = worker.sync().await {
                log::error!("Worker did not settle: {e:#}");
            }
        }
        page.pump_messages().await;
        println!("{}", page.ui());
    }

    page.settle_background_requests().await;
    if let Some(worker) = registrar.active().await {
        worker.shutdown().await?;
    }
    Ok(())
}
