//! Command-line demo for the feature toggle client.
//!
//! With no subcommand it fetches the active toggles for a package and prints
//! the seasonal greeting of each one it recognises. The subcommands list,
//! create and delete toggles so the demo can be seeded against the mock
//! server.

mod greeting;

use std::sync::mpsc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use feature_toggle_core::config::{BASE_URL_ENV, DEFAULT_BASE_URL};
use feature_toggle_core::{Completion, Config, FeatureToggle, FeatureToggleItem};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::greeting::greeting_for;

#[derive(Parser)]
#[command(name = "feature-toggle-demo")]
#[command(version, about = "Show seasonal greetings driven by remote feature toggles", long_about = None)]
struct Cli {
    /// Base URL of the feature toggle service.
    #[arg(long, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Package name the toggles belong to.
    #[arg(long, env = "FEATURE_TOGGLE_PACKAGE", default_value = "com.example.featuretoggledemoapp")]
    package: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print greetings for the active seasonal toggles (default).
    Greet,
    /// List every toggle of the package.
    List,
    /// Create a toggle.
    Create {
        name: String,
        /// Start of the active window, `YYYY-MM-DD HH:MM:SS`.
        beginning_date: String,
        /// End of the active window, `YYYY-MM-DD HH:MM:SS`.
        expiration_date: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Delete one toggle by id.
    Delete { id: String },
}

/// Dispatch one call and block until its completion handler fires.
fn wait<T: Send + 'static>(call: impl FnOnce(Option<Completion<T>>)) -> Result<T> {
    let (tx, rx) = mpsc::channel();
    let handler: Completion<T> = Box::new(move |outcome| {
        let _ = tx.send(outcome);
    });
    call(Some(handler));
    rx.recv()
        .context("completion handler dropped")?
        .map_err(|e| anyhow!(e))
}

fn greet(ft: &FeatureToggle, package: &str) -> Result<()> {
    let active = wait(|h| ft.get_active_features(package, h)).map_err(|e| {
        eprintln!("Failed to fetch features");
        e
    })?;
    debug!(count = active.len(), "active features fetched");

    let mut shown = 0;
    for feature in &active {
        match feature.id.as_deref().and_then(greeting_for) {
            Some(greeting) => {
                println!("[{}] {}", greeting.color, greeting.text);
                shown += 1;
            }
            None => debug!(name = feature.name.as_deref().unwrap_or("-"), "unknown feature"),
        }
    }
    if shown == 0 {
        println!("No seasonal features are active.");
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .compact()
        .init();

    let cli = Cli::parse();
    info!(base_url = %cli.base_url, package = %cli.package, "using feature toggle service");
    let ft = FeatureToggle::from_config(&Config::new(cli.base_url.as_str()))?;
    let package = cli.package.as_str();

    match cli.command.unwrap_or(Command::Greet) {
        Command::Greet => greet(&ft, package)?,
        Command::List => {
            let toggles = wait(|h| ft.get_all_features(package, h))?;
            if toggles.is_empty() {
                println!("No feature toggles for {package}.");
            }
            for toggle in toggles {
                println!("id: {}\n{toggle}", toggle.id.as_deref().unwrap_or("-"));
            }
        }
        Command::Create {
            name,
            beginning_date,
            expiration_date,
            description,
        } => {
            let item = FeatureToggleItem::new(name, description, beginning_date, expiration_date);
            println!("{}", wait(|h| ft.create_feature_toggle(package, item, h))?);
        }
        Command::Delete { id } => {
            println!("{}", wait(|h| ft.delete_feature_toggle(package, &id, h))?);
        }
    }
    Ok(())
}
