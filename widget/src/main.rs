//! `feedback-widget` entry-point: loads settings, wires the Supabase adapters
//! and runs one command.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), forbid(clippy::expect_used))]

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::{Context, Result, eyre};
use mockable::DefaultClock;
use tokio::runtime::Builder;
use tracing::{debug, warn};
use tracing_subscriber::{EnvFilter, fmt};

use feedback_widget::app::{AppPorts, WidgetApp};
use feedback_widget::cli::{self, Cli};
use feedback_widget::domain::ports::UnsupportedScreenCapture;
use feedback_widget::outbound::local_store::FileLocalStore;
use feedback_widget::outbound::supabase::SupabaseConnector;
use feedback_widget::settings::WidgetSettings;

const SESSION_SETTLE: Duration = Duration::from_secs(5);

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Cli::parse();
    let settings = WidgetSettings::load_ambient()
        .map_err(|error| eyre!("failed to load settings: {error}"))?;
    init_tracing(args.json_logs || settings.json_logs());

    let runtime = Builder::new_multi_thread()
        .enable_all()
        .build()
        .wrap_err("failed to build Tokio runtime")?;
    runtime.block_on(async_main(args, settings))
}

fn init_tracing(json: bool) {
    let builder = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr);
    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(error) = installed {
        warn!(%error, "tracing init failed");
    }
}

async fn async_main(args: Cli, settings: WidgetSettings) -> Result<()> {
    let store_path = args.store.clone().unwrap_or_else(|| settings.store_path());
    let store = Arc::new(
        FileLocalStore::new(&store_path)
            .with_context(|| format!("failed to open local store at {}", store_path.display()))?,
    );
    debug!(path = %store_path.display(), "local store opened");
    let clock = Arc::new(DefaultClock);
    let connector = Arc::new(SupabaseConnector::new(
        settings.supabase_options(),
        store.clone(),
        clock.clone(),
    ));

    let app = WidgetApp::new(AppPorts {
        local_store: store,
        connector,
        capture: Arc::new(UnsupportedScreenCapture),
        clock,
    });
    app.settle_session(SESSION_SETTLE).await;

    let mut stdout = io::stdout().lock();
    cli::run(&app, args.command, &mut stdout).await?;
    stdout.flush()?;
    Ok(())
}
