//! spoon entry point.
//!
//! # Usage
//!
//! ```bash
//! # Credentials from ~/.config/spoon/config.toml or SPOON_USER/SPOON_PASSWORD
//! spoon --homeserver https://matrix.example.org --user alice
//!
//! # Throwaway session without a state cache
//! spoon --no-cache
//! ```

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use spoon_app::{RenderNotifier, Session, shutdown_signal};
use spoon_matrix::MatrixTransport;
use spoon_store::{DiskSnapshotStore, NullSnapshotStore, SnapshotStore, Store};
use spoon_tui::{Account, Config, Overrides, Runtime, logging};
use tokio_util::sync::CancellationToken;

/// Terminal chat client for Matrix
#[derive(Parser, Debug)]
#[command(name = "spoon")]
#[command(about = "Terminal chat client for Matrix homeservers")]
#[command(version)]
struct Args {
    /// Config file (defaults to <config dir>/spoon/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Homeserver base URL
    #[arg(long)]
    homeserver: Option<String>,

    /// Account localpart or user ID
    #[arg(short, long)]
    user: Option<String>,

    /// Snapshot file for cached rooms and messages
    #[arg(long)]
    state_file: Option<PathBuf>,

    /// Log file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Do not read or write the state cache
    #[arg(long)]
    no_cache: bool,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            homeserver: self.homeserver.clone(),
            user: self.user.clone(),
            state_file: self.state_file.clone(),
            log_file: self.log_file.clone(),
            log_level: self.log_level.clone(),
            no_cache: self.no_cache,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    config.apply_env(|name| std::env::var(name).ok())?;
    config.apply_overrides(&args.overrides());
    let credentials = config.credentials()?;

    logging::init(&config.log_path(), &config.log_level)?;
    tracing::info!(homeserver = %credentials.homeserver, cache = config.cache, "spoon starting");

    let snapshots: Arc<dyn SnapshotStore> = if config.cache {
        Arc::new(DiskSnapshotStore::new(config.state_path()))
    } else {
        Arc::new(NullSnapshotStore)
    };

    let notifier = RenderNotifier::new();
    let transport = Arc::new(MatrixTransport::new()?);
    let session = Arc::new(Session::new(transport, Store::new(), snapshots, notifier.clone()));

    session.restore();
    let login = session.login(&credentials).await?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            shutdown_signal().await;
            cancel.cancel();
        }
    });

    let sync = tokio::spawn({
        let session = Arc::clone(&session);
        let cancel = cancel.clone();
        async move { session.run(cancel).await }
    });

    let account = Account { user_id: login.user_id, homeserver: credentials.homeserver };
    let ui_result = match Runtime::new(Arc::clone(&session), notifier, account) {
        Ok(runtime) => runtime.run(cancel.clone()).await,
        Err(e) => Err(e),
    };

    // The sync task writes the final snapshot before it returns.
    cancel.cancel();
    let sync_result = sync.await?;
    tracing::info!("spoon stopped");

    ui_result?;
    sync_result?;
    Ok(())
}
