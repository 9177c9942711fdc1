//! Log subscriber setup.
//!
//! The terminal belongs to the UI, so logs go to a file. `RUST_LOG` wins over
//! the configured level.

#![allow(clippy::disallowed_types, reason = "fmt layer writer requires a std Mutex")]

use std::{fs, path::Path, sync::Mutex};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::runtime::RuntimeError;

/// Install the global subscriber, appending to `path`.
pub fn init(path: &Path, default_level: &str) -> Result<(), RuntimeError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = fs::OpenOptions::new().create(true).append(true).open(path)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .with(filter)
        .try_init()
        .map_err(|e| RuntimeError::Logging(e.to_string()))
}
