//! Terminal UI for spoon
//!
//! A thin shell over [`spoon_app::Session`] that provides terminal-specific
//! I/O. Room and message state lives in the shared
//! [`Store`](spoon_store::Store); this crate reads it and draws.
//!
//! # Components
//!
//! - [`Config`]: TOML file, `SPOON_*` environment and flag merging
//! - [`View`]: focus, room cursor and input line, with key routing
//! - [`ui`]: pure ratatui rendering of store and view
//! - [`Runtime`]: crossterm event loop and redraw task

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod input;
pub mod logging;
pub mod runtime;
pub mod ui;
pub mod view;

pub use config::{Config, ConfigError, Overrides};
pub use input::{InputState, KeyInput};
pub use runtime::{Account, Runtime, RuntimeError};
pub use view::{Focus, UiAction, View};
