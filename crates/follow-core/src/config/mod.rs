//! Configuration loading for the follow-along engine.
//!
//! All tunable constants live here and are loaded from `conf/config.toml` if
//! present. Any missing or invalid entries fall back to defaults so the
//! engine can always bind.

mod defaults;
mod io;
mod models;
mod tables;

pub use io::{load_config, parse_config, serialize_config};
pub use models::{FollowConfig, LogLevel};
