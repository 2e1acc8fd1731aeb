//! Synchronized read-along engine.
//!
//! Binds a chapter's word-timing index to a playing audio track and a
//! rendered transcript: words dim as they are spoken, the page follows the
//! narration, and clicks or paused scrolling seek the audio.

pub mod config;
pub mod engine;
pub mod headless;
pub mod host;
pub mod render_index;
pub mod scheduling;
pub mod sync_check;
pub mod timing;

pub use config::{FollowConfig, LogLevel};
pub use engine::{FollowEngine, FollowMode, FollowOptions, FollowSnapshot};
pub use host::{AudioElement, HostEvent, TranscriptView};
pub use timing::{TimingIndex, TimingSource, WordEntry};
