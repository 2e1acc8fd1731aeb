use super::lifecycle::FollowMode;
use serde::Serialize;
use std::fs;
use std::path::Path;
use ts_rs::TS;

/// Engine state as a host UI would render it.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct FollowSnapshot {
    pub chapter: Option<u32>,
    pub available: bool,
    pub mode: FollowMode,
    pub polling: bool,
    pub current_word: Option<usize>,
    pub current_paragraph: Option<usize>,
    pub word_count: usize,
    pub bound_units: usize,
    pub dead_units: usize,
    pub autoscrolling: bool,
    pub autoscrolls_started: u32,
}

impl FollowSnapshot {
    pub(crate) fn unavailable() -> Self {
        Self {
            chapter: None,
            available: false,
            mode: FollowMode::Disabled,
            polling: false,
            current_word: None,
            current_paragraph: None,
            word_count: 0,
            bound_units: 0,
            dead_units: 0,
            autoscrolling: false,
            autoscrolls_started: 0,
        }
    }
}

fn export_single_type<T: TS + 'static>(out_dir: &Path) -> anyhow::Result<()> {
    T::export_all_to(out_dir).map_err(|err| anyhow::anyhow!("exporting {}: {err}", T::name()))
}

/// Regenerate the TypeScript declarations for host-facing types in `out_dir`.
pub fn export_ts_bindings(out_dir: &Path) -> anyhow::Result<()> {
    use anyhow::Context;

    fs::create_dir_all(out_dir).with_context(|| format!("creating {}", out_dir.display()))?;
    for entry in fs::read_dir(out_dir).with_context(|| format!("listing {}", out_dir.display()))? {
        let path = entry.context("reading binding directory entry")?.path();
        if path.extension().and_then(|ext| ext.to_str()) == Some("ts") {
            fs::remove_file(&path).with_context(|| format!("removing {}", path.display()))?;
        }
    }

    export_single_type::<FollowMode>(out_dir)?;
    export_single_type::<FollowSnapshot>(out_dir)?;
    Ok(())
}
