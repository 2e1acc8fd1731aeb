use serde::Deserialize;
use std::time::Duration;

/// Engine configuration; deserializable from the sectioned TOML layout.
#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct FollowConfig {
    #[serde(default = "crate::config::defaults::default_transition_radius")]
    pub transition_radius: usize,
    #[serde(default = "crate::config::defaults::default_edge_margin_px")]
    pub edge_margin_px: f64,
    #[serde(default = "crate::config::defaults::default_cooldown_ms")]
    pub cooldown_ms: u64,
    #[serde(default = "crate::config::defaults::default_hesitancy_ms")]
    pub hesitancy_ms: u64,
    #[serde(default = "crate::config::defaults::default_anchor_fraction")]
    pub anchor_fraction: f64,
    #[serde(default = "crate::config::defaults::default_scroll_duration_ms")]
    pub scroll_duration_ms: u64,
    #[serde(default = "crate::config::defaults::default_min_scroll_distance_px")]
    pub min_scroll_distance_px: f64,
    #[serde(default = "crate::config::defaults::default_flash_ms")]
    pub flash_ms: u64,
    #[serde(default = "crate::config::defaults::default_click_pulse_ms")]
    pub click_pulse_ms: u64,
    #[serde(default = "crate::config::defaults::default_user_scroll_settle_ms")]
    pub user_scroll_settle_ms: u64,
    #[serde(default = "crate::config::defaults::default_scroll_seek_debounce_ms")]
    pub scroll_seek_debounce_ms: u64,
    #[serde(default = "crate::config::defaults::default_focus_fraction")]
    pub focus_fraction: f64,
    #[serde(default = "crate::config::defaults::default_words_dir")]
    pub words_dir: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "crate::config::defaults::default_speech_start_tolerance_secs")]
    pub speech_start_tolerance_secs: f64,
    #[serde(default = "crate::config::defaults::default_log_level")]
    pub log_level: LogLevel,
}

impl Default for FollowConfig {
    fn default() -> Self {
        FollowConfig {
            transition_radius: crate::config::defaults::default_transition_radius(),
            edge_margin_px: crate::config::defaults::default_edge_margin_px(),
            cooldown_ms: crate::config::defaults::default_cooldown_ms(),
            hesitancy_ms: crate::config::defaults::default_hesitancy_ms(),
            anchor_fraction: crate::config::defaults::default_anchor_fraction(),
            scroll_duration_ms: crate::config::defaults::default_scroll_duration_ms(),
            min_scroll_distance_px: crate::config::defaults::default_min_scroll_distance_px(),
            flash_ms: crate::config::defaults::default_flash_ms(),
            click_pulse_ms: crate::config::defaults::default_click_pulse_ms(),
            user_scroll_settle_ms: crate::config::defaults::default_user_scroll_settle_ms(),
            scroll_seek_debounce_ms: crate::config::defaults::default_scroll_seek_debounce_ms(),
            focus_fraction: crate::config::defaults::default_focus_fraction(),
            words_dir: crate::config::defaults::default_words_dir(),
            base_url: None,
            speech_start_tolerance_secs:
                crate::config::defaults::default_speech_start_tolerance_secs(),
            log_level: crate::config::defaults::default_log_level(),
        }
    }
}

impl FollowConfig {
    /// Clamp every value into the range the engine can work with.
    pub fn sanitized(mut self) -> Self {
        let fraction = |value: f64, fallback: f64| {
            if value.is_finite() {
                value.clamp(0.0, 1.0)
            } else {
                fallback
            }
        };
        let length = |value: f64, fallback: f64| {
            if value.is_finite() {
                value.max(0.0)
            } else {
                fallback
            }
        };
        self.anchor_fraction = fraction(
            self.anchor_fraction,
            crate::config::defaults::default_anchor_fraction(),
        );
        self.focus_fraction = fraction(
            self.focus_fraction,
            crate::config::defaults::default_focus_fraction(),
        );
        self.edge_margin_px = length(
            self.edge_margin_px,
            crate::config::defaults::default_edge_margin_px(),
        );
        self.min_scroll_distance_px = length(
            self.min_scroll_distance_px,
            crate::config::defaults::default_min_scroll_distance_px(),
        );
        self.speech_start_tolerance_secs = length(self.speech_start_tolerance_secs, 0.0);
        self.base_url = self
            .base_url
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());
        self
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    /// Deference window after a user scroll: hesitancy on top of the cooldown.
    pub fn user_deference(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms.saturating_add(self.hesitancy_ms))
    }

    pub fn scroll_duration(&self) -> Duration {
        Duration::from_millis(self.scroll_duration_ms)
    }

    pub fn flash_duration(&self) -> Duration {
        Duration::from_millis(self.flash_ms)
    }

    pub fn click_pulse(&self) -> Duration {
        Duration::from_millis(self.click_pulse_ms)
    }

    pub fn user_scroll_settle(&self) -> Duration {
        Duration::from_millis(self.user_scroll_settle_ms)
    }

    pub fn scroll_seek_debounce(&self) -> Duration {
        Duration::from_millis(self.scroll_seek_debounce_ms)
    }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Debug
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
