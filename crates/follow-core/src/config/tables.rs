use super::defaults;
use super::models::{FollowConfig, LogLevel};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize, serde::Serialize)]
pub(super) struct ConfigTables {
    #[serde(default)]
    highlight: HighlightConfig,
    #[serde(default)]
    autoscroll: AutoscrollConfig,
    #[serde(default)]
    interaction: InteractionConfig,
    #[serde(default)]
    timing: TimingConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

impl From<ConfigTables> for FollowConfig {
    fn from(tables: ConfigTables) -> Self {
        FollowConfig {
            transition_radius: tables.highlight.transition_radius,
            edge_margin_px: tables.autoscroll.edge_margin_px,
            cooldown_ms: tables.autoscroll.cooldown_ms,
            hesitancy_ms: tables.autoscroll.hesitancy_ms,
            anchor_fraction: tables.autoscroll.anchor_fraction,
            scroll_duration_ms: tables.autoscroll.duration_ms,
            min_scroll_distance_px: tables.autoscroll.min_distance_px,
            flash_ms: tables.autoscroll.flash_ms,
            click_pulse_ms: tables.interaction.click_pulse_ms,
            user_scroll_settle_ms: tables.interaction.user_scroll_settle_ms,
            scroll_seek_debounce_ms: tables.interaction.scroll_seek_debounce_ms,
            focus_fraction: tables.interaction.focus_fraction,
            words_dir: tables.timing.words_dir,
            base_url: tables.timing.base_url,
            speech_start_tolerance_secs: tables.timing.speech_start_tolerance_secs,
            log_level: tables.logging.log_level,
        }
    }
}

impl From<&FollowConfig> for ConfigTables {
    fn from(config: &FollowConfig) -> Self {
        ConfigTables {
            highlight: HighlightConfig {
                transition_radius: config.transition_radius,
            },
            autoscroll: AutoscrollConfig {
                edge_margin_px: config.edge_margin_px,
                cooldown_ms: config.cooldown_ms,
                hesitancy_ms: config.hesitancy_ms,
                anchor_fraction: config.anchor_fraction,
                duration_ms: config.scroll_duration_ms,
                min_distance_px: config.min_scroll_distance_px,
                flash_ms: config.flash_ms,
            },
            interaction: InteractionConfig {
                click_pulse_ms: config.click_pulse_ms,
                user_scroll_settle_ms: config.user_scroll_settle_ms,
                scroll_seek_debounce_ms: config.scroll_seek_debounce_ms,
                focus_fraction: config.focus_fraction,
            },
            timing: TimingConfig {
                words_dir: config.words_dir.clone(),
                base_url: config.base_url.clone(),
                speech_start_tolerance_secs: config.speech_start_tolerance_secs,
            },
            logging: LoggingConfig {
                log_level: config.log_level,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct HighlightConfig {
    #[serde(default = "defaults::default_transition_radius")]
    transition_radius: usize,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        HighlightConfig {
            transition_radius: defaults::default_transition_radius(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct AutoscrollConfig {
    #[serde(default = "defaults::default_edge_margin_px")]
    edge_margin_px: f64,
    #[serde(default = "defaults::default_cooldown_ms")]
    cooldown_ms: u64,
    #[serde(default = "defaults::default_hesitancy_ms")]
    hesitancy_ms: u64,
    #[serde(default = "defaults::default_anchor_fraction")]
    anchor_fraction: f64,
    #[serde(default = "defaults::default_scroll_duration_ms")]
    duration_ms: u64,
    #[serde(default = "defaults::default_min_scroll_distance_px")]
    min_distance_px: f64,
    #[serde(default = "defaults::default_flash_ms")]
    flash_ms: u64,
}

impl Default for AutoscrollConfig {
    fn default() -> Self {
        AutoscrollConfig {
            edge_margin_px: defaults::default_edge_margin_px(),
            cooldown_ms: defaults::default_cooldown_ms(),
            hesitancy_ms: defaults::default_hesitancy_ms(),
            anchor_fraction: defaults::default_anchor_fraction(),
            duration_ms: defaults::default_scroll_duration_ms(),
            min_distance_px: defaults::default_min_scroll_distance_px(),
            flash_ms: defaults::default_flash_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct InteractionConfig {
    #[serde(default = "defaults::default_click_pulse_ms")]
    click_pulse_ms: u64,
    #[serde(default = "defaults::default_user_scroll_settle_ms")]
    user_scroll_settle_ms: u64,
    #[serde(default = "defaults::default_scroll_seek_debounce_ms")]
    scroll_seek_debounce_ms: u64,
    #[serde(default = "defaults::default_focus_fraction")]
    focus_fraction: f64,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        InteractionConfig {
            click_pulse_ms: defaults::default_click_pulse_ms(),
            user_scroll_settle_ms: defaults::default_user_scroll_settle_ms(),
            scroll_seek_debounce_ms: defaults::default_scroll_seek_debounce_ms(),
            focus_fraction: defaults::default_focus_fraction(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct TimingConfig {
    #[serde(default = "defaults::default_words_dir")]
    words_dir: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    base_url: Option<String>,
    #[serde(default = "defaults::default_speech_start_tolerance_secs")]
    speech_start_tolerance_secs: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            words_dir: defaults::default_words_dir(),
            base_url: None,
            speech_start_tolerance_secs: defaults::default_speech_start_tolerance_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LoggingConfig {
    #[serde(default = "defaults::default_log_level")]
    log_level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_level: defaults::default_log_level(),
        }
    }
}
