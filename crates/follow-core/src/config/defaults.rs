pub(crate) fn default_transition_radius() -> usize {
    3
}

pub(crate) fn default_edge_margin_px() -> f64 {
    120.0
}

pub(crate) fn default_cooldown_ms() -> u64 {
    1500
}

pub(crate) fn default_hesitancy_ms() -> u64 {
    3000
}

pub(crate) fn default_anchor_fraction() -> f64 {
    0.35
}

pub(crate) fn default_scroll_duration_ms() -> u64 {
    800
}

pub(crate) fn default_min_scroll_distance_px() -> f64 {
    20.0
}

pub(crate) fn default_flash_ms() -> u64 {
    1200
}

pub(crate) fn default_click_pulse_ms() -> u64 {
    300
}

pub(crate) fn default_user_scroll_settle_ms() -> u64 {
    150
}

pub(crate) fn default_scroll_seek_debounce_ms() -> u64 {
    200
}

pub(crate) fn default_focus_fraction() -> f64 {
    0.40
}

pub(crate) fn default_words_dir() -> String {
    "js/words".to_string()
}

pub(crate) fn default_speech_start_tolerance_secs() -> f64 {
    0.0
}

pub(crate) fn default_log_level() -> crate::config::LogLevel {
    crate::config::LogLevel::Debug
}
