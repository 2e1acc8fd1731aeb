//! Consistency check between rendered word units and the timing index.
//!
//! A rendered word whose text disagrees with the timed word at its index
//! makes click-to-seek land on the wrong audio; a unit without an index is
//! not clickable at all. Both are reported here.

use crate::host::UnitId;
use crate::render_index::RenderIndex;
use crate::timing::TimingIndex;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use unicode_normalization::UnicodeNormalization;
use tracing::{info, warn};

static RE_EDGE_PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^[\p{P}\p{S}…\s]+|[\p{P}\p{S}…\s]+$"#).unwrap());
static RE_DASHES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\-‐-―]").unwrap());

const SPELLING_VARIANTS: &[(&str, &str)] = &[
    ("gray", "grey"),
    ("color", "colour"),
    ("center", "centre"),
    ("realize", "realise"),
    ("analyze", "analyse"),
];

/// Dead units listed individually beyond this count only go to the summary.
const DEAD_UNIT_WARN_THRESHOLD: usize = 10;

pub fn normalize_word(word: &str) -> String {
    let folded: String = word.nfkc().collect::<String>().to_lowercase();
    let trimmed = RE_EDGE_PUNCTUATION.replace_all(&folded, "");
    RE_DASHES.replace_all(&trimmed, "").into_owned()
}

/// Share of characters of `a` found in `b`, scaled over both lengths.
pub fn overlap_ratio(a: &str, b: &str) -> f64 {
    let a_len = a.chars().count();
    let b_len = b.chars().count();
    if a_len + b_len == 0 {
        return 1.0;
    }
    let common = a.chars().filter(|c| b.contains(*c)).count();
    (2.0 * common as f64) / (a_len + b_len) as f64
}

/// Tolerant comparison of two normalized words.
pub fn fuzzy_match(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a == b {
        return true;
    }
    if SPELLING_VARIANTS
        .iter()
        .any(|(x, y)| (a == *x && b == *y) || (a == *y && b == *x))
    {
        return true;
    }

    let a_len = a.chars().count();
    let b_len = b.chars().count();
    let longest = a_len.max(b_len) as f64;
    if (a_len as f64 - b_len as f64).abs() > longest * 0.3 {
        return false;
    }
    let threshold = if a_len.min(b_len) <= 4 { 0.9 } else { 0.75 };
    overlap_ratio(a, b) >= threshold
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mismatch {
    pub word: usize,
    pub unit: UnitId,
    pub rendered: String,
    pub timed: String,
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeadUnit {
    pub unit: UnitId,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncReport {
    pub chapter: u32,
    pub checked: usize,
    /// Bound units whose timed word carries no text.
    pub untexted: usize,
    pub dead_units: Vec<DeadUnit>,
    pub mismatches: Vec<Mismatch>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty() && self.dead_units.is_empty()
    }

    pub fn log_summary(&self) {
        if !self.mismatches.is_empty() {
            warn!(
                chapter = self.chapter,
                mismatches = self.mismatches.len(),
                checked = self.checked,
                "Rendered words disagree with timing; click-to-seek may land early or late"
            );
        }
        if self.dead_units.len() > DEAD_UNIT_WARN_THRESHOLD {
            warn!(
                chapter = self.chapter,
                dead_units = self.dead_units.len(),
                "Many rendered words are not clickable"
            );
        }
        if self.is_clean() {
            info!(chapter = self.chapter, checked = self.checked, "Word sync validated");
        }
    }

    /// Human-readable report, at most `limit` mismatches listed.
    pub fn render(&self, limit: usize) -> String {
        let mut out = String::new();
        let status = if self.is_clean() { "OK" } else { "WARNINGS" };
        out.push_str(&format!(
            "Chapter {}: {status} ({} checked, {} without text)\n",
            self.chapter, self.checked, self.untexted
        ));
        if !self.dead_units.is_empty() {
            out.push_str(&format!(
                "  {} words without data-i (not clickable)\n",
                self.dead_units.len()
            ));
        }
        for mismatch in self.mismatches.iter().take(limit) {
            out.push_str(&format!(
                "  MISMATCH at [{}]: rendered '{}' vs timed '{}' ({:.2})\n",
                mismatch.word, mismatch.rendered, mismatch.timed, mismatch.similarity
            ));
        }
        if self.mismatches.len() > limit {
            out.push_str(&format!(
                "  ... and {} more mismatches\n",
                self.mismatches.len() - limit
            ));
        }
        out
    }
}

pub fn check(timings: &TimingIndex, index: &RenderIndex) -> SyncReport {
    let mut report = SyncReport {
        chapter: timings.chapter(),
        ..SyncReport::default()
    };

    for unit in 0..index.unit_count() {
        let rendered = index.unit_text(unit).unwrap_or_default();
        let Some(word) = index.word_for_unit(unit) else {
            report.dead_units.push(DeadUnit {
                unit,
                text: rendered.to_string(),
            });
            continue;
        };
        let Some(timed) = timings.text_of(word) else {
            report.untexted += 1;
            continue;
        };

        report.checked += 1;
        let rendered_norm = normalize_word(rendered);
        let timed_norm = normalize_word(timed);
        if !fuzzy_match(&rendered_norm, &timed_norm) {
            report.mismatches.push(Mismatch {
                word,
                unit,
                rendered: rendered.to_string(),
                timed: timed.to_string(),
                similarity: (overlap_ratio(&rendered_norm, &timed_norm) * 100.0).round() / 100.0,
            });
        }
    }
    report
}
