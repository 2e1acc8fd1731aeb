//! Binding of timing entries to rendered units and paragraphs.

use crate::host::{ParagraphId, TranscriptView, UnitId, UnitInfo};
use anyhow::{Result, bail};
use tracing::{debug, info, warn};

/// Static word-to-unit and unit-to-paragraph mappings for one session.
#[derive(Debug, Clone)]
pub struct RenderIndex {
    word_to_unit: Vec<Option<UnitId>>,
    unit_word: Vec<Option<usize>>,
    unit_paragraph: Vec<ParagraphId>,
    unit_text: Vec<String>,
    /// Bound units, in document order.
    bound: Vec<UnitId>,
    dead_units: usize,
    ignored_units: usize,
}

impl RenderIndex {
    pub fn build(units: Vec<UnitInfo>, word_count: usize) -> Result<Self> {
        let mut word_to_unit = vec![None; word_count];
        let mut unit_word = Vec::with_capacity(units.len());
        let mut unit_paragraph = Vec::with_capacity(units.len());
        let mut unit_text = Vec::with_capacity(units.len());
        let mut bound = Vec::new();
        let mut paragraphs: Vec<ParagraphId> = Vec::new();
        let mut dead_units = 0usize;
        let mut ignored_units = 0usize;
        let mut out_of_order = 0usize;
        let mut last_word: Option<usize> = None;

        for (unit, info) in units.into_iter().enumerate() {
            if paragraphs.last() != Some(&info.paragraph) && !paragraphs.contains(&info.paragraph) {
                paragraphs.push(info.paragraph);
            }
            unit_paragraph.push(info.paragraph);
            unit_text.push(info.text);

            let Some(word) = info.word_index else {
                dead_units += 1;
                unit_word.push(None);
                continue;
            };

            let slot = word_to_unit.get_mut(word);
            match slot {
                None => {
                    warn!(unit, word, word_count, "Ignoring unit beyond the timing index");
                    ignored_units += 1;
                    unit_word.push(None);
                }
                Some(Some(existing)) => {
                    warn!(unit, word, existing = *existing, "Ignoring duplicate unit for word");
                    ignored_units += 1;
                    unit_word.push(None);
                }
                Some(slot) => {
                    *slot = Some(unit);
                    if last_word.is_some_and(|last| word < last) {
                        out_of_order += 1;
                    }
                    last_word = Some(word);
                    bound.push(unit);
                    unit_word.push(Some(word));
                }
            }
        }

        if bound.is_empty() {
            bail!("no rendered units could be bound to timing entries");
        }
        if out_of_order > 0 {
            warn!(out_of_order, "Rendered units do not follow timing order");
        }
        if dead_units > 0 {
            debug!(dead_units, "Transcript contains units without timing");
        }
        let unbound_words = word_to_unit.iter().filter(|slot| slot.is_none()).count();
        info!(
            units = unit_word.len(),
            bound = bound.len(),
            dead_units,
            ignored_units,
            unbound_words,
            paragraphs = paragraphs.len(),
            "Built render index"
        );

        Ok(Self {
            word_to_unit,
            unit_word,
            unit_paragraph,
            unit_text,
            bound,
            dead_units,
            ignored_units,
        })
    }

    pub fn build_from_view(view: &dyn TranscriptView, word_count: usize) -> Result<Self> {
        Self::build(view.collect_units(), word_count)
    }

    pub fn unit_count(&self) -> usize {
        self.unit_word.len()
    }

    pub fn bound_count(&self) -> usize {
        self.bound.len()
    }

    pub fn dead_count(&self) -> usize {
        self.dead_units
    }

    pub fn ignored_count(&self) -> usize {
        self.ignored_units
    }

    pub fn unit_for_word(&self, word: usize) -> Option<UnitId> {
        self.word_to_unit.get(word).copied().flatten()
    }

    pub fn word_for_unit(&self, unit: UnitId) -> Option<usize> {
        self.unit_word.get(unit).copied().flatten()
    }

    pub fn paragraph_of_unit(&self, unit: UnitId) -> Option<ParagraphId> {
        self.unit_paragraph.get(unit).copied()
    }

    pub fn paragraph_for_word(&self, word: usize) -> Option<ParagraphId> {
        self.unit_for_word(word)
            .and_then(|unit| self.paragraph_of_unit(unit))
    }

    pub fn unit_text(&self, unit: UnitId) -> Option<&str> {
        self.unit_text.get(unit).map(String::as_str)
    }

    /// Word whose unit sits nearest to `focus_y` (viewport-relative), the
    /// first unit of its line when several share it.
    pub fn nearest_word(&self, view: &dyn TranscriptView, focus_y: f64) -> Option<usize> {
        let top_of = |unit: UnitId| view.unit_rect(unit).map(|rect| rect.top);

        let after = self
            .bound
            .partition_point(|&unit| top_of(unit).is_none_or(|top| top <= focus_y));
        let before = after.checked_sub(1);

        let distance = |pos: usize| -> Option<f64> {
            let rect = view.unit_rect(self.bound[pos])?;
            Some(if focus_y < rect.top {
                rect.top - focus_y
            } else if focus_y > rect.bottom {
                focus_y - rect.bottom
            } else {
                0.0
            })
        };

        let chosen = match (before, (after < self.bound.len()).then_some(after)) {
            (Some(b), Some(a)) => match (distance(b), distance(a)) {
                (Some(db), Some(da)) if da < db => a,
                (None, Some(_)) => a,
                _ => b,
            },
            (Some(b), None) => b,
            (None, Some(a)) => a,
            (None, None) => return None,
        };

        let line_top = top_of(self.bound[chosen])?;
        let first_on_line = self.bound[..=chosen]
            .partition_point(|&unit| top_of(unit).is_some_and(|top| top < line_top));
        self.word_for_unit(self.bound[first_on_line.min(chosen)])
    }
}
