use crate::host::{ParagraphClass, ParagraphId, TranscriptView, UnitClass};
use crate::render_index::RenderIndex;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum WordTag {
    #[default]
    Unmarked,
    Read,
    Transitional,
    Active,
}

impl WordTag {
    fn class(self) -> Option<UnitClass> {
        match self {
            WordTag::Unmarked => None,
            WordTag::Read => Some(UnitClass::Read),
            WordTag::Transitional => Some(UnitClass::Transitional),
            WordTag::Active => Some(UnitClass::Active),
        }
    }
}

/// Three-tier word dimming plus the single active paragraph.
///
/// Tags are tracked per word so the host only sees writes for units whose
/// tag actually changes.
#[derive(Debug)]
pub(crate) struct HighlightRenderer {
    radius: usize,
    tags: Vec<WordTag>,
    /// Exclusive bound of every word that may carry a tag.
    tagged_until: usize,
    current: Option<usize>,
    paragraph: Option<ParagraphId>,
}

impl HighlightRenderer {
    pub(crate) fn new(word_count: usize, radius: usize) -> Self {
        Self {
            radius,
            tags: vec![WordTag::Unmarked; word_count],
            tagged_until: 0,
            current: None,
            paragraph: None,
        }
    }

    pub(crate) fn current(&self) -> Option<usize> {
        self.current
    }

    pub(crate) fn paragraph(&self) -> Option<ParagraphId> {
        self.paragraph
    }

    #[cfg(test)]
    pub(crate) fn tag_of(&self, word: usize) -> WordTag {
        self.tags.get(word).copied().unwrap_or_default()
    }

    /// Move the highlight to `target`. Returns `false` when nothing was done.
    pub(crate) fn update(
        &mut self,
        index: &RenderIndex,
        view: &mut dyn TranscriptView,
        target: Option<usize>,
        force: bool,
    ) -> bool {
        let target = target.filter(|word| *word < self.tags.len());
        if target == self.current && !force {
            return false;
        }

        let moved_back = match (self.current, target) {
            (Some(previous), Some(next)) => next < previous,
            (Some(_), None) => true,
            _ => false,
        };

        let mut from = match self.current {
            Some(previous) => previous.saturating_sub(self.radius),
            None => 0,
        };
        if force || moved_back {
            self.clear_tags(index, view);
            from = 0;
        }

        if let Some(center) = target {
            let lo = center.saturating_sub(self.radius);
            let hi = center.saturating_add(self.radius).min(self.tags.len() - 1);
            for word in from..=hi {
                let tag = if word == center {
                    WordTag::Active
                } else if word < lo {
                    WordTag::Read
                } else {
                    WordTag::Transitional
                };
                self.set_tag(index, view, word, tag);
            }
            self.tagged_until = self.tagged_until.max(hi + 1);
        }

        trace!(previous = ?self.current, current = ?target, force, "Highlight moved");
        self.current = target;
        let paragraph = target.and_then(|word| index.paragraph_for_word(word));
        self.switch_paragraph(view, paragraph);
        true
    }

    /// Tag the whole transcript as read and drop the active word.
    pub(crate) fn mark_all_read(&mut self, index: &RenderIndex, view: &mut dyn TranscriptView) {
        for word in 0..self.tags.len() {
            self.set_tag(index, view, word, WordTag::Read);
        }
        self.tagged_until = self.tags.len();
        self.current = None;
        self.switch_paragraph(view, None);
    }

    /// Remove every class this renderer applied.
    pub(crate) fn clear_everything(&mut self, index: &RenderIndex, view: &mut dyn TranscriptView) {
        self.clear_tags(index, view);
        self.current = None;
        self.switch_paragraph(view, None);
    }

    fn clear_tags(&mut self, index: &RenderIndex, view: &mut dyn TranscriptView) {
        for word in 0..self.tagged_until {
            self.set_tag(index, view, word, WordTag::Unmarked);
        }
        self.tagged_until = 0;
    }

    fn set_tag(
        &mut self,
        index: &RenderIndex,
        view: &mut dyn TranscriptView,
        word: usize,
        tag: WordTag,
    ) {
        let Some(slot) = self.tags.get_mut(word) else {
            return;
        };
        let previous = std::mem::replace(slot, tag);
        if previous == tag {
            return;
        }
        let Some(unit) = index.unit_for_word(word) else {
            return;
        };
        if let Some(class) = previous.class() {
            view.set_unit_class(unit, class, false);
        }
        if let Some(class) = tag.class() {
            view.set_unit_class(unit, class, true);
        }
    }

    fn switch_paragraph(&mut self, view: &mut dyn TranscriptView, next: Option<ParagraphId>) {
        if self.paragraph == next {
            return;
        }
        if let Some(previous) = self.paragraph {
            view.set_paragraph_class(previous, ParagraphClass::LineActive, false);
        }
        if let Some(paragraph) = next {
            view.set_paragraph_class(paragraph, ParagraphClass::LineActive, true);
        }
        self.paragraph = next;
    }
}
