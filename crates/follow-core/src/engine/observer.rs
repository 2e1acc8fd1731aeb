use super::Session;
use super::autoscroll::ScrollDecision;
use super::lifecycle::FollowMode;
use crate::config::FollowConfig;
use crate::host::{AudioElement, ParagraphClass, TranscriptView};
use crate::scheduling::Cue;
use std::time::Instant;
use tracing::{debug, trace};

impl<A: AudioElement, V: TranscriptView> Session<A, V> {
    /// Word active at the audio's current position.
    pub(super) fn lookup(&self, config: &FollowConfig) -> Option<usize> {
        let time = self.audio.current_time() + config.speech_start_tolerance_secs;
        self.timings.index_at(time)
    }

    /// One polling cycle. Returns whether the loop should keep running.
    pub(super) fn observe(&mut self, config: &FollowConfig, mode: FollowMode, now: Instant) -> bool {
        if mode != FollowMode::Enabled || self.audio.is_paused() {
            if self.polling.stop() {
                debug!(frames = self.polling.frames(), "Playback observer suspended");
            }
            return false;
        }

        self.polling.record_frame();
        let target = self.lookup(config);
        let moved = self
            .highlight
            .update(&self.index, &mut self.view, target, false);
        if moved {
            trace!(word = ?target, time = self.audio.current_time(), "Observer advanced");
            if let Some(word) = target {
                self.follow_word(config, word, now);
            }
        }
        self.autoscroll.step(&mut self.view, now);
        true
    }

    /// Resynchronize highlighting with the audio, discarding incremental state.
    pub(super) fn refresh(&mut self, config: &FollowConfig) {
        let target = self.lookup(config);
        self.highlight
            .update(&self.index, &mut self.view, target, true);
        debug!(word = ?target, "Forced highlight refresh");
    }

    fn follow_word(&mut self, config: &FollowConfig, word: usize, now: Instant) {
        let Some(unit) = self.index.unit_for_word(word) else {
            return;
        };
        let Some(rect) = self.view.unit_rect(unit) else {
            return;
        };
        let pending = self.user_scroll_settle.is_pending();
        let decision = self
            .autoscroll
            .consider(config, &self.view, rect, now, pending);
        if let ScrollDecision::Scroll { .. } = decision {
            if let Some(paragraph) = self.index.paragraph_of_unit(unit) {
                let cue = Cue::Paragraph(paragraph, ParagraphClass::LineScrolledTo);
                if self.cues.add(cue, now + config.flash_duration()) {
                    self.view
                        .set_paragraph_class(paragraph, ParagraphClass::LineScrolledTo, true);
                }
            }
        } else {
            trace!(word, ?decision, "Autoscroll skipped");
        }
    }
}
