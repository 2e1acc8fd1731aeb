use super::FollowEngine;
use super::lifecycle::{FollowMode, LifecycleEvent};
use crate::host::{AudioElement, TranscriptView, UnitClass};
use crate::scheduling::Cue;
use std::time::Instant;
use tracing::{debug, info, warn};

impl<A: AudioElement, V: TranscriptView> FollowEngine<A, V> {
    /// Click-to-seek. Works in every mode; a click while paused also enables
    /// follow mode and starts playback.
    pub(super) fn on_word_clicked(&mut self, word: usize, now: Instant) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(start) = session.timings.start_of(word) else {
            debug!(word, "Ignoring click on word without timing");
            return;
        };

        session.scroll_seek.cancel();
        session.audio.seek(start);
        if let Some(unit) = session.index.unit_for_word(word) {
            let cue = Cue::Unit(unit, UnitClass::Clicked);
            if session.cues.add(cue, now + self.config.click_pulse()) {
                session.view.set_unit_class(unit, UnitClass::Clicked, true);
            }
        }
        info!(word, start, "Seeking to clicked word");

        let was_enabled = self.mode == FollowMode::Enabled;
        if session.audio.is_paused() {
            self.apply(LifecycleEvent::EnableRequested { playing: false });
            let started = match self.session.as_mut() {
                Some(session) => match session.audio.play() {
                    Ok(()) => true,
                    Err(err) => {
                        warn!(word, "Playback did not start after click: {err:#}");
                        false
                    }
                },
                None => false,
            };
            if started {
                self.apply(LifecycleEvent::PlaybackStarted);
            }
        }
        if was_enabled {
            if let Some(session) = self.session.as_mut() {
                session.refresh(&self.config);
            }
        }
    }

    pub(super) fn on_scroll(&mut self, now: Instant) {
        if self.mode != FollowMode::Enabled {
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.audio.is_paused() {
            session.scroll_seek.queue(now, now);
        } else {
            session.user_scroll_settle.queue(now, now);
        }
    }

    /// A scroll burst during playback has settled; attribute it to the reader
    /// unless our own animation produced it.
    pub(super) fn settle_user_scroll(&mut self, event_at: Instant, now: Instant) {
        let window = self.config.user_scroll_settle();
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.autoscroll.is_own_scroll(event_at, window) {
            debug!("Scroll attributed to autoscroll");
            return;
        }
        session.autoscroll.record_user_scroll(now);
        debug!("User scroll recorded; autoscroll deferring");
    }

    /// Paused scrolling settled: seek to the word under the focus line.
    pub(super) fn scroll_to_seek(&mut self, event_at: Instant) {
        if self.mode != FollowMode::Enabled {
            return;
        }
        let window = self.config.scroll_seek_debounce();
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.audio.is_paused() || session.autoscroll.is_own_scroll(event_at, window) {
            return;
        }

        let focus_y = self.config.focus_fraction * session.view.viewport_height();
        let Some(word) = session.index.nearest_word(&session.view, focus_y) else {
            return;
        };
        let Some(start) = session.timings.start_of(word) else {
            return;
        };
        session.audio.seek(start);
        session.refresh(&self.config);
        info!(word, start, "Scroll-to-seek");
    }
}
