//! The follow-along engine.
//!
//! One `FollowEngine` owns the highlight state, scroll timestamps and timers
//! for a single bound chapter. Host events, animation frames and timer polls
//! all enter through `&mut self`, so every decision reads the latest audio
//! position instead of queued deltas.

mod autoscroll;
mod highlight;
mod interaction;
mod lifecycle;
mod observer;
mod snapshot;
#[cfg(test)]
mod tests;

pub use lifecycle::FollowMode;
pub use snapshot::{FollowSnapshot, export_ts_bindings};

use crate::config::FollowConfig;
use crate::host::{AudioElement, HostEvent, PageClass, TranscriptView};
use crate::render_index::RenderIndex;
use crate::scheduling::{Cue, Debouncer, PollingLoop, TransientCues};
use crate::sync_check;
use crate::timing::{TimingIndex, TimingSource, load_timing};
use autoscroll::AutoscrollController;
use highlight::HighlightRenderer;
use lifecycle::{LifecycleAction, LifecycleEvent, transition};
use std::fmt;
use std::time::Instant;
use tracing::{debug, info, warn};

pub type FollowHook = Box<dyn FnMut()>;

/// Notification hooks supplied by the host at init.
#[derive(Default)]
pub struct FollowOptions {
    pub on_follow_enabled: Option<FollowHook>,
    pub on_follow_disabled: Option<FollowHook>,
}

impl FollowOptions {
    pub fn on_enabled(mut self, hook: impl FnMut() + 'static) -> Self {
        self.on_follow_enabled = Some(Box::new(hook));
        self
    }

    pub fn on_disabled(mut self, hook: impl FnMut() + 'static) -> Self {
        self.on_follow_disabled = Some(Box::new(hook));
        self
    }
}

impl fmt::Debug for FollowOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FollowOptions")
            .field("on_follow_enabled", &self.on_follow_enabled.is_some())
            .field("on_follow_disabled", &self.on_follow_disabled.is_some())
            .finish()
    }
}

struct Session<A, V> {
    chapter: u32,
    timings: TimingIndex,
    index: RenderIndex,
    audio: A,
    view: V,
    highlight: HighlightRenderer,
    autoscroll: AutoscrollController,
    polling: PollingLoop,
    /// Value is the instant of the latest scroll event in the burst.
    user_scroll_settle: Debouncer<Instant>,
    scroll_seek: Debouncer<Instant>,
    cues: TransientCues,
}

pub struct FollowEngine<A, V> {
    config: FollowConfig,
    mode: FollowMode,
    options: FollowOptions,
    session: Option<Session<A, V>>,
}

impl<A: AudioElement, V: TranscriptView> FollowEngine<A, V> {
    pub fn new(config: FollowConfig) -> Self {
        Self {
            config: config.sanitized(),
            mode: FollowMode::Disabled,
            options: FollowOptions::default(),
            session: None,
        }
    }

    pub fn config(&self) -> &FollowConfig {
        &self.config
    }

    /// Load `chapter`'s timing index and bind it to the host. Returns `false`
    /// (and stays inert) when timing or rendered units are unavailable.
    pub fn init(
        &mut self,
        chapter: u32,
        source: &dyn TimingSource,
        audio: A,
        view: V,
        options: FollowOptions,
    ) -> bool {
        self.destroy();
        match load_timing(source, chapter) {
            Ok(timings) => self.bind(timings, audio, view, options),
            Err(err) => {
                warn!(chapter, "Follow-along unavailable: {err:#}");
                false
            }
        }
    }

    /// Bind an already loaded timing index.
    pub fn bind(&mut self, timings: TimingIndex, audio: A, view: V, options: FollowOptions) -> bool {
        self.destroy();
        let chapter = timings.chapter();
        let index = match RenderIndex::build_from_view(&view, timings.len()) {
            Ok(index) => index,
            Err(err) => {
                warn!(chapter, "Follow-along unavailable: {err:#}");
                return false;
            }
        };

        let report = sync_check::check(&timings, &index);
        report.log_summary();
        let bound = index.bound_count();
        let ignored = index.ignored_count();

        let settle = self.config.user_scroll_settle();
        let seek_debounce = self.config.scroll_seek_debounce();
        self.session = Some(Session {
            chapter,
            highlight: HighlightRenderer::new(timings.len(), self.config.transition_radius),
            timings,
            index,
            audio,
            view,
            autoscroll: AutoscrollController::default(),
            polling: PollingLoop::default(),
            user_scroll_settle: Debouncer::new(settle),
            scroll_seek: Debouncer::new(seek_debounce),
            cues: TransientCues::default(),
        });
        self.options = options;
        self.mode = FollowMode::Disabled;
        info!(chapter, bound, ignored, "Follow-along ready");
        true
    }

    pub fn is_available(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_follow_active(&self) -> bool {
        self.session.is_some() && self.mode == FollowMode::Enabled
    }

    pub fn mode(&self) -> FollowMode {
        self.mode
    }

    pub fn enable_follow(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let playing = !session.audio.is_paused();
        self.apply(LifecycleEvent::EnableRequested { playing });
    }

    pub fn disable_follow(&mut self) {
        self.apply(LifecycleEvent::DisableRequested);
    }

    pub fn handle(&mut self, event: HostEvent, now: Instant) {
        if self.session.is_none() {
            return;
        }
        debug!(?event, "Host event");
        match event {
            HostEvent::Play => self.apply(LifecycleEvent::PlaybackStarted),
            HostEvent::Pause => self.apply(LifecycleEvent::PlaybackPaused),
            HostEvent::Ended => self.apply(LifecycleEvent::PlaybackEnded),
            HostEvent::Seeked => {
                if let Some(session) = self.session.as_mut() {
                    session.scroll_seek.cancel();
                }
                self.apply(LifecycleEvent::Seeked);
            }
            HostEvent::Scroll => self.on_scroll(now),
            HostEvent::WordClicked { word_index } => self.on_word_clicked(word_index, now),
        }
    }

    /// Animation-frame callback. Returns whether the host should schedule another frame.
    pub fn on_frame(&mut self, now: Instant) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if !session.polling.is_running() {
            return session.autoscroll.step(&mut session.view, now);
        }
        let keep_polling = session.observe(&self.config, self.mode, now);
        keep_polling || session.autoscroll.is_animating()
    }

    /// Fire due debounce timers and expire transient cues.
    pub fn poll_timers(&mut self, now: Instant) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        for cue in session.cues.take_expired(now) {
            remove_cue(&mut session.view, cue);
        }
        session.autoscroll.step(&mut session.view, now);
        if let Some(event_at) = session.user_scroll_settle.take_ready(now) {
            self.settle_user_scroll(event_at, now);
        }
        let fire_seek = self
            .session
            .as_mut()
            .and_then(|session| session.scroll_seek.take_ready(now));
        if let Some(event_at) = fire_seek {
            self.scroll_to_seek(event_at);
        }
    }

    /// Earliest instant at which `poll_timers` has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        let session = self.session.as_ref()?;
        [
            session.user_scroll_settle.deadline(),
            session.scroll_seek.deadline(),
            session.cues.next_deadline(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Whether the host should keep delivering frames.
    pub fn needs_frame(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.polling.is_running() || session.autoscroll.is_animating())
    }

    pub fn polling_generation(&self) -> Option<u64> {
        self.session
            .as_ref()
            .map(|session| session.polling.generation())
    }

    pub fn snapshot(&self) -> FollowSnapshot {
        let Some(session) = self.session.as_ref() else {
            return FollowSnapshot::unavailable();
        };
        FollowSnapshot {
            chapter: Some(session.chapter),
            available: true,
            mode: self.mode,
            polling: session.polling.is_running(),
            current_word: session.highlight.current(),
            current_paragraph: session.highlight.paragraph().map(|p| p.0),
            word_count: session.timings.len(),
            bound_units: session.index.bound_count(),
            dead_units: session.index.dead_count(),
            autoscrolling: session.autoscroll.is_animating(),
            autoscrolls_started: u32::try_from(session.autoscroll.scrolls_started())
                .unwrap_or(u32::MAX),
        }
    }

    /// Stop everything, remove every applied class and release the host handles.
    pub fn destroy(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        session.polling.stop();
        session.user_scroll_settle.cancel();
        session.scroll_seek.cancel();
        session.autoscroll.cancel_animation();
        for cue in session.cues.drain() {
            remove_cue(&mut session.view, cue);
        }
        session
            .highlight
            .clear_everything(&session.index, &mut session.view);
        if self.mode == FollowMode::Enabled {
            session.view.set_page_class(PageClass::FollowMode, false);
        }
        self.mode = FollowMode::Disabled;
        self.options = FollowOptions::default();
        info!(chapter = session.chapter, "Follow-along destroyed");
    }

    fn apply(&mut self, event: LifecycleEvent) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let (mode, actions) = transition(self.mode, event);
        if mode != self.mode {
            info!(from = ?self.mode, to = ?mode, ?event, "Follow mode changed");
        }
        self.mode = mode;

        for action in actions {
            match action {
                LifecycleAction::ResumePolling => {
                    if session.polling.start() {
                        debug!(generation = session.polling.generation(), "Playback observer started");
                    }
                }
                LifecycleAction::StopPolling => {
                    session.polling.stop();
                }
                LifecycleAction::CancelTimers => {
                    session.user_scroll_settle.cancel();
                    session.scroll_seek.cancel();
                    session.autoscroll.cancel_animation();
                }
                LifecycleAction::ForceRefresh => session.refresh(&self.config),
                LifecycleAction::MarkAllRead => session
                    .highlight
                    .mark_all_read(&session.index, &mut session.view),
                LifecycleAction::SetPageMarker(on) => {
                    session.view.set_page_class(PageClass::FollowMode, on)
                }
                LifecycleAction::NotifyEnabled => {
                    if let Some(hook) = self.options.on_follow_enabled.as_mut() {
                        hook();
                    }
                }
                LifecycleAction::NotifyDisabled => {
                    if let Some(hook) = self.options.on_follow_disabled.as_mut() {
                        hook();
                    }
                }
            }
        }
    }
}

fn remove_cue(view: &mut dyn TranscriptView, cue: Cue) {
    match cue {
        Cue::Unit(unit, class) => view.set_unit_class(unit, class, false),
        Cue::Paragraph(paragraph, class) => view.set_paragraph_class(paragraph, class, false),
    }
}
