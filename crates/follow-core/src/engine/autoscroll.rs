use crate::config::FollowConfig;
use crate::host::{Rect, TranscriptView};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ScrollDecision {
    NotNearEdge,
    CoolingDown,
    DeferringToUser,
    TooShort,
    Scroll { from: f64, to: f64 },
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ScrollInputs {
    pub rect: Rect,
    pub viewport_height: f64,
    pub scroll_top: f64,
    pub max_scroll_top: f64,
    pub now: Instant,
    pub last_auto_scroll: Option<Instant>,
    pub last_user_scroll: Option<Instant>,
    /// A reader scroll burst has not settled yet.
    pub user_scroll_pending: bool,
}

fn elapsed_at_least(since: Option<Instant>, now: Instant, window: Duration) -> bool {
    since.is_none_or(|at| now.saturating_duration_since(at) >= window)
}

pub(crate) fn evaluate(config: &FollowConfig, inputs: &ScrollInputs) -> ScrollDecision {
    let height = inputs.viewport_height.max(0.0);
    let margin = config.edge_margin_px.min(height * 0.5);
    let near_edge = inputs.rect.top < margin || inputs.rect.bottom > height - margin;
    if !near_edge {
        return ScrollDecision::NotNearEdge;
    }
    if !elapsed_at_least(inputs.last_auto_scroll, inputs.now, config.cooldown()) {
        return ScrollDecision::CoolingDown;
    }
    if inputs.user_scroll_pending
        || !elapsed_at_least(inputs.last_user_scroll, inputs.now, config.user_deference())
    {
        return ScrollDecision::DeferringToUser;
    }

    let max = inputs.max_scroll_top.max(0.0);
    let target = inputs.scroll_top + inputs.rect.top - config.anchor_fraction * height;
    let target = if target.is_finite() {
        target.clamp(0.0, max)
    } else {
        inputs.scroll_top
    };
    if (target - inputs.scroll_top).abs() < config.min_scroll_distance_px {
        return ScrollDecision::TooShort;
    }
    ScrollDecision::Scroll {
        from: inputs.scroll_top,
        to: target,
    }
}

/// Rapid start, gentle settle.
pub(crate) fn ease_out_cubic(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ScrollAnimation {
    from: f64,
    to: f64,
    started: Instant,
    duration: Duration,
}

impl ScrollAnimation {
    /// Offset at `now` and whether the animation has finished.
    fn offset_at(&self, now: Instant) -> (f64, bool) {
        if self.duration.is_zero() {
            return (self.to, true);
        }
        let progress = now.saturating_duration_since(self.started).as_secs_f64()
            / self.duration.as_secs_f64();
        let offset = self.from + (self.to - self.from) * ease_out_cubic(progress);
        (offset, progress >= 1.0)
    }
}

#[derive(Debug, Default)]
pub(crate) struct AutoscrollController {
    last_auto_scroll: Option<Instant>,
    last_user_scroll: Option<Instant>,
    last_programmatic_scroll: Option<Instant>,
    animation: Option<ScrollAnimation>,
    scrolls_started: u64,
}

impl AutoscrollController {
    /// Evaluate the active word's position and start an animation if warranted.
    pub(crate) fn consider(
        &mut self,
        config: &FollowConfig,
        view: &dyn TranscriptView,
        rect: Rect,
        now: Instant,
        user_scroll_pending: bool,
    ) -> ScrollDecision {
        let decision = evaluate(
            config,
            &ScrollInputs {
                rect,
                viewport_height: view.viewport_height(),
                scroll_top: view.scroll_top(),
                max_scroll_top: view.max_scroll_top(),
                now,
                last_auto_scroll: self.last_auto_scroll,
                last_user_scroll: self.last_user_scroll,
                user_scroll_pending,
            },
        );
        if let ScrollDecision::Scroll { from, to } = decision {
            debug!(from, to, "Starting autoscroll");
            self.animation = Some(ScrollAnimation {
                from,
                to,
                started: now,
                duration: config.scroll_duration(),
            });
            self.last_auto_scroll = Some(now);
            self.scrolls_started += 1;
        }
        decision
    }

    /// Advance a running animation; returns `true` while one is still running.
    pub(crate) fn step(&mut self, view: &mut dyn TranscriptView, now: Instant) -> bool {
        let Some(animation) = self.animation else {
            return false;
        };
        let (offset, finished) = animation.offset_at(now);
        view.scroll_to(offset);
        self.last_programmatic_scroll = Some(now);
        if finished {
            self.animation = None;
        }
        !finished
    }

    pub(crate) fn record_user_scroll(&mut self, now: Instant) {
        self.last_user_scroll = Some(now);
    }

    /// Whether a scroll event observed at `event_at` is plausibly our own.
    /// Events that precede the running animation belong to the reader.
    pub(crate) fn is_own_scroll(&self, event_at: Instant, window: Duration) -> bool {
        let after_start = self.last_auto_scroll.is_some_and(|started| started <= event_at);
        after_start
            && (self.animation.is_some()
                || self
                    .last_programmatic_scroll
                    .is_some_and(|at| event_at.saturating_duration_since(at) < window))
    }

    pub(crate) fn cancel_animation(&mut self) {
        self.animation = None;
    }

    pub(crate) fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    pub(crate) fn scrolls_started(&self) -> u64 {
        self.scrolls_started
    }

    #[cfg(test)]
    pub(crate) fn last_user_scroll(&self) -> Option<Instant> {
        self.last_user_scroll
    }
}
