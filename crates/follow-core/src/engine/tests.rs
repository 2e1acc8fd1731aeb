use super::*;
use crate::headless::{HeadlessPage, PageLayout, SimulatedAudio};
use crate::host::{ParagraphClass, ParagraphId, UnitClass};
use crate::timing::{FileTimingSource, WordEntry};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

const FRAME: Duration = Duration::from_micros(16_667);

struct Harness {
    engine: FollowEngine<SimulatedAudio, HeadlessPage>,
    audio: SimulatedAudio,
    page: HeadlessPage,
    base: Instant,
    clock: Duration,
}

fn uniform_timings(words: usize, step: f64) -> TimingIndex {
    let entries = (0..words)
        .map(|i| WordEntry::new(i as f64 * step, Some(i as f64 * step + step * 0.9)))
        .collect();
    TimingIndex::new(1, entries).expect("valid timings")
}

fn build_harness(words: usize, layout: PageLayout, config: FollowConfig) -> Harness {
    build_harness_with(words, layout, config, FollowOptions::default())
}

fn build_harness_with(
    words: usize,
    layout: PageLayout,
    config: FollowConfig,
    options: FollowOptions,
) -> Harness {
    let timings = uniform_timings(words, 0.3);
    let page = HeadlessPage::from_timing(&timings, words, layout);
    let audio = SimulatedAudio::new(timings.duration() + 0.5);
    let mut engine = FollowEngine::new(config);
    assert!(engine.bind(timings, audio.clone(), page.clone(), options));
    Harness {
        engine,
        audio,
        page,
        base: Instant::now(),
        clock: Duration::ZERO,
    }
}

fn tall_layout() -> PageLayout {
    PageLayout {
        words_per_line: 2,
        line_height: 28.0,
        paragraph_gap: 0.0,
        viewport_height: 720.0,
        top_padding: 24.0,
    }
}

impl Harness {
    fn now(&self) -> Instant {
        self.base + self.clock
    }

    fn play(&mut self) {
        let mut audio = self.audio.clone();
        audio.play().expect("audio plays");
        let now = self.now();
        self.engine.handle(HostEvent::Play, now);
    }

    fn pause(&mut self) {
        self.audio.pause();
        let now = self.now();
        self.engine.handle(HostEvent::Pause, now);
    }

    fn seek(&mut self, secs: f64) {
        let mut audio = self.audio.clone();
        audio.seek(secs);
        let now = self.now();
        self.engine.handle(HostEvent::Seeked, now);
    }

    fn frame(&mut self) {
        self.clock += FRAME;
        let now = self.now();
        if self.audio.advance(FRAME) {
            self.engine.handle(HostEvent::Ended, now);
        }
        self.engine.on_frame(now);
        self.engine.poll_timers(now);
    }

    fn run_for(&mut self, span: Duration) {
        let end = self.clock + span;
        while self.clock < end {
            self.frame();
        }
    }

    fn play_until(&mut self, secs: f64) {
        while self.audio.current_time() < secs && !self.audio.is_ended() {
            self.frame();
        }
    }

    fn classes(&self, word: usize) -> Vec<UnitClass> {
        self.page.unit_classes(word).into_iter().collect()
    }

    fn scrolls_started(&self) -> u64 {
        self.engine
            .session
            .as_ref()
            .map(|session| session.autoscroll.scrolls_started())
            .unwrap_or(0)
    }
}

#[test]
fn playing_to_three_seconds_highlights_word_ten() {
    let mut harness = build_harness(100, tall_layout(), FollowConfig::default());
    harness.engine.enable_follow();
    harness.play();
    assert!(harness.engine.needs_frame());

    harness.play_until(3.0);
    let current = harness.engine.snapshot().current_word.expect("active word");
    assert!((9..=11).contains(&current), "active word {current}");
    assert_eq!(harness.page.units_with_class(UnitClass::Active), vec![current]);
}

#[test]
fn paused_scroll_seeks_to_word_under_focus_line() {
    let mut harness = build_harness(100, tall_layout(), FollowConfig::default());
    harness.engine.enable_follow();
    harness.play();
    harness.play_until(3.0);
    harness.pause();
    assert!(harness.engine.is_follow_active());
    assert!(!harness.engine.snapshot().polling);

    let focus = 0.40 * 720.0;
    let line_top = harness.page.content_top(40).expect("unit 40");
    harness.page.user_scroll_to(line_top - focus + 5.0);
    let now = harness.now();
    harness.engine.handle(HostEvent::Scroll, now);
    harness.run_for(Duration::from_millis(100));
    harness.engine.handle(HostEvent::Scroll, harness.now());
    harness.run_for(Duration::from_millis(250));

    let start = harness.engine.session.as_ref().and_then(|s| s.timings.start_of(40));
    assert_eq!(harness.audio.seeks().last().copied(), start);
    assert_eq!(harness.engine.snapshot().current_word, Some(40));
    assert!(harness.audio.is_paused());
    assert_eq!(harness.audio.seeks().len(), 1);
}

#[test]
fn unchanged_position_causes_no_mutation() {
    let layout = PageLayout {
        viewport_height: 10_000.0,
        ..tall_layout()
    };
    let mut harness = build_harness(50, layout, FollowConfig::default());
    harness.engine.enable_follow();
    harness.play();
    harness.play_until(1.0);

    let now = harness.now();
    harness.engine.on_frame(now);
    let before = harness.page.mutations();
    harness.engine.on_frame(now);
    harness.engine.on_frame(now);
    assert_eq!(harness.page.mutations(), before);
}

#[test]
fn dimming_window_around_word_ten() {
    let mut harness = build_harness(40, tall_layout(), FollowConfig::default());
    harness.seek(3.05);
    harness.engine.enable_follow();

    for word in 0..=6 {
        assert_eq!(harness.classes(word), vec![UnitClass::Read], "word {word}");
    }
    for word in (7..=13).filter(|w| *w != 10) {
        assert_eq!(harness.classes(word), vec![UnitClass::Transitional], "word {word}");
    }
    assert_eq!(harness.classes(10), vec![UnitClass::Active]);
    for word in 14..40 {
        assert!(harness.classes(word).is_empty(), "word {word}");
    }
    assert!(harness.page.has_page_class(PageClass::FollowMode));
}

#[test]
fn seeking_backward_clears_stale_tags() {
    let mut harness = build_harness(100, tall_layout(), FollowConfig::default());
    harness.seek(15.05);
    harness.engine.enable_follow();
    assert_eq!(harness.engine.snapshot().current_word, Some(50));

    harness.seek(1.55);
    assert_eq!(harness.engine.snapshot().current_word, Some(5));
    for word in 9..=53 {
        assert!(harness.classes(word).is_empty(), "word {word}");
    }
    assert_eq!(harness.classes(5), vec![UnitClass::Active]);
    for word in [2, 3, 4, 6, 7, 8] {
        assert_eq!(harness.classes(word), vec![UnitClass::Transitional], "word {word}");
    }
    assert_eq!(harness.classes(1), vec![UnitClass::Read]);
}

#[test]
fn cooldown_allows_one_animation_per_window() {
    let layout = PageLayout {
        words_per_line: 1,
        line_height: 28.0,
        paragraph_gap: 0.0,
        viewport_height: 720.0,
        top_padding: 0.0,
    };
    let config = FollowConfig {
        anchor_fraction: 0.9,
        scroll_duration_ms: 0,
        ..FollowConfig::default()
    };
    let mut harness = build_harness(100, layout, config);
    harness.engine.enable_follow();
    harness.play();

    harness.play_until(7.25);
    assert_eq!(harness.scrolls_started(), 1);

    // Every following word stays near the bottom edge, but the cooldown holds.
    harness.play_until(8.45);
    assert_eq!(harness.scrolls_started(), 1);

    harness.play_until(9.25);
    assert_eq!(harness.scrolls_started(), 2);
    assert!(
        !harness
            .page
            .paragraphs_with_class(ParagraphClass::LineScrolledTo)
            .is_empty()
    );
}

#[test]
fn reader_scroll_during_playback_defers_autoscroll() {
    let layout = PageLayout {
        words_per_line: 1,
        line_height: 28.0,
        paragraph_gap: 0.0,
        viewport_height: 720.0,
        top_padding: 0.0,
    };
    let config = FollowConfig {
        anchor_fraction: 0.9,
        scroll_duration_ms: 0,
        ..FollowConfig::default()
    };
    let mut harness = build_harness(100, layout, config);
    harness.engine.enable_follow();
    harness.play();
    harness.play_until(5.0);

    harness.page.user_scroll_to(10.0);
    harness.engine.handle(HostEvent::Scroll, harness.now());
    harness.run_for(Duration::from_millis(200));
    assert!(
        harness
            .engine
            .session
            .as_ref()
            .and_then(|s| s.autoscroll.last_user_scroll())
            .is_some()
    );

    // Word 24 would trigger at 7.2s; the reader's scroll holds it off.
    harness.play_until(8.0);
    assert_eq!(harness.scrolls_started(), 0);
    harness.play_until(10.5);
    assert_eq!(harness.scrolls_started(), 1);
}

#[test]
fn unsettled_reader_scroll_is_not_pulled_back() {
    let layout = PageLayout {
        words_per_line: 1,
        line_height: 28.0,
        paragraph_gap: 0.0,
        viewport_height: 720.0,
        top_padding: 0.0,
    };
    let mut harness = build_harness(100, layout, FollowConfig::default());
    harness.engine.enable_follow();
    harness.play();
    harness.play_until(5.05);
    assert_eq!(harness.scrolls_started(), 0);

    // Word 16 lands inside the top margin; the next words follow it there.
    harness.page.user_scroll_to(398.0);
    harness.engine.handle(HostEvent::Scroll, harness.now());
    harness.run_for(Duration::from_millis(400));

    assert!((harness.page.scroll_top() - 398.0).abs() < f64::EPSILON);
    assert_eq!(harness.scrolls_started(), 0);
    assert!(
        harness
            .engine
            .session
            .as_ref()
            .and_then(|s| s.autoscroll.last_user_scroll())
            .is_some()
    );
}

#[test]
fn click_supersedes_pending_scroll_seek() {
    let mut harness = build_harness(100, tall_layout(), FollowConfig::default());
    harness.audio.set_refuse_play(true);
    harness.engine.enable_follow();

    harness.page.user_scroll_to(600.0);
    harness.engine.handle(HostEvent::Scroll, harness.now());
    harness.run_for(Duration::from_millis(50));
    harness
        .engine
        .handle(HostEvent::WordClicked { word_index: 12 }, harness.now());
    harness.run_for(Duration::from_millis(400));

    assert!(harness.audio.is_paused());
    assert_eq!(harness.audio.seeks(), vec![12.0 * 0.3]);
}

#[test]
fn seek_supersedes_pending_scroll_seek() {
    let mut harness = build_harness(100, tall_layout(), FollowConfig::default());
    harness.engine.enable_follow();

    harness.page.user_scroll_to(600.0);
    harness.engine.handle(HostEvent::Scroll, harness.now());
    harness.run_for(Duration::from_millis(50));
    harness.seek(6.05);
    harness.run_for(Duration::from_millis(400));

    assert_eq!(harness.audio.seeks(), vec![6.05]);
    assert_eq!(harness.engine.snapshot().current_word, Some(20));
}

#[test]
fn autoscroll_events_are_not_mistaken_for_reader_scrolls() {
    let layout = PageLayout {
        words_per_line: 1,
        line_height: 28.0,
        paragraph_gap: 0.0,
        viewport_height: 720.0,
        top_padding: 0.0,
    };
    let mut harness = build_harness(100, layout, FollowConfig::default());
    harness.engine.enable_follow();
    harness.play();

    let mut seen = 0;
    while harness.scrolls_started() == 0 && harness.audio.current_time() < 20.0 {
        harness.frame();
    }
    assert_eq!(harness.scrolls_started(), 1);
    while harness.engine.snapshot().autoscrolling {
        harness.engine.handle(HostEvent::Scroll, harness.now());
        harness.frame();
        seen += 1;
    }
    assert!(seen > 0);
    harness.run_for(Duration::from_millis(400));
    assert!(
        harness
            .engine
            .session
            .as_ref()
            .and_then(|s| s.autoscroll.last_user_scroll())
            .is_none()
    );
}

#[test]
fn playback_end_disables_follow_and_marks_everything_read() {
    let disabled = Rc::new(Cell::new(0));
    let hook_count = Rc::clone(&disabled);
    let options = FollowOptions::default().on_disabled(move || hook_count.set(hook_count.get() + 1));
    let mut harness = build_harness_with(20, tall_layout(), FollowConfig::default(), options);
    harness.engine.enable_follow();
    harness.play();
    harness.play_until(100.0);

    assert!(harness.audio.is_ended());
    assert_eq!(harness.engine.mode(), FollowMode::Disabled);
    assert_eq!(harness.page.units_with_class(UnitClass::Read).len(), 20);
    assert!(harness.page.units_with_class(UnitClass::Active).is_empty());
    assert!(!harness.page.has_page_class(PageClass::FollowMode));
    assert_eq!(disabled.get(), 1);
    assert!(!harness.engine.needs_frame());
}

#[test]
fn ended_while_disabled_still_marks_everything_read() {
    let mut harness = build_harness(10, tall_layout(), FollowConfig::default());
    harness.engine.handle(HostEvent::Ended, harness.now());
    assert_eq!(harness.engine.mode(), FollowMode::Disabled);
    assert_eq!(harness.page.units_with_class(UnitClass::Read).len(), 10);
}

#[test]
fn click_while_paused_enables_follow_and_plays() {
    let enabled = Rc::new(Cell::new(0));
    let hook_count = Rc::clone(&enabled);
    let options = FollowOptions::default().on_enabled(move || hook_count.set(hook_count.get() + 1));
    let mut harness = build_harness_with(60, tall_layout(), FollowConfig::default(), options);

    harness
        .engine
        .handle(HostEvent::WordClicked { word_index: 25 }, harness.now());

    assert!(harness.engine.is_follow_active());
    assert!(!harness.audio.is_paused());
    assert_eq!(harness.audio.plays(), 1);
    assert_eq!(enabled.get(), 1);
    assert_eq!(harness.engine.snapshot().current_word, Some(25));
    assert!(harness.page.has_unit_class(25, UnitClass::Clicked));
    assert!(harness.engine.snapshot().polling);

    harness.run_for(Duration::from_millis(350));
    assert!(!harness.page.has_unit_class(25, UnitClass::Clicked));
}

#[test]
fn click_while_playing_without_follow_only_seeks() {
    let mut harness = build_harness(60, tall_layout(), FollowConfig::default());
    harness.play();
    harness
        .engine
        .handle(HostEvent::WordClicked { word_index: 30 }, harness.now());

    assert!(!harness.engine.is_follow_active());
    assert_eq!(harness.audio.seeks(), vec![30.0 * 0.3]);
    assert_eq!(harness.engine.snapshot().current_word, None);
}

#[test]
fn refused_playback_leaves_follow_enabled_but_idle() {
    let mut harness = build_harness(30, tall_layout(), FollowConfig::default());
    harness.audio.set_refuse_play(true);
    harness
        .engine
        .handle(HostEvent::WordClicked { word_index: 3 }, harness.now());

    assert!(harness.engine.is_follow_active());
    assert!(harness.audio.is_paused());
    assert!(!harness.engine.snapshot().polling);
}

#[test]
fn click_outside_timing_is_ignored() {
    let mut harness = build_harness(10, tall_layout(), FollowConfig::default());
    let before = harness.page.mutations();
    harness
        .engine
        .handle(HostEvent::WordClicked { word_index: 10 }, harness.now());
    assert!(harness.audio.seeks().is_empty());
    assert_eq!(harness.page.mutations(), before);
    assert!(!harness.engine.is_follow_active());
}

#[test]
fn pause_suspends_polling_and_play_resumes_it() {
    let mut harness = build_harness(40, tall_layout(), FollowConfig::default());
    harness.engine.enable_follow();
    harness.play();
    let first_generation = harness.engine.polling_generation();
    harness.play_until(1.0);

    harness.pause();
    assert!(!harness.engine.needs_frame());
    assert!(harness.engine.is_follow_active());

    harness.play();
    assert!(harness.engine.needs_frame());
    assert_ne!(harness.engine.polling_generation(), first_generation);
}

#[test]
fn disable_stops_observer_and_keeps_tags() {
    let mut harness = build_harness(40, tall_layout(), FollowConfig::default());
    harness.engine.enable_follow();
    harness.play();
    harness.play_until(2.0);
    let current = harness.engine.snapshot().current_word;

    harness.engine.disable_follow();
    assert!(!harness.page.has_page_class(PageClass::FollowMode));
    harness.play_until(4.0);
    assert_eq!(harness.engine.snapshot().current_word, current);
    assert!(!harness.engine.snapshot().polling);
}

#[test]
fn destroy_leaves_page_clean_and_engine_inert() {
    let mut harness = build_harness(60, tall_layout(), FollowConfig::default());
    harness
        .engine
        .handle(HostEvent::WordClicked { word_index: 12 }, harness.now());
    harness.play_until(5.0);
    assert!(!harness.page.is_clean());

    harness.engine.destroy();
    assert!(harness.page.is_clean());
    assert!(!harness.engine.is_available());
    assert!(!harness.engine.is_follow_active());

    let mutations = harness.page.mutations();
    let seeks = harness.audio.seeks().len();
    harness.engine.enable_follow();
    harness
        .engine
        .handle(HostEvent::WordClicked { word_index: 3 }, harness.now());
    harness.engine.on_frame(harness.now());
    assert_eq!(harness.page.mutations(), mutations);
    assert_eq!(harness.audio.seeks().len(), seeks);
    assert_eq!(harness.engine.snapshot(), FollowSnapshot::unavailable());
}

#[test]
fn missing_timing_reports_unavailable() {
    let dir = std::env::temp_dir().join(format!("follow-core-engine-{}", std::process::id()));
    let source = FileTimingSource::new(&dir);
    let page = HeadlessPage::uniform(10, 10, PageLayout::default());
    let mut engine = FollowEngine::new(FollowConfig::default());

    assert!(!engine.init(4, &source, SimulatedAudio::new(10.0), page.clone(), FollowOptions::default()));
    assert!(!engine.is_available());
    engine.enable_follow();
    assert!(page.is_clean());
}

#[test]
fn page_without_units_reports_unavailable() {
    let page = HeadlessPage::new(Vec::new(), PageLayout::default());
    let mut engine = FollowEngine::new(FollowConfig::default());
    assert!(!engine.bind(
        uniform_timings(10, 0.3),
        SimulatedAudio::new(3.0),
        page,
        FollowOptions::default()
    ));
    assert!(!engine.is_available());
}

#[test]
fn lead_in_has_no_active_word() {
    let entries = vec![WordEntry::new(2.0, None), WordEntry::new(2.5, None)];
    let timings = TimingIndex::new(1, entries).expect("valid");
    let page = HeadlessPage::from_timing(&timings, 10, PageLayout::default());
    let audio = SimulatedAudio::new(5.0);
    let mut engine = FollowEngine::new(FollowConfig::default());
    assert!(engine.bind(timings, audio.clone(), page.clone(), FollowOptions::default()));

    engine.enable_follow();
    assert_eq!(engine.snapshot().current_word, None);
    assert!(page.units_with_class(UnitClass::Active).is_empty());
    assert!(!page.has_paragraph_class(ParagraphId(0), ParagraphClass::LineActive));
}

#[test]
fn speech_start_tolerance_shifts_lookup() {
    let entries = vec![WordEntry::new(2.0, None), WordEntry::new(2.5, None)];
    let timings = TimingIndex::new(1, entries).expect("valid");
    let page = HeadlessPage::from_timing(&timings, 10, PageLayout::default());
    let mut audio = SimulatedAudio::new(5.0);
    audio.seek(1.8);
    let config = FollowConfig {
        speech_start_tolerance_secs: 0.25,
        ..FollowConfig::default()
    };
    let mut engine = FollowEngine::new(config);
    assert!(engine.bind(timings, audio, page, FollowOptions::default()));
    engine.enable_follow();
    assert_eq!(engine.snapshot().current_word, Some(0));
}

#[test]
fn next_deadline_tracks_pending_timers() {
    let mut harness = build_harness(40, tall_layout(), FollowConfig::default());
    assert_eq!(harness.engine.next_deadline(), None);
    let now = harness.now();
    harness
        .engine
        .handle(HostEvent::WordClicked { word_index: 2 }, now);
    assert_eq!(
        harness.engine.next_deadline(),
        Some(now + Duration::from_millis(300))
    );
}
