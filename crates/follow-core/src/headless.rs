//! In-memory host: a laid-out transcript page and a virtual-clock audio
//! track. Used by the replay binary and by the test suites.
//!
//! Both types are cheap handles over shared state, so a caller can keep a
//! clone to inspect classes, scroll position and playback after handing the
//! other clone to the engine.

use crate::host::{
    AudioElement, PageClass, ParagraphClass, ParagraphId, Rect, TranscriptView, UnitClass, UnitId,
    UnitInfo,
};
use crate::timing::TimingIndex;
use anyhow::{Result, anyhow, bail};
use scraper::{ElementRef, Html, Selector};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashSet};
use std::rc::Rc;
use std::time::Duration;
use tracing::debug;

/// Deterministic geometry of the headless page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub words_per_line: usize,
    pub line_height: f64,
    pub paragraph_gap: f64,
    pub viewport_height: f64,
    pub top_padding: f64,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            words_per_line: 10,
            line_height: 28.0,
            paragraph_gap: 16.0,
            viewport_height: 720.0,
            top_padding: 24.0,
        }
    }
}

#[derive(Debug)]
struct PageState {
    units: Vec<UnitInfo>,
    /// Content-relative top of each unit.
    tops: Vec<f64>,
    layout: PageLayout,
    content_height: f64,
    scroll_top: f64,
    unit_classes: Vec<BTreeSet<UnitClass>>,
    paragraph_classes: Vec<(ParagraphId, ParagraphClass)>,
    page_classes: HashSet<PageClass>,
    mutations: u64,
    programmatic_scrolls: u64,
}

#[derive(Debug, Clone)]
pub struct HeadlessPage {
    state: Rc<RefCell<PageState>>,
}

impl HeadlessPage {
    pub fn new(units: Vec<UnitInfo>, layout: PageLayout) -> Self {
        let layout = PageLayout {
            words_per_line: layout.words_per_line.max(1),
            ..layout
        };
        let mut tops = Vec::with_capacity(units.len());
        let mut y = layout.top_padding;
        let mut column = 0usize;
        let mut paragraph: Option<ParagraphId> = None;

        for unit in &units {
            if paragraph != Some(unit.paragraph) {
                if paragraph.is_some() {
                    y += layout.line_height + layout.paragraph_gap;
                }
                paragraph = Some(unit.paragraph);
                column = 0;
            } else if column == layout.words_per_line {
                y += layout.line_height;
                column = 0;
            }
            tops.push(y);
            column += 1;
        }

        let content_height = if units.is_empty() {
            layout.top_padding * 2.0
        } else {
            y + layout.line_height + layout.top_padding
        };
        let unit_classes = vec![BTreeSet::new(); units.len()];

        Self {
            state: Rc::new(RefCell::new(PageState {
                units,
                tops,
                layout,
                content_height,
                scroll_top: 0.0,
                unit_classes,
                paragraph_classes: Vec::new(),
                page_classes: HashSet::new(),
                mutations: 0,
                programmatic_scrolls: 0,
            })),
        }
    }

    /// `word_count` bound units with placeholder text, split into paragraphs.
    pub fn uniform(word_count: usize, words_per_paragraph: usize, layout: PageLayout) -> Self {
        let per_paragraph = words_per_paragraph.max(1);
        let units = (0..word_count)
            .map(|idx| UnitInfo {
                word_index: Some(idx),
                paragraph: ParagraphId(idx / per_paragraph),
                text: format!("word{idx}"),
            })
            .collect();
        Self::new(units, layout)
    }

    /// One unit per timed word, using the word text when the index carries it.
    pub fn from_timing(index: &TimingIndex, words_per_paragraph: usize, layout: PageLayout) -> Self {
        let per_paragraph = words_per_paragraph.max(1);
        let units = (0..index.len())
            .map(|idx| UnitInfo {
                word_index: Some(idx),
                paragraph: ParagraphId(idx / per_paragraph),
                text: index
                    .text_of(idx)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("word{idx}")),
            })
            .collect();
        Self::new(units, layout)
    }

    /// Collect `span.w` units from chapter HTML, preferring `.content` paragraphs.
    pub fn from_html(html: &str, layout: PageLayout) -> Result<Self> {
        let units = parse_units(html)?;
        if units.is_empty() {
            bail!("chapter HTML contains no word spans");
        }
        debug!(units = units.len(), "Parsed chapter HTML");
        Ok(Self::new(units, layout))
    }

    pub fn unit_count(&self) -> usize {
        self.state.borrow().units.len()
    }

    pub fn unit_classes(&self, unit: UnitId) -> BTreeSet<UnitClass> {
        self.state
            .borrow()
            .unit_classes
            .get(unit)
            .cloned()
            .unwrap_or_default()
    }

    pub fn has_unit_class(&self, unit: UnitId, class: UnitClass) -> bool {
        self.state
            .borrow()
            .unit_classes
            .get(unit)
            .is_some_and(|classes| classes.contains(&class))
    }

    pub fn units_with_class(&self, class: UnitClass) -> Vec<UnitId> {
        self.state
            .borrow()
            .unit_classes
            .iter()
            .enumerate()
            .filter(|(_, classes)| classes.contains(&class))
            .map(|(unit, _)| unit)
            .collect()
    }

    pub fn has_paragraph_class(&self, paragraph: ParagraphId, class: ParagraphClass) -> bool {
        self.state
            .borrow()
            .paragraph_classes
            .contains(&(paragraph, class))
    }

    pub fn paragraphs_with_class(&self, class: ParagraphClass) -> Vec<ParagraphId> {
        self.state
            .borrow()
            .paragraph_classes
            .iter()
            .filter(|(_, existing)| *existing == class)
            .map(|(paragraph, _)| *paragraph)
            .collect()
    }

    pub fn has_page_class(&self, class: PageClass) -> bool {
        self.state.borrow().page_classes.contains(&class)
    }

    /// True when no unit, paragraph or page class is applied.
    pub fn is_clean(&self) -> bool {
        let state = self.state.borrow();
        state.unit_classes.iter().all(BTreeSet::is_empty)
            && state.paragraph_classes.is_empty()
            && state.page_classes.is_empty()
    }

    /// Number of class writes the page has received.
    pub fn mutations(&self) -> u64 {
        self.state.borrow().mutations
    }

    pub fn programmatic_scrolls(&self) -> u64 {
        self.state.borrow().programmatic_scrolls
    }

    pub fn content_top(&self, unit: UnitId) -> Option<f64> {
        self.state.borrow().tops.get(unit).copied()
    }

    /// Scroll as the reader would; the caller forwards `HostEvent::Scroll`.
    pub fn user_scroll_to(&self, offset: f64) {
        let mut state = self.state.borrow_mut();
        state.scroll_top = clamp_offset(offset, max_scroll(&state));
    }
}

fn max_scroll(state: &PageState) -> f64 {
    (state.content_height - state.layout.viewport_height).max(0.0)
}

fn clamp_offset(offset: f64, max: f64) -> f64 {
    if offset.is_finite() {
        offset.clamp(0.0, max)
    } else {
        0.0
    }
}

impl TranscriptView for HeadlessPage {
    fn collect_units(&self) -> Vec<UnitInfo> {
        self.state.borrow().units.clone()
    }

    fn set_unit_class(&mut self, unit: UnitId, class: UnitClass, on: bool) {
        let mut state = self.state.borrow_mut();
        state.mutations += 1;
        if let Some(classes) = state.unit_classes.get_mut(unit) {
            if on {
                classes.insert(class);
            } else {
                classes.remove(&class);
            }
        }
    }

    fn set_paragraph_class(&mut self, paragraph: ParagraphId, class: ParagraphClass, on: bool) {
        let mut state = self.state.borrow_mut();
        state.mutations += 1;
        let entry = (paragraph, class);
        let present = state.paragraph_classes.contains(&entry);
        if on && !present {
            state.paragraph_classes.push(entry);
        } else if !on && present {
            state.paragraph_classes.retain(|existing| *existing != entry);
        }
    }

    fn set_page_class(&mut self, class: PageClass, on: bool) {
        let mut state = self.state.borrow_mut();
        state.mutations += 1;
        if on {
            state.page_classes.insert(class);
        } else {
            state.page_classes.remove(&class);
        }
    }

    fn unit_rect(&self, unit: UnitId) -> Option<Rect> {
        let state = self.state.borrow();
        let top = *state.tops.get(unit)? - state.scroll_top;
        Some(Rect {
            top,
            bottom: top + state.layout.line_height,
        })
    }

    fn viewport_height(&self) -> f64 {
        self.state.borrow().layout.viewport_height
    }

    fn scroll_top(&self) -> f64 {
        self.state.borrow().scroll_top
    }

    fn max_scroll_top(&self) -> f64 {
        max_scroll(&self.state.borrow())
    }

    fn scroll_to(&mut self, offset: f64) {
        let mut state = self.state.borrow_mut();
        state.scroll_top = clamp_offset(offset, max_scroll(&state));
        state.programmatic_scrolls += 1;
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|err| anyhow!("invalid selector `{css}`: {err}"))
}

fn parse_units(html: &str) -> Result<Vec<UnitInfo>> {
    let document = Html::parse_document(html);
    let content_paragraphs = selector(".content p")?;
    let any_paragraph = selector("p")?;
    let word_span = selector("span.w")?;

    let mut paragraphs: Vec<ElementRef<'_>> = document.select(&content_paragraphs).collect();
    if paragraphs.is_empty() {
        paragraphs = document.select(&any_paragraph).collect();
    }

    let mut units = Vec::new();
    let mut paragraph_id = 0usize;
    for paragraph in paragraphs {
        let before = units.len();
        for span in paragraph.select(&word_span) {
            let word_index = span
                .value()
                .attr("data-i")
                .and_then(|raw| raw.trim().parse::<usize>().ok());
            units.push(UnitInfo {
                word_index,
                paragraph: ParagraphId(paragraph_id),
                text: span.text().collect::<String>().trim().to_string(),
            });
        }
        if units.len() > before {
            paragraph_id += 1;
        }
    }
    Ok(units)
}

#[derive(Debug)]
struct AudioState {
    time: f64,
    duration: f64,
    paused: bool,
    ended: bool,
    refuse_play: bool,
    seeks: Vec<f64>,
    plays: u64,
}

/// Audio track driven by an explicit virtual clock.
#[derive(Debug, Clone)]
pub struct SimulatedAudio {
    state: Rc<RefCell<AudioState>>,
}

impl SimulatedAudio {
    pub fn new(duration: f64) -> Self {
        Self {
            state: Rc::new(RefCell::new(AudioState {
                time: 0.0,
                duration: if duration.is_finite() {
                    duration.max(0.0)
                } else {
                    0.0
                },
                paused: true,
                ended: false,
                refuse_play: false,
                seeks: Vec::new(),
                plays: 0,
            })),
        }
    }

    /// Advance playback; returns `true` when this step reached the end of the track.
    pub fn advance(&self, elapsed: Duration) -> bool {
        let mut state = self.state.borrow_mut();
        if state.paused || state.ended {
            return false;
        }
        state.time += elapsed.as_secs_f64();
        if state.time >= state.duration {
            state.time = state.duration;
            state.paused = true;
            state.ended = true;
            return true;
        }
        false
    }

    pub fn pause(&self) {
        self.state.borrow_mut().paused = true;
    }

    /// Emulate a browser autoplay policy rejecting `play()`.
    pub fn set_refuse_play(&self, refuse: bool) {
        self.state.borrow_mut().refuse_play = refuse;
    }

    pub fn is_ended(&self) -> bool {
        self.state.borrow().ended
    }

    pub fn duration(&self) -> f64 {
        self.state.borrow().duration
    }

    pub fn seeks(&self) -> Vec<f64> {
        self.state.borrow().seeks.clone()
    }

    pub fn plays(&self) -> u64 {
        self.state.borrow().plays
    }
}

impl AudioElement for SimulatedAudio {
    fn current_time(&self) -> f64 {
        self.state.borrow().time
    }

    fn is_paused(&self) -> bool {
        self.state.borrow().paused
    }

    fn seek(&mut self, secs: f64) {
        let mut state = self.state.borrow_mut();
        let target = if secs.is_finite() {
            secs.clamp(0.0, state.duration)
        } else {
            0.0
        };
        state.time = target;
        state.ended = false;
        state.seeks.push(target);
    }

    fn play(&mut self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.refuse_play {
            bail!("playback was refused by the host");
        }
        if state.ended {
            state.time = 0.0;
            state.ended = false;
        }
        state.paused = false;
        state.plays += 1;
        Ok(())
    }
}
