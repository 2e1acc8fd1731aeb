//! The boundary between the engine and the page hosting it.
//!
//! The host owns the audio element and the rendered transcript; the engine
//! only reads them and toggles presentational classes.

use anyhow::Result;

/// Position of a rendered unit in document order.
pub type UnitId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParagraphId(pub usize);

/// A word-level span as collected from the rendered transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitInfo {
    /// Index into the timing resource; `None` for dead words.
    pub word_index: Option<usize>,
    pub paragraph: ParagraphId,
    pub text: String,
}

/// Vertical extent of a unit, relative to the top of the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub top: f64,
    pub bottom: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UnitClass {
    Active,
    Transitional,
    Read,
    Clicked,
}

impl UnitClass {
    pub fn css_class(self) -> &'static str {
        match self {
            UnitClass::Active => "active",
            UnitClass::Transitional => "transitional",
            UnitClass::Read => "read",
            UnitClass::Clicked => "clicked",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParagraphClass {
    LineActive,
    LineScrolledTo,
}

impl ParagraphClass {
    pub fn css_class(self) -> &'static str {
        match self {
            ParagraphClass::LineActive => "line-active",
            ParagraphClass::LineScrolledTo => "line-scrolled-to",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PageClass {
    FollowMode,
}

impl PageClass {
    pub fn css_class(self) -> &'static str {
        match self {
            PageClass::FollowMode => "follow-mode",
        }
    }
}

/// The host's playback source. Shared with the host, never destroyed here.
pub trait AudioElement {
    fn current_time(&self) -> f64;
    fn is_paused(&self) -> bool;
    fn seek(&mut self, secs: f64);
    /// Start playback; the host may refuse.
    fn play(&mut self) -> Result<()>;
}

/// The rendered transcript and the viewport scrolling it.
pub trait TranscriptView {
    fn collect_units(&self) -> Vec<UnitInfo>;
    fn set_unit_class(&mut self, unit: UnitId, class: UnitClass, on: bool);
    fn set_paragraph_class(&mut self, paragraph: ParagraphId, class: ParagraphClass, on: bool);
    fn set_page_class(&mut self, class: PageClass, on: bool);
    fn unit_rect(&self, unit: UnitId) -> Option<Rect>;
    fn viewport_height(&self) -> f64;
    fn scroll_top(&self) -> f64;
    fn max_scroll_top(&self) -> f64;
    fn scroll_to(&mut self, offset: f64);
}

/// Events the host forwards from its audio element and transcript.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostEvent {
    Play,
    Pause,
    Ended,
    Seeked,
    Scroll,
    WordClicked { word_index: usize },
}
