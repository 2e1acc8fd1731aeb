//! Timing store: loads and validates a chapter's word-timing index.
//!
//! The index is published per chapter as `chapter-NN-words.json` with an
//! ordered `words` array of `[start, end?, "word"?]` rows. Anything missing
//! or malformed is reported as an error; the engine turns that into
//! "unavailable" rather than failing the host.

use crate::config::FollowConfig;
use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// One timed word, addressable by its position in the index.
#[derive(Debug, Clone, PartialEq)]
pub struct WordEntry {
    pub start: f64,
    pub end: Option<f64>,
    pub text: Option<String>,
}

impl WordEntry {
    pub fn new(start: f64, end: Option<f64>) -> Self {
        Self {
            start,
            end,
            text: None,
        }
    }
}

/// Immutable, start-ordered word timings for one chapter.
#[derive(Debug, Clone)]
pub struct TimingIndex {
    chapter: u32,
    duration: Option<f64>,
    words: Vec<WordEntry>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TimingSummary {
    pub chapter: u32,
    pub word_count: usize,
    pub first_start: f64,
    pub last_start: f64,
    pub duration: Option<f64>,
    pub longest_gap_secs: f64,
    pub longest_gap_after: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct TimingPayload {
    #[serde(default)]
    chapter: Option<u32>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    word_count: Option<usize>,
    #[serde(default)]
    words: Option<Vec<Value>>,
}

impl TimingIndex {
    pub fn new(chapter: u32, words: Vec<WordEntry>) -> Result<Self> {
        Self::with_duration(chapter, words, None)
    }

    pub fn with_duration(
        chapter: u32,
        mut words: Vec<WordEntry>,
        duration: Option<f64>,
    ) -> Result<Self> {
        if words.is_empty() {
            bail!("chapter {chapter} timing index has no words");
        }

        let mut previous = f64::NEG_INFINITY;
        for (idx, word) in words.iter_mut().enumerate() {
            if !word.start.is_finite() || word.start < 0.0 {
                bail!("word {idx} has invalid start time {}", word.start);
            }
            if word.start < previous {
                bail!(
                    "word {idx} starts at {} before the previous word at {previous}",
                    word.start
                );
            }
            previous = word.start;

            if let Some(end) = word.end {
                if !end.is_finite() || end < word.start {
                    warn!(
                        idx,
                        start = word.start,
                        end,
                        "Dropping end time that precedes word start"
                    );
                    word.end = None;
                }
            }
        }

        let duration = duration.filter(|secs| secs.is_finite() && *secs > 0.0);
        Ok(Self {
            chapter,
            duration,
            words,
        })
    }

    /// Parse the published JSON payload for `chapter`.
    pub fn from_json(chapter: u32, payload: &str) -> Result<Self> {
        let parsed: TimingPayload =
            serde_json::from_str(payload).context("timing payload is not valid JSON")?;
        let rows = parsed
            .words
            .ok_or_else(|| anyhow!("timing payload has no `words` key"))?;

        if let Some(declared) = parsed.chapter.filter(|declared| *declared != chapter) {
            warn!(
                requested = chapter,
                declared, "Timing payload declares a different chapter"
            );
        }
        if let Some(declared) = parsed.word_count.filter(|count| *count != rows.len()) {
            warn!(
                declared,
                actual = rows.len(),
                "Timing payload word_count disagrees with its rows"
            );
        }

        let words = rows
            .iter()
            .enumerate()
            .map(|(idx, row)| parse_row(idx, row))
            .collect::<Result<Vec<_>>>()?;
        Self::with_duration(chapter, words, parsed.duration)
    }

    pub fn chapter(&self) -> u32 {
        self.chapter
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn words(&self) -> &[WordEntry] {
        &self.words
    }

    pub fn start_of(&self, idx: usize) -> Option<f64> {
        self.words.get(idx).map(|word| word.start)
    }

    pub fn text_of(&self, idx: usize) -> Option<&str> {
        self.words.get(idx).and_then(|word| word.text.as_deref())
    }

    /// Declared duration, or the end of the last timed word.
    pub fn duration(&self) -> f64 {
        if let Some(duration) = self.duration {
            return duration;
        }
        self.words
            .last()
            .map(|word| word.end.unwrap_or(word.start))
            .unwrap_or(0.0)
    }

    /// Greatest index whose start is at or before `time`; `None` during lead-in.
    pub fn index_at(&self, time: f64) -> Option<usize> {
        if time.is_nan() {
            return None;
        }
        self.words
            .partition_point(|word| word.start <= time)
            .checked_sub(1)
    }

    pub fn summary(&self) -> TimingSummary {
        let mut longest_gap_secs = 0.0f64;
        let mut longest_gap_after = None;
        for (idx, pair) in self.words.windows(2).enumerate() {
            let spoken_until = pair[0].end.unwrap_or(pair[0].start);
            let gap = (pair[1].start - spoken_until).max(0.0);
            if gap > longest_gap_secs {
                longest_gap_secs = gap;
                longest_gap_after = Some(idx);
            }
        }

        TimingSummary {
            chapter: self.chapter,
            word_count: self.words.len(),
            first_start: self.words.first().map(|w| w.start).unwrap_or(0.0),
            last_start: self.words.last().map(|w| w.start).unwrap_or(0.0),
            duration: Some(self.duration()).filter(|secs| *secs > 0.0),
            longest_gap_secs,
            longest_gap_after,
        }
    }
}

fn parse_row(idx: usize, row: &Value) -> Result<WordEntry> {
    let items = row
        .as_array()
        .ok_or_else(|| anyhow!("word {idx} is not an array"))?;
    let start = items
        .first()
        .and_then(Value::as_f64)
        .ok_or_else(|| anyhow!("word {idx} has no numeric start time"))?;
    let end = match items.get(1) {
        None | Some(Value::Null) => None,
        Some(value) => Some(
            value
                .as_f64()
                .ok_or_else(|| anyhow!("word {idx} has a non-numeric end time"))?,
        ),
    };
    let text = items
        .get(2)
        .and_then(Value::as_str)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty());
    Ok(WordEntry { start, end, text })
}

/// File name of a chapter's timing index, keyed by zero-padded chapter number.
pub fn timing_file_name(chapter: u32) -> String {
    format!("chapter-{chapter:02}-words.json")
}

/// Where a chapter's timing payload comes from.
pub trait TimingSource {
    fn fetch(&self, chapter: u32) -> Result<String>;
    fn describe(&self, chapter: u32) -> String;
}

pub struct FileTimingSource {
    root: PathBuf,
}

impl FileTimingSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, chapter: u32) -> PathBuf {
        self.root.join(timing_file_name(chapter))
    }
}

impl TimingSource for FileTimingSource {
    fn fetch(&self, chapter: u32) -> Result<String> {
        let path = self.path_for(chapter);
        fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))
    }

    fn describe(&self, chapter: u32) -> String {
        self.path_for(chapter).display().to_string()
    }
}

pub struct HttpTimingSource {
    base_url: String,
    words_dir: String,
    client: reqwest::blocking::Client,
}

impl HttpTimingSource {
    pub fn new(base_url: &str, words_dir: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            words_dir: words_dir.trim_matches('/').to_string(),
            client,
        })
    }

    pub fn url_for(&self, chapter: u32) -> String {
        if self.words_dir.is_empty() {
            format!("{}/{}", self.base_url, timing_file_name(chapter))
        } else {
            format!(
                "{}/{}/{}",
                self.base_url,
                self.words_dir,
                timing_file_name(chapter)
            )
        }
    }
}

impl TimingSource for HttpTimingSource {
    fn fetch(&self, chapter: u32) -> Result<String> {
        let url = self.url_for(chapter);
        debug!(%url, "Fetching timing index");
        let response = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("requesting {url}"))?
            .error_for_status()
            .with_context(|| format!("fetching {url}"))?;
        response
            .text()
            .with_context(|| format!("reading body of {url}"))
    }

    fn describe(&self, chapter: u32) -> String {
        self.url_for(chapter)
    }
}

/// Pick the HTTP source when a base URL is configured, the filesystem otherwise.
pub fn source_for_config(config: &FollowConfig) -> Result<Box<dyn TimingSource>> {
    match config.base_url.as_deref() {
        Some(base_url) => Ok(Box::new(HttpTimingSource::new(
            base_url,
            &config.words_dir,
        )?)),
        None => Ok(Box::new(FileTimingSource::new(&config.words_dir))),
    }
}

pub fn load_timing(source: &dyn TimingSource, chapter: u32) -> Result<TimingIndex> {
    let payload = source
        .fetch(chapter)
        .with_context(|| format!("timing index unavailable at {}", source.describe(chapter)))?;
    let index = TimingIndex::from_json(chapter, &payload)
        .with_context(|| format!("malformed timing index at {}", source.describe(chapter)))?;
    info!(
        chapter,
        words = index.len(),
        duration_secs = index.duration(),
        "Loaded timing index"
    );
    Ok(index)
}
