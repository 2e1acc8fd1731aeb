//! Headless follow-along driver.
//!
//! Loads configuration and a chapter's timing index, lays out the chapter
//! transcript on an in-memory page and replays narration against a virtual
//! audio clock at 60 frames per second, so the engine's highlighting and
//! autoscroll decisions can be watched in the log.

use anyhow::{Context, Result, anyhow, bail};
use follow_core::config::load_config;
use follow_core::headless::{HeadlessPage, PageLayout, SimulatedAudio};
use follow_core::render_index::RenderIndex;
use follow_core::timing::{load_timing, source_for_config};
use follow_core::{
    AudioElement, FollowEngine, FollowOptions, HostEvent, LogLevel, TranscriptView, sync_check,
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

const FRAME: Duration = Duration::from_micros(16_667);
const WORDS_PER_PARAGRAPH: usize = 60;
const USAGE: &str = "Usage: follow-along <chapter> [--html PATH] [--words-dir DIR | --base-url URL] \
[--until SECS] [--click N] [--check] [--snapshot] [--realtime]";

static SIGINT_REQUESTED: AtomicBool = AtomicBool::new(false);

fn take_sigint_requested() -> bool {
    SIGINT_REQUESTED.swap(false, Ordering::SeqCst)
}

#[derive(Debug, Default)]
struct CliArgs {
    chapter: u32,
    html: Option<PathBuf>,
    words_dir: Option<String>,
    base_url: Option<String>,
    until: Option<f64>,
    click: Option<usize>,
    check: bool,
    snapshot: bool,
    realtime: bool,
}

fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle) {
        error!("{err:?}");
        std::process::exit(1);
    }
}

fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let args = parse_args(env::args().skip(1))?;
    let mut config = load_config(Path::new("conf/config.toml"));
    if let Some(words_dir) = &args.words_dir {
        config.words_dir = words_dir.clone();
    }
    if args.base_url.is_some() {
        config.base_url = args.base_url.clone();
    }
    let config = config.sanitized();
    set_log_level(reload_handle, config.log_level);
    info!(
        chapter = args.chapter,
        level = %config.log_level,
        words_dir = %config.words_dir,
        base_url = config.base_url.as_deref().unwrap_or("-"),
        "Starting follow-along replay"
    );

    let source = source_for_config(&config)?;
    let timings = load_timing(source.as_ref(), args.chapter)?;
    let summary = timings.summary();
    info!(
        words = summary.word_count,
        first_start = summary.first_start,
        last_start = summary.last_start,
        longest_gap_secs = summary.longest_gap_secs,
        "Timing summary"
    );

    let page = match &args.html {
        Some(path) => {
            let html = fs::read_to_string(path)
                .with_context(|| format!("reading chapter HTML {}", path.display()))?;
            HeadlessPage::from_html(&html, PageLayout::default())?
        }
        None => HeadlessPage::from_timing(&timings, WORDS_PER_PARAGRAPH, PageLayout::default()),
    };

    if args.check {
        let index = RenderIndex::build_from_view(&page, timings.len())?;
        let report = sync_check::check(&timings, &index);
        print!("{}", report.render(20));
    }

    let duration = timings.duration();
    let audio = SimulatedAudio::new(duration);
    let options = FollowOptions::default()
        .on_enabled(|| info!("Follow mode enabled"))
        .on_disabled(|| info!("Follow mode disabled"));
    let mut engine = FollowEngine::new(config);
    if !engine.bind(timings, audio.clone(), page.clone(), options) {
        bail!("follow-along is unavailable for chapter {}", args.chapter);
    }

    if args.realtime {
        if let Err(err) = ctrlc::set_handler(|| SIGINT_REQUESTED.store(true, Ordering::SeqCst)) {
            warn!("Failed to install Ctrl+C signal handler: {err}");
        }
    }

    let base = Instant::now();
    match args.click {
        Some(word_index) => engine.handle(HostEvent::WordClicked { word_index }, base),
        None => {
            engine.enable_follow();
            let mut handle = audio.clone();
            handle.play().context("starting simulated playback")?;
            engine.handle(HostEvent::Play, base);
        }
    }

    let until = args.until.unwrap_or(duration).min(duration);
    replay(&mut engine, &audio, &page, base, until, args.realtime);

    let snapshot = engine.snapshot();
    info!(
        current_word = ?snapshot.current_word,
        autoscrolls = snapshot.autoscrolls_started,
        mode = ?snapshot.mode,
        "Replay finished"
    );
    if args.snapshot {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }
    engine.destroy();
    Ok(())
}

fn replay(
    engine: &mut FollowEngine<SimulatedAudio, HeadlessPage>,
    audio: &SimulatedAudio,
    page: &HeadlessPage,
    base: Instant,
    until: f64,
    realtime: bool,
) {
    let mut clock = Duration::ZERO;
    let mut last_word = None;
    let mut seen_scrolls = page.programmatic_scrolls();

    while audio.current_time() < until && !audio.is_ended() {
        if realtime {
            std::thread::sleep(FRAME);
            if take_sigint_requested() {
                warn!("Interrupted; stopping replay");
                break;
            }
        }
        clock += FRAME;
        let now = base + clock;

        if audio.advance(FRAME) {
            engine.handle(HostEvent::Ended, now);
        }
        engine.on_frame(now);

        // A browser reports programmatic scrolling as ordinary scroll events.
        let scrolls = page.programmatic_scrolls();
        if scrolls != seen_scrolls {
            seen_scrolls = scrolls;
            engine.handle(HostEvent::Scroll, now);
        }
        engine.poll_timers(now);

        let word = engine.snapshot().current_word;
        if word != last_word {
            debug!(word = ?word, time = audio.current_time(), scroll_top = page.scroll_top(), "Spoken word");
            last_word = word;
        }
        if audio.is_paused() && !engine.needs_frame() && engine.next_deadline().is_none() {
            break;
        }
    }
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<CliArgs> {
    let chapter = args
        .next()
        .ok_or_else(|| anyhow!(USAGE))?
        .parse::<u32>()
        .with_context(|| format!("chapter must be a number\n{USAGE}"))?;
    let mut parsed = CliArgs {
        chapter,
        ..CliArgs::default()
    };

    while let Some(flag) = args.next() {
        let mut value = |name: &str| {
            args.next()
                .ok_or_else(|| anyhow!("{name} expects a value\n{USAGE}"))
        };
        match flag.as_str() {
            "--html" => parsed.html = Some(PathBuf::from(value("--html")?)),
            "--words-dir" => parsed.words_dir = Some(value("--words-dir")?),
            "--base-url" => parsed.base_url = Some(value("--base-url")?),
            "--until" => {
                parsed.until = Some(
                    value("--until")?
                        .parse()
                        .context("--until expects seconds")?,
                )
            }
            "--click" => {
                parsed.click = Some(
                    value("--click")?
                        .parse()
                        .context("--click expects a word index")?,
                )
            }
            "--check" => parsed.check = true,
            "--snapshot" => parsed.snapshot = true,
            "--realtime" => parsed.realtime = true,
            other => bail!("unknown argument `{other}`\n{USAGE}"),
        }
    }

    if parsed.words_dir.is_some() && parsed.base_url.is_some() {
        bail!("--words-dir and --base-url are mutually exclusive\n{USAGE}");
    }
    Ok(parsed)
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(crate_directives(LogLevel::default().as_filter_str())));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_filter(filter_layer))
        .init();
    handle
}

/// Level directives for the engine and this driver; dependencies stay at warn.
fn crate_directives(level: &str) -> String {
    format!("warn,follow_along={level},follow_core={level}")
}

fn set_log_level(handle: &ReloadHandle, level: LogLevel) {
    if env::var_os("RUST_LOG").is_some() {
        debug!("RUST_LOG set; replay keeps the environment filter");
        return;
    }
    let directives = crate_directives(level.as_filter_str());
    match EnvFilter::builder().parse(&directives) {
        Ok(filter) => {
            if let Err(err) = handle.modify(|current| *current = filter) {
                warn!(%level, "Could not apply replay log level: {err}");
            }
        }
        Err(err) => warn!(%directives, "Invalid log directives: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<CliArgs> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn parses_chapter_and_flags() {
        let parsed = args(&["3", "--until", "12.5", "--click", "40", "--check", "--snapshot"])
            .expect("parses");
        assert_eq!(parsed.chapter, 3);
        assert_eq!(parsed.until, Some(12.5));
        assert_eq!(parsed.click, Some(40));
        assert!(parsed.check && parsed.snapshot && !parsed.realtime);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(args(&[]).is_err());
        assert!(args(&["three"]).is_err());
        assert!(args(&["1", "--html"]).is_err());
        assert!(args(&["1", "--bogus"]).is_err());
        assert!(args(&["1", "--words-dir", "w", "--base-url", "http://x"]).is_err());
    }

    #[test]
    fn log_directives_scope_level_to_engine_crates() {
        let directives = crate_directives(LogLevel::Warn.as_filter_str());
        assert_eq!(directives, "warn,follow_along=warn,follow_core=warn");
        assert!(EnvFilter::builder().parse(&directives).is_ok());
    }

    #[test]
    fn replay_reaches_the_end_of_a_short_chapter() {
        let timings = follow_core::TimingIndex::from_json(
            1,
            r#"{"words": [[0.0, 0.2, "a"], [0.3, 0.5, "b"], [0.6, 0.8, "c"]]}"#,
        )
        .expect("valid");
        let page = HeadlessPage::from_timing(&timings, 10, PageLayout::default());
        let audio = SimulatedAudio::new(timings.duration());
        let mut engine = FollowEngine::new(follow_core::FollowConfig::default());
        assert!(engine.bind(timings, audio.clone(), page.clone(), FollowOptions::default()));

        let base = Instant::now();
        engine.enable_follow();
        let mut handle = audio.clone();
        handle.play().expect("plays");
        engine.handle(HostEvent::Play, base);
        replay(&mut engine, &audio, &page, base, 10.0, false);

        assert!(audio.is_ended());
        assert!(!engine.is_follow_active());
    }
}
