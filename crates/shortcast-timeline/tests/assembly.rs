//! End-to-end timeline assembly tests with in-memory collaborators.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio_test::{assert_err, assert_ok};

use shortcast_models::{AssetRef, CardStyle, SegmentId, TimingEvent, VisualSource};
use shortcast_timeline::{
    normalize, schedule_all, schedule_segment, validate_schedule, Candidates, CandidateSlot,
    DurationSelector, FrameRenderer, OverlayCompiler, RenderRequest, SkipReason,
    SpeechSynthesizer, SynthesisOutput, SynthesisRequest, TimelineError, TimelineResult,
    FALLBACK_COMMENT_COUNT,
};

/// What the fake engine does for a given text.
#[derive(Clone)]
enum Script {
    /// Audio of this length; words spread evenly across it
    Timed(f64),
    /// Audio of this length without word timings
    Untimed(f64),
    Fail,
    Hang,
}

struct FakeSynth {
    scripts: HashMap<String, Script>,
    calls: Mutex<Vec<String>>,
    /// Flipped to true after this many calls
    cancel_after: Option<(usize, watch::Sender<bool>)>,
}

impl FakeSynth {
    fn new(scripts: &[(&str, Script)]) -> Self {
        Self {
            scripts: scripts
                .iter()
                .map(|(text, script)| (text.to_string(), script.clone()))
                .collect(),
            calls: Mutex::new(Vec::new()),
            cancel_after: None,
        }
    }

    fn cancelling_after(mut self, calls: usize, tx: watch::Sender<bool>) -> Self {
        self.cancel_after = Some((calls, tx));
        self
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

fn spread_words(text: &str, duration: f64) -> Vec<TimingEvent> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let step = duration / (words.len() as f64 + 1.0);
    words
        .iter()
        .enumerate()
        .map(|(i, w)| TimingEvent::new(*w, i as f64 * step, step * 0.8))
        .collect()
}

#[async_trait]
impl SpeechSynthesizer for FakeSynth {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> TimelineResult<SynthesisOutput> {
        let count = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(request.text.clone());
            calls.len()
        };
        if let Some((after, tx)) = &self.cancel_after {
            if count >= *after {
                let _ = tx.send(true);
            }
        }

        let script = self
            .scripts
            .get(&request.text)
            .cloned()
            .unwrap_or(Script::Fail);
        match script {
            Script::Timed(duration) => Ok(SynthesisOutput {
                audio_path: request.output_path.clone(),
                audio_duration: duration,
                events: spread_words(&request.text, duration),
            }),
            Script::Untimed(duration) => Ok(SynthesisOutput {
                audio_path: request.output_path.clone(),
                audio_duration: duration,
                events: Vec::new(),
            }),
            Script::Fail => Err(TimelineError::synthesis("engine rejected text")),
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(TimelineError::synthesis("unreachable"))
            }
        }
    }
}

#[derive(Default)]
struct FakeRenderer {
    rendered: Mutex<Vec<RenderRequest>>,
}

#[async_trait]
impl FrameRenderer for FakeRenderer {
    async fn render(&self, request: &RenderRequest) -> TimelineResult<AssetRef> {
        self.rendered.lock().unwrap().push(request.clone());
        Ok(AssetRef::new(format!("frames/{}.png", request.file_stem())))
    }
}

fn candidates(title: &str, comments: &[&str]) -> Candidates {
    Candidates {
        title: VisualSource::Title {
            text: title.to_string(),
            subreddit: "AskReddit".to_string(),
        },
        comments: comments
            .iter()
            .map(|c| VisualSource::Comment {
                text: c.to_string(),
                author: "user".to_string(),
                score: 100,
            })
            .collect(),
    }
}

fn selector(synth: Arc<FakeSynth>, dir: &Path) -> DurationSelector {
    DurationSelector::new(synth, dir)
}

#[tokio::test]
async fn scenario_a_stops_once_target_reached() {
    let dir = tempfile::tempdir().unwrap();
    let synth = Arc::new(FakeSynth::new(&[
        ("Title", Script::Untimed(5.0)),
        ("first", Script::Untimed(30.0)),
        ("second", Script::Untimed(40.0)),
        ("third", Script::Untimed(60.0)),
    ]));

    let selection = assert_ok!(
        selector(synth.clone(), dir.path())
            .select(&candidates("Title", &["first", "second", "third"]), 90.0, None)
            .await
    );

    let ids: Vec<String> = selection.segments.iter().map(|s| s.id.to_string()).collect();
    assert_eq!(ids, vec!["title", "comment_0", "comment_1", "comment_2"]);
    assert!((selection.total_duration() - 135.0).abs() < 1e-9);
    assert_eq!(synth.call_count(), 4);
}

#[test]
fn scenario_b_progressive_frames() {
    let segment = shortcast_models::Segment::new(
        SegmentId::title(),
        2.0,
        vec![
            TimingEvent::new("Hello", 0.0, 0.5),
            TimingEvent::new("world", 0.5, 0.5),
        ],
        VisualSource::Title {
            text: "Hello world".to_string(),
            subreddit: "AskReddit".to_string(),
        },
        "title.mp3",
    );

    let frames = schedule_segment(&segment).frames;
    let got: Vec<(&str, f64, f64)> = frames
        .iter()
        .map(|f| (f.visual_state.text(), f.local_start, f.local_end))
        .collect();
    assert_eq!(got, vec![("Hello", 0.0, 0.5), ("Hello world", 0.5, 2.0)]);
}

#[tokio::test]
async fn scenario_c_zero_target_uses_fixed_count() {
    let dir = tempfile::tempdir().unwrap();
    let synth = Arc::new(FakeSynth::new(&[
        ("Title", Script::Untimed(5.0)),
        ("a", Script::Untimed(10.0)),
        ("b", Script::Fail),
        ("c", Script::Untimed(10.0)),
        ("d", Script::Untimed(10.0)),
        ("e", Script::Untimed(10.0)),
    ]));

    let selection = selector(synth.clone(), dir.path())
        .select(&candidates("Title", &["a", "b", "c", "d", "e"]), 0.0, None)
        .await
        .unwrap();

    assert_eq!(selection.comment_count(), FALLBACK_COMMENT_COUNT);
    assert!(!selection.cancelled);
    // e is never synthesized
    assert_eq!(synth.call_count(), 5);
}

#[tokio::test]
async fn scenario_d_windows_shift_by_segment_offset() {
    let dir = tempfile::tempdir().unwrap();
    let synth = Arc::new(FakeSynth::new(&[
        ("Big question here", Script::Timed(5.0)),
        ("short answer", Script::Timed(3.0)),
    ]));
    let selection = selector(synth, dir.path())
        .select(&candidates("Big question here", &["short answer"]), 6.0, None)
        .await
        .unwrap();

    let offsets = normalize(&selection.segments);
    assert_eq!(offsets.offset_of(&SegmentId::title()), Some(0.0));
    assert_eq!(offsets.offset_of(&SegmentId::comment(0)), Some(5.0));

    let schedules = schedule_all(&selection.segments);
    let renderer = Arc::new(FakeRenderer::default());
    let compiler = OverlayCompiler::new(renderer, CardStyle::default());
    let windows = compiler
        .compile(&offsets, &selection.segments, &schedules)
        .await
        .unwrap();

    let local = &schedules[1].frames;
    let global: Vec<_> = windows
        .iter()
        .filter(|w| w.segment_id == SegmentId::comment(0))
        .collect();
    assert_eq!(local.len(), global.len());
    for (frame, window) in local.iter().zip(global) {
        assert!((window.global_start - (frame.local_start + 5.0)).abs() < 1e-9);
        assert!((window.global_end - (frame.local_end + 5.0)).abs() < 1e-9);
    }
    validate_schedule(&windows, 8.0).unwrap();
}

#[tokio::test]
async fn title_meeting_target_selects_no_comments() {
    let dir = tempfile::tempdir().unwrap();
    let synth = Arc::new(FakeSynth::new(&[
        ("Title", Script::Untimed(12.0)),
        ("a", Script::Untimed(10.0)),
    ]));

    let selection = selector(synth.clone(), dir.path())
        .select(&candidates("Title", &["a"]), 10.0, None)
        .await
        .unwrap();

    assert_eq!(selection.segments.len(), 1);
    assert!(selection.has_title());
    assert_eq!(synth.call_count(), 1);
}

#[tokio::test]
async fn at_least_one_comment_when_target_exceeds_title() {
    let dir = tempfile::tempdir().unwrap();
    let synth = Arc::new(FakeSynth::new(&[
        ("Title", Script::Untimed(5.0)),
        ("huge", Script::Untimed(500.0)),
    ]));

    let selection = selector(synth, dir.path())
        .select(&candidates("Title", &["huge"]), 6.0, None)
        .await
        .unwrap();
    assert_eq!(selection.comment_count(), 1);
}

#[tokio::test]
async fn failed_candidates_are_skipped_and_ids_compacted() {
    let dir = tempfile::tempdir().unwrap();
    let synth = Arc::new(FakeSynth::new(&[
        ("Title", Script::Untimed(5.0)),
        ("ok one", Script::Untimed(10.0)),
        ("ok two", Script::Untimed(10.0)),
    ]));

    let selection = selector(synth, dir.path())
        .select(
            &candidates("Title", &["broken", "ok one", "also broken", "ok two"]),
            100.0,
            None,
        )
        .await
        .unwrap();

    let ids: Vec<String> = selection.segments.iter().map(|s| s.id.to_string()).collect();
    assert_eq!(ids, vec!["title", "comment_0", "comment_1"]);
    assert_eq!(selection.segments[2].text(), "ok two");
    assert!(selection.segments[2]
        .audio_path
        .ends_with("comment_3.mp3"));

    let skipped: Vec<CandidateSlot> = selection.skipped.iter().map(|s| s.slot).collect();
    assert_eq!(
        skipped,
        vec![CandidateSlot::Comment(0), CandidateSlot::Comment(2)]
    );
}

#[tokio::test]
async fn title_failure_continues_with_comments() {
    let dir = tempfile::tempdir().unwrap();
    let synth = Arc::new(FakeSynth::new(&[("only comment", Script::Untimed(4.0))]));

    let selection = selector(synth, dir.path())
        .select(&candidates("bad title", &["only comment"]), 30.0, None)
        .await
        .unwrap();

    assert!(!selection.has_title());
    assert_eq!(selection.segments.len(), 1);
    assert_eq!(selection.segments[0].id, SegmentId::comment(0));
    assert_eq!(selection.skipped[0].slot, CandidateSlot::Title);
}

#[tokio::test]
async fn total_failure_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let synth = Arc::new(FakeSynth::new(&[]));

    let err = assert_err!(
        selector(synth, dir.path())
            .select(&candidates("t", &["a", "b"]), 30.0, None)
            .await
    );
    assert!(matches!(err, TimelineError::TotalSelectionFailure { attempted: 3 }));
}

#[tokio::test(start_paused = true)]
async fn hung_synthesis_times_out_and_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let synth = Arc::new(FakeSynth::new(&[
        ("Title", Script::Untimed(5.0)),
        ("stuck", Script::Hang),
        ("fine", Script::Untimed(10.0)),
    ]));

    let selection = selector(synth, dir.path())
        .with_timeout(Duration::from_secs(5))
        .select(&candidates("Title", &["stuck", "fine"]), 60.0, None)
        .await
        .unwrap();

    assert_eq!(selection.comment_count(), 1);
    assert_eq!(selection.skipped[0].reason, SkipReason::TimedOut);
}

#[tokio::test]
async fn cancellation_keeps_accepted_segments() {
    let dir = tempfile::tempdir().unwrap();
    let (tx, rx) = watch::channel(false);
    let synth = Arc::new(
        FakeSynth::new(&[
            ("Title", Script::Untimed(5.0)),
            ("a", Script::Untimed(10.0)),
            ("b", Script::Untimed(10.0)),
            ("c", Script::Untimed(10.0)),
        ])
        .cancelling_after(2, tx),
    );

    let selection = selector(synth.clone(), dir.path())
        .select(&candidates("Title", &["a", "b", "c"]), 100.0, Some(rx))
        .await
        .unwrap();

    assert!(selection.cancelled);
    assert_eq!(selection.segments.len(), 2);
    assert_eq!(synth.call_count(), 2);
}

#[tokio::test]
async fn full_pipeline_covers_timeline_and_renders_once_per_state() {
    let dir = tempfile::tempdir().unwrap();
    let synth = Arc::new(FakeSynth::new(&[
        ("Why is the sky blue", Script::Timed(3.2)),
        ("Rayleigh scattering mostly", Script::Timed(2.7)),
        ("No timings for me", Script::Untimed(1.9)),
        ("Because it reflects the ocean", Script::Timed(4.4)),
    ]));

    let selection = selector(synth, dir.path())
        .select(
            &candidates(
                "Why is the sky blue",
                &[
                    "Rayleigh scattering mostly",
                    "No timings for me",
                    "Because it reflects the ocean",
                ],
            ),
            60.0,
            None,
        )
        .await
        .unwrap();
    assert_eq!(selection.segments.len(), 4);

    let offsets = normalize(&selection.segments);
    let starts: Vec<f64> = offsets.iter().map(|o| o.offset).collect();
    assert!(starts.windows(2).all(|w| w[0] < w[1]));

    let schedules = schedule_all(&selection.segments);
    for (schedule, segment) in schedules.iter().zip(&selection.segments) {
        let covered: f64 = schedule.frames.iter().map(|f| f.duration()).sum();
        assert!((covered - segment.audio_duration).abs() < 1e-9);
    }

    let renderer = Arc::new(FakeRenderer::default());
    let compiler = OverlayCompiler::new(renderer.clone(), CardStyle::default());
    let windows = compiler
        .compile(&offsets, &selection.segments, &schedules)
        .await
        .unwrap();

    assert!(windows
        .windows(2)
        .all(|w| w[0].global_start <= w[1].global_start));
    validate_schedule(&windows, offsets.total_duration()).unwrap();

    let total: f64 = windows.iter().map(|w| w.duration()).sum();
    assert!((total - offsets.total_duration()).abs() < 1e-9);

    let expected_renders: usize = schedules.iter().map(|s| s.frames.len()).sum();
    assert_eq!(renderer.rendered.lock().unwrap().len(), expected_renders);

    let untimed: Vec<_> = windows
        .iter()
        .filter(|w| w.segment_id == SegmentId::comment(1))
        .collect();
    assert_eq!(untimed.len(), 1);
}
