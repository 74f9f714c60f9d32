//! End-to-end production of one narrated video.
//!
//! fetch -> select -> normalize -> schedule -> compile -> concat -> mux

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use tokio::sync::{watch, Mutex};
use tracing::{debug, warn};

use shortcast_media::{synthesizer_from_config, Background, FfmpegCardRenderer, FfmpegMuxer, MuxJob, MuxLayout};
use shortcast_models::timestamp::format_seconds;
use shortcast_models::{FactoryConfig, OverlayWindow, RedditThread};
use shortcast_timeline::{
    fetch_limit, normalize, schedule_all, validate_schedule, write_timing_dump, Candidates,
    ContentSource, DurationSelector, FrameRenderer, OverlayCompiler, Selection, SpeechSynthesizer,
    TimelineOffsets,
};

use crate::error::{WorkerError, WorkerResult};
use crate::ledger::ProducedLedger;
use crate::logging::JobLogger;
use crate::reddit::{extract_thread_id, RedditSource};

/// The assembled timeline for one thread, ready for muxing.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub selection: Selection,
    pub offsets: TimelineOffsets,
    pub windows: Vec<OverlayWindow>,
}

impl Assembly {
    pub fn total_duration(&self) -> f64 {
        self.offsets.total_duration()
    }
}

/// Summary of a finished video.
#[derive(Debug, Clone)]
pub struct ProducedVideo {
    pub thread_id: String,
    pub output: PathBuf,
    pub duration: f64,
    pub comments: usize,
    pub windows: usize,
}

impl ProducedVideo {
    /// One-line description for logs, e.g. `out.mp4 (00:01:30, 4 comments)`.
    pub fn summary(&self) -> String {
        format!(
            "{} ({}, {} comments)",
            self.output.display(),
            format_seconds(self.duration),
            self.comments
        )
    }
}

/// Produces videos from thread references using the configured collaborators.
pub struct VideoFactory {
    config: FactoryConfig,
    source: Arc<dyn ContentSource>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    renderer: Option<Arc<dyn FrameRenderer>>,
    muxer: FfmpegMuxer,
    ledger: Mutex<ProducedLedger>,
}

impl VideoFactory {
    /// Build a factory with the Reddit source, configured voice chain and
    /// FFmpeg card renderer.
    pub async fn new(config: FactoryConfig) -> WorkerResult<Self> {
        let source = Arc::new(RedditSource::new(&config.reddit)?);
        let synthesizer = synthesizer_from_config(&config.voice);
        let ledger = ProducedLedger::load(&config.output.ledger_path).await?;

        Ok(Self {
            config,
            source,
            synthesizer,
            renderer: None,
            muxer: FfmpegMuxer::new(),
            ledger: Mutex::new(ledger),
        })
    }

    pub fn with_source(mut self, source: Arc<dyn ContentSource>) -> Self {
        self.source = source;
        self
    }

    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    /// Use one renderer for every run instead of a per-run card renderer.
    pub fn with_renderer(mut self, renderer: Arc<dyn FrameRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn config(&self) -> &FactoryConfig {
        &self.config
    }

    fn renderer_for(&self, run_dir: &Path) -> Arc<dyn FrameRenderer> {
        match &self.renderer {
            Some(renderer) => Arc::clone(renderer),
            None => Arc::new(FfmpegCardRenderer::new(run_dir.join("frames"))),
        }
    }

    /// Produce the video for a thread URL or id.
    ///
    /// Already-produced threads fail with [`WorkerError::AlreadyProduced`]
    /// before anything is fetched. The run's scratch directory is removed
    /// afterwards unless `keep_temp` is set.
    pub async fn produce(
        &self,
        input: &str,
        cancel: Option<watch::Receiver<bool>>,
    ) -> WorkerResult<ProducedVideo> {
        let thread_id = extract_thread_id(input)?;
        let logger = JobLogger::new(&thread_id);

        if self.ledger.lock().await.is_produced(&thread_id) {
            logger.log_warning("thread already produced, skipping");
            return Err(WorkerError::AlreadyProduced(thread_id));
        }

        logger.log_start(input);
        let started = Instant::now();
        let run_dir = self.config.output.work_dir.join(&thread_id);
        tokio::fs::create_dir_all(&run_dir).await?;

        let result = self.produce_in(&thread_id, &run_dir, cancel, &logger).await;

        if self.config.output.keep_temp {
            debug!(run_dir = %run_dir.display(), "Keeping scratch directory");
        } else if let Err(e) = tokio::fs::remove_dir_all(&run_dir).await {
            logger.log_warning(&format!("failed to remove {}: {}", run_dir.display(), e));
        }

        match &result {
            Ok(video) => {
                counter!("shortcast_videos_total", "outcome" => "success").increment(1);
                histogram!("shortcast_video_duration_seconds").record(video.duration);
                logger.log_completion(&format!(
                    "{} in {}",
                    video.summary(),
                    format_seconds(started.elapsed().as_secs_f64())
                ));
            }
            Err(e) => {
                counter!("shortcast_videos_total", "outcome" => "failure").increment(1);
                logger.log_error(&e.to_string());
            }
        }
        result
    }

    async fn produce_in(
        &self,
        thread_id: &str,
        run_dir: &Path,
        cancel: Option<watch::Receiver<bool>>,
        logger: &JobLogger,
    ) -> WorkerResult<ProducedVideo> {
        let limit = fetch_limit(&self.config.duration);
        let thread = self.source.fetch(thread_id, limit).await?;
        logger.log_progress(&format!(
            "fetched r/{} with {} comments",
            thread.subreddit,
            thread.comments.len()
        ));

        let assembly = self.assemble(&thread, run_dir, cancel).await?;
        logger.log_progress(&format!(
            "timeline {}, {} segments, {} windows",
            format_seconds(assembly.total_duration()),
            assembly.selection.segments.len(),
            assembly.windows.len()
        ));

        let output = self
            .config
            .output
            .results_dir
            .join(&thread.subreddit)
            .join(format!("{}.mp4", thread.output_stem()));

        let narration = run_dir.join("narration.wav");
        let audio: Vec<PathBuf> = assembly
            .selection
            .segments
            .iter()
            .map(|s| s.audio_path.clone())
            .collect();
        let measured = self.muxer.concat_audio(&audio, &narration).await?;
        let total = assembly.total_duration();
        if (measured - total).abs() > 0.1 {
            warn!(
                measured_secs = measured,
                timeline_secs = total,
                "Narration length differs from timeline"
            );
        }

        let background = match &self.config.background.video_path {
            Some(path) => Background::Video(path.clone()),
            None => Background::Color(self.config.background.color.clone()),
        };
        let music = self.config.background.audio_path.clone();
        let layout = MuxLayout::from_config(
            &self.config.video,
            music.as_ref().map(|_| self.config.background.audio_volume),
        );

        let job = MuxJob {
            layout,
            background,
            narration,
            music,
            windows: assembly.windows.clone(),
            duration: total,
            encoding: self.config.video.encoding.clone(),
            output: output.clone(),
            scratch_dir: run_dir.to_path_buf(),
        };
        self.muxer.render(&job).await?;

        // Written beside the video only once the video exists
        if self.config.output.dump_timings {
            let dump = output.with_extension("timings.json");
            if let Err(e) =
                write_timing_dump(&dump, &assembly.selection.segments, &assembly.offsets).await
            {
                logger.log_warning(&format!("timing dump failed: {}", e));
            }
        }

        self.ledger
            .lock()
            .await
            .mark_produced(thread_id, &output)
            .await?;

        Ok(ProducedVideo {
            thread_id: thread_id.to_string(),
            output,
            duration: total,
            comments: assembly.selection.comment_count(),
            windows: assembly.windows.len(),
        })
    }

    /// Build the synchronized timeline for `thread` with artifacts in `run_dir`.
    pub async fn assemble(
        &self,
        thread: &RedditThread,
        run_dir: &Path,
        cancel: Option<watch::Receiver<bool>>,
    ) -> WorkerResult<Assembly> {
        let candidates = Candidates::from(thread);
        let selector = DurationSelector::new(Arc::clone(&self.synthesizer), run_dir.join("audio"))
            .with_timeout(Duration::from_secs(self.config.voice.candidate_timeout_secs()))
            .with_boundary(self.config.duration.boundary);

        let selection = selector
            .select(&candidates, self.config.duration.target_secs(), cancel)
            .await?;
        if selection.cancelled {
            return Err(WorkerError::Cancelled);
        }

        let offsets = normalize(&selection.segments);
        let schedules = schedule_all(&selection.segments);
        let compiler = OverlayCompiler::new(self.renderer_for(run_dir), self.config.card_style());
        let windows = compiler
            .compile(&offsets, &selection.segments, &schedules)
            .await?;
        validate_schedule(&windows, offsets.total_duration())?;

        Ok(Assembly {
            selection,
            offsets,
            windows,
        })
    }
}
