//! Final assembly: narration concat and overlay compositing.
//!
//! Input layout of the final FFmpeg command:
//!
//! | index | input |
//! |---|---|
//! | 0 | background video (looped) or a lavfi color source |
//! | 1 | concatenated narration |
//! | 2 | background music (looped), when configured |
//! | next | one input per distinct overlay image |

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use shortcast_models::{AssetRef, EncodingConfig, OverlayWindow, VideoConfig};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::probe_duration;
use crate::progress::ProgressThrottle;

/// Filter graphs longer than this are passed through a script file.
const MAX_INLINE_FILTER_LEN: usize = 64 * 1024;

/// Output label of the composited video.
pub const VIDEO_OUT: &str = "[vout]";
/// Output label of the mixed audio.
pub const AUDIO_OUT: &str = "[aout]";

/// Canvas and compositing parameters of the final video.
#[derive(Debug, Clone, PartialEq)]
pub struct MuxLayout {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Alpha applied to comment cards
    pub comment_opacity: f64,
    /// Volume of the background music, when present
    pub music_volume: Option<f64>,
}

impl MuxLayout {
    pub fn from_config(video: &VideoConfig, music_volume: Option<f64>) -> Self {
        Self {
            width: video.width,
            height: video.height,
            fps: video.fps,
            comment_opacity: video.comment_opacity,
            music_volume,
        }
    }

    /// Index of the first overlay image input.
    pub fn first_asset_input(&self) -> usize {
        if self.music_volume.is_some() {
            3
        } else {
            2
        }
    }
}

/// A filter graph plus the overlay images it expects, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayGraph {
    pub filter: String,
    pub assets: Vec<AssetRef>,
}

/// Build the compositing filter graph for `windows`.
///
/// Each window becomes one centered `overlay` enabled on the half-open
/// interval `[global_start, global_end)`. Comment cards are faded to the
/// layout opacity, title cards stay opaque. An image shared by several
/// windows is read once and split.
pub fn build_overlay_filter_graph(layout: &MuxLayout, windows: &[OverlayWindow]) -> OverlayGraph {
    let mut parts: Vec<String> = Vec::new();

    parts.push(format!(
        "[0:v]scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h},setsar=1,fps={fps},format=yuv420p[bg]",
        w = layout.width,
        h = layout.height,
        fps = layout.fps
    ));

    // Distinct assets in order of first use, with the windows using each
    let mut assets: Vec<AssetRef> = Vec::new();
    let mut uses: HashMap<&AssetRef, Vec<usize>> = HashMap::new();
    for (i, window) in windows.iter().enumerate() {
        let entry = uses.entry(&window.asset_ref).or_default();
        if entry.is_empty() {
            assets.push(window.asset_ref.clone());
        }
        entry.push(i);
    }

    let mut window_labels: Vec<String> = vec![String::new(); windows.len()];
    for (asset_index, asset) in assets.iter().enumerate() {
        let input = layout.first_asset_input() + asset_index;
        let users = &uses[asset];
        let is_title = users.iter().all(|&i| windows[i].segment_id.is_title());

        let mut chain = format!("[{}:v]format=rgba", input);
        if !is_title {
            chain.push_str(&format!(",colorchannelmixer=aa={:.2}", layout.comment_opacity));
        }

        if users.len() == 1 {
            let label = format!("[ov{}]", users[0]);
            parts.push(format!("{}{}", chain, label));
            window_labels[users[0]] = label;
        } else {
            let labels: Vec<String> = users.iter().map(|i| format!("[ov{}]", i)).collect();
            parts.push(format!("{},split={}{}", chain, users.len(), labels.concat()));
            for (&i, label) in users.iter().zip(labels) {
                window_labels[i] = label;
            }
        }
    }

    let mut current = "[bg]".to_string();
    for (i, window) in windows.iter().enumerate() {
        let next = if i + 1 == windows.len() {
            VIDEO_OUT.to_string()
        } else {
            format!("[v{}]", i)
        };
        parts.push(format!(
            "{}{}overlay=x=(main_w-overlay_w)/2:y=(main_h-overlay_h)/2:enable='gte(t,{:.6})*lt(t,{:.6})'{}",
            current, window_labels[i], window.global_start, window.global_end, next
        ));
        current = next;
    }
    if windows.is_empty() {
        parts.push(format!("[bg]null{}", VIDEO_OUT));
    }

    match layout.music_volume {
        Some(volume) => parts.push(format!(
            "[2:a]volume={:.2}[music];[1:a][music]amix=inputs=2:duration=first:dropout_transition=0:normalize=0{}",
            volume, AUDIO_OUT
        )),
        None => parts.push(format!("[1:a]anull{}", AUDIO_OUT)),
    }

    OverlayGraph {
        filter: parts.join(";"),
        assets,
    }
}

/// Background behind the cards.
#[derive(Debug, Clone, PartialEq)]
pub enum Background {
    Video(PathBuf),
    /// FFmpeg color, e.g. `0x1E1E2E`
    Color(String),
}

/// Everything needed to produce the final video.
#[derive(Debug, Clone)]
pub struct MuxJob {
    pub layout: MuxLayout,
    pub background: Background,
    pub narration: PathBuf,
    pub music: Option<PathBuf>,
    pub windows: Vec<OverlayWindow>,
    /// Output length, the total narrated duration
    pub duration: f64,
    pub encoding: EncodingConfig,
    pub output: PathBuf,
    /// Directory for the filter script when the graph is large
    pub scratch_dir: PathBuf,
}

/// Runs the audio concat and final composite.
pub struct FfmpegMuxer {
    timeout_secs: Option<u64>,
}

impl Default for FfmpegMuxer {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegMuxer {
    pub fn new() -> Self {
        Self { timeout_secs: None }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    fn runner(&self) -> FfmpegRunner {
        match self.timeout_secs {
            Some(secs) => FfmpegRunner::new().with_timeout(secs),
            None => FfmpegRunner::new(),
        }
    }

    /// Concatenate segment audio, in order, into one WAV file.
    ///
    /// Returns the measured duration of the result.
    pub async fn concat_audio(&self, inputs: &[PathBuf], output: &Path) -> MediaResult<f64> {
        if inputs.is_empty() {
            return Err(MediaError::internal("no audio to concatenate"));
        }

        let mut cmd = FfmpegCommand::new(output);
        for input in inputs {
            cmd = cmd.input(input);
        }
        let cmd = cmd
            .filter_complex(concat_audio_filter(inputs.len()))
            .map("[aout]")
            .audio_codec("pcm_s16le")
            .output_args(["-ar", "44100", "-ac", "2"]);

        self.runner().run(&cmd).await?;
        let duration = probe_duration(output).await?;

        debug!(
            segments = inputs.len(),
            duration_secs = duration,
            output = %output.display(),
            "Narration concatenated"
        );
        Ok(duration)
    }

    /// Composite the overlays onto the background and encode the video.
    pub async fn render(&self, job: &MuxJob) -> MediaResult<()> {
        let graph = build_overlay_filter_graph(&job.layout, &job.windows);

        let mut cmd = FfmpegCommand::new(&job.output);
        cmd = match &job.background {
            Background::Video(path) => cmd.looped_input(path),
            Background::Color(color) => cmd.lavfi(format!(
                "color=c={}:s={}x{}:r={}",
                color, job.layout.width, job.layout.height, job.layout.fps
            )),
        };
        cmd = cmd.input(&job.narration);
        if let Some(music) = &job.music {
            cmd = cmd.looped_input(music);
        }
        for asset in &graph.assets {
            cmd = cmd.input(asset.path());
        }

        cmd = if graph.filter.len() > MAX_INLINE_FILTER_LEN {
            let script = job.scratch_dir.join("overlay_filter.txt");
            tokio::fs::write(&script, &graph.filter).await?;
            cmd.filter_complex_script(script)
        } else {
            cmd.filter_complex(&graph.filter)
        };

        let cmd = cmd
            .map(VIDEO_OUT)
            .map(AUDIO_OUT)
            .frame_rate(job.layout.fps)
            .encoding(&job.encoding)
            .duration(job.duration);

        if let Some(parent) = job.output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        info!(
            windows = job.windows.len(),
            images = graph.assets.len(),
            duration_secs = format!("{:.2}", job.duration),
            output = %job.output.display(),
            "Rendering final video"
        );

        let total = job.duration;
        let throttle = std::sync::Mutex::new(ProgressThrottle::new(10.0));
        self.runner()
            .run_with_progress(&cmd, move |progress| {
                let percentage = progress.percentage(total);
                let report = throttle
                    .lock()
                    .ok()
                    .and_then(|mut t| t.update(percentage));
                if let Some(percentage) = report {
                    info!(
                        percentage = format!("{:.0}", percentage),
                        eta_secs = progress.eta_secs(total).map(|e| format!("{:.0}", e)),
                        "Render progress"
                    );
                }
            })
            .await?;

        Ok(())
    }
}

fn concat_audio_filter(count: usize) -> String {
    let inputs: String = (0..count).map(|i| format!("[{}:a]", i)).collect();
    format!("{}concat=n={}:v=0:a=1[aout]", inputs, count)
}
