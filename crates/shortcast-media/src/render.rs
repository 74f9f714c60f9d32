//! Card image rendering with FFmpeg `drawtext`.
//!
//! Each frame state becomes one PNG: a solid card with a header line
//! (subreddit or comment author) and the wrapped narration text. Text is
//! written to side files and read with `textfile=` so it needs no escaping.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use shortcast_models::{AssetRef, CardStyle, VisualSource};
use shortcast_timeline::{FrameRenderer, RenderRequest, TimelineError, TimelineResult};

use crate::command::{FfmpegCommand, FfmpegRunner};

const LINE_SPACING_RATIO: f64 = 0.35;
const RENDER_TIMEOUT_SECS: u64 = 30;

/// Greedy word wrap at `max_chars` columns. Long words get their own line.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Geometry and text of one card.
#[derive(Debug, Clone, PartialEq)]
pub struct CardLayout {
    pub width: u32,
    pub height: u32,
    pub padding: u32,
    pub header: String,
    pub header_font_size: u32,
    pub body_lines: Vec<String>,
    pub body_font_size: u32,
    pub line_spacing: u32,
}

impl CardLayout {
    /// Lay out a card for `request`.
    ///
    /// Height is sized for the segment's full text so the card keeps the
    /// same size while words accumulate.
    pub fn for_request(request: &RenderRequest) -> Self {
        let style = &request.style;
        let (header, body_font_size) = match &request.source {
            VisualSource::Title { subreddit, .. } => {
                (format!("r/{}", subreddit), style.title_font_size)
            }
            VisualSource::Comment { author, score, .. } => {
                (format!("u/{} · {} points", author, score), style.font_size)
            }
        };

        let max_chars = chars_per_line(style, body_font_size);
        let full_lines = wrap_text(request.source.text(), max_chars).len().max(1) as u32;
        let line_spacing = (body_font_size as f64 * LINE_SPACING_RATIO).round() as u32;
        let header_height = style.font_size + style.padding / 2;

        let raw_height = style.padding * 2
            + header_height
            + full_lines * body_font_size
            + full_lines.saturating_sub(1) * line_spacing;

        Self {
            width: style.card_width,
            height: raw_height + raw_height % 2,
            padding: style.padding,
            header,
            header_font_size: style.font_size,
            body_lines: wrap_text(request.state.text(), max_chars),
            body_font_size,
            line_spacing,
        }
    }

    pub fn body_y(&self) -> u32 {
        self.padding + self.header_font_size + self.padding / 2
    }
}

fn chars_per_line(style: &CardStyle, font_size: u32) -> usize {
    if font_size <= style.font_size || font_size == 0 {
        return style.max_chars_per_line;
    }
    (style.max_chars_per_line * style.font_size as usize / font_size as usize).max(8)
}

/// Quote a path for use as a filter option value.
fn quote_filter_path(path: &Path) -> String {
    format!("'{}'", path.to_string_lossy().replace('\'', r"'\''"))
}

/// Build the `drawtext` chain for a card.
pub fn build_card_filter(
    layout: &CardLayout,
    style: &CardStyle,
    header_file: &Path,
    body_file: &Path,
    font_file: Option<&Path>,
) -> String {
    let font = font_file
        .map(|f| format!(":fontfile={}", quote_filter_path(f)))
        .unwrap_or_default();

    format!(
        "drawtext=textfile={header}:expansion=none:fontcolor={accent}:fontsize={hfs}:x={pad}:y={pad}{font},\
         drawtext=textfile={body}:expansion=none:fontcolor={text}:fontsize={bfs}:line_spacing={ls}:x={pad}:y={by}{font}",
        header = quote_filter_path(header_file),
        accent = style.accent_color,
        hfs = layout.header_font_size,
        pad = layout.padding,
        body = quote_filter_path(body_file),
        text = style.text_color,
        bfs = layout.body_font_size,
        ls = layout.line_spacing,
        by = layout.body_y(),
        font = font,
    )
}

/// Renders card PNGs into a directory.
#[derive(Debug, Clone)]
pub struct FfmpegCardRenderer {
    output_dir: PathBuf,
    font_file: Option<PathBuf>,
}

impl FfmpegCardRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            font_file: None,
        }
    }

    /// Use a specific font instead of the fontconfig default.
    pub fn with_font_file(mut self, font_file: impl Into<PathBuf>) -> Self {
        self.font_file = Some(font_file.into());
        self
    }

    async fn render_card(&self, request: &RenderRequest) -> crate::error::MediaResult<PathBuf> {
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let stem = request.file_stem();
        let output = self.output_dir.join(format!("{}.png", stem));
        let header_file = self.output_dir.join(format!("{}.header.txt", stem));
        let body_file = self.output_dir.join(format!("{}.body.txt", stem));

        let layout = CardLayout::for_request(request);
        tokio::fs::write(&header_file, &layout.header).await?;
        tokio::fs::write(&body_file, layout.body_lines.join("\n")).await?;

        let filter = build_card_filter(
            &layout,
            &request.style,
            &header_file,
            &body_file,
            self.font_file.as_deref(),
        );
        let cmd = FfmpegCommand::new(&output)
            .lavfi(format!(
                "color=c={}:s={}x{}:d=1",
                request.style.background_color, layout.width, layout.height
            ))
            .video_filter(filter)
            .single_frame();

        let result = FfmpegRunner::new()
            .with_timeout(RENDER_TIMEOUT_SECS)
            .run(&cmd)
            .await;

        tokio::fs::remove_file(&header_file).await.ok();
        tokio::fs::remove_file(&body_file).await.ok();
        result?;

        debug!(
            segment_id = %request.segment_id,
            ordinal = request.ordinal,
            width = layout.width,
            height = layout.height,
            "Rendered card"
        );
        Ok(output)
    }
}

#[async_trait]
impl FrameRenderer for FfmpegCardRenderer {
    async fn render(&self, request: &RenderRequest) -> TimelineResult<AssetRef> {
        self.render_card(request)
            .await
            .map(AssetRef::new)
            .map_err(|e| TimelineError::render(format!("{}: {}", request.file_stem(), e)))
    }
}
