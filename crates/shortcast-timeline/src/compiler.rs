//! Flattens per-segment schedules into global overlay windows.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use shortcast_models::{AssetRef, CardStyle, OverlayWindow, Segment, VisualState};

use crate::collaborators::{FrameRenderer, RenderRequest};
use crate::error::{TimelineError, TimelineResult};
use crate::normalizer::TimelineOffsets;
use crate::scheduler::SegmentSchedule;

/// Tolerance for comparing window boundaries in [`validate_schedule`].
const BOUNDARY_EPSILON: f64 = 1e-6;

/// Resolves frames to rendered assets and places them on the global timeline.
pub struct OverlayCompiler {
    renderer: Arc<dyn FrameRenderer>,
    style: CardStyle,
}

impl OverlayCompiler {
    pub fn new(renderer: Arc<dyn FrameRenderer>, style: CardStyle) -> Self {
        Self { renderer, style }
    }

    pub fn style(&self) -> &CardStyle {
        &self.style
    }

    /// Compile schedules into windows ordered by segment, then frame.
    ///
    /// Consecutive frames of one segment with the same visual state become a
    /// single window. Each distinct state is rendered once per segment; states
    /// are never shared between segments.
    pub async fn compile(
        &self,
        offsets: &TimelineOffsets,
        segments: &[Segment],
        schedules: &[SegmentSchedule],
    ) -> TimelineResult<Vec<OverlayWindow>> {
        let mut windows: Vec<OverlayWindow> = Vec::new();
        let mut rendered = 0usize;

        for schedule in schedules {
            let segment = segments
                .iter()
                .find(|s| s.id == schedule.segment_id)
                .ok_or_else(|| {
                    TimelineError::invalid_segment(format!(
                        "schedule for unknown segment {}",
                        schedule.segment_id
                    ))
                })?;
            let offset = offsets.offset_of(&segment.id).ok_or_else(|| {
                TimelineError::invalid_segment(format!("no offset for segment {}", segment.id))
            })?;

            let mut cache: HashMap<&VisualState, AssetRef> = HashMap::new();
            let mut previous: Option<&VisualState> = None;

            for frame in &schedule.frames {
                let global_start = offset + frame.local_start;
                let global_end = offset + frame.local_end;

                if previous == Some(&frame.visual_state) {
                    if let Some(last) = windows.last_mut() {
                        last.global_end = global_end;
                        continue;
                    }
                }
                previous = Some(&frame.visual_state);

                let asset_ref = match cache.get(&frame.visual_state) {
                    Some(asset) => asset.clone(),
                    None => {
                        let request = RenderRequest {
                            segment_id: segment.id.clone(),
                            ordinal: cache.len(),
                            source: segment.visual_source.clone(),
                            state: frame.visual_state.clone(),
                            style: self.style.clone(),
                        };
                        let asset = self.renderer.render(&request).await?;
                        rendered += 1;
                        cache.insert(&frame.visual_state, asset.clone());
                        asset
                    }
                };

                windows.push(OverlayWindow {
                    segment_id: segment.id.clone(),
                    asset_ref,
                    global_start,
                    global_end,
                });
            }

            debug!(
                segment_id = %segment.id,
                offset_secs = offset,
                distinct_states = cache.len(),
                "Segment compiled"
            );
        }

        windows.sort_by(|a, b| a.global_start.total_cmp(&b.global_start));

        metrics::counter!("shortcast_frames_rendered_total").increment(rendered as u64);
        metrics::histogram!("shortcast_overlay_windows").record(windows.len() as f64);
        info!(
            windows = windows.len(),
            rendered,
            total_secs = format!("{:.2}", offsets.total_duration()),
            "Overlay schedule compiled"
        );

        Ok(windows)
    }
}

/// Check that windows are ordered, non-empty, contiguous and cover `[0, total)`.
pub fn validate_schedule(windows: &[OverlayWindow], total: f64) -> TimelineResult<()> {
    let Some(first) = windows.first() else {
        return if total <= BOUNDARY_EPSILON {
            Ok(())
        } else {
            Err(TimelineError::invalid_timeline("no windows for a non-empty timeline"))
        };
    };

    if first.global_start.abs() > BOUNDARY_EPSILON {
        return Err(TimelineError::invalid_timeline(format!(
            "first window starts at {} instead of 0",
            first.global_start
        )));
    }

    for window in windows {
        if !(window.global_end > window.global_start) {
            return Err(TimelineError::invalid_timeline(format!(
                "empty window [{}, {}) for {}",
                window.global_start, window.global_end, window.segment_id
            )));
        }
    }

    for pair in windows.windows(2) {
        let gap = pair[1].global_start - pair[0].global_end;
        if gap.abs() > BOUNDARY_EPSILON {
            return Err(TimelineError::invalid_timeline(format!(
                "windows {} and {} are not contiguous at {} / {}",
                pair[0].segment_id, pair[1].segment_id, pair[0].global_end, pair[1].global_start
            )));
        }
    }

    let end = windows.last().map(|w| w.global_end).unwrap_or(0.0);
    if (end - total).abs() > BOUNDARY_EPSILON {
        return Err(TimelineError::invalid_timeline(format!(
            "windows end at {} but the timeline is {} long",
            end, total
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use shortcast_models::{ScheduledFrame, SegmentId, VisualSource};
    use std::sync::Mutex;

    use crate::normalizer::normalize;
    use crate::scheduler::SchedulingMode;

    #[derive(Default)]
    struct CountingRenderer {
        requests: Mutex<Vec<(SegmentId, String)>>,
    }

    #[async_trait]
    impl FrameRenderer for CountingRenderer {
        async fn render(&self, request: &RenderRequest) -> TimelineResult<AssetRef> {
            self.requests
                .lock()
                .unwrap()
                .push((request.segment_id.clone(), request.state.text().to_string()));
            Ok(AssetRef::new(format!("{}.png", request.file_stem())))
        }
    }

    fn segment(id: SegmentId, duration: f64) -> Segment {
        Segment::new(
            id,
            duration,
            Vec::new(),
            VisualSource::Comment {
                text: "same".to_string(),
                author: "a".to_string(),
                score: 1,
            },
            "x.mp3",
        )
    }

    fn frame(id: &SegmentId, state: VisualState, start: f64, end: f64) -> ScheduledFrame {
        ScheduledFrame {
            segment_id: id.clone(),
            visual_state: state,
            local_start: start,
            local_end: end,
        }
    }

    #[tokio::test]
    async fn test_consecutive_identical_states_coalesce() {
        let id = SegmentId::comment(0);
        let segments = vec![segment(id.clone(), 3.0)];
        let offsets = normalize(&segments);
        let schedules = vec![SegmentSchedule {
            segment_id: id.clone(),
            mode: SchedulingMode::Progressive,
            frames: vec![
                frame(&id, VisualState::full("x"), 0.0, 1.0),
                frame(&id, VisualState::full("x"), 1.0, 2.0),
                frame(&id, VisualState::full("y"), 2.0, 3.0),
            ],
        }];

        let renderer = Arc::new(CountingRenderer::default());
        let compiler = OverlayCompiler::new(renderer.clone(), CardStyle::default());
        let windows = compiler.compile(&offsets, &segments, &schedules).await.unwrap();

        assert_eq!(windows.len(), 2);
        assert_eq!((windows[0].global_start, windows[0].global_end), (0.0, 2.0));
        assert_eq!(renderer.requests.lock().unwrap().len(), 2);
        validate_schedule(&windows, 3.0).unwrap();
    }

    #[tokio::test]
    async fn test_identical_states_across_segments_render_separately() {
        let a = SegmentId::comment(0);
        let b = SegmentId::comment(1);
        let segments = vec![segment(a.clone(), 1.0), segment(b.clone(), 1.0)];
        let offsets = normalize(&segments);
        let schedules = vec![
            SegmentSchedule {
                segment_id: a.clone(),
                mode: SchedulingMode::Fallback,
                frames: vec![frame(&a, VisualState::full("same"), 0.0, 1.0)],
            },
            SegmentSchedule {
                segment_id: b.clone(),
                mode: SchedulingMode::Fallback,
                frames: vec![frame(&b, VisualState::full("same"), 0.0, 1.0)],
            },
        ];

        let renderer = Arc::new(CountingRenderer::default());
        let compiler = OverlayCompiler::new(renderer.clone(), CardStyle::default());
        let windows = compiler.compile(&offsets, &segments, &schedules).await.unwrap();

        assert_eq!(windows.len(), 2);
        assert_ne!(windows[0].asset_ref, windows[1].asset_ref);
        assert_eq!(renderer.requests.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_segment_is_rejected() {
        let id = SegmentId::comment(9);
        let schedules = vec![SegmentSchedule {
            segment_id: id.clone(),
            mode: SchedulingMode::Fallback,
            frames: vec![frame(&id, VisualState::full("x"), 0.0, 1.0)],
        }];
        let compiler = OverlayCompiler::new(Arc::new(CountingRenderer::default()), CardStyle::default());

        let result = compiler.compile(&TimelineOffsets::default(), &[], &schedules).await;
        assert!(matches!(result, Err(TimelineError::InvalidSegment(_))));
    }

    #[test]
    fn test_validate_schedule_detects_gap() {
        let id = SegmentId::title();
        let windows = vec![
            OverlayWindow {
                segment_id: id.clone(),
                asset_ref: AssetRef::new("a.png"),
                global_start: 0.0,
                global_end: 1.0,
            },
            OverlayWindow {
                segment_id: id,
                asset_ref: AssetRef::new("b.png"),
                global_start: 1.5,
                global_end: 2.0,
            },
        ];
        assert!(matches!(
            validate_schedule(&windows, 2.0),
            Err(TimelineError::InvalidTimeline(_))
        ));
        assert!(validate_schedule(&[], 0.0).is_ok());
        assert!(validate_schedule(&[], 1.0).is_err());
    }
}
