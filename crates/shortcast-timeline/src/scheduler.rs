//! Word-timed frame scheduling.
//!
//! Turns one segment's timing events into contiguous frame windows that
//! exactly cover `[0, audio_duration)`.
//!
//! - **Progressive**: frame *i* shows the words spoken so far and lasts
//!   until the next word starts (or the segment ends).
//! - **Fallback**: no usable timings; one frame shows the full text.
//!
//! Events are sorted by offset first (stable, so ties keep emission order).
//! Events at or past the end of the audio are dropped. Events sharing an
//! offset are folded into one frame.

use tracing::debug;

use shortcast_models::{ScheduledFrame, Segment, SegmentId, TimingEvent, VisualState};

/// How a segment's frames were produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulingMode {
    Progressive,
    Fallback,
}

/// Frames of one segment, in time order.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentSchedule {
    pub segment_id: SegmentId,
    pub mode: SchedulingMode,
    pub frames: Vec<ScheduledFrame>,
}

/// Schedule every segment, preserving segment order.
pub fn schedule_all(segments: &[Segment]) -> Vec<SegmentSchedule> {
    segments.iter().map(schedule_segment).collect()
}

/// Build the ordered frame sequence for one segment.
pub fn schedule_segment(segment: &Segment) -> SegmentSchedule {
    let duration = segment.audio_duration;

    if !(duration.is_finite() && duration > 0.0) {
        debug!(
            segment_id = %segment.id,
            duration_secs = duration,
            "Segment has no audio duration; nothing to schedule"
        );
        return SegmentSchedule {
            segment_id: segment.id.clone(),
            mode: SchedulingMode::Fallback,
            frames: Vec::new(),
        };
    }

    let events = usable_events(segment);
    if events.is_empty() {
        return fallback(segment);
    }

    let mut frames = Vec::with_capacity(events.len());
    let mut words: Vec<&str> = Vec::with_capacity(events.len());
    let mut i = 0;

    while i < events.len() {
        let start = events[i].offset;

        // Fold every event sharing this offset into one frame
        let mut j = i;
        while j < events.len() && events[j].offset == start {
            words.push(events[j].text.as_str());
            j += 1;
        }

        let local_end = events.get(j).map(|e| e.offset).unwrap_or(duration);
        let local_start = if frames.is_empty() { 0.0 } else { start };

        frames.push(ScheduledFrame {
            segment_id: segment.id.clone(),
            visual_state: VisualState::progressive(&words),
            local_start,
            local_end,
        });
        i = j;
    }

    SegmentSchedule {
        segment_id: segment.id.clone(),
        mode: SchedulingMode::Progressive,
        frames,
    }
}

/// Events stably sorted by offset, keeping only those that start inside
/// the audio.
pub(crate) fn usable_events(segment: &Segment) -> Vec<&TimingEvent> {
    let mut events: Vec<&TimingEvent> = segment
        .events
        .iter()
        .filter(|e| e.offset.is_finite())
        .collect();

    if events.windows(2).any(|w| w[1].offset < w[0].offset) {
        debug!(
            segment_id = %segment.id,
            events = events.len(),
            "Timing events out of order; sorting by offset"
        );
        events.sort_by(|a, b| a.offset.total_cmp(&b.offset));
    }

    let before = events.len();
    events.retain(|e| e.offset >= 0.0 && e.offset < segment.audio_duration);
    if events.len() < before {
        debug!(
            segment_id = %segment.id,
            dropped = before - events.len(),
            duration_secs = segment.audio_duration,
            "Dropped timing events outside the segment audio"
        );
    }

    events
}

fn fallback(segment: &Segment) -> SegmentSchedule {
    debug!(segment_id = %segment.id, "No word timings; using full-text frame");
    SegmentSchedule {
        segment_id: segment.id.clone(),
        mode: SchedulingMode::Fallback,
        frames: vec![ScheduledFrame {
            segment_id: segment.id.clone(),
            visual_state: VisualState::full(segment.text()),
            local_start: 0.0,
            local_end: segment.audio_duration,
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shortcast_models::VisualSource;

    fn segment(text: &str, duration: f64, events: Vec<TimingEvent>) -> Segment {
        Segment::new(
            SegmentId::comment(0),
            duration,
            events,
            VisualSource::Comment {
                text: text.to_string(),
                author: "a".to_string(),
                score: 1,
            },
            "c.mp3",
        )
    }

    fn windows(schedule: &SegmentSchedule) -> Vec<(String, f64, f64)> {
        schedule
            .frames
            .iter()
            .map(|f| (f.visual_state.text().to_string(), f.local_start, f.local_end))
            .collect()
    }

    #[test]
    fn test_progressive_two_words() {
        let seg = segment(
            "Hello world",
            2.0,
            vec![TimingEvent::new("Hello", 0.0, 0.5), TimingEvent::new("world", 0.5, 0.5)],
        );
        let schedule = schedule_segment(&seg);

        assert_eq!(schedule.mode, SchedulingMode::Progressive);
        assert_eq!(
            windows(&schedule),
            vec![
                ("Hello".to_string(), 0.0, 0.5),
                ("Hello world".to_string(), 0.5, 2.0)
            ]
        );
    }

    #[test]
    fn test_fallback_single_frame() {
        let seg = segment("Whole comment text", 4.2, vec![]);
        let schedule = schedule_segment(&seg);

        assert_eq!(schedule.mode, SchedulingMode::Fallback);
        assert_eq!(schedule.frames.len(), 1);
        assert_eq!(schedule.frames[0].visual_state, VisualState::full("Whole comment text"));
        assert_eq!(schedule.frames[0].local_start, 0.0);
        assert_eq!(schedule.frames[0].local_end, 4.2);
    }

    #[test]
    fn test_out_of_order_events_are_sorted() {
        let seg = segment(
            "a b c",
            3.0,
            vec![
                TimingEvent::new("b", 1.0, 0.2),
                TimingEvent::new("a", 0.0, 0.2),
                TimingEvent::new("c", 2.0, 0.2),
            ],
        );
        let schedule = schedule_segment(&seg);
        let texts: Vec<String> = windows(&schedule).into_iter().map(|w| w.0).collect();
        assert_eq!(texts, vec!["a", "a b", "a b c"]);
    }

    #[test]
    fn test_late_events_dropped_and_previous_extended() {
        let seg = segment(
            "one two three",
            1.5,
            vec![
                TimingEvent::new("one", 0.0, 0.4),
                TimingEvent::new("two", 0.6, 0.4),
                TimingEvent::new("three", 1.5, 0.4),
            ],
        );
        let schedule = schedule_segment(&seg);
        assert_eq!(
            windows(&schedule),
            vec![("one".to_string(), 0.0, 0.6), ("one two".to_string(), 0.6, 1.5)]
        );
    }

    #[test]
    fn test_all_events_late_falls_back() {
        let seg = segment("late words", 1.0, vec![TimingEvent::new("late", 2.0, 0.3)]);
        let schedule = schedule_segment(&seg);
        assert_eq!(schedule.mode, SchedulingMode::Fallback);
        assert_eq!(schedule.frames.len(), 1);
    }

    #[test]
    fn test_shared_offsets_fold_into_one_frame() {
        let seg = segment(
            "New York rocks",
            2.0,
            vec![
                TimingEvent::new("New", 0.2, 0.3),
                TimingEvent::new("York", 0.2, 0.3),
                TimingEvent::new("rocks", 0.9, 0.5),
            ],
        );
        let schedule = schedule_segment(&seg);
        assert_eq!(
            windows(&schedule),
            vec![
                ("New York".to_string(), 0.0, 0.9),
                ("New York rocks".to_string(), 0.9, 2.0)
            ]
        );
        assert!(schedule.frames.iter().all(|f| f.duration() > 0.0));
    }

    #[test]
    fn test_frames_cover_whole_segment() {
        let events: Vec<TimingEvent> = (0..7)
            .map(|i| TimingEvent::new(format!("w{}", i), 0.3 + i as f64 * 0.41, 0.2))
            .collect();
        let seg = segment("ignored", 3.5, events);
        let frames = schedule_segment(&seg).frames;

        assert_eq!(frames.first().unwrap().local_start, 0.0);
        assert_eq!(frames.last().unwrap().local_end, 3.5);
        for pair in frames.windows(2) {
            assert_eq!(pair[0].local_end, pair[1].local_start);
            assert!(pair[0].local_start < pair[0].local_end);
        }
    }
}
