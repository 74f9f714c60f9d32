//! Maps per-segment time onto the global video timeline.

use shortcast_models::{Segment, SegmentId, TimingEvent};

use crate::scheduler::usable_events;

/// Global placement of one segment.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentOffset {
    pub segment_id: SegmentId,
    /// Global start, the sum of all preceding segment durations
    pub offset: f64,
    pub duration: f64,
}

impl SegmentOffset {
    pub fn end(&self) -> f64 {
        self.offset + self.duration
    }
}

/// Global start offsets of every segment, in narrated order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimelineOffsets {
    entries: Vec<SegmentOffset>,
    total: f64,
}

impl TimelineOffsets {
    pub fn iter(&self) -> impl Iterator<Item = &SegmentOffset> {
        self.entries.iter()
    }

    pub fn offset_of(&self, id: &SegmentId) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| &e.segment_id == id)
            .map(|e| e.offset)
    }

    /// Total narrated duration.
    pub fn total_duration(&self) -> f64 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Compute each segment's global start offset.
///
/// Each offset is the previous offset plus the previous duration, so the end
/// of one segment and the start of the next are the same value.
pub fn normalize(segments: &[Segment]) -> TimelineOffsets {
    let mut entries = Vec::with_capacity(segments.len());
    let mut cursor = 0.0;

    for segment in segments {
        entries.push(SegmentOffset {
            segment_id: segment.id.clone(),
            offset: cursor,
            duration: segment.audio_duration,
        });
        cursor += segment.audio_duration;
    }

    TimelineOffsets {
        entries,
        total: cursor,
    }
}

/// Every segment's timing events merged into one global word timeline.
///
/// Each segment contributes the same events the scheduler uses: sorted by
/// offset, without events at or past the end of its audio. The result is
/// non-decreasing in offset. Segments without an offset are skipped.
pub fn global_events(segments: &[Segment], offsets: &TimelineOffsets) -> Vec<TimingEvent> {
    segments
        .iter()
        .filter_map(|segment| {
            offsets.offset_of(&segment.id).map(|offset| {
                usable_events(segment)
                    .into_iter()
                    .map(move |e| e.shifted(offset))
            })
        })
        .flatten()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shortcast_models::VisualSource;

    fn segment(id: SegmentId, duration: f64, events: Vec<TimingEvent>) -> Segment {
        Segment::new(
            id,
            duration,
            events,
            VisualSource::Title {
                text: "t".to_string(),
                subreddit: "s".to_string(),
            },
            "a.mp3",
        )
    }

    #[test]
    fn test_offsets_accumulate() {
        let segments = vec![
            segment(SegmentId::title(), 5.0, vec![]),
            segment(SegmentId::comment(0), 3.0, vec![]),
            segment(SegmentId::comment(1), 2.5, vec![]),
        ];
        let offsets = normalize(&segments);

        assert_eq!(offsets.offset_of(&SegmentId::title()), Some(0.0));
        assert_eq!(offsets.offset_of(&SegmentId::comment(0)), Some(5.0));
        assert_eq!(offsets.offset_of(&SegmentId::comment(1)), Some(8.0));
        assert_eq!(offsets.total_duration(), 10.5);
        assert_eq!(offsets.offset_of(&SegmentId::comment(7)), None);

        let starts: Vec<f64> = offsets.iter().map(|e| e.offset).collect();
        assert!(starts.windows(2).all(|w| w[0] < w[1]));

        let last = offsets.iter().last().unwrap();
        assert_eq!(last.end(), offsets.total_duration());
    }

    #[test]
    fn test_empty_input() {
        let offsets = normalize(&[]);
        assert!(offsets.is_empty());
        assert_eq!(offsets.total_duration(), 0.0);
    }

    #[test]
    fn test_global_events_are_shifted() {
        let segments = vec![
            segment(SegmentId::title(), 5.0, vec![TimingEvent::new("Hi", 0.0, 0.4)]),
            segment(
                SegmentId::comment(0),
                3.0,
                vec![TimingEvent::new("yes", 0.0, 0.3), TimingEvent::new("no", 1.0, 0.3)],
            ),
        ];
        let offsets = normalize(&segments);
        let events = global_events(&segments, &offsets);

        let starts: Vec<f64> = events.iter().map(|e| e.offset).collect();
        assert_eq!(starts, vec![0.0, 5.0, 6.0]);
        assert_eq!(events[2].text, "no");
    }

    #[test]
    fn test_global_events_sorted_and_clipped_per_segment() {
        let segments = vec![
            segment(
                SegmentId::title(),
                2.0,
                vec![
                    TimingEvent::new("b", 1.0, 0.2),
                    TimingEvent::new("a", 0.0, 0.2),
                    TimingEvent::new("late", 2.5, 0.2),
                ],
            ),
            segment(SegmentId::comment(0), 1.0, vec![TimingEvent::new("c", 0.0, 0.2)]),
        ];
        let offsets = normalize(&segments);
        let events = global_events(&segments, &offsets);

        let got: Vec<(&str, f64)> = events.iter().map(|e| (e.text.as_str(), e.offset)).collect();
        assert_eq!(got, vec![("a", 0.0), ("b", 1.0), ("c", 2.0)]);
        assert!(events.windows(2).all(|w| w[0].offset <= w[1].offset));
    }
}
