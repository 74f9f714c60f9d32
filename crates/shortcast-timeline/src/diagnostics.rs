//! Timing dump for debugging synchronization issues.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use shortcast_models::{Segment, SegmentId};

use crate::error::TimelineResult;
use crate::normalizer::TimelineOffsets;

/// One word as written to the timing dump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingRecord {
    pub segment_id: SegmentId,
    pub word: String,
    pub start_ms: u64,
    pub end_ms: u64,
    pub duration_ms: u64,
    pub global_start_ms: u64,
}

/// Build dump records for every event, in narrated order.
pub fn timing_records(segments: &[Segment], offsets: &TimelineOffsets) -> Vec<TimingRecord> {
    let mut records = Vec::new();
    for segment in segments {
        let offset = offsets.offset_of(&segment.id).unwrap_or(0.0);
        for event in &segment.events {
            records.push(TimingRecord {
                segment_id: segment.id.clone(),
                word: event.text.clone(),
                start_ms: to_ms(event.offset),
                end_ms: to_ms(event.end()),
                duration_ms: to_ms(event.span),
                global_start_ms: to_ms(offset + event.offset),
            });
        }
    }
    records
}

/// Write all timing events as pretty JSON, creating parent directories.
pub async fn write_timing_dump(
    path: &Path,
    segments: &[Segment],
    offsets: &TimelineOffsets,
) -> TimelineResult<()> {
    let records = timing_records(segments, offsets);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let json = serde_json::to_vec_pretty(&records)?;
    tokio::fs::write(path, json).await?;

    debug!(path = %path.display(), records = records.len(), "Wrote timing dump");
    Ok(())
}

fn to_ms(secs: f64) -> u64 {
    (secs.max(0.0) * 1000.0).round() as u64
}
