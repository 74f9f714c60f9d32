//! Word timings from subtitle cues.

use std::sync::LazyLock;

use regex::Regex;

use shortcast_models::timestamp::parse_cue_range;
use shortcast_models::TimingEvent;

static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid tag pattern"));

/// Parse WebVTT or SRT cues into word timing events.
///
/// Engines emit either one cue per word or a few words per cue. A cue with
/// several words has its interval split evenly between them, so spans may
/// be estimates. Malformed cues are skipped.
pub fn parse_subtitle_cues(content: &str) -> Vec<TimingEvent> {
    let mut events = Vec::new();
    let mut lines = content.lines().peekable();

    while let Some(line) = lines.next() {
        let line = line.trim();
        if !line.contains("-->") {
            continue;
        }
        let Ok((start, end)) = parse_cue_range(line) else {
            continue;
        };

        let mut text = String::new();
        while let Some(next) = lines.peek() {
            let next = next.trim();
            if next.is_empty() || next.contains("-->") {
                break;
            }
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(&TAG_PATTERN.replace_all(next, ""));
            lines.next();
        }

        push_cue_words(&mut events, &text, start, end);
    }

    events
}

fn push_cue_words(events: &mut Vec<TimingEvent>, text: &str, start: f64, end: f64) {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return;
    }
    let span = (end - start).max(0.0) / words.len() as f64;
    for (i, word) in words.iter().enumerate() {
        events.push(TimingEvent::new(*word, start + span * i as f64, span));
    }
}
