//! Filter graph construction from a compiled overlay schedule.

use std::sync::Arc;

use async_trait::async_trait;

use shortcast_media::{build_overlay_filter_graph, MuxLayout};
use shortcast_models::{AssetRef, FactoryConfig, Segment, SegmentId, TimingEvent, VisualSource};
use shortcast_timeline::{
    normalize, schedule_all, FrameRenderer, OverlayCompiler, RenderRequest, TimelineResult,
};

struct PathRenderer;

#[async_trait]
impl FrameRenderer for PathRenderer {
    async fn render(&self, request: &RenderRequest) -> TimelineResult<AssetRef> {
        Ok(AssetRef::new(format!("/frames/{}.png", request.file_stem())))
    }
}

fn segments() -> Vec<Segment> {
    vec![
        Segment::new(
            SegmentId::title(),
            2.0,
            vec![TimingEvent::new("Hello", 0.0, 0.5), TimingEvent::new("there", 0.5, 0.5)],
            VisualSource::Title {
                text: "Hello there".to_string(),
                subreddit: "AskReddit".to_string(),
            },
            "title.mp3",
        ),
        Segment::new(
            SegmentId::comment(0),
            3.0,
            Vec::new(),
            VisualSource::Comment {
                text: "General Kenobi".to_string(),
                author: "grievous".to_string(),
                score: 66,
            },
            "comment_0.wav",
        ),
    ]
}

#[tokio::test]
async fn compiled_schedule_maps_to_one_overlay_per_window() {
    let config = FactoryConfig::default();
    let segments = segments();
    let offsets = normalize(&segments);
    let schedules = schedule_all(&segments);
    let compiler = OverlayCompiler::new(Arc::new(PathRenderer), config.card_style());
    let windows = compiler.compile(&offsets, &segments, &schedules).await.unwrap();
    assert_eq!(windows.len(), 3);

    let layout = MuxLayout::from_config(&config.video, Some(config.background.audio_volume));
    let graph = build_overlay_filter_graph(&layout, &windows);

    assert_eq!(graph.filter.matches("overlay=").count(), 3);
    assert_eq!(graph.assets.len(), 3);
    assert!(graph.filter.contains("enable='gte(t,2.000000)*lt(t,5.000000)'"));
    assert!(graph.filter.contains("[5:v]format=rgba,colorchannelmixer=aa=0.92"));
    assert!(graph.filter.contains("scale=1080:1920"));
}
