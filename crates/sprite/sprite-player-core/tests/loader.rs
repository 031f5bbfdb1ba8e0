use pollster::block_on;
use sprite_player_core::loader::build_timeline;
use sprite_player_core::{
    load_animation, AnimationSource, Config, ContainerAttributes, FrameId, NoIndicator,
    PlayerError, Stage, TimelineEntry,
};
use sprite_test_fixtures::{sprite_markup, timeline_script, MemoryHost};

fn source(id: &str) -> AnimationSource {
    AnimationSource::from_attributes(&ContainerAttributes::new(id, format!("anim/{id}"))).unwrap()
}

fn host_with(id: &str, frames: &[u32], entries: &[(u32, f64)]) -> MemoryHost {
    let host = MemoryHost::new();
    host.insert_file(format!("anim/{id}/sprite.svg"), sprite_markup(frames, true));
    host.insert_file(
        format!("anim/{id}/timeline.js"),
        timeline_script(id, entries),
    );
    host
}

#[test]
fn attaches_in_batches_with_yields() {
    let frames: Vec<u32> = (0..25).collect();
    let entries: Vec<(u32, f64)> = frames.iter().map(|f| (*f, 0.04)).collect();
    let host = host_with("big", &frames, &entries);

    let loaded = block_on(load_animation(
        &host,
        &source("big"),
        &Config::default(),
        &mut NoIndicator,
    ))
    .unwrap();

    // root + background + ceil(25 / 10) frame batches
    assert_eq!(host.parses(), 5);
    // 2 fetches, 5 parse batches, 3 attach batches, 2 build batches
    assert!(host.yields() >= 5 + 3 + 2, "yields: {}", host.yields());
    assert_eq!(loaded.frames.len(), 25);
    assert_eq!(loaded.root.children().len(), 26);
    let timeline = loaded.timeline.unwrap();
    assert_eq!(timeline.len(), 25);
    assert!((timeline.total_duration() - 1.0).abs() < 1e-9);
}

#[test]
fn malformed_batch_is_skipped_and_the_rest_attach() {
    let frames: Vec<u32> = (1..=12).collect();
    let entries: Vec<(u32, f64)> = frames.iter().map(|f| (*f, 0.5)).collect();
    let sprite = sprite_markup(&frames, true).replace(
        r#"<g id="frame_3"><circle r="3"/></g>"#,
        r#"<g id="frame_3"><circle r="3"></g>"#,
    );
    let host = MemoryHost::new();
    host.insert_file("anim/torn/sprite.svg", sprite);
    host.insert_file("anim/torn/timeline.js", timeline_script("torn", &entries));

    let loaded = block_on(load_animation(
        &host,
        &source("torn"),
        &Config::default(),
        &mut NoIndicator,
    ))
    .unwrap();

    // frames 1..=10 shared the broken batch
    let kept: Vec<FrameId> = loaded.frames.keys().copied().collect();
    assert_eq!(kept, vec![FrameId(11), FrameId(12)]);
    let timeline = loaded.timeline.unwrap();
    assert_eq!(timeline.len(), 2);
    assert_eq!(timeline.first_frame(), FrameId(11));
}

#[test]
fn parse_and_attach_progress_stay_in_their_bands() {
    let frames: Vec<u32> = (1..=40).collect();
    let entries: Vec<(u32, f64)> = frames.iter().map(|f| (*f, 0.1)).collect();
    let host = host_with("bands", &frames, &entries);
    let container = "bands".to_string();
    let mut indicator = host.loading_indicator(&container);

    block_on(load_animation(
        &host,
        &source("bands"),
        &Config::default(),
        &mut indicator,
    ))
    .unwrap();

    let progress = host.progress("bands");
    assert!(progress.windows(2).all(|w| w[0] < w[1]), "{progress:?}");
    let parse: Vec<f64> = progress
        .iter()
        .copied()
        .filter(|p| *p > 25.0 && *p < 50.0)
        .collect();
    assert!(!parse.is_empty());
    let attach: Vec<f64> = progress
        .iter()
        .copied()
        .filter(|p| *p > 60.0 && *p < 90.0)
        .collect();
    assert_eq!(attach.len(), 3);
    assert_eq!(progress.last(), Some(&100.0));
}

#[test]
fn only_timeline_frames_are_kept() {
    let host = host_with("subset", &[1, 2, 3, 4], &[(2, 0.5), (7, 1.0), (4, 0.5)]);
    let loaded = block_on(load_animation(
        &host,
        &source("subset"),
        &Config::default(),
        &mut NoIndicator,
    ))
    .unwrap();
    let kept: Vec<FrameId> = loaded.frames.keys().copied().collect();
    assert_eq!(kept, vec![FrameId(2), FrameId(4)]);
    assert_eq!(loaded.root.children().len(), 5);
    assert_eq!(loaded.timeline.unwrap().total_duration(), 1.0);
}

#[test]
fn timeline_fetch_failure_names_the_path() {
    let host = MemoryHost::new();
    host.insert_file("anim/lost/sprite.svg", sprite_markup(&[1], false));
    let err = block_on(load_animation(
        &host,
        &source("lost"),
        &Config::default(),
        &mut NoIndicator,
    ))
    .unwrap_err();
    assert!(matches!(
        err,
        PlayerError::TimelineFetch { ref path, .. } if path == "anim/lost/timeline.js"
    ));
    assert!(host.fetch_count("anim/lost/sprite.svg") == 0);
}

#[test]
fn timeline_without_entries_is_not_found() {
    let host = MemoryHost::new();
    host.insert_file("anim/odd/timeline.js", "window.ready = true;");
    host.insert_file("anim/odd/sprite.svg", sprite_markup(&[1], false));
    let err = block_on(load_animation(
        &host,
        &source("odd"),
        &Config::default(),
        &mut NoIndicator,
    ))
    .unwrap_err();
    assert_eq!(err.to_string(), "Timeline odd_timeline not found");
}

#[test]
fn another_animations_timeline_is_not_found() {
    let host = MemoryHost::new();
    host.insert_file(
        "anim/mine/timeline.js",
        timeline_script("other", &[(1, 1.0), (2, 1.0)]),
    );
    host.insert_file("anim/mine/sprite.svg", sprite_markup(&[1, 2], false));
    let err = block_on(load_animation(
        &host,
        &source("mine"),
        &Config::default(),
        &mut NoIndicator,
    ))
    .unwrap_err();
    assert_eq!(err.to_string(), "Timeline mine_timeline not found");
    assert_eq!(host.fetch_count("anim/mine/sprite.svg"), 0);
}

#[test]
fn configured_file_names_are_used() {
    let host = MemoryHost::new();
    host.insert_file("anim/cfg/frames.svg", sprite_markup(&[1, 2], false));
    host.insert_file("anim/cfg/order.json", r#"[{"frame": 2, "duration": 0.25}]"#);
    let config = Config {
        sprite_file: "frames.svg".into(),
        timeline_file: "order.json".into(),
        ..Config::default()
    };
    let loaded =
        block_on(load_animation(&host, &source("cfg"), &config, &mut NoIndicator)).unwrap();
    assert_eq!(loaded.timeline.unwrap().first_frame(), FrameId(2));
}

#[test]
fn build_timeline_yields_between_batches() {
    let host = MemoryHost::new();
    let entries: Vec<TimelineEntry> = (0..45).map(|f| TimelineEntry::new(f, 0.1)).collect();
    let timeline = block_on(build_timeline(&host, entries, |f| f.0 % 2 == 0, 20)).unwrap();
    assert_eq!(host.yields(), 3);
    assert_eq!(timeline.len(), 23);
}
