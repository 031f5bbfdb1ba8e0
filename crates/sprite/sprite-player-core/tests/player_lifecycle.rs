use pollster::block_on;
use sprite_player_core::{FrameId, LoadOutcome, LoadState, Opacity, PlayerError, SpriteNode};
use sprite_test_fixtures::{sprite_markup, timeline_script, IndicatorEvent, Rig};

fn loaded_cyclic() -> Rig {
    let mut rig = Rig::new();
    let player = rig.add_fixture("cyclic_group", "cyclic_group").unwrap();
    block_on(player.init()).unwrap();
    rig
}

#[test]
fn init_builds_mounts_and_shows_first_frame() {
    let rig = loaded_cyclic();
    let player = rig.registry.get("cyclic_group").unwrap();

    assert_eq!(player.state(), LoadState::Ready);
    assert_eq!(player.frame_count(), 3);
    assert_eq!(player.total_duration(), Some(4.0));
    assert_eq!(player.current_frame(), Some(FrameId(1)));
    assert_eq!(player.paused_offset(), Some(0.0));
    assert!(!player.is_playing());

    let root = rig.host.mounted("cyclic_group").unwrap();
    assert!(root.is_visible());
    assert_eq!(
        root.child_ids(),
        vec!["background", "frame_1", "frame_2", "frame_3", "frame_4"]
    );
    assert_eq!(root.shown_ids(), vec!["background", "frame_1"]);
    assert_eq!(
        root.child("frame_4").unwrap().opacity(),
        Some(Opacity::Hidden)
    );
}

#[test]
fn progress_is_monotonic_and_overlay_is_cleaned_up() {
    let rig = loaded_cyclic();
    let progress = rig.host.progress("cyclic_group");
    assert_eq!(progress.first(), Some(&5.0));
    assert_eq!(progress.last(), Some(&100.0));
    assert!(progress.windows(2).all(|w| w[0] < w[1]), "{progress:?}");
    for milestone in [15.0, 25.0, 50.0, 60.0, 90.0] {
        assert!(progress.contains(&milestone), "missing {milestone}");
    }
    assert_eq!(
        rig.host.indicator_events("cyclic_group").last(),
        Some(&IndicatorEvent::Cleanup(LoadOutcome::Loaded))
    );
}

#[test]
fn scenario_a_resolves_frames_by_elapsed_time() {
    let rig = loaded_cyclic();
    let player = rig.registry.get("cyclic_group").unwrap();
    player.play();
    assert!(player.is_playing());

    player.update(10_000.0);
    assert_eq!(player.current_frame(), Some(FrameId(1)));
    player.update(10_500.0);
    assert_eq!(player.current_frame(), Some(FrameId(1)));
    player.update(11_500.0);
    assert_eq!(player.current_frame(), Some(FrameId(2)));
    player.update(13_900.0);
    assert_eq!(player.current_frame(), Some(FrameId(3)));
    player.update(14_000.0);
    assert_eq!(player.current_frame(), Some(FrameId(1)));

    let root = rig.host.mounted("cyclic_group").unwrap();
    assert_eq!(root.shown_ids(), vec!["background", "frame_1"]);
}

#[test]
fn update_is_idempotent_for_the_same_timestamp() {
    let rig = loaded_cyclic();
    let player = rig.registry.get("cyclic_group").unwrap();
    let root = rig.host.mounted("cyclic_group").unwrap();
    player.play();
    player.update(10_000.0);

    assert!(player.update(11_500.0));
    let writes = root.total_writes();
    assert!(!player.update(11_500.0));
    assert_eq!(root.total_writes(), writes);
    assert_eq!(player.current_frame(), Some(FrameId(2)));
}

#[test]
fn pause_then_play_resumes_on_the_same_frame() {
    let rig = loaded_cyclic();
    let player = rig.registry.get("cyclic_group").unwrap();
    player.play();
    player.update(10_000.0);
    player.update(11_500.0);
    assert_eq!(player.current_frame(), Some(FrameId(2)));

    rig.clock.set(11_500.0);
    player.pause();
    assert!(!player.is_playing());
    assert_eq!(player.paused_offset(), Some(1.5));
    assert!(!rig.scheduler().is_active(player.id()));

    player.play();
    assert!(!player.update(11_500.0));
    assert_eq!(player.current_frame(), Some(FrameId(2)));
    player.update(12_000.0);
    assert_eq!(player.current_frame(), Some(FrameId(3)));
}

#[test]
fn goto_unknown_frame_is_a_no_op() {
    let rig = loaded_cyclic();
    let player = rig.registry.get("cyclic_group").unwrap();
    let root = rig.host.mounted("cyclic_group").unwrap();
    let before = player.transport();
    let writes = root.total_writes();

    // frame 4 exists in the sprite but not in the timeline; 9 was dropped
    for frame in [4, 9, 1234] {
        player.goto_frame(frame);
    }
    assert_eq!(player.transport(), before);
    assert_eq!(root.total_writes(), writes);
}

#[test]
fn goto_frame_pauses_at_its_start_time() {
    let rig = loaded_cyclic();
    let player = rig.registry.get("cyclic_group").unwrap();
    player.play();
    player.update(10_000.0);

    player.goto_frame(3);
    assert!(!player.is_playing());
    assert_eq!(player.current_frame(), Some(FrameId(3)));
    assert_eq!(player.paused_offset(), Some(2.0));
    let root = rig.host.mounted("cyclic_group").unwrap();
    assert_eq!(root.shown_ids(), vec!["background", "frame_3"]);

    player.play();
    player.update(20_000.0);
    assert_eq!(player.current_frame(), Some(FrameId(3)));
    player.update(21_999.0);
    assert_eq!(player.current_frame(), Some(FrameId(3)));
    player.update(22_000.0);
    assert_eq!(player.current_frame(), Some(FrameId(1)));
}

#[test]
fn show_first_frame_resets_playback() {
    let rig = loaded_cyclic();
    let player = rig.registry.get("cyclic_group").unwrap();
    player.play();
    player.update(10_000.0);
    player.update(13_000.0);
    assert_eq!(player.current_frame(), Some(FrameId(3)));

    player.show_first_frame();
    assert!(!player.is_playing());
    assert_eq!(player.current_frame(), Some(FrameId(1)));
    assert_eq!(player.paused_offset(), Some(0.0));
    let root = rig.host.mounted("cyclic_group").unwrap();
    assert_eq!(root.shown_ids(), vec!["background", "frame_1"]);
}

#[test]
fn double_init_reuses_the_same_load() {
    let mut rig = Rig::new();
    let player = rig.add_fixture("cyclic_group", "cyclic_group").unwrap();

    let first = player.init();
    let second = player.init();
    assert_eq!(player.state(), LoadState::Loading);
    let (a, b) = block_on(async { (first.await, second.await) });
    assert!(a.is_ok() && b.is_ok());
    assert_eq!(rig.host.fetch_count("anim/cyclic_group/timeline.js"), 1);
    assert_eq!(rig.host.fetch_count("anim/cyclic_group/sprite.svg"), 1);

    block_on(player.init()).unwrap();
    assert_eq!(rig.host.fetch_count("anim/cyclic_group/sprite.svg"), 1);
    assert_eq!(rig.host.mount_count(), 1);
}

#[test]
fn transport_calls_before_init_are_harmless() {
    let mut rig = Rig::new();
    let player = rig.add_fixture("cyclic_group", "cyclic_group").unwrap();
    player.play();
    player.pause();
    player.goto_frame(2);
    player.show_first_frame();
    assert!(!player.update(5_000.0));
    assert_eq!(player.state(), LoadState::Uninitialized);
    assert_eq!(rig.scheduler().active_count(), 0);
    assert!(rig.host.fetches().is_empty());
}

#[test]
fn scenario_b_empty_sprite_resolves_and_play_does_nothing() {
    let mut rig = Rig::new();
    let player = rig.add_fixture("blank", "blank").unwrap();
    block_on(player.init()).unwrap();

    assert_eq!(player.state(), LoadState::Ready);
    assert_eq!(player.frame_count(), 0);
    player.play();
    player.goto_frame(1);
    player.show_first_frame();
    player.pause();
    assert!(!player.is_playing());
    assert!(!player.update(2_000.0));
    assert_eq!(rig.scheduler().active_count(), 0);

    let root = rig.host.mounted("blank").unwrap();
    assert_eq!(root.child_ids(), vec!["background"]);
}

#[test]
fn timeline_with_only_unknown_frames_is_inert() {
    let mut rig = Rig::new();
    let player = rig.add_fixture("orphaned", "orphaned").unwrap();
    block_on(player.init()).unwrap();
    assert_eq!(player.state(), LoadState::Ready);
    assert_eq!(player.transport(), None);
    player.play();
    assert!(!rig.scheduler().is_running());
}

#[test]
fn sprite_fetch_failure_is_contained() {
    let mut rig = Rig::new();
    let broken = rig
        .add_assets("broken", "", &timeline_script("broken", &[(1, 1.0)]))
        .unwrap();
    rig.host.remove_file("anim/broken/sprite.svg");
    let healthy = rig.add_fixture("cyclic_group", "cyclic_group").unwrap();

    let err = block_on(broken.init()).err().unwrap();
    assert!(matches!(err, PlayerError::SpriteFetch { ref path, .. } if path == "anim/broken/sprite.svg"));
    assert!(err.is_recoverable());
    assert_eq!(broken.state(), LoadState::Failed);
    assert_eq!(
        rig.host.indicator_events("broken").last(),
        Some(&IndicatorEvent::Cleanup(LoadOutcome::Failed))
    );
    broken.play();
    assert!(!broken.is_playing());

    block_on(healthy.init()).unwrap();
    healthy.play();
    assert!(healthy.is_playing());

    // a later init retries from scratch
    rig.host
        .insert_file("anim/broken/sprite.svg", sprite_markup(&[1], false));
    block_on(broken.init()).unwrap();
    assert_eq!(broken.state(), LoadState::Ready);
    assert_eq!(rig.host.fetch_count("anim/broken/sprite.svg"), 2);
}

#[test]
fn mount_failure_leaves_the_player_unplayable() {
    let mut rig = Rig::new();
    let player = rig.add_fixture("cyclic_group", "cyclic_group").unwrap();
    rig.host.fail_mount(true);
    let err = block_on(player.init()).err().unwrap();
    assert_eq!(err.category(), "render");
    assert_eq!(player.state(), LoadState::Failed);
    assert_eq!(player.transport(), None);
}

#[test]
fn preview_is_shown_and_missing_preview_is_swallowed() {
    let mut rig = Rig::new();
    let with_preview = rig.add_fixture("cyclic_group", "cyclic_group").unwrap();
    let without = rig.add_fixture("blank", "blank").unwrap();

    block_on(with_preview.load_preview());
    block_on(without.load_preview());

    let previews = rig.host.previews();
    assert_eq!(previews.len(), 1);
    assert_eq!(previews[0].0, "cyclic_group");
    assert!(previews[0].1.contains("<circle"));
    assert_eq!(without.state(), LoadState::Uninitialized);
}

#[test]
fn sprite_root_stays_hidden_until_mounted() {
    let mut rig = Rig::new();
    let player = rig.add_fixture("cyclic_group", "cyclic_group").unwrap();
    rig.host.fail_mount(true);
    let _ = block_on(player.init());
    assert!(rig.host.mounted("cyclic_group").is_none());

    rig.host.fail_mount(false);
    block_on(player.init()).unwrap();
    let root = rig.host.mounted("cyclic_group").unwrap();
    assert!(root.is_visible());
    root.set_visible(false);
    assert!(!root.is_visible());
}
