use super::*;

use crate::{
    compose::unit::FALLBACK_UNIT_DURATION_SEC, layout::stage::StagePosition,
    motion::camera::CameraMove,
};

fn make_pcm(duration_sec: f64) -> AudioPcm {
    let frames = (duration_sec * 48_000.0) as usize;
    AudioPcm {
        sample_rate: 48_000,
        channels: 2,
        interleaved_f32: vec![0.1; frames * 2],
    }
}

fn small_opts() -> RenderOpts {
    RenderOpts {
        canvas: Canvas {
            width: 64,
            height: 36,
        },
        font_candidates: Vec::new(),
        font_scan_dirs: Vec::new(),
        ..RenderOpts::default()
    }
}

fn two_scene_script() -> Script {
    // Scene 1: roster {Alex, Sam}, three storyboards (Alex, Sam, Alex).
    // Scene 2: narrator only.
    Script::from_value(serde_json::json!([
        {
            "scene_id": 1,
            "scene_desc": "kitchen",
            "sub_scenes": [{
                "sub_scene_id": 1,
                "camera_movement": "pan",
                "storyboards": [
                    { "character": "Alex", "expression": "smile", "line": "one" },
                    { "character": "Sam", "expression": "angry", "line": "two" },
                    { "character": "Alex", "expression": "sad", "line": "three" },
                ],
            }],
        },
        {
            "scene_id": 2,
            "scene_desc": "void",
            "sub_scenes": [{
                "sub_scene_id": 1,
                "camera_movement": "pan",
                "storyboards": [
                    { "character": "narrator", "expression": "", "line": "four" },
                ],
            }],
        },
    ]))
    .unwrap()
}

fn plan(script: &Script, audio: Vec<Option<AudioPcm>>, opts: &RenderOpts) -> Vec<RenderUnit> {
    let layouts = annotate(script);
    let mut subtitles = SubtitleEngine::new(&opts.font_candidates, &opts.font_scan_dirs);
    let mut rng = StdRng::seed_from_u64(opts.seed);
    plan_units(script, &layouts, audio, opts, &mut subtitles, &mut rng, None).unwrap()
}

#[test]
fn unit_count_matches_storyboards_when_audio_suffices() {
    let script = two_scene_script();
    let opts = small_opts();
    let audio = (0..4).map(|_| Some(make_pcm(1.0))).collect();

    let units = plan(&script, audio, &opts);
    assert_eq!(units.len(), 4);
}

#[test]
fn audio_shortfall_stops_processing_but_keeps_built_units() {
    let script = two_scene_script();
    let opts = small_opts();
    let audio = (0..2).map(|_| Some(make_pcm(1.0))).collect();

    let units = plan(&script, audio, &opts);
    assert_eq!(units.len(), 2);
    assert_eq!(units[0].scene_idx, 0);
    assert_eq!(units[1].scene_idx, 0);
}

#[test]
fn undecodable_audio_yields_a_silent_fallback_unit() {
    let script = two_scene_script();
    let opts = small_opts();
    let audio = vec![Some(make_pcm(1.0)), None, Some(make_pcm(1.0)), None];

    let units = plan(&script, audio, &opts);
    assert_eq!(units.len(), 4);
    assert!(units[1].audio.is_none());
    assert_eq!(units[1].duration_sec, FALLBACK_UNIT_DURATION_SEC);
}

#[test]
fn the_reference_scenario_produces_clamped_durations_in_order() {
    let script = two_scene_script();
    let opts = small_opts();
    let audio = vec![
        Some(make_pcm(2.0)),
        Some(make_pcm(1.5)),
        Some(make_pcm(3.0)),
        Some(make_pcm(0.3)),
    ];

    let units = plan(&script, audio, &opts);
    let durations: Vec<f64> = units.iter().map(|u| u.duration_sec).collect();
    assert_eq!(durations, vec![2.0, 1.5, 3.0, 0.5]);

    let frames: Vec<u64> = units.iter().map(|u| u.frames).collect();
    assert_eq!(frames, vec![48, 36, 72, 12]);

    let total_sec: f64 = units.iter().map(|u| u.duration_sec).sum();
    assert!(total_sec >= 6.8);

    // The narrator unit is centered and static regardless of the authored
    // "pan" movement.
    let narrator = &units[3];
    assert_eq!(narrator.camera.movement(), CameraMove::Static);
    assert_eq!(narrator.camera.target(), StagePosition::Center);
    assert!(narrator.characters.is_empty());

    // Speaking characters target their own roster position.
    assert_eq!(units[0].camera.target(), StagePosition::Left);
    assert_eq!(units[1].camera.target(), StagePosition::Right);
    assert_eq!(units[0].camera.movement(), CameraMove::ZoomPan);
}

#[test]
fn cancellation_is_observed_between_units() {
    let script = two_scene_script();
    let opts = small_opts();
    let layouts = annotate(&script);
    let mut subtitles = SubtitleEngine::new(&[], &[]);
    let mut rng = StdRng::seed_from_u64(0);
    let cancel = CancelToken::new();
    cancel.cancel();

    let err = plan_units(
        &script,
        &layouts,
        vec![Some(make_pcm(1.0))],
        &opts,
        &mut subtitles,
        &mut rng,
        Some(&cancel),
    )
    .unwrap_err();
    assert!(matches!(err, StoryreelError::Cancelled));
}

#[test]
fn scripts_that_validate_to_nothing_fail_with_empty_timeline() {
    let script = Script::from_value(serde_json::json!([
        { "scene_id": 1, "scene_desc": "empty", "sub_scenes": [] },
    ]))
    .unwrap();
    assert!(script.scenes.is_empty());

    let err = render_script(
        &script,
        &[],
        std::env::temp_dir().join("storyreel_empty_test.mp4"),
        &small_opts(),
        None,
    )
    .unwrap_err();
    assert!(matches!(err, StoryreelError::EmptyTimeline));
}

#[test]
fn fractional_fps_is_rejected_for_mp4_output() {
    let script = two_scene_script();
    let mut opts = small_opts();
    opts.fps = Fps {
        num: 30_000,
        den: 1001,
    };

    let err = render_script(
        &script,
        &[],
        std::env::temp_dir().join("storyreel_fps_test.mp4"),
        &opts,
        None,
    )
    .unwrap_err();
    assert!(matches!(err, StoryreelError::Validation(_)));
}

#[test]
fn default_options_are_encodable() {
    let opts = RenderOpts::default();
    assert!(opts.canvas.width.is_multiple_of(2));
    assert!(opts.canvas.height.is_multiple_of(2));
    assert_eq!(opts.fps, Fps { num: 24, den: 1 });
    assert_eq!(opts.bgm_volume, 0.2);
}

#[test]
fn cancel_tokens_start_unset_and_latch() {
    let token = CancelToken::new();
    assert!(!token.is_cancelled());
    let clone = token.clone();
    clone.cancel();
    assert!(token.is_cancelled());
}
