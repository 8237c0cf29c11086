use super::*;

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::assets::decode::solid_frame;
use crate::script::model::{Scene, Storyboard, SubScene};

const CANVAS: Canvas = Canvas {
    width: 100,
    height: 50,
};
const FPS: Fps = Fps { num: 24, den: 1 };

fn make_pcm(duration_sec: f64) -> AudioPcm {
    let frames = (duration_sec * 48_000.0) as usize;
    AudioPcm {
        sample_rate: 48_000,
        channels: 2,
        interleaved_f32: vec![0.1; frames * 2],
    }
}

fn make_scene(speakers: &[&str], movement: &str) -> Scene {
    Scene {
        scene_id: 1,
        scene_desc: "test".to_string(),
        background: None,
        bgm: None,
        sub_scenes: vec![SubScene {
            sub_scene_id: 1,
            camera_movement: movement.to_string(),
            storyboards: speakers
                .iter()
                .map(|s| Storyboard {
                    character: s.to_string(),
                    expression: "smile".to_string(),
                    line: format!("{s} says hi"),
                    character_image: None,
                })
                .collect(),
        }],
    }
}

fn assets_with_art(names: &[&str]) -> SceneAssets {
    let mut character_art = BTreeMap::new();
    for name in names {
        character_art.insert(
            name.to_string(),
            Arc::new(solid_frame(
                Canvas {
                    width: 10,
                    height: 20,
                },
                [255, 0, 0, 255],
            )),
        );
    }
    SceneAssets {
        background: Arc::new(solid_frame(CANVAS, [5, 5, 5, 255])),
        background_fallback: None,
        character_art,
    }
}

struct Fixture {
    style: SubtitleStyle,
    overlays: OverlayLibrary,
    subtitles: SubtitleEngine,
    rng: StdRng,
}

impl Fixture {
    fn new() -> Self {
        Self {
            style: SubtitleStyle::default(),
            overlays: OverlayLibrary::new(None),
            subtitles: SubtitleEngine::new(&[], &[]),
            rng: StdRng::seed_from_u64(1),
        }
    }

    fn build(
        &mut self,
        scene: &Scene,
        board_idx: usize,
        audio: Option<AudioPcm>,
    ) -> RenderUnit {
        let layout = SceneLayout::for_scene(scene);
        let assets_names: Vec<&str> = layout.slots().iter().map(|(n, _)| n.as_str()).collect();
        let assets = assets_with_art(&assets_names);
        let board = StoryboardRef {
            scene_idx: 0,
            scene,
            sub_scene: &scene.sub_scenes[0],
            storyboard: &scene.sub_scenes[0].storyboards[board_idx],
        };
        let mut factory = UnitFactory {
            canvas: CANVAS,
            fps: FPS,
            style: &self.style,
            overlays: &self.overlays,
            subtitles: &mut self.subtitles,
            rng: &mut self.rng,
        };
        factory.build(board, &layout, &assets, audio)
    }
}

#[test]
fn duration_rule_clamps_and_falls_back() {
    assert_eq!(unit_duration_sec(None), FALLBACK_UNIT_DURATION_SEC);
    assert_eq!(
        unit_duration_sec(Some(&make_pcm(0.0))),
        FALLBACK_UNIT_DURATION_SEC
    );
    assert_eq!(unit_duration_sec(Some(&make_pcm(0.3))), MIN_UNIT_DURATION_SEC);
    let d = unit_duration_sec(Some(&make_pcm(2.0)));
    assert!((d - 2.0).abs() < 1e-6);
}

#[test]
fn silent_units_use_the_fallback_duration() {
    let scene = make_scene(&["Alex"], "pan");
    let unit = Fixture::new().build(&scene, 0, None);

    assert_eq!(unit.duration_sec, FALLBACK_UNIT_DURATION_SEC);
    assert_eq!(unit.frames, 72);
    assert!(unit.audio.is_none());
}

#[test]
fn short_audio_is_clamped_to_the_floor() {
    let scene = make_scene(&["Alex"], "pan");
    let unit = Fixture::new().build(&scene, 0, Some(make_pcm(0.3)));

    assert_eq!(unit.duration_sec, MIN_UNIT_DURATION_SEC);
    assert_eq!(unit.frames, 12);
    assert!(unit.audio.is_some());
}

#[test]
fn narrator_units_have_no_characters_and_a_fixed_center_camera() {
    let scene = make_scene(&["narrator"], "pan");
    let unit = Fixture::new().build(&scene, 0, Some(make_pcm(1.0)));

    assert!(unit.characters.is_empty());
    assert!(unit.overlay.is_none());
    assert_eq!(unit.camera.movement(), crate::motion::camera::CameraMove::Static);
    assert_eq!(
        unit.camera.target(),
        crate::layout::stage::StagePosition::Center
    );
}

#[test]
fn rostered_speakers_keep_the_authored_movement_and_their_position() {
    let scene = make_scene(&["Alex", "Sam"], "pan");
    let unit = Fixture::new().build(&scene, 1, Some(make_pcm(1.0)));

    assert_eq!(unit.characters.len(), 2);
    assert!(unit.characters.iter().any(|c| c.name == "Sam" && c.is_speaker));
    assert!(unit.characters.iter().any(|c| c.name == "Alex" && !c.is_speaker));
    assert_eq!(unit.camera.movement(), crate::motion::camera::CameraMove::ZoomPan);
    assert_eq!(
        unit.camera.target(),
        crate::layout::stage::StagePosition::Right
    );
}

#[test]
fn static_movement_tags_stay_static_for_rostered_speakers() {
    let scene = make_scene(&["Alex"], "静止");
    let unit = Fixture::new().build(&scene, 0, Some(make_pcm(1.0)));
    assert_eq!(unit.camera.movement(), crate::motion::camera::CameraMove::Static);
}

#[test]
fn missing_art_drops_the_layer_but_not_the_unit() {
    let scene = make_scene(&["Alex"], "pan");
    let mut fixture = Fixture::new();

    // Empty art map: the scene's only character has no resolvable art.
    let layout = SceneLayout::for_scene(&scene);
    let assets = SceneAssets {
        background: Arc::new(solid_frame(CANVAS, [5, 5, 5, 255])),
        background_fallback: Some("no background".to_string()),
        character_art: BTreeMap::new(),
    };
    let board = StoryboardRef {
        scene_idx: 0,
        scene: &scene,
        sub_scene: &scene.sub_scenes[0],
        storyboard: &scene.sub_scenes[0].storyboards[0],
    };
    let mut factory = UnitFactory {
        canvas: CANVAS,
        fps: FPS,
        style: &fixture.style,
        overlays: &fixture.overlays,
        subtitles: &mut fixture.subtitles,
        rng: &mut fixture.rng,
    };
    let unit = factory.build(board, &layout, &assets, None);

    assert!(unit.characters.is_empty());
    assert!(unit.overlay.is_none());
    assert_eq!(unit.frames, 72);
}

#[test]
fn subtitles_are_skipped_without_a_font() {
    let scene = make_scene(&["Alex"], "pan");
    let unit = Fixture::new().build(&scene, 0, Some(make_pcm(1.0)));
    assert!(unit.subtitle.is_none());
}
