use super::*;
use crate::script::model::{Scene, Storyboard, SubScene};

fn board(character: &str) -> Storyboard {
    Storyboard {
        character: character.to_string(),
        expression: String::new(),
        line: "...".to_string(),
        character_image: None,
    }
}

fn scene_with_speakers(speakers: &[&str]) -> Scene {
    Scene {
        scene_id: 1,
        scene_desc: "test".to_string(),
        background: None,
        bgm: None,
        sub_scenes: vec![SubScene {
            sub_scene_id: 1,
            camera_movement: "pan".to_string(),
            storyboards: speakers.iter().map(|s| board(s)).collect(),
        }],
    }
}

#[test]
fn small_rosters_get_fixed_assignments() {
    assert_eq!(assign_positions(1), vec![StagePosition::Center]);
    assert_eq!(
        assign_positions(2),
        vec![StagePosition::Left, StagePosition::Right]
    );
    assert_eq!(
        assign_positions(3),
        vec![
            StagePosition::Left,
            StagePosition::Center,
            StagePosition::Right
        ]
    );
}

#[test]
fn large_rosters_bucket_fractional_coordinates() {
    // n = 5: x_i = 0.2 + 0.1 * (i + 1) = [0.3, 0.4, 0.5, 0.6, 0.7]
    assert_eq!(
        assign_positions(5),
        vec![
            StagePosition::Left,
            StagePosition::Center,
            StagePosition::Center,
            StagePosition::Center,
            StagePosition::Right,
        ]
    );
}

#[test]
fn bucket_boundaries_land_center() {
    assert_eq!(bucket_frac(0.39999), StagePosition::Left);
    assert_eq!(bucket_frac(0.4), StagePosition::Center);
    assert_eq!(bucket_frac(0.6), StagePosition::Center);
    assert_eq!(bucket_frac(0.60001), StagePosition::Right);
}

#[test]
fn roster_preserves_first_appearance_order_and_skips_narration() {
    let scene = scene_with_speakers(&["narrator", "Sam", "Alex", "Sam", "旁白"]);
    let layout = SceneLayout::for_scene(&scene);

    assert_eq!(layout.roster_size(), 2);
    assert_eq!(layout.slots()[0].0, "Sam");
    assert_eq!(layout.slots()[1].0, "Alex");
    assert_eq!(layout.position_of("Sam"), Some(StagePosition::Left));
    assert_eq!(layout.position_of("Alex"), Some(StagePosition::Right));
}

#[test]
fn narrator_lines_target_center_and_force_static() {
    let scene = scene_with_speakers(&["Alex", "narrator"]);
    let layout = SceneLayout::for_scene(&scene);

    let target = layout.camera_target(&board("narrator"));
    assert_eq!(target.position, StagePosition::Center);
    assert!(target.force_static);

    let target = layout.camera_target(&board("旁白"));
    assert_eq!(target.position, StagePosition::Center);
    assert!(target.force_static);
}

#[test]
fn unrostered_speakers_behave_like_narration() {
    let scene = scene_with_speakers(&["Alex"]);
    let layout = SceneLayout::for_scene(&scene);

    let target = layout.camera_target(&board("Stranger"));
    assert_eq!(target.position, StagePosition::Center);
    assert!(target.force_static);
}

#[test]
fn rostered_speakers_target_their_own_position() {
    let scene = scene_with_speakers(&["Alex", "Sam"]);
    let layout = SceneLayout::for_scene(&scene);

    let target = layout.camera_target(&board("Sam"));
    assert_eq!(target.position, StagePosition::Right);
    assert!(!target.force_static);
}

#[test]
fn annotate_yields_one_layout_per_scene() {
    let script = crate::script::model::Script {
        scenes: vec![
            scene_with_speakers(&["Alex"]),
            scene_with_speakers(&["narrator"]),
        ],
    };
    let layouts = annotate(&script);
    assert_eq!(layouts.len(), 2);
    assert_eq!(layouts[0].roster_size(), 1);
    assert_eq!(layouts[1].roster_size(), 0);
}

#[test]
fn anchor_fractions_follow_the_buckets() {
    assert_eq!(StagePosition::Left.anchor_x_frac(), 0.25);
    assert_eq!(StagePosition::Center.anchor_x_frac(), 0.5);
    assert_eq!(StagePosition::Right.anchor_x_frac(), 0.75);
}
