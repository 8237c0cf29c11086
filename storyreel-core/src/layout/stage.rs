use crate::script::model::{Scene, Script, Storyboard, is_narrator};

/// Screen-position bucket a character (and camera motion) is anchored to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum StagePosition {
    Left,
    Center,
    Right,
}

impl StagePosition {
    /// Horizontal anchor of this bucket as a fraction of canvas width.
    pub fn anchor_x_frac(self) -> f64 {
        match self {
            Self::Left => 0.25,
            Self::Center => 0.5,
            Self::Right => 0.75,
        }
    }
}

/// Camera anchoring resolved for one storyboard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CameraTarget {
    pub position: StagePosition,
    /// Narration and unrostered speakers never trigger camera motion.
    pub force_static: bool,
}

/// Per-scene character roster with assigned stage positions.
///
/// The roster holds distinct non-narrator character names in order of first
/// appearance across the scene's storyboards. It is derived for layout only
/// and never persisted.
#[derive(Clone, Debug)]
pub struct SceneLayout {
    slots: Vec<(String, StagePosition)>,
}

impl SceneLayout {
    pub fn for_scene(scene: &Scene) -> Self {
        let mut roster = Vec::<String>::new();
        for sub in &scene.sub_scenes {
            for board in &sub.storyboards {
                let name = board.character.trim();
                if name.is_empty() || is_narrator(name) {
                    continue;
                }
                if !roster.iter().any(|r| r == name) {
                    roster.push(name.to_string());
                }
            }
        }

        let positions = assign_positions(roster.len());
        Self {
            slots: roster.into_iter().zip(positions).collect(),
        }
    }

    pub fn roster_size(&self) -> usize {
        self.slots.len()
    }

    /// Roster members with their positions, in first-appearance order.
    pub fn slots(&self) -> &[(String, StagePosition)] {
        &self.slots
    }

    pub fn position_of(&self, name: &str) -> Option<StagePosition> {
        let name = name.trim();
        self.slots
            .iter()
            .find(|(n, _)| n == name)
            .map(|&(_, pos)| pos)
    }

    /// Camera target for a storyboard of this scene: narrator lines and
    /// speakers absent from the roster are centered with motion forced
    /// static; everyone else targets their roster position.
    pub fn camera_target(&self, board: &Storyboard) -> CameraTarget {
        if is_narrator(&board.character) {
            return CameraTarget {
                position: StagePosition::Center,
                force_static: true,
            };
        }
        match self.position_of(&board.character) {
            Some(position) => CameraTarget {
                position,
                force_static: false,
            },
            None => CameraTarget {
                position: StagePosition::Center,
                force_static: true,
            },
        }
    }
}

/// Derive one [`SceneLayout`] per scene, in scene order.
pub fn annotate(script: &Script) -> Vec<SceneLayout> {
    script.scenes.iter().map(SceneLayout::for_scene).collect()
}

/// Deterministic position assignment by roster size.
///
/// 1 → center; 2 → left, right; 3 → left, center, right. Larger rosters get
/// a fractional coordinate `0.2 + (0.6/(n+1)) * (i+1)` bucketed through
/// [`bucket_frac`]. The clustering this produces for large rosters is a
/// known property of the rule, not corrected here.
pub fn assign_positions(n: usize) -> Vec<StagePosition> {
    match n {
        0 => Vec::new(),
        1 => vec![StagePosition::Center],
        2 => vec![StagePosition::Left, StagePosition::Right],
        3 => vec![
            StagePosition::Left,
            StagePosition::Center,
            StagePosition::Right,
        ],
        _ => (0..n)
            .map(|i| {
                let x = 0.2 + (0.6 / (n as f64 + 1.0)) * (i as f64 + 1.0);
                bucket_frac(x)
            })
            .collect(),
    }
}

/// Bucket a fractional horizontal coordinate: `< 0.4` left, `> 0.6` right,
/// center otherwise (both boundaries land center).
pub fn bucket_frac(x: f64) -> StagePosition {
    if x < 0.4 {
        StagePosition::Left
    } else if x > 0.6 {
        StagePosition::Right
    } else {
        StagePosition::Center
    }
}

#[cfg(test)]
#[path = "../../tests/unit/layout/stage.rs"]
mod tests;
