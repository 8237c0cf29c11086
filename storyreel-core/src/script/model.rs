use std::path::PathBuf;

use crate::foundation::error::{StoryreelError, StoryreelResult};

/// Substituted for a blank or missing scene description.
pub const DEFAULT_SCENE_DESC: &str = "indoor scene";

/// Reserved speaker names that mark a line as narration rather than
/// character dialogue. Matched case-insensitively.
pub const NARRATOR_SENTINELS: [&str; 2] = ["narrator", "旁白"];

/// Whether a speaker name is the narrator sentinel in either locale.
pub fn is_narrator(name: &str) -> bool {
    let name = name.trim();
    NARRATOR_SENTINELS
        .iter()
        .any(|s| name.eq_ignore_ascii_case(s) || name == *s)
}

/// A validated scene script.
///
/// A script is a pure data model produced by the upstream script generator
/// and accepted here through [`Script::from_value`] / [`Script::from_json_str`],
/// which apply the structural validation rules before anything is rendered.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Script {
    pub scenes: Vec<Scene>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Scene {
    pub scene_id: i64,
    /// Narrative description of the scene. Defaulted when blank.
    #[serde(default)]
    pub scene_desc: String,
    /// Resolved local path of the scene's background image, if any.
    #[serde(default)]
    pub background: Option<PathBuf>,
    /// Resolved local path of the scene's background music, if any.
    #[serde(default)]
    pub bgm: Option<PathBuf>,
    #[serde(default)]
    pub sub_scenes: Vec<SubScene>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct SubScene {
    pub sub_scene_id: i64,
    /// Free-form camera movement tag. Interpreted by
    /// [`CameraMove::parse`](crate::motion::camera::CameraMove::parse).
    #[serde(default = "default_camera_movement")]
    pub camera_movement: String,
    #[serde(default)]
    pub storyboards: Vec<Storyboard>,
}

/// One spoken or narrated line: the atomic unit of timing.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Storyboard {
    /// Speaker name, or a narrator sentinel (see [`is_narrator`]).
    pub character: String,
    /// Emotion tag used to select an expression overlay asset.
    #[serde(default)]
    pub expression: String,
    /// The spoken text.
    pub line: String,
    /// Resolved local path of the speaker's character art, if any.
    #[serde(default)]
    pub character_image: Option<PathBuf>,
}

fn default_camera_movement() -> String {
    "static".to_string()
}

/// A storyboard with its position in the script, yielded in flattened
/// document order by [`Script::storyboards`].
#[derive(Clone, Copy, Debug)]
pub struct StoryboardRef<'a> {
    pub scene_idx: usize,
    pub scene: &'a Scene,
    pub sub_scene: &'a SubScene,
    pub storyboard: &'a Storyboard,
}

impl Script {
    /// Validate raw structured data from the script generator.
    ///
    /// The root may be an object holding a `scenes` array or a bare array
    /// of scenes. Rules, in order:
    /// - scenes with a missing or empty `sub_scenes` sequence are dropped;
    /// - a blank `scene_desc` is replaced with [`DEFAULT_SCENE_DESC`];
    /// - sub-scenes with zero storyboards are retained (they simply
    ///   contribute no units downstream);
    /// - character names, expressions and lines pass through uninterpreted.
    pub fn from_value(value: serde_json::Value) -> StoryreelResult<Self> {
        let scenes_value = match value {
            serde_json::Value::Array(a) => serde_json::Value::Array(a),
            serde_json::Value::Object(mut o) => o
                .remove("scenes")
                .ok_or_else(|| StoryreelError::schema("script object is missing 'scenes'"))?,
            other => {
                return Err(StoryreelError::schema(format!(
                    "script root must be an object or array, got {}",
                    json_type_name(&other)
                )));
            }
        };

        let scenes: Vec<Scene> = serde_json::from_value(scenes_value)
            .map_err(|e| StoryreelError::schema(format!("invalid scene list: {e}")))?;

        let mut script = Self { scenes };
        script.normalize();
        Ok(script)
    }

    /// Parse and validate a JSON document. See [`Script::from_value`].
    pub fn from_json_str(s: &str) -> StoryreelResult<Self> {
        let value: serde_json::Value = serde_json::from_str(s)
            .map_err(|e| StoryreelError::schema(format!("script is not valid JSON: {e}")))?;
        Self::from_value(value)
    }

    fn normalize(&mut self) {
        self.scenes.retain(|s| !s.sub_scenes.is_empty());
        for scene in &mut self.scenes {
            if scene.scene_desc.trim().is_empty() {
                scene.scene_desc = DEFAULT_SCENE_DESC.to_string();
            }
        }
    }

    /// All storyboards across all scenes, in flattened document order.
    /// The Nth item here pairs with the Nth audio asset.
    pub fn storyboards(&self) -> impl Iterator<Item = StoryboardRef<'_>> {
        self.scenes.iter().enumerate().flat_map(|(scene_idx, scene)| {
            scene.sub_scenes.iter().flat_map(move |sub_scene| {
                sub_scene.storyboards.iter().map(move |storyboard| StoryboardRef {
                    scene_idx,
                    scene,
                    sub_scene,
                    storyboard,
                })
            })
        })
    }

    pub fn storyboard_count(&self) -> usize {
        self.storyboards().count()
    }
}

fn json_type_name(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[path = "../../tests/unit/script/model.rs"]
mod tests;
