use std::sync::Arc;

use rand::Rng;
use tracing::{debug, warn};

use crate::{
    assets::decode::{PreparedImage, PreparedOverlay},
    assets::store::{OverlayLibrary, Resolution, SceneAssets},
    audio::media::AudioPcm,
    foundation::core::{Canvas, Fps},
    layout::stage::{SceneLayout, StagePosition},
    motion::camera::{CameraMove, CameraPath},
    script::model::StoryboardRef,
    text::subtitle::{PreparedSubtitle, SubtitleEngine, SubtitleStyle, subtitle_text},
};

/// Shortest clip a unit may produce, regardless of audio length.
pub const MIN_UNIT_DURATION_SEC: f64 = 0.5;

/// Duration substituted when a storyboard's audio is missing or empty.
pub const FALLBACK_UNIT_DURATION_SEC: f64 = 3.0;

/// Character display width as a fraction of the canvas width.
pub const CHAR_WIDTH_FRAC: f64 = 0.30;

/// Narrower display width used when the roster is larger than two, to
/// reduce overlap.
pub const CHAR_WIDTH_FRAC_CROWDED: f64 = 0.22;

/// Expression overlay width as a fraction of its character's display width.
pub const OVERLAY_WIDTH_FRAC: f64 = 0.35;

/// Face anchor within the character box (x, y fractions from top-left).
pub const FACE_OFFSET_FRAC: (f64, f64) = (0.5, 0.18);

/// One character layer of a render unit.
#[derive(Clone, Debug)]
pub struct CharacterLayer {
    pub name: String,
    pub position: StagePosition,
    pub art: Arc<PreparedImage>,
    pub is_speaker: bool,
}

/// One fully resolved, timed clip corresponding to exactly one storyboard.
///
/// The background is scene-scoped and shared read-only across all units of
/// the same scene; everything else is owned by the unit and released when
/// it is folded into the final timeline.
#[derive(Clone, Debug)]
pub struct RenderUnit {
    pub scene_idx: usize,
    pub duration_sec: f64,
    pub frames: u64,
    pub background: Arc<PreparedImage>,
    /// Scene roster size, which drives the character display width even
    /// when some members have no resolvable art.
    pub roster_size: usize,
    pub characters: Vec<CharacterLayer>,
    /// Animated expression overlay for the speaking character, if any.
    pub overlay: Option<PreparedOverlay>,
    pub camera: CameraPath,
    pub subtitle: Option<PreparedSubtitle>,
    /// Decoded speech for this line; `None` renders the unit silent.
    pub audio: Option<Arc<AudioPcm>>,
}

/// Clip duration rule: at least [`MIN_UNIT_DURATION_SEC`] of whatever the
/// audio measures, or [`FALLBACK_UNIT_DURATION_SEC`] when there is no
/// usable audio at all.
pub fn unit_duration_sec(audio: Option<&AudioPcm>) -> f64 {
    match audio {
        Some(pcm) if !pcm.is_empty() => pcm.duration_sec().max(MIN_UNIT_DURATION_SEC),
        _ => FALLBACK_UNIT_DURATION_SEC,
    }
}

/// Shared context for building the units of one render request.
pub struct UnitFactory<'a, R: Rng> {
    pub canvas: Canvas,
    pub fps: Fps,
    pub style: &'a SubtitleStyle,
    pub overlays: &'a OverlayLibrary,
    pub subtitles: &'a mut SubtitleEngine,
    pub rng: &'a mut R,
}

impl<R: Rng> UnitFactory<'_, R> {
    /// Build the render unit for one storyboard: duration from audio,
    /// scene-shared background, all roster character layers, the speaker's
    /// expression overlay, camera path, subtitle. Every asset failure
    /// degrades to a fallback or a skipped layer.
    pub fn build(
        &mut self,
        board: StoryboardRef<'_>,
        layout: &SceneLayout,
        assets: &SceneAssets,
        audio: Option<AudioPcm>,
    ) -> RenderUnit {
        let audio = audio.filter(|pcm| !pcm.is_empty());
        let duration_sec = unit_duration_sec(audio.as_ref());
        let frames = self.fps.secs_to_frames_round(duration_sec);

        let speaker = board.storyboard.character.trim();
        let characters: Vec<CharacterLayer> = layout
            .slots()
            .iter()
            .filter_map(|(name, position)| {
                assets.character_art.get(name).map(|art| CharacterLayer {
                    name: name.clone(),
                    position: *position,
                    art: Arc::clone(art),
                    is_speaker: name == speaker,
                })
            })
            .collect();

        let target = layout.camera_target(board.storyboard);
        let camera = if target.force_static {
            CameraPath::fixed(target.position)
        } else {
            CameraPath::new(
                CameraMove::parse(&board.sub_scene.camera_movement),
                target.position,
                duration_sec,
            )
        };

        // Only a speaker with an on-screen character layer can carry the
        // animated expression variant.
        let overlay = if characters.iter().any(|c| c.is_speaker) {
            match self.overlays.resolve(&board.storyboard.expression, self.rng) {
                Resolution::Ready(overlay) => Some(overlay),
                Resolution::Fallback { value, reason } => {
                    warn!(%reason, "expression overlay fallback");
                    Some(value)
                }
                Resolution::Skip { reason } => {
                    debug!(%reason, "expression overlay skipped");
                    None
                }
            }
        } else {
            None
        };

        let text = subtitle_text(&board.storyboard.character, &board.storyboard.line);
        let max_width_px = (f64::from(self.canvas.width) * self.style.max_width_frac) as f32;
        let subtitle = match self.subtitles.shape(&text, self.style, max_width_px) {
            Resolution::Ready(sub) => Some(sub),
            Resolution::Fallback { value, reason } => {
                warn!(%reason, "subtitle fallback");
                Some(value)
            }
            Resolution::Skip { reason } => {
                debug!(%reason, "subtitle skipped");
                None
            }
        };

        RenderUnit {
            scene_idx: board.scene_idx,
            duration_sec,
            frames,
            background: Arc::clone(&assets.background),
            roster_size: layout.roster_size(),
            characters,
            overlay,
            camera,
            subtitle,
            audio: audio.map(Arc::new),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compose/unit.rs"]
mod tests;
