use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use rand::Rng;
use tracing::warn;

use crate::{
    assets::decode::{self as assets_decode, PreparedImage, PreparedOverlay},
    foundation::core::Canvas,
    layout::stage::SceneLayout,
    script::model::Scene,
};

/// Outcome of one asset-resolution step.
///
/// Asset failures are local and typed rather than thrown: a `Fallback`
/// carries a substitute value, a `Skip` drops just that layer. Neither ever
/// aborts the render.
#[derive(Clone, Debug)]
pub enum Resolution<T> {
    /// The asset resolved as authored.
    Ready(T),
    /// The asset failed to resolve; a substitute is used instead.
    Fallback { value: T, reason: String },
    /// The asset failed to resolve and the layer is omitted.
    Skip { reason: String },
}

impl<T> Resolution<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// The degradation reason, if any.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Ready(_) => None,
            Self::Fallback { reason, .. } | Self::Skip { reason } => Some(reason),
        }
    }

    /// The resolved or substituted value; `None` for a skipped layer.
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Ready(value) | Self::Fallback { value, .. } => Some(value),
            Self::Skip { .. } => None,
        }
    }
}

/// Expression tags every overlay library is expected to ship; one of these
/// is chosen (seeded-randomly) when an authored tag has no asset.
pub const DEFAULT_EXPRESSION_TAGS: [&str; 3] = ["neutral", "smile", "blink"];

const OVERLAY_EXTENSIONS: [&str; 2] = ["gif", "png"];

/// Directory of expression overlay assets, looked up by emotion tag.
#[derive(Clone, Debug, Default)]
pub struct OverlayLibrary {
    dir: Option<PathBuf>,
}

impl OverlayLibrary {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    /// Resolve the overlay for an expression tag.
    ///
    /// The exact tag is tried first (`<dir>/<tag>.gif`, then `.png`); a tag
    /// with no asset falls back to a random member of
    /// [`DEFAULT_EXPRESSION_TAGS`] that is present on disk. The random
    /// source is injected so callers can seed it for determinism.
    pub fn resolve<R: Rng>(&self, tag: &str, rng: &mut R) -> Resolution<PreparedOverlay> {
        let Some(dir) = &self.dir else {
            return Resolution::Skip {
                reason: "no overlay library configured".to_string(),
            };
        };

        let tag = tag.trim();
        if !tag.is_empty()
            && let Some(path) = existing_candidate(dir, tag)
        {
            match load_overlay(&path) {
                Ok(overlay) => return Resolution::Ready(overlay),
                Err(reason) => {
                    return Resolution::Skip {
                        reason: format!("overlay '{}' unreadable: {reason}", path.display()),
                    };
                }
            }
        }

        let defaults: Vec<PathBuf> = DEFAULT_EXPRESSION_TAGS
            .iter()
            .filter_map(|t| existing_candidate(dir, t))
            .collect();
        if defaults.is_empty() {
            return Resolution::Skip {
                reason: format!("expression '{tag}' has no asset and no defaults exist"),
            };
        }

        let pick = &defaults[rng.gen_range(0..defaults.len())];
        match load_overlay(pick) {
            Ok(overlay) => Resolution::Fallback {
                value: overlay,
                reason: format!(
                    "expression '{tag}' has no asset; using default '{}'",
                    pick.display()
                ),
            },
            Err(reason) => Resolution::Skip {
                reason: format!("default overlay '{}' unreadable: {reason}", pick.display()),
            },
        }
    }
}

fn existing_candidate(dir: &Path, tag: &str) -> Option<PathBuf> {
    OVERLAY_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{tag}.{ext}")))
        .find(|p| p.is_file())
}

fn load_overlay(path: &Path) -> Result<PreparedOverlay, String> {
    let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
    assets_decode::decode_overlay(&bytes).map_err(|e| e.to_string())
}

/// Assets prepared once per scene and shared read-only across all of the
/// scene's render units.
#[derive(Clone, Debug)]
pub struct SceneAssets {
    /// Background layer; a solid fill when the scene image fails to resolve.
    pub background: Arc<PreparedImage>,
    /// Degradation reason when the background is the solid fallback.
    pub background_fallback: Option<String>,
    /// Decoded character art by roster member name. Members whose art does
    /// not resolve are simply absent.
    pub character_art: BTreeMap<String, Arc<PreparedImage>>,
}

/// Front-load all IO for one scene: decode the background (or substitute
/// the fallback fill) and the art for every roster member.
pub fn prepare_scene(
    scene: &Scene,
    layout: &SceneLayout,
    canvas: Canvas,
    fallback_rgba: [u8; 4],
) -> SceneAssets {
    let (background, background_fallback) =
        match resolve_background(scene.background.as_deref(), canvas, fallback_rgba) {
            Resolution::Ready(img) => (Arc::new(img), None),
            Resolution::Fallback { value, reason } => {
                warn!(scene_id = scene.scene_id, %reason, "background fallback");
                (Arc::new(value), Some(reason))
            }
            // resolve_background never skips; the fallback fill always exists
            Resolution::Skip { reason } => {
                warn!(scene_id = scene.scene_id, %reason, "background fallback");
                let value = assets_decode::solid_frame(canvas, fallback_rgba);
                (Arc::new(value), Some(reason))
            }
        };

    let mut character_art = BTreeMap::new();
    for (name, _) in layout.slots() {
        match resolve_character_art(scene, name) {
            Resolution::Ready(img) => {
                character_art.insert(name.clone(), Arc::new(img));
            }
            Resolution::Fallback { value, .. } => {
                character_art.insert(name.clone(), Arc::new(value));
            }
            Resolution::Skip { reason } => {
                warn!(scene_id = scene.scene_id, character = %name, %reason, "character layer skipped");
            }
        }
    }

    SceneAssets {
        background,
        background_fallback,
        character_art,
    }
}

/// Resolve a scene background to a decoded image or the solid fallback.
pub fn resolve_background(
    path: Option<&Path>,
    canvas: Canvas,
    fallback_rgba: [u8; 4],
) -> Resolution<PreparedImage> {
    let Some(path) = path else {
        return Resolution::Fallback {
            value: assets_decode::solid_frame(canvas, fallback_rgba),
            reason: "scene has no background image".to_string(),
        };
    };

    match std::fs::read(path) {
        Ok(bytes) => match assets_decode::decode_image(&bytes) {
            Ok(img) => Resolution::Ready(img),
            Err(e) => Resolution::Fallback {
                value: assets_decode::solid_frame(canvas, fallback_rgba),
                reason: format!("background '{}' failed to decode: {e}", path.display()),
            },
        },
        Err(e) => Resolution::Fallback {
            value: assets_decode::solid_frame(canvas, fallback_rgba),
            reason: format!("background '{}' unreadable: {e}", path.display()),
        },
    }
}

/// Resolve the art for one roster member from the first storyboard that
/// names them with an image reference.
pub fn resolve_character_art(scene: &Scene, name: &str) -> Resolution<PreparedImage> {
    let path = scene
        .sub_scenes
        .iter()
        .flat_map(|sub| sub.storyboards.iter())
        .find(|b| b.character.trim() == name && b.character_image.is_some())
        .and_then(|b| b.character_image.as_deref());

    let Some(path) = path else {
        return Resolution::Skip {
            reason: format!("no art referenced for character '{name}'"),
        };
    };

    match std::fs::read(path) {
        Ok(bytes) => match assets_decode::decode_image(&bytes) {
            Ok(img) => Resolution::Ready(img),
            Err(e) => Resolution::Skip {
                reason: format!("art '{}' failed to decode: {e}", path.display()),
            },
        },
        Err(e) => Resolution::Skip {
            reason: format!("art '{}' unreadable: {e}", path.display()),
        },
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/store.rs"]
mod tests;
