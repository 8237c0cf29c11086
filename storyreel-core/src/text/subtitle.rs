use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::warn;

use crate::{assets::store::Resolution, script::model::is_narrator};

/// RGBA8 brush color carried through Parley text layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextBrushRgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Subtitle rendering parameters.
#[derive(Clone, Debug)]
pub struct SubtitleStyle {
    pub size_px: f32,
    pub fill_rgba: [u8; 4],
    pub outline_rgba: [u8; 4],
    /// Outline thickness in pixels (painted as offset passes).
    pub outline_px: f64,
    /// Distance from the bottom edge of the frame to the subtitle block.
    pub margin_bottom_px: f64,
    /// Wrap width as a fraction of the canvas width.
    pub max_width_frac: f64,
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        Self {
            size_px: 32.0,
            fill_rgba: [255, 255, 255, 255],
            outline_rgba: [0, 0, 0, 255],
            outline_px: 2.0,
            margin_bottom_px: 48.0,
            max_width_frac: 0.9,
        }
    }
}

/// Shaped subtitle ready for glyph drawing.
#[derive(Clone)]
pub struct PreparedSubtitle {
    pub layout: Arc<parley::Layout<TextBrushRgba8>>,
    pub font: vello_cpu::peniko::FontData,
    pub width: f64,
    pub height: f64,
}

impl std::fmt::Debug for PreparedSubtitle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedSubtitle")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// The on-screen subtitle for a storyboard: the line prefixed with the
/// speaker's name, except for narration.
pub fn subtitle_text(speaker: &str, line: &str) -> String {
    if is_narrator(speaker) {
        line.to_string()
    } else {
        format!("{}: {}", speaker.trim(), line)
    }
}

/// Stateful subtitle shaper holding one resolved font.
///
/// The font is picked once at construction from a prioritized candidate
/// list, then from a scan of the given directories; if nothing loads,
/// every [`SubtitleEngine::shape`] call is a `Skip` and units render
/// without subtitles.
pub struct SubtitleEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    family_name: Option<String>,
    font: Option<vello_cpu::peniko::FontData>,
}

impl SubtitleEngine {
    pub fn new(candidates: &[PathBuf], scan_dirs: &[PathBuf]) -> Self {
        let mut engine = Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            family_name: None,
            font: None,
        };

        for path in candidates {
            if engine.try_register(path) {
                return engine;
            }
        }
        for dir in scan_dirs {
            for path in font_files_in_dir(dir) {
                if engine.try_register(&path) {
                    return engine;
                }
            }
        }

        warn!("no usable subtitle font found; units will render without subtitles");
        engine
    }

    fn try_register(&mut self, path: &Path) -> bool {
        let Ok(bytes) = std::fs::read(path) else {
            return false;
        };

        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(bytes.clone()), None);
        let Some(family_id) = families.first().map(|(id, _)| *id) else {
            return false;
        };
        let Some(name) = self.font_ctx.collection.family_name(family_id) else {
            return false;
        };

        self.family_name = Some(name.to_string());
        self.font = Some(vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(bytes),
            0,
        ));
        true
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Shape one subtitle line within `max_width_px`.
    pub fn shape(
        &mut self,
        text: &str,
        style: &SubtitleStyle,
        max_width_px: f32,
    ) -> Resolution<PreparedSubtitle> {
        let (Some(family), Some(font)) = (self.family_name.clone(), self.font.clone()) else {
            return Resolution::Skip {
                reason: "no subtitle font available".to_string(),
            };
        };
        if text.trim().is_empty() {
            return Resolution::Skip {
                reason: "subtitle text is empty".to_string(),
            };
        }

        let brush = TextBrushRgba8 {
            r: style.fill_rgba[0],
            g: style.fill_rgba[1],
            b: style.fill_rgba[2],
            a: style.fill_rgba[3],
        };

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(style.size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(Some(max_width_px));

        let mut width = 0.0f64;
        let mut height = 0.0f64;
        for line in layout.lines() {
            let m = line.metrics();
            width = width.max(f64::from(m.advance));
            height += f64::from(m.ascent + m.descent + m.leading);
        }

        Resolution::Ready(PreparedSubtitle {
            layout: Arc::new(layout),
            font,
            width: width.max(1.0),
            height: height.max(1.0),
        })
    }
}

fn font_files_in_dir(dir: &Path) -> Vec<PathBuf> {
    let Ok(rd) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut files: Vec<PathBuf> = rd
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|s| s.to_str())
                    .map(|ext| {
                        let ext = ext.to_ascii_lowercase();
                        ext == "ttf" || ext == "otf" || ext == "ttc"
                    })
                    .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}

#[cfg(test)]
#[path = "../../tests/unit/text/subtitle.rs"]
mod tests;
