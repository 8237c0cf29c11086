use std::sync::Arc;

use crate::{
    assets::decode::PreparedImage,
    compose::unit::{
        CHAR_WIDTH_FRAC, CHAR_WIDTH_FRAC_CROWDED, FACE_OFFSET_FRAC, OVERLAY_WIDTH_FRAC,
        RenderUnit,
    },
    foundation::core::{Affine, Canvas, Fps, FrameRGBA, Point, Vec2},
    foundation::error::{StoryreelError, StoryreelResult},
    text::subtitle::PreparedSubtitle,
};

/// CPU compositor for render units.
///
/// Stateless over the request: `stage` converts a unit's decoded assets
/// into paints and placements once, `render_frame` rasterizes any frame of
/// the staged unit independently (safe to call from parallel workers).
#[derive(Clone, Debug)]
pub struct Compositor {
    canvas: Canvas,
    fps: Fps,
    clear_rgba: [u8; 4],
}

/// A unit with paints and placements resolved, ready for per-frame drawing.
pub struct StagedUnit {
    pub frames: u64,
    camera: crate::motion::camera::CameraPath,
    background: StagedImage,
    characters: Vec<StagedImage>,
    overlay: Option<StagedOverlay>,
    subtitle: Option<StagedSubtitle>,
}

struct StagedImage {
    paint: vello_cpu::Image,
    /// Placement of the image's natural box into canvas space.
    transform: Affine,
    width_px: f64,
    height_px: f64,
}

struct StagedOverlay {
    frames: Vec<(vello_cpu::Image, u32)>,
    total_ms: u64,
    transform: Affine,
    width_px: f64,
    height_px: f64,
}

struct StagedSubtitle {
    subtitle: PreparedSubtitle,
    origin: Point,
    fill: [u8; 4],
    outline: [u8; 4],
    outline_px: f64,
}

impl Compositor {
    pub fn new(canvas: Canvas, fps: Fps, clear_rgba: [u8; 4]) -> StoryreelResult<Self> {
        if canvas.width == 0 || canvas.height == 0 {
            return Err(StoryreelError::validation("canvas dimensions must be non-zero"));
        }
        if canvas.width > u32::from(u16::MAX) || canvas.height > u32::from(u16::MAX) {
            return Err(StoryreelError::validation("canvas dimensions exceed u16"));
        }
        Ok(Self {
            canvas,
            fps,
            clear_rgba,
        })
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Resolve a unit's layers into paints and canvas placements.
    pub fn stage(&self, unit: &RenderUnit, style: &crate::text::subtitle::SubtitleStyle) -> StoryreelResult<StagedUnit> {
        let w = f64::from(self.canvas.width);
        let h = f64::from(self.canvas.height);

        // Background covers the canvas, centered.
        let bg = &unit.background;
        let cover = (w / f64::from(bg.width)).max(h / f64::from(bg.height));
        let bg_transform = Affine::translate(Vec2::new(
            (w - f64::from(bg.width) * cover) * 0.5,
            (h - f64::from(bg.height) * cover) * 0.5,
        )) * Affine::scale(cover);
        let background = StagedImage {
            paint: image_paint(bg)?,
            transform: bg_transform,
            width_px: f64::from(bg.width),
            height_px: f64::from(bg.height),
        };

        let width_frac = if unit.roster_size > 2 {
            CHAR_WIDTH_FRAC_CROWDED
        } else {
            CHAR_WIDTH_FRAC
        };
        let display_w = w * width_frac;

        let mut characters = Vec::with_capacity(unit.characters.len());
        let mut speaker_box: Option<(f64, f64, f64, f64)> = None; // x, y, w, h
        for layer in &unit.characters {
            let art = &layer.art;
            let scale = display_w / f64::from(art.width).max(1.0);
            let display_h = f64::from(art.height) * scale;
            let x = layer.position.anchor_x_frac() * w - display_w * 0.5;
            let y = h - display_h; // bottom pinned
            if layer.is_speaker {
                speaker_box = Some((x, y, display_w, display_h));
            }
            characters.push(StagedImage {
                paint: image_paint(art)?,
                transform: Affine::translate(Vec2::new(x, y)) * Affine::scale(scale),
                width_px: f64::from(art.width),
                height_px: f64::from(art.height),
            });
        }

        let overlay = match (&unit.overlay, speaker_box) {
            (Some(overlay), Some((cx, cy, cw, ch))) => {
                let (ow, oh) = overlay.size();
                let target_w = cw * OVERLAY_WIDTH_FRAC;
                let scale = target_w / f64::from(ow).max(1.0);
                let target_h = f64::from(oh) * scale;
                let face = Point::new(
                    cx + cw * FACE_OFFSET_FRAC.0,
                    cy + ch * FACE_OFFSET_FRAC.1,
                );
                let transform = Affine::translate(Vec2::new(
                    face.x - target_w * 0.5,
                    face.y - target_h * 0.5,
                )) * Affine::scale(scale);

                let mut frames = Vec::with_capacity(overlay.frames.len());
                for frame in &overlay.frames {
                    frames.push((image_paint(&frame.image)?, frame.delay_ms));
                }
                Some(StagedOverlay {
                    frames,
                    total_ms: overlay.total_ms,
                    transform,
                    width_px: f64::from(ow),
                    height_px: f64::from(oh),
                })
            }
            _ => None,
        };

        let subtitle = unit.subtitle.as_ref().map(|sub| StagedSubtitle {
            subtitle: sub.clone(),
            origin: Point::new(
                (w - sub.width) * 0.5,
                h - style.margin_bottom_px - sub.height,
            ),
            fill: style.fill_rgba,
            outline: style.outline_rgba,
            outline_px: style.outline_px,
        });

        Ok(StagedUnit {
            frames: unit.frames,
            camera: unit.camera,
            background,
            characters,
            overlay,
            subtitle,
        })
    }

    /// Rasterize one frame of a staged unit: camera-transformed scene
    /// composite (background, characters, overlay) with the subtitle drawn
    /// on top, outside the camera space. Returns premultiplied RGBA8.
    pub fn render_frame(&self, staged: &StagedUnit, frame: u64) -> StoryreelResult<FrameRGBA> {
        let width: u16 = self
            .canvas
            .width
            .try_into()
            .map_err(|_| StoryreelError::validation("canvas width exceeds u16"))?;
        let height: u16 = self
            .canvas
            .height
            .try_into()
            .map_err(|_| StoryreelError::validation("canvas height exceeds u16"))?;

        let t_sec = self.fps.frames_to_secs(frame);
        let cam = staged.camera.affine_at(t_sec, self.canvas);

        let mut ctx = vello_cpu::RenderContext::new(width, height);
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);

        // Opaque base so pan/zoom never exposes uninitialized pixels.
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
            self.clear_rgba[0],
            self.clear_rgba[1],
            self.clear_rgba[2],
            self.clear_rgba[3],
        ));
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(self.canvas.width),
            f64::from(self.canvas.height),
        ));

        draw_staged_image(&mut ctx, &staged.background, cam);
        for layer in &staged.characters {
            draw_staged_image(&mut ctx, layer, cam);
        }

        if let Some(overlay) = &staged.overlay {
            let t_ms = (t_sec * 1000.0).max(0.0) as u64;
            let (paint, _) = pick_overlay_frame(overlay, t_ms);
            ctx.set_transform(affine_to_cpu(cam * overlay.transform));
            ctx.set_paint(paint.clone());
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                0.0,
                0.0,
                overlay.width_px,
                overlay.height_px,
            ));
        }

        if let Some(sub) = &staged.subtitle {
            draw_subtitle(&mut ctx, sub);
        }

        ctx.flush();
        let mut pixmap = vello_cpu::Pixmap::new(width, height);
        ctx.render_to_pixmap(&mut pixmap);

        Ok(FrameRGBA {
            width: self.canvas.width,
            height: self.canvas.height,
            data: pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        })
    }
}

fn draw_staged_image(ctx: &mut vello_cpu::RenderContext, img: &StagedImage, camera: Affine) {
    ctx.set_transform(affine_to_cpu(camera * img.transform));
    ctx.set_paint(img.paint.clone());
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
        0.0,
        0.0,
        img.width_px,
        img.height_px,
    ));
}

fn pick_overlay_frame(overlay: &StagedOverlay, t_ms: u64) -> &(vello_cpu::Image, u32) {
    if overlay.frames.len() == 1 || overlay.total_ms == 0 {
        return &overlay.frames[0];
    }
    let mut t = t_ms % overlay.total_ms;
    for frame in &overlay.frames {
        let d = u64::from(frame.1);
        if t < d {
            return frame;
        }
        t -= d;
    }
    &overlay.frames[overlay.frames.len() - 1]
}

/// Outline pass offsets: eight compass directions around the fill.
const OUTLINE_DIRS: [(f64, f64); 8] = [
    (-1.0, -1.0),
    (0.0, -1.0),
    (1.0, -1.0),
    (-1.0, 0.0),
    (1.0, 0.0),
    (-1.0, 1.0),
    (0.0, 1.0),
    (1.0, 1.0),
];

fn draw_subtitle(ctx: &mut vello_cpu::RenderContext, sub: &StagedSubtitle) {
    for (dx, dy) in OUTLINE_DIRS {
        let origin = Point::new(
            sub.origin.x + dx * sub.outline_px,
            sub.origin.y + dy * sub.outline_px,
        );
        draw_glyphs(ctx, sub, origin, sub.outline);
    }
    draw_glyphs(ctx, sub, sub.origin, sub.fill);
}

fn draw_glyphs(
    ctx: &mut vello_cpu::RenderContext,
    sub: &StagedSubtitle,
    origin: Point,
    color: [u8; 4],
) {
    ctx.set_transform(affine_to_cpu(Affine::translate(origin.to_vec2())));
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
        color[0], color[1], color[2], color[3],
    ));

    for line in sub.subtitle.layout.lines() {
        for item in line.items() {
            let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                continue;
            };

            let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                id: g.id,
                x: g.x,
                y: g.y,
            });
            ctx.glyph_run(&sub.subtitle.font)
                .font_size(run.run().font_size())
                .fill_glyphs(glyphs);
        }
    }
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn image_paint(img: &PreparedImage) -> StoryreelResult<vello_cpu::Image> {
    let pixmap = image_premul_bytes_to_pixmap(img.rgba8_premul.as_slice(), img.width, img.height)?;
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

fn image_premul_bytes_to_pixmap(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> StoryreelResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| StoryreelError::validation("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| StoryreelError::validation("image height exceeds u16"))?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(StoryreelError::validation(
            "prepared image byte length mismatch",
        ));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for px in rgba8_premul.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/compose/compositor.rs"]
mod tests;
