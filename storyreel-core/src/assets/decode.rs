use std::{io::Cursor, sync::Arc};

use anyhow::Context;
use image::AnimationDecoder;

use crate::foundation::{core::Canvas, error::StoryreelResult};

/// Prepared raster image in premultiplied RGBA8 form.
#[derive(Clone, Debug)]
pub struct PreparedImage {
    pub width: u32,
    pub height: u32,
    /// Pixel bytes in row-major premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
}

/// One frame of an animated expression overlay.
#[derive(Clone, Debug)]
pub struct OverlayFrame {
    pub image: PreparedImage,
    pub delay_ms: u32,
}

/// Prepared expression overlay: one or more frames with display delays.
///
/// A single-frame overlay is the static variant; multi-frame overlays loop
/// to cover however long the unit plays.
#[derive(Clone, Debug)]
pub struct PreparedOverlay {
    pub frames: Vec<OverlayFrame>,
    pub total_ms: u64,
}

impl PreparedOverlay {
    /// The frame visible at `t_ms` into the unit, looping the animation as
    /// needed when the source is shorter than the unit.
    pub fn frame_at_ms(&self, t_ms: u64) -> &OverlayFrame {
        debug_assert!(!self.frames.is_empty());
        if self.frames.len() == 1 || self.total_ms == 0 {
            return &self.frames[0];
        }
        let mut t = t_ms % self.total_ms;
        for frame in &self.frames {
            let d = u64::from(frame.delay_ms);
            if t < d {
                return frame;
            }
            t -= d;
        }
        &self.frames[self.frames.len() - 1]
    }

    /// Natural pixel size of the overlay (first frame).
    pub fn size(&self) -> (u32, u32) {
        let f = &self.frames[0].image;
        (f.width, f.height)
    }
}

/// Decode encoded image bytes and convert to premultiplied RGBA8.
pub fn decode_image(bytes: &[u8]) -> StoryreelResult<PreparedImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

/// Decode overlay bytes into an animated frame sequence.
///
/// GIF animations keep their per-frame delays; any other decodable image
/// becomes a single static frame.
pub fn decode_overlay(bytes: &[u8]) -> StoryreelResult<PreparedOverlay> {
    if let Ok(decoder) = image::codecs::gif::GifDecoder::new(Cursor::new(bytes)) {
        let frames = decoder
            .into_frames()
            .collect_frames()
            .context("decode gif frames")?;
        if !frames.is_empty() {
            let mut out = Vec::with_capacity(frames.len());
            let mut total_ms = 0u64;
            for frame in frames {
                let (numer, denom) = frame.delay().numer_denom_ms();
                let delay_ms = if denom == 0 { numer } else { numer / denom };
                // A zero delay is the GIF convention for "unspecified".
                let delay_ms = if delay_ms == 0 { 100 } else { delay_ms };

                let rgba = frame.into_buffer();
                let (width, height) = rgba.dimensions();
                let mut rgba8_premul = rgba.into_raw();
                premultiply_rgba8_in_place(&mut rgba8_premul);

                total_ms += u64::from(delay_ms);
                out.push(OverlayFrame {
                    image: PreparedImage {
                        width,
                        height,
                        rgba8_premul: Arc::new(rgba8_premul),
                    },
                    delay_ms,
                });
            }
            return Ok(PreparedOverlay {
                frames: out,
                total_ms,
            });
        }
    }

    let still = decode_image(bytes)?;
    Ok(PreparedOverlay {
        frames: vec![OverlayFrame {
            image: still,
            delay_ms: 0,
        }],
        total_ms: 0,
    })
}

/// Canvas-sized solid-color frame, used when a background fails to resolve.
pub fn solid_frame(canvas: Canvas, rgba: [u8; 4]) -> PreparedImage {
    let premul = premul_px(rgba);
    let mut data = Vec::with_capacity(canvas.width as usize * canvas.height as usize * 4);
    for _ in 0..(canvas.width as usize * canvas.height as usize) {
        data.extend_from_slice(&premul);
    }
    PreparedImage {
        width: canvas.width,
        height: canvas.height,
        rgba8_premul: Arc::new(data),
    }
}

fn premul_px(rgba: [u8; 4]) -> [u8; 4] {
    let a = rgba[3] as u16;
    let p = |c: u8| ((c as u16 * a + 127) / 255) as u8;
    [p(rgba[0]), p(rgba[1]), p(rgba[2]), rgba[3]]
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}
