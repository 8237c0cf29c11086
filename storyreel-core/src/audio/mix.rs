use std::{path::Path, sync::Arc};

use crate::{
    audio::media::AudioPcm,
    foundation::core::Fps,
    foundation::error::{StoryreelError, StoryreelResult},
};

/// One clip placed on the mix timeline.
#[derive(Clone, Debug)]
pub struct AudioSegment {
    /// Timeline offset of the clip's first sample frame.
    pub start_sample: u64,
    /// Truncation bound in sample frames, when the clip must not play past
    /// a boundary (bgm stops at its scene's end).
    pub limit_samples: Option<u64>,
    pub volume: f32,
    pub pcm: Arc<AudioPcm>,
}

/// The full audio timeline for one render.
#[derive(Clone, Debug)]
pub struct AudioManifest {
    pub sample_rate: u32,
    pub channels: u16,
    /// Timeline length in sample frames.
    pub total_samples: u64,
    pub segments: Vec<AudioSegment>,
}

/// Mix all segments onto one interleaved timeline, clamped to [-1, 1].
///
/// Sources are already at the mix sample rate; mono sources are duplicated
/// onto both channels.
pub fn mix_manifest(manifest: &AudioManifest) -> Vec<f32> {
    let channels = usize::from(manifest.channels.max(1));
    let mut out = vec![0.0f32; manifest.total_samples as usize * channels];

    for seg in &manifest.segments {
        let src = &seg.pcm.interleaved_f32;
        let src_channels = usize::from(seg.pcm.channels.max(1));
        let src_frames = src.len() / src_channels;
        let mut playable = src_frames as u64;
        if let Some(limit) = seg.limit_samples {
            playable = playable.min(limit);
        }

        for rel in 0..playable {
            let dst_frame = seg.start_sample + rel;
            if dst_frame >= manifest.total_samples {
                break;
            }
            let src_idx = rel as usize * src_channels;
            let (l, r) = if src_channels == 1 {
                (src[src_idx], src[src_idx])
            } else {
                (src[src_idx], src[src_idx + 1])
            };

            let dst_idx = dst_frame as usize * channels;
            out[dst_idx] += l * seg.volume;
            if channels > 1 {
                out[dst_idx + 1] += r * seg.volume;
            }
        }
    }

    for s in &mut out {
        *s = s.clamp(-1.0, 1.0);
    }
    out
}

/// Write an interleaved f32 mix as raw little-endian samples, the format
/// the encoder hands to ffmpeg's `f32le` demuxer.
pub fn write_mix_to_f32le_file(samples_interleaved: &[f32], out_path: &Path) -> StoryreelResult<()> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            StoryreelError::encode(format!(
                "failed to create audio mix output directory '{}': {e}",
                parent.display()
            ))
        })?;
    }

    let mut bytes = Vec::<u8>::with_capacity(samples_interleaved.len() * 4);
    for &sample in samples_interleaved {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    std::fs::write(out_path, bytes).map_err(|e| {
        StoryreelError::encode(format!(
            "failed to write mixed audio file '{}': {e}",
            out_path.display()
        ))
    })
}

/// Convert a frame offset to a sample-frame offset (round-to-nearest).
pub fn frame_to_sample(frame_delta: u64, fps: Fps, sample_rate: u32) -> u64 {
    let num = u128::from(frame_delta) * u128::from(sample_rate) * u128::from(fps.den);
    let den = u128::from(fps.num);
    ((num + (den / 2)) / den) as u64
}

#[cfg(test)]
#[path = "../../tests/unit/audio/mix.rs"]
mod tests;
