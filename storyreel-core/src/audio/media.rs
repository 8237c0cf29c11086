use std::path::Path;

use crate::foundation::error::{StoryreelError, StoryreelResult};

/// Sample rate of the mix timeline (and of every decoded clip).
pub const MIX_SAMPLE_RATE: u32 = 48_000;

/// Decoded audio clip stored as interleaved `f32` PCM.
#[derive(Clone, Debug)]
pub struct AudioPcm {
    pub sample_rate: u32,
    pub channels: u16,
    pub interleaved_f32: Vec<f32>,
}

impl AudioPcm {
    /// Clip duration derived from the decoded sample count.
    pub fn duration_sec(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        let frames = self.interleaved_f32.len() / usize::from(self.channels);
        (frames as f64) / f64::from(self.sample_rate)
    }

    pub fn is_empty(&self) -> bool {
        self.interleaved_f32.is_empty()
    }
}

/// Decode an audio file to interleaved stereo `f32` PCM at `sample_rate`
/// by piping through the system `ffmpeg` binary.
///
/// We intentionally use the system `ffmpeg` rather than linking FFmpeg to
/// avoid native dev header/lib requirements.
pub fn decode_audio_f32_stereo(path: &Path, sample_rate: u32) -> StoryreelResult<AudioPcm> {
    let out = std::process::Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(path)
        .args([
            "-vn",
            "-f",
            "f32le",
            "-acodec",
            "pcm_f32le",
            "-ac",
            "2",
            "-ar",
            &sample_rate.to_string(),
            "pipe:1",
        ])
        .output()
        .map_err(|e| {
            StoryreelError::validation(format!("failed to run ffmpeg for audio decode: {e}"))
        })?;

    if !out.status.success() {
        let msg = String::from_utf8_lossy(&out.stderr);
        // ffmpeg reports a file without an audio stream as an error; treat
        // it as empty PCM so the caller can apply its silent fallback.
        if msg.contains("Stream specifier")
            || msg.contains("matches no streams")
            || msg.contains("Output file #0 does not contain any stream")
        {
            return Ok(AudioPcm {
                sample_rate,
                channels: 2,
                interleaved_f32: Vec::new(),
            });
        }
        return Err(StoryreelError::validation(format!(
            "ffmpeg audio decode failed for '{}': {}",
            path.display(),
            msg.trim()
        )));
    }

    if !out.stdout.len().is_multiple_of(4) {
        return Err(StoryreelError::validation(
            "decoded audio byte length is not aligned to f32 samples",
        ));
    }
    let mut pcm = Vec::<f32>::with_capacity(out.stdout.len() / 4);
    for chunk in out.stdout.chunks_exact(4) {
        pcm.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }

    Ok(AudioPcm {
        sample_rate,
        channels: 2,
        interleaved_f32: pcm,
    })
}
