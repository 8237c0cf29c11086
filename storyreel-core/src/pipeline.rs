use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use rand::{Rng, SeedableRng, rngs::StdRng};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::{
    assets::store::{OverlayLibrary, prepare_scene},
    audio::media::{AudioPcm, MIX_SAMPLE_RATE, decode_audio_f32_stereo},
    audio::mix::{AudioManifest, AudioSegment, frame_to_sample, mix_manifest, write_mix_to_f32le_file},
    compose::compositor::Compositor,
    compose::unit::{RenderUnit, UnitFactory},
    encode::ffmpeg::{AudioInputConfig, EncodeConfig, FfmpegEncoder},
    foundation::core::{Canvas, Fps, FrameRGBA},
    foundation::error::{StoryreelError, StoryreelResult},
    layout::stage::{SceneLayout, annotate},
    script::model::{Script, StoryboardRef},
    text::subtitle::{SubtitleEngine, SubtitleStyle},
};

/// Threading configuration for per-unit frame rendering.
///
/// Units are always encoded strictly in document order; parallelism only
/// spreads the frames of one unit across a worker pool.
#[derive(Clone, Debug, Default)]
pub struct RenderThreading {
    pub parallel: bool,
    pub threads: Option<usize>,
}

/// Render request configuration.
#[derive(Clone, Debug)]
pub struct RenderOpts {
    pub canvas: Canvas,
    pub fps: Fps,
    /// Background fallback fill, also used when flattening alpha for the
    /// encoder (RGBA8, straight alpha).
    pub background_rgba: [u8; 4],
    pub overwrite: bool,
    /// Seed for every random choice the pipeline makes (expression overlay
    /// fallback), so renders are reproducible.
    pub seed: u64,
    /// Font files tried in order for subtitles.
    pub font_candidates: Vec<PathBuf>,
    /// Directories scanned for a subtitle font when no candidate loads.
    pub font_scan_dirs: Vec<PathBuf>,
    /// Expression overlay library directory.
    pub overlay_dir: Option<PathBuf>,
    /// Volume of per-scene background music under the dialogue.
    pub bgm_volume: f32,
    pub subtitle: SubtitleStyle,
    pub threading: RenderThreading,
}

impl Default for RenderOpts {
    fn default() -> Self {
        Self {
            canvas: Canvas {
                width: 1280,
                height: 720,
            },
            fps: Fps { num: 24, den: 1 },
            background_rgba: [24, 24, 28, 255],
            overwrite: true,
            seed: 0,
            font_candidates: vec![
                PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"),
                PathBuf::from("/usr/share/fonts/TTF/DejaVuSans.ttf"),
                PathBuf::from("/System/Library/Fonts/Helvetica.ttc"),
                PathBuf::from("C:\\Windows\\Fonts\\arial.ttf"),
            ],
            font_scan_dirs: vec![
                PathBuf::from("fonts"),
                PathBuf::from("/usr/share/fonts/truetype/dejavu"),
            ],
            overlay_dir: None,
            bgm_volume: 0.2,
            subtitle: SubtitleStyle::default(),
            threading: RenderThreading::default(),
        }
    }
}

/// Cooperative cancellation signal checked between units.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Result summary returned to the caller on success.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderSummary {
    pub video_path: PathBuf,
    /// Scenes that contributed at least one unit.
    pub scenes: usize,
    pub units: usize,
    pub frames: u64,
}

/// Build the render units for a script, pairing flattened storyboards with
/// decoded audio by position.
///
/// `audio` entries are `None` where a clip failed to decode; those units
/// are still produced, silent, at the fallback duration. When fewer audio
/// entries exist than storyboards, processing stops at the shortfall and
/// whatever was built is returned.
pub fn plan_units<R: Rng>(
    script: &Script,
    layouts: &[SceneLayout],
    audio: Vec<Option<AudioPcm>>,
    opts: &RenderOpts,
    subtitles: &mut SubtitleEngine,
    rng: &mut R,
    cancel: Option<&CancelToken>,
) -> StoryreelResult<Vec<RenderUnit>> {
    let overlays = OverlayLibrary::new(opts.overlay_dir.clone());
    let mut factory = UnitFactory {
        canvas: opts.canvas,
        fps: opts.fps,
        style: &opts.subtitle,
        overlays: &overlays,
        subtitles,
        rng,
    };

    let total_boards = script.storyboard_count();
    if audio.len() < total_boards {
        warn!(
            storyboards = total_boards,
            audio_clips = audio.len(),
            "fewer audio clips than storyboards; stopping at the shortfall"
        );
    }

    let mut units = Vec::new();
    let mut audio_iter = audio.into_iter();
    'scenes: for (scene_idx, scene) in script.scenes.iter().enumerate() {
        let layout = &layouts[scene_idx];
        let assets = prepare_scene(scene, layout, opts.canvas, opts.background_rgba);

        for sub_scene in &scene.sub_scenes {
            for storyboard in &sub_scene.storyboards {
                if let Some(c) = cancel
                    && c.is_cancelled()
                {
                    return Err(StoryreelError::Cancelled);
                }
                let Some(pcm) = audio_iter.next() else {
                    break 'scenes;
                };
                let board = StoryboardRef {
                    scene_idx,
                    scene,
                    sub_scene,
                    storyboard,
                };
                units.push(factory.build(board, layout, &assets, pcm));
            }
        }
    }

    Ok(units)
}

/// Render a validated script plus its ordered audio clips to one MP4.
///
/// This is the batch pipeline: validate → layout → build units (graceful
/// per-asset degradation) → mix audio → stream frames to ffmpeg. The
/// caller receives either a playable file or a single error; a partially
/// written output is always removed.
#[tracing::instrument(skip(script, audio_paths, opts, cancel))]
pub fn render_script(
    script: &Script,
    audio_paths: &[PathBuf],
    out_path: PathBuf,
    opts: &RenderOpts,
    cancel: Option<&CancelToken>,
) -> StoryreelResult<RenderSummary> {
    if opts.fps.den != 1 {
        return Err(StoryreelError::validation(
            "mp4 rendering requires integer fps (fps.den == 1)",
        ));
    }

    let layouts = annotate(script);
    let mut rng = StdRng::seed_from_u64(opts.seed);
    let mut subtitles = SubtitleEngine::new(&opts.font_candidates, &opts.font_scan_dirs);

    let audio: Vec<Option<AudioPcm>> = audio_paths
        .iter()
        .map(|path| match decode_audio_f32_stereo(path, MIX_SAMPLE_RATE) {
            Ok(pcm) => Some(pcm),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "audio clip unreadable; unit will be silent");
                None
            }
        })
        .collect();

    let units = plan_units(script, &layouts, audio, opts, &mut subtitles, &mut rng, cancel)?;
    if units.is_empty() {
        return Err(StoryreelError::EmptyTimeline);
    }

    let total_frames: u64 = units.iter().map(|u| u.frames).sum();
    let manifest = assemble_audio(script, &units, opts, total_frames);

    let mut audio_tmp = TempFileGuard(None);
    let audio_cfg = if manifest.segments.is_empty() {
        None
    } else {
        let mixed = mix_manifest(&manifest);
        let path = std::env::temp_dir().join(format!(
            "storyreel_audio_mix_{}_{}.f32le",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0)
        ));
        write_mix_to_f32le_file(&mixed, &path)?;
        audio_tmp.0 = Some(path.clone());
        Some(AudioInputConfig {
            path,
            sample_rate: manifest.sample_rate,
            channels: manifest.channels,
        })
    };

    let compositor = Compositor::new(opts.canvas, opts.fps, opts.background_rgba)?;
    let encoder = FfmpegEncoder::new(
        EncodeConfig {
            width: opts.canvas.width,
            height: opts.canvas.height,
            fps: opts.fps.num,
            out_path: out_path.clone(),
            overwrite: opts.overwrite,
            audio: audio_cfg,
        },
        opts.background_rgba,
    )?;

    let frames = match encode_units(&compositor, &units, opts, encoder, cancel) {
        Ok(frames) => frames,
        Err(e) => {
            let _ = std::fs::remove_file(&out_path);
            return Err(e);
        }
    };
    drop(audio_tmp);

    let mut scene_indices: Vec<usize> = units.iter().map(|u| u.scene_idx).collect();
    scene_indices.dedup();
    let summary = RenderSummary {
        video_path: out_path,
        scenes: scene_indices.len(),
        units: units.len(),
        frames,
    };
    info!(
        scenes = summary.scenes,
        units = summary.units,
        frames = summary.frames,
        "render complete"
    );
    Ok(summary)
}

/// Place every unit's speech, and each scene's bgm, on the mix timeline.
fn assemble_audio(
    script: &Script,
    units: &[RenderUnit],
    opts: &RenderOpts,
    total_frames: u64,
) -> AudioManifest {
    let mut segments = Vec::new();
    // scene_idx -> (start_frame, end_frame) span covered by its units
    let mut scene_spans: Vec<(usize, u64, u64)> = Vec::new();

    let mut cursor_frames = 0u64;
    for unit in units {
        if let Some(pcm) = &unit.audio {
            segments.push(AudioSegment {
                start_sample: frame_to_sample(cursor_frames, opts.fps, MIX_SAMPLE_RATE),
                limit_samples: None,
                volume: 1.0,
                pcm: Arc::clone(pcm),
            });
        }
        match scene_spans.last_mut() {
            Some((idx, _, end)) if *idx == unit.scene_idx => *end = cursor_frames + unit.frames,
            _ => scene_spans.push((
                unit.scene_idx,
                cursor_frames,
                cursor_frames + unit.frames,
            )),
        }
        cursor_frames += unit.frames;
    }

    if opts.bgm_volume > 0.0 {
        for (scene_idx, start_frame, end_frame) in scene_spans {
            let Some(bgm_path) = script.scenes.get(scene_idx).and_then(|s| s.bgm.as_ref()) else {
                continue;
            };
            match decode_audio_f32_stereo(bgm_path, MIX_SAMPLE_RATE) {
                Ok(pcm) if !pcm.is_empty() => {
                    let start_sample = frame_to_sample(start_frame, opts.fps, MIX_SAMPLE_RATE);
                    let end_sample = frame_to_sample(end_frame, opts.fps, MIX_SAMPLE_RATE);
                    segments.push(AudioSegment {
                        start_sample,
                        limit_samples: Some(end_sample.saturating_sub(start_sample)),
                        volume: opts.bgm_volume,
                        pcm: Arc::new(pcm),
                    });
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(path = %bgm_path.display(), error = %e, "bgm unreadable; scene plays without music");
                }
            }
        }
    }

    AudioManifest {
        sample_rate: MIX_SAMPLE_RATE,
        channels: 2,
        total_samples: frame_to_sample(total_frames, opts.fps, MIX_SAMPLE_RATE),
        segments,
    }
}

fn encode_units(
    compositor: &Compositor,
    units: &[RenderUnit],
    opts: &RenderOpts,
    encoder: FfmpegEncoder,
    cancel: Option<&CancelToken>,
) -> StoryreelResult<u64> {
    let pool = if opts.threading.parallel {
        Some(build_thread_pool(opts.threading.threads)?)
    } else {
        None
    };

    let mut encoder = encoder;
    match encode_units_inner(compositor, units, opts, &mut encoder, cancel, pool.as_ref()) {
        Ok(frames) => {
            encoder.finish()?;
            Ok(frames)
        }
        Err(e) => {
            encoder.abort();
            Err(e)
        }
    }
}

fn encode_units_inner(
    compositor: &Compositor,
    units: &[RenderUnit],
    opts: &RenderOpts,
    encoder: &mut FfmpegEncoder,
    cancel: Option<&CancelToken>,
    pool: Option<&rayon::ThreadPool>,
) -> StoryreelResult<u64> {
    let mut frames_total = 0u64;
    for unit in units {
        if let Some(c) = cancel
            && c.is_cancelled()
        {
            return Err(StoryreelError::Cancelled);
        }

        let staged = compositor.stage(unit, &opts.subtitle)?;
        let frames: Vec<FrameRGBA> = match pool {
            Some(pool) => pool.install(|| {
                (0..staged.frames)
                    .into_par_iter()
                    .map(|f| compositor.render_frame(&staged, f))
                    .collect::<StoryreelResult<Vec<_>>>()
            })?,
            None => {
                let mut out = Vec::with_capacity(staged.frames as usize);
                for f in 0..staged.frames {
                    out.push(compositor.render_frame(&staged, f)?);
                }
                out
            }
        };

        for frame in &frames {
            encoder.encode_frame(frame)?;
        }
        frames_total += staged.frames;
    }
    Ok(frames_total)
}

fn build_thread_pool(threads: Option<usize>) -> StoryreelResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(StoryreelError::validation(
            "render threading 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| StoryreelError::validation(format!("failed to build rayon thread pool: {e}")))
}

struct TempFileGuard(Option<PathBuf>);

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/pipeline.rs"]
mod tests;
