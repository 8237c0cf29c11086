//! Storyreel turns a structured scene script plus synthesized speech clips
//! into one narrated, animated MP4.
//!
//! # Pipeline overview
//!
//! 1. **Validate**: raw script JSON -> [`Script`] (structural rules only)
//! 2. **Layout**: per-scene roster -> stage positions and camera targets
//! 3. **Compose**: one [`RenderUnit`] per storyboard line — shared scene
//!    background, character layers, the speaker's expression overlay,
//!    camera motion, subtitle, and the line's audio
//! 4. **Assemble**: hard-cut concatenation, audio mix, and streaming MP4
//!    encode through the system `ffmpeg` binary
//!
//! The key design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Graceful degradation**: a missing background, character art,
//!   overlay, font or audio clip downgrades one layer of one unit (typed
//!   through [`Resolution`]); it never aborts the render.
//! - **Deterministic-by-default**: the only random choice (expression
//!   overlay fallback) is driven by a caller-provided seed.
//! - **No IO in the frame loop**: decoding is front-loaded per scene and
//!   per unit; rasterizing a frame touches memory only.
#![forbid(unsafe_code)]

mod assets;
mod audio;
mod compose;
mod encode;
mod foundation;
mod layout;
mod motion;
mod script;
mod text;

/// Request orchestration: unit planning, audio mix, streaming encode.
pub mod pipeline;

pub use assets::decode::{
    OverlayFrame, PreparedImage, PreparedOverlay, decode_image, decode_overlay, solid_frame,
};
pub use assets::store::{
    DEFAULT_EXPRESSION_TAGS, OverlayLibrary, Resolution, SceneAssets, prepare_scene,
    resolve_background, resolve_character_art,
};
pub use audio::media::{AudioPcm, MIX_SAMPLE_RATE, decode_audio_f32_stereo};
pub use audio::mix::{
    AudioManifest, AudioSegment, frame_to_sample, mix_manifest, write_mix_to_f32le_file,
};
pub use compose::compositor::{Compositor, StagedUnit};
pub use compose::unit::{
    CHAR_WIDTH_FRAC, CHAR_WIDTH_FRAC_CROWDED, CharacterLayer, FACE_OFFSET_FRAC,
    FALLBACK_UNIT_DURATION_SEC, MIN_UNIT_DURATION_SEC, OVERLAY_WIDTH_FRAC, RenderUnit,
    UnitFactory, unit_duration_sec,
};
pub use encode::ffmpeg::{
    AudioInputConfig, EncodeConfig, FfmpegEncoder, default_mp4_config, ensure_parent_dir,
    is_ffmpeg_on_path,
};
pub use foundation::core::{Affine, Canvas, Fps, FrameRGBA, Point, Vec2};
pub use foundation::error::{StoryreelError, StoryreelResult};
pub use layout::stage::{
    CameraTarget, SceneLayout, StagePosition, annotate, assign_positions, bucket_frac,
};
pub use motion::camera::{CameraMove, CameraPath, MAX_ZOOM, PAN_DISTANCE_PX};
pub use pipeline::{
    CancelToken, RenderOpts, RenderSummary, RenderThreading, plan_units, render_script,
};
pub use script::model::{
    DEFAULT_SCENE_DESC, NARRATOR_SENTINELS, Scene, Script, Storyboard, StoryboardRef, SubScene,
    is_narrator,
};
pub use text::subtitle::{
    PreparedSubtitle, SubtitleEngine, SubtitleStyle, TextBrushRgba8, subtitle_text,
};
