use crate::{
    foundation::core::{Affine, Canvas, Point, Vec2},
    layout::stage::StagePosition,
};

/// Target zoom factor reached at the end of a zoom-and-pan move.
pub const MAX_ZOOM: f64 = 1.2;

/// Total pan travel in pixels over a unit's duration.
pub const PAN_DISTANCE_PX: f64 = 50.0;

/// Camera motion archetype parsed from the authored movement tag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CameraMove {
    /// No motion; the identity transform for the whole unit.
    Static,
    /// Linear zoom ramp toward [`MAX_ZOOM`] anchored at the camera target,
    /// combined with a linear pan whose direction follows the target bucket.
    #[default]
    ZoomPan,
}

impl CameraMove {
    /// Interpret a free-form movement tag.
    ///
    /// "static" (and its locale equivalent "静止") is the only tag with
    /// dedicated behavior; every other tag, recognized or not, shares the
    /// default zoom-and-pan move.
    pub fn parse(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "" | "static" | "静止" => Self::Static,
            _ => Self::ZoomPan,
        }
    }
}

/// A camera move resolved for one render unit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraPath {
    movement: CameraMove,
    target: StagePosition,
    duration_sec: f64,
}

impl CameraPath {
    pub fn new(movement: CameraMove, target: StagePosition, duration_sec: f64) -> Self {
        Self {
            movement,
            target,
            duration_sec,
        }
    }

    /// A path that never moves, used for narration and unrostered speakers.
    pub fn fixed(target: StagePosition) -> Self {
        Self::new(CameraMove::Static, target, 0.0)
    }

    pub fn movement(&self) -> CameraMove {
        self.movement
    }

    pub fn target(&self) -> StagePosition {
        self.target
    }

    /// Camera transform at elapsed time `t` seconds, `t ∈ [0, duration]`.
    ///
    /// Applied to the scene composite (background and character layers);
    /// subtitles are drawn outside it.
    pub fn affine_at(&self, t_sec: f64, canvas: Canvas) -> Affine {
        match self.movement {
            CameraMove::Static => Affine::IDENTITY,
            CameraMove::ZoomPan => {
                let progress = if self.duration_sec > 0.0 {
                    (t_sec / self.duration_sec).clamp(0.0, 1.0)
                } else {
                    0.0
                };

                let scale = 1.0 + (MAX_ZOOM - 1.0) * progress;
                let anchor = Point::new(
                    f64::from(canvas.width) * self.target.anchor_x_frac(),
                    f64::from(canvas.height) * 0.5,
                );
                let pan = match self.target {
                    StagePosition::Left => Vec2::new(PAN_DISTANCE_PX * progress, 0.0),
                    StagePosition::Right => Vec2::new(-PAN_DISTANCE_PX * progress, 0.0),
                    StagePosition::Center => Vec2::new(0.0, -PAN_DISTANCE_PX * progress),
                };

                // Canonical order: T(pan) * T(anchor) * S(scale) * T(-anchor)
                Affine::translate(pan)
                    * Affine::translate(anchor.to_vec2())
                    * Affine::scale(scale)
                    * Affine::translate(-anchor.to_vec2())
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/motion/camera.rs"]
mod tests;
