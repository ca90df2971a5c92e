//! Geometry-warp stage: face slimming and eye enlargement.

use crate::foundation::core::{Frame, Landmarks, Point, Vec2};
use crate::foundation::error::LustreResult;
use crate::foundation::math::smoothstep;
use crate::params::ParamKind;
use crate::stage::{Stage, require_rgba};

// 68-point landmark layout: jawline 0..=16, left eye 36..=41, right eye 42..=47.
const JAW_FIRST: usize = 0;
const JAW_LAST: usize = 16;
const JAW_LEFT_MID: usize = 4;
const JAW_RIGHT_MID: usize = 12;
const NOSE_TIP: usize = 30;
const LEFT_EYE: std::ops::RangeInclusive<usize> = 36..=41;
const RIGHT_EYE: std::ops::RangeInclusive<usize> = 42..=47;
const MIN_POINTS: usize = 48;

/// Slimming warp radius as a fraction of the jaw-to-jaw face width.
const SLIM_RADIUS_FRAC: f64 = 0.35;
/// Eye warp radius as a multiple of the eye's corner-to-center extent.
const EYE_RADIUS_SCALE: f64 = 2.2;

/// Geometry-warp stage driven by the current frame's landmarks.
///
/// Two independent parameters: `FaceSlim` (normalized `[0, 0.05]`) and
/// `EyeZoom` (normalized `[0, 0.1]`). Without landmarks, or with a landmark
/// set too small to anchor the warps, frames pass through untouched.
#[derive(Clone, Debug, Default)]
pub struct ReshapeStage {
    slim: f32,
    eye: f32,
    landmarks: Landmarks,
}

impl ReshapeStage {
    /// Create the stage with both warps off.
    pub fn new() -> Self {
        Self::default()
    }

    fn warps(&self) -> Vec<LocalWarp> {
        let lm = &self.landmarks;
        if lm.len_points() < MIN_POINTS {
            return Vec::new();
        }
        let (Some(jaw_first), Some(jaw_last), Some(nose)) = (
            lm.point(JAW_FIRST),
            lm.point(JAW_LAST),
            lm.point(NOSE_TIP),
        ) else {
            return Vec::new();
        };

        let face_width = (jaw_last - jaw_first).hypot();
        if face_width <= 0.0 {
            return Vec::new();
        }

        let mut warps = Vec::new();

        if self.slim > 0.0 {
            for idx in [JAW_LEFT_MID, JAW_RIGHT_MID] {
                let Some(anchor) = lm.point(idx) else {
                    continue;
                };
                let inward = nose - anchor;
                let len = inward.hypot();
                if len <= 0.0 {
                    continue;
                }
                warps.push(LocalWarp::Shift {
                    center: anchor,
                    dir: inward / len,
                    radius: face_width * SLIM_RADIUS_FRAC,
                    amount: f64::from(self.slim) * face_width,
                });
            }
        }

        if self.eye > 0.0 {
            for range in [LEFT_EYE, RIGHT_EYE] {
                let Some((center, extent)) = eye_anchor(lm, range) else {
                    continue;
                };
                warps.push(LocalWarp::Zoom {
                    center,
                    radius: extent * EYE_RADIUS_SCALE,
                    amount: f64::from(self.eye),
                });
            }
        }

        warps
    }
}

impl Stage for ReshapeStage {
    fn name(&self) -> &'static str {
        "reshape"
    }

    fn transform(&self, frame: &Frame) -> LustreResult<Frame> {
        require_rgba(self.name(), frame)?;

        let warps = self.warps();
        if warps.is_empty() {
            return Ok(frame.clone());
        }

        let mut out = frame.clone();
        let w = frame.width as i64;
        let h = frame.height as i64;
        for y in 0..h {
            for x in 0..w {
                let p = Point::new(x as f64, y as f64);
                let mut src = p;
                for warp in &warps {
                    src += warp.displacement(p);
                }
                if src != p {
                    let px = sample_bilinear(frame, src);
                    let idx = ((y * w + x) as usize) * 4;
                    out.data[idx..idx + 4].copy_from_slice(&px);
                }
            }
        }
        Ok(out)
    }

    fn wants_landmarks(&self) -> bool {
        true
    }

    fn set_landmarks(&mut self, landmarks: &Landmarks) {
        self.landmarks = landmarks.clone();
    }

    fn set_parameter(&mut self, param: ParamKind, value: f32) {
        match param {
            ParamKind::FaceSlim => self.slim = value.max(0.0),
            ParamKind::EyeZoom => self.eye = value.max(0.0),
            _ => {}
        }
    }
}

/// A radially bounded displacement field applied by inverse mapping.
#[derive(Clone, Copy, Debug)]
enum LocalWarp {
    /// Push pixels around `center` along `dir`, strongest at the center.
    Shift {
        center: Point,
        dir: Vec2,
        radius: f64,
        amount: f64,
    },
    /// Magnify around `center`; pixels inside `radius` sample closer to it.
    Zoom {
        center: Point,
        radius: f64,
        amount: f64,
    },
}

impl LocalWarp {
    /// Source-space offset to add to an output pixel position.
    fn displacement(&self, p: Point) -> Vec2 {
        match *self {
            LocalWarp::Shift {
                center,
                dir,
                radius,
                amount,
            } => {
                let d = (p - center).hypot();
                if d >= radius {
                    return Vec2::ZERO;
                }
                let falloff = 1.0 - smoothstep(0.0, 1.0, (d / radius) as f32);
                // Jaw pixels appear shifted along `dir` when sampled opposite it.
                dir * (-amount * f64::from(falloff))
            }
            LocalWarp::Zoom {
                center,
                radius,
                amount,
            } => {
                let rel = p - center;
                let d = rel.hypot();
                if d >= radius || d == 0.0 {
                    return Vec2::ZERO;
                }
                let falloff = 1.0 - smoothstep(0.0, 1.0, (d / radius) as f32);
                rel * (-amount * f64::from(falloff))
            }
        }
    }
}

fn eye_anchor(lm: &Landmarks, range: std::ops::RangeInclusive<usize>) -> Option<(Point, f64)> {
    let mut sum = Vec2::ZERO;
    let mut count = 0usize;
    for i in range.clone() {
        let p = lm.point(i)?;
        sum += p.to_vec2();
        count += 1;
    }
    if count == 0 {
        return None;
    }
    let center = (sum / count as f64).to_point();
    let extent = range
        .filter_map(|i| lm.point(i))
        .map(|p| (p - center).hypot())
        .fold(0.0f64, f64::max);
    if extent <= 0.0 {
        return None;
    }
    Some((center, extent))
}

/// Clamp-to-edge bilinear sample of an RGBA frame.
fn sample_bilinear(frame: &Frame, p: Point) -> [u8; 4] {
    let max_x = (frame.width - 1) as f64;
    let max_y = (frame.height - 1) as f64;
    let x = p.x.clamp(0.0, max_x);
    let y = p.y.clamp(0.0, max_y);

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(max_x as usize);
    let y1 = (y0 + 1).min(max_y as usize);
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let w = frame.width as usize;
    let at = |px: usize, py: usize| -> [u8; 4] {
        let idx = (py * w + px) * 4;
        [
            frame.data[idx],
            frame.data[idx + 1],
            frame.data[idx + 2],
            frame.data[idx + 3],
        ]
    };

    let (p00, p10, p01, p11) = (at(x0, y0), at(x1, y0), at(x0, y1), at(x1, y1));
    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = f64::from(p00[c]) * (1.0 - fx) + f64::from(p10[c]) * fx;
        let bot = f64::from(p01[c]) * (1.0 - fx) + f64::from(p11[c]) * fx;
        out[c] = (top * (1.0 - fy) + bot * fy).round().clamp(0.0, 255.0) as u8;
    }
    out
}
