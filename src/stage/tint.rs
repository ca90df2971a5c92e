//! Color-overlay stages: lip tint and cheek tint.

use crate::foundation::core::{Frame, Landmarks, Point};
use crate::foundation::error::LustreResult;
use crate::foundation::math::{lerp_u8, smoothstep};
use crate::params::ParamKind;
use crate::stage::{Stage, require_rgba};

// 68-point landmark layout: outer mouth 48..=59, eyes 36..=47, jawline 0..=16.
const MOUTH_OUTER: std::ops::RangeInclusive<usize> = 48..=59;
const LEFT_EYE: std::ops::RangeInclusive<usize> = 36..=41;
const RIGHT_EYE: std::ops::RangeInclusive<usize> = 42..=47;
const JAW_FIRST: usize = 0;
const JAW_LAST: usize = 16;
const JAW_LEFT_MID: usize = 4;
const JAW_RIGHT_MID: usize = 12;

/// Cheek patch radius as a fraction of the jaw-to-jaw face width.
const CHEEK_RADIUS_FRAC: f64 = 0.12;

/// Which facial region a [`TintStage`] paints.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TintRegion {
    Lips,
    Cheeks,
}

/// Landmark-anchored color overlay with an adjustable blend level.
///
/// Ships in two configurations: [`TintStage::lipstick`] fills the outer mouth
/// polygon, [`TintStage::blusher`] paints soft patches on both cheeks. Blend
/// level is normalized `[0, 1]`; without usable landmarks the frame passes
/// through untouched.
#[derive(Clone, Debug)]
pub struct TintStage {
    region: TintRegion,
    color: [u8; 3],
    level: f32,
    landmarks: Landmarks,
}

impl TintStage {
    /// Lip-tint configuration.
    pub fn lipstick() -> Self {
        Self {
            region: TintRegion::Lips,
            color: [180, 40, 70],
            level: 0.0,
            landmarks: Landmarks::empty(),
        }
    }

    /// Cheek-tint configuration.
    pub fn blusher() -> Self {
        Self {
            region: TintRegion::Cheeks,
            color: [225, 110, 120],
            level: 0.0,
            landmarks: Landmarks::empty(),
        }
    }

    fn owned_param(&self) -> ParamKind {
        match self.region {
            TintRegion::Lips => ParamKind::Lipstick,
            TintRegion::Cheeks => ParamKind::Blusher,
        }
    }
}

impl Stage for TintStage {
    fn name(&self) -> &'static str {
        match self.region {
            TintRegion::Lips => "lipstick",
            TintRegion::Cheeks => "blusher",
        }
    }

    fn transform(&self, frame: &Frame) -> LustreResult<Frame> {
        require_rgba(self.name(), frame)?;

        if self.level <= 0.0 || frame.pixel_count() == 0 {
            return Ok(frame.clone());
        }

        match self.region {
            TintRegion::Lips => self.paint_lips(frame),
            TintRegion::Cheeks => self.paint_cheeks(frame),
        }
    }

    fn wants_landmarks(&self) -> bool {
        true
    }

    fn set_landmarks(&mut self, landmarks: &Landmarks) {
        self.landmarks = landmarks.clone();
    }

    fn set_parameter(&mut self, param: ParamKind, value: f32) {
        if param == self.owned_param() {
            self.level = value.clamp(0.0, 1.0);
        }
    }
}

impl TintStage {
    fn paint_lips(&self, frame: &Frame) -> LustreResult<Frame> {
        let poly: Vec<Point> = MOUTH_OUTER
            .filter_map(|i| self.landmarks.point(i))
            .collect();
        if poly.len() != MOUTH_OUTER.count() {
            return Ok(frame.clone());
        }

        let mut out = frame.clone();
        let (min_x, min_y, max_x, max_y) = polygon_bounds(&poly, frame.width, frame.height);
        let w = frame.width as usize;
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let p = Point::new(x as f64 + 0.5, y as f64 + 0.5);
                if point_in_polygon(p, &poly) {
                    blend_px(&mut out.data, (y * w + x) * 4, self.color, self.level);
                }
            }
        }
        Ok(out)
    }

    fn paint_cheeks(&self, frame: &Frame) -> LustreResult<Frame> {
        let lm = &self.landmarks;
        let (Some(jaw_first), Some(jaw_last)) = (lm.point(JAW_FIRST), lm.point(JAW_LAST)) else {
            return Ok(frame.clone());
        };
        let face_width = (jaw_last - jaw_first).hypot();
        if face_width <= 0.0 {
            return Ok(frame.clone());
        }
        let radius = face_width * CHEEK_RADIUS_FRAC;

        let mut centers = Vec::new();
        for (eye, jaw_idx) in [(LEFT_EYE, JAW_LEFT_MID), (RIGHT_EYE, JAW_RIGHT_MID)] {
            let (Some(eye_center), Some(jaw)) = (centroid(lm, eye), lm.point(jaw_idx)) else {
                continue;
            };
            centers.push(eye_center.midpoint(jaw));
        }
        if centers.is_empty() {
            return Ok(frame.clone());
        }

        let mut out = frame.clone();
        let w = frame.width as usize;
        for center in centers {
            let min_x = ((center.x - radius).floor().max(0.0)) as usize;
            let min_y = ((center.y - radius).floor().max(0.0)) as usize;
            let max_x = ((center.x + radius).ceil() as usize).min(frame.width as usize - 1);
            let max_y = ((center.y + radius).ceil() as usize).min(frame.height as usize - 1);
            for y in min_y..=max_y {
                for x in min_x..=max_x {
                    let p = Point::new(x as f64 + 0.5, y as f64 + 0.5);
                    let d = (p - center).hypot();
                    if d < radius {
                        let falloff = 1.0 - smoothstep(0.0, 1.0, (d / radius) as f32);
                        blend_px(&mut out.data, (y * w + x) * 4, self.color, self.level * falloff);
                    }
                }
            }
        }
        Ok(out)
    }
}

fn blend_px(data: &mut [u8], idx: usize, color: [u8; 3], t: f32) {
    for c in 0..3 {
        data[idx + c] = lerp_u8(data[idx + c], color[c], t);
    }
}

fn centroid(lm: &Landmarks, range: std::ops::RangeInclusive<usize>) -> Option<Point> {
    let mut sum = kurbo::Vec2::ZERO;
    let mut count = 0usize;
    for i in range {
        sum += lm.point(i)?.to_vec2();
        count += 1;
    }
    if count == 0 {
        None
    } else {
        Some((sum / count as f64).to_point())
    }
}

fn polygon_bounds(poly: &[Point], width: u32, height: u32) -> (usize, usize, usize, usize) {
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for p in poly {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    (
        min_x.floor().max(0.0) as usize,
        min_y.floor().max(0.0) as usize,
        (max_x.ceil() as usize).min(width.saturating_sub(1) as usize),
        (max_y.ceil() as usize).min(height.saturating_sub(1) as usize),
    )
}

/// Ray-casting point-in-polygon test.
fn point_in_polygon(p: Point, poly: &[Point]) -> bool {
    let mut inside = false;
    let mut j = poly.len() - 1;
    for i in 0..poly.len() {
        let (a, b) = (poly[i], poly[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}
