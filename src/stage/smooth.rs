//! Skin-smoothing and whitening stage.

use crate::foundation::core::Frame;
use crate::foundation::error::{LustreError, LustreResult};
use crate::foundation::math::lerp_u8;
use crate::params::ParamKind;
use crate::stage::{Stage, require_rgba};

/// Largest blur radius used at full smoothing intensity.
const MAX_SMOOTHING_RADIUS_PX: f32 = 6.0;

/// Smoothing/tone stage: a Gaussian soft-focus blend plus a whitening lift.
///
/// Two independent parameters: `Smoothing` (normalized blur blend in `[0, 1]`)
/// and `Whitening` (lift toward white in `[0, 0.5]`).
#[derive(Clone, Debug)]
pub struct SmoothStage {
    blur_alpha: f32,
    white: f32,
}

impl SmoothStage {
    /// Create the stage with both effects off.
    pub fn new() -> Self {
        Self {
            blur_alpha: 0.0,
            white: 0.0,
        }
    }
}

impl Default for SmoothStage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for SmoothStage {
    fn name(&self) -> &'static str {
        "smooth"
    }

    fn transform(&self, frame: &Frame) -> LustreResult<Frame> {
        require_rgba(self.name(), frame)?;

        let mut out = frame.clone();

        if self.blur_alpha > 0.0 {
            let radius = (self.blur_alpha * MAX_SMOOTHING_RADIUS_PX).round().max(1.0) as u32;
            let sigma = radius as f32 / 2.0;
            let blurred = blur_rgba8(&frame.data, frame.width, frame.height, radius, sigma)?;
            for (o, b) in out.data.chunks_exact_mut(4).zip(blurred.chunks_exact(4)) {
                for c in 0..3 {
                    o[c] = lerp_u8(o[c], b[c], self.blur_alpha);
                }
            }
        }

        if self.white > 0.0 {
            for px in out.data.chunks_exact_mut(4) {
                for c in px.iter_mut().take(3) {
                    *c = lerp_u8(*c, 255, self.white);
                }
            }
        }

        Ok(out)
    }

    fn set_parameter(&mut self, param: ParamKind, value: f32) {
        match param {
            ParamKind::Smoothing => self.blur_alpha = value.clamp(0.0, 1.0),
            ParamKind::Whitening => self.white = value.clamp(0.0, 1.0),
            _ => {}
        }
    }
}

/// Separable Gaussian blur over packed RGBA8, clamp-to-edge sampling.
///
/// Kernel weights are Q16 fixed point and renormalized so they sum to exactly
/// `1 << 16`, keeping constant-color regions bit-stable.
fn blur_rgba8(src: &[u8], width: u32, height: u32, radius: u32, sigma: f32) -> LustreResult<Vec<u8>> {
    let expected_len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| LustreError::pipeline("blur buffer size overflow"))?;
    if src.len() != expected_len {
        return Err(LustreError::pipeline(
            "blur_rgba8 expects src matching width*height*4",
        ));
    }
    if radius == 0 {
        return Ok(src.to_vec());
    }

    let kernel = gaussian_kernel_q16(radius, sigma)?;
    let mut tmp = vec![0u8; expected_len];
    let mut out = vec![0u8; expected_len];

    horizontal_pass(src, &mut tmp, width, height, &kernel);
    vertical_pass(&tmp, &mut out, width, height, &kernel);
    Ok(out)
}

fn gaussian_kernel_q16(radius: u32, sigma: f32) -> LustreResult<Vec<u32>> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(LustreError::validation("blur sigma must be > 0"));
    }

    let r = radius as i32;
    let mut weights_f = Vec::<f64>::with_capacity((2 * r + 1) as usize);
    let mut sum = 0.0f64;
    let sigma = f64::from(sigma);
    let denom = 2.0 * sigma * sigma;
    for i in -r..=r {
        let x = f64::from(i);
        let w = (-x * x / denom).exp();
        weights_f.push(w);
        sum += w;
    }

    let mut weights = Vec::<u32>::with_capacity(weights_f.len());
    let mut acc: i64 = 0;
    for &wf in &weights_f {
        let q = ((wf / sum) * 65536.0).round() as i64;
        let q = q.clamp(0, 65536);
        weights.push(q as u32);
        acc += q;
    }
    // Push any rounding residue into the center tap so the kernel sums to 1.0.
    let delta = 65536 - acc;
    if delta != 0 {
        let mid = weights.len() / 2;
        let new_mid = (i64::from(weights[mid]) + delta).clamp(0, 65536);
        weights[mid] = new_mid as u32;
    }

    Ok(weights)
}

fn horizontal_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    for y in 0..height as i32 {
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let dx = ki as i32 - radius;
                let sx = (x + dx).clamp(0, w - 1);
                let idx = ((y * w + sx) as usize) * 4;
                for c in 0..4 {
                    acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out_idx = ((y * w + x) as usize) * 4;
            for c in 0..4 {
                dst[out_idx + c] = q16_to_u8(acc[c]);
            }
        }
    }
}

fn vertical_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    let h = height as i32;
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let dy = ki as i32 - radius;
                let sy = (y + dy).clamp(0, h - 1);
                let idx = ((sy * w + x) as usize) * 4;
                for c in 0..4 {
                    acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out_idx = ((y * w + x) as usize) * 4;
            for c in 0..4 {
                dst[out_idx + c] = q16_to_u8(acc[c]);
            }
        }
    }
}

fn q16_to_u8(acc: u64) -> u8 {
    ((acc + (1 << 15)) >> 16).min(255) as u8
}
