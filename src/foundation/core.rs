use crate::foundation::error::{LustreError, LustreResult};

pub use kurbo::{Point, Vec2};

/// Absolute 0-based frame index in stream order.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32,
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> LustreResult<Self> {
        if den == 0 {
            return Err(LustreError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(LustreError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Duration of one frame in seconds.
    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }
}

/// Color-channel ordering of a [`Frame`] buffer.
///
/// Sources and sinks speak 3-channel `Rgb`; the chain's internal representation
/// is fixed at 4-channel `Rgba`, so frames are normalized on the way in and
/// denormalized on the way out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ChannelOrder {
    /// 3-channel packed RGB, the decode-source and encode-sink order.
    Rgb,
    /// 4-channel packed RGBA, the pipeline-internal order.
    Rgba,
}

impl ChannelOrder {
    /// Bytes per pixel for this ordering.
    pub fn channels(self) -> u32 {
        match self {
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }
}

/// A rectangular pixel buffer, tightly packed and row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Channel ordering of `data`.
    pub order: ChannelOrder,
    /// Pixel bytes, `width * height * order.channels()` long.
    pub data: Vec<u8>,
}

impl Frame {
    /// Create a validated frame from raw bytes.
    pub fn new(width: u32, height: u32, order: ChannelOrder, data: Vec<u8>) -> LustreResult<Self> {
        let frame = Self {
            width,
            height,
            order,
            data,
        };
        frame.validate()?;
        Ok(frame)
    }

    /// Create an all-zero frame of the given dimensions.
    pub fn zeroed(width: u32, height: u32, order: ChannelOrder) -> LustreResult<Self> {
        let len = buffer_len(width, height, order)?;
        Ok(Self {
            width,
            height,
            order,
            data: vec![0u8; len],
        })
    }

    /// Check the buffer-bounds invariant, returning a frame-level error on mismatch.
    pub fn validate(&self) -> LustreResult<()> {
        let expected = buffer_len(self.width, self.height, self.order)?;
        if self.data.len() != expected {
            return Err(LustreError::pipeline(format!(
                "frame buffer is {} bytes, expected {expected} for {}x{} {:?}",
                self.data.len(),
                self.width,
                self.height,
                self.order
            )));
        }
        Ok(())
    }

    /// Pixel count (`width * height`).
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Normalize into the pipeline-internal 4-channel order.
    ///
    /// RGB gains an opaque alpha channel; RGBA frames pass through unchanged.
    pub fn to_rgba(&self) -> LustreResult<Frame> {
        self.validate()?;
        match self.order {
            ChannelOrder::Rgba => Ok(self.clone()),
            ChannelOrder::Rgb => {
                let mut data = Vec::with_capacity(self.pixel_count() * 4);
                for px in self.data.chunks_exact(3) {
                    data.extend_from_slice(px);
                    data.push(255);
                }
                Frame::new(self.width, self.height, ChannelOrder::Rgba, data)
            }
        }
    }

    /// Denormalize back into the 3-channel source/sink order, dropping alpha.
    pub fn to_rgb(&self) -> LustreResult<Frame> {
        self.validate()?;
        match self.order {
            ChannelOrder::Rgb => Ok(self.clone()),
            ChannelOrder::Rgba => {
                let mut data = Vec::with_capacity(self.pixel_count() * 3);
                for px in self.data.chunks_exact(4) {
                    data.extend_from_slice(&px[..3]);
                }
                Frame::new(self.width, self.height, ChannelOrder::Rgb, data)
            }
        }
    }
}

fn buffer_len(width: u32, height: u32, order: ChannelOrder) -> LustreResult<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(order.channels() as usize))
        .ok_or_else(|| LustreError::pipeline("frame buffer size overflow"))
}

/// Per-frame facial feature coordinates in frame-pixel space.
///
/// Stored flattened as `x0, y0, x1, y1, …`. An empty set is a valid value
/// (no face detected) and every consumer must tolerate it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Landmarks {
    coords: Vec<f32>,
}

impl Landmarks {
    /// The empty landmark set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create from flattened coordinate pairs.
    pub fn from_flat(coords: Vec<f32>) -> LustreResult<Self> {
        if !coords.len().is_multiple_of(2) {
            return Err(LustreError::validation(
                "landmark coordinates must come in (x, y) pairs",
            ));
        }
        Ok(Self { coords })
    }

    /// Return `true` when no face was detected.
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Number of coordinate pairs.
    pub fn len_points(&self) -> usize {
        self.coords.len() / 2
    }

    /// The `i`-th landmark as a point, if present.
    pub fn point(&self, i: usize) -> Option<Point> {
        let x = *self.coords.get(i * 2)?;
        let y = *self.coords.get(i * 2 + 1)?;
        Some(Point::new(f64::from(x), f64::from(y)))
    }

    /// Iterate all landmarks as points.
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.coords
            .chunks_exact(2)
            .map(|xy| Point::new(f64::from(xy[0]), f64::from(xy[1])))
    }

    /// Borrow the flattened coordinates.
    pub fn as_flat(&self) -> &[f32] {
        &self.coords
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_new_rejects_wrong_buffer_len() {
        let err = Frame::new(2, 2, ChannelOrder::Rgb, vec![0u8; 11]).unwrap_err();
        assert!(matches!(err, LustreError::Pipeline(_)));
        assert!(Frame::new(2, 2, ChannelOrder::Rgb, vec![0u8; 12]).is_ok());
    }

    #[test]
    fn channel_order_round_trip_is_identity() {
        // Synthetic 2x2 RGB buffer with distinct pixel values.
        let src = Frame::new(
            2,
            2,
            ChannelOrder::Rgb,
            vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12],
        )
        .unwrap();

        let rgba = src.to_rgba().unwrap();
        assert_eq!(rgba.order, ChannelOrder::Rgba);
        assert_eq!(rgba.data.len(), 16);
        assert_eq!(&rgba.data[..4], &[1, 2, 3, 255]);

        let back = rgba.to_rgb().unwrap();
        assert_eq!(back, src);
    }

    #[test]
    fn rgba_to_rgba_is_a_clone() {
        let f = Frame::zeroed(3, 1, ChannelOrder::Rgba).unwrap();
        assert_eq!(f.to_rgba().unwrap(), f);
    }

    #[test]
    fn landmarks_require_pairs() {
        assert!(Landmarks::from_flat(vec![1.0, 2.0, 3.0]).is_err());
        let lm = Landmarks::from_flat(vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(lm.len_points(), 2);
        assert_eq!(lm.point(1), Some(Point::new(3.0, 4.0)));
        assert_eq!(lm.point(2), None);
    }

    #[test]
    fn empty_landmarks_are_valid() {
        let lm = Landmarks::empty();
        assert!(lm.is_empty());
        assert_eq!(lm.points().count(), 0);
    }

    #[test]
    fn fps_rejects_zero() {
        assert!(Fps::new(0, 1).is_err());
        assert!(Fps::new(30, 0).is_err());
        let fps = Fps::new(30000, 1001).unwrap();
        assert!((fps.as_f64() - 29.97).abs() < 0.01);
    }
}
