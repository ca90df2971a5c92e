//! Static-image frame source.

use std::path::Path;

use anyhow::Context as _;

use crate::foundation::core::{ChannelOrder, Fps, Frame};
use crate::foundation::error::LustreResult;
use crate::source::FrameSource;

/// Nominal rate a repeated still image is presented at.
const STILL_IMAGE_FPS: Fps = Fps { num: 30, den: 1 };

/// One static image, re-yielded for every loop iteration.
#[derive(Clone, Debug)]
pub struct ImageSource {
    frame: Frame,
}

impl ImageSource {
    /// Load an image file into a source-order RGB frame.
    pub fn open(path: impl AsRef<Path>) -> LustreResult<Self> {
        let path = path.as_ref();
        let img = image::open(path)
            .with_context(|| format!("failed to load image '{}'", path.display()))?
            .to_rgb8();
        let (width, height) = img.dimensions();
        let frame = Frame::new(width, height, ChannelOrder::Rgb, img.into_raw())?;
        Ok(Self { frame })
    }

    /// Wrap an already decoded frame (used by tests).
    pub fn from_frame(frame: Frame) -> Self {
        Self { frame }
    }
}

impl FrameSource for ImageSource {
    fn next_frame(&mut self) -> LustreResult<Option<Frame>> {
        Ok(Some(self.frame.clone()))
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.frame.width, self.frame.height)
    }

    fn fps(&self) -> Fps {
        STILL_IMAGE_FPS
    }

    fn frame_count(&self) -> Option<u64> {
        None
    }

    fn is_open(&self) -> bool {
        true
    }
}
