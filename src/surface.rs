//! Display-surface seam.
//!
//! Surface creation belongs to an external collaborator (a windowing system);
//! the loop only consumes this narrow contract once per iteration. The
//! built-in [`HeadlessSurface`] drives scripted sessions and tests.

use std::collections::VecDeque;

use crate::foundation::core::Frame;
use crate::foundation::error::LustreResult;
use crate::input::Key;

/// The display-surface contract consumed by the driver loop.
pub trait DisplaySurface {
    /// Whether the surface asked the session to end.
    fn close_requested(&self) -> bool;

    /// Present one transformed frame.
    fn present(&mut self, frame: &Frame) -> LustreResult<()>;

    /// Drain key presses delivered since the last poll.
    fn poll_input(&mut self) -> Vec<Key>;

    /// A pending resize, if one happened. The loop reacts by updating its
    /// output viewport only.
    fn take_resize(&mut self) -> Option<(u32, u32)>;
}

/// Scriptable surface with no window behind it.
///
/// Key events fire on the poll with the matching 0-based iteration index;
/// `close_after` bounds the session length.
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    scripted: VecDeque<(u64, Key)>,
    resize_at: Option<(u64, (u32, u32))>,
    close_after: Option<u64>,
    polls: u64,
    presented: u64,
    last: Option<Frame>,
}

impl HeadlessSurface {
    /// Surface that never closes on its own and delivers no input.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request close once `n` input polls have been serviced.
    pub fn close_after(mut self, n: u64) -> Self {
        self.close_after = Some(n);
        self
    }

    /// Schedule `key` for the poll with iteration index `at`.
    ///
    /// Events must be scheduled in non-decreasing iteration order.
    pub fn script_key(mut self, at: u64, key: Key) -> Self {
        self.scripted.push_back((at, key));
        self
    }

    /// Schedule a viewport resize for iteration `at`.
    pub fn script_resize(mut self, at: u64, size: (u32, u32)) -> Self {
        self.resize_at = Some((at, size));
        self
    }

    /// Number of frames presented so far.
    pub fn presented(&self) -> u64 {
        self.presented
    }

    /// Take the most recently presented frame.
    pub fn take_last_frame(&mut self) -> Option<Frame> {
        self.last.take()
    }
}

impl DisplaySurface for HeadlessSurface {
    fn close_requested(&self) -> bool {
        self.close_after.is_some_and(|n| self.polls >= n)
    }

    fn present(&mut self, frame: &Frame) -> LustreResult<()> {
        frame.validate()?;
        self.presented += 1;
        self.last = Some(frame.clone());
        Ok(())
    }

    fn poll_input(&mut self) -> Vec<Key> {
        let now = self.polls;
        self.polls += 1;

        let mut keys = Vec::new();
        while let Some(&(at, key)) = self.scripted.front() {
            if at > now {
                break;
            }
            keys.push(key);
            self.scripted.pop_front();
        }
        keys
    }

    fn take_resize(&mut self) -> Option<(u32, u32)> {
        let (at, size) = self.resize_at?;
        if self.polls > at {
            self.resize_at = None;
            return Some(size);
        }
        None
    }
}
