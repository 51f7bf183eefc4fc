//! Frame sources
//!
//! The camera is an external collaborator: the controller only needs frames
//! on poll and a torch switch. [`FrameSequence`] replays prepared frames and
//! scripts failures for tests and the CLI.

mod sequence;

pub use sequence::FrameSequence;

use crate::error::{IlluminationUnavailable, SourceError};
use crate::models::Frame;

/// Continuous camera feed.
///
/// Frames arrive with non-decreasing timestamps and strictly increasing
/// sequence numbers. Gaps in either are normal.
pub trait FrameSource: Send {
    /// Open the device. Called on `start()`.
    fn acquire(&mut self) -> Result<(), SourceError>;

    /// Non-blocking poll. `Ok(None)` means no new frame yet.
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError>;

    /// Switch the torch on or off.
    fn set_illumination(&mut self, enabled: bool) -> Result<(), IlluminationUnavailable>;

    /// Close the device. Called on `stop()`.
    fn release(&mut self);
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn acquire(&mut self) -> Result<(), SourceError> {
        (**self).acquire()
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        (**self).next_frame()
    }

    fn set_illumination(&mut self, enabled: bool) -> Result<(), IlluminationUnavailable> {
        (**self).set_illumination(enabled)
    }

    fn release(&mut self) {
        (**self).release()
    }
}
