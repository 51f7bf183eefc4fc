use std::collections::VecDeque;
use std::time::Duration;

use image::DynamicImage;
use log::{debug, info};

use super::FrameSource;
use crate::error::{IlluminationUnavailable, SourceError};
use crate::models::Frame;

/// Replays a fixed list of frames as a camera feed.
///
/// Each poll returns the next frame. Output frames are renumbered so
/// sequence numbers keep increasing across loops, and looped frames are
/// shifted in time by the length of one pass.
#[derive(Debug, Clone)]
pub struct FrameSequence {
    frames: Vec<Frame>,
    pending: VecDeque<Frame>,
    cursor: usize,
    looping: bool,
    pass: u32,
    frame_interval: Duration,
    next_sequence: u64,
    acquired: bool,
    permission_denied: bool,
    torch_available: bool,
    torch: bool,
    failures_left: usize,
}

impl FrameSequence {
    /// Replay `frames` in order, once.
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames,
            pending: VecDeque::new(),
            cursor: 0,
            looping: false,
            pass: 0,
            frame_interval: Duration::from_millis(33),
            next_sequence: 0,
            acquired: false,
            permission_denied: false,
            torch_available: true,
            torch: false,
            failures_left: 0,
        }
    }

    /// Frames from decoded images, `1/fps` seconds apart starting at zero.
    pub fn from_images(images: &[DynamicImage], fps: f64) -> Self {
        let interval = Duration::from_secs_f64(1.0 / fps.max(0.001));
        let frames = images
            .iter()
            .enumerate()
            .map(|(i, img)| Frame::from_image(img, interval * i as u32, i as u64))
            .collect();
        Self::new(frames).with_frame_interval(interval)
    }

    /// The same picture at each of `timestamps`.
    pub fn repeated(frame: &Frame, timestamps: &[Duration]) -> Self {
        let frames = timestamps
            .iter()
            .enumerate()
            .map(|(i, &ts)| frame.retimed(ts, i as u64))
            .collect();
        Self::new(frames)
    }

    /// Start over after the last frame.
    pub fn looping(mut self) -> Self {
        self.looping = true;
        self
    }

    /// Gap between the last frame of one pass and the first of the next.
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Refuse `acquire()` as if the user denied camera access.
    pub fn deny_permission(mut self) -> Self {
        self.permission_denied = true;
        self
    }

    /// Report the torch as missing.
    pub fn without_torch(mut self) -> Self {
        self.torch_available = false;
        self
    }

    /// Make the next `count` polls fail with `SourceError::Unavailable`.
    pub fn fail_next_frames(&mut self, count: usize) {
        self.failures_left = count;
    }

    /// Deliver `frame` on the next poll, ahead of the replay list.
    pub fn push(&mut self, frame: Frame) {
        self.pending.push_back(frame);
    }

    /// Current torch state
    pub fn illumination(&self) -> bool {
        self.torch
    }

    /// True between `acquire()` and `release()`
    pub fn is_acquired(&self) -> bool {
        self.acquired
    }

    /// Frames not yet delivered in the current pass
    pub fn remaining(&self) -> usize {
        self.pending.len() + self.frames.len().saturating_sub(self.cursor)
    }

    fn pass_offset(&self) -> Duration {
        match self.frames.last() {
            Some(last) if self.pass > 0 => (last.timestamp() + self.frame_interval) * self.pass,
            _ => Duration::ZERO,
        }
    }
}

impl FrameSource for FrameSequence {
    fn acquire(&mut self) -> Result<(), SourceError> {
        if self.permission_denied {
            return Err(SourceError::PermissionDenied);
        }
        self.acquired = true;
        info!("frame sequence acquired ({} frames)", self.frames.len());
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        if !self.acquired {
            return Err(SourceError::Unavailable("source not acquired".into()));
        }
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(SourceError::Unavailable("frame stream interrupted".into()));
        }

        let frame = if let Some(frame) = self.pending.pop_front() {
            frame
        } else {
            if self.cursor >= self.frames.len() {
                if !self.looping || self.frames.is_empty() {
                    return Ok(None);
                }
                self.cursor = 0;
                self.pass += 1;
                debug!("frame sequence pass {}", self.pass);
            }
            let frame = &self.frames[self.cursor];
            self.cursor += 1;
            frame.retimed(frame.timestamp() + self.pass_offset(), 0)
        };

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        Ok(Some(frame.retimed(frame.timestamp(), sequence)))
    }

    fn set_illumination(&mut self, enabled: bool) -> Result<(), IlluminationUnavailable> {
        if !self.torch_available {
            return Err(IlluminationUnavailable("device has no torch".into()));
        }
        self.torch = enabled;
        debug!("torch {}", if enabled { "on" } else { "off" });
        Ok(())
    }

    fn release(&mut self) {
        self.acquired = false;
        self.torch = false;
        info!("frame sequence released");
    }
}
