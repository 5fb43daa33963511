/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 */

//! Frame sampling.
//!
//! A [`FrameSampler`] copies the current frame of a [`FrameSource`] into a
//! reusable RGBA buffer. Sources that are paused, ended or have not reported
//! a size yet are skipped without error.

use tracing::debug;

use crate::error::TrackerError;

pub const BYTES_PER_PIXEL: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoStatus {
    Playing,
    Paused,
    Ended,
}

/// RGBA pixel buffer, row-major, 4 bytes per pixel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    /// Sequence number of the sample that filled this buffer, starting at 0.
    pub frame_index: u64,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; Self::byte_len(width, height)],
            frame_index: 0,
        }
    }

    pub fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * BYTES_PER_PIXEL
    }

    /// Reallocate for a new resolution. Contents are zeroed.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.data.clear();
        self.data.resize(Self::byte_len(width, height), 0);
    }

    pub fn validate(&self) -> Result<(), TrackerError> {
        if self.width == 0 || self.height == 0 {
            return Err(TrackerError::MalformedFrame(format!(
                "empty frame {}x{}",
                self.width, self.height
            )));
        }
        let expected = Self::byte_len(self.width, self.height);
        if self.data.len() != expected {
            return Err(TrackerError::MalformedFrame(format!(
                "{}x{} frame holds {} bytes, expected {expected}",
                self.width,
                self.height,
                self.data.len()
            )));
        }
        Ok(())
    }
}

/// A live video source.
pub trait FrameSource: Send {
    fn status(&self) -> VideoStatus;

    /// Native resolution. `(0, 0)` until the source has produced a frame.
    fn dimensions(&self) -> (u32, u32);

    /// Copy the current frame into `buffer`, which is already sized to
    /// [`FrameSource::dimensions`].
    fn read_into(&mut self, buffer: &mut PixelBuffer) -> Result<(), TrackerError>;
}

pub struct FrameSampler {
    source: Box<dyn FrameSource>,
    buffer: PixelBuffer,
    samples: u64,
}

impl FrameSampler {
    pub fn new(source: Box<dyn FrameSource>) -> Self {
        Self {
            source,
            buffer: PixelBuffer::default(),
            samples: 0,
        }
    }

    /// Sample the source. `Ok(None)` means the source is not ready and the
    /// tick should be skipped.
    pub fn sample(&mut self) -> Result<Option<&PixelBuffer>, TrackerError> {
        match self.source.status() {
            VideoStatus::Playing => {}
            status => {
                debug!("skipping sample, source is {status:?}");
                return Ok(None);
            }
        }
        let (width, height) = self.source.dimensions();
        if width == 0 || height == 0 {
            return Ok(None);
        }
        if (width, height) != (self.buffer.width, self.buffer.height) {
            debug!(
                "resizing sample buffer {}x{} -> {width}x{height}",
                self.buffer.width, self.buffer.height
            );
            self.buffer.resize(width, height);
        }
        self.source.read_into(&mut self.buffer)?;
        self.buffer.validate()?;
        self.buffer.frame_index = self.samples;
        self.samples += 1;
        Ok(Some(&self.buffer))
    }

    pub fn samples_taken(&self) -> u64 {
        self.samples
    }

    pub fn source_status(&self) -> VideoStatus {
        self.source.status()
    }
}
