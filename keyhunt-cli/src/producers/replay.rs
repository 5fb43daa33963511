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

//! Scripted replay. A JSON lines detection script stands in for both the
//! camera and the marker detector; an optional directory of images supplies
//! the pixels.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use image::imageops::FilterType;
use keyhunt_tracker::{
    FrameSource, MarkerDetector, MarkerObservation, PixelBuffer, TrackerError, VideoStatus,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("script line {line}: {source}")]
    Line {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScriptMarker {
    pub id: u32,
    /// Pixel corners, top-left origin, clockwise from top-left.
    pub corners: [[f64; 2]; 4],
}

/// One detection frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScriptFrame {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub markers: Vec<ScriptMarker>,
}

impl ScriptFrame {
    pub fn observations(&self) -> Vec<MarkerObservation> {
        self.markers
            .iter()
            .map(|m| MarkerObservation::new(m.id, m.corners))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplayScript {
    frames: Vec<ScriptFrame>,
}

impl ReplayScript {
    /// Parse JSON lines. Blank lines are skipped; line numbers in errors are
    /// 1-based.
    pub fn parse(raw: &str) -> Result<Self, ScriptError> {
        let mut frames = Vec::new();
        for (i, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let frame = serde_json::from_str(line)
                .map_err(|source| ScriptError::Line { line: i + 1, source })?;
            frames.push(frame);
        }
        Ok(Self { frames })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&raw)
    }

    pub fn frames(&self) -> &[ScriptFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Split into the session-facing source and detector, plus a handle to
    /// watch progress from outside the session.
    pub fn into_parts(self, images: Option<Vec<PathBuf>>) -> (ReplaySource, ReplayDetector, ReplayProgress) {
        if let Some(images) = &images {
            if images.len() < self.frames.len() {
                warn!(
                    "{} image frames for {} script lines, the rest replay blank",
                    images.len(),
                    self.frames.len()
                );
            }
        }
        let script = Arc::new(self);
        let playhead = Arc::new(Playhead::default());
        (
            ReplaySource {
                script: script.clone(),
                images,
                playhead: playhead.clone(),
            },
            ReplayDetector {
                script: script.clone(),
                playhead: playhead.clone(),
            },
            ReplayProgress { script, playhead },
        )
    }
}

/// Image files in `dir` with a known extension, sorted by file name.
pub fn list_frames(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, ScriptError> {
    let dir = dir.as_ref();
    let entries = fs::read_dir(dir).map_err(|source| ScriptError::Io {
        path: dir.display().to_string(),
        source,
    })?;
    let mut frames: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    frames.sort();
    Ok(frames)
}

#[derive(Debug, Default)]
struct Playhead {
    /// Index of the next script line to read.
    next: AtomicUsize,
    /// One past the index of the line last read, 0 before the first read.
    last_read: AtomicUsize,
}

pub struct ReplaySource {
    script: Arc<ReplayScript>,
    images: Option<Vec<PathBuf>>,
    playhead: Arc<Playhead>,
}

impl ReplaySource {
    fn load_image(path: &Path, buffer: &mut PixelBuffer) -> Result<(), TrackerError> {
        let mut rgba = image::open(path)
            .map_err(|e| TrackerError::MalformedFrame(format!("{}: {e}", path.display())))?
            .to_rgba8();
        if rgba.dimensions() != (buffer.width, buffer.height) {
            debug!(
                "scaling {} from {:?} to {}x{}",
                path.display(),
                rgba.dimensions(),
                buffer.width,
                buffer.height
            );
            rgba = image::imageops::resize(&rgba, buffer.width, buffer.height, FilterType::Triangle);
        }
        buffer.data.copy_from_slice(rgba.as_raw());
        Ok(())
    }
}

impl FrameSource for ReplaySource {
    fn status(&self) -> VideoStatus {
        if self.playhead.next.load(Ordering::SeqCst) < self.script.len() {
            VideoStatus::Playing
        } else {
            VideoStatus::Ended
        }
    }

    fn dimensions(&self) -> (u32, u32) {
        self.script
            .frames
            .get(self.playhead.next.load(Ordering::SeqCst))
            .map(|f| (f.width, f.height))
            .unwrap_or((0, 0))
    }

    fn read_into(&mut self, buffer: &mut PixelBuffer) -> Result<(), TrackerError> {
        let index = self.playhead.next.fetch_add(1, Ordering::SeqCst);
        self.playhead.last_read.store(index + 1, Ordering::SeqCst);
        match self.images.as_ref().and_then(|images| images.get(index)) {
            Some(path) => Self::load_image(path, buffer),
            None => {
                buffer.data.fill(0);
                Ok(())
            }
        }
    }
}

/// Reports the scripted markers of the line the source read last.
pub struct ReplayDetector {
    script: Arc<ReplayScript>,
    playhead: Arc<Playhead>,
}

impl MarkerDetector for ReplayDetector {
    fn detect(&mut self, _frame: &PixelBuffer) -> Result<Vec<MarkerObservation>, TrackerError> {
        let last_read = self.playhead.last_read.load(Ordering::SeqCst);
        let Some(index) = last_read.checked_sub(1) else {
            return Ok(Vec::new());
        };
        Ok(self
            .script
            .frames
            .get(index)
            .map(ScriptFrame::observations)
            .unwrap_or_default())
    }
}

#[derive(Clone)]
pub struct ReplayProgress {
    script: Arc<ReplayScript>,
    playhead: Arc<Playhead>,
}

impl ReplayProgress {
    pub fn frames_read(&self) -> usize {
        self.playhead.next.load(Ordering::SeqCst).min(self.script.len())
    }

    pub fn is_finished(&self) -> bool {
        self.playhead.next.load(Ordering::SeqCst) >= self.script.len()
    }
}
