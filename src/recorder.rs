//! Frame capture.
//!
//! The recorder starts inactive. Once the lifecycle controller activates it
//! (at the snapshot), every frame handed to [`FrameRecorder::capture`] is
//! written to `<dir>/<n>.jpg` with `n` counting up from 0. The numbering is
//! what the video exporter's `%d` input pattern expects.

use std::io;
use std::path::{Path, PathBuf};

use image::buffer::ConvertBuffer;
use image::RgbImage;

use crate::error::RecordError;
use crate::render::Frame;

/// Extension of captured frames.
pub const FRAME_EXTENSION: &str = "jpg";

/// Clear `dir` and create it again, empty.
pub fn prepare(dir: &Path) -> Result<(), RecordError> {
    let wrap = |source: io::Error| RecordError::Prepare {
        path: dir.to_path_buf(),
        source,
    };
    match std::fs::remove_dir_all(dir) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(wrap(e)),
    }
    std::fs::create_dir_all(dir).map_err(wrap)?;
    tracing::debug!(target: "recorder", dir = %dir.display(), "frame directory ready");
    Ok(())
}

/// Frames written so far, in capture order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameSequence {
    dir: PathBuf,
    frames: Vec<u64>,
}

impl FrameSequence {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            frames: Vec::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn frames(&self) -> &[u64] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Path of frame `id`.
    pub fn path_of(&self, id: u64) -> PathBuf {
        self.dir.join(format!("{id}.{FRAME_EXTENSION}"))
    }

    /// printf-style input pattern for the encoder.
    pub fn pattern(&self) -> PathBuf {
        self.dir.join(format!("%d.{FRAME_EXTENSION}"))
    }
}

#[derive(Debug)]
pub struct FrameRecorder {
    active: bool,
    sequence: FrameSequence,
}

impl FrameRecorder {
    /// An inactive recorder writing into `dir`.
    ///
    /// The directory is expected to exist; see [`prepare`].
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            active: false,
            sequence: FrameSequence::new(dir),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Start capturing. Idempotent.
    pub fn activate(&mut self) {
        if !self.active {
            tracing::info!(target: "recorder", dir = %self.sequence.dir.display(), "recording started");
        }
        self.active = true;
    }

    pub fn sequence(&self) -> &FrameSequence {
        &self.sequence
    }

    /// Write `frame` if active. Returns the id of the written frame.
    pub fn capture(&mut self, frame: &Frame) -> Result<Option<u64>, RecordError> {
        if !self.active {
            return Ok(None);
        }
        let id = self.sequence.frames.len() as u64;
        let path = self.sequence.path_of(id);
        // JPEG has no alpha channel.
        let rgb: RgbImage = frame.convert();
        rgb.save(&path)
            .map_err(|source| RecordError::Write { path: path.clone(), source })?;
        self.sequence.frames.push(id);
        tracing::trace!(target: "recorder", frame = id, "captured");
        Ok(Some(id))
    }

    /// Stop capturing and hand over the sequence.
    pub fn finish(&mut self) -> FrameSequence {
        self.active = false;
        let empty = FrameSequence::new(self.sequence.dir.clone());
        std::mem::replace(&mut self.sequence, empty)
    }
}
