// src/scroll.rs

//! Scroll position to image-sequence frame mapping for the decorative
//! background, and the cache holding the frame images.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::RwLock,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScrollError {
    #[error("total frame count must be positive")]
    NoFrames,

    #[error("document is not taller than the viewport (max scroll {max_scroll})")]
    NoScrollableRange { max_scroll: f64 },

    #[error("scroll position must be a finite number")]
    NonFinite,

    #[error("frame {index} is out of range 0..{total}")]
    FrameOutOfRange { index: usize, total: usize },

    #[error("failed to load frame {index}: {message}")]
    Load { index: usize, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollPolicy {
    /// One frame per scroll event, in the direction of travel, wrapping.
    Delta,
    /// Absolute scroll position mapped linearly onto the frame range.
    Fractional,
}

impl ScrollPolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "delta" => Some(ScrollPolicy::Delta),
            "fractional" => Some(ScrollPolicy::Fractional),
            _ => None,
        }
    }
}

/// One scroll event as observed by the client.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollSample {
    pub scroll_y: f64,
    #[serde(default)]
    pub document_height: f64,
    #[serde(default)]
    pub viewport_height: f64,
}

/// Tracks the current frame for one viewer.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameMapper {
    policy: ScrollPolicy,
    total_frames: usize,
    frame: usize,
    last_scroll_y: f64,
}

impl FrameMapper {
    pub fn new(policy: ScrollPolicy, total_frames: usize) -> Result<Self, ScrollError> {
        Self::resume(policy, total_frames, 0, 0.0)
    }

    /// Rebuilds a mapper from state the client kept between events.
    pub fn resume(
        policy: ScrollPolicy,
        total_frames: usize,
        frame: usize,
        last_scroll_y: f64,
    ) -> Result<Self, ScrollError> {
        if total_frames == 0 {
            return Err(ScrollError::NoFrames);
        }
        if !last_scroll_y.is_finite() {
            return Err(ScrollError::NonFinite);
        }
        Ok(Self {
            policy,
            total_frames,
            frame: frame.min(total_frames - 1),
            last_scroll_y,
        })
    }

    pub fn policy(&self) -> ScrollPolicy {
        self.policy
    }

    pub fn frame(&self) -> usize {
        self.frame
    }

    pub fn last_scroll_y(&self) -> f64 {
        self.last_scroll_y
    }

    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    /// Feeds one scroll event and returns the frame to display.
    ///
    /// On error the mapper state is left unchanged.
    pub fn on_scroll(&mut self, sample: ScrollSample) -> Result<usize, ScrollError> {
        if !sample.scroll_y.is_finite() {
            return Err(ScrollError::NonFinite);
        }
        self.frame = match self.policy {
            ScrollPolicy::Delta => {
                delta_step(self.frame, self.total_frames, sample.scroll_y - self.last_scroll_y)
            }
            ScrollPolicy::Fractional => fractional_frame(
                sample.scroll_y,
                sample.document_height - sample.viewport_height,
                self.total_frames,
            )?,
        };
        self.last_scroll_y = sample.scroll_y;
        Ok(self.frame)
    }
}

/// Moves one frame forward on a positive delta, one back on a negative one.
pub fn delta_step(frame: usize, total_frames: usize, delta: f64) -> usize {
    if total_frames == 0 {
        return 0;
    }
    let frame = frame.min(total_frames - 1);
    if delta > 0.0 {
        (frame + 1) % total_frames
    } else if delta < 0.0 {
        if frame == 0 { total_frames - 1 } else { frame - 1 }
    } else {
        frame
    }
}

/// `min(total - 1, floor(scroll_top / max_scroll * total))`, clamped at 0.
pub fn fractional_frame(
    scroll_top: f64,
    max_scroll: f64,
    total_frames: usize,
) -> Result<usize, ScrollError> {
    if total_frames == 0 {
        return Err(ScrollError::NoFrames);
    }
    if !scroll_top.is_finite() || !max_scroll.is_finite() {
        return Err(ScrollError::NonFinite);
    }
    if max_scroll <= 0.0 {
        return Err(ScrollError::NoScrollableRange { max_scroll });
    }
    let fraction = (scroll_top / max_scroll).clamp(0.0, 1.0);
    let frame = (fraction * total_frames as f64).floor() as usize;
    Ok(frame.min(total_frames - 1))
}

/// Frame images on disk, named `ezgif-frame-001.jpg` onwards.
///
/// Frames are read on first request and kept in memory afterwards;
/// `preload_all` fills the cache eagerly.
#[derive(Debug)]
pub struct FrameCache {
    dir: PathBuf,
    total_frames: usize,
    frames: RwLock<HashMap<usize, Vec<u8>>>,
}

impl FrameCache {
    pub fn new(dir: impl Into<PathBuf>, total_frames: usize) -> Self {
        Self {
            dir: dir.into(),
            total_frames,
            frames: RwLock::new(HashMap::new()),
        }
    }

    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    /// File name for a zero-based frame index.
    pub fn file_name(index: usize) -> String {
        format!("ezgif-frame-{:03}.jpg", index + 1)
    }

    pub fn path_of(&self, index: usize) -> PathBuf {
        self.dir.join(Self::file_name(index))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn cached_count(&self) -> usize {
        self.frames.read().map(|f| f.len()).unwrap_or(0)
    }

    fn cached(&self, index: usize) -> Option<Vec<u8>> {
        self.frames.read().ok()?.get(&index).cloned()
    }

    /// Returns the frame bytes, reading the file the first time.
    pub async fn get(&self, index: usize) -> Result<Vec<u8>, ScrollError> {
        if index >= self.total_frames {
            return Err(ScrollError::FrameOutOfRange {
                index,
                total: self.total_frames,
            });
        }
        if let Some(bytes) = self.cached(index) {
            return Ok(bytes);
        }

        let path = self.path_of(index);
        let bytes = tokio::fs::read(&path).await.map_err(|e| ScrollError::Load {
            index,
            message: format!("{}: {}", path.display(), e),
        })?;
        tracing::debug!("Loaded background frame {} from {}", index, path.display());

        if let Ok(mut frames) = self.frames.write() {
            frames.insert(index, bytes.clone());
        }
        Ok(bytes)
    }

    /// Loads every frame up front. Returns how many loaded; failures are logged.
    pub async fn preload_all(&self) -> usize {
        let mut loaded = 0;
        for index in 0..self.total_frames {
            match self.get(index).await {
                Ok(_) => loaded += 1,
                Err(e) => tracing::warn!("Background frame preload failed: {}", e),
            }
        }
        loaded
    }
}
