//! Locates rendered frame files, puts them in playback order, and reads their
//! bytes into a `FrameSource` the compositor can decode.
//!
//! Types:
//!
//! - `SourceFrame` pairs a frame's file name with its undecoded bytes.
//! - `FrameSource` is the ordered list of frames consumed by one export.
//!
//! Functions:
//!
//! - `discover_frames` lists frame files in a directory, filtered by extension
//!   and already sorted.
//! - `frame_sort_key` extracts the last integer run of a file name.
//! - `sort_frame_paths` orders paths by that key, keeping enumeration order on ties.
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::PackError;

pub const DEFAULT_FRAME_EXTENSIONS: &[&str] = &["png"];

#[derive(Debug, Clone)]
pub struct SourceFrame {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct FrameSource {
    frames: Vec<SourceFrame>,
}

impl FrameSource {
    pub fn new(frames: Vec<SourceFrame>) -> Self {
        Self { frames }
    }

    /// Reads each path in the given order. The first unreadable file aborts the load.
    pub fn load(paths: &[PathBuf]) -> Result<Self, PackError> {
        let mut frames = Vec::with_capacity(paths.len());
        for path in paths {
            let bytes = fs::read(path).map_err(|source| PackError::ReadFrame {
                path: path.clone(),
                source,
            })?;
            frames.push(SourceFrame {
                filename: file_name_of(path),
                bytes,
            });
        }
        debug!(frames = frames.len(), "loaded frame source");
        Ok(Self { frames })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[SourceFrame] {
        &self.frames
    }

    pub fn filenames(&self) -> Vec<String> {
        self.frames.iter().map(|frame| frame.filename.clone()).collect()
    }
}

pub fn discover_frames(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>, PackError> {
    if !dir.is_dir() {
        return Err(PackError::FramesDirMissing(dir.to_path_buf()));
    }

    let entries = fs::read_dir(dir).map_err(|source| PackError::ReadFrame {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| PackError::ReadFrame {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_file() && has_allowed_extension(&path, extensions) {
            paths.push(path);
        }
    }

    if paths.is_empty() {
        return Err(PackError::NoMatchingFrames {
            dir: dir.to_path_buf(),
            extensions: extensions.to_vec(),
        });
    }

    // read_dir order is platform dependent; name order gives ties a stable base.
    paths.sort();
    sort_frame_paths(&mut paths);
    debug!(dir = %dir.display(), frames = paths.len(), "discovered frame files");
    Ok(paths)
}

pub fn frame_sort_key(name: &str) -> u64 {
    let bytes = name.as_bytes();
    let Some(end) = bytes.iter().rposition(u8::is_ascii_digit) else {
        return 0;
    };
    let start = bytes[..end]
        .iter()
        .rposition(|byte| !byte.is_ascii_digit())
        .map_or(0, |pos| pos + 1);
    name[start..=end]
        .bytes()
        .fold(0u64, |acc, digit| acc.saturating_mul(10).saturating_add(u64::from(digit - b'0')))
}

pub fn sort_frame_paths(paths: &mut [PathBuf]) {
    paths.sort_by_key(|path| frame_sort_key(&file_name_of(path)));
}

fn has_allowed_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            extensions
                .iter()
                .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
