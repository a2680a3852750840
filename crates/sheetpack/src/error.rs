use std::path::PathBuf;

use thiserror::Error;

/// Coarse classification used by callers that only care whether an export
/// failed on its inputs, on frame geometry, or while producing outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Input,
    DimensionMismatch,
    Encode,
}

#[derive(Debug, Error)]
pub enum PackError {
    #[error("no frames to pack")]
    NoFrames,

    #[error("frames directory not found: {0}")]
    FramesDirMissing(PathBuf),

    #[error("no frame files with extensions {extensions:?} in {dir}")]
    NoMatchingFrames {
        dir: PathBuf,
        extensions: Vec<String>,
    },

    #[error("failed to read frame {path}: {source}")]
    ReadFrame {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode frame {index} ({filename}): {source}")]
    DecodeFrame {
        index: usize,
        filename: String,
        #[source]
        source: image::ImageError,
    },

    #[error(
        "frame dimension mismatch at index {index}, expected {expected_width}x{expected_height} got {width}x{height}"
    )]
    DimensionMismatch {
        index: usize,
        expected_width: u32,
        expected_height: u32,
        width: u32,
        height: u32,
    },

    #[error("invalid composition: {0}")]
    InvalidComposition(String),

    #[error("sprite sheet of {width}x{height} exceeds the addressable pixel range")]
    SheetTooLarge { width: u64, height: u64 },

    #[error("failed to encode sprite sheet: {0}")]
    EncodeSheet(#[source] image::ImageError),

    #[error("failed to serialize manifest: {0}")]
    SerializeManifest(#[from] serde_json::Error),

    #[error("failed to write {path}: {source}")]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PackError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoFrames
            | Self::FramesDirMissing(_)
            | Self::NoMatchingFrames { .. }
            | Self::ReadFrame { .. }
            | Self::DecodeFrame { .. }
            | Self::InvalidComposition(_)
            | Self::SheetTooLarge { .. } => ErrorKind::Input,
            Self::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            Self::EncodeSheet(_) | Self::SerializeManifest(_) | Self::WriteOutput { .. } => {
                ErrorKind::Encode
            }
        }
    }
}
