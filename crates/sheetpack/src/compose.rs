//! Decodes a `FrameSource` and copies every frame, unscaled, into its grid
//! cell on a transparent RGBA canvas.
use std::io::Cursor;

use image::{imageops, ImageFormat, RgbaImage};
use rayon::prelude::*;
use tracing::debug;

use crate::error::PackError;
use crate::frames::{FrameSource, SourceFrame};
use crate::layout::GridLayout;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComposeOptions {
    /// Decode frames on the rayon pool. Drawing stays sequential either way.
    pub parallel_decode: bool,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            parallel_decode: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpriteSheet {
    pub image: RgbaImage,
    pub layout: GridLayout,
    pub frame_width: u32,
    pub frame_height: u32,
    pub frame_count: u32,
}

impl SpriteSheet {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn encode_png(&self) -> Result<Vec<u8>, PackError> {
        let mut buffer = Cursor::new(Vec::new());
        self.image
            .write_to(&mut buffer, ImageFormat::Png)
            .map_err(PackError::EncodeSheet)?;
        Ok(buffer.into_inner())
    }
}

pub fn composite(frames: &FrameSource, layout: GridLayout) -> Result<SpriteSheet, PackError> {
    composite_with(frames, layout, ComposeOptions::default())
}

pub fn composite_with(
    frames: &FrameSource,
    layout: GridLayout,
    options: ComposeOptions,
) -> Result<SpriteSheet, PackError> {
    if frames.is_empty() {
        return Err(PackError::NoFrames);
    }
    let frame_count = layout.fit(frames.len())?;

    let decoded = decode_frames(frames.frames(), options.parallel_decode)?;
    let (frame_width, frame_height) = check_dimensions(&decoded)?;
    let (sheet_width, sheet_height) = layout.sheet_size(frame_width, frame_height)?;

    let mut canvas = RgbaImage::new(sheet_width, sheet_height);
    for (index, frame) in decoded.iter().enumerate() {
        let (x, y) = layout.cell_origin(index as u32, frame_width, frame_height);
        imageops::replace(&mut canvas, frame, i64::from(x), i64::from(y));
    }

    debug!(
        frames = frame_count,
        cols = layout.cols,
        rows = layout.rows,
        width = sheet_width,
        height = sheet_height,
        "composited sprite sheet"
    );

    Ok(SpriteSheet {
        image: canvas,
        layout,
        frame_width,
        frame_height,
        frame_count,
    })
}

fn decode_frames(frames: &[SourceFrame], parallel: bool) -> Result<Vec<RgbaImage>, PackError> {
    if parallel {
        frames
            .par_iter()
            .enumerate()
            .map(|(index, frame)| decode_frame(index, frame))
            .collect()
    } else {
        frames
            .iter()
            .enumerate()
            .map(|(index, frame)| decode_frame(index, frame))
            .collect()
    }
}

fn decode_frame(index: usize, frame: &SourceFrame) -> Result<RgbaImage, PackError> {
    let image = image::load_from_memory(&frame.bytes).map_err(|source| PackError::DecodeFrame {
        index,
        filename: frame.filename.clone(),
        source,
    })?;
    let color = image.color();
    // The canvas is RGBA8; deeper channels lose their low bits here.
    if color.bytes_per_pixel() > color.channel_count() {
        debug!(
            index,
            filename = %frame.filename,
            color = ?color,
            "quantizing frame to 8 bits per channel"
        );
    }
    Ok(image.into_rgba8())
}

fn check_dimensions(decoded: &[RgbaImage]) -> Result<(u32, u32), PackError> {
    let first = decoded.first().ok_or(PackError::NoFrames)?;
    let (expected_width, expected_height) = first.dimensions();
    if expected_width == 0 || expected_height == 0 {
        return Err(PackError::InvalidComposition(format!(
            "frame 0 has zero extent ({expected_width}x{expected_height})"
        )));
    }
    for (index, frame) in decoded.iter().enumerate().skip(1) {
        let (width, height) = frame.dimensions();
        if (width, height) != (expected_width, expected_height) {
            return Err(PackError::DimensionMismatch {
                index,
                expected_width,
                expected_height,
                width,
                height,
            });
        }
    }
    Ok((expected_width, expected_height))
}
