//! Defines the JSON side-car written next to every sprite sheet, giving
//! animation runtimes each frame's cell in pixels and in normalized units
//! together with sheet-level and playback summaries.
//!
//! Types:
//!
//! - `CompositionInfo` is the read-only description of the source animation
//!   supplied by whoever rendered the frames.
//! - `Manifest` is the top-level document; field order is the JSON key order.
//! - `SheetSummary`, `FrameRecord`, `AnimationInfo`, and `ExportInfo` are its
//!   sections, serialized with camelCase keys.
//! - `ExportStamp` carries the wall-clock and tool details that make
//!   `exportInfo` the only non-deterministic section.
//!
//! Functions:
//!
//! - `build_manifest` and `build_manifest_with` derive every record from the
//!   layout and frame size so coordinates always agree with the composited sheet.
//! - `Manifest::validate` returns human-readable issues instead of panicking,
//!   so verification can report every inconsistency at once.
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PackError;
use crate::layout::GridLayout;

pub const EXPORT_METHOD: &str = "composite";
pub const OUTPUT_FORMAT: &str = "PNG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionInfo {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
    pub duration: f64,
    pub frame_count: u32,
}

impl CompositionInfo {
    pub fn new(
        name: impl Into<String>,
        width: u32,
        height: u32,
        frame_rate: f64,
        duration: f64,
    ) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            frame_rate,
            duration,
            frame_count: derive_frame_count(frame_rate, duration),
        }
    }

    pub fn validate(&self) -> Result<(), PackError> {
        if !self.frame_rate.is_finite() || self.frame_rate <= 0.0 {
            return Err(PackError::InvalidComposition(format!(
                "frame rate must be a positive number, got {}",
                self.frame_rate
            )));
        }
        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(PackError::InvalidComposition(format!(
                "duration must be a non-negative number of seconds, got {}",
                self.duration
            )));
        }
        if self.width == 0 || self.height == 0 {
            return Err(PackError::InvalidComposition(format!(
                "composition '{}' has zero extent ({}x{})",
                self.name, self.width, self.height
            )));
        }
        if self.frame_count == 0 {
            return Err(PackError::InvalidComposition(format!(
                "composition '{}' declares zero frames",
                self.name
            )));
        }
        Ok(())
    }
}

/// `floor(duration * frame_rate)`, never below one frame.
pub fn derive_frame_count(frame_rate: f64, duration: f64) -> u32 {
    let frames = (duration * frame_rate).floor();
    if frames.is_nan() || frames < 1.0 {
        1
    } else if frames >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        frames as u32
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub composition: CompositionInfo,
    pub sprite_sheet: SheetSummary,
    pub frames: Vec<FrameRecord>,
    pub animation: AnimationInfo,
    pub export_info: ExportInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetSummary {
    pub width: u32,
    pub height: u32,
    pub cols: u32,
    pub rows: u32,
    pub frame_width: u32,
    pub frame_height: u32,
    pub aspect_ratio: f64,
    pub efficiency: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameRecord {
    pub index: u32,
    pub filename: String,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub normalized_x: f64,
    pub normalized_y: f64,
    pub normalized_width: f64,
    pub normalized_height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationInfo {
    pub frame_time: f64,
    pub total_duration: f64,
    #[serde(rename = "loop")]
    pub looping: bool,
    pub sequence: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportInfo {
    pub timestamp: String,
    pub total_frames: u32,
    pub successful_frames: u32,
    pub exporter: String,
    pub method: String,
    pub output_format: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportStamp {
    pub timestamp: String,
    pub exporter: String,
    pub method: String,
    pub output_format: String,
}

impl ExportStamp {
    pub fn now() -> Self {
        Self::at(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn at(timestamp: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            exporter: format!("sheetpack {}", env!("CARGO_PKG_VERSION")),
            method: EXPORT_METHOD.to_string(),
            output_format: OUTPUT_FORMAT.to_string(),
        }
    }
}

pub fn build_manifest(
    composition: &CompositionInfo,
    layout: GridLayout,
    frame_width: u32,
    frame_height: u32,
    filenames: &[String],
) -> Result<Manifest, PackError> {
    build_manifest_with(
        composition,
        layout,
        frame_width,
        frame_height,
        filenames,
        &ExportStamp::now(),
    )
}

pub fn build_manifest_with(
    composition: &CompositionInfo,
    layout: GridLayout,
    frame_width: u32,
    frame_height: u32,
    filenames: &[String],
    stamp: &ExportStamp,
) -> Result<Manifest, PackError> {
    let frame_total = layout.fit(filenames.len())?;
    let (sheet_width, sheet_height) = layout.sheet_size(frame_width, frame_height)?;

    let frames: Vec<FrameRecord> = (0..frame_total)
        .zip(filenames)
        .map(|(index, filename)| {
            let (x, y) = layout.cell_origin(index, frame_width, frame_height);
            FrameRecord {
                index,
                filename: filename.clone(),
                x,
                y,
                width: frame_width,
                height: frame_height,
                normalized_x: ratio(x, sheet_width),
                normalized_y: ratio(y, sheet_height),
                normalized_width: ratio(frame_width, sheet_width),
                normalized_height: ratio(frame_height, sheet_height),
            }
        })
        .collect();
    let sequence = frames.iter().map(|frame| frame.index).collect();

    Ok(Manifest {
        composition: composition.clone(),
        sprite_sheet: SheetSummary {
            width: sheet_width,
            height: sheet_height,
            cols: layout.cols,
            rows: layout.rows,
            frame_width,
            frame_height,
            aspect_ratio: ratio(sheet_width, sheet_height),
            efficiency: layout.efficiency(frame_total),
        },
        frames,
        animation: AnimationInfo {
            frame_time: 1.0 / composition.frame_rate,
            total_duration: composition.duration,
            looping: true,
            sequence,
        },
        export_info: ExportInfo {
            timestamp: stamp.timestamp.clone(),
            total_frames: frame_total,
            successful_frames: frame_total,
            exporter: stamp.exporter.clone(),
            method: stamp.method.clone(),
            output_format: stamp.output_format.clone(),
        },
    })
}

fn ratio(numerator: u32, denominator: u32) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        f64::from(numerator) / f64::from(denominator)
    }
}

impl Manifest {
    pub fn layout(&self) -> GridLayout {
        GridLayout {
            cols: self.sprite_sheet.cols,
            rows: self.sprite_sheet.rows,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, PackError> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    pub fn from_json(raw: &str) -> Result<Self, PackError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let sheet = &self.sprite_sheet;
        let layout = self.layout();

        if self.frames.is_empty() {
            issues.push("manifest must list at least one frame".to_string());
        }
        if sheet.cols == 0 || sheet.rows == 0 {
            issues.push(format!("grid {}x{} has an empty axis", sheet.cols, sheet.rows));
            return issues;
        }
        if layout.capacity() < self.frames.len() as u64 {
            issues.push(format!(
                "grid {}x{} cannot hold {} frames",
                sheet.cols,
                sheet.rows,
                self.frames.len()
            ));
        }
        if u64::from(sheet.width) != u64::from(sheet.cols) * u64::from(sheet.frame_width)
            || u64::from(sheet.height) != u64::from(sheet.rows) * u64::from(sheet.frame_height)
        {
            issues.push(format!(
                "sheet size {}x{} does not match {}x{} cells of {}x{}",
                sheet.width,
                sheet.height,
                sheet.cols,
                sheet.rows,
                sheet.frame_width,
                sheet.frame_height
            ));
        }
        if !approx_eq(sheet.efficiency, layout.efficiency(self.frames.len() as u32)) {
            issues.push(format!(
                "efficiency {} is inconsistent with the grid",
                sheet.efficiency
            ));
        }
        if !approx_eq(
            sheet.aspect_ratio,
            ratio(sheet.width, sheet.height),
        ) {
            issues.push(format!(
                "aspect ratio {} is inconsistent with the sheet size",
                sheet.aspect_ratio
            ));
        }

        for (position, frame) in self.frames.iter().enumerate() {
            if frame.index as usize != position {
                issues.push(format!(
                    "frame '{}' at position {} has index {}",
                    frame.filename, position, frame.index
                ));
            }
            let (x, y) = layout.cell_origin(position as u32, sheet.frame_width, sheet.frame_height);
            if (frame.x, frame.y) != (x, y)
                || (frame.width, frame.height) != (sheet.frame_width, sheet.frame_height)
            {
                issues.push(format!(
                    "frame {} occupies {}x{}+{}+{} but its cell is {}x{}+{}+{}",
                    position,
                    frame.width,
                    frame.height,
                    frame.x,
                    frame.y,
                    sheet.frame_width,
                    sheet.frame_height,
                    x,
                    y
                ));
            }
            let normalized = [
                frame.normalized_x,
                frame.normalized_y,
                frame.normalized_width,
                frame.normalized_height,
            ];
            if normalized.iter().any(|value| !(0.0..=1.0).contains(value)) {
                issues.push(format!("frame {position} has normalized coordinates outside [0, 1]"));
            }
        }

        let identity = (0..self.frames.len() as u32).collect::<Vec<_>>();
        if self.animation.sequence != identity {
            issues.push("animation sequence must list frames 0..N-1 in order".to_string());
        }
        if self.export_info.total_frames as usize != self.frames.len() {
            issues.push(format!(
                "exportInfo.totalFrames is {} but {} frames are listed",
                self.export_info.total_frames,
                self.frames.len()
            ));
        }
        issues
    }
}

fn approx_eq(left: f64, right: f64) -> bool {
    (left - right).abs() <= 1e-9
}
