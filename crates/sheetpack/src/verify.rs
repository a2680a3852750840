//! Post-export checks on the files actually written to disk, mirroring what a
//! downstream loader would see.
use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::manifest::Manifest;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl VerificationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn log(&self) {
        for warning in &self.warnings {
            warn!(%warning, "export verification warning");
        }
        for error in &self.errors {
            warn!(%error, "export verification failed");
        }
    }
}

pub fn verify_outputs(
    sheet_path: &Path,
    manifest_path: &Path,
    expected_frames: Option<usize>,
) -> VerificationReport {
    let mut report = VerificationReport::default();

    let sheet_size = match fs::metadata(sheet_path) {
        Err(_) => {
            report
                .errors
                .push(format!("sprite sheet not found: {}", sheet_path.display()));
            None
        }
        Ok(meta) if meta.len() == 0 => {
            report.errors.push("sprite sheet file is empty".to_string());
            None
        }
        Ok(meta) => match image::image_dimensions(sheet_path) {
            Ok(dimensions) => {
                debug!(bytes = meta.len(), path = %sheet_path.display(), "sprite sheet present");
                Some(dimensions)
            }
            Err(err) => {
                report.errors.push(format!("sprite sheet is not a readable image: {err}"));
                None
            }
        },
    };

    let manifest = match fs::read_to_string(manifest_path) {
        Err(_) => {
            report
                .errors
                .push(format!("metadata file not found: {}", manifest_path.display()));
            return report;
        }
        Ok(raw) => match Manifest::from_json(&raw) {
            Ok(manifest) => manifest,
            Err(err) => {
                report.errors.push(format!("metadata file is not a valid manifest: {err}"));
                return report;
            }
        },
    };

    if let Some(expected) = expected_frames {
        if manifest.frames.len() != expected {
            report.warnings.push(format!(
                "frame count mismatch: expected {expected}, got {}",
                manifest.frames.len()
            ));
        }
    }

    if let Some((width, height)) = sheet_size {
        let declared = (manifest.sprite_sheet.width, manifest.sprite_sheet.height);
        if (width, height) != declared {
            report.errors.push(format!(
                "sprite sheet is {width}x{height} but metadata declares {}x{}",
                declared.0, declared.1
            ));
        }
    }

    report.errors.extend(manifest.validate());
    report
}
