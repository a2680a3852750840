//! Runs one export end to end: frames on disk in, sprite sheet, manifest and
//! usage notes out. Nothing is written under the final output names unless
//! every frame decoded and matched the canonical size.
//!
//! Types:
//!
//! - `OutputNaming` selects fixed file names or names derived from the composition.
//! - `ExportRequest` bundles the frames directory, destination, composition and options.
//! - `ExportReport` summarises what was written.
//!
//! Functions:
//!
//! - `export_sprite_sheet` drives discovery, layout, compositing and writing.
//! - `output_paths` and `clean_composition_name` expose the naming rules so
//!   callers can locate a previous export.
//! - `discover_input_frames` lists the frames of an export, leaving out any
//!   previous output written into the frames directory.
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::compose::{composite_with, ComposeOptions};
use crate::error::PackError;
use crate::frames::{discover_frames, FrameSource, DEFAULT_FRAME_EXTENSIONS};
use crate::layout::{plan_layout, GridLayout};
use crate::manifest::{build_manifest, CompositionInfo, Manifest};
use crate::usage::render_usage_examples;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputNaming {
    #[default]
    Canonical,
    Composition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub sheet: PathBuf,
    pub manifest: PathBuf,
    pub usage_examples: PathBuf,
}

pub fn output_paths(
    output_dir: &Path,
    naming: OutputNaming,
    composition_name: &str,
) -> OutputPaths {
    let prefix = match naming {
        OutputNaming::Canonical => String::new(),
        OutputNaming::Composition => format!("{}_", clean_composition_name(composition_name)),
    };
    OutputPaths {
        sheet: output_dir.join(format!("{prefix}spritesheet.png")),
        manifest: output_dir.join(format!("{prefix}metadata.json")),
        usage_examples: output_dir.join(format!("{prefix}usage_examples.md")),
    }
}

impl OutputPaths {
    fn files(&self) -> [&Path; 3] {
        [&self.sheet, &self.manifest, &self.usage_examples]
    }

    fn is_output(&self, path: &Path) -> bool {
        self.files()
            .iter()
            .any(|output| output.file_name() == path.file_name())
    }
}

pub fn discover_input_frames(
    frames_dir: &Path,
    extensions: &[String],
    outputs: &OutputPaths,
) -> Result<Vec<PathBuf>, PackError> {
    let mut frames = discover_frames(frames_dir, extensions)?;
    let output_dir = outputs.sheet.parent().unwrap_or_else(|| Path::new(""));
    if same_directory(frames_dir, output_dir) {
        frames.retain(|path| {
            let skip = outputs.is_output(path);
            if skip {
                debug!(path = %path.display(), "skipping previous export output");
            }
            !skip
        });
    }
    Ok(frames)
}

fn same_directory(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Replaces every character outside `[A-Za-z0-9_-]` with `_`.
pub fn clean_composition_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub frames_dir: PathBuf,
    pub output_dir: PathBuf,
    pub composition: CompositionInfo,
    pub naming: OutputNaming,
    pub frame_extensions: Vec<String>,
    pub write_usage_examples: bool,
    pub cleanup_frames: bool,
    pub compose: ComposeOptions,
}

impl ExportRequest {
    pub fn new(
        frames_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        composition: CompositionInfo,
    ) -> Self {
        Self {
            frames_dir: frames_dir.into(),
            output_dir: output_dir.into(),
            composition,
            naming: OutputNaming::default(),
            frame_extensions: DEFAULT_FRAME_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            write_usage_examples: true,
            cleanup_frames: false,
            compose: ComposeOptions::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportReport {
    pub paths: OutputPaths,
    pub usage_examples_written: bool,
    pub layout: GridLayout,
    pub frame_count: u32,
    pub frame_width: u32,
    pub frame_height: u32,
    pub sheet_width: u32,
    pub sheet_height: u32,
    pub sheet_bytes: u64,
    pub manifest: Manifest,
}

pub fn export_sprite_sheet(request: &ExportRequest) -> Result<ExportReport, PackError> {
    let paths = output_paths(&request.output_dir, request.naming, &request.composition.name);
    let frame_paths =
        discover_input_frames(&request.frames_dir, &request.frame_extensions, &paths)?;
    // Owns the temp frames from here on so they go away on every exit path.
    let _cleanup = request
        .cleanup_frames
        .then(|| FrameCleanup::new(&request.frames_dir, frame_paths.clone()));
    request.composition.validate()?;

    let frame_count = u32::try_from(frame_paths.len())
        .map_err(|_| PackError::InvalidComposition(format!("{} frames", frame_paths.len())))?;
    let layout = plan_layout(frame_count)?;
    info!(
        frames = frame_count,
        cols = layout.cols,
        rows = layout.rows,
        dir = %request.frames_dir.display(),
        "packing frames into sprite sheet"
    );
    if frame_count != request.composition.frame_count {
        debug!(
            found = frame_count,
            declared = request.composition.frame_count,
            "frame files differ from the composition's declared frame count"
        );
    }

    let source = FrameSource::load(&frame_paths)?;
    let sheet = composite_with(&source, layout, request.compose)?;
    let manifest = build_manifest(
        &request.composition,
        layout,
        sheet.frame_width,
        sheet.frame_height,
        &source.filenames(),
    )?;
    drop(source);

    let png = sheet.encode_png()?;
    let manifest_json = manifest.to_json_pretty()?;

    fs::create_dir_all(&request.output_dir).map_err(|source| PackError::WriteOutput {
        path: request.output_dir.clone(),
        source,
    })?;
    write_atomically(&paths.sheet, &png)?;
    write_atomically(&paths.manifest, manifest_json.as_bytes())?;
    if request.write_usage_examples {
        let sheet_name = paths
            .sheet
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let notes = render_usage_examples(&manifest, &sheet_name);
        write_atomically(&paths.usage_examples, notes.as_bytes())?;
    }

    info!(
        sheet = %paths.sheet.display(),
        manifest = %paths.manifest.display(),
        width = sheet.width(),
        height = sheet.height(),
        bytes = png.len(),
        "wrote sprite sheet export"
    );

    Ok(ExportReport {
        usage_examples_written: request.write_usage_examples,
        layout,
        frame_count,
        frame_width: sheet.frame_width,
        frame_height: sheet.frame_height,
        sheet_width: sheet.width(),
        sheet_height: sheet.height(),
        sheet_bytes: png.len() as u64,
        paths,
        manifest,
    })
}

fn write_atomically(path: &Path, contents: &[u8]) -> Result<(), PackError> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let staging = path.with_file_name(format!(".{file_name}.partial"));
    let result = fs::write(&staging, contents).and_then(|()| fs::rename(&staging, path));
    if let Err(source) = result {
        let _ = fs::remove_file(&staging);
        return Err(PackError::WriteOutput {
            path: path.to_path_buf(),
            source,
        });
    }
    debug!(path = %path.display(), bytes = contents.len(), "wrote output file");
    Ok(())
}

struct FrameCleanup {
    dir: PathBuf,
    files: Vec<PathBuf>,
}

impl FrameCleanup {
    fn new(dir: &Path, files: Vec<PathBuf>) -> Self {
        Self {
            dir: dir.to_path_buf(),
            files,
        }
    }
}

impl Drop for FrameCleanup {
    fn drop(&mut self) {
        let mut removed = 0usize;
        for file in &self.files {
            match fs::remove_file(file) {
                Ok(()) => removed += 1,
                Err(err) => warn!(path = %file.display(), %err, "could not remove temp frame"),
            }
        }
        // Only succeeds when nothing else lives in the frames directory.
        let dir_removed = fs::remove_dir(&self.dir).is_ok();
        debug!(
            removed,
            dir = %self.dir.display(),
            dir_removed,
            "cleaned up temporary frames"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::tests::solid_png;
    use crate::error::ErrorKind;
    use crate::verify::verify_outputs;

    fn write_frames(dir: &Path, sizes: &[(u32, u32)]) {
        fs::create_dir_all(dir).unwrap();
        for (i, (w, h)) in sizes.iter().enumerate() {
            // render_10 sorts before render_2 by name.
            let name = format!("render_{}.png", i + 1);
            fs::write(dir.join(name), solid_png(*w, *h, [i as u8, 0, 0, 255])).unwrap();
        }
    }

    fn list(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn exports_sheet_manifest_and_notes() {
        let temp = tempfile::tempdir().unwrap();
        let frames = temp.path().join("frames");
        let out = temp.path().join("out");
        write_frames(&frames, &[(64, 64); 12]);

        let comp = CompositionInfo::new("Hero Run", 64, 64, 24.0, 0.5);
        let request = ExportRequest::new(&frames, &out, comp);
        let report = export_sprite_sheet(&request).unwrap();

        assert_eq!(report.layout, GridLayout { cols: 4, rows: 3 });
        assert_eq!((report.sheet_width, report.sheet_height), (256, 192));
        assert_eq!(list(&out), vec!["metadata.json", "spritesheet.png", "usage_examples.md"]);

        let names: Vec<_> = report.manifest.frames.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(names[0], "render_1.png");
        assert_eq!(names[9], "render_10.png");
        assert_eq!(names[11], "render_12.png");

        let sheet = image::open(&report.paths.sheet).unwrap().into_rgba8();
        assert_eq!(sheet.get_pixel(64 * 3, 0).0, [3, 0, 0, 255]);
        assert_eq!(sheet.get_pixel(64, 64 * 2).0, [9, 0, 0, 255]);

        let verification = verify_outputs(&report.paths.sheet, &report.paths.manifest, Some(12));
        assert!(verification.is_ok(), "{verification:?}");
        assert!(frames.join("render_1.png").exists());
    }

    #[test]
    fn composition_naming_and_cleanup() {
        let temp = tempfile::tempdir().unwrap();
        let frames = temp.path().join("frames");
        let out = temp.path().join("out");
        write_frames(&frames, &[(10, 10); 3]);

        let comp = CompositionInfo::new("Intro v2 (final)", 10, 10, 30.0, 0.1);
        let mut request = ExportRequest::new(&frames, &out, comp);
        request.naming = OutputNaming::Composition;
        request.write_usage_examples = false;
        request.cleanup_frames = true;
        request.compose.parallel_decode = false;
        let report = export_sprite_sheet(&request).unwrap();

        assert!(!report.usage_examples_written);
        assert_eq!(
            list(&out),
            vec!["Intro_v2__final__metadata.json", "Intro_v2__final__spritesheet.png"]
        );
        assert!(!frames.exists(), "frames directory should be removed");
    }

    #[test]
    fn mismatched_frame_writes_nothing_and_still_cleans_up() {
        let temp = tempfile::tempdir().unwrap();
        let frames = temp.path().join("frames");
        let out = temp.path().join("out");
        write_frames(&frames, &[(16, 16), (16, 16), (8, 16)]);
        fs::write(frames.join("keep.txt"), b"unrelated").unwrap();

        let mut request =
            ExportRequest::new(&frames, &out, CompositionInfo::new("Bad", 16, 16, 10.0, 0.3));
        request.cleanup_frames = true;
        let err = export_sprite_sheet(&request).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DimensionMismatch);
        assert!(!out.exists());
        assert_eq!(list(&frames), vec!["keep.txt"]);
    }

    #[test]
    fn empty_frames_directory_is_an_input_error() {
        let temp = tempfile::tempdir().unwrap();
        let frames = temp.path().join("frames");
        let out = temp.path().join("out");
        fs::create_dir_all(&frames).unwrap();

        let comp = CompositionInfo::new("Empty", 8, 8, 24.0, 1.0);
        let request = ExportRequest::new(&frames, &out, comp);
        let err = export_sprite_sheet(&request).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
        assert!(!out.exists());
    }

    #[test]
    fn invalid_composition_still_cleans_up_frames() {
        let temp = tempfile::tempdir().unwrap();
        let frames = temp.path().join("frames");
        write_frames(&frames, &[(4, 4)]);
        let mut request = ExportRequest::new(
            &frames,
            temp.path().join("out"),
            CompositionInfo::new("Zero", 4, 4, 0.0, 1.0),
        );
        request.cleanup_frames = true;
        assert!(matches!(
            export_sprite_sheet(&request),
            Err(PackError::InvalidComposition(_))
        ));
        assert!(!frames.exists(), "frames directory should be removed");
    }

    #[test]
    fn re_export_into_frames_directory_ignores_previous_outputs() {
        let temp = tempfile::tempdir().unwrap();
        let frames = temp.path().join("frames");
        write_frames(&frames, &[(8, 8); 4]);

        let comp = CompositionInfo::new("Loop", 8, 8, 8.0, 0.5);
        let first =
            export_sprite_sheet(&ExportRequest::new(&frames, &frames, comp.clone())).unwrap();
        assert_eq!((first.sheet_width, first.sheet_height), (16, 16));

        let mut request = ExportRequest::new(&frames, &frames, comp);
        request.cleanup_frames = true;
        let second = export_sprite_sheet(&request).unwrap();
        assert_eq!(second.frame_count, 4);
        assert_eq!(second.manifest.frames[0].filename, "render_1.png");
        assert_eq!(list(&frames), vec!["metadata.json", "spritesheet.png", "usage_examples.md"]);
    }

    #[test]
    fn output_names_are_only_skipped_in_the_output_directory() {
        let temp = tempfile::tempdir().unwrap();
        let frames = temp.path().join("frames");
        write_frames(&frames, &[(4, 4)]);
        fs::write(frames.join("spritesheet.png"), solid_png(4, 4, [0, 0, 0, 255])).unwrap();
        let exts = vec!["png".to_string()];

        let elsewhere = output_paths(&temp.path().join("out"), OutputNaming::Canonical, "x");
        assert_eq!(discover_input_frames(&frames, &exts, &elsewhere).unwrap().len(), 2);

        let same = output_paths(&frames, OutputNaming::Canonical, "x");
        let kept = discover_input_frames(&frames, &exts, &same).unwrap();
        assert_eq!(kept, vec![frames.join("render_1.png")]);
    }

    #[test]
    fn cleans_composition_names() {
        assert_eq!(clean_composition_name("Comp 1/ä-b_c"), "Comp_1__-b_c");
        let paths = output_paths(Path::new("/out"), OutputNaming::Canonical, "ignored");
        assert_eq!(paths.sheet, PathBuf::from("/out/spritesheet.png"));
        assert_eq!(paths.manifest, PathBuf::from("/out/metadata.json"));
    }
}
