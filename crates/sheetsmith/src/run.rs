use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use exportconfig::{CompositionFile, ExportConfig, NamingMode};
use sheetpack::{
    discover_input_frames, export_sprite_sheet, output_paths, plan_layout, verify_outputs,
    CompositionInfo, ExportReport, ExportRequest, OutputNaming,
};
use tracing_subscriber::EnvFilter;

use crate::cli::{InspectArgs, RunArgs};
use crate::paths::AppPaths;

const FALLBACK_NAME: &str = "composition";

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn run(args: RunArgs) -> Result<()> {
    let frames_dir = args
        .frames
        .clone()
        .ok_or_else(|| anyhow!("missing FRAMES_DIR; run `sheetsmith --help` for usage"))?;
    let config = load_config(args.config.as_deref())?;
    let composition_file = args
        .composition
        .as_deref()
        .map(|path| {
            CompositionFile::load(path)
                .with_context(|| format!("failed to load composition file {}", path.display()))
        })
        .transpose()?;

    let extensions = if args.extensions.is_empty() {
        config.frames.extensions.clone()
    } else {
        args.extensions.clone()
    };
    let output_dir = args
        .output
        .clone()
        .or_else(|| config.output.directory.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    let naming = map_naming(args.naming.unwrap_or(config.output.naming));
    let target = ExportTarget {
        frames_dir: &frames_dir,
        output_dir: &output_dir,
        naming,
        extensions: &extensions,
    };
    let composition = resolve_composition(&args, composition_file.as_ref(), &target)?;

    let mut request = ExportRequest::new(&frames_dir, &output_dir, composition);
    request.naming = naming;
    request.frame_extensions = extensions;
    request.write_usage_examples = config.output.usage_examples && !args.no_usage_examples;
    request.cleanup_frames = config.frames.cleanup || args.cleanup_frames;
    request.compose.parallel_decode = config.frames.parallel_decode && !args.sequential_decode;

    tracing::debug!(
        frames = %request.frames_dir.display(),
        output = %request.output_dir.display(),
        naming = ?request.naming,
        cleanup = request.cleanup_frames,
        parallel_decode = request.compose.parallel_decode,
        "resolved export request"
    );

    let report = export_sprite_sheet(&request).context("sprite sheet export failed")?;
    print_report(&report);

    let verification = verify_outputs(
        &report.paths.sheet,
        &report.paths.manifest,
        Some(report.frame_count as usize),
    );
    verification.log();
    if !verification.is_ok() {
        bail!(
            "export verification failed: {}",
            verification.errors.join("; ")
        );
    }
    Ok(())
}

pub fn run_plan(count: u32) -> Result<()> {
    let layout = plan_layout(count)?;
    println!(
        "grid: {} columns x {} rows ({} cells, {} empty)",
        layout.cols,
        layout.rows,
        layout.capacity(),
        layout.empty_cells(count)
    );
    println!("efficiency: {:.1}%", layout.efficiency(count) * 100.0);
    Ok(())
}

pub fn run_inspect(args: InspectArgs) -> Result<()> {
    let naming = map_naming(args.naming);
    let name = match (naming, args.name.as_deref()) {
        (OutputNaming::Composition, None) => {
            bail!("--name is required to inspect an export written with composition naming")
        }
        (_, name) => name.unwrap_or(FALLBACK_NAME),
    };
    let paths = output_paths(&args.dir, naming, name);
    let report = verify_outputs(&paths.sheet, &paths.manifest, args.frames);

    println!("Sprite sheet: {}", paths.sheet.display());
    println!("Metadata:     {}", paths.manifest.display());
    for warning in &report.warnings {
        println!("  warning: {warning}");
    }
    for error in &report.errors {
        println!("  error:   {error}");
    }
    if !report.is_ok() {
        bail!("{} problem(s) found in export", report.errors.len());
    }
    println!("Export is consistent.");
    Ok(())
}

pub fn run_config_where() -> Result<()> {
    let paths = AppPaths::discover()?;
    let file = paths.config_file();
    println!("Configuration directory: {}", paths.config_dir().display());
    println!(
        "Configuration file:      {} ({})",
        file.display(),
        if file.exists() { "present" } else { "not created" }
    );
    Ok(())
}

fn load_config(explicit: Option<&Path>) -> Result<ExportConfig> {
    if let Some(path) = explicit {
        return ExportConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()));
    }
    let path = AppPaths::discover()?.config_file();
    let config = ExportConfig::load_or_default(&path)
        .with_context(|| format!("failed to load config {}", path.display()))?;
    tracing::debug!(path = %path.display(), exists = path.exists(), "resolved export config");
    Ok(config)
}

struct ExportTarget<'a> {
    frames_dir: &'a Path,
    output_dir: &'a Path,
    naming: OutputNaming,
    extensions: &'a [String],
}

fn resolve_composition(
    args: &RunArgs,
    file: Option<&CompositionFile>,
    target: &ExportTarget<'_>,
) -> Result<CompositionInfo> {
    let frame_rate = args
        .fps
        .or(file.map(|file| file.frame_rate))
        .ok_or_else(|| anyhow!("frame rate is required (--fps or a composition file)"))?;
    let duration = args
        .duration
        .or(file.map(|file| file.duration))
        .ok_or_else(|| anyhow!("duration is required (--duration or a composition file)"))?;
    let name = args
        .name
        .clone()
        .or_else(|| file.map(|file| file.name.clone()))
        .or_else(|| {
            target
                .frames_dir
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| FALLBACK_NAME.to_string());

    let declared = args.size.or_else(|| match file {
        Some(CompositionFile {
            width: Some(width),
            height: Some(height),
            ..
        }) => Some((*width, *height)),
        _ => None,
    });
    let (width, height) = match declared {
        Some(size) => size,
        None => probe_frame_size(target, &name)?,
    };

    let composition =
        CompositionInfo::new(name, width, height, frame_rate, duration.as_secs_f64());
    composition.validate()?;
    Ok(composition)
}

fn probe_frame_size(target: &ExportTarget<'_>, name: &str) -> Result<(u32, u32)> {
    let outputs = output_paths(target.output_dir, target.naming, name);
    let frames = discover_input_frames(target.frames_dir, target.extensions, &outputs)?;
    let first = frames
        .first()
        .ok_or_else(|| anyhow!("no frames found in {}", target.frames_dir.display()))?;
    let size = image::image_dimensions(first)
        .with_context(|| format!("failed to read frame size from {}", first.display()))?;
    tracing::debug!(
        frame = %first.display(),
        width = size.0,
        height = size.1,
        "composition size taken from first frame"
    );
    Ok(size)
}

fn map_naming(mode: NamingMode) -> OutputNaming {
    match mode {
        NamingMode::Canonical => OutputNaming::Canonical,
        NamingMode::Composition => OutputNaming::Composition,
    }
}

fn print_report(report: &ExportReport) {
    println!("Sprite sheet: {}", report.paths.sheet.display());
    println!("Metadata:     {}", report.paths.manifest.display());
    if report.usage_examples_written {
        println!("Usage notes:  {}", report.paths.usage_examples.display());
    }
    println!(
        "Frames:       {} ({}x{} each)",
        report.frame_count, report.frame_width, report.frame_height
    );
    println!(
        "Layout:       {} columns x {} rows -> {}x{} px, {} KB",
        report.layout.cols,
        report.layout.rows,
        report.sheet_width,
        report.sheet_height,
        report.sheet_bytes.div_ceil(1024)
    );
}
