use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use exportconfig::{parse_duration, NamingMode};

#[derive(Parser, Debug)]
#[command(
    name = "sheetsmith",
    author,
    version,
    about = "Pack rendered animation frames into a sprite sheet and JSON manifest",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Directory holding the rendered frame images.
    #[arg(value_name = "FRAMES_DIR")]
    pub frames: Option<PathBuf>,

    /// Destination directory for the sprite sheet and metadata.
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// TOML file describing the composition (name, size, frame rate, duration).
    #[arg(long, value_name = "FILE")]
    pub composition: Option<PathBuf>,

    /// Composition name; overrides the composition file.
    #[arg(long)]
    pub name: Option<String>,

    /// Composition size (e.g. `1920x1080`); defaults to the first frame's size.
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_dimensions)]
    pub size: Option<(u32, u32)>,

    /// Composition frame rate in frames per second.
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f64>,

    /// Composition duration in seconds or as a human-readable span (`2s 500ms`).
    #[arg(long, value_name = "SECONDS", value_parser = parse_duration)]
    pub duration: Option<Duration>,

    /// Export configuration file; defaults to the user config directory.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output file naming: `canonical` (spritesheet.png) or `composition` (<name>_spritesheet.png).
    #[arg(long, value_name = "MODE", value_parser = NamingMode::parse)]
    pub naming: Option<NamingMode>,

    /// Frame file extension to accept; repeat for several. Overrides the config.
    #[arg(long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,

    /// Skip writing the usage examples Markdown file.
    #[arg(long)]
    pub no_usage_examples: bool,

    /// Delete the consumed frame files once the export finishes or fails.
    #[arg(long)]
    pub cleanup_frames: bool,

    /// Decode frames one at a time instead of on the thread pool.
    #[arg(long)]
    pub sequential_decode: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the grid that would be used for a number of frames.
    Plan {
        #[arg(value_name = "COUNT")]
        count: u32,
    },
    /// Check a previous export's sprite sheet and metadata files.
    Inspect(InspectArgs),
    /// Inspect configuration locations.
    Config(ConfigCommand),
}

#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Directory containing the export.
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,

    /// Naming scheme the export was written with.
    #[arg(long, value_name = "MODE", value_parser = NamingMode::parse, default_value = "canonical")]
    pub naming: NamingMode,

    /// Composition name, required for `--naming composition`.
    #[arg(long)]
    pub name: Option<String>,

    /// Number of frames the manifest should list.
    #[arg(long, value_name = "COUNT")]
    pub frames: Option<usize>,
}

#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the resolved configuration directory and file.
    Where,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_dimensions(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WIDTHxHEIGHT".to_string())?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|_| "invalid width in size".to_string())?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|_| "invalid height in size".to_string())?;
    if width == 0 || height == 0 {
        return Err("size must be greater than zero".into());
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_dimensions() {
        assert_eq!(parse_dimensions("1920x1080").unwrap(), (1920, 1080));
        assert_eq!(parse_dimensions(" 64 X 32 ").unwrap(), (64, 32));
        assert!(parse_dimensions("64").is_err());
        assert!(parse_dimensions("0x10").is_err());
        assert!(parse_dimensions("ax10").is_err());
    }

    #[test]
    fn parses_export_flags() {
        let cli = Cli::try_parse_from([
            "sheetsmith",
            "renders",
            "-o",
            "out",
            "--fps",
            "24",
            "--duration",
            "2s",
            "--size",
            "64x64",
            "--naming",
            "composition",
            "--ext",
            "png",
            "--ext",
            "PNG",
            "--cleanup-frames",
        ])
        .unwrap();
        assert!(cli.command.is_none());
        let run = cli.run;
        assert_eq!(run.frames, Some(PathBuf::from("renders")));
        assert_eq!(run.output, Some(PathBuf::from("out")));
        assert_eq!(run.fps, Some(24.0));
        assert_eq!(run.duration, Some(Duration::from_secs(2)));
        assert_eq!(run.size, Some((64, 64)));
        assert_eq!(run.naming, Some(NamingMode::Composition));
        assert_eq!(run.extensions, vec!["png", "PNG"]);
        assert!(run.cleanup_frames);
        assert!(!run.sequential_decode);
    }

    #[test]
    fn parses_subcommands() {
        let cli = Cli::try_parse_from(["sheetsmith", "plan", "10"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Plan { count: 10 })));

        let cli = Cli::try_parse_from(["sheetsmith", "inspect", "out", "--frames", "8"]).unwrap();
        match cli.command {
            Some(Command::Inspect(args)) => {
                assert_eq!(args.dir, PathBuf::from("out"));
                assert_eq!(args.naming, NamingMode::Canonical);
                assert_eq!(args.frames, Some(8));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
