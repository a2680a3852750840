//! Sprite sheet packing: orders rendered frames, plans a near-square grid,
//! composites the frames into one RGBA sheet and describes every cell in a
//! JSON manifest.
mod compose;
mod error;
mod export;
mod frames;
mod layout;
mod manifest;
mod usage;
mod verify;

pub use compose::{composite, composite_with, ComposeOptions, SpriteSheet};
pub use error::{ErrorKind, PackError};
pub use export::{
    clean_composition_name, discover_input_frames, export_sprite_sheet, output_paths,
    ExportReport, ExportRequest, OutputNaming, OutputPaths,
};
pub use frames::{
    discover_frames, frame_sort_key, sort_frame_paths, FrameSource, SourceFrame,
    DEFAULT_FRAME_EXTENSIONS,
};
pub use layout::{plan_layout, GridLayout};
pub use manifest::{
    build_manifest, build_manifest_with, derive_frame_count, AnimationInfo, CompositionInfo,
    ExportInfo, ExportStamp, FrameRecord, Manifest, SheetSummary, EXPORT_METHOD, OUTPUT_FORMAT,
};
pub use usage::render_usage_examples;
pub use verify::{verify_outputs, VerificationReport};
