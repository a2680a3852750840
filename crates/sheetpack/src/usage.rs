use std::fmt::Write as _;

use crate::manifest::Manifest;

/// Markdown notes shipped next to a sheet: a summary of the grid and a small
/// JavaScript player that reads the manifest written alongside it.
pub fn render_usage_examples(manifest: &Manifest, sheet_file_name: &str) -> String {
    let sheet = &manifest.sprite_sheet;
    let mut out = String::new();

    let _ = writeln!(out, "# Sprite Sheet Usage Examples");
    let _ = writeln!(out);
    let _ = writeln!(out, "Generated from: {}", manifest.composition.name);
    let _ = writeln!(out);
    let _ = writeln!(out, "## File Information");
    let _ = writeln!(out, "- **Sprite Sheet**: {sheet_file_name}");
    let _ = writeln!(out, "- **Frames**: {} frames", manifest.frames.len());
    let _ = writeln!(
        out,
        "- **Layout**: {} columns x {} rows ({}x{} px, {}x{} per frame)",
        sheet.cols, sheet.rows, sheet.width, sheet.height, sheet.frame_width, sheet.frame_height
    );
    let _ = writeln!(
        out,
        "- **Playback**: {:.3} s per frame, looping",
        manifest.animation.frame_time
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "## JavaScript (ES6+)");
    let _ = writeln!(out);
    out.push_str(JS_PLAYER);
    out
}

const JS_PLAYER: &str = r#"```javascript
class SpriteAnimation {
  constructor(imagePath, metadata) {
    this.image = new Image();
    this.image.src = imagePath;
    this.metadata = metadata;
    this.currentFrame = 0;
    this.frameTime = metadata.animation.frameTime * 1000;
    this.lastFrameTime = 0;
  }

  update(currentTime) {
    if (currentTime - this.lastFrameTime >= this.frameTime) {
      this.currentFrame = (this.currentFrame + 1) % this.metadata.frames.length;
      this.lastFrameTime = currentTime;
    }
  }

  draw(ctx, x, y) {
    const frame = this.metadata.frames[this.currentFrame];
    ctx.drawImage(
      this.image,
      frame.x, frame.y, frame.width, frame.height,
      x, y, frame.width, frame.height
    );
  }
}
```
"#;
