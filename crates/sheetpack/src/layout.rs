//! Grid planning for sprite sheets. The rule is intentionally a single one:
//! `cols = ceil(sqrt(n))`, `rows = ceil(n / cols)`, so the same frame count
//! always yields the same grid.
use serde::{Deserialize, Serialize};

use crate::error::PackError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridLayout {
    pub cols: u32,
    pub rows: u32,
}

impl GridLayout {
    pub fn capacity(&self) -> u64 {
        u64::from(self.cols) * u64::from(self.rows)
    }

    pub fn empty_cells(&self, frame_count: u32) -> u64 {
        self.capacity().saturating_sub(u64::from(frame_count))
    }

    pub fn efficiency(&self, frame_count: u32) -> f64 {
        f64::from(frame_count) / self.capacity() as f64
    }

    /// Narrows `frame_count` to `u32`, failing when the grid has too few cells.
    pub fn fit(&self, frame_count: usize) -> Result<u32, PackError> {
        let count = u32::try_from(frame_count)
            .map_err(|_| PackError::InvalidComposition(format!("{frame_count} frames")))?;
        if self.capacity() < u64::from(count) {
            return Err(PackError::InvalidComposition(format!(
                "layout {}x{} cannot hold {} frames",
                self.cols, self.rows, count
            )));
        }
        Ok(count)
    }

    /// Column and row of the cell holding frame `index`.
    pub fn cell(&self, index: u32) -> (u32, u32) {
        (index % self.cols, index / self.cols)
    }

    /// Top-left pixel of frame `index` for frames of `frame_width`x`frame_height`.
    pub fn cell_origin(&self, index: u32, frame_width: u32, frame_height: u32) -> (u32, u32) {
        let (col, row) = self.cell(index);
        (col * frame_width, row * frame_height)
    }

    pub fn sheet_size(&self, frame_width: u32, frame_height: u32) -> Result<(u32, u32), PackError> {
        let width = self.cols.checked_mul(frame_width);
        let height = self.rows.checked_mul(frame_height);
        match (width, height) {
            (Some(width), Some(height)) => Ok((width, height)),
            _ => Err(PackError::SheetTooLarge {
                width: u64::from(self.cols) * u64::from(frame_width),
                height: u64::from(self.rows) * u64::from(frame_height),
            }),
        }
    }
}

pub fn plan_layout(frame_count: u32) -> Result<GridLayout, PackError> {
    if frame_count == 0 {
        return Err(PackError::NoFrames);
    }
    let cols = ceil_sqrt(frame_count);
    let rows = frame_count.div_ceil(cols);
    Ok(GridLayout { cols, rows })
}

fn ceil_sqrt(value: u32) -> u32 {
    let target = u64::from(value);
    let mut root = (value as f64).sqrt() as u64;
    while root * root < target {
        root += 1;
    }
    while root > 1 && (root - 1) * (root - 1) >= target {
        root -= 1;
    }
    root as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plans_reference_counts() {
        let cases = [(1, 1, 1), (4, 2, 2), (5, 3, 2), (8, 3, 3), (10, 4, 3)];
        for (count, cols, rows) in cases {
            assert_eq!(
                plan_layout(count).unwrap(),
                GridLayout { cols, rows },
                "frame count {count}"
            );
        }
    }

    #[test]
    fn rejects_zero_frames() {
        let err = plan_layout(0).unwrap_err();
        assert!(matches!(err, PackError::NoFrames));
        assert_eq!(err.to_string(), "no frames to pack");
    }

    #[test]
    fn layout_always_fits_and_uses_ceiling_square_columns() {
        for count in 1..=2_000u32 {
            let layout = plan_layout(count).unwrap();
            let expected_cols = (count as f64).sqrt().ceil() as u32;
            assert_eq!(layout.cols, expected_cols, "frame count {count}");
            assert!(layout.capacity() >= u64::from(count));
            assert!(layout.rows >= 1);
        }
    }

    #[test]
    fn ceil_sqrt_is_exact_near_u32_max() {
        let layout = plan_layout(u32::MAX).unwrap();
        assert_eq!(layout.cols, 65_536);
        assert!(layout.capacity() >= u64::from(u32::MAX));
        assert_eq!(ceil_sqrt(65_535 * 65_535), 65_535);
        assert_eq!(ceil_sqrt(65_535 * 65_535 + 1), 65_536);
    }

    #[test]
    fn cell_origins_walk_rows_left_to_right() {
        let layout = plan_layout(8).unwrap();
        assert_eq!(layout.cell_origin(0, 64, 64), (0, 0));
        assert_eq!(layout.cell_origin(2, 64, 64), (128, 0));
        assert_eq!(layout.cell_origin(3, 64, 64), (0, 64));
        assert_eq!(layout.cell_origin(7, 64, 64), (64, 128));
        assert_eq!(layout.empty_cells(8), 1);
        assert!((layout.efficiency(8) - 8.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn sheet_size_reports_overflow() {
        let layout = GridLayout { cols: 70_000, rows: 1 };
        assert!(matches!(
            layout.sheet_size(70_000, 1),
            Err(PackError::SheetTooLarge { .. })
        ));
        assert_eq!(plan_layout(8).unwrap().sheet_size(64, 64).unwrap(), (192, 192));
    }

    #[test]
    fn fit_rejects_counts_beyond_capacity() {
        let layout = plan_layout(5).unwrap();
        assert_eq!(layout.fit(6).unwrap(), 6);
        assert!(matches!(layout.fit(7), Err(PackError::InvalidComposition(_))));
        assert!(layout.fit(usize::MAX).is_err());
    }
}
