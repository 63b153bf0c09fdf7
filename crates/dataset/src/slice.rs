//! Extraction of one 2-D spatial slice from a flattened `(time, lat, lon)` array.

use crate::time_axis::TimeIndex;
use slice_common::SliceError;

/// Row-major view of one spatial grid: row `y` is latitude `y`, column `x`
/// is longitude `x`.
///
/// The view borrows the variable's storage; it is never written through.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slice2D<'a> {
    data: &'a [f32],
    height: usize,
    width: usize,
}

impl<'a> Slice2D<'a> {
    /// Wrap an already cut-out grid of exactly `height * width` values.
    pub fn from_grid(data: &'a [f32], height: usize, width: usize) -> Result<Self, SliceError> {
        let expected = height * width;
        if data.len() != expected {
            return Err(SliceError::dimension_mismatch(
                format!("grid of {}x{}", height, width),
                expected,
                data.len(),
            ));
        }
        Ok(Self {
            data,
            height,
            width,
        })
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_empty(&self) -> bool {
        self.height == 0 || self.width == 0
    }

    /// Contiguous values of row `y`.
    pub fn row(&self, y: usize) -> Option<&'a [f32]> {
        if y >= self.height {
            return None;
        }
        let start = y * self.width;
        Some(&self.data[start..start + self.width])
    }

    pub fn get(&self, y: usize, x: usize) -> Option<f32> {
        if x >= self.width {
            return None;
        }
        self.row(y).map(|row| row[x])
    }

    /// Iterate rows top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &'a [f32]> + 'a {
        // chunks_exact panics on a zero chunk size
        let data: &'a [f32] = if self.width == 0 { &[] } else { self.data };
        data.chunks_exact(self.width.max(1))
    }

    /// All cells in row-major order.
    pub fn values(&self) -> &'a [f32] {
        self.data
    }

    /// Owned copy as one `Vec` per row.
    pub fn to_rows(&self) -> Vec<Vec<f32>> {
        self.rows().map(<[f32]>::to_vec).collect()
    }
}

/// Cut the grid for `time_index` out of a flattened variable.
///
/// For a time-varying variable the cell `(t, y, x)` lives at
/// `t*height*width + y*width + x`. For a static variable `time_index` is
/// ignored and the grid starts at offset 0.
///
/// Fails with `DimensionMismatch` when `values` is too short for the
/// requested step; the array is never silently truncated.
pub fn extract_slice(
    values: &[f32],
    time_index: TimeIndex,
    height: usize,
    width: usize,
    time_varying: bool,
) -> Result<Slice2D<'_>, SliceError> {
    let plane = height
        .checked_mul(width)
        .ok_or_else(|| SliceError::dimension_mismatch("grid size overflows", usize::MAX, 0))?;
    let base = if time_varying {
        time_index
            .get()
            .checked_mul(plane)
            .ok_or_else(|| SliceError::dimension_mismatch("time offset overflows", usize::MAX, 0))?
    } else {
        0
    };
    let end = base + plane;

    if values.len() < end {
        return Err(SliceError::dimension_mismatch(
            format!(
                "time step {} of a {}x{} grid",
                time_index, height, width
            ),
            end,
            values.len(),
        ));
    }

    Slice2D::from_grid(&values[base..end], height, width)
}
