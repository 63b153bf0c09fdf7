//! Test data generators for synthetic monthly raster partitions.
//!
//! These generators create predictable, verifiable patterns so tests can
//! check exactly which cell ended up where.

use chrono::{TimeZone, Utc};

/// Creates a flattened `(time, lat, lon)` cube with predictable values.
///
/// Each cell value is calculated as: `t * 1000 + y * 10 + x`
///
/// # Arguments
///
/// * `times` - Number of time steps
/// * `height` - Number of rows (latitudes)
/// * `width` - Number of columns (longitudes)
///
/// # Example
///
/// ```
/// use test_utils::create_indexed_cube;
///
/// let cube = create_indexed_cube(2, 3, 4);
/// assert_eq!(cube.len(), 24);
/// assert_eq!(cube[0], 0.0);          // t=0, y=0, x=0
/// assert_eq!(cube[5], 11.0);         // t=0, y=1, x=1
/// assert_eq!(cube[12], 1000.0);      // t=1, y=0, x=0
/// ```
pub fn create_indexed_cube(times: usize, height: usize, width: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(times * height * width);
    for t in 0..times {
        for y in 0..height {
            for x in 0..width {
                data.push((t * 1000 + y * 10 + x) as f32);
            }
        }
    }
    data
}

/// Creates a cube whose values sweep 0.0..=1.0 across each grid, like a
/// suitability index. All time steps share the same pattern plus `t * step`.
pub fn create_suitability_cube(times: usize, height: usize, width: usize, step: f32) -> Vec<f32> {
    let cells = (height * width).max(1);
    let denom = (cells - 1).max(1) as f32;
    let mut data = Vec::with_capacity(times * height * width);
    for t in 0..times {
        for i in 0..height * width {
            data.push((i as f32 / denom + t as f32 * step).min(1.0));
        }
    }
    data
}

/// Creates a grid with NaN values at specified positions.
///
/// # Arguments
///
/// * `width` - Number of columns
/// * `height` - Number of rows
/// * `nan_positions` - List of (col, row) positions that should be NaN
///
/// # Returns
///
/// A `Vec<f32>` with NaN at specified positions, 0.5 elsewhere.
pub fn create_grid_with_nans(
    width: usize,
    height: usize,
    nan_positions: &[(usize, usize)],
) -> Vec<f32> {
    let mut data = vec![0.5f32; width * height];
    for &(col, row) in nan_positions {
        if col < width && row < height {
            data[row * width + col] = f32::NAN;
        }
    }
    data
}

/// Creates a monthly time axis as milliseconds since the Unix epoch.
///
/// Markers fall on the first day of each month at 00:00 UTC, starting at
/// `start_year`-`start_month`.
///
/// # Example
///
/// ```
/// use test_utils::monthly_axis;
///
/// let axis = monthly_axis(1968, 12, 2);
/// assert_eq!(axis.len(), 2); // 1968-12 and 1969-01
/// ```
pub fn monthly_axis(start_year: i32, start_month: u32, count: usize) -> Vec<f64> {
    let mut axis = Vec::with_capacity(count);
    let mut year = start_year;
    let mut month = start_month;
    for _ in 0..count {
        let dt = Utc
            .with_ymd_and_hms(year, month, 1, 0, 0, 0)
            .single()
            .expect("valid calendar month");
        axis.push(dt.timestamp_millis() as f64);
        month += 1;
        if month > 12 {
            month = 1;
            year += 1;
        }
    }
    axis
}

/// Evenly spaced coordinate axis from `start` with `step` between values.
///
/// A negative `step` produces a descending axis.
pub fn linear_axis(start: f64, step: f64, count: usize) -> Vec<f64> {
    (0..count).map(|i| start + step * i as f64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Datelike};

    #[test]
    fn test_indexed_cube_layout() {
        let cube = create_indexed_cube(3, 4, 5);
        assert_eq!(cube.len(), 60);
        // t=2, y=3, x=4
        assert_eq!(cube[2 * 20 + 3 * 5 + 4], 2034.0);
    }

    #[test]
    fn test_suitability_cube_range() {
        let cube = create_suitability_cube(2, 3, 3, 0.1);
        assert_eq!(cube[0], 0.0);
        assert_eq!(cube[8], 1.0);
        assert!(cube.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_monthly_axis_rolls_over_year() {
        let axis = monthly_axis(1968, 11, 4);
        let months: Vec<(i32, u32)> = axis
            .iter()
            .map(|&ms| {
                let dt = DateTime::from_timestamp_millis(ms as i64).unwrap();
                (dt.year(), dt.month())
            })
            .collect();
        assert_eq!(months, vec![(1968, 11), (1968, 12), (1969, 1), (1969, 2)]);
    }

    #[test]
    fn test_linear_axis_descending() {
        let axis = linear_axis(6.0, -0.5, 3);
        assert_eq!(axis, vec![6.0, 5.5, 5.0]);
    }

    #[test]
    fn test_grid_with_nans() {
        let grid = create_grid_with_nans(3, 2, &[(1, 1), (5, 5)]);
        assert!(grid[4].is_nan());
        assert_eq!(grid.iter().filter(|v| v.is_nan()).count(), 1);
    }
}
