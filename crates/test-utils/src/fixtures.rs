//! Common test fixtures for slice pipeline tests.

use std::path::{Path, PathBuf};

/// Partition year ranges of the 1950-2025 record as `(start, end)`.
pub mod partitions {
    pub const PART1: (i32, i32) = (1950, 1968);
    pub const PART2: (i32, i32) = (1969, 1987);
    pub const PART3: (i32, i32) = (1988, 2006);
    pub const PART4: (i32, i32) = (2007, 2025);

    pub const ALL: [(i32, i32); 4] = [PART1, PART2, PART3, PART4];

    /// A year no partition covers.
    pub const UNCOVERED_YEAR: i32 = 2026;
}

/// Builds the JSON container of one partition.
///
/// `values` holds the flattened `(time, lat, lon)` cube of `variable`;
/// NaN cells are written as `null`.
pub fn partition_json(
    latitudes: &[f64],
    longitudes: &[f64],
    times: &[f64],
    variable: &str,
    values: &[f32],
) -> String {
    let cells: Vec<serde_json::Value> = values
        .iter()
        .map(|v| {
            if v.is_nan() {
                serde_json::Value::Null
            } else {
                serde_json::json!(v)
            }
        })
        .collect();

    serde_json::json!({
        "coordinates": {
            "latitude": latitudes,
            "longitude": longitudes,
            "valid_time": times,
        },
        "variables": {
            variable: {
                "shape": [times.len(), latitudes.len(), longitudes.len()],
                "values": cells,
            }
        }
    })
    .to_string()
}

/// Writes a partition container to `dir/name` and returns its path.
pub fn write_partition(dir: &Path, name: &str, json: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, json).expect("Failed to write partition fixture");
    path
}
