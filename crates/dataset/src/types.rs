//! Decoded dataset partitions.

use std::collections::HashMap;

/// Raw values of one variable, flattened in row-major order.
///
/// Time-varying variables have shape `[T, H, W]`; static variables have
/// shape `[H, W]`.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableArray {
    pub values: Vec<f32>,
    pub shape: Vec<usize>,
    /// Fill value declared by the dataset for missing cells.
    pub fill_value: Option<f32>,
}

impl VariableArray {
    pub fn new(values: Vec<f32>, shape: Vec<usize>) -> Self {
        Self {
            values,
            shape,
            fill_value: None,
        }
    }

    pub fn with_fill_value(mut self, fill_value: f32) -> Self {
        self.fill_value = Some(fill_value);
        self
    }

    /// Whether the variable has a leading time dimension.
    pub fn is_time_varying(&self) -> bool {
        self.shape.len() == 3
    }

    /// Spatial `(height, width)` taken from the trailing two dimensions.
    pub fn spatial_shape(&self) -> Option<(usize, usize)> {
        match self.shape.as_slice() {
            [.., h, w] => Some((*h, *w)),
            _ => None,
        }
    }

    /// Number of values the declared shape calls for.
    pub fn expected_len(&self) -> usize {
        shape_len(&self.shape)
    }
}

/// Product of all dimension sizes, saturating at `usize::MAX`.
///
/// Shapes come straight from partition files, so a corrupt one must not
/// overflow.
pub fn shape_len(shape: &[usize]) -> usize {
    shape
        .iter()
        .try_fold(1usize, |len, &dim| len.checked_mul(dim))
        .unwrap_or(usize::MAX)
}

/// One decoded partition: coordinate axes plus named variables.
///
/// Once inserted into the dataset cache a `Dataset` is never mutated;
/// pipeline runs only hold shared references to it.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub source_id: String,
    /// Latitude of each grid row (ascending or descending).
    pub latitudes: Vec<f64>,
    /// Longitude of each grid column.
    pub longitudes: Vec<f64>,
    /// One marker per time step, in milliseconds since the Unix epoch (UTC).
    pub times: Vec<f64>,
    pub variables: HashMap<String, VariableArray>,
}

impl Dataset {
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            ..Default::default()
        }
    }

    /// Grid height (number of latitudes).
    pub fn height(&self) -> usize {
        self.latitudes.len()
    }

    /// Grid width (number of longitudes).
    pub fn width(&self) -> usize {
        self.longitudes.len()
    }

    /// Number of time steps.
    pub fn time_len(&self) -> usize {
        self.times.len()
    }

    pub fn variable(&self, name: &str) -> Option<&VariableArray> {
        self.variables.get(name)
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    /// Approximate memory held by the variable arrays and axes, in bytes.
    pub fn memory_bytes(&self) -> usize {
        let values: usize = self
            .variables
            .values()
            .map(|v| v.values.len() * std::mem::size_of::<f32>())
            .sum();
        let axes = (self.latitudes.len() + self.longitudes.len() + self.times.len())
            * std::mem::size_of::<f64>();
        values + axes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_len() {
        assert_eq!(shape_len(&[12, 3, 4]), 144);
        assert_eq!(shape_len(&[3, 4]), 12);
        assert_eq!(shape_len(&[]), 1);
        assert_eq!(shape_len(&[1 << 40, 1 << 40, 1 << 40]), usize::MAX);
    }

    #[test]
    fn test_expected_len_of_corrupt_shape() {
        let array = VariableArray::new(vec![0.0; 4], vec![usize::MAX, 2]);
        assert_eq!(array.expected_len(), usize::MAX);
        assert_eq!(array.spatial_shape(), Some((usize::MAX, 2)));
    }

    #[test]
    fn test_memory_bytes() {
        let mut dataset = Dataset::new("part1");
        dataset.latitudes = vec![0.0; 2];
        dataset.longitudes = vec![0.0; 3];
        dataset.times = vec![0.0; 1];
        dataset
            .variables
            .insert("x".to_string(), VariableArray::new(vec![0.0; 6], vec![1, 2, 3]));
        assert_eq!(dataset.memory_bytes(), 6 * 4 + 6 * 8);
    }
}
