//! Tests for mapping whole slices to pixels.

use dataset::{extract_slice, Slice2D, TimeIndex};
use renderer::{Color, ColorMapper, ColorScheme, PixelBuffer, RangeSource, ValueRange};
use test_utils::{create_grid_with_nans, create_indexed_cube, create_suitability_cube};

const BLUE: Color = Color::rgb(0, 0, 200);
const GREEN: Color = Color::rgb(0, 200, 0);
const RED: Color = Color::rgb(200, 0, 0);

fn gray_ramp(range: RangeSource) -> ColorMapper {
    ColorMapper::new(ColorScheme::two_color_ramp(
        Color::rgb(0, 0, 0),
        Color::rgb(255, 255, 255),
        range,
    ))
}

fn pixels(buffer: &PixelBuffer) -> Vec<Color> {
    (0..buffer.height())
        .flat_map(|y| (0..buffer.width()).map(move |x| (x, y)))
        .map(|(x, y)| buffer.pixel(x, y).unwrap())
        .collect()
}

// ============================================================================
// Threshold bands
// ============================================================================

#[test]
fn test_suitability_grid_band_counts() {
    // 11 cells sweeping 0.0..=1.0 in steps of 0.1
    let values = create_suitability_cube(1, 1, 11, 0.0);
    let slice = Slice2D::from_grid(&values, 1, 11).unwrap();
    let buffer = PixelBuffer::from_slice(&slice, &ColorMapper::new(ColorScheme::suitability_bands()));

    let colors = pixels(&buffer);
    let count = |c: Color| colors.iter().filter(|p| **p == c).count();
    // 0.0, 0.1, 0.2 | 0.3, 0.4, 0.5 | 0.6 .. 1.0
    assert_eq!(count(BLUE), 3);
    assert_eq!(count(GREEN), 3);
    assert_eq!(count(RED), 5);
}

#[test]
fn test_every_pixel_matches_its_cell() {
    let values = create_suitability_cube(1, 4, 6, 0.0);
    let slice = Slice2D::from_grid(&values, 4, 6).unwrap();
    let mapper = ColorMapper::new(ColorScheme::suitability_bands());
    let buffer = PixelBuffer::from_slice(&slice, &mapper);

    for y in 0..4 {
        for x in 0..6 {
            let expected = mapper.to_color(slice.get(y, x).unwrap(), None);
            assert_eq!(buffer.pixel(x, y), Some(expected), "pixel ({}, {})", x, y);
        }
    }
    assert_eq!(buffer.pixel(6, 0), None);
}

// ============================================================================
// Missing cells
// ============================================================================

#[test]
fn test_nan_cells_are_transparent() {
    let values = create_grid_with_nans(3, 3, &[(0, 0), (2, 1)]);
    let slice = Slice2D::from_grid(&values, 3, 3).unwrap();
    let buffer = PixelBuffer::from_slice(&slice, &ColorMapper::new(ColorScheme::suitability_bands()));

    assert!(buffer.pixel(0, 0).unwrap().is_transparent());
    assert!(buffer.pixel(2, 1).unwrap().is_transparent());
    assert_eq!(buffer.pixel(1, 1), Some(GREEN));
    assert_eq!(pixels(&buffer).iter().filter(|c| c.is_transparent()).count(), 2);
}

#[test]
fn test_fill_value_excluded_from_observed_range() {
    let values = vec![-9999.0, 10.0, 20.0, 30.0];
    let slice = Slice2D::from_grid(&values, 2, 2).unwrap();
    let mapper = gray_ramp(RangeSource::Observed).with_fill_value(Some(-9999.0));
    let buffer = PixelBuffer::from_slice(&slice, &mapper);

    assert!(buffer.pixel(0, 0).unwrap().is_transparent());
    assert_eq!(buffer.pixel(1, 0), Some(Color::rgb(0, 0, 0)));
    assert_eq!(buffer.pixel(0, 1), Some(Color::rgb(128, 128, 128)));
    assert_eq!(buffer.pixel(1, 1), Some(Color::rgb(255, 255, 255)));
}

#[test]
fn test_all_missing_slice_is_fully_transparent() {
    let values = vec![f32::NAN; 6];
    let slice = Slice2D::from_grid(&values, 2, 3).unwrap();
    let buffer = PixelBuffer::from_slice(&slice, &gray_ramp(RangeSource::Observed));
    assert!(pixels(&buffer).iter().all(|c| c.is_transparent()));
}

// ============================================================================
// Ramp ranges across time steps
// ============================================================================

#[test]
fn test_observed_range_follows_each_slice() {
    // Each step spans t*1000 .. t*1000+11, so observed ramps look identical.
    let cube = create_indexed_cube(3, 2, 2);
    let mapper = gray_ramp(RangeSource::Observed);

    let first = extract_slice(&cube, TimeIndex(0), 2, 2, true).unwrap();
    let last = extract_slice(&cube, TimeIndex(2), 2, 2, true).unwrap();
    assert_eq!(
        pixels(&PixelBuffer::from_slice(&first, &mapper)),
        pixels(&PixelBuffer::from_slice(&last, &mapper))
    );
}

#[test]
fn test_fixed_range_is_shared_across_slices() {
    let cube = create_indexed_cube(3, 2, 2);
    let mapper = gray_ramp(RangeSource::Fixed(ValueRange::new(0.0, 2011.0)));

    let first = extract_slice(&cube, TimeIndex(0), 2, 2, true).unwrap();
    let last = extract_slice(&cube, TimeIndex(2), 2, 2, true).unwrap();
    let first = PixelBuffer::from_slice(&first, &mapper);
    let last = PixelBuffer::from_slice(&last, &mapper);

    assert_eq!(first.pixel(0, 0), Some(Color::rgb(0, 0, 0)));
    assert_eq!(last.pixel(1, 1), Some(Color::rgb(255, 255, 255)));
    assert!(first.pixel(1, 1).unwrap().r < last.pixel(0, 0).unwrap().r);
}

#[test]
fn test_constant_slice_uses_ramp_midpoint() {
    let values = vec![7.0f32; 4];
    let slice = Slice2D::from_grid(&values, 2, 2).unwrap();
    let buffer = PixelBuffer::from_slice(&slice, &gray_ramp(RangeSource::Observed));
    assert!(pixels(&buffer).iter().all(|c| *c == Color::rgb(128, 128, 128)));
}
