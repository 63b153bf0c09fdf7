//! Raster overlay rendering and the single-overlay display slot.
//!
//! A slice is colored cell by cell into an RGBA [`PixelBuffer`] and handed
//! to a [`DisplaySurface`] together with its geographic bounds. The
//! [`OverlayRenderer`] owns the only slot for an attached overlay: a new
//! overlay is attached only after the previous one has been detached.

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, instrument};

use dataset::Slice2D;
use slice_common::{GeoBounds, SliceError};

use crate::gradient::{Color, ColorMapper};
use crate::png::create_png;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("cannot render an empty {height}x{width} grid")]
    EmptyGrid { height: usize, width: usize },

    #[error("grid is {height}x{width} but coordinate axes have {lat_len} latitudes and {lon_len} longitudes")]
    AxisMismatch {
        height: usize,
        width: usize,
        lat_len: usize,
        lon_len: usize,
    },

    #[error("coordinate axes contain no finite values")]
    NoBounds,

    #[error("display surface: {0}")]
    Surface(String),

    #[error("PNG encoding failed: {0}")]
    Encode(String),
}

impl From<RenderError> for SliceError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::AxisMismatch {
                height,
                width,
                lat_len,
                lon_len,
            } => SliceError::dimension_mismatch(
                "coordinate axes vs grid",
                height * width,
                lat_len * lon_len,
            ),
            other => SliceError::render_failed(other.to_string()),
        }
    }
}

/// RGBA image with one pixel per grid cell, rows top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl PixelBuffer {
    /// Color every cell of `slice`; pixel `(x, y)` is the color of cell `(y, x)`.
    ///
    /// Ramp schemes with an observed range are stretched over this slice's
    /// own minimum and maximum.
    pub fn from_slice(slice: &Slice2D<'_>, mapper: &ColorMapper) -> Self {
        let width = slice.width();
        let height = slice.height();
        let mut pixels = vec![0u8; width * height * 4];
        if width == 0 || height == 0 {
            return Self { width, height, pixels };
        }

        let range = mapper.range_for(slice.values());

        pixels
            .par_chunks_mut(width * 4)
            .enumerate()
            .for_each(|(y, out)| {
                if let Some(row) = slice.row(y) {
                    for (x, &value) in row.iter().enumerate() {
                        let color = mapper.to_color(value, range);
                        out[x * 4..x * 4 + 4].copy_from_slice(&color.to_array());
                    }
                }
            });

        Self { width, height, pixels }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Raw RGBA bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y * self.width + x) * 4;
        Some(Color::new(
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ))
    }

    pub fn to_png(&self) -> Result<Vec<u8>, RenderError> {
        create_png(&self.pixels, self.width, self.height).map_err(RenderError::Encode)
    }
}

/// Map-like display that can show raster overlays.
pub trait DisplaySurface {
    /// Token identifying an attached overlay.
    type Handle;

    /// Do the slow part of showing `buffer` (encoding, writing, uploading)
    /// while the previous overlay is still displayed. An error here leaves
    /// the current overlay untouched.
    fn prepare(
        &mut self,
        _buffer: &PixelBuffer,
        _bounds: GeoBounds,
        _opacity: f32,
    ) -> Result<(), RenderError> {
        Ok(())
    }

    /// Show `buffer` stretched over `bounds`. Follows a successful
    /// [`prepare`](Self::prepare) for the same overlay.
    fn attach(
        &mut self,
        buffer: &PixelBuffer,
        bounds: GeoBounds,
        opacity: f32,
    ) -> Result<Self::Handle, RenderError>;

    /// Remove a previously attached overlay.
    fn detach(&mut self, handle: Self::Handle);

    /// Frame the view on `bounds`.
    fn fit_bounds(&mut self, _bounds: GeoBounds) {}
}

/// The overlay currently attached to the surface.
#[derive(Debug)]
pub struct RenderedOverlay<H> {
    pub handle: H,
    pub bounds: GeoBounds,
    pub width: usize,
    pub height: usize,
    pub opacity: f32,
}

/// Owner of the single overlay slot.
pub struct OverlayRenderer<S: DisplaySurface> {
    surface: S,
    opacity: f32,
    current: Option<RenderedOverlay<S::Handle>>,
}

impl<S: DisplaySurface> OverlayRenderer<S> {
    pub fn new(surface: S, opacity: f32) -> Self {
        Self {
            surface,
            opacity: opacity.clamp(0.0, 1.0),
            current: None,
        }
    }

    /// Render `slice` and make it the displayed overlay.
    ///
    /// Validation, coloring and the surface's `prepare` step all happen
    /// before the old overlay is touched, so a failing render leaves the
    /// current overlay in place. If the surface refuses the new overlay
    /// after the old one was detached, the slot stays empty.
    #[instrument(skip_all, fields(height = slice.height(), width = slice.width()))]
    pub fn render(
        &mut self,
        slice: &Slice2D<'_>,
        latitudes: &[f64],
        longitudes: &[f64],
        mapper: &ColorMapper,
    ) -> Result<&RenderedOverlay<S::Handle>, RenderError> {
        if slice.is_empty() {
            return Err(RenderError::EmptyGrid {
                height: slice.height(),
                width: slice.width(),
            });
        }
        if latitudes.len() != slice.height() || longitudes.len() != slice.width() {
            return Err(RenderError::AxisMismatch {
                height: slice.height(),
                width: slice.width(),
                lat_len: latitudes.len(),
                lon_len: longitudes.len(),
            });
        }
        let bounds = GeoBounds::from_axes(latitudes, longitudes).ok_or(RenderError::NoBounds)?;
        let buffer = PixelBuffer::from_slice(slice, mapper);

        self.replace(buffer, bounds)
    }

    /// Prepare `buffer` on the surface, detach the current overlay (if any),
    /// then attach `buffer`.
    pub fn replace(
        &mut self,
        buffer: PixelBuffer,
        bounds: GeoBounds,
    ) -> Result<&RenderedOverlay<S::Handle>, RenderError> {
        self.surface.prepare(&buffer, bounds, self.opacity)?;

        if let Some(previous) = self.current.take() {
            debug!("Detaching previous overlay");
            self.surface.detach(previous.handle);
        }

        let handle = self.surface.attach(&buffer, bounds, self.opacity)?;
        let overlay = RenderedOverlay {
            handle,
            bounds,
            width: buffer.width(),
            height: buffer.height(),
            opacity: self.opacity,
        };
        Ok(&*self.current.insert(overlay))
    }

    /// Detach the current overlay. Returns whether one was attached.
    pub fn clear(&mut self) -> bool {
        match self.current.take() {
            Some(previous) => {
                self.surface.detach(previous.handle);
                true
            }
            None => false,
        }
    }

    pub fn current(&self) -> Option<&RenderedOverlay<S::Handle>> {
        self.current.as_ref()
    }

    pub fn fit_bounds(&mut self, bounds: GeoBounds) {
        self.surface.fit_bounds(bounds);
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }
}
