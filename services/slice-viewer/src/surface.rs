//! File-backed display surface.
//!
//! Each attached overlay becomes `overlay-<uuid>.png` plus a JSON sidecar
//! `overlay-<uuid>.json` describing where the image belongs on a map.
//! Both files are written in `prepare`, while the previous overlay is still
//! on disk; `attach` only promotes the staged overlay. Detaching deletes
//! both files, so once an update settles the output directory holds exactly
//! the attached overlay.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use renderer::{DisplaySurface, PixelBuffer, RenderError};
use slice_common::GeoBounds;

/// Name of the file recording the last framed view.
pub const VIEW_FILE: &str = "view.json";

/// Placement metadata written next to each overlay image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlaySidecar {
    pub id: Uuid,
    /// `[[min_lat, min_lon], [max_lat, max_lon]]`
    pub bounds: [[f64; 2]; 2],
    pub opacity: f32,
    pub width: usize,
    pub height: usize,
}

/// Handle to an overlay on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOverlay {
    pub id: Uuid,
    pub image_path: PathBuf,
    pub sidecar_path: PathBuf,
}

pub struct PngFileSurface {
    out_dir: PathBuf,
    view: Option<GeoBounds>,
    /// Overlay written by `prepare` and not yet attached.
    staged: Option<FileOverlay>,
}

impl PngFileSurface {
    /// Use `out_dir` for overlay files, creating it if needed.
    pub fn new(out_dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let out_dir = out_dir.into();
        fs::create_dir_all(&out_dir)?;
        Ok(Self {
            out_dir,
            view: None,
            staged: None,
        })
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Bounds of the last `fit_bounds` call.
    pub fn view(&self) -> Option<GeoBounds> {
        self.view
    }

    fn write_overlay(
        &self,
        buffer: &PixelBuffer,
        bounds: GeoBounds,
        opacity: f32,
    ) -> Result<FileOverlay, RenderError> {
        let png = buffer.to_png()?;
        let id = Uuid::new_v4();
        let image_path = self.out_dir.join(format!("overlay-{}.png", id));
        let sidecar_path = self.out_dir.join(format!("overlay-{}.json", id));

        let sidecar = OverlaySidecar {
            id,
            bounds: bounds.corners(),
            opacity,
            width: buffer.width(),
            height: buffer.height(),
        };
        let sidecar_json = serde_json::to_vec_pretty(&sidecar)
            .map_err(|e| RenderError::Surface(e.to_string()))?;

        fs::write(&image_path, png)
            .map_err(|e| RenderError::Surface(format!("writing {:?}: {}", image_path, e)))?;
        if let Err(e) = fs::write(&sidecar_path, sidecar_json) {
            let _ = fs::remove_file(&image_path);
            return Err(RenderError::Surface(format!("writing {:?}: {}", sidecar_path, e)));
        }

        debug!(path = ?image_path, "Overlay written");
        Ok(FileOverlay {
            id,
            image_path,
            sidecar_path,
        })
    }

    fn remove_files(overlay: &FileOverlay) {
        for path in [&overlay.image_path, &overlay.sidecar_path] {
            if let Err(e) = fs::remove_file(path) {
                warn!(path = ?path, error = %e, "Failed to remove overlay file");
            }
        }
    }
}

impl DisplaySurface for PngFileSurface {
    type Handle = FileOverlay;

    fn prepare(
        &mut self,
        buffer: &PixelBuffer,
        bounds: GeoBounds,
        opacity: f32,
    ) -> Result<(), RenderError> {
        if let Some(abandoned) = self.staged.take() {
            Self::remove_files(&abandoned);
        }
        self.staged = Some(self.write_overlay(buffer, bounds, opacity)?);
        Ok(())
    }

    fn attach(
        &mut self,
        buffer: &PixelBuffer,
        bounds: GeoBounds,
        opacity: f32,
    ) -> Result<FileOverlay, RenderError> {
        let overlay = match self.staged.take() {
            Some(staged) => staged,
            None => self.write_overlay(buffer, bounds, opacity)?,
        };
        debug!(id = %overlay.id, "Overlay attached");
        Ok(overlay)
    }

    fn detach(&mut self, handle: FileOverlay) {
        Self::remove_files(&handle);
        debug!(id = %handle.id, "Overlay detached");
    }

    fn fit_bounds(&mut self, bounds: GeoBounds) {
        self.view = Some(bounds);
        let path = self.out_dir.join(VIEW_FILE);
        match serde_json::to_vec_pretty(&bounds) {
            Ok(json) => {
                if let Err(e) = fs::write(&path, json) {
                    warn!(path = ?path, error = %e, "Failed to record view bounds");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize view bounds"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use renderer::{ColorMapper, ColorScheme, OverlayRenderer};
    use dataset::Slice2D;
    use test_utils::{temp_test_dir, temp_test_dir_with_prefix};

    fn overlay_files(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map_or(false, |n| n.starts_with("overlay-"))
            })
            .collect();
        files.sort();
        files
    }

    #[test]
    fn test_attach_writes_png_and_sidecar() {
        let dir = temp_test_dir();
        let mut surface = PngFileSurface::new(dir.path()).unwrap();
        let grid = vec![0.1f32, 0.5, 0.9, f32::NAN];
        let slice = Slice2D::from_grid(&grid, 2, 2).unwrap();
        let buffer = PixelBuffer::from_slice(&slice, &ColorMapper::new(ColorScheme::suitability_bands()));
        let bounds = GeoBounds::new(-8.0, 105.0, -6.0, 114.0);

        let handle = surface.attach(&buffer, bounds, 0.85).unwrap();
        assert!(handle.image_path.exists());

        let png = fs::read(&handle.image_path).unwrap();
        assert_eq!(&png[0..8], &renderer::png::PNG_SIGNATURE);

        let sidecar: OverlaySidecar =
            serde_json::from_slice(&fs::read(&handle.sidecar_path).unwrap()).unwrap();
        assert_eq!(sidecar.id, handle.id);
        assert_eq!(sidecar.bounds, [[-8.0, 105.0], [-6.0, 114.0]]);
        assert_eq!((sidecar.width, sidecar.height), (2, 2));

        surface.detach(handle);
        assert!(overlay_files(dir.path()).is_empty());
    }

    #[test]
    fn test_new_overlay_written_before_old_is_removed() {
        let dir = temp_test_dir();
        let mut surface = PngFileSurface::new(dir.path()).unwrap();
        let grid = vec![0.1f32, 0.9];
        let slice = Slice2D::from_grid(&grid, 1, 2).unwrap();
        let buffer = PixelBuffer::from_slice(&slice, &ColorMapper::new(ColorScheme::suitability_bands()));
        let bounds = GeoBounds::new(-1.0, 100.0, 0.0, 101.0);

        let old = surface.attach(&buffer, bounds, 0.85).unwrap();
        surface.prepare(&buffer, bounds, 0.85).unwrap();
        // Old and staged overlays coexist until the swap.
        assert_eq!(overlay_files(dir.path()).len(), 4);

        surface.detach(old);
        let new = surface.attach(&buffer, bounds, 0.85).unwrap();
        let files = overlay_files(dir.path());
        assert_eq!(files.len(), 2);
        assert!(files.contains(&new.image_path));
        assert!(files.contains(&new.sidecar_path));
    }

    #[test]
    fn test_only_current_overlay_on_disk() {
        let dir = temp_test_dir_with_prefix("slice_overlay_");
        let surface = PngFileSurface::new(dir.path().join("out")).unwrap();
        let mut renderer = OverlayRenderer::new(surface, 0.85);
        let grid = vec![0.2f32; 6];
        let slice = Slice2D::from_grid(&grid, 2, 3).unwrap();
        let mapper = ColorMapper::new(ColorScheme::suitability_bands());

        for _ in 0..3 {
            renderer
                .render(&slice, &[1.0, 0.0], &[100.0, 101.0, 102.0], &mapper)
                .unwrap();
        }

        let out_dir = renderer.surface().out_dir().to_path_buf();
        let files = overlay_files(&out_dir);
        assert_eq!(files.len(), 2);
        let current = renderer.current().unwrap();
        assert!(files.contains(&current.handle.image_path));

        let bounds = current.bounds;
        renderer.fit_bounds(bounds);
        assert_eq!(renderer.surface().view(), Some(bounds));
        assert!(out_dir.join(VIEW_FILE).exists());
    }
}
