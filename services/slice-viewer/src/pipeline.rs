//! Selection-driven pipeline: (variable, year, month) to a displayed overlay.
//!
//! ```text
//! SliceRequest
//!   ├─► ResolvingPartition   PartitionIndex::resolve(year)
//!   ├─► LoadingDataset       DatasetCache::get_or_load(source)   (only await point)
//!   ├─► ResolvingTimeIndex   find_time_index(times, year, month)
//!   ├─► ExtractingSlice      extract_slice(values, t, H, W)
//!   └─► Rendering            OverlayRenderer::render + fit_bounds
//! ```
//!
//! Every update takes a generation number. Only the run holding the newest
//! generation may touch the overlay; older runs finish as
//! [`UpdateOutcome::Superseded`] and their results are dropped.

use metrics::{counter, histogram};
use serde::Serialize;
use std::borrow::Cow;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use dataset::{extract_slice, find_time_index, shape_len, CacheStats, DatasetCache, DatasetSource, PartitionIndex};
use renderer::{ColorMapper, DisplaySurface, OverlayRenderer, StyleError};
use slice_common::{ErrorKind, GeoBounds, SliceError, SliceRequest};

use crate::config::ViewerConfig;

/// Stage the latest pipeline run is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Idle,
    ResolvingPartition,
    LoadingDataset,
    ResolvingTimeIndex,
    ExtractingSlice,
    Rendering,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Idle => "idle",
            PipelineStage::ResolvingPartition => "resolving_partition",
            PipelineStage::LoadingDataset => "loading_dataset",
            PipelineStage::ResolvingTimeIndex => "resolving_time_index",
            PipelineStage::ExtractingSlice => "extracting_slice",
            PipelineStage::Rendering => "rendering",
        };
        f.write_str(name)
    }
}

/// What a successful run put on the display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlaySummary {
    pub request: SliceRequest,
    pub source_id: String,
    pub time_index: usize,
    pub bounds: GeoBounds,
    pub width: usize,
    pub height: usize,
    pub opacity: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    Rendered(OverlaySummary),
    /// A newer request arrived before this one finished.
    Superseded,
}

impl UpdateOutcome {
    pub fn summary(&self) -> Option<&OverlaySummary> {
        match self {
            UpdateOutcome::Rendered(summary) => Some(summary),
            UpdateOutcome::Superseded => None,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, UpdateOutcome::Superseded)
    }
}

/// A failed run, with the selection it was serving.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{request}: {error}")]
pub struct PipelineError {
    #[source]
    pub error: SliceError,
    pub request: SliceRequest,
    /// Partition involved, once resolved.
    pub source_id: Option<String>,
}

impl PipelineError {
    fn new(error: SliceError, request: &SliceRequest, source_id: Option<&str>) -> Self {
        Self {
            error,
            request: request.clone(),
            source_id: source_id.map(str::to_string),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

/// Drives one pipeline run per selection change and owns the display slot.
pub struct Orchestrator<S: DisplaySurface> {
    partitions: PartitionIndex,
    cache: Arc<DatasetCache>,
    /// Color mapper per selectable variable, in selector order.
    variables: Vec<(String, ColorMapper)>,
    renderer: Mutex<OverlayRenderer<S>>,
    generation: AtomicU64,
    stage: watch::Sender<PipelineStage>,
}

impl<S: DisplaySurface> Orchestrator<S> {
    pub fn new(
        partitions: PartitionIndex,
        cache: Arc<DatasetCache>,
        variables: Vec<(String, ColorMapper)>,
        renderer: OverlayRenderer<S>,
    ) -> Self {
        let (stage, _) = watch::channel(PipelineStage::Idle);
        Self {
            partitions,
            cache,
            variables,
            renderer: Mutex::new(renderer),
            generation: AtomicU64::new(0),
            stage,
        }
    }

    /// Wire up an orchestrator from a validated configuration.
    pub fn from_config(
        config: &ViewerConfig,
        source: Arc<dyn DatasetSource>,
        surface: S,
    ) -> Result<Self, StyleError> {
        let variables = config
            .variables
            .iter()
            .map(|v| Ok((v.name.clone(), v.mapper()?)))
            .collect::<Result<Vec<_>, StyleError>>()?;

        Ok(Self::new(
            config.dataset.partition_index(),
            Arc::new(DatasetCache::new(source)),
            variables,
            OverlayRenderer::new(surface, config.overlay.opacity),
        ))
    }

    /// Run the pipeline for `request`.
    ///
    /// On failure the previously displayed overlay stays in place. A run
    /// overtaken by a newer call returns [`UpdateOutcome::Superseded`] and
    /// never touches the display, whether it would have succeeded or failed.
    #[instrument(skip(self, request), fields(variable = %request.variable, year = request.year, month = request.month))]
    pub async fn update(&self, request: SliceRequest) -> Result<UpdateOutcome, PipelineError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        counter!("pipeline_updates_total").increment(1);
        let started = Instant::now();

        let result = self.run(&request, generation).await;
        self.set_stage(generation, PipelineStage::Idle);

        match result {
            Ok(Some(summary)) => {
                histogram!("pipeline_render_seconds").record(started.elapsed().as_secs_f64());
                info!(
                    source_id = %summary.source_id,
                    time_index = summary.time_index,
                    width = summary.width,
                    height = summary.height,
                    "Overlay rendered"
                );
                Ok(UpdateOutcome::Rendered(summary))
            }
            Ok(None) => Ok(self.superseded()),
            Err(_) if !self.is_current(generation) => Ok(self.superseded()),
            Err(err) => {
                counter!("pipeline_failures_total", "kind" => err.kind().as_str()).increment(1);
                if err.error.is_no_data() {
                    info!(error = %err.error, source_id = ?err.source_id, "No data for selection");
                } else if err.error.is_recoverable() {
                    warn!(error = %err.error, source_id = ?err.source_id, "Pipeline run failed");
                } else {
                    error!(error = %err.error, source_id = ?err.source_id, "Pipeline run failed");
                }
                Err(err)
            }
        }
    }

    /// `Ok(None)` means the run was overtaken before it could render.
    async fn run(
        &self,
        request: &SliceRequest,
        generation: u64,
    ) -> Result<Option<OverlaySummary>, PipelineError> {
        self.set_stage(generation, PipelineStage::ResolvingPartition);
        let mapper = self.mapper(&request.variable).ok_or_else(|| {
            PipelineError::new(
                SliceError::UnknownVariable {
                    variable: request.variable.clone(),
                },
                request,
                None,
            )
        })?;
        let partition = self
            .partitions
            .resolve(request.year)
            .map_err(|e| PipelineError::new(e, request, None))?;
        let source_id = partition.source_id.as_str();
        let fail = |error: SliceError| PipelineError::new(error, request, Some(source_id));

        self.set_stage(generation, PipelineStage::LoadingDataset);
        let dataset = self.cache.get_or_load(source_id).await.map_err(fail)?;
        if !self.is_current(generation) {
            return Ok(None);
        }

        self.set_stage(generation, PipelineStage::ResolvingTimeIndex);
        let array = dataset.variable(&request.variable).ok_or_else(|| {
            fail(SliceError::UnknownVariable {
                variable: request.variable.clone(),
            })
        })?;
        let time_index =
            find_time_index(&dataset.times, request.year, request.month).ok_or_else(|| {
                fail(SliceError::TimeNotFound {
                    year: request.year,
                    month: request.month,
                    source_id: source_id.to_string(),
                })
            })?;

        self.set_stage(generation, PipelineStage::ExtractingSlice);
        let (height, width) = (dataset.height(), dataset.width());
        check_shape(&array.shape, dataset.time_len(), height, width).map_err(fail)?;
        let slice = extract_slice(&array.values, time_index, height, width, array.is_time_varying())
            .map_err(fail)?;
        // A fill value from the config wins over the one the dataset declares.
        let mapper = match (mapper.missing.fill_value, array.fill_value) {
            (None, Some(fill)) => Cow::Owned(mapper.clone().with_fill_value(Some(fill))),
            _ => Cow::Borrowed(mapper),
        };

        self.set_stage(generation, PipelineStage::Rendering);
        let mut renderer = self.renderer.lock().expect("overlay renderer lock poisoned");
        if !self.is_current(generation) {
            return Ok(None);
        }
        let overlay = renderer
            .render(&slice, &dataset.latitudes, &dataset.longitudes, &mapper)
            .map_err(|e| fail(e.into()))?;
        let summary = OverlaySummary {
            request: request.clone(),
            source_id: source_id.to_string(),
            time_index: time_index.get(),
            bounds: overlay.bounds,
            width: overlay.width,
            height: overlay.height,
            opacity: overlay.opacity,
        };
        renderer.fit_bounds(summary.bounds);

        Ok(Some(summary))
    }

    fn superseded(&self) -> UpdateOutcome {
        counter!("pipeline_superseded_total").increment(1);
        debug!("Discarding superseded run");
        UpdateOutcome::Superseded
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn set_stage(&self, generation: u64, stage: PipelineStage) {
        if self.is_current(generation) {
            debug!(%stage, "Pipeline stage");
            self.stage.send_replace(stage);
        }
    }

    fn mapper(&self, variable: &str) -> Option<&ColorMapper> {
        self.variables
            .iter()
            .find(|(name, _)| name == variable)
            .map(|(_, mapper)| mapper)
    }

    /// Stage of the most recent run.
    pub fn stage(&self) -> PipelineStage {
        *self.stage.borrow()
    }

    pub fn subscribe_stage(&self) -> watch::Receiver<PipelineStage> {
        self.stage.subscribe()
    }

    /// Years covered by some partition, ascending.
    pub fn years(&self) -> Vec<i32> {
        self.partitions.years()
    }

    pub fn variable_names(&self) -> Vec<&str> {
        self.variables.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Bounds of the overlay currently on display.
    pub fn current_bounds(&self) -> Option<GeoBounds> {
        let renderer = self.renderer.lock().expect("overlay renderer lock poisoned");
        renderer.current().map(|overlay| overlay.bounds)
    }

    /// Run `f` with the renderer locked.
    pub fn with_renderer<R>(&self, f: impl FnOnce(&OverlayRenderer<S>) -> R) -> R {
        let renderer = self.renderer.lock().expect("overlay renderer lock poisoned");
        f(&renderer)
    }

    /// Remove the displayed overlay, if any.
    pub fn clear(&self) -> bool {
        let mut renderer = self.renderer.lock().expect("overlay renderer lock poisoned");
        renderer.clear()
    }
}

/// Compare a variable's declared shape with the dataset's axes.
fn check_shape(shape: &[usize], times: usize, height: usize, width: usize) -> Result<(), SliceError> {
    let expected: &[usize] = match shape.len() {
        3 => &[times, height, width],
        2 => &[height, width],
        rank => {
            return Err(SliceError::dimension_mismatch(
                format!("variable of rank {}", rank),
                3,
                rank,
            ))
        }
    };
    if shape != expected {
        return Err(SliceError::dimension_mismatch(
            format!("variable shape {:?} vs axes {:?}", shape, expected),
            shape_len(expected),
            shape_len(shape),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_shape() {
        assert!(check_shape(&[12, 3, 4], 12, 3, 4).is_ok());
        assert!(check_shape(&[3, 4], 12, 3, 4).is_ok());
        assert!(matches!(
            check_shape(&[12, 4, 3], 12, 3, 4),
            Err(SliceError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            check_shape(&[12, 3, 4], 11, 3, 4),
            Err(SliceError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            check_shape(&[48], 4, 3, 4),
            Err(SliceError::DimensionMismatch { expected: 3, actual: 1, .. })
        ));
    }

    #[test]
    fn test_check_shape_huge_declared_shape() {
        let huge = [1usize << 40, 1 << 40, 1 << 40];
        assert_eq!(
            check_shape(&huge, 12, 3, 4),
            Err(SliceError::dimension_mismatch(
                "variable shape [1099511627776, 1099511627776, 1099511627776] vs axes [12, 3, 4]",
                144,
                usize::MAX,
            ))
        );
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(PipelineStage::LoadingDataset.to_string(), "loading_dataset");
        assert_eq!(
            serde_json::to_string(&PipelineStage::ResolvingTimeIndex).unwrap(),
            "\"resolving_time_index\""
        );
    }
}
