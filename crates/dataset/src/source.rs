//! Dataset sources: fetch and decode one partition.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, instrument};

use crate::config::AxesConfig;
use crate::error::SourceError;
use crate::types::{Dataset, VariableArray};

/// Loads a decoded partition for a source identifier (URL or path).
#[async_trait]
pub trait DatasetSource: Send + Sync {
    async fn load(&self, source_id: &str) -> Result<Dataset, SourceError>;
}

/// Source reading JSON-encoded partitions over HTTP(S) or from local files.
///
/// Container layout:
///
/// ```json
/// {
///   "coordinates": {
///     "latitude": [-11.0, -10.75],
///     "longitude": [95.0, 95.25],
///     "valid_time": [-631152000000]
///   },
///   "variables": {
///     "suitability_index": { "shape": [1, 2, 2], "values": [0.1, null, 0.5, 0.9] }
///   }
/// }
/// ```
///
/// Time markers are milliseconds since the Unix epoch. `null` cells decode
/// to NaN.
pub struct JsonDatasetSource {
    client: reqwest::Client,
    axes: AxesConfig,
}

impl JsonDatasetSource {
    pub fn new(axes: AxesConfig) -> Self {
        Self::with_client(reqwest::Client::new(), axes)
    }

    pub fn with_client(client: reqwest::Client, axes: AxesConfig) -> Self {
        Self { client, axes }
    }

    async fn fetch(&self, source_id: &str) -> Result<Bytes, SourceError> {
        if is_remote(source_id) {
            let response = self.client.get(source_id).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(SourceError::Fetch(format!("HTTP {}", status)));
            }
            Ok(response.bytes().await?)
        } else {
            let path = source_id.strip_prefix("file://").unwrap_or(source_id);
            Ok(Bytes::from(tokio::fs::read(path).await?))
        }
    }
}

#[async_trait]
impl DatasetSource for JsonDatasetSource {
    #[instrument(skip(self), fields(remote = is_remote(source_id)))]
    async fn load(&self, source_id: &str) -> Result<Dataset, SourceError> {
        let start = Instant::now();
        let raw = self.fetch(source_id).await?;
        let fetched_bytes = raw.len();
        debug!(bytes = fetched_bytes, "Fetched partition");

        let axes = self.axes.clone();
        let id = source_id.to_string();
        let dataset = tokio::task::spawn_blocking(move || decode_dataset(&id, &raw, &axes))
            .await
            .map_err(|e| SourceError::Decode(format!("decode task failed: {}", e)))??;

        info!(
            bytes = fetched_bytes,
            height = dataset.height(),
            width = dataset.width(),
            steps = dataset.time_len(),
            memory_bytes = dataset.memory_bytes(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded partition"
        );
        Ok(dataset)
    }
}

fn is_remote(source_id: &str) -> bool {
    source_id.starts_with("http://") || source_id.starts_with("https://")
}

#[derive(Deserialize)]
struct RawContainer {
    coordinates: HashMap<String, Vec<Option<f64>>>,
    #[serde(default)]
    variables: HashMap<String, RawVariable>,
}

#[derive(Deserialize)]
struct RawVariable {
    shape: Vec<usize>,
    values: Vec<Option<f32>>,
    #[serde(default)]
    fill_value: Option<f32>,
}

/// Decode a JSON container into a [`Dataset`].
///
/// Only the presence of the three coordinate axes is checked here; array
/// lengths are checked against the grid when a slice is extracted.
pub fn decode_dataset(source_id: &str, raw: &[u8], axes: &AxesConfig) -> Result<Dataset, SourceError> {
    let mut container: RawContainer = serde_json::from_slice(raw)?;

    let mut take_axis = |name: &str| -> Result<Vec<f64>, SourceError> {
        container
            .coordinates
            .remove(name)
            .map(|values| values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
            .ok_or_else(|| SourceError::MissingData(format!("coordinate '{}'", name)))
    };

    let latitudes = take_axis(&axes.latitude)?;
    let longitudes = take_axis(&axes.longitude)?;
    let times = take_axis(&axes.time)?;

    let variables = container
        .variables
        .into_iter()
        .map(|(name, raw)| {
            let values = raw.values.into_iter().map(|v| v.unwrap_or(f32::NAN)).collect();
            let array = VariableArray {
                values,
                shape: raw.shape,
                fill_value: raw.fill_value,
            };
            (name, array)
        })
        .collect();

    Ok(Dataset {
        source_id: source_id.to_string(),
        latitudes,
        longitudes,
        times,
        variables,
    })
}
