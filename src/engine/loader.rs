//! Model loader
//!
//! Turns a model file into a ready [`InferenceSession`]:
//! - configure the runtime's compiled-model cache
//! - parse the model file
//! - reshape the input to the requested resolution (soft failure)
//! - compile for the selected device with latency/f32 hints
//! - create the request and read back the effective resolution
//!
//! Nothing is handed back until every step has succeeded, so a failed load
//! never disturbs the session the caller already holds.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{info, warn};

use super::device::DeviceRegistry;
use super::preprocess::MODEL_CHANNELS;
use super::session::{InferenceSession, Resolution};
use crate::config::Config;
use crate::error::{ErrorKind, LoadError};
use crate::runtime::{CompileHints, CompiledArtifact, InferRequest, InferenceRuntime};

/// How completely a load honored the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// Running at the requested resolution
    Ready,
    /// The model rejected the requested resolution and runs at its default
    Degraded,
}

impl LoadStatus {
    pub fn code(&self) -> i32 {
        match self {
            LoadStatus::Ready => 0,
            LoadStatus::Degraded => ErrorKind::ReshapeFailure.code(),
        }
    }
}

/// Result of a successful (possibly degraded) load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOutcome {
    pub status: LoadStatus,
    pub resolution: Resolution,
    pub class_count: usize,
}

pub struct ModelLoader {
    cache_dir: PathBuf,
    cache_device: String,
    hints: CompileHints,
}

impl ModelLoader {
    pub fn new(cache_dir: impl Into<PathBuf>, cache_device: &str, hints: CompileHints) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            cache_device: cache_device.to_string(),
            hints,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.runtime.cache_dir.clone(),
            &config.runtime.cache_device,
            config.compile_hints(),
        )
    }

    /// Load `path` for the device at `device_index` of `registry`.
    #[allow(clippy::type_complexity)]
    pub fn load<R: InferenceRuntime>(
        &self,
        runtime: &mut R,
        registry: &DeviceRegistry,
        path: &Path,
        device_index: usize,
        requested: Resolution,
    ) -> Result<(InferenceSession<R::Compiled, R::Request>, LoadOutcome), LoadError> {
        let start = Instant::now();

        // The cache only speeds up later compilations
        if let Err(e) = runtime.set_cache_dir(&self.cache_device, &self.cache_dir) {
            warn!(
                "Could not set model cache {} for {}: {}",
                self.cache_dir.display(),
                self.cache_device,
                e
            );
        }

        info!("Loading model from {}", path.display());
        let mut model = runtime.read_model(path).map_err(|source| LoadError::ModelParse {
            path: path.to_path_buf(),
            source,
        })?;

        let shape = [1, MODEL_CHANNELS, requested.height, requested.width];
        let reshape_failed = match runtime.reshape(&mut model, shape) {
            Ok(()) => false,
            Err(e) => {
                warn!("Keeping default input shape, reshape to {} rejected: {}", requested, e);
                true
            }
        };

        let device = registry
            .name_at(device_index)
            .map_err(|_| LoadError::DeviceIndex {
                index: device_index,
                available: registry.len(),
            })?
            .to_string();

        let mut compiled = runtime
            .compile(&model, &[device.as_str()], &self.hints)
            .map_err(|source| LoadError::Compile {
                device: device.clone(),
                source,
            })?;

        let request = compiled.create_request().map_err(LoadError::RequestCreation)?;
        let class_count = read_class_count(&compiled)?;
        let resolution = input_resolution(&request)?;

        // A rejected reshape only degrades the load if the model really runs elsewhere
        let status = if reshape_failed && resolution != requested {
            LoadStatus::Degraded
        } else {
            LoadStatus::Ready
        };

        info!(
            "Model ready on {} at {} with {} classes in {:?} ({:?})",
            device,
            resolution,
            class_count,
            start.elapsed(),
            status
        );

        let session = InferenceSession::new(compiled, request, resolution, class_count);
        Ok((
            session,
            LoadOutcome {
                status,
                resolution,
                class_count,
            },
        ))
    }
}

/// Class count from the compiled model's single `[N, classes, ...]` output
fn read_class_count<C: CompiledArtifact>(compiled: &C) -> Result<usize, LoadError> {
    let outputs = compiled.output_count().map_err(LoadError::RequestCreation)?;
    if outputs != 1 {
        return Err(LoadError::InvalidModel(format!(
            "expected exactly one output, found {}",
            outputs
        )));
    }

    let dims = compiled.output_shape().map_err(LoadError::RequestCreation)?;
    match dims.get(1) {
        Some(&classes) if classes > 0 => Ok(classes),
        _ => Err(LoadError::InvalidModel(format!(
            "output shape {:?} has no class dimension",
            dims
        ))),
    }
}

/// Effective resolution from the bound `[1, 3, H, W]` input tensor
fn input_resolution<Q: InferRequest>(request: &Q) -> Result<Resolution, LoadError> {
    let [batch, channels, height, width] =
        request.input_shape().map_err(LoadError::RequestCreation)?;
    if batch != 1 || channels != MODEL_CHANNELS || height == 0 || width == 0 {
        return Err(LoadError::InvalidModel(format!(
            "input shape [{}, {}, {}, {}] is not [1, {}, H, W]",
            batch, channels, height, width, MODEL_CHANNELS
        )));
    }
    Ok(Resolution::new(width, height))
}
