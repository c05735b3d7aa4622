//! OpenVINO runtime
//!
//! Wraps the `openvino` crate behind the runtime traits. The raw handles are
//! not `Send`; they are only ever touched from behind one mutex, so the
//! wrappers below assert `Send`.

use std::path::Path;

use openvino::{CompiledModel, Core, DeviceType, ElementType, InferRequest as OvRequest, Model};
use openvino::{RwPropertyKey, Shape, Tensor};
use tracing::debug;

use super::{nchw, CompileHints, CompiledArtifact, InferRequest, InferenceRuntime};
use crate::error::RuntimeError;

pub struct OpenVinoRuntime {
    core: Core,
}
unsafe impl Send for OpenVinoRuntime {}

impl OpenVinoRuntime {
    pub fn new() -> Result<Self, RuntimeError> {
        let core = Core::new().map_err(|e| RuntimeError::backend("create core", e))?;
        Ok(Self { core })
    }
}

pub struct OpenVinoModel {
    model: Model,
    /// Shape to bind on the request when the model input is dynamic
    bound_shape: Option<[usize; 4]>,
}

/// Whether per-dimension `(min, max)` bounds admit `shape`.
///
/// A static dimension has `min == max`; a negative max is unbounded.
fn admits(bounds: &[(i64, i64)], shape: [usize; 4]) -> bool {
    bounds.len() == shape.len()
        && bounds.iter().zip(shape).all(|(&(min, max), value)| {
            let value = value as i64;
            value >= min.max(0) && (max < 0 || value <= max)
        })
}
unsafe impl Send for OpenVinoModel {}

pub struct OpenVinoCompiled {
    compiled: CompiledModel,
    bound_shape: Option<[usize; 4]>,
}
unsafe impl Send for OpenVinoCompiled {}

pub struct OpenVinoRequest {
    request: OvRequest,
    input: Tensor,
}
unsafe impl Send for OpenVinoRequest {}

fn device(name: &str) -> DeviceType<'_> {
    name.into()
}

impl InferenceRuntime for OpenVinoRuntime {
    type Model = OpenVinoModel;
    type Compiled = OpenVinoCompiled;
    type Request = OpenVinoRequest;

    fn available_devices(&self) -> Result<Vec<String>, RuntimeError> {
        let devices = self
            .core
            .available_devices()
            .map_err(|e| RuntimeError::backend("get available devices", e))?;
        Ok(devices.iter().map(|d| d.as_ref().to_string()).collect())
    }

    fn set_cache_dir(&mut self, device_name: &str, dir: &Path) -> Result<(), RuntimeError> {
        let dir = dir.to_string_lossy();
        self.core
            .set_property(&device(device_name), &RwPropertyKey::CacheDir, &dir)
            .map_err(|e| RuntimeError::backend("set cache dir", e))
    }

    fn read_model(&mut self, path: &Path) -> Result<Self::Model, RuntimeError> {
        let path = path
            .to_str()
            .ok_or_else(|| RuntimeError::Unsupported("model path is not valid UTF-8".to_string()))?;
        let model = self
            .core
            .read_model_from_file(path, "")
            .map_err(|e| RuntimeError::backend("read model", e))?;
        Ok(OpenVinoModel {
            model,
            bound_shape: None,
        })
    }

    /// The safe bindings expose no model reshape, so a new shape is bound on
    /// the request at creation time. It must fit the model's single input:
    /// static dimensions match exactly, dynamic ones contain the value.
    fn reshape(&mut self, model: &mut Self::Model, shape: [usize; 4]) -> Result<(), RuntimeError> {
        let inputs = model
            .model
            .get_inputs_len()
            .map_err(|e| RuntimeError::backend("get inputs", e))?;
        if inputs != 1 {
            return Err(RuntimeError::Unsupported(format!(
                "model has {} inputs",
                inputs
            )));
        }

        let partial = model
            .model
            .get_input_by_index(0)
            .and_then(|input| input.get_partial_shape())
            .map_err(|e| RuntimeError::backend("get input shape", e))?;
        if partial.get_rank().is_dynamic() {
            return Err(RuntimeError::Unsupported(
                "model input has a dynamic rank".to_string(),
            ));
        }

        let bounds: Vec<(i64, i64)> = partial
            .get_dimensions()
            .iter()
            .map(|d| (d.get_min(), d.get_max()))
            .collect();
        if !admits(&bounds, shape) {
            return Err(RuntimeError::Unsupported(format!(
                "input {:?} cannot take shape {:?}",
                bounds, shape
            )));
        }

        // A static input already has the shape
        model.bound_shape = partial.is_dynamic().then_some(shape);
        Ok(())
    }

    fn compile(
        &mut self,
        model: &Self::Model,
        priorities: &[&str],
        hints: &CompileHints,
    ) -> Result<Self::Compiled, RuntimeError> {
        let target = device(&hints.execution_device);
        let properties = [
            (RwPropertyKey::DevicePriorities, priorities.join(",")),
            (RwPropertyKey::HintPerformanceMode, hints.performance_mode.clone()),
            (RwPropertyKey::HintInferencePrecision, hints.inference_precision.clone()),
        ];
        for (key, value) in &properties {
            self.core
                .set_property(&target, key, value)
                .map_err(|e| RuntimeError::backend("set compile property", e))?;
        }

        debug!(
            "Compiling for {} over [{}]",
            hints.execution_device,
            priorities.join(",")
        );
        let compiled = self
            .core
            .compile_model(&model.model, target)
            .map_err(|e| RuntimeError::backend("compile model", e))?;

        Ok(OpenVinoCompiled {
            compiled,
            bound_shape: model.bound_shape,
        })
    }
}

impl CompiledArtifact for OpenVinoCompiled {
    type Request = OpenVinoRequest;

    fn create_request(&mut self) -> Result<Self::Request, RuntimeError> {
        let mut request = self
            .compiled
            .create_infer_request()
            .map_err(|e| RuntimeError::backend("create infer request", e))?;

        let input = match self.bound_shape {
            Some([n, c, h, w]) => {
                let shape = Shape::new(&[n as i64, c as i64, h as i64, w as i64])
                    .map_err(|e| RuntimeError::backend("create input shape", e))?;
                let tensor = Tensor::new(ElementType::F32, &shape)
                    .map_err(|e| RuntimeError::backend("allocate input tensor", e))?;
                request
                    .set_input_tensor(&tensor)
                    .map_err(|e| RuntimeError::backend("bind input tensor", e))?;
                tensor
            }
            None => request
                .get_input_tensor()
                .map_err(|e| RuntimeError::backend("get input tensor", e))?,
        };

        Ok(OpenVinoRequest { request, input })
    }

    fn output_count(&self) -> Result<usize, RuntimeError> {
        self.compiled
            .get_output_size()
            .map_err(|e| RuntimeError::backend("get output count", e))
    }

    fn output_shape(&self) -> Result<Vec<usize>, RuntimeError> {
        let partial = self
            .compiled
            .get_output()
            .and_then(|output| output.get_partial_shape())
            .map_err(|e| RuntimeError::backend("get output shape", e))?;
        if partial.get_rank().is_dynamic() {
            return Err(RuntimeError::Unsupported(
                "model output has a dynamic rank".to_string(),
            ));
        }
        Ok(partial
            .get_dimensions()
            .iter()
            .map(|d| {
                if d.is_dynamic() {
                    0
                } else {
                    usize::try_from(d.get_min()).unwrap_or(0)
                }
            })
            .collect())
    }
}

impl InferRequest for OpenVinoRequest {
    fn input_shape(&self) -> Result<[usize; 4], RuntimeError> {
        let shape = self
            .input
            .get_shape()
            .map_err(|e| RuntimeError::backend("get input shape", e))?;
        nchw(shape.get_dimensions())
    }

    fn input_data(&self) -> Result<&[f32], RuntimeError> {
        self.input
            .get_data::<f32>()
            .map_err(|e| RuntimeError::backend("read input tensor", e))
    }

    fn input_data_mut(&mut self) -> Result<&mut [f32], RuntimeError> {
        self.input
            .get_data_mut::<f32>()
            .map_err(|e| RuntimeError::backend("write input tensor", e))
    }

    fn infer(&mut self) -> Result<(), RuntimeError> {
        self.request
            .infer()
            .map_err(|e| RuntimeError::backend("infer", e))
    }

    fn output_data(&self) -> Result<Vec<f32>, RuntimeError> {
        let output = self
            .request
            .get_output_tensor()
            .map_err(|e| RuntimeError::backend("get output tensor", e))?;
        let data = output
            .get_data::<f32>()
            .map_err(|e| RuntimeError::backend("read output tensor", e))?;
        Ok(data.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNBOUNDED: (i64, i64) = (0, -1);

    #[test]
    fn test_admits_static_input_only_at_its_shape() {
        let bounds = [(1, 1), (3, 3), (224, 224), (224, 224)];
        assert!(admits(&bounds, [1, 3, 224, 224]));
        assert!(!admits(&bounds, [1, 3, 240, 320]));
    }

    #[test]
    fn test_dynamic_batch_keeps_spatial_dims_fixed() {
        let bounds = [UNBOUNDED, (3, 3), (224, 224), (224, 224)];
        assert!(admits(&bounds, [1, 3, 224, 224]));
        assert!(!admits(&bounds, [1, 3, 240, 320]));
    }

    #[test]
    fn test_dynamic_spatial_dims() {
        let bounds = [(1, 1), (3, 3), UNBOUNDED, UNBOUNDED];
        assert!(admits(&bounds, [1, 3, 240, 320]));

        let bounded = [(1, 1), (3, 3), (32, 512), (32, 512)];
        assert!(admits(&bounded, [1, 3, 512, 32]));
        assert!(!admits(&bounded, [1, 3, 640, 480]));
        assert!(!admits(&bounded, [1, 3, 16, 64]));
    }

    #[test]
    fn test_rank_must_match() {
        assert!(!admits(&[(1, 1), (3, 3), (224, 224)], [1, 3, 224, 224]));
        assert!(!admits(&[], [1, 3, 224, 224]));
    }
}
