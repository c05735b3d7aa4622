//! Scriptable in-memory runtime for unit tests.
//!
//! Models are registered by path. Inference produces one score per class:
//! class `k` scores the mean of input channel `k % channels`, so the
//! predicted class follows the dominant color of the frame.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::{CompileHints, CompiledArtifact, InferRequest, InferenceRuntime};
use crate::error::RuntimeError;

#[derive(Debug, Clone)]
pub struct ModelFixture {
    /// NCHW input shape the model file declares
    pub input: [usize; 4],
    pub classes: usize,
    pub outputs: usize,
    /// Input shapes the model accepts on reshape
    pub accepts: Vec<[usize; 4]>,
}

impl ModelFixture {
    pub fn new(width: usize, height: usize, classes: usize) -> Self {
        Self {
            input: [1, 3, height, width],
            classes,
            outputs: 1,
            accepts: Vec::new(),
        }
    }

    pub fn accepting(mut self, width: usize, height: usize) -> Self {
        self.accepts.push([1, 3, height, width]);
        self
    }
}

#[derive(Default)]
pub struct FakeRuntime {
    pub devices: Vec<String>,
    pub models: HashMap<PathBuf, ModelFixture>,
    pub cache_dirs: Vec<(String, PathBuf)>,
    pub fail_cache_dir: bool,
    pub fail_compile_on: Option<String>,
    pub fail_request: bool,
    pub fail_enumerate: bool,
    pub compiled: Vec<(Vec<String>, CompileHints)>,
}

impl FakeRuntime {
    pub fn with_devices(devices: &[&str]) -> Self {
        Self {
            devices: devices.iter().map(|d| d.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn add_model(&mut self, path: &str, fixture: ModelFixture) {
        self.models.insert(PathBuf::from(path), fixture);
    }
}

pub struct FakeModel {
    fixture: ModelFixture,
    shape: [usize; 4],
}

pub struct FakeCompiled {
    fixture: ModelFixture,
    shape: [usize; 4],
    fail_request: bool,
}

#[derive(Debug)]
pub struct FakeRequest {
    pub shape: [usize; 4],
    pub classes: usize,
    pub input: Vec<f32>,
    /// Empty until the first forward pass
    pub output: Vec<f32>,
    pub fail_infer: bool,
    pub infer_calls: usize,
}

impl InferenceRuntime for FakeRuntime {
    type Model = FakeModel;
    type Compiled = FakeCompiled;
    type Request = FakeRequest;

    fn available_devices(&self) -> Result<Vec<String>, RuntimeError> {
        if self.fail_enumerate {
            return Err(RuntimeError::backend("get available devices", "no plugins"));
        }
        Ok(self.devices.clone())
    }

    fn set_cache_dir(&mut self, device: &str, dir: &Path) -> Result<(), RuntimeError> {
        if self.fail_cache_dir {
            return Err(RuntimeError::backend("set cache dir", "read-only"));
        }
        self.cache_dirs.push((device.to_string(), dir.to_path_buf()));
        Ok(())
    }

    fn read_model(&mut self, path: &Path) -> Result<Self::Model, RuntimeError> {
        let fixture = self
            .models
            .get(path)
            .cloned()
            .ok_or_else(|| RuntimeError::backend("read model", "cannot parse model file"))?;
        Ok(FakeModel {
            shape: fixture.input,
            fixture,
        })
    }

    fn reshape(&mut self, model: &mut Self::Model, shape: [usize; 4]) -> Result<(), RuntimeError> {
        if shape == model.fixture.input || model.fixture.accepts.contains(&shape) {
            model.shape = shape;
            Ok(())
        } else {
            Err(RuntimeError::backend("reshape", "incompatible input shape"))
        }
    }

    fn compile(
        &mut self,
        model: &Self::Model,
        priorities: &[&str],
        hints: &CompileHints,
    ) -> Result<Self::Compiled, RuntimeError> {
        if let Some(bad) = &self.fail_compile_on {
            if priorities.contains(&bad.as_str()) {
                return Err(RuntimeError::backend("compile model", "device plugin crashed"));
            }
        }
        self.compiled.push((
            priorities.iter().map(|p| p.to_string()).collect(),
            hints.clone(),
        ));
        Ok(FakeCompiled {
            fixture: model.fixture.clone(),
            shape: model.shape,
            fail_request: self.fail_request,
        })
    }
}

impl CompiledArtifact for FakeCompiled {
    type Request = FakeRequest;

    fn create_request(&mut self) -> Result<Self::Request, RuntimeError> {
        if self.fail_request {
            return Err(RuntimeError::backend("create infer request", "out of memory"));
        }
        let len = self.shape.iter().product();
        Ok(FakeRequest {
            shape: self.shape,
            classes: self.fixture.classes,
            input: vec![0.0; len],
            output: Vec::new(),
            fail_infer: false,
            infer_calls: 0,
        })
    }

    fn output_count(&self) -> Result<usize, RuntimeError> {
        Ok(self.fixture.outputs)
    }

    fn output_shape(&self) -> Result<Vec<usize>, RuntimeError> {
        Ok(vec![1, self.fixture.classes])
    }
}

impl InferRequest for FakeRequest {
    fn input_shape(&self) -> Result<[usize; 4], RuntimeError> {
        Ok(self.shape)
    }

    fn input_data(&self) -> Result<&[f32], RuntimeError> {
        Ok(&self.input)
    }

    fn input_data_mut(&mut self) -> Result<&mut [f32], RuntimeError> {
        Ok(&mut self.input)
    }

    fn infer(&mut self) -> Result<(), RuntimeError> {
        self.infer_calls += 1;
        if self.fail_infer {
            return Err(RuntimeError::backend("infer", "device lost"));
        }
        let [_, channels, height, width] = self.shape;
        let plane = height * width;
        self.output = (0..self.classes)
            .map(|k| {
                let c = k % channels;
                let sum: f32 = self.input[c * plane..(c + 1) * plane].iter().sum();
                sum / plane as f32
            })
            .collect();
        Ok(())
    }

    fn output_data(&self) -> Result<Vec<f32>, RuntimeError> {
        Ok(self.output.clone())
    }
}
