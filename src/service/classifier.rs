//! Classifier - owns the runtime and the live session
//!
//! One `Classifier` holds one live model. A successful load replaces the
//! whole session at once; a failed load leaves it as it was.

use std::path::Path;

use tracing::{debug, error, warn};

use crate::config::Config;
use crate::engine::postprocess::{softmax, INFERENCE_FAILED, NOT_READY};
use crate::engine::{DeviceRegistry, InferenceSession, LoadOutcome, ModelLoader, Resolution};
use crate::error::{ClassifierError, LoadError};
use crate::runtime::InferenceRuntime;

use super::types::Prediction;

pub struct Classifier<R: InferenceRuntime> {
    runtime: R,
    registry: DeviceRegistry,
    loader: ModelLoader,
    session: Option<InferenceSession<R::Compiled, R::Request>>,
    last_prediction: i32,
}

impl<R: InferenceRuntime> Classifier<R> {
    pub fn new(runtime: R, config: &Config) -> Self {
        Self {
            runtime,
            registry: DeviceRegistry::new(&config.runtime.excluded_device_marker),
            loader: ModelLoader::from_config(config),
            session: None,
            last_prediction: NOT_READY,
        }
    }

    /// Refresh the device list; indices refer to this list until the next call
    pub fn enumerate_devices(&mut self) -> Result<&[String], ClassifierError> {
        self.registry
            .enumerate(&self.runtime)
            .map_err(ClassifierError::Enumeration)
    }

    pub fn devices(&self) -> &[String] {
        self.registry.devices()
    }

    pub fn device_name(&self, index: usize) -> Result<&str, ClassifierError> {
        self.registry.name_at(index)
    }

    /// Load a model and make it the live session
    pub fn load_model(
        &mut self,
        path: &Path,
        device_index: usize,
        requested: Resolution,
    ) -> Result<LoadOutcome, LoadError> {
        let (session, outcome) = self.loader.load(
            &mut self.runtime,
            &self.registry,
            path,
            device_index,
            requested,
        )?;

        if self.session.replace(session).is_some() {
            debug!("Replaced previous model session");
        }
        self.last_prediction = NOT_READY;
        Ok(outcome)
    }

    /// Classify one RGBA frame at the effective resolution
    pub fn infer(&mut self, pixels: &[u8]) -> Result<usize, ClassifierError> {
        let session = self.session.as_mut().ok_or(ClassifierError::NotReady)?;
        match session.classify(pixels) {
            Ok(class_idx) => {
                self.last_prediction = class_idx as i32;
                Ok(class_idx)
            }
            Err(e) => {
                self.last_prediction = INFERENCE_FAILED;
                Err(e)
            }
        }
    }

    /// Classify and attach the softmax confidence of the winning class
    pub fn classify(&mut self, pixels: &[u8]) -> Result<Prediction, ClassifierError> {
        let class_index = self.infer(pixels)?;
        let scores = self.session.as_ref().map(|s| s.scores()).unwrap_or_default();
        let confidence = softmax(scores).get(class_index).copied().unwrap_or(0.0);
        Ok(Prediction {
            class_index,
            confidence,
        })
    }

    /// Boundary form of [`Classifier::infer`]: class index, `-1` or `-2`
    pub fn predict(&mut self, pixels: &[u8]) -> i32 {
        match self.infer(pixels) {
            Ok(class_idx) => class_idx as i32,
            Err(ClassifierError::NotReady) => {
                warn!("Inference requested before a model was loaded");
                NOT_READY
            }
            Err(e) => {
                error!("Inference failed: {}", e);
                INFERENCE_FAILED
            }
        }
    }

    pub fn last_prediction(&self) -> i32 {
        self.last_prediction
    }

    pub fn is_ready(&self) -> bool {
        self.session.is_some()
    }

    pub fn resolution(&self) -> Option<Resolution> {
        self.session.as_ref().map(|s| s.resolution())
    }

    pub fn class_count(&self) -> Option<usize> {
        self.session.as_ref().map(|s| s.class_count())
    }

    pub fn session(&self) -> Option<&InferenceSession<R::Compiled, R::Request>> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut InferenceSession<R::Compiled, R::Request>> {
        self.session.as_mut()
    }
}
