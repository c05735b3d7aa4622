//! Device registry
//!
//! Holds the device list from the most recent enumeration. Load requests
//! address devices by their position in this list.

use tracing::debug;

use crate::error::{ClassifierError, RuntimeError};
use crate::runtime::InferenceRuntime;

#[derive(Debug, Clone)]
pub struct DeviceRegistry {
    devices: Vec<String>,
    excluded_marker: String,
}

impl DeviceRegistry {
    /// Create an empty registry that filters out devices containing `excluded_marker`
    pub fn new(excluded_marker: &str) -> Self {
        Self {
            devices: Vec::new(),
            excluded_marker: excluded_marker.to_string(),
        }
    }

    /// Query the runtime and replace the cached list.
    ///
    /// On failure the previous list is cleared, so stale indices never
    /// resolve to a device the runtime no longer reports.
    pub fn enumerate<R: InferenceRuntime>(&mut self, runtime: &R) -> Result<&[String], RuntimeError> {
        self.devices.clear();

        let reported = runtime.available_devices()?;
        let total = reported.len();
        self.devices = reported
            .into_iter()
            .filter(|name| !self.is_excluded(name))
            .collect();

        debug!(
            "Enumerated {} devices ({} excluded): {:?}",
            self.devices.len(),
            total - self.devices.len(),
            self.devices
        );
        Ok(&self.devices)
    }

    fn is_excluded(&self, name: &str) -> bool {
        !self.excluded_marker.is_empty() && name.contains(&self.excluded_marker)
    }

    pub fn name_at(&self, index: usize) -> Result<&str, ClassifierError> {
        self.devices
            .get(index)
            .map(String::as_str)
            .ok_or(ClassifierError::IndexOutOfRange {
                index,
                available: self.devices.len(),
            })
    }

    pub fn devices(&self) -> &[String] {
        &self.devices
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::fake::FakeRuntime;

    #[test]
    fn test_excludes_marker_and_keeps_order() {
        let runtime = FakeRuntime::with_devices(&["CPU", "GNA", "GPU.0", "GNA_SW", "GPU.1"]);
        let mut registry = DeviceRegistry::new("GNA");

        let devices = registry.enumerate(&runtime).unwrap();
        assert_eq!(devices, ["CPU", "GPU.0", "GPU.1"]);
        assert!(registry.devices().iter().all(|d| !d.contains("GNA")));
    }

    #[test]
    fn test_enumerate_replaces_previous_list() {
        let mut runtime = FakeRuntime::with_devices(&["CPU", "GPU"]);
        let mut registry = DeviceRegistry::new("GNA");
        registry.enumerate(&runtime).unwrap();
        registry.enumerate(&runtime).unwrap();
        assert_eq!(registry.len(), 2);

        runtime.devices = vec!["NPU".to_string()];
        registry.enumerate(&runtime).unwrap();
        assert_eq!(registry.devices(), ["NPU"]);
    }

    #[test]
    fn test_enumerate_failure_clears_list() {
        let mut runtime = FakeRuntime::with_devices(&["CPU"]);
        let mut registry = DeviceRegistry::new("GNA");
        registry.enumerate(&runtime).unwrap();

        runtime.fail_enumerate = true;
        assert!(registry.enumerate(&runtime).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_name_at_is_bounds_checked() {
        let runtime = FakeRuntime::with_devices(&["CPU", "GPU"]);
        let mut registry = DeviceRegistry::new("GNA");
        assert!(matches!(
            registry.name_at(0),
            Err(ClassifierError::IndexOutOfRange { index: 0, available: 0 })
        ));

        registry.enumerate(&runtime).unwrap();
        assert_eq!(registry.name_at(1).unwrap(), "GPU");
        assert!(matches!(
            registry.name_at(2),
            Err(ClassifierError::IndexOutOfRange { index: 2, available: 2 })
        ));
    }

    #[test]
    fn test_empty_marker_keeps_everything() {
        let runtime = FakeRuntime::with_devices(&["CPU", "GNA"]);
        let mut registry = DeviceRegistry::new("");
        assert_eq!(registry.enumerate(&runtime).unwrap().len(), 2);
    }
}
