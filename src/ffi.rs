//! C boundary
//!
//! Exports the classifier as a handful of synchronous `extern "C"` calls.
//! The host owns no state: one [`Classifier`] lives behind a process-wide
//! mutex and is created on first use. Every call returns a status code or a
//! sentinel; nothing unwinds across the boundary.

use std::ffi::{c_char, c_int, CStr, CString};
use std::fmt::Display;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::ptr;

use parking_lot::Mutex;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::engine::postprocess::{INFERENCE_FAILED, NOT_READY};
use crate::engine::preprocess::frame_len;
use crate::engine::Resolution;
use crate::error::ErrorKind;
use crate::runtime::{InferenceRuntime, OpenVinoRuntime};
use crate::service::Classifier;

static BRIDGE: Mutex<BridgeSlot<Bridge<OpenVinoRuntime>>> =
    parking_lot::const_mutex(BridgeSlot::empty());

/// Lazily created bridge. A failed creation is remembered and not retried.
pub(crate) struct BridgeSlot<B> {
    bridge: Option<B>,
    init_error: Option<CString>,
}

impl<B> BridgeSlot<B> {
    pub(crate) const fn empty() -> Self {
        Self {
            bridge: None,
            init_error: None,
        }
    }

    pub(crate) fn get_or_init(
        &mut self,
        init: impl FnOnce() -> anyhow::Result<B>,
    ) -> Option<&mut B> {
        if self.bridge.is_none() && self.init_error.is_none() {
            match init() {
                Ok(bridge) => self.bridge = Some(bridge),
                Err(e) => {
                    error!("Failed to initialize classifier: {:#}", e);
                    self.init_error = CString::new(format!("{:#}", e)).ok();
                }
            }
        }
        self.bridge.as_mut()
    }

    pub(crate) fn init_error(&self) -> *const c_char {
        self.init_error.as_ref().map_or(ptr::null(), |e| e.as_ptr())
    }
}

/// Classifier plus the C strings handed out to the host
pub(crate) struct Bridge<R: InferenceRuntime> {
    classifier: Classifier<R>,
    device_names: Vec<CString>,
    last_error: Option<CString>,
}

impl<R: InferenceRuntime> Bridge<R> {
    pub(crate) fn new(classifier: Classifier<R>) -> Self {
        Self {
            classifier,
            device_names: Vec::new(),
            last_error: None,
        }
    }

    fn record_error(&mut self, err: impl Display) {
        self.last_error = CString::new(err.to_string()).ok();
    }

    /// Re-enumerate devices; invalidates names handed out earlier
    pub(crate) fn device_count(&mut self) -> c_int {
        match self.classifier.enumerate_devices() {
            Ok(devices) => {
                self.device_names = devices
                    .iter()
                    .map(|d| CString::new(d.as_str()).unwrap_or_default())
                    .collect();
                self.device_names.len() as c_int
            }
            Err(e) => {
                error!("Device enumeration failed: {}", e);
                self.device_names.clear();
                self.record_error(e);
                0
            }
        }
    }

    pub(crate) fn device_name(&self, index: c_int) -> *const c_char {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.device_names.get(i))
            .map_or(ptr::null(), |name| name.as_ptr())
    }

    /// Load a model; `size` holds the requested (width, height) and receives
    /// the effective one.
    pub(crate) fn load_model(&mut self, path: &Path, device: c_int, size: &mut [c_int; 2]) -> c_int {
        let (width, height) = match (usize::try_from(size[0]), usize::try_from(size[1])) {
            (Ok(w), Ok(h)) if w > 0 && h > 0 => (w, h),
            _ => {
                self.record_error(format!("invalid input size {}x{}", size[0], size[1]));
                return ErrorKind::InvalidArgument.code();
            }
        };
        let Ok(device) = usize::try_from(device) else {
            self.record_error(format!(
                "device index {} out of range ({} devices enumerated)",
                device,
                self.classifier.devices().len()
            ));
            return ErrorKind::IndexOutOfRange.code();
        };

        match self
            .classifier
            .load_model(path, device, Resolution::new(width, height))
        {
            Ok(outcome) => {
                size[0] = outcome.resolution.width as c_int;
                size[1] = outcome.resolution.height as c_int;
                outcome.status.code()
            }
            Err(e) => {
                error!("Model load failed: {}", e);
                let code = e.kind().code();
                self.record_error(e);
                code
            }
        }
    }

    /// Byte length the next frame must have, if a model is loaded
    pub(crate) fn expected_frame_len(&self) -> Option<usize> {
        self.classifier
            .resolution()
            .map(|r| frame_len(r.width, r.height))
    }

    pub(crate) fn perform_inference(&mut self, pixels: &[u8]) -> c_int {
        match self.classifier.infer(pixels) {
            Ok(class_idx) => class_idx as c_int,
            Err(e) => {
                let code = e.kind().code();
                if code == INFERENCE_FAILED {
                    error!("Inference failed: {}", e);
                }
                self.record_error(e);
                code
            }
        }
    }

    pub(crate) fn class_count(&self) -> c_int {
        self.classifier
            .class_count()
            .map_or(NOT_READY, |n| n as c_int)
    }

    pub(crate) fn last_error(&self) -> *const c_char {
        self.last_error.as_ref().map_or(ptr::null(), |e| e.as_ptr())
    }
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    // The host may already have installed a subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn create_bridge() -> anyhow::Result<Bridge<OpenVinoRuntime>> {
    let config = Config::load_or_default();
    init_logging(&config);

    let runtime = OpenVinoRuntime::new()?;
    info!("OpenVINO runtime initialized");
    Ok(Bridge::new(Classifier::new(runtime, &config)))
}

/// Run `f` against the process-wide bridge, creating it on first use.
///
/// Returns `fallback` if the runtime could not be created or `f` panics.
fn with_bridge<T>(fallback: T, f: impl FnOnce(&mut Bridge<OpenVinoRuntime>) -> T) -> T {
    let result = catch_unwind(AssertUnwindSafe(|| {
        BRIDGE.lock().get_or_init(create_bridge).map(f)
    }));

    match result {
        Ok(Some(value)) => value,
        Ok(None) => fallback,
        Err(_) => {
            error!("Panic caught at the C boundary");
            fallback
        }
    }
}

/// Number of usable devices. Refreshes the list `ovc_device_name` indexes.
#[no_mangle]
pub extern "C" fn ovc_device_count() -> c_int {
    with_bridge(0, |bridge| bridge.device_count())
}

/// Name of device `index`, or null when out of range.
///
/// The pointer stays valid until the next `ovc_device_count` call.
#[no_mangle]
pub extern "C" fn ovc_device_name(index: c_int) -> *const c_char {
    if index < 0 {
        return ptr::null();
    }
    with_bridge(ptr::null(), |bridge| bridge.device_name(index))
}

/// Load a model for device `device`.
///
/// `size` points to two ints: requested width and height on input, the
/// effective resolution on successful return. Returns `0`, `2` for a load at
/// the model's default resolution, or an error code.
///
/// # Safety
///
/// `path` must be a NUL-terminated string and `size` must point to two
/// writable ints, or either may be null.
#[no_mangle]
pub unsafe extern "C" fn ovc_load_model(path: *const c_char, device: c_int, size: *mut c_int) -> c_int {
    if path.is_null() || size.is_null() {
        return ErrorKind::InvalidArgument.code();
    }
    let Ok(path) = CStr::from_ptr(path).to_str() else {
        return ErrorKind::InvalidArgument.code();
    };
    let size = &mut *(size as *mut [c_int; 2]);

    with_bridge(ErrorKind::InvalidArgument.code(), |bridge| {
        bridge.load_model(Path::new(path), device, size)
    })
}

/// Classify one RGBA frame at the effective resolution.
///
/// Returns the class index, `-1` if no model is loaded or `-2` on failure.
///
/// # Safety
///
/// `pixels` must point to `width * height * 4` readable bytes of the
/// effective resolution, or be null.
#[no_mangle]
pub unsafe extern "C" fn ovc_perform_inference(pixels: *const u8) -> c_int {
    with_bridge(INFERENCE_FAILED, |bridge| {
        let Some(len) = bridge.expected_frame_len() else {
            return bridge.perform_inference(&[]);
        };
        if pixels.is_null() {
            bridge.record_error("null pixel buffer");
            return INFERENCE_FAILED;
        }
        let frame = std::slice::from_raw_parts(pixels, len);
        bridge.perform_inference(frame)
    })
}

/// Class count of the live model, or `-1` if none is loaded.
#[no_mangle]
pub extern "C" fn ovc_class_count() -> c_int {
    with_bridge(NOT_READY, |bridge| bridge.class_count())
}

/// Message of the most recent failure, or null.
///
/// The pointer stays valid until the next failing call.
#[no_mangle]
pub extern "C" fn ovc_last_error() -> *const c_char {
    catch_unwind(|| {
        let slot = BRIDGE.lock();
        match &slot.bridge {
            Some(bridge) => bridge.last_error(),
            None => slot.init_error(),
        }
    })
    .unwrap_or(ptr::null())
}
