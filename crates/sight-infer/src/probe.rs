//! Backend capability probe.
//!
//! The probe runs once per process. [`probe_device`] turns the raw device
//! facts into descriptors ordered GPU, SIMD CPU, scalar CPU; scalar CPU is
//! always present and always available.

use crate::backend::{BackendDescriptor, BackendKind};
use std::sync::OnceLock;

/// Raw facts about the running device.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceInfo {
    pub logical_cores: usize,
    /// Instruction-set extensions usable by SIMD kernels, e.g. `neon`, `avx2`.
    /// Empty when no SIMD kernels are compiled in.
    pub simd: Vec<String>,
    /// Accelerator APIs the execution library reports as usable.
    pub gpu_apis: Vec<String>,
}

impl DeviceInfo {
    pub fn detect() -> Self {
        let info = Self {
            logical_cores: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            simd: if crate::backends::onnx::simd_provider_available() {
                detect_simd()
            } else {
                Vec::new()
            },
            gpu_apis: crate::backends::onnx::available_gpu_apis(),
        };
        log::debug!("device info: {:?}", info);
        info
    }
}

#[cfg(target_arch = "x86_64")]
fn detect_simd() -> Vec<String> {
    let mut found = Vec::new();
    if is_x86_feature_detected!("avx512f") {
        found.push("avx512f".to_string());
    }
    if is_x86_feature_detected!("avx2") {
        found.push("avx2".to_string());
    }
    if is_x86_feature_detected!("sse4.1") {
        found.push("sse4.1".to_string());
    }
    found
}

#[cfg(target_arch = "aarch64")]
fn detect_simd() -> Vec<String> {
    // NEON is mandatory on AArch64
    vec!["neon".to_string()]
}

#[cfg(all(target_arch = "wasm32", target_feature = "simd128"))]
fn detect_simd() -> Vec<String> {
    vec!["simd128".to_string()]
}

#[cfg(not(any(
    target_arch = "x86_64",
    target_arch = "aarch64",
    all(target_arch = "wasm32", target_feature = "simd128")
)))]
fn detect_simd() -> Vec<String> {
    Vec::new()
}

/// Descriptors for every backend kind in priority order.
pub fn probe_device(info: &DeviceInfo) -> Vec<BackendDescriptor> {
    let cores = info.logical_cores.max(1);

    let gpu = BackendDescriptor::new(BackendKind::Gpu, !info.gpu_apis.is_empty(), info.gpu_apis.clone());

    let mut simd_caps = info.simd.clone();
    simd_caps.push(format!("threads={cores}"));
    let simd = BackendDescriptor::new(BackendKind::CpuSimd, !info.simd.is_empty(), simd_caps);

    let cpu = BackendDescriptor::new(
        BackendKind::Cpu,
        true,
        vec!["scalar".to_string(), "threads=1".to_string()],
    );

    vec![gpu, simd, cpu]
}

static DEVICE: OnceLock<DeviceInfo> = OnceLock::new();
static PROBED: OnceLock<Vec<BackendDescriptor>> = OnceLock::new();

/// Device facts, detected once per process.
pub fn device_info() -> &'static DeviceInfo {
    DEVICE.get_or_init(DeviceInfo::detect)
}

/// Probe the running device, once per process.
pub fn probe() -> &'static [BackendDescriptor] {
    PROBED.get_or_init(|| {
        let descriptors = probe_device(device_info());
        for d in &descriptors {
            log::info!(
                "backend {}: available={} [{}]",
                d.kind,
                d.available,
                d.capabilities.join(", ")
            );
        }
        descriptors
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(descriptors: &[BackendDescriptor]) -> Vec<BackendKind> {
        descriptors.iter().map(|d| d.kind).collect()
    }

    #[test]
    fn test_order_is_gpu_simd_cpu() {
        let info = DeviceInfo {
            logical_cores: 8,
            simd: vec!["neon".to_string()],
            gpu_apis: vec!["nnapi".to_string()],
        };
        let descriptors = probe_device(&info);
        assert_eq!(kinds(&descriptors), vec![BackendKind::Gpu, BackendKind::CpuSimd, BackendKind::Cpu]);
        assert!(descriptors.iter().all(|d| d.available));
        assert_eq!(descriptors[0].capabilities, vec!["nnapi"]);
        assert!(descriptors[1].capabilities.contains(&"threads=8".to_string()));
    }

    #[test]
    fn test_bare_device_still_has_cpu() {
        let descriptors = probe_device(&DeviceInfo::default());
        assert!(!descriptors.is_empty());
        assert!(!descriptors[0].available);
        assert!(!descriptors[1].available);
        let cpu = descriptors.last().unwrap();
        assert_eq!(cpu.kind, BackendKind::Cpu);
        assert!(cpu.available);
    }

    #[cfg(not(feature = "xnnpack"))]
    #[test]
    fn test_simd_unavailable_without_xnnpack() {
        let info = DeviceInfo::detect();
        assert!(info.simd.is_empty());
        let simd = &probe_device(&info)[1];
        assert_eq!(simd.kind, BackendKind::CpuSimd);
        assert!(!simd.available);
    }

    #[test]
    fn test_probe_is_cached() {
        let first = probe();
        let second = probe();
        assert!(std::ptr::eq(first, second));
        assert!(first.iter().any(|d| d.kind == BackendKind::Cpu && d.available));
        assert!(device_info().logical_cores >= 1);
    }
}
