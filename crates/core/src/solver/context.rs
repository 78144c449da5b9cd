//! GPU context and initialization
//!
//! This module handles GPU device initialization and capability detection.
//! It distinguishes between "no GPU found" (expected on headless machines and CI)
//! and "GPU found but failed to initialize" (usually a driver problem).

/// Result of GPU initialization attempt
///
/// - `NoGpuFound`: No compatible GPU adapter (silent fallback to CPU)
/// - `InitFailed`: GPU found but initialization failed (log warning)
#[derive(Debug)]
pub enum GpuInitResult {
    /// GPU initialized successfully
    #[cfg(feature = "gpu")]
    Success(GpuContext),
    /// No GPU adapter found
    NoGpuFound,
    /// GPU found but device creation failed
    InitFailed {
        /// Name of the adapter that failed
        adapter_name: String,
        /// Error message
        error: String,
    },
}

#[cfg(feature = "gpu")]
mod gpu_impl {
    use super::GpuInitResult;
    use crate::grid::GridDims;
    use crate::solver::r#trait::FIELD_COUNT;
    use tracing::{debug, info};

    /// GPU context managing device and queue
    #[derive(Debug)]
    pub struct GpuContext {
        device: wgpu::Device,
        queue: wgpu::Queue,
        adapter_info: wgpu::AdapterInfo,
    }

    impl GpuContext {
        /// Initialize GPU context
        ///
        /// # Returns
        ///
        /// - `GpuInitResult::Success` - GPU ready to use
        /// - `GpuInitResult::NoGpuFound` - No compatible GPU adapter
        /// - `GpuInitResult::InitFailed` - GPU found but initialization failed
        #[allow(clippy::new_ret_no_self)]
        pub fn new() -> GpuInitResult {
            info!("Attempting to initialize GPU context");

            let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
                backends: wgpu::Backends::all(),
                ..Default::default()
            });

            let adapter = if let Some(a) =
                pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::HighPerformance,
                    compatible_surface: None,
                    force_fallback_adapter: false,
                })) {
                debug!("Found GPU adapter: {}", a.get_info().name);
                a
            } else {
                debug!("No GPU adapter found");
                return GpuInitResult::NoGpuFound;
            };

            let adapter_info = adapter.get_info();
            let adapter_name = adapter_info.name.clone();

            // Device creation can fail even with a valid adapter
            match pollster::block_on(adapter.request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Stable Fluids GPU"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )) {
                Ok((device, queue)) => {
                    info!("GPU context initialized successfully: {}", adapter_name);
                    GpuInitResult::Success(Self {
                        device,
                        queue,
                        adapter_info,
                    })
                }
                Err(e) => {
                    debug!("Failed to create GPU device: {}", e);
                    GpuInitResult::InitFailed {
                        adapter_name,
                        error: e.to_string(),
                    }
                }
            }
        }

        /// Get adapter name for logging
        #[must_use]
        pub fn adapter_name(&self) -> &str {
            &self.adapter_info.name
        }

        /// Check if the device can hold every field of a grid
        ///
        /// Each field is one storage buffer, so a single field must fit the
        /// per-binding limit, and all of them together (plus the readback staging
        /// buffer) must stay within one `max_buffer_size`.
        ///
        /// # Arguments
        ///
        /// * `dims` - Grid dimensions
        ///
        /// # Returns
        ///
        /// `true` if GPU can likely allocate the required memory
        #[must_use]
        pub fn can_allocate(&self, dims: GridDims) -> bool {
            let limits = self.device.limits();
            fits_device_limits(
                dims.field_bytes() as u64,
                u64::from(limits.max_storage_buffer_binding_size),
                limits.max_buffer_size,
            )
        }

        /// Get reference to wgpu device
        #[must_use]
        pub fn device(&self) -> &wgpu::Device {
            &self.device
        }

        /// Get reference to wgpu queue
        #[must_use]
        pub fn queue(&self) -> &wgpu::Queue {
            &self.queue
        }
    }

    /// Field-size budget behind [`GpuContext::can_allocate`]
    fn fits_device_limits(field_bytes: u64, max_binding: u64, max_buffer: u64) -> bool {
        let total_bytes = field_bytes.saturating_mul(FIELD_COUNT as u64 + 1);
        field_bytes <= max_binding && total_bytes <= max_buffer
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_all_fields_must_fit_one_buffer_limit() {
            let per_field = 1000;
            let total = per_field * (FIELD_COUNT as u64 + 1);
            assert!(fits_device_limits(per_field, per_field, total));
            assert!(!fits_device_limits(per_field, per_field, total - 1));
            assert!(!fits_device_limits(per_field, per_field - 1, total));
        }

        #[test]
        fn test_gpu_init_returns_valid_result() {
            // Which variant comes back depends on the machine
            match GpuContext::new() {
                GpuInitResult::Success(ctx) => {
                    assert!(!ctx.adapter_name().is_empty());
                }
                GpuInitResult::NoGpuFound => {}
                GpuInitResult::InitFailed {
                    adapter_name,
                    error,
                } => {
                    assert!(!adapter_name.is_empty());
                    assert!(!error.is_empty());
                }
            }
        }

        #[test]
        fn test_can_allocate() {
            if let GpuInitResult::Success(ctx) = GpuContext::new() {
                assert!(ctx.can_allocate(GridDims::new(64)));
                // 16384² f32 cells is 1 GiB per field, beyond the default binding limit
                assert!(!ctx.can_allocate(GridDims::new(16384)));
            }
        }
    }
}

#[cfg(feature = "gpu")]
pub use gpu_impl::GpuContext;
