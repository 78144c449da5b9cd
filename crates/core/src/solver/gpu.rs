//! GPU-based compute backend
//!
//! This module provides a GPU implementation of the `ComputeBackend` trait using
//! wgpu compute shaders and storage buffers. This backend is only available when
//! the `gpu` feature is enabled.
//!
//! # Shader Files
//!
//! GPU compute shaders are located in `shaders/`:
//! - `add_source.wgsl` - `x += dt * s` over the whole grid
//! - `relax.wgsl` - One red or black relaxation half pass
//! - `boundary.wgsl` - Ghost border rewrite (`edges`, then `corners`)
//! - `advect.wgsl` - Semi-Lagrangian backtrace with bilinear sampling
//! - `divergence.wgsl` - Velocity divergence, pressure reset
//! - `gradient.wgsl` - Pressure gradient subtraction
//!
//! # Implementation
//!
//! All six fields live in storage buffers for the lifetime of the backend. Each
//! trait call records one command encoder and submits it; kernel parameters go
//! through a small uniform buffer written just before the submit. Field reads
//! copy into a persistent staging buffer and map it.

use std::borrow::Cow;
use std::sync::Mutex;

use bytemuck::{Pod, Zeroable};
use tracing::debug;

use crate::error::BackendError;
use crate::grid::GridDims;

use super::boundary::Boundary;
use super::context::GpuContext;
use super::r#trait::{assert_writes_unaliased, ComputeBackend, FieldId, FieldSlots, FIELD_COUNT};
use super::relaxation::Parity;

/// Workgroup edge for 2D kernels (must match `@workgroup_size` in the shaders)
const WORKGROUP_2D: u32 = 16;
/// Workgroup size for the 1D edge kernel
const WORKGROUP_1D: u32 = 64;

/// Kernel parameters shared by every shader (must match WGSL struct layout)
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
struct KernelParams {
    n: u32,
    stride: u32,
    boundary: u32,
    parity: u32,
    a: f32,
    c: f32,
    dt: f32,
    _padding: f32,
}

/// Bind group layouts, one per binding shape
struct Layouts {
    // params, 1 read-write, 1 read-only (add_source, relax)
    pair: wgpu::BindGroupLayout,
    // params, 1 read-write (boundary)
    single: wgpu::BindGroupLayout,
    // params, d, d0, u, v
    advect: wgpu::BindGroupLayout,
    // params, p, div, u, v
    divergence: wgpu::BindGroupLayout,
    // params, u, v, p
    gradient: wgpu::BindGroupLayout,
}

struct Pipelines {
    add_source: wgpu::ComputePipeline,
    relax: wgpu::ComputePipeline,
    boundary_edges: wgpu::ComputePipeline,
    boundary_corners: wgpu::ComputePipeline,
    advect: wgpu::ComputePipeline,
    divergence: wgpu::ComputePipeline,
    gradient: wgpu::ComputePipeline,
}

/// One compute pass within a submit
struct Dispatch<'a> {
    pipeline: &'a wgpu::ComputePipeline,
    bind_group: &'a wgpu::BindGroup,
    workgroups: (u32, u32),
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Layout with the params uniform at 0, then `read_write` writable buffers,
/// then `read_only` read-only buffers
fn kernel_layout(
    device: &wgpu::Device,
    label: &str,
    read_write: u32,
    read_only: u32,
) -> wgpu::BindGroupLayout {
    let entries: Vec<wgpu::BindGroupLayoutEntry> = std::iter::once(uniform_entry(0))
        .chain((1..=read_write).map(|binding| storage_entry(binding, false)))
        .chain(
            (read_write + 1..=read_write + read_only).map(|binding| storage_entry(binding, true)),
        )
        .collect();

    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &entries,
    })
}

fn compute_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::BindGroupLayout,
    module: &wgpu::ShaderModule,
    entry_point: &str,
) -> wgpu::ComputePipeline {
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[layout],
        push_constant_ranges: &[],
    });

    device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(label),
        layout: Some(&pipeline_layout),
        module,
        entry_point,
        compilation_options: wgpu::PipelineCompilationOptions::default(),
        cache: None,
    })
}

/// GPU compute backend using wgpu compute shaders
pub struct GpuBackend {
    context: GpuContext,
    dims: GridDims,

    // Physical field buffers, addressed through `slots`
    buffers: Vec<wgpu::Buffer>,
    slots: FieldSlots,

    // Staging buffer for CPU readback, locked for the duration of a map
    staging: Mutex<wgpu::Buffer>,

    // Uniform buffers; relaxation needs one per colour in a single submit
    params_buffers: [wgpu::Buffer; 2],
    base_params: KernelParams,

    layouts: Layouts,
    pipelines: Pipelines,
}

impl GpuBackend {
    /// Create a GPU backend with all fields zeroed
    ///
    /// # Arguments
    ///
    /// * `context` - Initialized GPU context
    /// * `dims` - Grid dimensions
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Allocation`] if the device cannot hold the grid
    pub fn new(context: GpuContext, dims: GridDims) -> Result<Self, BackendError> {
        if !context.can_allocate(dims) {
            return Err(BackendError::Allocation {
                bytes: dims.field_bytes() * (FIELD_COUNT + 1),
            });
        }

        let device = context.device();
        let field_size = dims.field_bytes() as u64;

        let buffers: Vec<wgpu::Buffer> = FieldId::ALL
            .iter()
            .map(|field| {
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(&format!("{field:?} Buffer")),
                    size: field_size,
                    usage: wgpu::BufferUsages::STORAGE
                        | wgpu::BufferUsages::COPY_SRC
                        | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                })
            })
            .collect();

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Field Staging"),
            size: field_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let params_size = std::mem::size_of::<KernelParams>() as u64;
        let params_buffers = ["Kernel Params A", "Kernel Params B"].map(|label| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: params_size,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        });

        let layouts = Layouts {
            pair: kernel_layout(device, "Pair Layout", 1, 1),
            single: kernel_layout(device, "Single Layout", 1, 0),
            advect: kernel_layout(device, "Advect Layout", 1, 3),
            divergence: kernel_layout(device, "Divergence Layout", 2, 2),
            gradient: kernel_layout(device, "Gradient Layout", 2, 1),
        };

        let add_source_shader =
            device.create_shader_module(wgpu::include_wgsl!("shaders/add_source.wgsl"));
        let relax_shader = device.create_shader_module(wgpu::include_wgsl!("shaders/relax.wgsl"));
        let boundary_shader =
            device.create_shader_module(wgpu::include_wgsl!("shaders/boundary.wgsl"));
        let advect_shader =
            device.create_shader_module(wgpu::include_wgsl!("shaders/advect.wgsl"));
        let divergence_shader =
            device.create_shader_module(wgpu::include_wgsl!("shaders/divergence.wgsl"));
        let gradient_shader =
            device.create_shader_module(wgpu::include_wgsl!("shaders/gradient.wgsl"));

        let pipelines = Pipelines {
            add_source: compute_pipeline(
                device,
                "Add Source Pipeline",
                &layouts.pair,
                &add_source_shader,
                "main",
            ),
            relax: compute_pipeline(device, "Relax Pipeline", &layouts.pair, &relax_shader, "main"),
            boundary_edges: compute_pipeline(
                device,
                "Boundary Edges Pipeline",
                &layouts.single,
                &boundary_shader,
                "edges",
            ),
            boundary_corners: compute_pipeline(
                device,
                "Boundary Corners Pipeline",
                &layouts.single,
                &boundary_shader,
                "corners",
            ),
            advect: compute_pipeline(
                device,
                "Advect Pipeline",
                &layouts.advect,
                &advect_shader,
                "main",
            ),
            divergence: compute_pipeline(
                device,
                "Divergence Pipeline",
                &layouts.divergence,
                &divergence_shader,
                "main",
            ),
            gradient: compute_pipeline(
                device,
                "Gradient Pipeline",
                &layouts.gradient,
                &gradient_shader,
                "main",
            ),
        };

        debug!(
            "GPU backend allocated {} fields of {}x{} cells on {}",
            FIELD_COUNT,
            dims.stride(),
            dims.stride(),
            context.adapter_name()
        );

        let base_params = KernelParams {
            n: dims.n() as u32,
            stride: dims.stride() as u32,
            ..KernelParams::default()
        };

        Ok(Self {
            context,
            dims,
            buffers,
            slots: FieldSlots::identity(),
            staging: Mutex::new(staging),
            params_buffers,
            base_params,
            layouts,
            pipelines,
        })
    }

    /// Adapter name for logging
    #[must_use]
    pub fn adapter_name(&self) -> &str {
        self.context.adapter_name()
    }

    fn buffer(&self, field: FieldId) -> &wgpu::Buffer {
        &self.buffers[self.slots.physical(field)]
    }

    fn write_params(&self, slot: usize, params: &KernelParams) {
        self.context
            .queue()
            .write_buffer(&self.params_buffers[slot], 0, bytemuck::bytes_of(params));
    }

    /// Bind the params buffer at 0 and `fields` at 1, 2, ...
    fn bind(
        &self,
        label: &str,
        layout: &wgpu::BindGroupLayout,
        params_slot: usize,
        fields: &[FieldId],
    ) -> wgpu::BindGroup {
        let entries: Vec<wgpu::BindGroupEntry<'_>> = std::iter::once(wgpu::BindGroupEntry {
            binding: 0,
            resource: self.params_buffers[params_slot].as_entire_binding(),
        })
        .chain(
            fields
                .iter()
                .zip(1_u32..)
                .map(|(&field, binding)| wgpu::BindGroupEntry {
                    binding,
                    resource: self.buffer(field).as_entire_binding(),
                }),
        )
        .collect();

        self.context
            .device()
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout,
                entries: &entries,
            })
    }

    /// Record each dispatch in its own compute pass and submit them together
    fn submit(&self, label: &str, dispatches: &[Dispatch<'_>]) {
        let mut encoder =
            self.context
                .device()
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some(label),
                });

        for dispatch in dispatches {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(label),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(dispatch.pipeline);
            compute_pass.set_bind_group(0, dispatch.bind_group, &[]);
            compute_pass.dispatch_workgroups(dispatch.workgroups.0, dispatch.workgroups.1, 1);
        }

        self.context.queue().submit(std::iter::once(encoder.finish()));
    }

    /// Workgroups covering the `N x N` interior
    fn interior_workgroups(&self) -> (u32, u32) {
        let groups = (self.dims.n() as u32).div_ceil(WORKGROUP_2D);
        (groups, groups)
    }

    /// Workgroups covering the full `(N + 2) x (N + 2)` grid
    fn full_workgroups(&self) -> (u32, u32) {
        let groups = (self.dims.stride() as u32).div_ceil(WORKGROUP_2D);
        (groups, groups)
    }
}

impl ComputeBackend for GpuBackend {
    fn dims(&self) -> GridDims {
        self.dims
    }

    fn zero(&mut self, field: FieldId) {
        let mut encoder =
            self.context
                .device()
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Zero Field Encoder"),
                });
        encoder.clear_buffer(self.buffer(field), 0, None);
        self.context.queue().submit(std::iter::once(encoder.finish()));
    }

    fn scatter(&mut self, field: FieldId, values: &[(usize, f32)]) {
        let len = self.dims.cell_count();
        let buffer = self.buffer(field);
        for &(idx, value) in values {
            assert!(idx < len, "Scatter index {idx} outside field of {len} cells");
            let offset = (idx * std::mem::size_of::<f32>()) as u64;
            self.context
                .queue()
                .write_buffer(buffer, offset, bytemuck::bytes_of(&value));
        }
    }

    fn write_field(&mut self, field: FieldId, data: &[f32]) {
        assert_eq!(data.len(), self.dims.cell_count(), "Field size mismatch");
        self.context
            .queue()
            .write_buffer(self.buffer(field), 0, bytemuck::cast_slice(data));
    }

    fn add_source(&mut self, target: FieldId, source: FieldId, dt: f32) {
        assert_writes_unaliased("add_source", &[target], &[source]);
        self.write_params(
            0,
            &KernelParams {
                dt,
                ..self.base_params
            },
        );
        let bind_group = self.bind(
            "Add Source Bind Group",
            &self.layouts.pair,
            0,
            &[target, source],
        );
        self.submit(
            "Add Source",
            &[Dispatch {
                pipeline: &self.pipelines.add_source,
                bind_group: &bind_group,
                workgroups: self.full_workgroups(),
            }],
        );
    }

    fn relax_sweep(&mut self, x: FieldId, x0: FieldId, a: f32, c: f32) {
        assert_writes_unaliased("relax", &[x], &[x0]);
        for (slot, parity) in Parity::SWEEP.into_iter().enumerate() {
            self.write_params(
                slot,
                &KernelParams {
                    a,
                    c,
                    parity: parity.remainder() as u32,
                    ..self.base_params
                },
            );
        }

        let red = self.bind("Relax Red Bind Group", &self.layouts.pair, 0, &[x, x0]);
        let black = self.bind("Relax Black Bind Group", &self.layouts.pair, 1, &[x, x0]);
        let workgroups = self.interior_workgroups();
        self.submit(
            "Relax Sweep",
            &[
                Dispatch {
                    pipeline: &self.pipelines.relax,
                    bind_group: &red,
                    workgroups,
                },
                Dispatch {
                    pipeline: &self.pipelines.relax,
                    bind_group: &black,
                    workgroups,
                },
            ],
        );
    }

    fn enforce_boundary(&mut self, field: FieldId, boundary: Boundary) {
        self.write_params(
            0,
            &KernelParams {
                boundary: boundary.tag(),
                ..self.base_params
            },
        );
        let bind_group = self.bind("Boundary Bind Group", &self.layouts.single, 0, &[field]);
        let edge_groups = (self.dims.n() as u32).div_ceil(WORKGROUP_1D);
        self.submit(
            "Enforce Boundary",
            &[
                Dispatch {
                    pipeline: &self.pipelines.boundary_edges,
                    bind_group: &bind_group,
                    workgroups: (edge_groups, 1),
                },
                Dispatch {
                    pipeline: &self.pipelines.boundary_corners,
                    bind_group: &bind_group,
                    workgroups: (1, 1),
                },
            ],
        );
    }

    fn advect_pass(&mut self, d: FieldId, d0: FieldId, u: FieldId, v: FieldId, dt0: f32) {
        assert_writes_unaliased("advect", &[d], &[d0, u, v]);
        self.write_params(
            0,
            &KernelParams {
                dt: dt0,
                ..self.base_params
            },
        );
        let bind_group = self.bind("Advect Bind Group", &self.layouts.advect, 0, &[d, d0, u, v]);
        self.submit(
            "Advect",
            &[Dispatch {
                pipeline: &self.pipelines.advect,
                bind_group: &bind_group,
                workgroups: self.interior_workgroups(),
            }],
        );
    }

    fn divergence_pass(&mut self, u: FieldId, v: FieldId, p: FieldId, div: FieldId) {
        assert_writes_unaliased("divergence", &[p, div], &[u, v]);
        self.write_params(0, &self.base_params);
        let bind_group = self.bind(
            "Divergence Bind Group",
            &self.layouts.divergence,
            0,
            &[p, div, u, v],
        );
        self.submit(
            "Divergence",
            &[Dispatch {
                pipeline: &self.pipelines.divergence,
                bind_group: &bind_group,
                workgroups: self.interior_workgroups(),
            }],
        );
    }

    fn subtract_gradient_pass(&mut self, u: FieldId, v: FieldId, p: FieldId) {
        assert_writes_unaliased("gradient", &[u, v], &[p]);
        self.write_params(0, &self.base_params);
        let bind_group = self.bind("Gradient Bind Group", &self.layouts.gradient, 0, &[u, v, p]);
        self.submit(
            "Subtract Gradient",
            &[Dispatch {
                pipeline: &self.pipelines.gradient,
                bind_group: &bind_group,
                workgroups: self.interior_workgroups(),
            }],
        );
    }

    fn swap(&mut self, a: FieldId, b: FieldId) {
        self.slots.swap(a, b);
    }

    fn read_field(&self, field: FieldId) -> Result<Cow<'_, [f32]>, BackendError> {
        let staging = self
            .staging
            .lock()
            .map_err(|e| BackendError::ReadbackFailed(e.to_string()))?;

        let mut encoder =
            self.context
                .device()
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Field Readback Encoder"),
                });
        encoder.copy_buffer_to_buffer(
            self.buffer(field),
            0,
            &staging,
            0,
            self.dims.field_bytes() as u64,
        );
        self.context.queue().submit(std::iter::once(encoder.finish()));

        let buffer_slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });

        let _ = self.context.device().poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| BackendError::ReadbackFailed(e.to_string()))?
            .map_err(|e| BackendError::ReadbackFailed(e.to_string()))?;

        let data = buffer_slice.get_mapped_range();
        let result: Vec<f32> = bytemuck::cast_slice(&data).to_vec();
        drop(data);
        staging.unmap();

        Ok(Cow::Owned(result))
    }

    fn is_gpu_accelerated(&self) -> bool {
        true
    }
}
