// Zombie Screen - GPU pixel health automaton
// Copyright (c) 2025 Zombie Screen contributors
// Licensed under MIT License

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::error::{Result, SimulationError};
use crate::grid::{GridBackend, GridSize, KillBrush};
use crate::pixel::{HealRect, BYTES_PER_TEXEL};

const WORKGROUP_SIZE: u32 = 8; // Must match @workgroup_size in pixel_life.wgsl
pub const STATE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct PassParams {
    grid_size: [u32; 2],
    zombify_step: u32,
    _pad0: u32,
    center: [f32; 2],
    half_extent: [f32; 2],
    radius: f32,
    aspect: f32,
    _pad1: [f32; 2],
}

const _: [(); 48] = [(); std::mem::size_of::<PassParams>()];

impl PassParams {
    fn for_grid(size: GridSize) -> Self {
        Self {
            grid_size: [size.width, size.height],
            zombify_step: 0,
            _pad0: 0,
            center: [0.0; 2],
            half_extent: [0.0; 2],
            radius: 0.0,
            aspect: size.aspect(),
            _pad1: [0.0; 2],
        }
    }
}

/// Pixel state held in two `Rgba8Unorm` textures on the GPU.
///
/// Each pass samples the committed texture and writes the other one; roles swap
/// after submission. Read-back copies the committed texture into a staging
/// buffer and blocks until it is mapped.
pub struct GpuGrid {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    size: GridSize,

    // Ping-pong state
    textures: [wgpu::Texture; 2],
    views: [wgpu::TextureView; 2],
    sampler: wgpu::Sampler,
    bind_groups: [wgpu::BindGroup; 2], // [0]: 0 -> 1, [1]: 1 -> 0
    current: usize,

    params_buffer: wgpu::Buffer,
    staging_buffer: wgpu::Buffer,
    padded_bytes_per_row: u32,

    // Pipelines
    simulate_pipeline: wgpu::ComputePipeline,
    kill_pipeline: wgpu::ComputePipeline,
    heal_pipeline: wgpu::ComputePipeline,
}

impl GpuGrid {
    /// Opens a headless device and builds the grid on it.
    pub fn new(size: GridSize, initial: &[u8]) -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or(SimulationError::NoAdapter)?;

        let info = adapter.get_info();
        log::info!("Using GPU adapter {} ({:?})", info.name, info.backend);

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Pixel Life Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))?;

        Self::with_device(Arc::new(device), Arc::new(queue), size, initial)
    }

    /// Builds the grid on a device owned by the host renderer.
    pub fn with_device(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        size: GridSize,
        initial: &[u8],
    ) -> Result<Self> {
        let extent = wgpu::Extent3d {
            width: size.width,
            height: size.height,
            depth_or_array_layers: 1,
        };
        let make_texture = |label: &str| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: extent,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: STATE_FORMAT,
                usage: wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::STORAGE_BINDING
                    | wgpu::TextureUsages::COPY_SRC
                    | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            })
        };
        let textures = [make_texture("Pixel State A"), make_texture("Pixel State B")];
        let views = [
            textures[0].create_view(&wgpu::TextureViewDescriptor::default()),
            textures[1].create_view(&wgpu::TextureViewDescriptor::default()),
        ];

        // Channel values are categorical codes: never interpolate, never wrap.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Pixel State Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Pixel Pass Params"),
            contents: bytemuck::cast_slice(&[PassParams::for_grid(size)]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let padded_bytes_per_row = align_to_copy_pitch(size.width * BYTES_PER_TEXEL as u32);
        let staging_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Pixel State Readback"),
            size: padded_bytes_per_row as u64 * size.height as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Pixel Pass Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: STATE_FORMAT,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let make_bind_group = |label: &str, read: &wgpu::TextureView, write: &wgpu::TextureView| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(read) },
                    wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::TextureView(write) },
                    wgpu::BindGroupEntry { binding: 2, resource: params_buffer.as_entire_binding() },
                ],
            })
        };
        let bind_groups = [
            make_bind_group("Pixel Pass A -> B", &views[0], &views[1]),
            make_bind_group("Pixel Pass B -> A", &views[1], &views[0]),
        ];

        // Shader or pipeline validation failures surface here instead of on first dispatch.
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Pixel Life Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/pixel_life.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Pixel Pass Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let make_pipeline = |label: &str, entry_point: &str| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point,
                compilation_options: Default::default(),
                cache: None,
            })
        };
        let simulate_pipeline = make_pipeline("Simulate Step", "simulate_step");
        let kill_pipeline = make_pipeline("Kill Brush", "kill_brush");
        let heal_pipeline = make_pipeline("Heal Rect", "heal_rect");

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(SimulationError::Shader {
                label: "pixel_life.wgsl",
                message: err.to_string(),
            });
        }

        let mut grid = Self {
            device,
            queue,
            size,
            textures,
            views,
            sampler,
            bind_groups,
            current: 0,
            params_buffer,
            staging_buffer,
            padded_bytes_per_row,
            simulate_pipeline,
            kill_pipeline,
            heal_pipeline,
        };
        grid.upload(initial)?;
        log::info!("GPU pixel grid ready ({}x{})", size.width, size.height);
        Ok(grid)
    }

    /// Texture holding the most recently committed state.
    pub fn current_texture(&self) -> &wgpu::Texture {
        &self.textures[self.current]
    }

    pub fn current_view(&self) -> &wgpu::TextureView {
        &self.views[self.current]
    }

    /// Both state views, for consumers that prebuild one bind group per surface.
    pub fn state_views(&self) -> [&wgpu::TextureView; 2] {
        [&self.views[0], &self.views[1]]
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Nearest, clamp-to-edge sampler matching the state encoding.
    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.queue
    }

    fn dispatch(&mut self, pipeline_label: &str, params: PassParams, which: Pass) {
        self.queue
            .write_buffer(&self.params_buffer, 0, bytemuck::cast_slice(&[params]));

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some(pipeline_label),
        });
        {
            let pipeline = match which {
                Pass::Simulate => &self.simulate_pipeline,
                Pass::Kill => &self.kill_pipeline,
                Pass::Heal => &self.heal_pipeline,
            };
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(pipeline_label),
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &self.bind_groups[self.current], &[]);
            pass.dispatch_workgroups(
                self.size.width.div_ceil(WORKGROUP_SIZE),
                self.size.height.div_ceil(WORKGROUP_SIZE),
                1,
            );
        }
        self.queue.submit(std::iter::once(encoder.finish()));

        // Written surface becomes the committed one.
        self.current = 1 - self.current;
        log::trace!("{} dispatched, committed surface {}", pipeline_label, self.current);
    }

    fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.size.width,
            height: self.size.height,
            depth_or_array_layers: 1,
        }
    }
}

#[derive(Clone, Copy)]
enum Pass {
    Simulate,
    Kill,
    Heal,
}

impl GridBackend for GpuGrid {
    fn size(&self) -> GridSize {
        self.size
    }

    fn upload(&mut self, data: &[u8]) -> Result<()> {
        if data.len() != self.size.byte_len() {
            return Err(SimulationError::Settings(format!(
                "upload of {} bytes into a {}x{} grid",
                data.len(),
                self.size.width,
                self.size.height
            )));
        }
        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.textures[self.current],
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(self.size.width * BYTES_PER_TEXEL as u32),
                rows_per_image: Some(self.size.height),
            },
            self.extent(),
        );
        self.queue.submit(std::iter::empty());
        Ok(())
    }

    fn simulate(&mut self, zombify_step: u8) -> Result<()> {
        let params = PassParams {
            zombify_step: zombify_step as u32,
            ..PassParams::for_grid(self.size)
        };
        self.dispatch("Simulate Step", params, Pass::Simulate);
        Ok(())
    }

    fn kill(&mut self, brush: KillBrush) -> Result<()> {
        let params = PassParams {
            center: brush.point,
            radius: brush.radius,
            ..PassParams::for_grid(self.size)
        };
        self.dispatch("Kill Brush", params, Pass::Kill);
        Ok(())
    }

    fn heal(&mut self, rect: HealRect) -> Result<()> {
        let params = PassParams {
            center: rect.center(),
            half_extent: if rect.is_empty() { [0.0; 2] } else { rect.half_extent() },
            radius: rect.corner_radius,
            ..PassParams::for_grid(self.size)
        };
        self.dispatch("Heal Rect", params, Pass::Heal);
        Ok(())
    }

    fn read_back(&mut self, out: &mut Vec<u8>) -> Result<()> {
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Pixel State Readback"),
        });
        encoder.copy_texture_to_buffer(
            self.current_texture().as_image_copy(),
            wgpu::ImageCopyBuffer {
                buffer: &self.staging_buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(self.padded_bytes_per_row),
                    rows_per_image: Some(self.size.height),
                },
            },
            self.extent(),
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = self.staging_buffer.slice(..);
        let (sender, receiver) = futures_intrusive::channel::shared::oneshot_channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            // Receiver outlives the blocking wait below; a failed send only means it was dropped.
            let _ = sender.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);

        match pollster::block_on(receiver.receive()) {
            Some(Ok(())) => {}
            Some(Err(err)) => return Err(SimulationError::Readback(err.to_string())),
            None => return Err(SimulationError::Readback("map callback dropped".into())),
        }

        let row_bytes = self.size.width as usize * BYTES_PER_TEXEL;
        out.clear();
        out.reserve(self.size.byte_len());
        {
            let data = buffer_slice.get_mapped_range();
            for row in data.chunks(self.padded_bytes_per_row as usize) {
                out.extend_from_slice(&row[..row_bytes]);
            }
        }
        self.staging_buffer.unmap();

        if out.len() != self.size.byte_len() {
            return Err(SimulationError::Readback(format!(
                "expected {} bytes, got {}",
                self.size.byte_len(),
                out.len()
            )));
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "gpu"
    }
}

fn align_to_copy_pitch(bytes: u32) -> u32 {
    bytes.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT
}
