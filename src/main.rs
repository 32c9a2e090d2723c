// Zombie Screen - GPU pixel health automaton
// Copyright (c) 2025 Zombie Screen contributors
// Licensed under MIT License
//
// Interactive host: left click kills pixels under the cursor, right click heals
// a rectangle around it, R re-seeds the screen.

use std::sync::Arc;

use anyhow::Context;
use winit::{
    event::*,
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
};
use zombie_screen::{
    grid::initial_image, BackendKind, CpuGrid, FrameReport, GpuGrid, Outcome,
    PixelStats, Simulation, SimulationSettings,
};

const WINDOW_SCALE: u32 = 2;

/// The simulation plus whatever the display shader samples from.
enum Screen {
    Gpu {
        sim: Simulation<GpuGrid>,
        bind_groups: [wgpu::BindGroup; 2], // one per state surface
    },
    Cpu {
        sim: Simulation<CpuGrid>,
        mirror: wgpu::Texture,
        bind_group: wgpu::BindGroup,
    },
}

impl Screen {
    fn queue_press(&mut self, x: f32, y: f32) {
        match self {
            Screen::Gpu { sim, .. } => sim.queue_press(x, y),
            Screen::Cpu { sim, .. } => sim.queue_press(x, y),
        }
    }

    fn queue_heal(&mut self, x: i32, y: i32, width: i32, height: i32) {
        match self {
            Screen::Gpu { sim, .. } => sim.queue_heal(x, y, width, height),
            Screen::Cpu { sim, .. } => sim.queue_heal(x, y, width, height),
        }
    }

    fn step_frame(&mut self, speed: f32) -> FrameReport {
        match self {
            Screen::Gpu { sim, .. } => sim.step_frame(speed),
            Screen::Cpu { sim, .. } => sim.step_frame(speed),
        }
    }

    fn reset(&mut self) -> zombie_screen::Result<()> {
        match self {
            Screen::Gpu { sim, .. } => sim.reset(),
            Screen::Cpu { sim, .. } => sim.reset(),
        }
    }

    fn stats(&self) -> PixelStats {
        match self {
            Screen::Gpu { sim, .. } => sim.stats(),
            Screen::Cpu { sim, .. } => sim.stats(),
        }
    }

    /// Push CPU state to the mirror texture; the GPU path is already resident.
    fn sync_display(&self, queue: &wgpu::Queue) {
        if let Screen::Cpu { sim, mirror, .. } = self {
            let size = sim.size();
            queue.write_texture(
                mirror.as_image_copy(),
                sim.cpu_snapshot(),
                wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(size.width * 4),
                    rows_per_image: Some(size.height),
                },
                mirror.size(),
            );
        }
    }

    fn display_bind_group(&self) -> &wgpu::BindGroup {
        match self {
            Screen::Gpu { sim, bind_groups } => &bind_groups[sim.backend().current_index()],
            Screen::Cpu { bind_group, .. } => bind_group,
        }
    }
}

struct Display {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
}

impl Display {
    fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Display Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/display.wgsl").into()),
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Display Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Display Pipeline Layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Display Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self { pipeline, layout }
    }

    fn bind(
        &self,
        device: &wgpu::Device,
        label: &str,
        view: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(view) },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::Sampler(sampler) },
            ],
        })
    }
}

fn build_screen(
    settings: &SimulationSettings,
    device: &Arc<wgpu::Device>,
    queue: &Arc<wgpu::Queue>,
    display: &Display,
) -> anyhow::Result<Screen> {
    let size = settings.grid_size()?;
    let seeds = settings.seed_pattern(size);
    let initial = initial_image(size, &seeds);

    match settings.backend {
        BackendKind::Gpu => {
            let grid = GpuGrid::with_device(device.clone(), queue.clone(), size, &initial)
                .context("building GPU pixel grid")?;
            let [view_a, view_b] = grid.state_views();
            let bind_groups = [
                display.bind(device, "Display State A", view_a, grid.sampler()),
                display.bind(device, "Display State B", view_b, grid.sampler()),
            ];
            let sim = Simulation::new(grid, seeds, settings)?;
            Ok(Screen::Gpu { sim, bind_groups })
        }
        BackendKind::Cpu => {
            let grid = CpuGrid::new(size, &initial)?;
            let sim = Simulation::new(grid, seeds, settings)?;
            let mirror = device.create_texture(&wgpu::TextureDescriptor {
                label: Some("CPU State Mirror"),
                size: wgpu::Extent3d {
                    width: size.width,
                    height: size.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: zombie_screen::gpu::STATE_FORMAT,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            });
            let view = mirror.create_view(&wgpu::TextureViewDescriptor::default());
            let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("CPU State Sampler"),
                mag_filter: wgpu::FilterMode::Nearest,
                min_filter: wgpu::FilterMode::Nearest,
                ..Default::default()
            });
            let bind_group = display.bind(device, "Display CPU State", &view, &sampler);
            Ok(Screen::Cpu { sim, mirror, bind_group })
        }
    }
}

fn main() -> anyhow::Result<()> {
    use env_logger::Env;
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let settings_path = SimulationSettings::default_path();
    let settings = SimulationSettings::load_or_default(&settings_path);
    if !settings_path.exists() {
        if let Err(err) = settings.save_to_disk(&settings_path) {
            log::warn!("Failed to write default settings: {err:?}");
        }
    }

    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        event_loop.create_window(
            winit::window::WindowAttributes::default()
                .with_title("Zombie Screen")
                .with_inner_size(winit::dpi::PhysicalSize::new(
                    settings.width * WINDOW_SCALE,
                    settings.height * WINDOW_SCALE,
                )),
        )?,
    );

    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: wgpu::Backends::PRIMARY,
        ..Default::default()
    });
    let surface = instance.create_surface(window.clone())?;
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: Some(&surface),
        force_fallback_adapter: false,
    }))
    .context("no GPU adapter for the window surface")?;
    let (device, queue) = pollster::block_on(adapter.request_device(
        &wgpu::DeviceDescriptor {
            label: Some("GPU Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: Default::default(),
        },
        None,
    ))?;
    let device = Arc::new(device);
    let queue = Arc::new(queue);

    let inner = window.inner_size();
    let surface_caps = surface.get_capabilities(&adapter);
    let surface_format = surface_caps
        .formats
        .iter()
        .find(|f| f.is_srgb())
        .copied()
        .unwrap_or(surface_caps.formats[0]);
    let mut surface_config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format: surface_format,
        width: inner.width.max(1),
        height: inner.height.max(1),
        present_mode: wgpu::PresentMode::AutoVsync,
        alpha_mode: surface_caps.alpha_modes[0],
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    };
    surface.configure(&device, &surface_config);

    let display = Display::new(&device, surface_format);
    let mut screen = build_screen(&settings, &device, &queue, &display)?;

    let ramp = settings.zombification;
    let heal_brush = settings.heal_brush_in(settings.grid_size()?);
    let start = std::time::Instant::now();
    let mut cursor_pos_px: Option<(f32, f32)> = None;
    let mut last_outcome = Outcome::Running;

    event_loop.run(move |event, control_flow| match event {
        Event::WindowEvent { ref event, window_id } if window_id == window.id() => match event {
            WindowEvent::CloseRequested => control_flow.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => match key {
                KeyCode::Escape => control_flow.exit(),
                KeyCode::KeyR => {
                    if let Err(err) = screen.reset() {
                        log::error!("Reset failed: {err}");
                    }
                    last_outcome = Outcome::Running;
                }
                _ => {}
            },
            WindowEvent::CursorMoved { position, .. } => {
                cursor_pos_px = Some((position.x as f32, position.y as f32));
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button,
                ..
            } => {
                let Some((mx, my)) = cursor_pos_px else {
                    return;
                };
                let u = mx / surface_config.width as f32;
                let v = my / surface_config.height as f32;
                match button {
                    MouseButton::Left => screen.queue_press(u, v),
                    MouseButton::Right => {
                        let gx = (u * settings.width as f32) as i32;
                        let gy = (v * settings.height as f32) as i32;
                        let (bw, bh) = (heal_brush[0] as i32, heal_brush[1] as i32);
                        screen.queue_heal(gx - bw / 2, gy - bh / 2, bw, bh);
                    }
                    _ => {}
                }
            }
            WindowEvent::Resized(physical_size) => {
                if physical_size.width > 0 && physical_size.height > 0 {
                    surface_config.width = physical_size.width;
                    surface_config.height = physical_size.height;
                    surface.configure(&device, &surface_config);
                }
            }
            WindowEvent::RedrawRequested => {
                let speed = ramp.speed_at(start.elapsed().as_secs_f32());
                let report = screen.step_frame(speed);
                if report.healed != 0 {
                    log::info!("Healed {} pixel(s)", report.healed);
                }
                if report.outcome != last_outcome {
                    match report.outcome {
                        Outcome::Won => log::info!("Every pixel is alive again"),
                        Outcome::Lost => log::info!("The zombies took the screen"),
                        Outcome::Running => {}
                    }
                    last_outcome = report.outcome;
                }

                let stats = screen.stats();
                window.set_title(&format!(
                    "Zombie Screen | {:.1}% dead | zombification {:.3}",
                    stats.dead_ratio() * 100.0,
                    speed
                ));

                screen.sync_display(&queue);
                match render(&surface, &device, &queue, &display, &screen) {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost) => surface.configure(&device, &surface_config),
                    Err(wgpu::SurfaceError::OutOfMemory) => control_flow.exit(),
                    Err(e) => log::warn!("{:?}", e),
                }
            }
            _ => {}
        },
        Event::AboutToWait => window.request_redraw(),
        _ => {}
    })?;

    Ok(())
}

fn render(
    surface: &wgpu::Surface,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    display: &Display,
    screen: &Screen,
) -> Result<(), wgpu::SurfaceError> {
    let output = surface.get_current_texture()?;
    let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Render Encoder"),
    });
    {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Display Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        render_pass.set_pipeline(&display.pipeline);
        render_pass.set_bind_group(0, screen.display_bind_group(), &[]);
        render_pass.draw(0..3, 0..1); // Full-screen triangle
    }
    queue.submit(std::iter::once(encoder.finish()));
    output.present();
    Ok(())
}
