use std::sync::Arc;

use anyhow::Context;
use wgpu::SurfaceError;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::render::{RenderError, RendererInitError};

use super::error::classify;
use super::surface::{choose_alpha_mode, choose_surface_format, is_drawable};
use super::{GpuFrame, GpuInit, SurfaceErrorAction};

/// Owns the wgpu core objects and the window surface.
///
/// The surface holds its own `Arc` of the window, so the context can live
/// as long as whoever owns it without borrowing the runtime's window.
pub struct Gpu {
    surface: wgpu::Surface<'static>,
    adapter_info: wgpu::AdapterInfo,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
}

impl Gpu {
    /// Creates a context bound to `window`.
    ///
    /// A missing adapter or surface is reported as
    /// [`RendererInitError::Unsupported`]; anything else is a plain failure.
    pub async fn new(window: Arc<Window>, init: GpuInit) -> Result<Self, RendererInitError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .map_err(|e| RendererInitError::Unsupported(format!("no surface: {e}")))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| RendererInitError::Unsupported(format!("no adapter: {e}")))?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("cubes device"),
                required_features: init.required_features,
                required_limits: init.required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let caps = surface.get_capabilities(&adapter);
        let format = choose_surface_format(&caps, init.prefer_srgb).ok_or_else(|| {
            RendererInitError::Unsupported("surface reports no formats".to_string())
        })?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: init.present_mode,
            alpha_mode: choose_alpha_mode(&caps, init.alpha_mode),
            view_formats: vec![],
            desired_maximum_frame_latency: init.desired_maximum_frame_latency,
        };

        if is_drawable(size) {
            surface.configure(&device, &config);
        }

        let adapter_info = adapter.get_info();
        log::info!(
            "gpu: {} ({:?}), surface {:?} {}x{}",
            adapter_info.name,
            adapter_info.backend,
            format,
            config.width,
            config.height
        );

        Ok(Self {
            surface,
            adapter_info,
            device,
            queue,
            config,
            size,
        })
    }

    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter_info
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Current drawable size in physical pixels.
    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.size = new_size;
        if !is_drawable(new_size) {
            return;
        }

        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
    }

    /// Reapplies the current configuration, e.g. after the surface was lost.
    pub fn reconfigure(&self) {
        if is_drawable(self.size) {
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// Acquires the next surface texture and creates an encoder.
    pub fn begin_frame(&self) -> Result<GpuFrame, SurfaceError> {
        let surface_texture = self.surface.get_current_texture()?;
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("cubes frame encoder"),
            });

        Ok(GpuFrame {
            surface_texture,
            view,
            encoder,
        })
    }

    /// Submits the recorded commands and presents the frame.
    pub fn submit(&self, frame: GpuFrame) {
        let GpuFrame {
            surface_texture,
            view,
            encoder,
        } = frame;
        self.queue.submit(std::iter::once(encoder.finish()));
        drop(view);
        surface_texture.present();
    }

    /// Responds to a failed acquisition, reconfiguring the surface when
    /// that is what it needs.
    pub fn handle_surface_error(&self, err: SurfaceError) -> (SurfaceErrorAction, RenderError) {
        let (action, reported) = classify(&err);
        if action == SurfaceErrorAction::Reconfigured {
            self.reconfigure();
        }
        (action, reported)
    }
}

impl std::fmt::Debug for Gpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gpu")
            .field("adapter", &self.adapter_info.name)
            .field("format", &self.config.format)
            .field("size", &self.size)
            .finish()
    }
}
