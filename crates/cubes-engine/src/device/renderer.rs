use std::sync::Arc;

use winit::window::Window;

use crate::render::{FrameCounters, FrameView, RenderError, Renderer, RendererInitError};

use super::camera::{transform, view_projection, Mat4};
use super::{Gpu, GpuInit, SurfaceErrorAction};

const SKY: [f64; 3] = [0.42, 0.62, 0.88];
const UNFOCUSED_DIM: f64 = 0.6;

/// [`Renderer`] on top of a [`Gpu`] context.
///
/// Each frame clears the surface to a sky colour driven by exposure and
/// focus, and keeps a view-projection looking from the eye at the origin for
/// screen-space projection.
pub struct GpuRenderer {
    window: Arc<Window>,
    gpu: Gpu,
    view_proj: Mat4,
    errors: Vec<RenderError>,
    counters: FrameCounters,
    lost_retry_frames: u32,
    /// Frames left before a lost surface is reconfigured.
    lost: Option<u32>,
}

impl GpuRenderer {
    /// Creates the GPU context, blocking on adapter and device acquisition.
    pub fn new(window: Arc<Window>, init: GpuInit) -> Result<Self, RendererInitError> {
        let lost_retry_frames = init.lost_retry_frames;
        let gpu = pollster::block_on(Gpu::new(Arc::clone(&window), init))?;
        let size = gpu.size();

        Ok(Self {
            window,
            gpu,
            view_proj: view_projection([0.0, 0.0, 1.0], [0.0; 3], aspect(size.width, size.height)),
            errors: Vec::new(),
            counters: FrameCounters::default(),
            lost_retry_frames,
            lost: None,
        })
    }

    pub fn gpu(&self) -> &Gpu {
        &self.gpu
    }

    fn lose_context(&mut self) {
        if self.lost.is_none() {
            log::warn!("graphics context lost");
            self.errors.push(RenderError::ContextLost);
        }
        self.lost = Some(self.lost_retry_frames);
    }
}

impl Renderer for GpuRenderer {
    fn render_one_frame(&mut self, view: &FrameView) {
        let size = self.gpu.size();
        let eye = view.eye.map(|v| v as f32);
        self.view_proj = view_projection(eye, [0.0; 3], aspect(size.width, size.height));

        let mut frame = match self.gpu.begin_frame() {
            Ok(frame) => frame,
            Err(err) => {
                let (action, reported) = self.gpu.handle_surface_error(err);
                log::debug!("frame skipped: {reported} ({action:?})");
                self.errors.push(reported);
                if action == SurfaceErrorAction::Lost {
                    self.lose_context();
                }
                return;
            }
        };

        {
            let _pass = frame
                .encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("cubes sky pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &frame.view,
                        depth_slice: None,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(clear_color(view)),
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                    multiview_mask: None,
                });
        }

        self.window.pre_present_notify();
        self.gpu.submit(frame);
        self.counters.bundles_drawn += 1;
    }

    fn check_for_viewport_change(&mut self) -> bool {
        if let Some(remaining) = self.lost {
            if remaining > 0 {
                self.lost = Some(remaining - 1);
                return false;
            }
            log::info!("reconfiguring surface after context loss");
            self.lost = None;
            self.gpu.reconfigure();
            return true;
        }

        let size = self.window.inner_size();
        if size == self.gpu.size() {
            return false;
        }
        self.gpu.resize(size);
        true
    }

    fn transform_point_to_screen(&self, point: [f32; 4]) -> [f32; 4] {
        transform(&self.view_proj, point)
    }

    fn context_lost(&self) -> bool {
        self.lost.is_some()
    }

    fn take_errors(&mut self) -> Vec<RenderError> {
        std::mem::take(&mut self.errors)
    }

    fn take_frame_counters(&mut self) -> FrameCounters {
        std::mem::take(&mut self.counters)
    }
}

impl std::fmt::Debug for GpuRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuRenderer")
            .field("gpu", &self.gpu)
            .field("pending_errors", &self.errors.len())
            .field("lost", &self.lost)
            .finish()
    }
}

fn aspect(width: u32, height: u32) -> f32 {
    if height == 0 {
        1.0
    } else {
        width as f32 / height as f32
    }
}

fn clear_color(view: &FrameView) -> wgpu::Color {
    let dim = if view.focused { 1.0 } else { UNFOCUSED_DIM };
    let scale = (f64::from(view.exposure) * dim).clamp(0.0, 1.0);
    wgpu::Color {
        r: SKY[0] * scale,
        g: SKY[1] * scale,
        b: SKY[2] * scale,
        a: 1.0,
    }
}
