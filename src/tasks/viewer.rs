mod input;
mod layer;
mod present;
mod text;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use input::{InputAction, key_action, wheel_action};
use layer::CaptionLayer;
use palette::LinSrgb;
use present::FramePresenter;
use text::CaptionRenderer;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use wgpu::{self, SurfaceError};
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalSize},
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::ModifiersState,
    window::{Fullscreen, Window, WindowAttributes},
};

use crate::{
    config::Configuration,
    events::FrameLoaded,
    flipbook::Flipbook,
    render::compose::Compositor,
    render::surface::Viewport,
};

#[derive(Debug)]
enum ViewerEvent {
    Cancelled,
    FrameLoaded(FrameLoaded),
}

type FrameReceiver = mpsc::Receiver<FrameLoaded>;

struct Gpu {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    device: wgpu::Device,
    queue: wgpu::Queue,
    presenter: FramePresenter,
    captions: CaptionRenderer,
    caption_layer: CaptionLayer,
}

struct ViewerApp {
    cfg: Configuration,
    cancel: CancellationToken,
    flipbook: Flipbook,
    compositor: Compositor,
    window: Option<Arc<Window>>,
    gpu: Option<Gpu>,
    modifiers: ModifiersState,
    last_tick: Option<Instant>,
    pending_redraw: bool,
    next_deadline: Option<Instant>,
}

impl ViewerApp {
    fn new(cfg: Configuration, cancel: CancellationToken, flipbook: Flipbook) -> Self {
        let compositor = Compositor::new(cfg.fog_color.to_rgba(), cfg.page_background.to_rgba());
        Self {
            cfg,
            cancel,
            flipbook,
            compositor,
            window: None,
            gpu: None,
            modifiers: ModifiersState::empty(),
            last_tick: None,
            pending_redraw: false,
            next_deadline: None,
        }
    }

    fn ensure_window(&mut self, event_loop: &ActiveEventLoop) -> Option<Arc<Window>> {
        if let Some(window) = self.window.as_ref() {
            return Some(window.clone());
        }

        let mut attrs = WindowAttributes::default()
            .with_title(self.cfg.window.title.clone())
            .with_inner_size(LogicalSize::new(
                self.cfg.window.width,
                self.cfg.window.height,
            ));
        if self.cfg.window.fullscreen {
            attrs = attrs.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }
        match event_loop.create_window(attrs) {
            Ok(window) => {
                let window = Arc::new(window);
                self.window = Some(window.clone());
                Some(window)
            }
            Err(err) => {
                error!(error = %err, "failed to create viewer window");
                None
            }
        }
    }

    fn init_gpu(&mut self, window: Arc<Window>) -> Result<()> {
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window.clone())
            .context("failed to create surface")?;
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("failed to acquire GPU adapter")?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|fmt| fmt.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .context("surface reports no supported formats")?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("flipbook-device"),
            required_features: wgpu::Features::empty(),
            required_limits: adapter.limits(),
            ..Default::default()
        }))
        .context("failed to acquire GPU device")?;

        let size = window.inner_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        info!(
            width = config.width,
            height = config.height,
            format = ?config.format,
            "viewer surface configured",
        );

        let presenter = FramePresenter::new(&device, format);
        let mut captions = CaptionRenderer::new(&device, &queue, format);
        captions.resize(size, window.scale_factor());
        let mut caption_layer = CaptionLayer::new(&device, format);
        caption_layer.resize(size);

        self.gpu = Some(Gpu {
            surface,
            config,
            device,
            queue,
            presenter,
            captions,
            caption_layer,
        });
        self.flipbook
            .resize(Viewport::from_physical(size.width, size.height, window.scale_factor()));
        Ok(())
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        let scale_factor = window.scale_factor();
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.config.width = new_size.width.max(1);
            gpu.config.height = new_size.height.max(1);
            gpu.surface.configure(&gpu.device, &gpu.config);
            gpu.captions.resize(new_size, scale_factor);
            gpu.caption_layer.resize(new_size);
            debug!(
                width = gpu.config.width,
                height = gpu.config.height,
                scale_factor,
                "viewer surface resized",
            );
        }
        self.flipbook.resize(Viewport::from_physical(
            new_size.width,
            new_size.height,
            scale_factor,
        ));
        self.request_redraw();
    }

    fn apply_input(&mut self, event_loop: &ActiveEventLoop, action: InputAction) {
        let now = Instant::now();
        let changed = match action {
            InputAction::ScrollBy(px) => self.flipbook.scroll_by(px, now),
            InputAction::ScrollTo(fraction) => self.flipbook.scroll_to(fraction, now),
            InputAction::Close => {
                info!("viewer close requested from keyboard");
                event_loop.exit();
                return;
            }
        };
        if changed {
            self.request_redraw();
        }
    }

    fn draw(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        let dt = self
            .last_tick
            .map_or(Duration::ZERO, |last| now.saturating_duration_since(last));
        self.last_tick = Some(now);

        let outcome = self.flipbook.tick(now, dt);
        self.flipbook.render_pending();
        self.next_deadline = outcome.next_deadline;
        self.pending_redraw = outcome.animating;

        let Some(window) = self.window.clone() else {
            return;
        };
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };

        let overlay = self.flipbook.overlay(now);
        let composed = self
            .compositor
            .compose(self.flipbook.surface(), overlay.compose_params());
        if composed.fresh {
            gpu.presenter.upload(&gpu.device, &gpu.queue, composed.image);
        }
        let captions = self.flipbook.captions(&overlay);
        let has_captions = gpu.captions.prepare(&gpu.device, &gpu.queue, &captions);
        if has_captions {
            gpu.caption_layer
                .set_blur(&gpu.queue, overlay.exit.blur_px, window.scale_factor() as f32);
        }

        let frame = match gpu.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(SurfaceError::Outdated) | Err(SurfaceError::Lost) => {
                info!("viewer surface lost; reconfiguring");
                self.handle_resize(window.inner_size());
                return;
            }
            Err(SurfaceError::OutOfMemory) => {
                error!("viewer surface out of memory; exiting event loop");
                event_loop.exit();
                return;
            }
            Err(SurfaceError::Timeout) => {
                warn!("viewer surface acquisition timed out");
                self.request_redraw();
                return;
            }
            Err(SurfaceError::Other) => {
                warn!("viewer surface reported an unknown error; retrying");
                self.handle_resize(window.inner_size());
                return;
            }
        };

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("flipbook-encoder"),
            });
        // captions go to their own layer so the exit blur can reach them
        let layer_view = if has_captions {
            gpu.caption_layer.view(&gpu.device)
        } else {
            None
        };
        let layered = layer_view.is_some();
        if let Some(layer_view) = layer_view {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("flipbook-captions"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: layer_view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });
            gpu.captions.render(&mut pass);
        }
        {
            let fog: LinSrgb<f32> = self.cfg.fog_color.0.into_format::<f32>().into_linear();
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("flipbook-present"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: f64::from(fog.red),
                            g: f64::from(fog.green),
                            b: f64::from(fog.blue),
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });
            gpu.presenter.draw(&mut pass);
            if layered {
                gpu.caption_layer.draw(&mut pass);
            }
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        window.pre_present_notify();
        frame.present();
        gpu.captions.trim();

        if self.pending_redraw {
            window.request_redraw();
        }
    }

    fn request_redraw(&mut self) {
        self.pending_redraw = true;
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }
}

impl ApplicationHandler<ViewerEvent> for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.cancel.is_cancelled() {
            event_loop.exit();
            return;
        }

        let Some(window) = self.ensure_window(event_loop) else {
            event_loop.exit();
            return;
        };

        if self.gpu.is_none() {
            if let Err(err) = self.init_gpu(window) {
                error!(error = ?err, "failed to initialize GPU state");
                event_loop.exit();
                return;
            }
        }

        self.request_redraw();
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(window) = self.window.clone() else {
            return;
        };
        if window.id() != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("viewer window close requested");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                self.handle_resize(new_size);
            }
            WindowEvent::ScaleFactorChanged {
                mut inner_size_writer,
                ..
            } => {
                let size = window.inner_size();
                let _ = inner_size_writer.request_inner_size(size);
                self.handle_resize(size);
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = modifiers.state();
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let action = wheel_action(delta, &self.cfg.scroll, window.scale_factor());
                self.apply_input(event_loop, action);
            }
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                let height = self.flipbook.surface().viewport().css_height;
                if let Some(action) = key_action(
                    &event.logical_key,
                    self.modifiers.shift_key(),
                    &self.cfg.scroll,
                    height,
                ) {
                    self.apply_input(event_loop, action);
                }
            }
            WindowEvent::RedrawRequested => {
                self.draw(event_loop);
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.pending_redraw {
            if let Some(window) = self.window.as_ref() {
                window.request_redraw();
            }
            event_loop.set_control_flow(ControlFlow::Wait);
            return;
        }
        match self.next_deadline {
            Some(deadline) if deadline <= Instant::now() => {
                self.next_deadline = None;
                self.request_redraw();
                event_loop.set_control_flow(ControlFlow::Wait);
            }
            Some(deadline) => event_loop.set_control_flow(ControlFlow::WaitUntil(deadline)),
            None => event_loop.set_control_flow(ControlFlow::Wait),
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: ViewerEvent) {
        match event {
            ViewerEvent::Cancelled => {
                info!("viewer received cancellation event");
                event_loop.exit();
            }
            ViewerEvent::FrameLoaded(loaded) => {
                if self
                    .flipbook
                    .handle_frame_loaded(loaded, Instant::now())
                    .is_some()
                {
                    self.request_redraw();
                }
            }
        }
    }
}

pub fn run_windowed(
    flipbook: Flipbook,
    mut from_loader: FrameReceiver,
    cancel: CancellationToken,
    cfg: Configuration,
) -> Result<()> {
    let event_loop = EventLoop::<ViewerEvent>::with_user_event()
        .build()
        .context("failed to build viewer event loop")?;

    let cancel_task = {
        let proxy = event_loop.create_proxy();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            cancel.cancelled().await;
            let _ = proxy.send_event(ViewerEvent::Cancelled);
        })
    };

    let forward_task = {
        let proxy = event_loop.create_proxy();
        tokio::spawn(async move {
            while let Some(loaded) = from_loader.recv().await {
                if proxy.send_event(ViewerEvent::FrameLoaded(loaded)).is_err() {
                    break;
                }
            }
        })
    };

    let mut app = ViewerApp::new(cfg, cancel, flipbook);
    let run_result = event_loop.run_app(&mut app);
    cancel_task.abort();
    forward_task.abort();

    run_result.context("viewer event loop failed")
}
