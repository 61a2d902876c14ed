//! Application event loop.
//!
//! [`run`] opens a window, builds the renderer of the configured tutorial
//! step and drives it with one update and one render per redraw request.
//!
//! # Lifecycle
//!
//! Each frame:
//! 1. Window events resize the surface, toggle rotation or exit
//! 2. The renderer advances the scene clock and uploads its uniforms
//! 3. The renderer records its passes into one command encoder
//! 4. The frame is submitted and presented

use std::{iter, sync::Arc};

use instant::Instant;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

use crate::{config::RenderConfig, context::Context, render::Renderer, renderers::load_renderer};

struct AppState {
    ctx: Context,
    renderer: Box<dyn Renderer>,
    is_surface_configured: bool,
}

impl AppState {
    async fn new(window: Arc<Window>, config: &RenderConfig) -> anyhow::Result<Self> {
        let ctx = Context::new(window, config.clear_color).await?;
        let renderer = load_renderer(&ctx, config).await?;
        Ok(Self {
            ctx,
            renderer,
            is_surface_configured: true,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if !self.ctx.resize(width, height) {
            self.is_surface_configured = false;
            return;
        }
        match self.renderer.resize(&self.ctx, [width, height]) {
            Ok(()) => self.is_surface_configured = true,
            Err(e) => {
                log::error!("cannot resize the {} renderer: {e:#}", self.renderer.label());
                self.is_surface_configured = false;
            }
        }
    }

    fn toggle_rotation(&mut self) {
        let label = self.renderer.label();
        match self.renderer.scene_mut() {
            Some(scene) => scene.toggle_rotation(),
            None => log::debug!("{label} has no scene to rotate"),
        }
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        if !self.is_surface_configured {
            return Ok(());
        }
        let Some(surface) = &self.ctx.surface else {
            return Ok(());
        };
        let output = surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.renderer.update(&self.ctx, Instant::now());
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        self.renderer.render(&self.ctx, &view, &mut encoder);
        self.ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

struct App {
    async_runtime: tokio::runtime::Runtime,
    config: RenderConfig,
    state: Option<AppState>,
    error: Option<anyhow::Error>,
}

impl App {
    fn new(config: RenderConfig) -> anyhow::Result<Self> {
        Ok(Self {
            async_runtime: tokio::runtime::Runtime::new()?,
            config,
            state: None,
            error: None,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{error:#}");
        self.error = Some(error);
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let [width, height] = self.config.window_size;
        let window_attributes = Window::default_attributes()
            .with_title(format!("render-steps: {}", self.config.technique))
            .with_inner_size(PhysicalSize::new(width, height));
        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, e.into()),
        };

        match self
            .async_runtime
            .block_on(AppState::new(window.clone(), &self.config))
        {
            Ok(state) => {
                self.state = Some(state);
                window.request_redraw();
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => match code {
                KeyCode::KeyR => state.toggle_rotation(),
                KeyCode::Escape => event_loop.exit(),
                _ => {}
            },
            WindowEvent::RedrawRequested => {
                match state.render() {
                    Ok(()) => {}
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let [width, height] = state.ctx.size();
                        log::warn!("surface lost, reconfiguring at {width}x{height}");
                        state.resize(width, height);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        return self.fail(event_loop, anyhow::anyhow!("surface out of memory"));
                    }
                    Err(e) => log::warn!("skipping frame: {e}"),
                }
                state.ctx.request_redraw();
            }
            _ => {}
        }
    }
}

/// Open a window and run the configured tutorial until it is closed.
pub fn run(config: RenderConfig) -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    }
    log::info!("starting {} tutorial", config.technique);

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config)?;
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
