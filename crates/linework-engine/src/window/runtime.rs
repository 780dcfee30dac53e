use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use ouroboros::self_referencing;
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use super::translate::translate_window_event;
use crate::input::{InputEvent, InputState};
use crate::render::WindowContext;
use crate::viewer::{SceneParser, Viewer, ViewerOptions, ViewerState};

/// Window configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "linework".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
        }
    }
}

/// Requests from the application, applied after its callback returns.
#[derive(Default)]
pub struct RuntimeCtx {
    commands: Vec<Command>,
}

impl RuntimeCtx {
    /// Sets the title of the window the callback is running for.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.commands.push(Command::SetTitle(title.into()));
    }

    pub fn close_window(&mut self) {
        self.commands.push(Command::CloseWindow);
    }

    pub fn exit(&mut self) {
        self.commands.push(Command::Exit);
    }
}

enum Command {
    SetTitle(String),
    CloseWindow,
    Exit,
}

/// Application hosted by the runtime. Each window owns one [`Viewer`].
pub trait ViewerApp {
    /// Called once the window's viewer exists, degraded or not.
    fn on_ready(&mut self, viewer: &mut Viewer<'_>, ctx: &mut RuntimeCtx);

    /// Called for every input event after the viewer has seen it.
    fn on_input(&mut self, _viewer: &mut Viewer<'_>, _event: &InputEvent, _ctx: &mut RuntimeCtx) {}
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens one window and runs until it closes. Blocks the calling thread.
    pub fn run<A>(
        config: RuntimeConfig,
        options: ViewerOptions,
        parser: Arc<dyn SceneParser>,
        app: A,
    ) -> Result<()>
    where
        A: ViewerApp + 'static,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState {
            config,
            options,
            parser,
            app,
            windows: HashMap::new(),
            exit_requested: false,
        };

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        Ok(())
    }
}

#[self_referencing]
struct WindowEntry {
    input: InputState,
    window: Window,

    #[borrows(window)]
    #[not_covariant]
    viewer: Viewer<'this>,
}

struct AppState<A> {
    config: RuntimeConfig,
    options: ViewerOptions,
    parser: Arc<dyn SceneParser>,
    app: A,

    windows: HashMap<WindowId, WindowEntry>,
    exit_requested: bool,
}

impl<A: ViewerApp> AppState<A> {
    fn create_window_entry(&mut self, event_loop: &ActiveEventLoop) -> Result<WindowId> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;
        let id = window.id();

        let size = window.inner_size();
        let options = ViewerOptions {
            canvas_width: size.width.max(1),
            canvas_height: size.height.max(1),
            ..self.options.clone()
        };
        let parser = self.parser.clone();

        let mut entry = WindowEntryBuilder {
            input: InputState::default(),
            window,
            viewer_builder: |w| {
                let mut provider = WindowContext::new(w);
                Viewer::new(options, &mut provider, parser)
            },
        }
        .build();

        let mut ctx = RuntimeCtx::default();
        let title = &self.config.title;
        let app = &mut self.app;
        entry.with_mut(|fields| {
            if let Some(notice) = fields.viewer.notice() {
                fields.window.set_title(&format!("{title} ({notice})"));
            }
            app.on_ready(fields.viewer, &mut ctx);
        });

        self.windows.insert(id, entry);
        self.apply_commands(event_loop, id, ctx);
        Ok(id)
    }

    fn apply_commands(&mut self, event_loop: &ActiveEventLoop, id: WindowId, mut ctx: RuntimeCtx) {
        for cmd in ctx.commands.drain(..) {
            match cmd {
                Command::SetTitle(title) => {
                    if let Some(entry) = self.windows.get(&id) {
                        entry.with_window(|w| w.set_title(&title));
                    }
                }
                Command::CloseWindow => self.close_window(id),
                Command::Exit => self.exit_requested = true,
            }
        }

        if self.windows.is_empty() {
            self.exit_requested = true;
        }
        if self.exit_requested {
            event_loop.exit();
        }
    }

    fn close_window(&mut self, id: WindowId) {
        if let Some(mut entry) = self.windows.remove(&id) {
            entry.with_viewer_mut(|viewer| {
                if let Err(e) = viewer.destroy() {
                    log::warn!("viewer teardown failed: {e}");
                }
            });
        }
    }
}

impl<A: ViewerApp> ApplicationHandler for AppState<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if !self.windows.is_empty() {
            return;
        }

        if let Err(e) = self.create_window_entry(event_loop) {
            log::error!("failed to create initial window: {e:#}");
            self.exit_requested = true;
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }
        // Redraws are driven by the viewer, never by a frame loop.
        event_loop.set_control_flow(ControlFlow::Wait);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        if matches!(event, WindowEvent::CloseRequested) {
            self.close_window(window_id);
            self.apply_commands(event_loop, window_id, RuntimeCtx::default());
            return;
        }

        let (app, windows) = (&mut self.app, &mut self.windows);
        let Some(entry) = windows.get_mut(&window_id) else {
            return;
        };

        let mut ctx = RuntimeCtx::default();
        entry.with_mut(|fields| {
            let viewer = fields.viewer;

            if let Some(ev) = translate_window_event(fields.input, &event) {
                fields.input.apply_event(&ev);
                viewer.handle_input(&ev);
                app.on_input(viewer, &ev, &mut ctx);
            }

            match &event {
                WindowEvent::Resized(size) => resize(viewer, fields.window, *size),
                WindowEvent::ScaleFactorChanged { .. } => {
                    resize(viewer, fields.window, fields.window.inner_size())
                }
                WindowEvent::RedrawRequested => {
                    if let Err(e) = viewer.render() {
                        log::debug!("redraw failed: {e}");
                    }
                }
                _ => {}
            }
        });

        self.apply_commands(event_loop, window_id, ctx);
    }
}

fn resize(viewer: &mut Viewer<'_>, window: &Window, size: PhysicalSize<u32>) {
    // Minimized windows report a zero size; keep the last view.
    if size.width == 0 || size.height == 0 {
        return;
    }
    // The placeholder of a degraded viewer follows the window by itself.
    if viewer.state() == ViewerState::Degraded {
        window.request_redraw();
        return;
    }
    if let Err(e) = viewer.set_size(size.width, size.height) {
        log::debug!("resize ignored: {e}");
    }
}
