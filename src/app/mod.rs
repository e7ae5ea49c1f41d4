mod egui_host;
mod input;
mod timing;

use crate::assets::{AssetManager, LoadEvent, SUPPORTED_EXTENSIONS};
use crate::config::{AppConfig, RedrawPolicy};
use crate::export::{export_viewport, ExportFormat};
use crate::render::{DragGizmo, RenderContext, RenderError, Viewport};
use crate::scene::Model;
use crate::sync::table::default_table;
use crate::sync::PropertyBindingSync;
use crate::ui::controls::ControlSurface;
use crate::ui::{InspectorPanel, PanelEvent};
use egui_host::EguiHost;
use input::{InputAction, InputState};
use timing::FrameTiming;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

const WINDOW_TITLE: &str = "Model Inspector";
/// Poll interval for the loader while idling in on-demand mode.
const LOAD_POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct App {
    config: AppConfig,
    window: Option<Arc<Window>>,
    render: Option<RenderContext>,
    egui: Option<EguiHost>,
    sync: PropertyBindingSync,
    assets: AssetManager,
    panel: InspectorPanel,
    viewport: Viewport,
    input: InputState,
    timing: FrameTiming,
    target_frame_duration: Duration,
    next_frame_time: Instant,
    startup_error: Option<RenderError>,
}

impl App {
    fn new(config: AppConfig) -> Self {
        let mut sync = PropertyBindingSync::new(
            ControlSurface::from_layout(&config.layout),
            default_table(config.scale_limit),
            Box::new(DragGizmo::default()),
            config.initial_state,
            config.rotation_policy,
        );
        sync.bind_table();
        if config.start_with_cube {
            sync.rebind(Box::new(Model::cube(config.initial_state.color)));
        }

        Self {
            input: InputState::new(config.uniform_scale_key),
            config,
            window: None,
            render: None,
            egui: None,
            sync,
            assets: AssetManager::new(),
            panel: InspectorPanel::new(),
            viewport: Viewport::default(),
            timing: FrameTiming::new(WINDOW_TITLE),
            target_frame_duration: Duration::from_millis(16),
            next_frame_time: Instant::now(),
            startup_error: None,
        }
    }

    fn update_target_frame_duration(&mut self, window: &Window) {
        let mut target = Duration::from_millis(16);
        if let Some(millihz) = window
            .current_monitor()
            .and_then(|monitor| monitor.refresh_rate_millihertz())
        {
            let hz = millihz as f32 / 1000.0;
            if hz > 1.0 {
                target = Duration::from_secs_f32(1.0 / hz);
            }
        }
        self.target_frame_duration = target;
        self.next_frame_time = Instant::now() + self.target_frame_duration;
    }

    fn render(&mut self) {
        let Some(window) = self.window.clone() else {
            return;
        };
        self.process_load_events();

        let loading = self.assets.is_loading();
        let Some(egui) = self.egui.as_mut() else {
            return;
        };
        let panel = &mut self.panel;
        let sync = &mut self.sync;
        let viewport = &self.viewport;
        let mut events = Vec::new();
        let output = egui.run_ui(&window, |ctx| {
            events = panel.show(ctx, sync, viewport, loading);
        });

        if let Some(render) = &mut self.render {
            if let Err(err) = render.render(output.ui_frame()) {
                log::error!("Frame failed: {}", err);
            }
        }
        if output.repaint_delay.is_zero() {
            self.sync.request_redraw();
        }
        self.timing.update(
            &window,
            Instant::now(),
            self.sync.object().map(|object| object.name()),
        );

        for event in events {
            self.apply_panel_event(event);
        }
    }

    fn apply_panel_event(&mut self, event: PanelEvent) {
        match event {
            PanelEvent::Commit { handle, raw } => {
                self.sync.on_user_input(handle, &raw);
            }
            PanelEvent::SetGizmoMode(mode) => self.sync.set_gizmo_mode(mode),
            PanelEvent::LoadModel => self.open_model_dialog(),
            PanelEvent::Export(format) => self.export(format),
            PanelEvent::DragStarted => {
                self.sync.set_gizmo_dragging(true);
            }
            PanelEvent::Dragged(delta) => {
                self.sync.drag_gizmo(delta);
            }
            PanelEvent::DragStopped => {
                self.sync.set_gizmo_dragging(false);
            }
        }
    }

    fn apply_input_action(&mut self, action: InputAction, event_loop: &ActiveEventLoop) {
        match action {
            InputAction::None => {}
            InputAction::SetGizmoMode(mode) => self.sync.set_gizmo_mode(mode),
            InputAction::UniformScale(active) => {
                self.sync.set_uniform_scale_mode(active);
            }
            InputAction::OpenModel => self.open_model_dialog(),
            InputAction::Quit => event_loop.exit(),
        }
    }

    fn open_model_dialog(&mut self) {
        if self.assets.is_loading() {
            return;
        }
        let Some(path) = rfd::FileDialog::new()
            .add_filter("3D model", &SUPPORTED_EXTENSIONS)
            .pick_file()
        else {
            return;
        };
        if let Err(err) = self.assets.load(&path) {
            log::warn!("Failed to start loading {}: {}", path.display(), err);
            show_error("Model load failed", &err.to_string());
        }
        self.sync.request_redraw();
    }

    fn process_load_events(&mut self) {
        for event in self.assets.poll() {
            match event {
                LoadEvent::Progress { path, fraction } => {
                    self.panel.set_status(format!(
                        "Loading {} ({:.0}%)",
                        path.display(),
                        fraction * 100.0
                    ));
                }
                LoadEvent::Loaded { path, model } => {
                    log::info!("Loaded {}", path.display());
                    self.panel.set_status(format!("Loaded {}", path.display()));
                    self.sync.rebind(Box::new(model));
                }
                LoadEvent::Failed { path, error } => {
                    log::warn!("Failed to load {}: {}", path.display(), error);
                    self.panel.set_status("Load failed");
                    show_error("Model load failed", &error.to_string());
                }
            }
            self.sync.request_redraw();
        }
    }

    fn export(&mut self, format: ExportFormat) {
        let result = export_viewport(
            &mut self.sync,
            &self.viewport,
            self.panel.viewport_size(),
            format,
            &self.config.export_dir,
        );
        match result {
            Ok(path) => self.panel.set_status(format!("Saved {}", path.display())),
            Err(err) => {
                log::warn!("{} export failed: {}", format.label(), err);
                self.panel.set_status(format!("{} export failed", format.label()));
                show_error(&format!("{} export", format.label()), &err.to_string());
            }
        }
        self.sync.request_redraw();
    }
}

/// Blocking error notification.
fn show_error(title: &str, description: &str) {
    let _ = rfd::MessageDialog::new()
        .set_level(rfd::MessageLevel::Error)
        .set_title(title)
        .set_description(description)
        .set_buttons(rfd::MessageButtons::Ok)
        .show();
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let [width, height] = self.config.window_size;
        let window_attrs = WindowAttributes::default()
            .with_title(self.timing.base_title())
            .with_inner_size(PhysicalSize::new(width.max(1), height.max(1)))
            .with_resizable(true);

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                log::error!("Failed to create window: {}", err);
                event_loop.exit();
                return;
            }
        };

        match RenderContext::new(window.clone()) {
            Ok(render) => self.render = Some(render),
            Err(err) => {
                log::error!("Failed to initialise rendering: {}", err);
                show_error("Model Inspector", &err.to_string());
                self.startup_error = Some(err);
                event_loop.exit();
                return;
            }
        }
        self.egui = Some(EguiHost::new(&window));
        self.update_target_frame_duration(&window);
        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let (Some(egui), Some(window)) = (self.egui.as_mut(), self.window.as_ref()) {
            if egui.on_window_event(window, &event).repaint {
                self.sync.request_redraw();
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Focused(focused) => {
                if !focused {
                    let action = self.input.release_all();
                    self.apply_input_action(action, event_loop);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                let pressed = event.state == ElementState::Pressed;
                let ui_has_focus = self
                    .egui
                    .as_ref()
                    .is_some_and(|egui| egui.wants_keyboard_input());
                let action = self
                    .input
                    .handle_key(event.physical_key, pressed, ui_has_focus);
                self.apply_input_action(action, event_loop);
            }
            WindowEvent::Resized(new_size) => {
                if let Some(render) = &mut self.render {
                    render.resize(new_size);
                }
                self.sync.request_redraw();
            }
            WindowEvent::ScaleFactorChanged { .. } => {
                if let (Some(render), Some(window)) = (self.render.as_mut(), self.window.as_ref()) {
                    render.resize(window.inner_size());
                }
                self.sync.request_redraw();
            }
            WindowEvent::Moved(_) => {
                if let Some(window) = self.window.clone() {
                    self.update_target_frame_duration(&window);
                }
            }
            WindowEvent::RedrawRequested => {
                self.render();
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(window) = &self.window else {
            return;
        };
        match self.config.redraw {
            RedrawPolicy::Continuous => {
                let now = Instant::now();
                if now >= self.next_frame_time {
                    self.sync.take_redraw_request();
                    window.request_redraw();
                    self.next_frame_time = now + self.target_frame_duration;
                }
                event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_frame_time));
            }
            RedrawPolicy::OnDemand => {
                if self.sync.take_redraw_request() {
                    window.request_redraw();
                }
                if self.assets.is_loading() {
                    // Keep polling so the result is picked up without input.
                    event_loop.set_control_flow(ControlFlow::WaitUntil(
                        Instant::now() + LOAD_POLL_INTERVAL,
                    ));
                    self.sync.request_redraw();
                } else {
                    event_loop.set_control_flow(ControlFlow::Wait);
                }
            }
        }
    }
}

pub fn run() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let config = AppConfig::load();
    log::info!("🚀 {}", WINDOW_TITLE);
    log::info!(
        "   G/R/S gizmo mode, hold {:?} for uniform scale, O to open, ESC to exit",
        config.uniform_scale_key
    );

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            log::error!("Failed to create event loop: {}", err);
            return ExitCode::FAILURE;
        }
    };
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config);
    if let Err(err) = event_loop.run_app(&mut app) {
        log::error!("Event loop error: {}", err);
        return ExitCode::FAILURE;
    }
    if let Some(err) = app.startup_error.take() {
        log::error!("Exiting after startup failure: {}", err);
        return ExitCode::FAILURE;
    }

    app.sync.teardown();
    log::info!("👋 Goodbye!");
    ExitCode::SUCCESS
}
