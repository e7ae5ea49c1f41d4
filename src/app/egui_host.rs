use crate::render::UiFrame;
use egui_winit::winit::event::WindowEvent;
use std::time::Duration;
use winit::window::Window;

pub struct EguiFrameOutput {
    pub clipped_primitives: Vec<egui::ClippedPrimitive>,
    pub textures_delta: egui::TexturesDelta,
    pub pixels_per_point: f32,
    /// How soon egui wants another frame (animations, blinking cursor).
    pub repaint_delay: Duration,
}

impl EguiFrameOutput {
    pub fn ui_frame(&self) -> UiFrame<'_> {
        UiFrame {
            primitives: &self.clipped_primitives,
            textures_delta: &self.textures_delta,
            pixels_per_point: self.pixels_per_point,
        }
    }
}

pub struct EguiHost {
    context: egui::Context,
    winit_state: egui_winit::State,
}

impl EguiHost {
    pub fn new(window: &Window) -> Self {
        let context = egui::Context::default();
        let winit_state = egui_winit::State::new(
            context.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        Self {
            context,
            winit_state,
        }
    }

    pub fn on_window_event(
        &mut self,
        window: &Window,
        event: &WindowEvent,
    ) -> egui_winit::EventResponse {
        self.winit_state.on_window_event(window, event)
    }

    /// True while a text field has keyboard focus.
    pub fn wants_keyboard_input(&self) -> bool {
        self.context.wants_keyboard_input()
    }

    pub fn run_ui<F>(&mut self, window: &Window, run_ui: F) -> EguiFrameOutput
    where
        F: FnMut(&egui::Context),
    {
        let raw_input = self.winit_state.take_egui_input(window);
        let full_output = self.context.run(raw_input, run_ui);
        self.winit_state
            .handle_platform_output(window, full_output.platform_output);
        let repaint_delay = full_output
            .viewport_output
            .get(&egui::ViewportId::ROOT)
            .map(|viewport| viewport.repaint_delay)
            .unwrap_or(Duration::MAX);
        let pixels_per_point = full_output.pixels_per_point;
        let clipped_primitives = self
            .context
            .tessellate(full_output.shapes, pixels_per_point);

        EguiFrameOutput {
            clipped_primitives,
            textures_delta: full_output.textures_delta,
            pixels_per_point,
            repaint_delay,
        }
    }
}
