pub mod controls;

use crate::export::ExportFormat;
use crate::render::gizmo::GizmoMode;
use crate::render::Viewport;
use crate::sync::{BindingHandle, PropertyBindingSync, UniformScaleMode};
use controls::{format_hex_color, swatch_color, ControlSlot, Widget};
use egui::Color32;
use glam::Vec2;

/// Something the user did in the panel, applied by the app after the UI pass.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelEvent {
    Commit { handle: BindingHandle, raw: String },
    SetGizmoMode(GizmoMode),
    LoadModel,
    Export(ExportFormat),
    DragStarted,
    Dragged(Vec2),
    DragStopped,
}

pub struct InspectorPanel {
    status: String,
    viewport_size: [u32; 2],
}

impl Default for InspectorPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl InspectorPanel {
    pub fn new() -> Self {
        Self {
            status: String::new(),
            viewport_size: [1, 1],
        }
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    /// Size of the viewport area in physical pixels, as of the last frame.
    pub fn viewport_size(&self) -> [u32; 2] {
        self.viewport_size
    }

    pub fn show(
        &mut self,
        ctx: &egui::Context,
        sync: &mut PropertyBindingSync,
        viewport: &Viewport,
        loading: bool,
    ) -> Vec<PanelEvent> {
        let mut events = Vec::new();

        egui::SidePanel::left("inspector")
            .resizable(false)
            .default_width(260.0)
            .show(ctx, |ui| {
                ui.heading("Inspector");
                ui.label(
                    sync.object()
                        .map(|object| object.name().to_string())
                        .unwrap_or_else(|| "No model".to_string()),
                );
                ui.separator();

                egui::Grid::new("controls")
                    .num_columns(2)
                    .spacing([12.0, 6.0])
                    .show(ui, |ui| {
                        for slot in sync.controls_mut().slots_mut() {
                            ui.label(slot.label.as_str());
                            control_row(ui, slot, &mut events);
                            ui.end_row();
                        }
                    });

                if sync.uniform_scale_mode() == UniformScaleMode::On {
                    ui.colored_label(Color32::LIGHT_BLUE, "Uniform scale");
                }
                ui.separator();

                let mut mode = sync.gizmo().mode();
                ui.horizontal(|ui| {
                    for candidate in GizmoMode::ALL {
                        if ui
                            .selectable_value(&mut mode, candidate, candidate.label())
                            .changed()
                        {
                            events.push(PanelEvent::SetGizmoMode(candidate));
                        }
                    }
                });
                ui.separator();

                if ui
                    .add_enabled(!loading, egui::Button::new("Load model (O)"))
                    .clicked()
                {
                    events.push(PanelEvent::LoadModel);
                }
                ui.horizontal(|ui| {
                    for format in ExportFormat::ALL {
                        if ui.button(format!("Export {}", format.label())).clicked() {
                            events.push(PanelEvent::Export(format));
                        }
                    }
                });

                if loading {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("Loading");
                    });
                }
                if !self.status.is_empty() {
                    ui.separator();
                    ui.small(self.status.as_str());
                }
            });

        egui::CentralPanel::default()
            .frame(egui::Frame::default())
            .show(ctx, |ui| {
                let (response, painter) =
                    ui.allocate_painter(ui.available_size(), egui::Sense::drag());
                let pixels_per_point = ctx.pixels_per_point();
                self.viewport_size = [
                    (response.rect.width() * pixels_per_point).round().max(1.0) as u32,
                    (response.rect.height() * pixels_per_point).round().max(1.0) as u32,
                ];

                if response.drag_started() {
                    events.push(PanelEvent::DragStarted);
                }
                if response.dragged() {
                    let delta = response.drag_delta();
                    if delta != egui::Vec2::ZERO {
                        events.push(PanelEvent::Dragged(Vec2::new(delta.x, delta.y)));
                    }
                }
                if response.drag_stopped() {
                    events.push(PanelEvent::DragStopped);
                }

                viewport.paint(&painter, response.rect, sync.object(), sync.gizmo());
            });

        events
    }
}

fn control_row(ui: &mut egui::Ui, slot: &mut ControlSlot, events: &mut Vec<PanelEvent>) {
    let Some(handle) = slot.binding else {
        ui.weak("unbound");
        return;
    };
    let mut commit = |raw: String| events.push(PanelEvent::Commit { handle, raw });

    match &mut slot.widget {
        Widget::Placeholder => {
            ui.weak("unbound");
        }
        Widget::Number { text, range, step } => {
            let mut response = ui.add(
                egui::TextEdit::singleline(text)
                    .id_salt(&slot.id)
                    .desired_width(90.0),
            );
            if let Some(range) = range {
                response = response.on_hover_text(format!(
                    "{:.2} to {:.2}, step {}",
                    range.min, range.max, step
                ));
            }
            // Enter also drops focus on a single-line edit.
            if response.lost_focus() {
                commit(text.clone());
            }
        }
        Widget::Slider {
            value,
            range,
            step,
            readout,
        } => {
            ui.horizontal(|ui| {
                let response = ui.add(
                    egui::Slider::new(&mut *value, range.min..=range.max)
                        .step_by(f64::from(*step))
                        .show_value(false),
                );
                ui.monospace(readout.as_str());
                if response.changed() {
                    commit(value.to_string());
                }
            });
        }
        Widget::Color {
            hex,
            foreground,
            background,
        } => {
            ui.horizontal(|ui| {
                let mut rgb = *background;
                if ui.color_edit_button_srgb(&mut rgb).changed() {
                    commit(format_hex_color(swatch_color(rgb)));
                }
                let [fr, fg, fb] = *foreground;
                let [br, bg, bb] = *background;
                egui::Frame::default()
                    .fill(Color32::from_rgb(br, bg, bb))
                    .inner_margin(egui::Margin::same(2))
                    .show(ui, |ui| {
                        let response = ui.add(
                            egui::TextEdit::singleline(hex)
                                .id_salt(&slot.id)
                                .text_color(Color32::from_rgb(fr, fg, fb))
                                .frame(false)
                                .desired_width(70.0),
                        );
                        if response.lost_focus() {
                            commit(hex.clone());
                        }
                    });
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{default_layout, RotationPolicy};
    use crate::render::gizmo::DragGizmo;
    use crate::scene::{Model, TransformState};
    use crate::sync::table::default_table;
    use controls::ControlSurface;

    fn run_frame(panel: &mut InspectorPanel, sync: &mut PropertyBindingSync) -> Vec<PanelEvent> {
        let ctx = egui::Context::default();
        let input = egui::RawInput {
            screen_rect: Some(egui::Rect::from_min_size(
                egui::Pos2::ZERO,
                egui::vec2(1024.0, 768.0),
            )),
            ..Default::default()
        };
        let mut events = Vec::new();
        let _ = ctx.run(input, |ctx| {
            events = panel.show(ctx, sync, &Viewport::default(), false);
        });
        events
    }

    #[test]
    fn idle_frame_emits_nothing_and_measures_viewport() {
        let mut sync = PropertyBindingSync::new(
            ControlSurface::from_layout(&default_layout()),
            default_table(30.0),
            Box::new(DragGizmo::default()),
            TransformState::default(),
            RotationPolicy::Unbounded,
        );
        sync.rebind(Box::new(Model::cube(0x00ff00)));
        let mut panel = InspectorPanel::new();

        let events = run_frame(&mut panel, &mut sync);
        assert!(events.is_empty(), "unexpected events {:?}", events);
        let [width, height] = panel.viewport_size();
        assert!(width > 1 && width < 1024);
        assert_eq!(height, 768);
    }
}
