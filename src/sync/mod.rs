//! Two-way synchronization between the inspector controls and the active object.
//!
//! `PropertyBindingSync` owns the active object, the gizmo attached to it and
//! the control surface. Every mutation path (user input, gizmo drag, model
//! replacement) ends in `refresh_all`, so the controls always show the live
//! transform and color once an update returns.

pub mod table;

use crate::config::RotationPolicy;
use crate::render::gizmo::{GizmoMode, TransformGizmo};
use crate::scene::{SceneObject, Transform, TransformState};
use crate::ui::controls::{
    color_widget, format_number, parse_hex_color, parse_number, ControlSurface, Widget,
};
use glam::Vec2;
use table::{Axis, BindingSpec, ControlKind, Target, ValueRange};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum BindError {
    #[error("No control slot named '{0}'")]
    MissingElement(String),
    #[error("Invalid range [{min}, {max}] for '{id}'")]
    InvalidRange { id: String, min: f32, max: f32 },
    #[error("Step must be positive for '{id}', got {step}")]
    InvalidStep { id: String, step: f32 },
    #[error("Slider '{0}' needs a range")]
    SliderWithoutRange(String),
    #[error("Control '{id}' of kind {kind:?} cannot edit {target:?}")]
    KindMismatch {
        id: String,
        kind: ControlKind,
        target: Target,
    },
}

/// Index of an established binding. Stable across rebinds of the same control id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingHandle(usize);

impl BindingHandle {
    #[cfg(test)]
    pub fn new(index: usize) -> Self {
        Self(index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UniformScaleMode {
    #[default]
    Off,
    On,
}

pub struct PropertyBindingSync {
    object: Option<Box<dyn SceneObject>>,
    gizmo: Box<dyn TransformGizmo>,
    state: TransformState,
    controls: ControlSurface,
    table: Vec<BindingSpec>,
    bindings: Vec<BindingSpec>,
    uniform_scale: UniformScaleMode,
    rotation_policy: RotationPolicy,
    redraw_requested: bool,
}

impl PropertyBindingSync {
    pub fn new(
        controls: ControlSurface,
        table: Vec<BindingSpec>,
        gizmo: Box<dyn TransformGizmo>,
        initial: TransformState,
        rotation_policy: RotationPolicy,
    ) -> Self {
        Self {
            object: None,
            gizmo,
            state: initial,
            controls,
            table,
            bindings: Vec::new(),
            uniform_scale: UniformScaleMode::Off,
            rotation_policy,
            redraw_requested: true,
        }
    }

    pub fn bind(
        &mut self,
        control_id: &str,
        kind: ControlKind,
        target: Target,
        range: Option<ValueRange>,
        step: f32,
    ) -> Result<BindingHandle, BindError> {
        let spec = BindingSpec::new(control_id, kind, target, range, step);
        validate(&spec)?;

        if !self.controls.contains(control_id) {
            log::warn!("Control '{}' not found, binding skipped", control_id);
            return Err(BindError::MissingElement(control_id.to_string()));
        }

        let handle = match self
            .bindings
            .iter()
            .position(|existing| existing.control_id == spec.control_id)
        {
            Some(index) => {
                self.bindings[index] = spec;
                BindingHandle(index)
            }
            None => {
                self.bindings.push(spec);
                BindingHandle(self.bindings.len() - 1)
            }
        };

        let widget = widget_for(&self.bindings[handle.0], &self.state);
        self.controls.replace(control_id, widget, handle);
        Ok(handle)
    }

    /// Bind every entry of the table. Failures are logged and skipped.
    pub fn bind_table(&mut self) -> Vec<BindingHandle> {
        let table = self.table.clone();
        let mut handles = Vec::with_capacity(table.len());
        for spec in table {
            match self.bind(&spec.control_id, spec.kind, spec.target, spec.range, spec.step) {
                Ok(handle) => handles.push(handle),
                // Already warned.
                Err(BindError::MissingElement(_)) => {}
                Err(err) => log::error!("Skipping binding: {}", err),
            }
        }
        handles
    }

    /// Commit a raw control value. Returns true if the state changed.
    pub fn on_user_input(&mut self, handle: BindingHandle, raw: &str) -> bool {
        let Some(spec) = self.bindings.get(handle.0).cloned() else {
            log::debug!("Input for unknown binding {:?}", handle);
            return false;
        };

        let applied = match spec.target {
            Target::Color => match parse_hex_color(raw) {
                Some(color) => {
                    self.apply_color(color);
                    true
                }
                None => false,
            },
            target => match parse_number(raw) {
                Some(value) => {
                    let value = self.constrain(&spec, value);
                    self.apply_value(target, value);
                    true
                }
                None => false,
            },
        };

        if applied {
            self.request_redraw();
        } else {
            log::debug!("Ignoring unparseable input {:?} for '{}'", raw, spec.control_id);
        }
        // Also restores the display after rejected input.
        self.refresh_all();
        applied
    }

    /// Pull the live transform and color back into the state after an
    /// outside actor mutated the object.
    pub fn on_external_change(&mut self) {
        let Some(object) = self.object.as_deref_mut() else {
            self.refresh_all();
            return;
        };

        if self.uniform_scale == UniformScaleMode::On {
            let live = object.transform().scale;
            let changed = Axis::ALL
                .into_iter()
                .find(|axis| live[axis.index()] != self.state.scale[axis.index()])
                .unwrap_or(Axis::X);
            object.transform_mut().scale = [live[changed.index()]; 3];
        }

        let live = *object.transform();
        self.state.position = live.position;
        self.state.rotation = live.rotation;
        self.state.scale = live.scale;
        if let Some(color) = object.first_color() {
            self.state.color = color;
        }
        self.refresh_all();
    }

    /// Replace the active object, carrying the held state over to it.
    pub fn rebind(&mut self, mut object: Box<dyn SceneObject>) {
        self.gizmo.detach();
        if let Some(mut old) = self.object.take() {
            log::debug!("Disposing '{}'", old.name());
            old.dispose();
        }

        if let Some(bounds) = object.local_bounds() {
            object.recenter(bounds.center());
        }
        *object.transform_mut() = self.state.transform();
        for material in object.materials_mut() {
            material.set_color(self.state.color);
        }
        log::info!("Active object is now '{}'", object.name());
        self.object = Some(object);

        self.gizmo.attach();
        self.gizmo.set_mode(GizmoMode::Translate);
        self.bind_table();
        self.request_redraw();
    }

    /// Returns true on an actual Off/On transition.
    pub fn set_uniform_scale_mode(&mut self, active: bool) -> bool {
        let mode = if active {
            UniformScaleMode::On
        } else {
            UniformScaleMode::Off
        };
        if mode == self.uniform_scale {
            return false;
        }
        self.uniform_scale = mode;
        log::debug!("Uniform scale {:?}", mode);

        if mode == UniformScaleMode::On {
            let x = self.state.scale[0];
            self.state.scale = [x; 3];
            if let Some(object) = self.object.as_deref_mut() {
                object.transform_mut().scale = [x; 3];
            }
            // Other fields may hold uncommitted text while the modifier is pressed.
            self.refresh_where(|target| matches!(target, Target::Scale(_)));
            self.request_redraw();
        }
        true
    }

    pub fn uniform_scale_mode(&self) -> UniformScaleMode {
        self.uniform_scale
    }

    /// Forward a pointer drag to the gizmo. Returns true if the object moved.
    pub fn drag_gizmo(&mut self, delta: Vec2) -> bool {
        let uniform = self.uniform_scale == UniformScaleMode::On;
        let Some(object) = self.object.as_deref_mut() else {
            return false;
        };
        if !self.gizmo.drag(object, delta, uniform) {
            return false;
        }
        self.on_external_change();
        self.request_redraw();
        true
    }

    pub fn set_gizmo_dragging(&mut self, dragging: bool) -> bool {
        let changed = self.gizmo.set_dragging(dragging);
        if changed {
            log::debug!("Gizmo dragging: {}", dragging);
        }
        changed
    }

    pub fn set_gizmo_mode(&mut self, mode: GizmoMode) {
        if self.gizmo.mode() != mode {
            self.gizmo.set_mode(mode);
            self.request_redraw();
        }
    }

    pub fn gizmo(&self) -> &dyn TransformGizmo {
        self.gizmo.as_ref()
    }

    pub fn object(&self) -> Option<&dyn SceneObject> {
        self.object.as_deref()
    }

    /// Borrow the object for reading while the gizmo is mutated.
    pub fn scene_parts_mut(&mut self) -> (Option<&dyn SceneObject>, &mut dyn TransformGizmo) {
        (self.object.as_deref(), self.gizmo.as_mut())
    }

    pub fn controls_mut(&mut self) -> &mut ControlSurface {
        &mut self.controls
    }

    pub fn request_redraw(&mut self) {
        self.redraw_requested = true;
    }

    pub fn take_redraw_request(&mut self) -> bool {
        std::mem::take(&mut self.redraw_requested)
    }

    /// Release the active object and return every control to its placeholder.
    pub fn teardown(&mut self) {
        self.gizmo.detach();
        if let Some(mut object) = self.object.take() {
            object.dispose();
        }
        self.bindings.clear();
        for slot in self.controls.slots_mut() {
            slot.widget = Widget::Placeholder;
            slot.binding = None;
        }
    }

    fn constrain(&self, spec: &BindingSpec, value: f32) -> f32 {
        let unbounded = matches!(spec.target, Target::Rotation(_))
            && self.rotation_policy == RotationPolicy::Unbounded;
        match spec.range {
            Some(range) if !unbounded => range.clamp(value),
            _ => value,
        }
    }

    fn apply_value(&mut self, target: Target, value: f32) {
        let uniform = matches!(target, Target::Scale(_)) && self.uniform_scale == UniformScaleMode::On;
        if uniform {
            self.state.scale = [value; 3];
        } else if let Some(field) = state_field(&mut self.state, target) {
            *field = value;
        }

        if let Some(object) = self.object.as_deref_mut() {
            let transform = object.transform_mut();
            if uniform {
                transform.scale = [value; 3];
            } else if let Some(field) = transform_field(transform, target) {
                *field = value;
            }
        }
    }

    fn apply_color(&mut self, color: u32) {
        self.state.color = color;
        if let Some(object) = self.object.as_deref_mut() {
            for material in object.materials_mut() {
                material.set_color(color);
            }
        }
    }

    fn refresh_all(&mut self) {
        self.refresh_where(|_| true);
    }

    fn refresh_where(&mut self, include: impl Fn(Target) -> bool) {
        for (index, spec) in self.bindings.iter().enumerate() {
            if !include(spec.target) {
                continue;
            }
            let widget = widget_for(spec, &self.state);
            self.controls
                .replace(&spec.control_id, widget, BindingHandle(index));
        }
    }
}

#[cfg(test)]
impl PropertyBindingSync {
    pub fn state(&self) -> &TransformState {
        &self.state
    }

    pub fn controls(&self) -> &ControlSurface {
        &self.controls
    }

    pub fn handle_for(&self, control_id: &str) -> Option<BindingHandle> {
        self.bindings
            .iter()
            .position(|spec| spec.control_id == control_id)
            .map(BindingHandle)
    }
}

impl Drop for PropertyBindingSync {
    fn drop(&mut self) {
        if self.object.is_some() {
            self.teardown();
        }
    }
}

fn validate(spec: &BindingSpec) -> Result<(), BindError> {
    let id = &spec.control_id;
    if !(spec.step > 0.0) {
        return Err(BindError::InvalidStep {
            id: id.clone(),
            step: spec.step,
        });
    }
    if let Some(range) = spec.range {
        if !range.is_valid() {
            return Err(BindError::InvalidRange {
                id: id.clone(),
                min: range.min,
                max: range.max,
            });
        }
    }
    let compatible = match spec.kind {
        ControlKind::Color => spec.target == Target::Color,
        ControlKind::Number | ControlKind::Slider => spec.target.is_numeric(),
    };
    if !compatible {
        return Err(BindError::KindMismatch {
            id: id.clone(),
            kind: spec.kind,
            target: spec.target,
        });
    }
    if spec.kind == ControlKind::Slider && spec.range.is_none() {
        return Err(BindError::SliderWithoutRange(id.clone()));
    }
    Ok(())
}

fn state_value(state: &TransformState, target: Target) -> f32 {
    match target {
        Target::Position(axis) => state.position[axis.index()],
        Target::Rotation(axis) => state.rotation[axis.index()],
        Target::Scale(axis) => state.scale[axis.index()],
        Target::Color => state.color as f32,
    }
}

fn state_field(state: &mut TransformState, target: Target) -> Option<&mut f32> {
    match target {
        Target::Position(axis) => Some(&mut state.position[axis.index()]),
        Target::Rotation(axis) => Some(&mut state.rotation[axis.index()]),
        Target::Scale(axis) => Some(&mut state.scale[axis.index()]),
        Target::Color => None,
    }
}

fn transform_field(transform: &mut Transform, target: Target) -> Option<&mut f32> {
    match target {
        Target::Position(axis) => Some(&mut transform.position[axis.index()]),
        Target::Rotation(axis) => Some(&mut transform.rotation[axis.index()]),
        Target::Scale(axis) => Some(&mut transform.scale[axis.index()]),
        Target::Color => None,
    }
}

fn widget_for(spec: &BindingSpec, state: &TransformState) -> Widget {
    match spec.kind {
        ControlKind::Color => color_widget(state.color),
        ControlKind::Number => Widget::Number {
            text: format_number(state_value(state, spec.target)),
            range: spec.range,
            step: spec.step,
        },
        ControlKind::Slider => {
            let value = state_value(state, spec.target);
            Widget::Slider {
                value,
                range: spec.range.unwrap_or(ValueRange::new(value, value)),
                step: spec.step,
                readout: format_number(value),
            }
        }
    }
}
