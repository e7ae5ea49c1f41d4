use crate::scene::SceneObject;
use glam::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GizmoMode {
    #[default]
    Translate,
    Rotate,
    Scale,
}

impl GizmoMode {
    pub const ALL: [GizmoMode; 3] = [GizmoMode::Translate, GizmoMode::Rotate, GizmoMode::Scale];

    pub fn label(self) -> &'static str {
        match self {
            GizmoMode::Translate => "Move (G)",
            GizmoMode::Rotate => "Rotate (R)",
            GizmoMode::Scale => "Scale (S)",
        }
    }
}

/// Interactive manipulator attached to the active object.
///
/// `drag` mutates the object directly and reports whether anything changed;
/// callers treat a `true` result as the object-change notification.
pub trait TransformGizmo {
    fn attach(&mut self);
    fn detach(&mut self);
    fn is_attached(&self) -> bool;
    fn set_mode(&mut self, mode: GizmoMode);
    fn mode(&self) -> GizmoMode;
    fn set_visible(&mut self, visible: bool);
    fn is_visible(&self) -> bool;
    /// Returns true when the dragging state actually changed.
    fn set_dragging(&mut self, dragging: bool) -> bool;
    fn is_dragging(&self) -> bool;
    fn drag(&mut self, object: &mut dyn SceneObject, delta: Vec2, uniform_scale: bool) -> bool;
}

/// Screen-space drag manipulator.
///
/// Horizontal drag drives X (yaw in rotate mode), vertical drag drives Y
/// (pitch in rotate mode). Screen Y grows downwards.
#[derive(Debug, Clone)]
pub struct DragGizmo {
    mode: GizmoMode,
    attached: bool,
    visible: bool,
    dragging: bool,
    units_per_pixel: f32,
    radians_per_pixel: f32,
    scale_per_pixel: f32,
}

impl Default for DragGizmo {
    fn default() -> Self {
        Self {
            mode: GizmoMode::Translate,
            attached: false,
            visible: true,
            dragging: false,
            units_per_pixel: 0.01,
            radians_per_pixel: 0.01,
            scale_per_pixel: 0.01,
        }
    }
}

impl TransformGizmo for DragGizmo {
    fn attach(&mut self) {
        self.attached = true;
    }

    fn detach(&mut self) {
        self.attached = false;
        self.dragging = false;
    }

    fn is_attached(&self) -> bool {
        self.attached
    }

    fn set_mode(&mut self, mode: GizmoMode) {
        if self.mode != mode {
            log::debug!("Gizmo mode {:?} -> {:?}", self.mode, mode);
            self.mode = mode;
        }
    }

    fn mode(&self) -> GizmoMode {
        self.mode
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn set_dragging(&mut self, dragging: bool) -> bool {
        let dragging = dragging && self.attached;
        if self.dragging == dragging {
            return false;
        }
        self.dragging = dragging;
        true
    }

    fn is_dragging(&self) -> bool {
        self.dragging
    }

    fn drag(&mut self, object: &mut dyn SceneObject, delta: Vec2, uniform_scale: bool) -> bool {
        if !self.attached || !self.visible || delta == Vec2::ZERO {
            return false;
        }
        let transform = object.transform_mut();
        match self.mode {
            GizmoMode::Translate => {
                transform.position[0] += delta.x * self.units_per_pixel;
                transform.position[1] -= delta.y * self.units_per_pixel;
            }
            GizmoMode::Rotate => {
                transform.rotation[1] += delta.x * self.radians_per_pixel;
                transform.rotation[0] += delta.y * self.radians_per_pixel;
            }
            GizmoMode::Scale => {
                if uniform_scale {
                    let amount = (delta.x - delta.y) * self.scale_per_pixel;
                    let value = transform.scale[0] + amount;
                    transform.scale = [value; 3];
                } else {
                    transform.scale[0] += delta.x * self.scale_per_pixel;
                    transform.scale[1] -= delta.y * self.scale_per_pixel;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Model;

    fn attached() -> DragGizmo {
        let mut gizmo = DragGizmo::default();
        gizmo.attach();
        gizmo
    }

    #[test]
    fn detached_gizmo_ignores_drags() {
        let mut gizmo = DragGizmo::default();
        let mut cube = Model::cube(0);
        assert!(!gizmo.drag(&mut cube, Vec2::new(10.0, 0.0), false));
        assert_eq!(cube.transform().position, [0.0; 3]);
    }

    #[test]
    fn translate_follows_screen_axes() {
        let mut gizmo = attached();
        let mut cube = Model::cube(0);
        assert!(gizmo.drag(&mut cube, Vec2::new(100.0, 50.0), false));
        let position = cube.transform().position;
        assert!((position[0] - 1.0).abs() < 1e-6);
        assert!((position[1] + 0.5).abs() < 1e-6);
        assert_eq!(position[2], 0.0);
    }

    #[test]
    fn rotate_accumulates_without_wrapping() {
        let mut gizmo = attached();
        gizmo.set_mode(GizmoMode::Rotate);
        let mut cube = Model::cube(0);
        for _ in 0..10 {
            gizmo.drag(&mut cube, Vec2::new(100.0, 0.0), false);
        }
        assert!((cube.transform().rotation[1] - 10.0).abs() < 1e-4);
    }

    #[test]
    fn uniform_scale_drag_moves_all_axes() {
        let mut gizmo = attached();
        gizmo.set_mode(GizmoMode::Scale);
        let mut cube = Model::cube(0);
        gizmo.drag(&mut cube, Vec2::new(100.0, 0.0), true);
        let scale = cube.transform().scale;
        assert!(scale.iter().all(|axis| (axis - 2.0).abs() < 1e-5));
        assert_eq!(scale[0], scale[1]);
        assert_eq!(scale[1], scale[2]);

        gizmo.drag(&mut cube, Vec2::new(100.0, 0.0), false);
        let scale = cube.transform().scale;
        assert!((scale[0] - 3.0).abs() < 1e-5);
        assert!((scale[1] - 2.0).abs() < 1e-5);
    }

    #[test]
    fn dragging_state_reports_edges_only() {
        let mut gizmo = attached();
        assert!(gizmo.set_dragging(true));
        assert!(!gizmo.set_dragging(true));
        gizmo.detach();
        assert!(!gizmo.is_dragging());
        assert!(!gizmo.set_dragging(true));
    }
}
