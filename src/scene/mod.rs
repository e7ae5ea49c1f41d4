mod model;

pub use model::{Aabb, Material, Mesh, Model, SceneNode};

use glam::{EulerRot, Mat4, Quat, Vec3};

pub const DEFAULT_COLOR: u32 = 0x00ff00;

/// Editable transform and material state, mirrored by the inspector controls.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TransformState {
    pub position: [f32; 3],
    /// Euler angles in radians, XYZ order.
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
    /// 24-bit RGB.
    pub color: u32,
}

impl Default for TransformState {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 0.0],
            rotation: [0.0, 0.0, 0.0],
            scale: [1.0, 1.0, 1.0],
            color: DEFAULT_COLOR,
        }
    }
}

impl TransformState {
    pub fn transform(&self) -> Transform {
        Transform {
            position: self.position,
            rotation: self.rotation,
            scale: self.scale,
        }
    }
}

/// Live placement of a scene object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
}

impl Default for Transform {
    fn default() -> Self {
        TransformState::default().transform()
    }
}

/// A material whose base color can be read and replaced.
pub trait MaterialColor {
    fn color(&self) -> u32;
    fn set_color(&mut self, color: u32);
}

/// Capability interface for the object being inspected.
///
/// The binding layer only needs a settable transform, a way to walk every
/// mesh-bearing node's material, bounds for recentering, and a release hook.
pub trait SceneObject {
    fn name(&self) -> &str;

    fn transform(&self) -> &Transform;

    fn transform_mut(&mut self) -> &mut Transform;

    /// Lazily yields the material of every mesh-bearing node in the hierarchy.
    fn materials_mut(&mut self) -> Box<dyn Iterator<Item = &mut dyn MaterialColor> + '_>;

    /// Bounds of the geometry in object space (node transforms applied,
    /// object transform not applied).
    fn local_bounds(&self) -> Option<Aabb>;

    /// Shift the geometry so that `center` ends up at the object origin.
    fn recenter(&mut self, center: Vec3);

    /// Visit every triangle in object space together with its material color.
    fn for_each_triangle(&self, visit: &mut dyn FnMut(&[Vec3; 3], u32));

    /// Release geometry and material resources. The object is not used afterwards.
    fn dispose(&mut self);

    fn first_color(&mut self) -> Option<u32> {
        self.materials_mut().next().map(|material| material.color())
    }
}

pub fn compose_transform_matrix(transform: &Transform) -> Mat4 {
    let [rx, ry, rz] = transform.rotation;
    Mat4::from_scale_rotation_translation(
        Vec3::from_array(transform.scale),
        Quat::from_euler(EulerRot::XYZ, rx, ry, rz),
        Vec3::from_array(transform.position),
    )
}

pub fn color_to_rgb(color: u32) -> [u8; 3] {
    [
        ((color >> 16) & 0xff) as u8,
        ((color >> 8) & 0xff) as u8,
        (color & 0xff) as u8,
    ]
}

pub fn rgb_to_color(rgb: [u8; 3]) -> u32 {
    (u32::from(rgb[0]) << 16) | (u32::from(rgb[1]) << 8) | u32::from(rgb[2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_matches_initial_properties() {
        let state = TransformState::default();
        assert_eq!(state.position, [0.0; 3]);
        assert_eq!(state.rotation, [0.0; 3]);
        assert_eq!(state.scale, [1.0; 3]);
        assert_eq!(state.color, 0x00ff00);
    }

    #[test]
    fn color_channels_split_and_join() {
        assert_eq!(color_to_rgb(0xff8000), [0xff, 0x80, 0x00]);
        assert_eq!(rgb_to_color([0x12, 0x34, 0x56]), 0x123456);
    }

    #[test]
    fn identity_transform_composes_to_identity() {
        let matrix = compose_transform_matrix(&Transform::default());
        assert!(matrix.abs_diff_eq(Mat4::IDENTITY, 1e-6));
    }

    #[test]
    fn transform_applies_scale_before_translation() {
        let transform = Transform {
            position: [1.0, 2.0, 3.0],
            rotation: [0.0, 0.0, 0.0],
            scale: [2.0, 2.0, 2.0],
        };
        let point = compose_transform_matrix(&transform).transform_point3(Vec3::X);
        assert!(point.abs_diff_eq(Vec3::new(3.0, 2.0, 3.0), 1e-6));
    }

    #[test]
    fn rotation_about_y_turns_x_into_negative_z() {
        let transform = Transform {
            rotation: [0.0, std::f32::consts::FRAC_PI_2, 0.0],
            ..Transform::default()
        };
        let point = compose_transform_matrix(&transform).transform_point3(Vec3::X);
        assert!(point.abs_diff_eq(Vec3::NEG_Z, 1e-5));
    }
}
