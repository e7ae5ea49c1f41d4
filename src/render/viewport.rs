use crate::render::gizmo::{GizmoMode, TransformGizmo};
use crate::scene::{color_to_rgb, compose_transform_matrix, SceneObject};
use glam::{Mat4, Vec2, Vec3};
use image::{Rgba, RgbaImage};

const AXIS_LENGTH: f32 = 1.0;
const AXIS_COLORS: [[u8; 4]; 3] = [[230, 60, 60, 255], [60, 200, 60, 255], [60, 110, 240, 255]];

#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
            fov_y_degrees: 75.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Camera {
    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        let projection =
            Mat4::perspective_rh(self.fov_y_degrees.to_radians(), aspect, self.near, self.far);
        projection * Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Lighting {
    /// Ambient term, already multiplied by its intensity.
    pub ambient: f32,
    /// Position of the directional light; it shines towards the origin.
    pub direction: Vec3,
    pub intensity: f32,
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            ambient: f32::from(0x40u8) / 255.0 * 2.0,
            direction: Vec3::new(5.0, 5.0, 5.0),
            intensity: 1.5,
        }
    }
}

impl Lighting {
    fn shade(&self, normal: Vec3, color: u32) -> [u8; 4] {
        let diffuse = normal.dot(self.direction.normalize_or_zero()).max(0.0) * self.intensity;
        let factor = self.ambient + diffuse;
        let [r, g, b] = color_to_rgb(color);
        let channel = |value: u8| (f32::from(value) * factor).round().clamp(0.0, 255.0) as u8;
        [channel(r), channel(g), channel(b), 255]
    }
}

/// A screen-space triangle in pixel coordinates (origin top-left).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedTriangle {
    pub points: [Vec2; 3],
    /// Mean NDC depth; larger is farther away.
    pub depth: f32,
    pub color: [u8; 4],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisLine {
    pub from: Vec2,
    pub to: Vec2,
    pub color: [u8; 4],
}

/// Fixed-camera view of the active object.
#[derive(Debug, Clone, Copy, Default)]
pub struct Viewport {
    pub camera: Camera,
    pub lighting: Lighting,
}

impl Viewport {
    /// Project a world-space point to pixel coordinates plus NDC depth.
    pub fn project_point(&self, point: Vec3, size: Vec2) -> Option<Vec3> {
        if size.x <= 0.0 || size.y <= 0.0 {
            return None;
        }
        let clip = self.camera.view_projection(size.x / size.y) * point.extend(1.0);
        if clip.w <= self.camera.near {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        Some(Vec3::new(
            (ndc.x + 1.0) * 0.5 * size.x,
            (1.0 - ndc.y) * 0.5 * size.y,
            ndc.z,
        ))
    }

    /// Lit front faces of the object, sorted back to front.
    pub fn project_object(&self, object: &dyn SceneObject, size: Vec2) -> Vec<ProjectedTriangle> {
        let model = compose_transform_matrix(object.transform());
        // Mirrored scale flips the winding.
        let winding = if model.determinant() < 0.0 { -1.0 } else { 1.0 };
        let mut triangles = Vec::new();

        object.for_each_triangle(&mut |triangle, color| {
            let world = triangle.map(|point| model.transform_point3(point));
            let normal = (world[1] - world[0]).cross(world[2] - world[0]).normalize_or_zero() * winding;
            if normal == Vec3::ZERO || normal.dot(self.camera.position - world[0]) <= 0.0 {
                return;
            }
            let (Some(a), Some(b), Some(c)) = (
                self.project_point(world[0], size),
                self.project_point(world[1], size),
                self.project_point(world[2], size),
            ) else {
                return;
            };
            triangles.push(ProjectedTriangle {
                points: [a.truncate(), b.truncate(), c.truncate()],
                depth: (a.z + b.z + c.z) / 3.0,
                color: self.lighting.shade(normal, color),
            });
        });

        triangles.sort_by(|a, b| b.depth.total_cmp(&a.depth));
        triangles
    }

    /// Gizmo handles for the object, empty when the gizmo is hidden or detached.
    pub fn gizmo_axes(
        &self,
        object: &dyn SceneObject,
        gizmo: &dyn TransformGizmo,
        size: Vec2,
    ) -> Vec<AxisLine> {
        if !gizmo.is_attached() || !gizmo.is_visible() {
            return Vec::new();
        }
        let transform = object.transform();
        let origin = Vec3::from_array(transform.position);
        let rotation = match gizmo.mode() {
            GizmoMode::Translate => Mat4::IDENTITY,
            GizmoMode::Rotate | GizmoMode::Scale => {
                let mut unscaled = *transform;
                unscaled.position = [0.0; 3];
                unscaled.scale = [1.0; 3];
                compose_transform_matrix(&unscaled)
            }
        };
        let Some(from) = self.project_point(origin, size) else {
            return Vec::new();
        };
        [Vec3::X, Vec3::Y, Vec3::Z]
            .into_iter()
            .zip(AXIS_COLORS)
            .filter_map(|(axis, color)| {
                let tip = origin + rotation.transform_vector3(axis) * AXIS_LENGTH;
                let to = self.project_point(tip, size)?;
                Some(AxisLine {
                    from: from.truncate(),
                    to: to.truncate(),
                    color,
                })
            })
            .collect()
    }

    pub fn paint(
        &self,
        painter: &egui::Painter,
        rect: egui::Rect,
        object: Option<&dyn SceneObject>,
        gizmo: &dyn TransformGizmo,
    ) {
        let Some(object) = object else {
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                "No model loaded",
                egui::FontId::proportional(16.0),
                egui::Color32::GRAY,
            );
            return;
        };
        let size = Vec2::new(rect.width(), rect.height());
        let to_screen = |point: Vec2| rect.min + egui::vec2(point.x, point.y);

        let mut mesh = egui::Mesh::default();
        for triangle in self.project_object(object, size) {
            let [r, g, b, a] = triangle.color;
            let color = egui::Color32::from_rgba_unmultiplied(r, g, b, a);
            let base = mesh.vertices.len() as u32;
            for point in triangle.points {
                mesh.colored_vertex(to_screen(point), color);
            }
            mesh.add_triangle(base, base + 1, base + 2);
        }
        painter.add(egui::Shape::mesh(mesh));

        let axis_width = axis_stroke_width(gizmo);
        for axis in self.gizmo_axes(object, gizmo, size) {
            let [r, g, b, a] = axis.color;
            let color = egui::Color32::from_rgba_unmultiplied(r, g, b, a);
            let tip = to_screen(axis.to);
            painter.line_segment(
                [to_screen(axis.from), tip],
                egui::Stroke::new(axis_width, color),
            );
            match gizmo.mode() {
                GizmoMode::Translate => painter.circle_filled(tip, 4.0, color),
                GizmoMode::Rotate => painter.circle_stroke(tip, 5.0, egui::Stroke::new(1.5, color)),
                GizmoMode::Scale => painter.rect_filled(
                    egui::Rect::from_center_size(tip, egui::vec2(7.0, 7.0)),
                    0.0,
                    color,
                ),
            };
        }
    }

    /// Render to an RGBA image with a transparent background.
    pub fn rasterize(
        &self,
        object: &dyn SceneObject,
        gizmo: &dyn TransformGizmo,
        width: u32,
        height: u32,
    ) -> RgbaImage {
        let mut image = RgbaImage::new(width, height);
        let size = Vec2::new(width as f32, height as f32);
        for triangle in self.project_object(object, size) {
            fill_triangle(&mut image, &triangle.points, Rgba(triangle.color));
        }
        for axis in self.gizmo_axes(object, gizmo, size) {
            draw_line(&mut image, axis.from, axis.to, Rgba(axis.color));
        }
        image
    }
}

/// Axis lines thicken while a drag is in progress.
fn axis_stroke_width(gizmo: &dyn TransformGizmo) -> f32 {
    if gizmo.is_dragging() {
        3.0
    } else {
        2.0
    }
}

fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

fn fill_triangle(image: &mut RgbaImage, points: &[Vec2; 3], color: Rgba<u8>) {
    let [a, b, c] = *points;
    let area = edge(a, b, c);
    if area == 0.0 {
        return;
    }
    let (width, height) = image.dimensions();
    let min = a.min(b).min(c).max(Vec2::ZERO);
    let max = a.max(b).max(c).min(Vec2::new(width as f32, height as f32));
    if min.x >= max.x || min.y >= max.y {
        return;
    }

    for y in (min.y.floor() as u32)..(max.y.ceil() as u32).min(height) {
        for x in (min.x.floor() as u32)..(max.x.ceil() as u32).min(width) {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let w0 = edge(b, c, p) / area;
            let w1 = edge(c, a, p) / area;
            let w2 = edge(a, b, p) / area;
            if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                image.put_pixel(x, y, color);
            }
        }
    }
}

fn draw_line(image: &mut RgbaImage, from: Vec2, to: Vec2, color: Rgba<u8>) {
    let (width, height) = image.dimensions();
    let steps = (to - from).abs().max_element().ceil().max(1.0) as u32;
    for i in 0..=steps {
        let point = from.lerp(to, i as f32 / steps as f32);
        // Two pixels wide.
        for (dx, dy) in [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)] {
            let (x, y) = (point.x + dx, point.y + dy);
            if x >= 0.0 && y >= 0.0 && (x as u32) < width && (y as u32) < height {
                image.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::gizmo::DragGizmo;
    use crate::scene::Model;

    const SIZE: Vec2 = Vec2::new(800.0, 600.0);

    #[test]
    fn origin_projects_to_center() {
        let viewport = Viewport::default();
        let center = viewport.project_point(Vec3::ZERO, SIZE).unwrap();
        assert!((center.x - 400.0).abs() < 1e-3);
        assert!((center.y - 300.0).abs() < 1e-3);
    }

    #[test]
    fn up_is_up_on_screen() {
        let viewport = Viewport::default();
        let above = viewport.project_point(Vec3::Y, SIZE).unwrap();
        let right = viewport.project_point(Vec3::X, SIZE).unwrap();
        assert!(above.y < 300.0);
        assert!(right.x > 400.0);
    }

    #[test]
    fn points_behind_camera_are_dropped() {
        let viewport = Viewport::default();
        assert!(viewport.project_point(Vec3::new(0.0, 0.0, 6.0), SIZE).is_none());
        assert!(viewport.project_point(Vec3::ZERO, Vec2::ZERO).is_none());
    }

    #[test]
    fn cube_shows_only_front_faces() {
        let viewport = Viewport::default();
        let cube = Model::cube(0x00ff00);
        // Looking straight down -z only the +z face is visible.
        let triangles = viewport.project_object(&cube, SIZE);
        assert_eq!(triangles.len(), 2);
        for triangle in &triangles {
            assert_eq!(triangle.color[0], 0);
            assert!(triangle.color[1] > 0);
            assert_eq!(triangle.color[3], 255);
        }
    }

    #[test]
    fn mirrored_cube_still_renders() {
        let viewport = Viewport::default();
        let mut cube = Model::cube(0xffffff);
        cube.transform_mut().scale = [-1.0, 1.0, 1.0];
        assert_eq!(viewport.project_object(&cube, SIZE).len(), 2);
    }

    #[test]
    fn triangles_are_sorted_back_to_front() {
        let viewport = Viewport::default();
        let mut cube = Model::cube(0xffffff);
        cube.transform_mut().rotation = [0.4, 0.7, 0.0];
        let triangles = viewport.project_object(&cube, SIZE);
        assert!(triangles.len() > 2);
        assert!(triangles.windows(2).all(|pair| pair[0].depth >= pair[1].depth));
    }

    #[test]
    fn gizmo_axes_follow_visibility() {
        let viewport = Viewport::default();
        let cube = Model::cube(0);
        let mut gizmo = DragGizmo::default();
        assert!(viewport.gizmo_axes(&cube, &gizmo, SIZE).is_empty());
        gizmo.attach();
        assert_eq!(viewport.gizmo_axes(&cube, &gizmo, SIZE).len(), 3);
        gizmo.set_visible(false);
        assert!(viewport.gizmo_axes(&cube, &gizmo, SIZE).is_empty());
    }

    #[test]
    fn axes_thicken_while_dragging() {
        let mut gizmo = DragGizmo::default();
        gizmo.attach();
        assert_eq!(axis_stroke_width(&gizmo), 2.0);
        assert!(gizmo.set_dragging(true));
        assert_eq!(axis_stroke_width(&gizmo), 3.0);
        assert!(gizmo.set_dragging(false));
        assert_eq!(axis_stroke_width(&gizmo), 2.0);
    }

    #[test]
    fn raster_has_transparent_background() {
        let viewport = Viewport::default();
        let cube = Model::cube(0xff0000);
        let gizmo = DragGizmo::default();
        let image = viewport.rasterize(&cube, &gizmo, 64, 48);
        assert_eq!(image.dimensions(), (64, 48));
        assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0, 0]);
        let center = image.get_pixel(32, 24).0;
        assert_eq!(center[3], 255);
        assert!(center[0] > 0);
    }
}
