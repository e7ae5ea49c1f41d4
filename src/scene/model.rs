use super::{MaterialColor, SceneObject, Transform};
use glam::{Mat4, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Vec3>,
    {
        let mut points = points.into_iter();
        let first = points.next()?;
        let mut bounds = Self {
            min: first,
            max: first,
        };
        for point in points {
            bounds.include(point);
        }
        Some(bounds)
    }

    pub fn include(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub color: u32,
}

impl MaterialColor for Material {
    fn color(&self) -> u32 {
        self.color
    }

    fn set_color(&mut self, color: u32) {
        self.color = color & 0xff_ffff;
    }
}

/// Triangle list. When `indices` is empty, every three positions form a triangle.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    pub indices: Vec<u32>,
    pub material: Material,
}

impl Mesh {
    pub fn triangle_count(&self) -> usize {
        if self.indices.is_empty() {
            self.positions.len() / 3
        } else {
            self.indices.len() / 3
        }
    }

    fn for_each_triangle(&self, matrix: &Mat4, visit: &mut dyn FnMut(&[Vec3; 3], u32)) {
        let corner = |index: u32| {
            self.positions
                .get(index as usize)
                .map(|position| matrix.transform_point3(*position))
        };
        if self.indices.is_empty() {
            for chunk in self.positions.chunks_exact(3) {
                let triangle = [
                    matrix.transform_point3(chunk[0]),
                    matrix.transform_point3(chunk[1]),
                    matrix.transform_point3(chunk[2]),
                ];
                visit(&triangle, self.material.color);
            }
        } else {
            for chunk in self.indices.chunks_exact(3) {
                if let (Some(a), Some(b), Some(c)) = (corner(chunk[0]), corner(chunk[1]), corner(chunk[2])) {
                    visit(&[a, b, c], self.material.color);
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub name: String,
    pub local: Mat4,
    pub mesh: Option<Mesh>,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            local: Mat4::IDENTITY,
            mesh: None,
            children: Vec::new(),
        }
    }

    pub fn with_mesh(mut self, mesh: Mesh) -> Self {
        self.mesh = Some(mesh);
        self
    }

    pub fn with_local(mut self, local: Mat4) -> Self {
        self.local = local;
        self
    }

    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }

    fn visit(&self, parent: &Mat4, visit: &mut dyn FnMut(&Mat4, &Mesh)) {
        let world = *parent * self.local;
        if let Some(mesh) = &self.mesh {
            visit(&world, mesh);
        }
        for child in &self.children {
            child.visit(&world, visit);
        }
    }
}

/// Materials of mesh-bearing nodes, depth first.
pub struct MaterialsMut<'a> {
    stack: Vec<&'a mut SceneNode>,
}

impl<'a> Iterator for MaterialsMut<'a> {
    type Item = &'a mut Material;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            let SceneNode { mesh, children, .. } = node;
            self.stack.extend(children.iter_mut().rev());
            if let Some(mesh) = mesh {
                return Some(&mut mesh.material);
            }
        }
        None
    }
}

/// A loaded model or primitive: a node hierarchy placed by one transform.
#[derive(Debug, Clone)]
pub struct Model {
    name: String,
    transform: Transform,
    nodes: Vec<SceneNode>,
    disposed: bool,
}

impl Model {
    pub fn new(name: impl Into<String>, nodes: Vec<SceneNode>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::default(),
            nodes,
            disposed: false,
        }
    }

    /// Unit cube centered at the origin.
    pub fn cube(color: u32) -> Self {
        let corners = [
            [-0.5, -0.5, -0.5],
            [0.5, -0.5, -0.5],
            [0.5, 0.5, -0.5],
            [-0.5, 0.5, -0.5],
            [-0.5, -0.5, 0.5],
            [0.5, -0.5, 0.5],
            [0.5, 0.5, 0.5],
            [-0.5, 0.5, 0.5],
        ];
        let indices = vec![
            4, 5, 6, 4, 6, 7, // +z
            1, 0, 3, 1, 3, 2, // -z
            5, 1, 2, 5, 2, 6, // +x
            0, 4, 7, 0, 7, 3, // -x
            7, 6, 2, 7, 2, 3, // +y
            0, 1, 5, 0, 5, 4, // -y
        ];
        let mesh = Mesh {
            positions: corners.iter().copied().map(Vec3::from_array).collect(),
            indices,
            material: Material { color },
        };
        Self::new("Cube", vec![SceneNode::new("Cube").with_mesh(mesh)])
    }

    #[cfg(test)]
    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn triangle_count(&self) -> usize {
        let mut count = 0;
        for node in &self.nodes {
            node.visit(&Mat4::IDENTITY, &mut |_, mesh| count += mesh.triangle_count());
        }
        count
    }
}

impl SceneObject for Model {
    fn name(&self) -> &str {
        &self.name
    }

    fn transform(&self) -> &Transform {
        &self.transform
    }

    fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    fn materials_mut(&mut self) -> Box<dyn Iterator<Item = &mut dyn MaterialColor> + '_> {
        let stack = self.nodes.iter_mut().rev().collect();
        Box::new(MaterialsMut { stack }.map(|material| material as &mut dyn MaterialColor))
    }

    fn local_bounds(&self) -> Option<Aabb> {
        let mut bounds: Option<Aabb> = None;
        for node in &self.nodes {
            node.visit(&Mat4::IDENTITY, &mut |matrix, mesh| {
                let points = mesh
                    .positions
                    .iter()
                    .map(|position| matrix.transform_point3(*position));
                if let Some(mesh_bounds) = Aabb::from_points(points) {
                    bounds = Some(match bounds {
                        Some(current) => current.union(mesh_bounds),
                        None => mesh_bounds,
                    });
                }
            });
        }
        bounds
    }

    fn recenter(&mut self, center: Vec3) {
        let offset = Mat4::from_translation(-center);
        for node in &mut self.nodes {
            node.local = offset * node.local;
        }
    }

    fn for_each_triangle(&self, visit: &mut dyn FnMut(&[Vec3; 3], u32)) {
        for node in &self.nodes {
            node.visit(&Mat4::IDENTITY, &mut |matrix, mesh| {
                mesh.for_each_triangle(matrix, &mut *visit)
            });
        }
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        log::debug!("Releasing model '{}' ({} triangles)", self.name, self.triangle_count());
        self.nodes.clear();
        self.disposed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_level_model() -> Model {
        let triangle = |color| Mesh {
            positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            indices: Vec::new(),
            material: Material { color },
        };
        let child = SceneNode::new("child")
            .with_local(Mat4::from_translation(Vec3::new(4.0, 0.0, 0.0)))
            .with_mesh(triangle(0x0000ff));
        let root = SceneNode::new("root")
            .with_mesh(triangle(0xff0000))
            .with_child(SceneNode::new("group").with_child(child));
        Model::new("pair", vec![root])
    }

    #[test]
    fn cube_bounds_are_centered() {
        let cube = Model::cube(0x00ff00);
        let bounds = cube.local_bounds().unwrap();
        assert!(bounds.center().abs_diff_eq(Vec3::ZERO, 1e-6));
        assert!(bounds.max.abs_diff_eq(Vec3::splat(0.5), 1e-6));
        assert!(bounds.min.abs_diff_eq(Vec3::splat(-0.5), 1e-6));
        assert_eq!(cube.triangle_count(), 12);
    }

    #[test]
    fn bounds_include_child_node_transforms() {
        let model = two_level_model();
        let bounds = model.local_bounds().unwrap();
        assert!(bounds.min.abs_diff_eq(Vec3::ZERO, 1e-6));
        assert!(bounds.max.abs_diff_eq(Vec3::new(5.0, 1.0, 0.0), 1e-6));
    }

    #[test]
    fn materials_mut_visits_every_mesh_node() {
        let mut model = two_level_model();
        let colors: Vec<u32> = model.materials_mut().map(|m| m.color()).collect();
        assert_eq!(colors, vec![0xff0000, 0x0000ff]);

        for material in model.materials_mut() {
            material.set_color(0x123456);
        }
        let mut seen = Vec::new();
        model.for_each_triangle(&mut |_, color| seen.push(color));
        assert_eq!(seen, vec![0x123456, 0x123456]);
    }

    #[test]
    fn recenter_moves_geometry_not_transform() {
        let mut model = two_level_model();
        let center = model.local_bounds().unwrap().center();
        model.recenter(center);
        let bounds = model.local_bounds().unwrap();
        assert!(bounds.center().abs_diff_eq(Vec3::ZERO, 1e-5));
        assert_eq!(model.transform().position, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn dispose_releases_geometry_once() {
        let mut model = Model::cube(0xffffff);
        model.dispose();
        assert!(model.local_bounds().is_none());
        assert_eq!(model.materials_mut().count(), 0);
        model.dispose();
    }

    #[test]
    fn indexed_triangles_skip_out_of_range_indices() {
        let mesh = Mesh {
            positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            indices: vec![0, 1, 2, 0, 1, 9],
            material: Material { color: 1 },
        };
        let model = Model::new("m", vec![SceneNode::new("n").with_mesh(mesh)]);
        let mut count = 0;
        model.for_each_triangle(&mut |_, _| count += 1);
        assert_eq!(count, 1);
    }
}
