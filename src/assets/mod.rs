use crate::scene::{rgb_to_color, Material, Mesh, Model, SceneNode, DEFAULT_COLOR};
use glam::{Mat4, Vec3};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};

pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["glb", "gltf", "stl"];

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported model format '{0}' (expected .glb, .gltf or .stl)")]
    UnsupportedFormat(String),
    #[error("failed to parse glTF {path}: {source}")]
    Gltf {
        path: String,
        #[source]
        source: gltf::Error,
    },
    #[error("failed to parse STL {path}: {source}")]
    Stl {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{0} contains no triangle geometry")]
    Empty(String),
    #[error("failed to start loader thread: {0}")]
    Spawn(#[source] std::io::Error),
}

#[derive(Debug)]
pub enum LoadEvent {
    Progress { path: PathBuf, fraction: f32 },
    Loaded { path: PathBuf, model: Model },
    Failed { path: PathBuf, error: AssetError },
}

/// Parses model files on worker threads; results are collected with `poll`.
pub struct AssetManager {
    sender: Sender<LoadEvent>,
    receiver: Receiver<LoadEvent>,
    in_flight: usize,
}

impl Default for AssetManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetManager {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver,
            in_flight: 0,
        }
    }

    pub fn load(&mut self, path: impl Into<PathBuf>) -> Result<(), AssetError> {
        let path = path.into();
        if !is_supported(&path) {
            return Err(AssetError::UnsupportedFormat(extension_of(&path)));
        }
        let sender = self.sender.clone();
        log::info!("Loading model {}", path.display());
        std::thread::Builder::new()
            .name("model-loader".to_string())
            .spawn(move || {
                let _ = sender.send(LoadEvent::Progress {
                    path: path.clone(),
                    fraction: 0.0,
                });
                let event = match load_model_from_path(&path) {
                    Ok(model) => LoadEvent::Loaded { path, model },
                    Err(error) => LoadEvent::Failed { path, error },
                };
                // The manager may be gone if the app is shutting down.
                let _ = sender.send(event);
            })
            .map_err(AssetError::Spawn)?;
        self.in_flight += 1;
        Ok(())
    }

    /// Drain pending events without blocking.
    pub fn poll(&mut self) -> Vec<LoadEvent> {
        let events: Vec<LoadEvent> = self.receiver.try_iter().collect();
        for event in &events {
            if !matches!(event, LoadEvent::Progress { .. }) {
                self.in_flight = self.in_flight.saturating_sub(1);
            }
        }
        events
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }
}

pub fn is_supported(path: &Path) -> bool {
    SUPPORTED_EXTENSIONS.contains(&extension_of(path).as_str())
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Parse a model file synchronously. The format is chosen by extension.
pub fn load_model_from_path(path: &Path) -> Result<Model, AssetError> {
    let name = path
        .file_name()
        .and_then(|value| value.to_str())
        .unwrap_or("model")
        .to_string();
    let nodes = match extension_of(path).as_str() {
        "gltf" | "glb" => load_gltf(path)?,
        "stl" => vec![load_stl(path)?],
        other => return Err(AssetError::UnsupportedFormat(other.to_string())),
    };

    let model = Model::new(name, nodes);
    if model.triangle_count() == 0 {
        return Err(AssetError::Empty(path.display().to_string()));
    }
    log::info!(
        "Parsed {} ({} triangles)",
        path.display(),
        model.triangle_count()
    );
    Ok(model)
}

fn load_gltf(path: &Path) -> Result<Vec<SceneNode>, AssetError> {
    let (document, buffers, _images) = gltf::import(path).map_err(|source| AssetError::Gltf {
        path: path.display().to_string(),
        source,
    })?;
    let Some(scene) = document
        .default_scene()
        .or_else(|| document.scenes().next())
    else {
        return Ok(Vec::new());
    };
    Ok(scene
        .nodes()
        .map(|node| convert_node(&node, &buffers))
        .collect())
}

fn convert_node(node: &gltf::Node<'_>, buffers: &[gltf::buffer::Data]) -> SceneNode {
    let name = node
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("node{}", node.index()));
    let mut converted =
        SceneNode::new(name.clone()).with_local(Mat4::from_cols_array_2d(&node.transform().matrix()));

    if let Some(mesh) = node.mesh() {
        let mut meshes = mesh
            .primitives()
            .filter_map(|primitive| convert_primitive(&primitive, buffers));
        if let Some(first) = meshes.next() {
            converted = converted.with_mesh(first);
        }
        // One mesh per node; extra primitives become children.
        for (index, extra) in meshes.enumerate() {
            converted = converted
                .with_child(SceneNode::new(format!("{}#{}", name, index + 1)).with_mesh(extra));
        }
    }

    for child in node.children() {
        converted = converted.with_child(convert_node(&child, buffers));
    }
    converted
}

fn convert_primitive(
    primitive: &gltf::Primitive<'_>,
    buffers: &[gltf::buffer::Data],
) -> Option<Mesh> {
    if primitive.mode() != gltf::mesh::Mode::Triangles {
        log::debug!("Skipping {:?} primitive", primitive.mode());
        return None;
    }
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
    let positions: Vec<Vec3> = reader
        .read_positions()?
        .map(Vec3::from_array)
        .collect();
    if positions.is_empty() {
        return None;
    }
    let indices = reader
        .read_indices()
        .map(|indices| indices.into_u32().collect())
        .unwrap_or_default();

    let [r, g, b, _] = primitive
        .material()
        .pbr_metallic_roughness()
        .base_color_factor();
    let to_byte = |value: f32| (value.clamp(0.0, 1.0) * 255.0).round() as u8;
    Some(Mesh {
        positions,
        indices,
        material: Material {
            color: rgb_to_color([to_byte(r), to_byte(g), to_byte(b)]),
        },
    })
}

fn load_stl(path: &Path) -> Result<SceneNode, AssetError> {
    let file = std::fs::File::open(path).map_err(|source| AssetError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let mut reader = std::io::BufReader::new(file);
    let stl = stl_io::read_stl(&mut reader).map_err(|source| AssetError::Stl {
        path: path.display().to_string(),
        source,
    })?;

    let positions = stl
        .vertices
        .iter()
        .map(|vertex| {
            let position: [f32; 3] = (*vertex).into();
            Vec3::from_array(position)
        })
        .collect();
    let indices = stl
        .faces
        .iter()
        .flat_map(|face| face.vertices.map(|index| index as u32))
        .collect();

    Ok(SceneNode::new("stl").with_mesh(Mesh {
        positions,
        indices,
        material: Material {
            color: DEFAULT_COLOR,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneObject;
    use base64::Engine as _;
    use std::time::{Duration, Instant};

    const ASCII_STL: &str = "solid wedge
facet normal 0 0 1
  outer loop
    vertex 0 0 0
    vertex 2 0 0
    vertex 0 2 0
  endloop
endfacet
facet normal 0 0 -1
  outer loop
    vertex 0 0 0
    vertex 0 2 0
    vertex 2 0 0
  endloop
endfacet
endsolid wedge
";

    fn write_gltf(dir: &Path) -> PathBuf {
        let floats: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let bytes: Vec<u8> = floats.iter().flat_map(|f| f.to_le_bytes()).collect();
        let data = base64::engine::general_purpose::STANDARD.encode(&bytes);
        let json = format!(
            r#"{{
  "asset": {{ "version": "2.0" }},
  "scene": 0,
  "scenes": [{{ "nodes": [0] }}],
  "nodes": [
    {{ "name": "parent", "translation": [0.0, 2.0, 0.0], "children": [1] }},
    {{ "name": "triangle", "mesh": 0 }}
  ],
  "materials": [{{ "pbrMetallicRoughness": {{ "baseColorFactor": [1.0, 0.0, 0.0, 1.0] }} }}],
  "meshes": [{{ "primitives": [{{ "attributes": {{ "POSITION": 0 }}, "material": 0 }}] }}],
  "buffers": [{{ "byteLength": 36, "uri": "data:application/octet-stream;base64,{data}" }}],
  "bufferViews": [{{ "buffer": 0, "byteLength": 36 }}],
  "accessors": [{{
    "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
    "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
  }}]
}}"#
        );
        let path = dir.join("triangle.gltf");
        std::fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn loads_ascii_stl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wedge.STL");
        std::fs::write(&path, ASCII_STL).unwrap();

        let model = load_model_from_path(&path).unwrap();
        assert_eq!(model.name(), "wedge.STL");
        assert_eq!(model.triangle_count(), 2);
        let bounds = model.local_bounds().unwrap();
        assert!(bounds.center().abs_diff_eq(Vec3::new(1.0, 1.0, 0.0), 1e-6));
    }

    #[test]
    fn loads_gltf_hierarchy() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_gltf(dir.path());

        let mut model = load_model_from_path(&path).unwrap();
        assert_eq!(model.triangle_count(), 1);
        assert_eq!(model.nodes().len(), 1);
        assert_eq!(model.nodes()[0].name, "parent");
        assert_eq!(model.nodes()[0].children[0].name, "triangle");
        // Parent translation is kept.
        let bounds = model.local_bounds().unwrap();
        assert!(bounds.center().abs_diff_eq(Vec3::new(0.5, 2.5, 0.0), 1e-6));
        assert_eq!(model.first_color(), Some(0xff0000));
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.obj");
        std::fs::write(&path, "o cube").unwrap();
        assert!(matches!(
            load_model_from_path(&path),
            Err(AssetError::UnsupportedFormat(ext)) if ext == "obj"
        ));
        assert!(!is_supported(&path));
        assert!(is_supported(Path::new("a/b/scene.GLB")));

        let mut manager = AssetManager::new();
        assert!(matches!(
            manager.load(&path),
            Err(AssetError::UnsupportedFormat(_))
        ));
        assert!(!manager.is_loading());
    }

    #[test]
    fn reports_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.gltf");
        std::fs::write(&path, "{ not gltf").unwrap();
        assert!(matches!(
            load_model_from_path(&path),
            Err(AssetError::Gltf { .. })
        ));
        assert!(matches!(
            load_model_from_path(&dir.path().join("missing.stl")),
            Err(AssetError::Read { .. })
        ));
    }

    fn wait_for_result(manager: &mut AssetManager) -> Vec<LoadEvent> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut events = Vec::new();
        while Instant::now() < deadline {
            events.extend(manager.poll());
            if !manager.is_loading() {
                return events;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        panic!("loader did not finish");
    }

    #[test]
    fn background_load_reports_progress_then_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wedge.stl");
        std::fs::write(&path, ASCII_STL).unwrap();

        let mut manager = AssetManager::new();
        assert!(!manager.is_loading());
        manager.load(&path).unwrap();
        assert!(manager.is_loading());

        let events = wait_for_result(&mut manager);
        assert!(matches!(events.first(), Some(LoadEvent::Progress { .. })));
        match events.last() {
            Some(LoadEvent::Loaded { model, .. }) => assert_eq!(model.triangle_count(), 2),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn background_failure_is_an_event() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = AssetManager::new();
        manager.load(dir.path().join("missing.glb")).unwrap();
        let events = wait_for_result(&mut manager);
        assert!(matches!(
            events.last(),
            Some(LoadEvent::Failed {
                error: AssetError::Gltf { .. },
                ..
            })
        ));
    }
}
