//! Viewport snapshots as PNG, PDF or SVG files.

use crate::render::gizmo::TransformGizmo;
use crate::render::Viewport;
use crate::sync::PropertyBindingSync;
use base64::Engine as _;
use chrono::{DateTime, SecondsFormat, Utc};
use image::RgbaImage;
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect, Ref};
use std::io::{Cursor, Write as _};
use std::path::{Path, PathBuf};

/// PDF points per CSS pixel.
const POINTS_PER_PIXEL: f32 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Png,
    Pdf,
    Svg,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Png, ExportFormat::Pdf, ExportFormat::Svg];

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Svg => "svg",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ExportFormat::Png => "PNG",
            ExportFormat::Pdf => "PDF",
            ExportFormat::Svg => "SVG",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Please load a 3D model first")]
    NoModel,
    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("failed writing '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ExportError>;

/// `3d-model-<ISO-8601 timestamp>.<ext>` with `:` and `.` replaced so the
/// name is valid on every filesystem.
pub fn timestamped_filename(format: ExportFormat, at: DateTime<Utc>) -> String {
    let stamp = at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("3d-model-{}.{}", stamp, format.extension())
}

/// Hides the gizmo for as long as the guard lives.
pub struct HiddenGizmo<'a> {
    gizmo: &'a mut dyn TransformGizmo,
    was_visible: bool,
}

impl<'a> HiddenGizmo<'a> {
    pub fn new(gizmo: &'a mut dyn TransformGizmo) -> Self {
        let was_visible = gizmo.is_visible();
        gizmo.set_visible(false);
        Self { gizmo, was_visible }
    }

    pub fn gizmo(&self) -> &dyn TransformGizmo {
        &*self.gizmo
    }
}

impl Drop for HiddenGizmo<'_> {
    fn drop(&mut self) {
        self.gizmo.set_visible(self.was_visible);
    }
}

/// Rasterize the viewport without the gizmo and write it to `dir`.
pub fn export_viewport(
    sync: &mut PropertyBindingSync,
    viewport: &Viewport,
    size: [u32; 2],
    format: ExportFormat,
    dir: &Path,
) -> Result<PathBuf> {
    let (object, gizmo) = sync.scene_parts_mut();
    let object = object.ok_or(ExportError::NoModel)?;
    let guard = HiddenGizmo::new(gizmo);

    let [width, height] = [size[0].max(1), size[1].max(1)];
    let image = viewport.rasterize(object, guard.gizmo(), width, height);
    let bytes = encode(format, &image)?;

    let path = dir.join(timestamped_filename(format, Utc::now()));
    write_file(&path, &bytes)?;
    log::info!(
        "Exported {}x{} {} to {}",
        width,
        height,
        format.label(),
        path.display()
    );
    Ok(path)
}

pub fn encode(format: ExportFormat, image: &RgbaImage) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Png => encode_png(image),
        ExportFormat::Pdf => encode_pdf(image),
        ExportFormat::Svg => encode_svg(image).map(String::into_bytes),
    }
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
    Ok(bytes)
}

/// SVG document embedding the PNG as a data URI, sized to the raster.
pub fn encode_svg(image: &RgbaImage) -> Result<String> {
    let png = encode_png(image)?;
    let data = base64::engine::general_purpose::STANDARD.encode(&png);
    let (width, height) = image.dimensions();
    Ok(format!(
        concat!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}px\" height=\"{h}px\" viewBox=\"0 0 {w} {h}\">\n",
            "  <image x=\"0\" y=\"0\" width=\"{w}\" height=\"{h}\" href=\"data:image/png;base64,{data}\"/>\n",
            "</svg>\n"
        ),
        w = width,
        h = height,
        data = data
    ))
}

/// Single-page PDF whose page matches the raster, holding the image as a
/// Flate-compressed RGB XObject. Transparency is flattened onto white.
pub fn encode_pdf(image: &RgbaImage) -> Result<Vec<u8>> {
    let (width, height) = image.dimensions();
    let rgb: Vec<u8> = image
        .pixels()
        .flat_map(|pixel| {
            let [r, g, b, a] = pixel.0;
            [r, g, b].map(|channel| over_white(channel, a))
        })
        .collect();

    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(&rgb).map_err(pdf_io)?;
    let compressed = encoder.finish().map_err(pdf_io)?;

    let catalog_id = Ref::new(1);
    let page_tree_id = Ref::new(2);
    let page_id = Ref::new(3);
    let image_id = Ref::new(4);
    let content_id = Ref::new(5);
    let image_name = Name(b"Im0");

    let page_width = width as f32 * POINTS_PER_PIXEL;
    let page_height = height as f32 * POINTS_PER_PIXEL;

    let mut pdf = Pdf::new();
    pdf.catalog(catalog_id).pages(page_tree_id);
    pdf.pages(page_tree_id).kids([page_id]).count(1);

    let mut page = pdf.page(page_id);
    page.media_box(Rect::new(0.0, 0.0, page_width, page_height));
    page.parent(page_tree_id);
    page.contents(content_id);
    page.resources().x_objects().pair(image_name, image_id);
    page.finish();

    let mut xobject = pdf.image_xobject(image_id, &compressed);
    xobject.filter(Filter::FlateDecode);
    xobject.width(width as i32);
    xobject.height(height as i32);
    xobject.color_space().device_rgb();
    xobject.bits_per_component(8);
    xobject.finish();

    let mut content = Content::new();
    content.save_state();
    content.transform([page_width, 0.0, 0.0, page_height, 0.0, 0.0]);
    content.x_object(image_name);
    content.restore_state();
    pdf.stream(content_id, &content.finish());

    Ok(pdf.finish())
}

fn over_white(channel: u8, alpha: u8) -> u8 {
    let alpha = u32::from(alpha);
    ((u32::from(channel) * alpha + 255 * (255 - alpha) + 127) / 255) as u8
}

fn pdf_io(source: std::io::Error) -> ExportError {
    ExportError::Io {
        path: PathBuf::from("<pdf image stream>"),
        source,
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let io_err = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
    }
    std::fs::write(path, bytes).map_err(io_err)
}
