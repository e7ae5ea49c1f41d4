//! Model Inspector - transform and material controls bound to a 3D model
//!
//! - Side panel of number, slider and color controls driving the model
//! - Hold the modifier key to lock X/Y/Z scale together
//! - Drag gizmo in the viewport (G/R/S switches mode)
//! - glTF/GLB/STL loading and PNG/PDF/SVG export of the viewport

mod app;
mod assets;
mod config;
mod export;
mod render;
mod scene;
mod sync;
mod ui;

fn main() -> std::process::ExitCode {
    app::run()
}
