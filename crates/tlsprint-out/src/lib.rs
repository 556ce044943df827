//! tlsprint-out: Learning Targets to Build Manifest Renderer
//!
//! Renders the ordered target list into the CI manifest that schedules the
//! learning jobs. The target order is kept exactly as given.
//!
//! # Example
//!
//! ```ignore
//! use tlsprint_out::{render_manifest, ManifestSchema};
//!
//! let manifest = render_manifest(
//!     Path::new("templates/drone.yml.hbs"),
//!     &reconciliation.targets,
//!     ManifestSchema::V1,
//! )?;
//! manifest.write_to(Path::new(".drone.yml"))?;
//! ```

pub mod renderer;
pub mod templates;

use std::path::Path;
use thiserror::Error;
use tlsprint_core::Target;

pub use renderer::{ManifestRenderer, RenderedManifest};
pub use templates::{ManifestSchema, ManifestTemplate};

/// Errors that can occur while producing the manifest
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Template load failed: {0}")]
    Template(String),
    #[error("Render failed: {0}")]
    Render(String),
    #[error("Write failed: {0}")]
    Write(String),
}

/// Load the template at `template_path` and render `targets` with it
pub fn render_manifest(
    template_path: &Path,
    targets: &[Target],
    schema: ManifestSchema,
) -> Result<RenderedManifest, RenderError> {
    ManifestRenderer::load(template_path, schema)?.render(targets)
}
