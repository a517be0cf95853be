//! Model format detection and the shared import entry point.

use std::path::Path;

use thiserror::Error;

#[cfg(feature = "models")]
use rootcause::Report;

#[cfg(feature = "models")]
use super::Scene;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("unsupported model format: {0}")]
    UnsupportedFormat(String),
    #[error("failed to parse glTF: {0}")]
    Gltf(String),
    #[error("failed to parse OBJ: {0}")]
    Obj(String),
    #[error("failed to read image: {0}")]
    Image(String),
    #[error("glTF document has no scene")]
    NoScene,
    #[error("I/O error: {0}")]
    Io(String),
}

/// File formats the importers understand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelFormat {
    /// Binary glTF container.
    Glb,
    /// JSON glTF with embedded or external buffers.
    Gltf,
    /// Wavefront OBJ, optionally with an MTL library.
    Obj,
}

const GLB_MAGIC: &[u8; 4] = b"glTF";

impl ModelFormat {
    /// Detect from magic bytes, falling back to the file extension.
    pub fn detect(bytes: &[u8], path: Option<&Path>) -> Option<Self> {
        if bytes.starts_with(GLB_MAGIC) {
            return Some(ModelFormat::Glb);
        }
        path.and_then(Self::from_path)
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "glb" => Some(ModelFormat::Glb),
            "gltf" => Some(ModelFormat::Gltf),
            "obj" => Some(ModelFormat::Obj),
            _ => None,
        }
    }

    /// Whether the format carries its own materials, node hierarchy and
    /// animations (as opposed to OBJ, which is drawn with an override).
    pub fn is_gltf(&self) -> bool {
        matches!(self, ModelFormat::Glb | ModelFormat::Gltf)
    }
}

/// Load a scene from disk, dispatching on the detected format.
#[cfg(feature = "models")]
pub fn load_scene(path: &Path) -> Result<(Scene, ModelFormat), Report<ImportError>> {
    let bytes = std::fs::read(path)
        .map_err(|e| Report::new(ImportError::Io(format!("{}: {e}", path.display()))))?;
    let format = ModelFormat::detect(&bytes, Some(path)).ok_or_else(|| {
        Report::new(ImportError::UnsupportedFormat(path.display().to_string()))
    })?;

    tracing::debug!("loading {} as {:?}", path.display(), format);

    let scene = match format {
        ModelFormat::Glb | ModelFormat::Gltf => {
            super::gltf_import::import_gltf(&bytes, path.parent())?
        }
        ModelFormat::Obj => super::obj_import::import_obj(path)?,
    };
    Ok((scene, format))
}
