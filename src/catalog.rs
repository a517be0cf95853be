//! The list of models a viewer offers, and which one is currently open.

use std::path::{Path, PathBuf};

use bon::Builder;
use tracing::debug;

use crate::error::{ErrorKind, IResult};
use crate::scene::format::ModelFormat;

/// How a catalog entry is presented: GLB models get material-group pickers,
/// OBJ models get appearance overrides.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ModelKind {
    Glb,
    Obj,
}

impl From<ModelFormat> for ModelKind {
    fn from(format: ModelFormat) -> Self {
        if format.is_gltf() {
            ModelKind::Glb
        } else {
            ModelKind::Obj
        }
    }
}

#[derive(Builder, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ModelInfo {
    #[builder(into)]
    pub id: String,
    #[builder(into)]
    pub name: String,
    /// Asset path, usually rooted at the asset directory (`/models/x.glb`).
    #[builder(into)]
    pub path: String,
    #[builder(into)]
    #[cfg_attr(feature = "serde", serde(default))]
    pub description: Option<String>,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: ModelKind,
    /// Texture applied to OBJ models when they are opened.
    #[builder(into)]
    #[cfg_attr(feature = "serde", serde(default))]
    pub texture_path: Option<String>,
    #[builder(into)]
    #[cfg_attr(feature = "serde", serde(default))]
    pub thumbnail: Option<String>,
}

impl ModelInfo {
    /// Location of the model file below `asset_root`.
    pub fn resolve(&self, asset_root: &Path) -> PathBuf {
        resolve_asset(asset_root, &self.path)
    }

    pub fn resolve_texture(&self, asset_root: &Path) -> Option<PathBuf> {
        self.texture_path
            .as_deref()
            .map(|p| resolve_asset(asset_root, p))
    }
}

/// Join a web-style asset path onto `asset_root`, ignoring its leading `/`.
pub fn resolve_asset(asset_root: &Path, path: &str) -> PathBuf {
    asset_root.join(path.trim_start_matches('/'))
}

fn glb(id: &str, name: &str, file: &str, description: &str) -> ModelInfo {
    ModelInfo::builder()
        .id(id)
        .name(name)
        .path(format!("/models/{file}"))
        .description(description)
        .kind(ModelKind::Glb)
        .build()
}

fn obj(id: &str, name: &str, file: &str, description: &str, texture: &str) -> ModelInfo {
    ModelInfo::builder()
        .id(id)
        .name(name)
        .path(format!("/models/{file}"))
        .description(description)
        .kind(ModelKind::Obj)
        .texture_path(texture)
        .build()
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ModelCatalog {
    models: Vec<ModelInfo>,
}

impl ModelCatalog {
    pub fn new(models: Vec<ModelInfo>) -> Self {
        Self { models }
    }

    /// The models shipped with the viewer.
    pub fn builtin() -> Self {
        Self::new(vec![
            obj("Koltuk", "Koltuk", "Koltuk.obj", "Sofa", "/textures/wood.svg"),
            glb("sofa", "Sofa", "aKoltuk.glb", "Classic sofa"),
            glb("creeper", "Creeper", "hd_creeper.glb", "Classic Minecraft mob"),
            glb("mark_23", "Mark_23", "mark_23__animated_free.glb", "Pistol"),
            glb("zombie", "Zombie", "zombie.glb", "Minecraft zombie"),
            glb("large-zombie", "Large Zombie", "large_zombie.glb", "Large zombie"),
            glb("ghast", "Ghast", "hd_ghast.glb", "Ghost mob from the Nether"),
            glb("enderman", "Angry Enderman", "angry_enderman.glb", "Angry Enderman"),
            glb(
                "swan",
                "Minecraft Swan",
                "minecraft_swan_model_version_1.glb",
                "Minecraft swan",
            ),
            glb("bee", "Bee", "minecraft_-_bee.glb", "Minecraft bee"),
            glb(
                "spongebob",
                "SpongeBob",
                "spongebob_-_minecraft_dlc_free_to_download.glb",
                "SpongeBob Minecraft DLC",
            ),
            glb(
                "rainbow-dragon",
                "Rainbow Dragon",
                "minecraft_rainbow_dragon.glb",
                "Minecraft rainbow dragon",
            ),
            glb(
                "axolotl",
                "Axolotl",
                "minecraft_axolotl__free_download.glb",
                "Minecraft axolotl",
            ),
            glb(
                "phantom",
                "Advanced Phantom",
                "minecraft_advenced_phantom_free_download.glb",
                "Advanced Minecraft phantom",
            ),
            glb("fox", "Fox", "fox_minecraft.glb", "Minecraft fox"),
            obj(
                "cube-obj",
                "Cube (OBJ)",
                "cube.obj",
                "Simple cube for trying textures",
                "/textures/wood.svg",
            ),
            obj(
                "sphere-obj",
                "Sphere (OBJ)",
                "sphere.obj",
                "Sphere for showing off textures",
                "/textures/metal.svg",
            ),
        ])
    }

    pub fn find(&self, id: &str) -> Option<&ModelInfo> {
        self.models.iter().find(|m| m.id == id)
    }

    /// Append `info`, replacing an existing entry with the same id.
    pub fn add(&mut self, info: ModelInfo) {
        match self.models.iter_mut().find(|m| m.id == info.id) {
            Some(existing) => *existing = info,
            None => self.models.push(info),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelInfo> {
        self.models.iter()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Which catalog entry is open.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CatalogSelection {
    selected: Option<String>,
}

impl CatalogSelection {
    pub fn select<'a>(&mut self, catalog: &'a ModelCatalog, id: &str) -> IResult<&'a ModelInfo> {
        let info = catalog.find(id).ok_or_else(|| ErrorKind::UnknownModel {
            id: id.to_string(),
        })?;
        debug!("selected model {:?} ({})", info.id, info.path);
        self.selected = Some(info.id.clone());
        Ok(info)
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn current<'a>(&self, catalog: &'a ModelCatalog) -> Option<&'a ModelInfo> {
        self.selected.as_deref().and_then(|id| catalog.find(id))
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }
}
