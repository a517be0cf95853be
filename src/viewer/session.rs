//! One loaded model and everything the viewer derives from it.
//!
//! A session owns its scene, the groups discovered on it, the load-time
//! baseline and the current selections. Opening another model means building
//! a new session (or calling [`ModelSession::reload`]); nothing is shared
//! between sessions.

use std::fmt;
#[cfg(feature = "models")]
use std::path::Path;

#[cfg(feature = "models")]
use rootcause::Report;
use tracing::{debug, info, warn};

use super::animation::AnimationController;
use super::appearance::{self, Appearance};
use super::statistics::ModelStatistics;
use crate::catalog::ModelKind;
#[cfg(feature = "models")]
use crate::catalog::ModelInfo;
use crate::config::DEFAULT_MAX_GROUP_PICKERS;
use crate::error::IResult;
use crate::materials::{
    Collection, Invalidation, MaterialGroup, Selections, apply_selections, build_groups, collect,
};
#[cfg(feature = "models")]
use crate::scene::format::{ImportError, load_scene};
use crate::scene::{Scene, TextureSource};

/// Receives the discovered groups and the pickable material names.
pub type DiscoveryCallback = Box<dyn FnMut(&[MaterialGroup], &[String])>;

pub struct ModelSession {
    kind: ModelKind,
    scene: Scene,
    collection: Collection,
    groups: Vec<MaterialGroup>,
    selections: Selections,
    appearance: Appearance,
    animation: AnimationController,
    max_group_pickers: usize,
    on_discovery: Option<DiscoveryCallback>,
}

impl fmt::Debug for ModelSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSession")
            .field("kind", &self.kind)
            .field("scene", &self.scene.name)
            .field("groups", &self.groups)
            .field("selections", &self.selections)
            .field("appearance", &self.appearance)
            .finish_non_exhaustive()
    }
}

impl ModelSession {
    /// Start a session on an already imported scene.
    ///
    /// GLB scenes go through group discovery. OBJ scenes are drawn with the
    /// default appearance override instead.
    pub fn new(scene: Scene, kind: ModelKind) -> Self {
        let mut session = Self {
            kind,
            scene: Scene::default(),
            collection: Collection::default(),
            groups: Vec::new(),
            selections: Selections::new(),
            appearance: Appearance::default(),
            animation: AnimationController::default(),
            max_group_pickers: DEFAULT_MAX_GROUP_PICKERS,
            on_discovery: None,
        };
        session.reload(scene, kind);
        session
    }

    /// Import `path` and start a session on it.
    #[cfg(feature = "models")]
    pub fn open(path: &Path) -> Result<Self, Report<ImportError>> {
        let (scene, format) = load_scene(path)?;
        Ok(Self::new(scene, format.into()))
    }

    /// Open a catalog entry below `asset_root`. OBJ entries with a texture
    /// start out drawn with it.
    #[cfg(feature = "models")]
    pub fn open_model(info: &ModelInfo, asset_root: &Path) -> Result<Self, Report<ImportError>> {
        let (scene, _) = load_scene(&info.resolve(asset_root))?;
        let mut session = Self::new(scene, info.kind);
        if info.kind == ModelKind::Obj
            && let Some(texture) = info.resolve_texture(asset_root)
        {
            let uri = texture.to_string_lossy().into_owned();
            if let Err(e) = session.set_texture(TextureSource::Uri(uri)) {
                warn!("could not apply texture for {}: {e}", info.id);
            }
        }
        Ok(session)
    }

    pub fn with_max_group_pickers(mut self, max: usize) -> Self {
        self.max_group_pickers = max;
        self
    }

    /// Replace the scene, dropping every selection, and rerun discovery.
    pub fn reload(&mut self, scene: Scene, kind: ModelKind) {
        self.kind = kind;
        self.scene = scene;
        self.selections.clear_all();
        self.appearance = Appearance::default();
        self.animation = AnimationController::new(self.scene.animations().iter().cloned());

        match kind {
            ModelKind::Glb => {
                self.collection = collect(Some(&self.scene)).unwrap_or_default();
                self.groups = build_groups(&self.collection.nodes);
                info!(
                    "discovered {} material group(s) over {} node(s)",
                    self.groups.len(),
                    self.collection.nodes.len()
                );
            }
            ModelKind::Obj => {
                self.collection = Collection::default();
                self.groups.clear();
                if let Err(e) = self.apply_appearance_override() {
                    warn!("could not apply default appearance: {e}");
                }
            }
        }
        self.notify_discovery();
    }

    /// Register the discovery callback. It is invoked right away with the
    /// current groups and again after every reload.
    pub fn on_discovery(&mut self, callback: impl FnMut(&[MaterialGroup], &[String]) + 'static) {
        self.on_discovery = Some(Box::new(callback));
        self.notify_discovery();
    }

    fn notify_discovery(&mut self) {
        if let Some(callback) = self.on_discovery.as_mut() {
            callback(&self.groups, self.collection.library.names());
        }
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn groups(&self) -> &[MaterialGroup] {
        &self.groups
    }

    /// The groups that get a picker.
    pub fn display_groups(&self) -> &[MaterialGroup] {
        &self.groups[..self.groups.len().min(self.max_group_pickers)]
    }

    /// Meaningful material names offered by every picker.
    pub fn material_names(&self) -> &[String] {
        self.collection.library.names()
    }

    pub fn selections(&self) -> &Selections {
        &self.selections
    }

    /// Set or clear one group's material and reapply all selections.
    pub fn select(&mut self, group: &str, material: Option<&str>) -> Invalidation {
        debug!("select {group} -> {material:?}");
        self.selections.set(group, material);
        self.apply()
    }

    /// Replace all selections at once.
    pub fn select_all(&mut self, selections: Selections) -> Invalidation {
        self.selections = selections;
        self.apply()
    }

    /// Restore every group to its original look.
    pub fn clear_all(&mut self) -> Invalidation {
        self.selections.clear_all();
        self.apply()
    }

    fn apply(&mut self) -> Invalidation {
        apply_selections(
            &mut self.scene,
            &self.collection.baseline,
            &self.groups,
            &self.collection.library,
            &self.selections,
        )
    }

    pub fn appearance(&self) -> &Appearance {
        &self.appearance
    }

    /// Draw the model in a solid color. Any texture override is dropped.
    pub fn set_color(&mut self, hex: &str) -> IResult<u64> {
        appearance::parse_hex_color(hex)?;
        self.appearance = Appearance::Color(hex.to_string());
        self.apply_appearance_override()
    }

    /// Draw the model with a texture. Any color override is dropped.
    pub fn set_texture(&mut self, source: TextureSource) -> IResult<u64> {
        self.appearance = Appearance::Texture(source);
        self.apply_appearance_override()
    }

    /// Switch to the preset texture after the current one.
    pub fn next_texture(&mut self) -> IResult<u64> {
        let next = appearance::next_texture(self.appearance.texture_uri());
        self.set_texture(TextureSource::Uri(next.to_string()))
    }

    /// Switch to the preset texture before the current one.
    pub fn previous_texture(&mut self) -> IResult<u64> {
        let previous = appearance::previous_texture(self.appearance.texture_uri());
        self.set_texture(TextureSource::Uri(previous.to_string()))
    }

    fn apply_appearance_override(&mut self) -> IResult<u64> {
        let material = self.appearance.to_material()?;
        Ok(appearance::apply_appearance(&mut self.scene, &material))
    }

    pub fn animation(&self) -> &AnimationController {
        &self.animation
    }

    pub fn animation_mut(&mut self) -> &mut AnimationController {
        &mut self.animation
    }

    pub fn statistics(&self) -> ModelStatistics {
        ModelStatistics::from_scene(&self.scene)
    }

    /// Hand the scene over, e.g. for export.
    pub fn into_scene(self) -> Scene {
        self.scene
    }
}
