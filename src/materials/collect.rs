//! One pass over a freshly loaded scene: which meaningful materials each node
//! uses, the library of pickable materials, and the baseline snapshot used to
//! restore meshes after a selection is cleared.

use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;
use tracing::debug;

use super::classify::{is_placeholder_name, is_single_marked};
use crate::scene::{Material, MaterialBinding, MeshId, NodeId, Scene};

/// Meaningful scene-level materials, indexed by name.
#[derive(Clone, Debug, Default)]
pub struct MaterialLibrary {
    names: Vec<String>,
    by_name: BTreeMap<String, Material>,
}

impl MaterialLibrary {
    /// Index `materials` by name, skipping placeholders. The first material
    /// with a given name wins.
    pub fn from_materials<'a>(materials: impl IntoIterator<Item = &'a Material>) -> Self {
        let mut library = Self::default();
        for mat in materials {
            if is_placeholder_name(&mat.name) || library.by_name.contains_key(&mat.name) {
                continue;
            }
            library.names.push(mat.name.clone());
            library.by_name.insert(mat.name.clone(), mat.clone());
        }
        library
    }

    pub fn get(&self, name: &str) -> Option<&Material> {
        self.by_name.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Names in document order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A node retained for grouping together with its meaningful material names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectedNode {
    pub node: NodeId,
    pub node_name: String,
    pub materials: BTreeSet<String>,
}

/// A mesh's binding as it was right after load.
#[derive(Clone, Debug)]
pub struct BaselineEntry {
    pub binding: MaterialBinding,
    /// Material index of every submesh group, in group order.
    pub group_indices: Vec<usize>,
}

/// Original bindings keyed by (node, mesh). Immutable once captured.
#[derive(Clone, Debug, Default)]
pub struct Baseline {
    entries: BTreeMap<(NodeId, MeshId), BaselineEntry>,
}

impl Baseline {
    pub fn get(&self, node: NodeId, mesh: MeshId) -> Option<&BaselineEntry> {
        self.entries.get(&(node, mesh))
    }

    /// Every mesh snapshotted under `node`.
    pub fn meshes_of(&self, node: NodeId) -> impl Iterator<Item = (MeshId, &BaselineEntry)> {
        self.entries
            .range((node, MeshId::MIN)..=(node, MeshId::MAX))
            .map(|((_, mesh), entry)| (*mesh, entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything discovered about a model at load time.
#[derive(Clone, Debug, Default)]
pub struct Collection {
    pub library: MaterialLibrary,
    pub nodes: Vec<CollectedNode>,
    pub baseline: Baseline,
}

/// Walk `scene` and collect per-node material sets plus the baseline.
///
/// Returns `None` without doing any work when there is no scene yet or it
/// carries no materials.
pub fn collect(scene: Option<&Scene>) -> Option<Collection> {
    let scene = scene?;
    if scene.materials().is_empty() {
        return None;
    }

    let library = MaterialLibrary::from_materials(scene.materials());
    let mut nodes = Vec::new();
    let mut baseline = Baseline::default();

    for id in scene.descendants(scene.root()).into_iter().skip(1) {
        let meshes = scene.descendant_meshes(id);
        let materials: BTreeSet<String> = meshes
            .iter()
            .flat_map(|mesh| scene.mesh(*mesh).material_names())
            .filter(|name| !is_placeholder_name(name))
            .map(str::to_string)
            .collect();

        if materials.is_empty() {
            continue;
        }
        if materials.len() == 1 && materials.iter().all(|m| is_single_marked(m)) {
            continue;
        }

        for mesh_id in meshes {
            let mesh = scene.mesh(mesh_id);
            baseline.entries.insert(
                (id, mesh_id),
                BaselineEntry {
                    binding: mesh.material.duplicate(),
                    group_indices: mesh
                        .geometry
                        .groups
                        .iter()
                        .map(|g| g.material_index)
                        .collect(),
                },
            );
        }

        nodes.push(CollectedNode {
            node: id,
            node_name: scene.node(id).name().to_string(),
            materials,
        });
    }

    debug!("nodes and their materials:");
    for entry in &nodes {
        debug!(
            "  {:?} {:?}: [{}]",
            entry.node,
            entry.node_name,
            entry.materials.iter().join(", ")
        );
    }

    Some(Collection {
        library,
        nodes,
        baseline,
    })
}
