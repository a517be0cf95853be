//! Engine-neutral scene graph.
//!
//! A [`Scene`] is an arena of [`Node`]s and [`Mesh`]es addressed by stable
//! [`NodeId`]/[`MeshId`] handles. Node names are informational only and may
//! repeat; everything downstream keys on ids.

use std::collections::HashMap;

pub mod format;
#[cfg(feature = "models")]
pub mod gltf_import;
pub mod material;
pub mod mesh;
#[cfg(feature = "models")]
pub mod obj_import;

pub use material::{Material, Rgba, Texture, TextureSlot, TextureSource, UvTransform};
pub use mesh::{Geometry, MaterialBinding, Mesh, SubmeshGroup};

/// Stable handle to a node within one [`Scene`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Stable handle to a mesh within one [`Scene`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MeshId(u32);

impl MeshId {
    pub const MIN: MeshId = MeshId(0);
    pub const MAX: MeshId = MeshId(u32::MAX);

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Local TRS transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: [f32; 3],
    /// Unit quaternion, `[x, y, z, w]`.
    pub rotation: [f32; 4],
    pub scale: [f32; 3],
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: [0.0; 3],
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: [1.0; 3],
        }
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    pub id: NodeId,
    pub name: Option<String>,
    pub transform: Transform,
    /// Index of the node in the document it was imported from.
    pub source_index: Option<usize>,
    /// Set when the node is a skin joint.
    pub is_bone: bool,
    /// Set whenever something under this node changed in a way that requires
    /// its world matrix to be recomputed before the next draw.
    pub matrix_world_needs_update: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    mesh: Option<MeshId>,
}

impl Node {
    fn new(id: NodeId, name: Option<String>, parent: Option<NodeId>) -> Self {
        Self {
            id,
            name,
            transform: Transform::default(),
            source_index: None,
            is_bone: false,
            matrix_world_needs_update: false,
            parent,
            children: Vec::new(),
            mesh: None,
        }
    }

    /// Name, or the empty string for unnamed nodes.
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn mesh(&self) -> Option<MeshId> {
        self.mesh
    }
}

#[derive(Clone, Debug)]
pub struct Scene {
    pub name: Option<String>,
    nodes: Vec<Node>,
    meshes: Vec<Mesh>,
    /// Document-level material list, in import order.
    materials: Vec<Material>,
    animations: Vec<String>,
    render_version: u64,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Scene {
    /// Create a scene holding only its root node.
    pub fn new(name: Option<String>) -> Self {
        let root = Node::new(NodeId(0), name.clone(), None);
        Self {
            name,
            nodes: vec![root],
            meshes: Vec::new(),
            materials: Vec::new(),
            animations: Vec::new(),
            render_version: 0,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn add_node(&mut self, parent: NodeId, name: Option<String>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(id, name, Some(parent)));
        self.nodes[parent.index()].children.push(id);
        id
    }

    /// Attach a mesh to `node`, replacing any mesh it already had.
    pub fn attach_mesh(&mut self, node: NodeId, mesh: Mesh) -> MeshId {
        let id = MeshId(self.meshes.len() as u32);
        self.meshes.push(mesh);
        self.nodes[node.index()].mesh = Some(id);
        id
    }

    pub fn add_material(&mut self, material: Material) {
        self.materials.push(material);
    }

    pub fn add_animation(&mut self, name: impl Into<String>) {
        self.animations.push(name.into());
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn mesh(&self, id: MeshId) -> &Mesh {
        &self.meshes[id.index()]
    }

    pub fn mesh_mut(&mut self, id: MeshId) -> &mut Mesh {
        &mut self.meshes[id.index()]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn meshes_mut(&mut self) -> &mut [Mesh] {
        &mut self.meshes
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn animations(&self) -> &[String] {
        &self.animations
    }

    /// First node with the given name, in depth-first order.
    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .find(|id| self.node(*id).name() == name)
    }

    /// `id` and every node below it, depth-first pre-order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.node(next).children.iter().rev().copied());
        }
        out
    }

    /// Meshes attached to `id` or any of its descendants.
    pub fn descendant_meshes(&self, id: NodeId) -> Vec<MeshId> {
        self.descendants(id)
            .into_iter()
            .filter_map(|n| self.node(n).mesh)
            .collect()
    }

    /// Node each mesh is attached to.
    pub fn mesh_owners(&self) -> HashMap<MeshId, NodeId> {
        self.nodes
            .iter()
            .filter_map(|n| n.mesh.map(|m| (m, n.id)))
            .collect()
    }

    /// Signal that the scene must be redrawn. Called once per batch of
    /// material changes.
    pub fn invalidate(&mut self) -> u64 {
        self.render_version += 1;
        self.render_version
    }

    pub fn render_version(&self) -> u64 {
        self.render_version
    }
}
