use std::collections::HashSet;

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::scene::Scene;

/// Summary counts shown next to a loaded model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ModelStatistics {
    /// Distinct material instances bound to meshes.
    pub materials: usize,
    pub vertices: usize,
    pub faces: usize,
    pub meshes: usize,
    /// Distinct texture instances referenced by those materials.
    pub textures: usize,
    pub animations: usize,
    pub bones: usize,
}

impl ModelStatistics {
    pub fn from_scene(scene: &Scene) -> Self {
        let mut materials = HashSet::new();
        let mut textures = HashSet::new();
        let mut stats = ModelStatistics {
            animations: scene.animations().len(),
            bones: scene.nodes().iter().filter(|n| n.is_bone).count(),
            ..Default::default()
        };

        for mesh in scene.meshes() {
            stats.meshes += 1;
            stats.vertices += mesh.geometry.vertex_count();
            stats.faces += mesh.geometry.face_count();
            for mat in mesh.material.materials() {
                materials.insert(mat.uid());
                textures.extend(mat.textures.values().map(|t| t.uid()));
            }
        }

        stats.materials = materials.len();
        stats.textures = textures.len();
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{
        Geometry, Material, MaterialBinding, Mesh, Texture, TextureSlot, TextureSource,
    };

    #[test]
    fn counts_shared_materials_once() {
        let mut wood = Material::builder().name("Wood").build();
        wood.set_texture(
            TextureSlot::Map,
            Texture::new(TextureSource::Uri("wood.png".to_string())),
        );

        let mut scene = Scene::default();
        scene.add_animation("Idle");
        let root = scene.root();
        for name in ["Leg_1", "Leg_2"] {
            let node = scene.add_node(root, Some(name.to_string()));
            scene.attach_mesh(
                node,
                Mesh::new(
                    MaterialBinding::Single(wood.clone()),
                    Geometry::new(vec![[0.0; 3]; 4], Some(vec![0, 1, 2, 0, 2, 3])),
                ),
            );
        }
        let joint = scene.add_node(root, Some("Hip".to_string()));
        scene.node_mut(joint).is_bone = true;

        assert_eq!(
            ModelStatistics::from_scene(&scene),
            ModelStatistics {
                materials: 1,
                vertices: 8,
                faces: 4,
                meshes: 2,
                textures: 1,
                animations: 1,
                bones: 1,
            }
        );
    }
}
