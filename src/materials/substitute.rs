//! Material substitution.
//!
//! [`plan`] turns the load-time baseline and the current selections into a
//! list of per-mesh actions without touching the scene. [`apply_plan`]
//! projects that list onto the scene and issues a single invalidation for
//! the whole batch.

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace};

use super::collect::{Baseline, BaselineEntry, MaterialLibrary};
use super::groups::MaterialGroup;
use crate::scene::{Material, MaterialBinding, MeshId, NodeId, Scene};

/// Chosen material per group id. A missing entry means "original look".
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selections {
    by_group: HashMap<String, String>,
}

impl Selections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select `material` for `group`, or clear the group's selection with
    /// `None`.
    pub fn set(&mut self, group: impl Into<String>, material: Option<&str>) {
        let group = group.into();
        match material {
            Some(name) => {
                self.by_group.insert(group, name.to_string());
            }
            None => {
                self.by_group.remove(&group);
            }
        }
    }

    pub fn get(&self, group: &str) -> Option<&str> {
        self.by_group.get(group).map(String::as_str)
    }

    pub fn clear(&mut self, group: &str) {
        self.by_group.remove(group);
    }

    pub fn clear_all(&mut self) {
        self.by_group.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.by_group.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_group.iter().map(|(g, m)| (g.as_str(), m.as_str()))
    }
}

impl<G: Into<String>, M: Into<String>> FromIterator<(G, M)> for Selections {
    fn from_iter<T: IntoIterator<Item = (G, M)>>(iter: T) -> Self {
        Self {
            by_group: iter
                .into_iter()
                .map(|(g, m)| (g.into(), m.into()))
                .collect(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub enum MeshAction<'a> {
    /// Put back a fresh copy of the load-time binding.
    Restore(&'a BaselineEntry),
    /// Bind a fresh copy of `target`. `collapse_groups` is set for meshes
    /// that were multi-material at load time.
    Substitute {
        target: &'a Material,
        collapse_groups: bool,
    },
}

#[derive(Clone, Copy, Debug)]
pub struct MeshAssignment<'a> {
    pub group: &'a str,
    pub node: NodeId,
    pub mesh: MeshId,
    pub action: MeshAction<'a>,
}

/// Desired per-mesh state for one batch of selections.
#[derive(Clone, Debug, Default)]
pub struct SubstitutionPlan<'a> {
    pub assignments: Vec<MeshAssignment<'a>>,
}

impl SubstitutionPlan<'_> {
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

/// Outcome of applying a plan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Invalidation {
    pub meshes_updated: usize,
    /// Scene render version after the batch.
    pub render_version: u64,
}

/// Compute the desired assignment of every mesh covered by `groups`.
///
/// A group whose selection is unset, or names a material missing from
/// `library`, restores its meshes from `baseline`. Groups can overlap when
/// collected nodes are nested; a mesh that any group substitutes is never
/// restored by an overlapping unset group.
pub fn plan<'a>(
    baseline: &'a Baseline,
    groups: &'a [MaterialGroup],
    library: &'a MaterialLibrary,
    selections: &Selections,
) -> SubstitutionPlan<'a> {
    let mut substitutions = Vec::new();
    let mut restores = Vec::new();

    for group in groups {
        let target = selections.get(&group.id).and_then(|name| {
            let found = library.get(name);
            if found.is_none() {
                debug!("{}: unknown material {name:?}, restoring", group.id);
            }
            found
        });

        for &node in &group.nodes {
            for (mesh, entry) in baseline.meshes_of(node) {
                let assignment = |action: MeshAction<'a>| MeshAssignment {
                    group: &group.id,
                    node,
                    mesh,
                    action,
                };
                match target {
                    Some(target) => substitutions.push(assignment(MeshAction::Substitute {
                        target,
                        collapse_groups: entry.binding.is_multi(),
                    })),
                    None => restores.push(assignment(MeshAction::Restore(entry))),
                }
            }
        }
    }

    let substituted: HashSet<MeshId> = substitutions.iter().map(|a| a.mesh).collect();
    let mut assignments: Vec<MeshAssignment<'a>> = restores
        .into_iter()
        .filter(|a| !substituted.contains(&a.mesh))
        .collect();
    assignments.extend(substitutions);

    SubstitutionPlan { assignments }
}

/// Write `plan` into `scene`. Assignments are applied in order, so a mesh
/// substituted by more than one group ends up with the last group's choice.
pub fn apply_plan(scene: &mut Scene, plan: &SubstitutionPlan<'_>) -> Invalidation {
    let owners = scene.mesh_owners();

    for assignment in &plan.assignments {
        let mesh = scene.mesh_mut(assignment.mesh);
        match assignment.action {
            MeshAction::Restore(entry) => {
                let mut binding = entry.binding.duplicate();
                for mat in binding.materials_mut() {
                    mat.mark_needs_update();
                }
                mesh.material = binding;
                for (group, index) in mesh.geometry.groups.iter_mut().zip(&entry.group_indices) {
                    group.material_index = *index;
                }
            }
            MeshAction::Substitute {
                target,
                collapse_groups,
            } => {
                let mut mat = target.duplicate();
                mat.mark_needs_update();
                mesh.material = MaterialBinding::Single(mat);
                if collapse_groups {
                    for group in &mut mesh.geometry.groups {
                        group.material_index = 0;
                    }
                }
            }
        }
        mesh.geometry.compute_bounding_box();
        mesh.geometry.compute_bounding_sphere();
        trace!(
            "{}: {:?}/{:?} updated",
            assignment.group, assignment.node, assignment.mesh
        );

        let owner = owners
            .get(&assignment.mesh)
            .copied()
            .unwrap_or(assignment.node);
        scene.node_mut(owner).matrix_world_needs_update = true;
    }

    let render_version = scene.invalidate();
    debug!(
        "applied {} mesh assignment(s), render version {render_version}",
        plan.len()
    );

    Invalidation {
        meshes_updated: plan.len(),
        render_version,
    }
}

/// Plan and apply in one step.
pub fn apply_selections(
    scene: &mut Scene,
    baseline: &Baseline,
    groups: &[MaterialGroup],
    library: &MaterialLibrary,
    selections: &Selections,
) -> Invalidation {
    let plan = plan(baseline, groups, library, selections);
    apply_plan(scene, &plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::{Collection, build_groups, collect};
    use crate::scene::{Geometry, Mesh, SubmeshGroup, Texture, TextureSlot, TextureSource};

    fn textured(name: &str, uri: &str) -> Material {
        let mut mat = Material::builder().name(name).build();
        mat.set_texture(
            TextureSlot::Map,
            Texture::new(TextureSource::Uri(uri.to_string())),
        );
        mat
    }

    fn multi_mesh(materials: &[Material]) -> Mesh {
        let mut geometry = Geometry::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
            Some(vec![0, 1, 2, 0, 2, 3]),
        );
        geometry.groups = (0..materials.len())
            .map(|i| SubmeshGroup {
                start: i * 3,
                count: 3,
                material_index: i,
            })
            .collect();
        Mesh::new(MaterialBinding::Multi(materials.to_vec()), geometry)
    }

    fn single_mesh(material: &Material) -> Mesh {
        Mesh::new(
            MaterialBinding::Single(material.clone()),
            Geometry::new(vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]], None),
        )
    }

    struct Fixture {
        scene: Scene,
        n1: NodeId,
        n2: NodeId,
        n3: NodeId,
        collection: Collection,
        groups: Vec<MaterialGroup>,
    }

    /// N1 and N2 use Wood+Leather, N3 only Wood.
    fn fixture() -> Fixture {
        let wood = textured("Wood", "wood.png");
        let leather = textured("Leather", "leather.png");

        let mut scene = Scene::new(Some("Sofa".to_string()));
        scene.add_material(wood.clone());
        scene.add_material(leather.clone());
        let root = scene.root();

        let n1 = scene.add_node(root, Some("N1".to_string()));
        scene.attach_mesh(n1, multi_mesh(&[wood.clone(), leather.clone()]));

        let n2 = scene.add_node(root, Some("N2".to_string()));
        let n2_seat = scene.add_node(n2, Some("Seat".to_string()));
        scene.attach_mesh(n2_seat, single_mesh(&leather));
        let n2_legs = scene.add_node(n2, Some("Legs".to_string()));
        scene.attach_mesh(n2_legs, single_mesh(&wood));

        let n3 = scene.add_node(root, Some("N3".to_string()));
        scene.attach_mesh(n3, single_mesh(&wood));

        let collection = collect(Some(&scene)).unwrap();
        let groups = build_groups(&collection.nodes);
        Fixture {
            scene,
            n1,
            n2,
            n3,
            collection,
            groups,
        }
    }

    impl Fixture {
        fn apply(&mut self, selections: &Selections) -> Invalidation {
            apply_selections(
                &mut self.scene,
                &self.collection.baseline,
                &self.groups,
                &self.collection.library,
                selections,
            )
        }

        fn bindings_under(&self, node: NodeId) -> Vec<&MaterialBinding> {
            self.scene
                .descendant_meshes(node)
                .into_iter()
                .map(|m| &self.scene.mesh(m).material)
                .collect()
        }
    }

    #[test]
    fn end_to_end_grouping() {
        let fx = fixture();
        assert_eq!(fx.groups.len(), 1);
        assert_eq!(fx.groups[0].id, "group_1");
        assert_eq!(fx.groups[0].material_set, ["Leather", "Wood"]);
        assert_eq!(fx.groups[0].nodes, vec![fx.n1, fx.n2]);
    }

    #[test]
    fn substitute_then_restore() {
        let mut fx = fixture();
        let leather = fx.collection.library.get("Leather").unwrap().clone();
        let n3_before = fx.bindings_under(fx.n3)[0].clone();

        let invalidation = fx.apply(&[("group_1", "Leather")].into_iter().collect());
        assert_eq!(invalidation.meshes_updated, 3);
        for node in [fx.n1, fx.n2] {
            for binding in fx.bindings_under(node) {
                let MaterialBinding::Single(mat) = binding else {
                    panic!("expected a single material after substitution");
                };
                assert!(mat.same_content(&leather));
                assert_ne!(mat.uid(), leather.uid());
                assert!(mat.generation() > 0);
            }
        }
        let n1_mesh = fx.scene.mesh(fx.scene.node(fx.n1).mesh().unwrap());
        assert!(n1_mesh.geometry.groups.iter().all(|g| g.material_index == 0));
        assert!(fx.bindings_under(fx.n3)[0].same_content(&n3_before));

        let mut selections = Selections::new();
        selections.set("group_1", None);
        fx.apply(&selections);
        for node in [fx.n1, fx.n2] {
            for (mesh, entry) in fx.collection.baseline.meshes_of(node) {
                let mesh = fx.scene.mesh(mesh);
                assert!(mesh.material.same_content(&entry.binding));
                let indices: Vec<usize> =
                    mesh.geometry.groups.iter().map(|g| g.material_index).collect();
                assert_eq!(indices, entry.group_indices);
            }
        }
    }

    #[test]
    fn repeated_substitution_is_idempotent() {
        let mut fx = fixture();
        let selections: Selections = [("group_1", "Wood")].into_iter().collect();

        fx.apply(&selections);
        let first: Vec<MaterialBinding> =
            fx.bindings_under(fx.n1).into_iter().cloned().collect();
        fx.apply(&selections);
        let second = fx.bindings_under(fx.n1);

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second) {
            assert!(a.same_content(b));
        }
    }

    #[test]
    fn unknown_material_restores() {
        let mut fx = fixture();
        fx.apply(&[("group_1", "Leather")].into_iter().collect());
        fx.apply(&[("group_1", "Velvet")].into_iter().collect());

        let n1_mesh = fx.scene.mesh(fx.scene.node(fx.n1).mesh().unwrap());
        assert!(n1_mesh.material.is_multi());
        assert_eq!(n1_mesh.material.materials()[0].name, "Wood");
    }

    #[test]
    fn one_invalidation_per_batch() {
        let mut fx = fixture();
        let before = fx.scene.render_version();
        let invalidation = fx.apply(&[("group_1", "Leather")].into_iter().collect());
        assert_eq!(invalidation.render_version, before + 1);
        assert!(fx.scene.node(fx.n1).matrix_world_needs_update);
    }

    #[test]
    fn substituted_textures_are_independent_per_mesh() {
        let mut fx = fixture();
        fx.apply(&[("group_1", "Leather")].into_iter().collect());

        let meshes = fx.scene.descendant_meshes(fx.n2);
        let tex_uid = |m: MeshId| {
            fx.scene.mesh(m).material.materials()[0]
                .texture(TextureSlot::Map)
                .map(Texture::uid)
        };
        assert_ne!(tex_uid(meshes[0]), tex_uid(meshes[1]));
    }

    #[test]
    fn groups_are_independent() {
        let wood = Material::builder().name("Wood").build();
        let leather = Material::builder().name("Leather").build();
        let metal = Material::builder().name("Metal").build();

        let mut scene = Scene::default();
        for mat in [&wood, &leather, &metal] {
            scene.add_material(mat.clone());
        }
        let root = scene.root();
        let chair = scene.add_node(root, Some("Chair".to_string()));
        scene.attach_mesh(chair, multi_mesh(&[wood.clone(), leather.clone()]));
        let lamp = scene.add_node(root, Some("Lamp".to_string()));
        scene.attach_mesh(lamp, multi_mesh(&[metal.clone(), wood.clone()]));

        let collection = collect(Some(&scene)).unwrap();
        let groups = build_groups(&collection.nodes);
        assert_eq!(groups.len(), 2);

        let mut selections: Selections =
            [("group_1", "Leather"), ("group_2", "Metal")].into_iter().collect();
        let library = &collection.library;
        apply_selections(&mut scene, &collection.baseline, &groups, library, &selections);

        selections.clear("group_1");
        apply_selections(&mut scene, &collection.baseline, &groups, library, &selections);

        let chair_mesh = scene.mesh(scene.node(chair).mesh().unwrap());
        let lamp_mesh = scene.mesh(scene.node(lamp).mesh().unwrap());
        assert!(chair_mesh.material.is_multi());
        assert!(!lamp_mesh.material.is_multi());
        assert_eq!(lamp_mesh.material.materials()[0].name, "Metal");
    }

    #[test]
    fn wrapper_selection_survives_unset_child_groups() {
        let mats: Vec<Material> = ["Wood", "Leather", "Metal", "Fabric"]
            .iter()
            .map(|n| Material::builder().name(*n).build())
            .collect();
        let mut scene = Scene::new(Some("Sketchfab_Scene".to_string()));
        for mat in &mats {
            scene.add_material(mat.clone());
        }
        let root = scene.root();
        let wrapper = scene.add_node(root, Some("Sketchfab_model".to_string()));
        let seat = scene.add_node(wrapper, Some("Seat".to_string()));
        scene.attach_mesh(seat, multi_mesh(&[mats[0].clone(), mats[1].clone()]));
        let legs = scene.add_node(wrapper, Some("Legs".to_string()));
        scene.attach_mesh(legs, multi_mesh(&[mats[2].clone(), mats[3].clone()]));

        let collection = collect(Some(&scene)).unwrap();
        let groups = build_groups(&collection.nodes);
        let summary: Vec<(&str, Vec<NodeId>)> = groups
            .iter()
            .map(|g| (g.id.as_str(), g.nodes.clone()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("group_1", vec![wrapper]),
                ("group_2", vec![seat]),
                ("group_3", vec![legs]),
            ]
        );

        let selections: Selections = [("group_1", "Wood")].into_iter().collect();
        let invalidation = apply_selections(
            &mut scene,
            &collection.baseline,
            &groups,
            &collection.library,
            &selections,
        );
        assert_eq!(invalidation.meshes_updated, 2);
        for node in [seat, legs] {
            let mesh = scene.mesh(scene.node(node).mesh().unwrap());
            assert!(!mesh.material.is_multi());
            assert_eq!(mesh.material.materials()[0].name, "Wood");
        }

        // A child selection wins over the wrapper's for its own meshes.
        let selections: Selections =
            [("group_1", "Wood"), ("group_3", "Metal")].into_iter().collect();
        apply_selections(
            &mut scene,
            &collection.baseline,
            &groups,
            &collection.library,
            &selections,
        );
        let seat_mesh = scene.mesh(scene.node(seat).mesh().unwrap());
        let legs_mesh = scene.mesh(scene.node(legs).mesh().unwrap());
        assert_eq!(seat_mesh.material.materials()[0].name, "Wood");
        assert_eq!(legs_mesh.material.materials()[0].name, "Metal");

        apply_selections(
            &mut scene,
            &collection.baseline,
            &groups,
            &collection.library,
            &Selections::new(),
        );
        let seat_mesh = scene.mesh(scene.node(seat).mesh().unwrap());
        assert!(seat_mesh.material.is_multi());
        assert_eq!(seat_mesh.material.materials()[1].name, "Leather");
    }

    #[test]
    fn unset_overlapping_group_keeps_substitution() {
        let fx = fixture();
        let selections: Selections = [("group_1", "Leather")].into_iter().collect();
        let mut groups = fx.groups.clone();
        // A second, unset group over N1 only.
        groups.push(MaterialGroup {
            id: "group_2".to_string(),
            material_set: vec!["Leather".to_string(), "Wood".to_string()],
            nodes: vec![fx.n1],
        });

        let plan = plan(
            &fx.collection.baseline,
            &groups,
            &fx.collection.library,
            &selections,
        );
        assert_eq!(plan.len(), 3);
        assert!(plan.assignments.iter().all(|a| a.group == "group_1"));
    }

    #[test]
    fn plan_leaves_scene_untouched() {
        let fx = fixture();
        let before = fx.scene.render_version();
        let selections: Selections = [("group_1", "Leather")].into_iter().collect();
        let plan = plan(
            &fx.collection.baseline,
            &fx.groups,
            &fx.collection.library,
            &selections,
        );

        assert_eq!(plan.len(), 3);
        assert!(plan.assignments.iter().all(|a| matches!(
            a.action,
            MeshAction::Substitute { target, .. } if target.name == "Leather"
        )));
        assert_eq!(fx.scene.render_version(), before);
        assert!(fx.bindings_under(fx.n1)[0].is_multi());
    }
}
