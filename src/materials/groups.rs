use std::collections::HashMap;

use itertools::Itertools;
use tracing::debug;

use super::classify::is_placeholder_name;
use super::collect::CollectedNode;
use crate::scene::NodeId;

/// Nodes sharing an identical set of meaningful material names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaterialGroup {
    /// `group_<n>`, numbered from 1 in discovery order.
    pub id: String,
    /// Sorted, deduplicated material names.
    pub material_set: Vec<String>,
    pub nodes: Vec<NodeId>,
}

impl MaterialGroup {
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }
}

/// Cluster collected nodes by material set.
///
/// Nodes with fewer than two meaningful materials are not candidates and are
/// dropped. Groups come back in first-discovery order.
pub fn build_groups(collected: &[CollectedNode]) -> Vec<MaterialGroup> {
    let mut groups: Vec<MaterialGroup> = Vec::new();
    let mut by_key: HashMap<Vec<String>, usize> = HashMap::new();

    for entry in collected {
        let key: Vec<String> = entry
            .materials
            .iter()
            .filter(|name| !is_placeholder_name(name))
            .cloned()
            .sorted()
            .dedup()
            .collect();
        if key.len() < 2 {
            continue;
        }

        match by_key.get(&key) {
            Some(&index) => groups[index].nodes.push(entry.node),
            None => {
                by_key.insert(key.clone(), groups.len());
                groups.push(MaterialGroup {
                    id: format!("group_{}", groups.len() + 1),
                    material_set: key,
                    nodes: vec![entry.node],
                });
            }
        }
    }

    for group in &groups {
        debug!(
            "{}: [{}] on {} node(s)",
            group.id,
            group.material_set.join(", "),
            group.nodes.len()
        );
    }

    groups
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::scene::Scene;

    fn nodes(count: usize) -> Vec<NodeId> {
        let mut scene = Scene::default();
        let root = scene.root();
        (0..count)
            .map(|i| scene.add_node(root, Some(format!("N{i}"))))
            .collect()
    }

    fn entry(node: NodeId, materials: &[&str]) -> CollectedNode {
        CollectedNode {
            node,
            node_name: String::new(),
            materials: materials.iter().map(|m| m.to_string()).collect::<BTreeSet<_>>(),
        }
    }

    #[test]
    fn order_independent_key() {
        let ids = nodes(2);
        let groups = build_groups(&[entry(ids[0], &["A", "B"]), entry(ids[1], &["B", "A"])]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].material_set, ["A", "B"]);
        assert_eq!(groups[0].nodes, ids);
    }

    #[test]
    fn drops_non_candidates() {
        let ids = nodes(4);
        let groups = build_groups(&[
            entry(ids[0], &[]),
            entry(ids[1], &["A"]),
            entry(ids[2], &["Material_1", "Material_2"]),
            entry(ids[3], &["A", "Material_9"]),
        ]);
        assert!(groups.is_empty());
    }

    #[test]
    fn ids_follow_discovery_order() {
        let ids = nodes(4);
        let groups = build_groups(&[
            entry(ids[0], &["Wood", "Metal"]),
            entry(ids[1], &["Leather", "Wood"]),
            entry(ids[2], &["Metal", "Wood"]),
            entry(ids[3], &["Fabric", "Leather", "Wood"]),
        ]);
        let summary: Vec<(&str, Vec<NodeId>)> = groups
            .iter()
            .map(|g| (g.id.as_str(), g.nodes.clone()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("group_1", vec![ids[0], ids[2]]),
                ("group_2", vec![ids[1]]),
                ("group_3", vec![ids[3]]),
            ]
        );
        assert_eq!(groups[0].material_set, ["Metal", "Wood"]);
    }

    #[test]
    fn membership_is_disjoint() {
        let ids = nodes(5);
        let collected: Vec<CollectedNode> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                if i % 2 == 0 {
                    entry(*id, &["A", "B"])
                } else {
                    entry(*id, &["B", "C"])
                }
            })
            .collect();
        let groups = build_groups(&collected);

        for id in &ids {
            let owners = groups.iter().filter(|g| g.contains(*id)).count();
            assert_eq!(owners, 1);
        }
    }
}
