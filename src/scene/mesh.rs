//! Meshes, their material bindings, and geometry bookkeeping.

use super::material::Material;

/// The material(s) a mesh draws with.
#[derive(Clone, Debug)]
pub enum MaterialBinding {
    Single(Material),
    /// Multi-material mesh; submesh groups select an entry by index.
    Multi(Vec<Material>),
}

impl MaterialBinding {
    pub fn is_multi(&self) -> bool {
        matches!(self, MaterialBinding::Multi(_))
    }

    pub fn materials(&self) -> &[Material] {
        match self {
            MaterialBinding::Single(mat) => std::slice::from_ref(mat),
            MaterialBinding::Multi(mats) => mats,
        }
    }

    pub fn materials_mut(&mut self) -> &mut [Material] {
        match self {
            MaterialBinding::Single(mat) => std::slice::from_mut(mat),
            MaterialBinding::Multi(mats) => mats,
        }
    }

    pub fn get(&self, index: usize) -> Option<&Material> {
        self.materials().get(index)
    }

    /// Deep copy with fresh material and texture identities, preserving the
    /// single/list shape.
    pub fn duplicate(&self) -> Self {
        match self {
            MaterialBinding::Single(mat) => MaterialBinding::Single(mat.duplicate()),
            MaterialBinding::Multi(mats) => {
                MaterialBinding::Multi(mats.iter().map(Material::duplicate).collect())
            }
        }
    }

    pub fn same_content(&self, other: &MaterialBinding) -> bool {
        self.is_multi() == other.is_multi()
            && self.materials().len() == other.materials().len()
            && self
                .materials()
                .iter()
                .zip(other.materials())
                .all(|(a, b)| a.same_content(b))
    }
}

/// A contiguous index range drawn with one entry of a multi-material binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubmeshGroup {
    pub start: usize,
    pub count: usize,
    pub material_index: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Aabb {
    pub fn center(&self) -> [f32; 3] {
        [
            (self.min[0] + self.max[0]) * 0.5,
            (self.min[1] + self.max[1]) * 0.5,
            (self.min[2] + self.max[2]) * 0.5,
        ]
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingSphere {
    pub center: [f32; 3],
    pub radius: f32,
}

#[derive(Clone, Debug, Default)]
pub struct Geometry {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Option<Vec<u32>>,
    pub groups: Vec<SubmeshGroup>,
    bounding_box: Option<Aabb>,
    bounding_sphere: Option<BoundingSphere>,
}

impl Geometry {
    pub fn new(positions: Vec<[f32; 3]>, indices: Option<Vec<u32>>) -> Self {
        Self {
            positions,
            indices,
            ..Default::default()
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn face_count(&self) -> usize {
        match &self.indices {
            Some(indices) => indices.len() / 3,
            None => self.positions.len() / 3,
        }
    }

    pub fn bounding_box(&self) -> Option<Aabb> {
        self.bounding_box
    }

    pub fn bounding_sphere(&self) -> Option<BoundingSphere> {
        self.bounding_sphere
    }

    pub fn compute_bounding_box(&mut self) {
        self.bounding_box = bounding_coords(&self.positions).map(|(min, max)| Aabb { min, max });
    }

    /// Sphere centered on the bounding box, enclosing every position.
    pub fn compute_bounding_sphere(&mut self) {
        let Some((min, max)) = bounding_coords(&self.positions) else {
            self.bounding_sphere = None;
            return;
        };
        let center = Aabb { min, max }.center();
        let radius_sq = self
            .positions
            .iter()
            .map(|p| {
                let d = [p[0] - center[0], p[1] - center[1], p[2] - center[2]];
                d[0] * d[0] + d[1] * d[1] + d[2] * d[2]
            })
            .fold(0.0f32, f32::max);
        self.bounding_sphere = Some(BoundingSphere {
            center,
            radius: radius_sq.sqrt(),
        });
    }
}

/// Per-axis minimum and maximum, `None` for an empty slice.
pub(crate) fn bounding_coords(points: &[[f32; 3]]) -> Option<([f32; 3], [f32; 3])> {
    if points.is_empty() {
        return None;
    }
    let mut min = [f32::MAX; 3];
    let mut max = [f32::MIN; 3];
    for p in points {
        for i in 0..3 {
            min[i] = f32::min(min[i], p[i]);
            max[i] = f32::max(max[i], p[i]);
        }
    }
    Some((min, max))
}

#[derive(Clone, Debug)]
pub struct Mesh {
    pub name: Option<String>,
    pub material: MaterialBinding,
    pub geometry: Geometry,
}

impl Mesh {
    pub fn new(material: MaterialBinding, geometry: Geometry) -> Self {
        Self {
            name: None,
            material,
            geometry,
        }
    }

    /// Names of every material the mesh binds, followed by names reached
    /// through submesh group indices. May contain duplicates.
    pub fn material_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .material
            .materials()
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        if self.material.is_multi() {
            names.extend(
                self.geometry
                    .groups
                    .iter()
                    .filter_map(|g| self.material.get(g.material_index))
                    .map(|m| m.name.as_str()),
            );
        }
        names
    }
}
