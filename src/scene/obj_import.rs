//! Build a [`Scene`] from a Wavefront OBJ file and its MTL library.
//!
//! `tobj` splits an object into one model per `usemtl` run; consecutive models
//! sharing an object name are folded back into one multi-material mesh with a
//! submesh group per run.

use std::path::Path;

use itertools::Itertools;
use rootcause::Report;
use tracing::{debug, warn};

use super::format::ImportError;
use super::material::{Texture, TextureSlot, TextureSource};
use super::mesh::{Geometry, MaterialBinding, Mesh, SubmeshGroup};
use super::{Material, Scene};

pub fn import_obj(path: &Path) -> Result<Scene, Report<ImportError>> {
    let options = tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ..Default::default()
    };
    let (models, mtl) =
        tobj::load_obj(path, &options).map_err(|e| Report::new(ImportError::Obj(e.to_string())))?;

    let mtl = mtl.unwrap_or_else(|e| {
        warn!("no usable MTL library for {}: {e}", path.display());
        Vec::new()
    });
    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));

    let mut scene = Scene::new(
        path.file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_string),
    );

    let materials: Vec<Material> = mtl
        .iter()
        .enumerate()
        .map(|(i, m)| convert_material(i, m, base_dir))
        .collect();
    for mat in &materials {
        scene.add_material(mat.clone());
    }
    let fallback = Material::builder().color([0.53, 0.53, 0.53, 1.0]).build();

    for (name, runs) in &models.iter().chunk_by(|m| m.name.clone()) {
        let runs: Vec<&tobj::Model> = runs.collect();
        let mut geometry = Geometry::default();
        let mut indices = Vec::new();
        let mut bound = Vec::new();

        for run in &runs {
            let base_vertex = geometry.positions.len() as u32;
            let mesh = &run.mesh;
            geometry
                .positions
                .extend(mesh.positions.chunks_exact(3).map(|p| [p[0], p[1], p[2]]));
            geometry
                .normals
                .extend(mesh.normals.chunks_exact(3).map(|n| [n[0], n[1], n[2]]));
            geometry
                .uvs
                .extend(mesh.texcoords.chunks_exact(2).map(|t| [t[0], t[1]]));

            geometry.groups.push(SubmeshGroup {
                start: indices.len(),
                count: mesh.indices.len(),
                material_index: bound.len(),
            });
            indices.extend(mesh.indices.iter().map(|i| i + base_vertex));

            let material = mesh
                .material_id
                .and_then(|id| materials.get(id))
                .unwrap_or(&fallback);
            bound.push(material.clone());
        }

        if geometry.normals.len() != geometry.positions.len() {
            geometry.normals.clear();
        }
        if geometry.uvs.len() != geometry.positions.len() {
            geometry.uvs.clear();
        }
        geometry.indices = Some(indices);
        geometry.compute_bounding_box();
        geometry.compute_bounding_sphere();

        let binding = if bound.len() == 1 {
            geometry.groups.clear();
            MaterialBinding::Single(bound.remove(0))
        } else {
            MaterialBinding::Multi(bound)
        };

        let node = scene.add_node(scene.root(), Some(name.clone()));
        let mut mesh = Mesh::new(binding, geometry);
        mesh.name = Some(name);
        scene.attach_mesh(node, mesh);
    }

    debug!(
        "imported OBJ {}: {} meshes, {} materials",
        path.display(),
        scene.meshes().len(),
        scene.materials().len()
    );

    Ok(scene)
}

fn convert_material(index: usize, mtl: &tobj::Material, base_dir: &Path) -> Material {
    let diffuse = mtl.diffuse.unwrap_or([0.8, 0.8, 0.8]);
    let mut material = Material::builder()
        .source_index(index)
        .name(mtl.name.clone())
        .color([diffuse[0], diffuse[1], diffuse[2], mtl.dissolve.unwrap_or(1.0)])
        .build();

    let slots = [
        (TextureSlot::Map, &mtl.diffuse_texture),
        (TextureSlot::Normal, &mtl.normal_texture),
        (TextureSlot::Specular, &mtl.specular_texture),
        (TextureSlot::Alpha, &mtl.dissolve_texture),
    ];
    for (slot, file) in slots {
        if let Some(file) = file {
            let uri = base_dir.join(file).to_string_lossy().into_owned();
            material.set_texture(slot, Texture::new(TextureSource::Uri(uri)));
        }
    }
    material
}
