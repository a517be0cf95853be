//! Build a [`Scene`] from a GLB or glTF document.
//!
//! glTF meshes with several primitives become one multi-material [`Mesh`]:
//! primitive geometry is concatenated and each primitive contributes one
//! [`SubmeshGroup`] pointing at its material. Materials and textures shared
//! between primitives in the document stay shared (same identity) in the
//! scene, the way a loader hands out one material object per document entry.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use rootcause::Report;
use tracing::{debug, warn};

use super::format::ImportError;
use super::material::{Texture, TextureSlot, TextureSource, UvTransform};
use super::mesh::{Geometry, MaterialBinding, Mesh, SubmeshGroup};
use super::{Material, NodeId, Scene, Transform};

/// Import a GLB container or a glTF JSON document.
///
/// `base` is used to resolve external buffer URIs for `.gltf` files.
pub fn import_gltf(bytes: &[u8], base: Option<&Path>) -> Result<Scene, Report<ImportError>> {
    let gltf = gltf::Gltf::from_slice(bytes)
        .map_err(|e| Report::new(ImportError::Gltf(e.to_string())))?;
    let buffers = gltf::import_buffers(&gltf.document, base, gltf.blob.clone())
        .map_err(|e| Report::new(ImportError::Gltf(e.to_string())))?;

    let document = &gltf.document;
    let gltf_scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or_else(|| Report::new(ImportError::NoScene))?;

    let mut builder = SceneBuilder {
        buffers: &buffers,
        materials: HashMap::new(),
        textures: HashMap::new(),
        node_ids: HashMap::new(),
    };

    let mut scene = Scene::new(gltf_scene.name().map(str::to_string));

    for mat in document.materials() {
        let converted = builder.material(&mat);
        scene.add_material(converted);
    }

    for node in gltf_scene.nodes() {
        let root = scene.root();
        builder.add_node(&mut scene, root, &node);
    }

    for skin in document.skins() {
        for joint in skin.joints() {
            if let Some(id) = builder.node_ids.get(&joint.index()) {
                scene.node_mut(*id).is_bone = true;
            }
        }
    }

    for anim in document.animations() {
        let name = anim
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("animation_{}", anim.index()));
        scene.add_animation(name);
    }

    debug!(
        "imported glTF scene: {} nodes, {} meshes, {} materials, {} animations",
        scene.nodes().len(),
        scene.meshes().len(),
        scene.materials().len(),
        scene.animations().len()
    );

    Ok(scene)
}

struct SceneBuilder<'a> {
    buffers: &'a [gltf::buffer::Data],
    /// Converted materials keyed by document index.
    materials: HashMap<usize, Material>,
    /// Converted textures keyed by document index.
    textures: HashMap<usize, Texture>,
    /// Document node index -> scene node.
    node_ids: HashMap<usize, NodeId>,
}

impl SceneBuilder<'_> {
    fn add_node(&mut self, scene: &mut Scene, parent: NodeId, node: &gltf::Node<'_>) {
        let id = scene.add_node(parent, node.name().map(str::to_string));
        self.node_ids.insert(node.index(), id);

        let (translation, rotation, scale) = node.transform().decomposed();
        {
            let scene_node = scene.node_mut(id);
            scene_node.source_index = Some(node.index());
            scene_node.transform = Transform {
                translation,
                rotation,
                scale,
            };
        }

        if let Some(gltf_mesh) = node.mesh()
            && let Some(mesh) = self.mesh(&gltf_mesh)
        {
            scene.attach_mesh(id, mesh);
        }

        for child in node.children() {
            self.add_node(scene, id, &child);
        }
    }

    fn mesh(&mut self, gltf_mesh: &gltf::Mesh<'_>) -> Option<Mesh> {
        let buffers = self.buffers;
        let mut materials = Vec::new();
        let mut geometry = Geometry::default();
        let mut indices: Vec<u32> = Vec::new();
        let mut any_normals = false;
        let mut any_uvs = false;

        for prim in gltf_mesh.primitives() {
            if prim.mode() != gltf::mesh::Mode::Triangles {
                warn!(
                    "skipping non-triangle primitive {} of mesh {:?}",
                    prim.index(),
                    gltf_mesh.name()
                );
                continue;
            }

            let reader = prim.reader(|buffer| Some(&buffers[buffer.index()]));
            let Some(positions) = reader.read_positions() else {
                warn!("primitive {} has no positions", prim.index());
                continue;
            };
            let positions: Vec<[f32; 3]> = positions.collect();
            let vertex_count = positions.len();
            let base_vertex = geometry.positions.len() as u32;

            match reader.read_normals() {
                Some(normals) => {
                    any_normals = true;
                    geometry.normals.extend(normals);
                }
                None => geometry
                    .normals
                    .extend(std::iter::repeat_n([0.0, 0.0, 1.0], vertex_count)),
            }
            match reader.read_tex_coords(0) {
                Some(uvs) => {
                    any_uvs = true;
                    geometry.uvs.extend(uvs.into_f32());
                }
                None => geometry
                    .uvs
                    .extend(std::iter::repeat_n([0.0, 0.0], vertex_count)),
            }

            let prim_indices: Vec<u32> = match reader.read_indices() {
                Some(idx) => idx.into_u32().map(|i| i + base_vertex).collect(),
                None => (base_vertex..base_vertex + vertex_count as u32).collect(),
            };

            geometry.groups.push(SubmeshGroup {
                start: indices.len(),
                count: prim_indices.len(),
                material_index: materials.len(),
            });
            indices.extend(prim_indices);
            geometry.positions.extend(positions);
            materials.push(self.material(&prim.material()));
        }

        if materials.is_empty() {
            return None;
        }
        if !any_normals {
            geometry.normals.clear();
        }
        if !any_uvs {
            geometry.uvs.clear();
        }
        geometry.indices = Some(indices);
        geometry.compute_bounding_box();
        geometry.compute_bounding_sphere();

        let binding = if materials.len() == 1 {
            geometry.groups.clear();
            MaterialBinding::Single(materials.remove(0))
        } else {
            MaterialBinding::Multi(materials)
        };

        let mut mesh = Mesh::new(binding, geometry);
        mesh.name = gltf_mesh.name().map(str::to_string);
        Some(mesh)
    }

    fn material(&mut self, mat: &gltf::Material<'_>) -> Material {
        if let Some(index) = mat.index()
            && let Some(cached) = self.materials.get(&index)
        {
            return cached.clone();
        }

        let pbr = mat.pbr_metallic_roughness();
        let mut material = Material::builder()
            .maybe_source_index(mat.index())
            .name(mat.name().unwrap_or_default())
            .color(pbr.base_color_factor())
            .roughness(pbr.roughness_factor())
            .metalness(pbr.metallic_factor())
            .build();

        if let Some(info) = pbr.base_color_texture() {
            let tex = self.texture(&info.texture(), info.tex_coord(), uv_transform(&info));
            material.set_texture(TextureSlot::Map, tex);
        }
        if let Some(info) = pbr.metallic_roughness_texture() {
            let tex = self.texture(&info.texture(), info.tex_coord(), uv_transform(&info));
            material.set_texture(TextureSlot::Roughness, tex.clone());
            material.set_texture(TextureSlot::Metalness, tex);
        }
        if let Some(info) = mat.emissive_texture() {
            let tex = self.texture(&info.texture(), info.tex_coord(), uv_transform(&info));
            material.set_texture(TextureSlot::Emissive, tex);
        }
        if let Some(normal) = mat.normal_texture() {
            let tex = self.texture(&normal.texture(), normal.tex_coord(), UvTransform::default());
            material.set_texture(TextureSlot::Normal, tex);
        }
        if let Some(occlusion) = mat.occlusion_texture() {
            let tex = self.texture(
                &occlusion.texture(),
                occlusion.tex_coord(),
                UvTransform::default(),
            );
            material.set_texture(TextureSlot::Ao, tex);
        }

        if let Some(index) = mat.index() {
            self.materials.insert(index, material.clone());
        }
        material
    }

    fn texture(
        &mut self,
        texture: &gltf::Texture<'_>,
        tex_coord: u32,
        uv_transform: UvTransform,
    ) -> Texture {
        let buffers = self.buffers;
        let cached = self
            .textures
            .entry(texture.index())
            .or_insert_with(|| Texture::new(image_source(&texture.source(), buffers)));
        if cached.tex_coord == tex_coord && cached.uv_transform == uv_transform {
            return cached.clone();
        }
        // Same image sampled differently: its own texture instance.
        let mut tex = cached.duplicate();
        tex.tex_coord = tex_coord;
        tex.uv_transform = uv_transform;
        tex
    }
}

fn uv_transform(info: &gltf::texture::Info<'_>) -> UvTransform {
    info.texture_transform()
        .map(|t| UvTransform {
            offset: t.offset(),
            scale: t.scale(),
            rotation: t.rotation(),
        })
        .unwrap_or_default()
}

fn image_source(image: &gltf::Image<'_>, buffers: &[gltf::buffer::Data]) -> TextureSource {
    match image.source() {
        gltf::image::Source::Uri { uri, .. } => TextureSource::Uri(uri.to_string()),
        gltf::image::Source::View { view, mime_type } => {
            let data = &buffers[view.buffer().index()];
            let start = view.offset();
            let end = start + view.length();
            let bytes: Arc<[u8]> = data.get(start..end).unwrap_or_default().into();
            TextureSource::Embedded {
                mime_type: mime_type.to_string(),
                data: bytes,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;
    use std::collections::BTreeMap;

    use gltf_json as json;
    use json::validation::Checked::Valid;
    use json::validation::USize64;

    use super::*;
    use crate::viewer::ModelStatistics;

    /// In-memory glTF document with a single binary buffer.
    #[derive(Default)]
    struct Document {
        root: json::Root,
        bin: Vec<u8>,
    }

    impl Document {
        fn floats(
            &mut self,
            values: &[f32],
            type_: json::accessor::Type,
            bounds: Option<(Vec<f32>, Vec<f32>)>,
        ) -> json::Index<json::Accessor> {
            let components = match type_ {
                json::accessor::Type::Vec3 => 3,
                _ => 1,
            };
            let offset = self.bin.len();
            self.bin.extend(values.iter().flat_map(|v| v.to_le_bytes()));
            let view = self.root.push(json::buffer::View {
                buffer: json::Index::new(0),
                byte_length: USize64::from(values.len() * 4),
                byte_offset: Some(USize64::from(offset)),
                byte_stride: None,
                target: None,
                name: None,
                extensions: Default::default(),
                extras: Default::default(),
            });
            let (min, max) = match bounds {
                Some((min, max)) => (Some(json::Value::from(min)), Some(json::Value::from(max))),
                None => (None, None),
            };
            self.root.push(json::Accessor {
                buffer_view: Some(view),
                byte_offset: Some(USize64(0)),
                count: USize64::from(values.len() / components),
                component_type: Valid(json::accessor::GenericComponentType(
                    json::accessor::ComponentType::F32,
                )),
                type_: Valid(type_),
                min,
                max,
                name: None,
                normalized: false,
                sparse: None,
                extensions: Default::default(),
                extras: Default::default(),
            })
        }

        fn triangle(&mut self) -> json::Index<json::Accessor> {
            self.floats(
                &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
                json::accessor::Type::Vec3,
                Some((vec![0.0, 0.0, 0.0], vec![1.0, 1.0, 0.0])),
            )
        }

        fn material(&mut self, name: &str) -> json::Index<json::Material> {
            self.root.push(json::Material {
                name: Some(name.to_string()),
                ..Default::default()
            })
        }

        fn node(
            &mut self,
            name: &str,
            mesh: Option<json::Index<json::Mesh>>,
            children: Vec<json::Index<json::Node>>,
        ) -> json::Index<json::Node> {
            self.root.push(json::Node {
                name: Some(name.to_string()),
                mesh,
                children: (!children.is_empty()).then_some(children),
                ..Default::default()
            })
        }

        fn animation(
            &mut self,
            name: Option<&str>,
            target: json::Index<json::Node>,
        ) -> json::Index<json::Animation> {
            let times = self.floats(
                &[0.0, 1.0],
                json::accessor::Type::Scalar,
                Some((vec![0.0], vec![1.0])),
            );
            let offsets = self.floats(
                &[0.0, 0.0, 0.0, 0.0, 0.5, 0.0],
                json::accessor::Type::Vec3,
                None,
            );
            self.root.push(json::Animation {
                channels: vec![json::animation::Channel {
                    sampler: json::Index::new(0),
                    target: json::animation::Target {
                        node: target,
                        path: Valid(json::animation::Property::Translation),
                        extensions: Default::default(),
                        extras: Default::default(),
                    },
                    extensions: Default::default(),
                    extras: Default::default(),
                }],
                samplers: vec![json::animation::Sampler {
                    input: times,
                    interpolation: Valid(json::animation::Interpolation::Linear),
                    output: offsets,
                    extensions: Default::default(),
                    extras: Default::default(),
                }],
                name: name.map(str::to_string),
                extensions: Default::default(),
                extras: Default::default(),
            })
        }

        fn into_glb(mut self, nodes: Vec<json::Index<json::Node>>) -> Vec<u8> {
            self.root.push(json::Buffer {
                byte_length: USize64::from(self.bin.len()),
                uri: None,
                name: None,
                extensions: Default::default(),
                extras: Default::default(),
            });
            let scene = self.root.push(json::Scene {
                nodes,
                name: Some("Rigged".to_string()),
                extensions: Default::default(),
                extras: Default::default(),
            });
            self.root.scene = Some(scene);

            let json_string = json::serialize::to_string(&self.root).unwrap();
            let glb = gltf::binary::Glb {
                header: gltf::binary::Header {
                    magic: *b"glTF",
                    version: 2,
                    length: 0,
                },
                json: Cow::Owned(json_string.into_bytes()),
                bin: Some(Cow::Owned(self.bin)),
            };
            let mut bytes = Vec::new();
            glb.to_writer(&mut bytes).unwrap();
            bytes
        }
    }

    fn primitive(
        positions: json::Index<json::Accessor>,
        material: json::Index<json::Material>,
        mode: json::mesh::Mode,
    ) -> json::mesh::Primitive {
        let mut attributes = BTreeMap::new();
        attributes.insert(Valid(json::mesh::Semantic::Positions), positions);
        json::mesh::Primitive {
            attributes,
            indices: None,
            material: Some(material),
            mode: Valid(mode),
            targets: None,
            extensions: Default::default(),
            extras: Default::default(),
        }
    }

    /// Body (two triangle primitives plus a line primitive), Hand (one
    /// triangle primitive plus a line primitive), and a two-joint rig with
    /// one named and one unnamed clip.
    fn rigged_glb() -> Vec<u8> {
        use json::mesh::Mode;

        let mut doc = Document::default();
        let wood = doc.material("Wood");
        let leather = doc.material("Leather");
        let tri = doc.triangle();

        let body_mesh = doc.root.push(json::Mesh {
            primitives: vec![
                primitive(tri, wood, Mode::Triangles),
                primitive(tri, wood, Mode::Lines),
                primitive(tri, leather, Mode::Triangles),
            ],
            weights: None,
            name: Some("Body".to_string()),
            extensions: Default::default(),
            extras: Default::default(),
        });
        let hand_mesh = doc.root.push(json::Mesh {
            primitives: vec![
                primitive(tri, leather, Mode::Lines),
                primitive(tri, wood, Mode::Triangles),
            ],
            weights: None,
            name: Some("Hand".to_string()),
            extensions: Default::default(),
            extras: Default::default(),
        });

        let hand = doc.node("Hand", Some(hand_mesh), Vec::new());
        let body = doc.node("Body", Some(body_mesh), vec![hand]);
        let spine = doc.node("Spine", None, Vec::new());
        let hip = doc.node("Hip", None, vec![spine]);

        doc.root.push(json::Skin {
            inverse_bind_matrices: None,
            joints: vec![hip, spine],
            skeleton: Some(hip),
            name: Some("Rig".to_string()),
            extensions: Default::default(),
            extras: Default::default(),
        });
        doc.animation(Some("Wave"), spine);
        doc.animation(None, hip);

        doc.into_glb(vec![body, hip])
    }

    #[test]
    fn skin_joints_become_bones() {
        let scene = import_gltf(&rigged_glb(), None).unwrap();

        for name in ["Hip", "Spine"] {
            let id = scene.find_node(name).unwrap();
            assert!(scene.node(id).is_bone, "{name} should be a bone");
        }
        let body = scene.find_node("Body").unwrap();
        assert!(!scene.node(body).is_bone);
        assert_eq!(ModelStatistics::from_scene(&scene).bones, 2);
    }

    #[test]
    fn animation_names_fall_back_to_index() {
        let scene = import_gltf(&rigged_glb(), None).unwrap();
        assert_eq!(scene.animations(), ["Wave", "animation_1"]);
        assert_eq!(ModelStatistics::from_scene(&scene).animations, 2);
    }

    #[test]
    fn primitives_become_submesh_groups() {
        let scene = import_gltf(&rigged_glb(), None).unwrap();
        assert_eq!(scene.name.as_deref(), Some("Rigged"));
        assert_eq!(scene.materials().len(), 2);

        let body = scene.find_node("Body").unwrap();
        let mesh = scene.mesh(scene.node(body).mesh().unwrap());
        assert!(mesh.material.is_multi());
        assert_eq!(mesh.material_names()[..2], ["Wood", "Leather"]);
        assert_eq!(
            mesh.geometry.groups,
            vec![
                SubmeshGroup {
                    start: 0,
                    count: 3,
                    material_index: 0,
                },
                SubmeshGroup {
                    start: 3,
                    count: 3,
                    material_index: 1,
                },
            ]
        );
        assert_eq!(mesh.geometry.vertex_count(), 6);
        assert_eq!(mesh.geometry.face_count(), 2);
        // Mesh materials keep the identity of the document material.
        let doc_wood = &scene.materials()[0];
        assert_eq!(mesh.material.materials()[0].uid(), doc_wood.uid());
    }

    #[test]
    fn single_triangle_primitive_collapses_to_single() {
        let scene = import_gltf(&rigged_glb(), None).unwrap();
        let hand = scene.find_node("Hand").unwrap();
        assert_eq!(scene.node(hand).parent(), scene.find_node("Body"));

        let mesh = scene.mesh(scene.node(hand).mesh().unwrap());
        assert!(!mesh.material.is_multi());
        assert!(mesh.geometry.groups.is_empty());
        assert_eq!(mesh.material.materials()[0].name, "Wood");
        assert_eq!(mesh.geometry.face_count(), 1);
    }
}
