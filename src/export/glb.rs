//! Write a [`Scene`] to a binary glTF container.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::io::Write;

use gltf_json as json;
use json::validation::Checked::Valid;
use json::validation::USize64;
use rootcause::Report;
use thiserror::Error;
use tracing::{debug, trace};

use crate::scene::material::{MaterialUid, TextureUid};
use crate::scene::mesh::bounding_coords;
use crate::scene::{Material, Mesh, NodeId, Scene, Texture, TextureSlot, TextureSource};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("glTF serialization error: {0}")]
    Serialize(String),
    #[error("I/O error: {0}")]
    Io(String),
}

/// Export `scene` as GLB.
///
/// Every scene node becomes a glTF node with its local transform. A mesh
/// gets one primitive per submesh group, or a single primitive when it has
/// none. Materials and textures shared between meshes are written once.
/// Skins and animation channels are not exported.
pub fn export_glb(scene: &Scene, writer: &mut impl Write) -> Result<(), Report<ExportError>> {
    let mut builder = GlbBuilder::default();
    builder.root.asset = json::Asset {
        version: "2.0".to_string(),
        generator: Some("meshswatch".to_string()),
        ..Default::default()
    };

    let top_level: Vec<json::Index<json::Node>> = scene
        .node(scene.root())
        .children()
        .iter()
        .map(|child| builder.add_node(scene, *child))
        .collect();

    pad_to_4(&mut builder.bin);
    if !builder.bin.is_empty() {
        let buffer = builder.root.push(json::Buffer {
            byte_length: USize64::from(builder.bin.len()),
            uri: None,
            name: None,
            extensions: Default::default(),
            extras: Default::default(),
        });
        for bv in builder.root.buffer_views.iter_mut() {
            bv.buffer = buffer;
        }
    }

    let gltf_scene = builder.root.push(json::Scene {
        nodes: top_level,
        name: scene.name.clone(),
        extensions: Default::default(),
        extras: Default::default(),
    });
    builder.root.scene = Some(gltf_scene);

    if builder.uses_texture_transform {
        builder
            .root
            .extensions_used
            .push("KHR_texture_transform".to_string());
    }

    debug!(
        "exporting GLB: {} nodes, {} meshes, {} materials, {} textures, {} bytes of buffer data",
        builder.root.nodes.len(),
        builder.root.meshes.len(),
        builder.root.materials.len(),
        builder.root.textures.len(),
        builder.bin.len()
    );

    let json_string = json::serialize::to_string(&builder.root)
        .map_err(|e| Report::new(ExportError::Serialize(e.to_string())))?;

    let glb = gltf::binary::Glb {
        header: gltf::binary::Header {
            magic: *b"glTF",
            version: 2,
            length: 0, // to_writer computes this
        },
        json: Cow::Owned(json_string.into_bytes()),
        bin: if builder.bin.is_empty() {
            None
        } else {
            Some(Cow::Owned(builder.bin))
        },
    };

    glb.to_writer(writer)
        .map_err(|e| Report::new(ExportError::Io(e.to_string())))?;

    Ok(())
}

#[derive(Default)]
struct GlbBuilder {
    root: json::Root,
    bin: Vec<u8>,
    materials: HashMap<MaterialUid, json::Index<json::Material>>,
    textures: HashMap<TextureUid, json::Index<json::Texture>>,
    sampler: Option<json::Index<json::texture::Sampler>>,
    uses_texture_transform: bool,
}

impl GlbBuilder {
    fn add_node(&mut self, scene: &Scene, id: NodeId) -> json::Index<json::Node> {
        let node = scene.node(id);
        let mesh = node.mesh().map(|m| self.add_mesh(scene.mesh(m)));
        let children: Vec<json::Index<json::Node>> = node
            .children()
            .iter()
            .map(|child| self.add_node(scene, *child))
            .collect();

        let t = &node.transform;
        self.root.push(json::Node {
            name: node.name.clone(),
            mesh,
            children: (!children.is_empty()).then_some(children),
            translation: (t.translation != [0.0; 3]).then_some(t.translation),
            rotation: (t.rotation != [0.0, 0.0, 0.0, 1.0])
                .then_some(json::scene::UnitQuaternion(t.rotation)),
            scale: (t.scale != [1.0; 3]).then_some(t.scale),
            ..Default::default()
        })
    }

    fn add_mesh(&mut self, mesh: &Mesh) -> json::Index<json::Mesh> {
        let geometry = &mesh.geometry;
        let mut attributes = BTreeMap::new();

        if !geometry.positions.is_empty() {
            let (min, max) = geometry
                .bounding_box()
                .map(|b| (b.min, b.max))
                .or_else(|| bounding_coords(&geometry.positions))
                .unwrap_or_default();
            let acc = self.push_accessor(
                floats(geometry.positions.iter().flatten()),
                geometry.positions.len(),
                json::accessor::ComponentType::F32,
                json::accessor::Type::Vec3,
                json::buffer::Target::ArrayBuffer,
                Some((min.to_vec(), max.to_vec())),
            );
            attributes.insert(Valid(json::mesh::Semantic::Positions), acc);
        }
        if !geometry.normals.is_empty() {
            let acc = self.push_accessor(
                floats(geometry.normals.iter().flatten()),
                geometry.normals.len(),
                json::accessor::ComponentType::F32,
                json::accessor::Type::Vec3,
                json::buffer::Target::ArrayBuffer,
                None,
            );
            attributes.insert(Valid(json::mesh::Semantic::Normals), acc);
        }
        if !geometry.uvs.is_empty() {
            let acc = self.push_accessor(
                floats(geometry.uvs.iter().flatten()),
                geometry.uvs.len(),
                json::accessor::ComponentType::F32,
                json::accessor::Type::Vec2,
                json::buffer::Target::ArrayBuffer,
                None,
            );
            attributes.insert(Valid(json::mesh::Semantic::TexCoords(0)), acc);
        }

        let all_indices: Cow<'_, [u32]> = match &geometry.indices {
            Some(indices) => Cow::Borrowed(indices),
            None => Cow::Owned((0..geometry.positions.len() as u32).collect()),
        };

        // (index range, material) per primitive.
        let mut parts: Vec<(&[u32], Option<&Material>)> = Vec::new();
        if geometry.groups.is_empty() {
            parts.push((&all_indices[..], mesh.material.get(0)));
        } else {
            for group in &geometry.groups {
                let end = (group.start + group.count).min(all_indices.len());
                let start = group.start.min(end);
                parts.push((
                    &all_indices[start..end],
                    mesh.material.get(group.material_index),
                ));
            }
        }

        let mut primitives = Vec::with_capacity(parts.len());
        for (indices, material) in parts {
            let indices_acc = (!indices.is_empty()).then(|| {
                self.push_accessor(
                    indices.iter().flat_map(|i| i.to_le_bytes()).collect(),
                    indices.len(),
                    json::accessor::ComponentType::U32,
                    json::accessor::Type::Scalar,
                    json::buffer::Target::ElementArrayBuffer,
                    None,
                )
            });
            let material = material.map(|m| self.material(m));
            primitives.push(json::mesh::Primitive {
                attributes: attributes.clone(),
                indices: indices_acc,
                material,
                mode: Valid(json::mesh::Mode::Triangles),
                targets: None,
                extensions: Default::default(),
                extras: Default::default(),
            });
        }

        self.root.push(json::Mesh {
            primitives,
            weights: None,
            name: mesh.name.clone(),
            extensions: Default::default(),
            extras: Default::default(),
        })
    }

    fn push_accessor(
        &mut self,
        bytes: Vec<u8>,
        count: usize,
        component: json::accessor::ComponentType,
        type_: json::accessor::Type,
        target: json::buffer::Target,
        bounds: Option<(Vec<f32>, Vec<f32>)>,
    ) -> json::Index<json::Accessor> {
        let bv = self.push_view(&bytes, Some(target));
        let (min, max) = match bounds {
            Some((min, max)) => (Some(json::Value::from(min)), Some(json::Value::from(max))),
            None => (None, None),
        };
        self.root.push(json::Accessor {
            buffer_view: Some(bv),
            byte_offset: Some(USize64(0)),
            count: USize64::from(count),
            component_type: Valid(json::accessor::GenericComponentType(component)),
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

    fn push_view(
        &mut self,
        bytes: &[u8],
        target: Option<json::buffer::Target>,
    ) -> json::Index<json::buffer::View> {
        let byte_offset = self.bin.len();
        self.bin.extend_from_slice(bytes);
        pad_to_4(&mut self.bin);

        self.root.push(json::buffer::View {
            buffer: json::Index::new(0),
            byte_length: USize64::from(bytes.len()),
            byte_offset: Some(USize64::from(byte_offset)),
            byte_stride: None,
            target: target.map(Valid),
            name: None,
            extensions: Default::default(),
            extras: Default::default(),
        })
    }

    fn material(&mut self, mat: &Material) -> json::Index<json::Material> {
        if let Some(index) = self.materials.get(&mat.uid()) {
            return *index;
        }

        let base_color_texture = mat
            .texture(TextureSlot::Map)
            .map(|tex| self.texture_info(tex));
        let metallic_roughness_texture = mat
            .texture(TextureSlot::Roughness)
            .or_else(|| mat.texture(TextureSlot::Metalness))
            .map(|tex| self.texture_info(tex));
        let emissive_texture = mat
            .texture(TextureSlot::Emissive)
            .map(|tex| self.texture_info(tex));
        let normal_texture = mat.texture(TextureSlot::Normal).map(|tex| {
            json::material::NormalTexture {
                index: self.texture(tex),
                scale: 1.0,
                tex_coord: tex.tex_coord,
                extensions: Default::default(),
                extras: Default::default(),
            }
        });
        let occlusion_texture = mat.texture(TextureSlot::Ao).map(|tex| {
            json::material::OcclusionTexture {
                index: self.texture(tex),
                strength: json::material::StrengthFactor(1.0),
                tex_coord: tex.tex_coord,
                extensions: Default::default(),
                extras: Default::default(),
            }
        });

        for slot in mat.textures.keys() {
            if matches!(
                slot,
                TextureSlot::Bump
                    | TextureSlot::Displacement
                    | TextureSlot::Alpha
                    | TextureSlot::Light
                    | TextureSlot::Environment
                    | TextureSlot::Specular
            ) {
                trace!("{:?}: {} has no glTF slot, skipped", mat.name, slot.as_str());
            }
        }

        let index = self.root.push(json::Material {
            name: (!mat.name.is_empty()).then(|| mat.name.clone()),
            pbr_metallic_roughness: json::material::PbrMetallicRoughness {
                base_color_factor: json::material::PbrBaseColorFactor(mat.color),
                base_color_texture,
                metallic_factor: json::material::StrengthFactor(mat.metalness),
                roughness_factor: json::material::StrengthFactor(mat.roughness),
                metallic_roughness_texture,
                ..Default::default()
            },
            normal_texture,
            occlusion_texture,
            emissive_texture,
            ..Default::default()
        });
        self.materials.insert(mat.uid(), index);
        index
    }

    fn texture_info(&mut self, tex: &Texture) -> json::texture::Info {
        let extensions = (!tex.uv_transform.is_identity()).then(|| {
            self.uses_texture_transform = true;
            let t = tex.uv_transform;
            json::extensions::texture::Info {
                texture_transform: Some(json::extensions::texture::TextureTransform {
                    offset: json::extensions::texture::TextureTransformOffset(t.offset),
                    rotation: json::extensions::texture::TextureTransformRotation(t.rotation),
                    scale: json::extensions::texture::TextureTransformScale(t.scale),
                    tex_coord: Some(tex.tex_coord),
                    extras: Default::default(),
                }),
                ..Default::default()
            }
        });

        json::texture::Info {
            index: self.texture(tex),
            tex_coord: tex.tex_coord,
            extensions,
            extras: Default::default(),
        }
    }

    fn texture(&mut self, tex: &Texture) -> json::Index<json::Texture> {
        if let Some(index) = self.textures.get(&tex.uid()) {
            return *index;
        }

        let image = match &tex.source {
            TextureSource::Uri(uri) => json::Image {
                buffer_view: None,
                mime_type: None,
                uri: Some(uri.clone()),
                name: None,
                extensions: Default::default(),
                extras: Default::default(),
            },
            TextureSource::Embedded { mime_type, data } => json::Image {
                buffer_view: Some(self.push_view(data, None)),
                mime_type: Some(json::image::MimeType(mime_type.clone())),
                uri: None,
                name: None,
                extensions: Default::default(),
                extras: Default::default(),
            },
        };
        let image = self.root.push(image);
        let sampler = self.sampler();

        let index = self.root.push(json::Texture {
            source: image,
            sampler: Some(sampler),
            name: None,
            extensions: Default::default(),
            extras: Default::default(),
        });
        self.textures.insert(tex.uid(), index);
        index
    }

    fn sampler(&mut self) -> json::Index<json::texture::Sampler> {
        if let Some(sampler) = self.sampler {
            return sampler;
        }
        let sampler = self.root.push(json::texture::Sampler {
            mag_filter: Some(Valid(json::texture::MagFilter::Linear)),
            min_filter: Some(Valid(json::texture::MinFilter::LinearMipmapLinear)),
            wrap_s: Valid(json::texture::WrappingMode::Repeat),
            wrap_t: Valid(json::texture::WrappingMode::Repeat),
            name: None,
            extensions: Default::default(),
            extras: Default::default(),
        });
        self.sampler = Some(sampler);
        sampler
    }
}

fn floats<'a>(values: impl Iterator<Item = &'a f32>) -> Vec<u8> {
    values.flat_map(|v| v.to_le_bytes()).collect()
}

fn pad_to_4(data: &mut Vec<u8>) {
    while data.len() % 4 != 0 {
        data.push(0);
    }
}
