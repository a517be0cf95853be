//! Materials and the texture slots they reference.
//!
//! Every [`Material`] and [`Texture`] carries a process-unique id so that
//! clones made for substitution can be told apart from the instance they were
//! copied from, and a generation counter that a renderer compares against its
//! last upload to know when GPU state must be refreshed.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bon::Builder;

static NEXT_MATERIAL_UID: AtomicU64 = AtomicU64::new(1);
static NEXT_TEXTURE_UID: AtomicU64 = AtomicU64::new(1);

/// Identity of one material instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MaterialUid(u64);

impl MaterialUid {
    pub fn next() -> Self {
        Self(NEXT_MATERIAL_UID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Identity of one texture instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextureUid(u64);

impl TextureUid {
    pub fn next() -> Self {
        Self(NEXT_TEXTURE_UID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Linear RGBA color.
pub type Rgba = [f32; 4];

pub const WHITE: Rgba = [1.0, 1.0, 1.0, 1.0];

/// Texture slots a material may populate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TextureSlot {
    /// Diffuse / base color.
    Map,
    Normal,
    Roughness,
    Metalness,
    Ao,
    Emissive,
    Bump,
    Displacement,
    Alpha,
    Light,
    Environment,
    Specular,
}

impl TextureSlot {
    pub const ALL: [TextureSlot; 12] = [
        TextureSlot::Map,
        TextureSlot::Normal,
        TextureSlot::Roughness,
        TextureSlot::Metalness,
        TextureSlot::Ao,
        TextureSlot::Emissive,
        TextureSlot::Bump,
        TextureSlot::Displacement,
        TextureSlot::Alpha,
        TextureSlot::Light,
        TextureSlot::Environment,
        TextureSlot::Specular,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TextureSlot::Map => "map",
            TextureSlot::Normal => "normalMap",
            TextureSlot::Roughness => "roughnessMap",
            TextureSlot::Metalness => "metalnessMap",
            TextureSlot::Ao => "aoMap",
            TextureSlot::Emissive => "emissiveMap",
            TextureSlot::Bump => "bumpMap",
            TextureSlot::Displacement => "displacementMap",
            TextureSlot::Alpha => "alphaMap",
            TextureSlot::Light => "lightMap",
            TextureSlot::Environment => "envMap",
            TextureSlot::Specular => "specularMap",
        }
    }
}

/// Where a texture's image comes from.
#[derive(Clone, Debug, PartialEq)]
pub enum TextureSource {
    /// External file or data URI.
    Uri(String),
    /// Encoded image bytes (PNG, JPEG) held in memory.
    Embedded { mime_type: String, data: Arc<[u8]> },
}

/// UV offset/scale/rotation applied when sampling a texture.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UvTransform {
    pub offset: [f32; 2],
    pub scale: [f32; 2],
    pub rotation: f32,
}

impl Default for UvTransform {
    fn default() -> Self {
        Self {
            offset: [0.0, 0.0],
            scale: [1.0, 1.0],
            rotation: 0.0,
        }
    }
}

impl UvTransform {
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Clone, Debug)]
pub struct Texture {
    uid: TextureUid,
    pub source: TextureSource,
    pub uv_transform: UvTransform,
    pub tex_coord: u32,
    generation: u64,
}

impl Texture {
    pub fn new(source: TextureSource) -> Self {
        Self {
            uid: TextureUid::next(),
            source,
            uv_transform: UvTransform::default(),
            tex_coord: 0,
            generation: 0,
        }
    }

    pub fn uid(&self) -> TextureUid {
        self.uid
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Copy of this texture with its own identity, so UV state can diverge
    /// from the original.
    pub fn duplicate(&self) -> Self {
        Self {
            uid: TextureUid::next(),
            ..self.clone()
        }
    }

    pub fn mark_needs_update(&mut self) {
        self.generation += 1;
    }

    /// Same image and sampling parameters, regardless of identity.
    pub fn same_content(&self, other: &Texture) -> bool {
        self.source == other.source
            && self.uv_transform == other.uv_transform
            && self.tex_coord == other.tex_coord
    }
}

/// A named surface-appearance descriptor.
#[derive(Clone, Debug, Builder)]
pub struct Material {
    #[builder(skip = MaterialUid::next())]
    uid: MaterialUid,
    /// Index of the material in the document it was imported from.
    pub source_index: Option<usize>,
    #[builder(into, default)]
    pub name: String,
    #[builder(default = WHITE)]
    pub color: Rgba,
    #[builder(default = 1.0)]
    pub roughness: f32,
    #[builder(default = 0.0)]
    pub metalness: f32,
    #[builder(default)]
    pub textures: BTreeMap<TextureSlot, Texture>,
    #[builder(skip)]
    generation: u64,
}

impl Material {
    pub fn uid(&self) -> MaterialUid {
        self.uid
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn texture(&self, slot: TextureSlot) -> Option<&Texture> {
        self.textures.get(&slot)
    }

    pub fn set_texture(&mut self, slot: TextureSlot, texture: Texture) {
        self.textures.insert(slot, texture);
    }

    /// Deep copy: the material and every populated texture slot get fresh
    /// identities.
    pub fn duplicate(&self) -> Self {
        Self {
            uid: MaterialUid::next(),
            textures: self
                .textures
                .iter()
                .map(|(slot, tex)| (*slot, tex.duplicate()))
                .collect(),
            ..self.clone()
        }
    }

    /// Flag the material and all of its textures for re-upload.
    pub fn mark_needs_update(&mut self) {
        self.generation += 1;
        for tex in self.textures.values_mut() {
            tex.mark_needs_update();
        }
    }

    /// Observable equality: name, factors and texture content, ignoring
    /// identity and generations.
    pub fn same_content(&self, other: &Material) -> bool {
        self.name == other.name
            && self.color == other.color
            && self.roughness == other.roughness
            && self.metalness == other.metalness
            && self.textures.len() == other.textures.len()
            && self.textures.iter().all(|(slot, tex)| {
                other
                    .textures
                    .get(slot)
                    .is_some_and(|o| tex.same_content(o))
            })
    }
}
