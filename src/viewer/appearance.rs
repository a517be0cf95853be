//! Whole-model appearance overrides used for OBJ models, which carry no
//! meaningful material groups of their own: one color, or one texture in the
//! base color slot, applied to every mesh.

#[cfg(feature = "models")]
use std::path::Path;
#[cfg(feature = "models")]
use std::sync::Arc;

use tracing::debug;

use crate::error::{ErrorKind, IResult};
use crate::scene::material::WHITE;
use crate::scene::{Material, MaterialBinding, Rgba, Scene, Texture, TextureSlot, TextureSource};

pub const DEFAULT_COLOR: &str = "#888888";
pub const OVERRIDE_ROUGHNESS: f32 = 0.8;
pub const OVERRIDE_METALNESS: f32 = 0.2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PresetColor {
    pub name: &'static str,
    pub hex: &'static str,
}

const fn preset(name: &'static str, hex: &'static str) -> PresetColor {
    PresetColor { name, hex }
}

pub const PRESET_COLORS: [PresetColor; 19] = [
    preset("White", "#FFFFFF"),
    preset("Black", "#000000"),
    preset("Red", "#FF0000"),
    preset("Navy", "#000080"),
    preset("Dark green", "#006400"),
    preset("Yellow", "#FFFF00"),
    preset("Brown", "#8B4513"),
    preset("Pink", "#FF69B4"),
    preset("Orange", "#FFA500"),
    preset("Purple", "#800080"),
    preset("Sky blue", "#00BFFF"),
    preset("Lime", "#32CD32"),
    preset("Gold", "#FFD700"),
    preset("Silver", "#C0C0C0"),
    preset("Burgundy", "#800020"),
    preset("Turquoise", "#40E0D0"),
    preset("Lavender", "#E6E6FA"),
    preset("Coral", "#FF7F50"),
    preset("Mint", "#98FB98"),
];

pub const PRESET_TEXTURES: [&str; 5] = [
    "/textures/wood.svg",
    "/textures/metal.svg",
    "/textures/stone.svg",
    "/textures/fabric.svg",
    "/textures/leather.svg",
];

/// Parse `#RGB` or `#RRGGBB` (the `#` is optional) into linear RGBA.
pub fn parse_hex_color(value: &str) -> IResult<Rgba> {
    let invalid = || ErrorKind::InvalidColor {
        value: value.to_string(),
    };
    let digits = value.trim().trim_start_matches('#');
    if !digits.is_ascii() {
        return Err(invalid().into());
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());

    let (r, g, b) = match digits.len() {
        3 => {
            let expand = |i: usize| channel(&digits[i..i + 1]).map(|c| c * 17);
            (expand(0)?, expand(1)?, expand(2)?)
        }
        6 => (
            channel(&digits[0..2])?,
            channel(&digits[2..4])?,
            channel(&digits[4..6])?,
        ),
        _ => return Err(invalid().into()),
    };
    Ok([srgb_to_linear(r), srgb_to_linear(g), srgb_to_linear(b), 1.0])
}

fn srgb_to_linear(c: u8) -> f32 {
    let c = c as f32 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Next entry after `current`, wrapping. A `current` that is not one of the
/// presets starts over at the first entry.
pub fn next_preset<'a, T: PartialEq + ?Sized>(presets: &[&'a T], current: Option<&T>) -> &'a T {
    step_preset(presets, current, 1)
}

/// Entry before `current`, wrapping. Non-preset `current` values yield the
/// first entry.
pub fn previous_preset<'a, T: PartialEq + ?Sized>(
    presets: &[&'a T],
    current: Option<&T>,
) -> &'a T {
    step_preset(presets, current, presets.len() - 1)
}

fn step_preset<'a, T: PartialEq + ?Sized>(
    presets: &[&'a T],
    current: Option<&T>,
    offset: usize,
) -> &'a T {
    let position = current.and_then(|c| presets.iter().position(|p| *p == c));
    match position {
        Some(index) => presets[(index + offset) % presets.len()],
        None => presets[0],
    }
}

pub fn next_texture(current: Option<&str>) -> &'static str {
    next_preset(&PRESET_TEXTURES[..], current)
}

pub fn previous_texture(current: Option<&str>) -> &'static str {
    previous_preset(&PRESET_TEXTURES[..], current)
}

/// The override currently in effect for a model.
#[derive(Clone, Debug, PartialEq)]
pub enum Appearance {
    /// Hex color string.
    Color(String),
    /// Texture drawn in the base color slot.
    Texture(TextureSource),
}

impl Default for Appearance {
    fn default() -> Self {
        Appearance::Color(DEFAULT_COLOR.to_string())
    }
}

impl Appearance {
    pub fn color(&self) -> Option<&str> {
        match self {
            Appearance::Color(hex) => Some(hex),
            Appearance::Texture(_) => None,
        }
    }

    pub fn texture_uri(&self) -> Option<&str> {
        match self {
            Appearance::Texture(TextureSource::Uri(uri)) => Some(uri),
            _ => None,
        }
    }

    /// Build the material every mesh is drawn with.
    pub fn to_material(&self) -> IResult<Material> {
        let material = match self {
            Appearance::Color(hex) => Material::builder()
                .name(format!("override {hex}"))
                .color(parse_hex_color(hex)?)
                .roughness(OVERRIDE_ROUGHNESS)
                .metalness(OVERRIDE_METALNESS)
                .build(),
            Appearance::Texture(source) => {
                let mut material = Material::builder()
                    .name("override texture")
                    .color(WHITE)
                    .roughness(OVERRIDE_ROUGHNESS)
                    .metalness(OVERRIDE_METALNESS)
                    .build();
                material.set_texture(TextureSlot::Map, Texture::new(source.clone()));
                material
            }
        };
        Ok(material)
    }
}

/// Read an image file into an embedded texture source, sniffing its format
/// from the content.
#[cfg(feature = "models")]
pub fn load_texture_file(path: &Path) -> IResult<TextureSource> {
    let data = std::fs::read(path)?;
    let format = image::guess_format(&data).map_err(|_| ErrorKind::UnsupportedFormat {
        path: path.display().to_string(),
    })?;
    Ok(TextureSource::Embedded {
        mime_type: format.to_mime_type().to_string(),
        data: Arc::from(data),
    })
}

/// Bind a fresh copy of `material` to every mesh in `scene`. Returns the new
/// render version.
pub fn apply_appearance(scene: &mut Scene, material: &Material) -> u64 {
    for mesh in scene.meshes_mut() {
        let mut copy = material.duplicate();
        copy.mark_needs_update();
        mesh.material = MaterialBinding::Single(copy);
        for group in &mut mesh.geometry.groups {
            group.material_index = 0;
        }
    }
    debug!("applied appearance {:?} to every mesh", material.name);
    scene.invalidate()
}
