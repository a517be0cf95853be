use std::sync::LazyLock;

use regex::Regex;

/// Auto-generated material names: `Material`, `Material_3`, `Material.001`,
/// `GLTF_Material_7`, and the Russian-locale `Материал` variants.
static PLACEHOLDER_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(gltf_)?(material|материал)([ ._-]?\d+)?$")
        .expect("placeholder pattern is a valid regex")
});

/// Marker that flags a material as meant for single-material parts.
pub const SINGLE_MARKER: &str = "SINGLE";

/// Whether `name` is an auto-generated placeholder rather than a material a
/// user would want to pick.
pub fn is_placeholder_name(name: &str) -> bool {
    let trimmed = name.trim();
    trimmed.is_empty() || PLACEHOLDER_NAME.is_match(trimmed)
}

pub fn is_single_marked(name: &str) -> bool {
    name.contains(SINGLE_MARKER)
}
