/// Model catalog entries and catalog selection
pub mod catalog;
/// Viewer configuration file
pub mod config;
/// Error definitions
pub mod error;
/// Writing scenes back out as GLB
pub mod export;
/// Material classification, node/material collection, grouping and substitution
pub mod materials;
/// Engine-neutral scene graph and the GLB/OBJ importers that fill it
pub mod scene;
/// Per-model viewer state: sessions, animation clips, gestures, presets and statistics
pub mod viewer;
