#[cfg(feature = "models")]
pub mod glb;
