//! Per-model viewer state built on top of the scene and material modules.

pub mod animation;
pub mod appearance;
pub mod gesture;
pub mod input;
pub mod session;
pub mod statistics;

pub use animation::AnimationController;
pub use appearance::{Appearance, PRESET_COLORS, PRESET_TEXTURES, parse_hex_color};
pub use gesture::{Gesture, GestureAnimator, Rotation};
pub use input::{Swipe, SwipeDetector};
pub use session::ModelSession;
pub use statistics::ModelStatistics;
