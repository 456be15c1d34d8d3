//! Ambient stack shared by every engine crate: typed configuration and
//! the static model preset table the Router consults (§4.11).

pub mod config;
pub mod model_presets;

pub use config::ForgeConfig;
pub use model_presets::{builtin_model_presets, preset_by_id, ModelPreset};
