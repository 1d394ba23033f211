pub mod module;

pub use module::{ModuleConfig, StrengthConfig, StrengthPreset, StrengthRules, USERNAME_PATTERN};
