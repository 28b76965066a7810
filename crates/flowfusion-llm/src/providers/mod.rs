pub mod openai;
pub mod presets;

pub use openai::OpenAiGenerator;
pub use presets::{get_preset, ProviderPreset};
