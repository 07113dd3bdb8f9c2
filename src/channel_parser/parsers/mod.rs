pub mod chatml;
pub mod harmony;
pub mod kimi;

pub use chatml::ChatMlParser;
pub use harmony::HarmonyParser;
pub use kimi::KimiParser;
