pub mod content;
mod fallback;
mod generator;
mod normalize;

pub use fallback::fallback_content;
pub use generator::{GenerationRequest, InterpretationGenerator, LlmGenerator};
pub use normalize::{content_title, detect_shape, normalize_content, ContentShape};
