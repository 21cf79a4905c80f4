pub mod gemini;

pub use gemini::{GeminiClient, GenerationConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
