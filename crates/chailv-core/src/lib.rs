pub mod ai;
pub mod api;
pub mod config;
pub mod prompt;
pub mod relay_client;
pub mod state;
pub mod store;
pub mod tables;

// Re-export main types for convenience
pub use ai::{GeminiClient, GenerationConfig};
pub use api::{ChatRequest, ChatResponse, ErrorBody};
pub use config::Config;
pub use relay_client::RelayClient;
pub use state::{ChatMessage, ChatRole, ChatSession, Phase};
pub use store::TableStore;
pub use tables::{line_count, PolicyTables, TableKind};
