//! Relay endpoint: accepts a policy question with both reference tables,
//! asks the generation API once and returns its text.

pub mod error;
pub mod generator;
pub mod routes;

pub use error::RelayError;
pub use generator::{GeminiGenerator, GenerateRequest, Generator};
pub use routes::{router, RelayState};
