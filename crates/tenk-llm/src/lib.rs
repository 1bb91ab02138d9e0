pub mod mock;
pub mod ollama;
pub mod reliable;

pub use mock::{MockLlm, MockReply};
pub use ollama::OllamaClient;
pub use reliable::{ReliableConfig, ReliableLlm};
