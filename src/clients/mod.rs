pub mod completion;
pub mod openai;

pub use completion::{ChatTurn, Completion, CompletionClient, CompletionError, ModelInfo};
pub use openai::OpenAiClient;
