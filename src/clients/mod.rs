pub mod llm_client;
pub mod mock_llm_client;

pub use llm_client::{ChatBackend, ChatReply, ChatRequest, OpenAiClient};
pub use mock_llm_client::ScriptedLlmClient;
