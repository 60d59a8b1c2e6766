// Retrieval-augmented chat
// Context retrieval, prompt assembly, streamed replies and the interactive loop

pub mod conversation;
pub mod responder;
pub mod retriever;
pub mod session;

pub use conversation::{ChatMessage, Conversation, Role, build_user_prompt};
pub use responder::StreamingResponder;
pub use retriever::ContextRetriever;
pub use session::{ChatSession, InputAction, InputLines, classify_input, spawn_line_reader};
