mod chat;
mod decomposer;
mod guardrail;
mod history;

pub use chat::*;
pub use decomposer::*;
pub use guardrail::*;
pub use history::*;
