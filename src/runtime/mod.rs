/// Runtime orchestrator module - Gateway

mod chat;
mod non_interactive;
mod orchestrator;

pub use chat::{run_chat, ChatCommand};
pub use non_interactive::{ExecutionMetadata, NonInteractiveResult, NonInteractiveRunner};
pub use orchestrator::Orchestrator;
