/// Conversation routing and history - Gateway

mod classifier;
mod controller;
mod history;
mod message;
mod router;
mod transcript;

pub use classifier::{ClassificationLabel, TaskClassifier};
pub use controller::{ConversationController, ConversationMode, TurnPhase, TurnReport};
pub use history::HistoryBuffer;
pub use message::{Message, MessageRole};
pub use router::{Route, RouteTargets, Router, TargetRole};
pub use transcript::{Transcript, TranscriptEntry, TranscriptStore};
