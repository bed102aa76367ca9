pub mod app;
pub mod cli;
pub mod constants;
pub mod inference;
pub mod runtime;
pub mod session;
pub mod utils;

pub use app::{load_config, Config};
pub use inference::{InferenceEndpoint, WatsonxEndpoint};
pub use session::{ClassificationLabel, ConversationController, HistoryBuffer, Router};
pub use utils::RouterError;
