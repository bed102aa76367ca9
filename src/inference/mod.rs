// Gateway module for inference - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod traits;
mod types;
mod watsonx;

// Public re-exports - the ONLY way to access inference functionality
pub use traits::InferenceEndpoint;
#[cfg(test)]
pub use traits::MockInferenceEndpoint;
pub use types::{single_variable, PromptVariables};
pub use watsonx::WatsonxEndpoint;
