use std::collections::HashMap;

/// Named values substituted into a deployed prompt template
pub type PromptVariables = HashMap<String, String>;

/// Build the single-variable map every routed call sends
pub fn single_variable(key: impl Into<String>, value: impl Into<String>) -> PromptVariables {
    let mut variables = PromptVariables::with_capacity(1);
    variables.insert(key.into(), value.into());
    variables
}
