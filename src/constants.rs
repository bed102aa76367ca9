/// Constants module to avoid magic numbers in the codebase

// Chat History
/// Eviction fires when the buffer already holds more than this many messages,
/// so the steady-state window is one message larger.
pub const HISTORY_EVICTION_THRESHOLD: usize = 10;

// Task Labels (as emitted by the classification prompt)
pub const TASK_GENERIC: &str = "generic";
pub const TASK_PROGRAMMING: &str = "programming";

// Prompt Variable Keys
pub const DEFAULT_CLASSIFICATION_VARIABLE: &str = "question";
pub const DEFAULT_QUESTION_VARIABLE: &str = "question";
pub const DEFAULT_PROGRAMMING_VARIABLE: &str = "task";

// Network Configuration
pub const DEFAULT_WATSONX_URL: &str = "https://us-south.ml.cloud.ibm.com";
pub const DEFAULT_IAM_URL: &str = "https://iam.cloud.ibm.com/identity/token";
pub const DEFAULT_API_VERSION: &str = "2023-05-29";
pub const IAM_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";

// Timeouts
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const HEALTH_CHECK_TIMEOUT_SECS: u64 = 5;
/// Refresh the IAM token this long before it actually expires
pub const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

// UI
pub const ASSISTANT_GREETING: &str = "I am a technical AI assistant powered by watsonx.";
pub const TRANSCRIPT_TITLE_PREVIEW_CHARS: usize = 60;
