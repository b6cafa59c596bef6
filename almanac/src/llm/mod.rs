mod api;
mod credentials;
pub mod prompts;
mod provider;

pub use api::LlmApiClient;
pub(crate) use api::strip_code_fence;
pub use credentials::CredentialCache;
pub use provider::{CompletionOptions, LlmBackend, LlmProvider};
