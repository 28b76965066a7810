use futures::future::BoxFuture;

use crate::error::Result;

/// Retrieval collaborator. Returns the passages most related to a query.
pub trait Retriever: Send + Sync + 'static {
    /// Return up to `top_k` passages, best match first.
    fn query(&self, text: &str, top_k: usize) -> BoxFuture<'_, Result<Vec<String>>>;
}

/// Generation collaborator: single-shot text completion.
pub trait Generator: Send + Sync + 'static {
    /// Complete `user_prompt` under `system_prompt` and return the answer text.
    fn complete(&self, system_prompt: &str, user_prompt: &str) -> BoxFuture<'_, Result<String>>;

    /// Whether a credential is provisioned. When false the engine never calls `complete`.
    fn is_configured(&self) -> bool {
        true
    }
}
