use crate::error::LlmError;
use crate::types::{CompletionRequest, CompletionResponse};
use async_trait::async_trait;

/// A completion service. Implementations translate to and from one provider's wire format.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    fn provider_name(&self) -> &str;

    fn model_name(&self) -> &str;
}
