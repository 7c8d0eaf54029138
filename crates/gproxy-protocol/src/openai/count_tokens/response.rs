use super::types::InputTokenCount;

/// OpenAI's `/v1/responses` input-token-count endpoint returns the count
/// object directly as the response body (no wrapping envelope).
pub type InputTokenCountResponse = InputTokenCount;
