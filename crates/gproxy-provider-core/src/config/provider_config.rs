use serde::{Deserialize, Serialize};

/// Channel-specific settings for the single vendor this gateway fronts.
/// Kept as a single-variant enum (rather than a bare struct) so the
/// `providers.config_json` column's on-disk shape stays `{"kind":"geminicli",...}`
/// even though only one channel exists today.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "channel_settings", rename_all = "lowercase")]
pub enum ProviderConfig {
    GeminiCli(GeminiCliConfig),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeminiCliConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oauth_auth_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oauth_token_url: Option<String>,
}
