use std::sync::Arc;

use gproxy_provider_core::ProviderRegistry;

use crate::providers::geminicli::GeminiCliProvider;

/// Registers every built-in `UpstreamProvider` this gateway ships with.
pub fn register_builtin_providers(registry: &mut ProviderRegistry) {
    registry.register(Arc::new(GeminiCliProvider::new()));
}
