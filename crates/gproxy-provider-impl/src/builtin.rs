//! The provider rows bootstrap seeds into storage on first run.

use serde_json::{Value as JsonValue, json};

pub struct BuiltinProviderSeed {
    pub name: &'static str,
    pub config_json: JsonValue,
    pub enabled: bool,
}

pub fn builtin_provider_seeds() -> Vec<BuiltinProviderSeed> {
    vec![BuiltinProviderSeed {
        name: "geminicli",
        config_json: json!({ "kind": "geminicli", "channel_settings": {} }),
        enabled: true,
    }]
}
