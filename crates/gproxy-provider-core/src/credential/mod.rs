mod model_unavailable_queue;
mod pool;
mod state;
mod unavailable_queue;

pub use pool::{AcquireError, CredentialPool, PoolStats};
pub use state::{CredentialId, CredentialState, UnavailableReason};

use serde::{Deserialize, Serialize};

/// The only credential shape this gateway pools: one OAuth-authenticated
/// vendor project. Kept as a single-variant enum (rather than a bare struct)
/// so the on-disk `secret_json` shape stays `{"GeminiCli": {...}}` and the
/// storage layer's generic credential CRUD needs no vendor-specific casing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Credential {
    GeminiCli(GeminiCliCredential),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiCliCredential {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
    pub project_id: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geminicli_round_trips_through_json() {
        let value = serde_json::json!({
            "GeminiCli": {
                "access_token": "at",
                "refresh_token": "rt",
                "expires_at": 0,
                "project_id": "proj",
                "client_id": "cid",
                "client_secret": "secret",
            }
        });
        let cred: Credential = serde_json::from_value(value).expect("credential should parse");
        match cred {
            Credential::GeminiCli(secret) => {
                assert_eq!(secret.access_token, "at");
                assert_eq!(secret.project_id, "proj");
            }
        }
    }
}
