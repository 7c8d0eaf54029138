use gproxy_provider_core::credential::GeminiCliCredential;
use gproxy_provider_core::{Credential, HttpMethod, ProviderConfig, UpstreamCtx, header_get};

use gproxy_provider_core::config::GeminiCliConfig;

use gproxy_provider_impl::register_builtin_providers;

#[tokio::test]
async fn geminicli_upstream_usage_request_shape() {
    let mut reg = gproxy_provider_core::ProviderRegistry::new();
    register_builtin_providers(&mut reg);
    let provider = reg.get("geminicli").unwrap();

    let config = ProviderConfig::GeminiCli(GeminiCliConfig {
        base_url: Some("https://cloudcode-pa.googleapis.com".to_string()),
        oauth_auth_url: None,
        oauth_token_url: None,
    });
    let cred = Credential::GeminiCli(GeminiCliCredential {
        access_token: "t".to_string(),
        refresh_token: "rtok".to_string(),
        expires_at: 0,
        project_id: "proj".to_string(),
        client_id: "cid".to_string(),
        client_secret: "csecret".to_string(),
        user_email: None,
    });

    let ctx = UpstreamCtx {
        trace_id: None,
        user_id: None,
        user_key_id: None,
        user_agent: None,
        outbound_proxy: None,
        provider: "geminicli".to_string(),
        credential_id: Some(1),
        op: gproxy_provider_core::Op::GenerateContent,
        internal: true,
        attempt_no: 0,
    };

    let req = provider
        .build_upstream_usage(&ctx, &config, &cred)
        .await
        .unwrap();
    assert_eq!(req.method, HttpMethod::Post);
    assert_eq!(
        req.url,
        "https://cloudcode-pa.googleapis.com/v1internal:retrieveUserQuota"
    );
    assert_eq!(header_get(&req.headers, "authorization"), Some("Bearer t"));
    assert_eq!(
        header_get(&req.headers, "content-type"),
        Some("application/json")
    );
    assert!(req.body.is_some());
}
