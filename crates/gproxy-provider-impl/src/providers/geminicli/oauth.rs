use std::collections::HashMap;
use std::sync::OnceLock;

use base64::Engine;
use rand::RngCore;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value as JsonValue, json};
use time::OffsetDateTime;

use gproxy_provider_core::{
    AuthRetryAction, Credential, OAuthCallbackRequest, OAuthCallbackResult, OAuthCredential,
    OAuthStartRequest, ProviderConfig, ProviderError, ProviderResult, Request, UpstreamBody,
    UpstreamCtx, UpstreamHttpResponse, header_set,
};

use super::{
    CLIENT_ID, CLIENT_SECRET, DEFAULT_AUTH_URL, DEFAULT_TOKEN_URL, GEMINICLI_USER_AGENT,
    OAUTH_SCOPE, OAUTH_STATE_TTL_SECS,
};
use crate::providers::oauth_common::{block_on, resolve_manual_code_and_state};

#[derive(Clone, Debug)]
struct OAuthState {
    redirect_uri: String,
    created_at: OffsetDateTime,
    base_url: Option<String>,
    project_id: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct OAuthStartQuery {
    redirect_uri: Option<String>,
    base_url: Option<String>,
    project_id: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct OAuthCallbackQuery {
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
    redirect_uri: Option<String>,
    base_url: Option<String>,
    project_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

static OAUTH_STATES: OnceLock<std::sync::Mutex<HashMap<String, OAuthState>>> = OnceLock::new();

pub(super) fn oauth_start(
    _ctx: &UpstreamCtx,
    config: &ProviderConfig,
    req: &OAuthStartRequest,
) -> ProviderResult<UpstreamHttpResponse> {
    let params: OAuthStartQuery = parse_query(req.query.as_deref())?;
    let redirect_uri = params.redirect_uri.unwrap_or_else(default_redirect_uri);
    let state_id = generate_state();
    let (auth_url, _) = oauth_endpoints(config);
    let auth_url = build_authorize_url(&auth_url, &redirect_uri, &state_id);

    let mut guard = oauth_states().lock().expect("oauth state lock poisoned");
    prune_oauth_states(&mut guard);
    guard.insert(
        state_id.clone(),
        OAuthState {
            redirect_uri: redirect_uri.clone(),
            created_at: OffsetDateTime::now_utc(),
            base_url: params.base_url,
            project_id: params.project_id,
        },
    );
    drop(guard);

    let body = json!({
        "auth_url": auth_url,
        "state": state_id,
        "redirect_uri": redirect_uri,
    });
    Ok(json_response(body))
}

pub(super) fn oauth_callback(
    _ctx: &UpstreamCtx,
    config: &ProviderConfig,
    req: &OAuthCallbackRequest,
) -> ProviderResult<OAuthCallbackResult> {
    let params: OAuthCallbackQuery = parse_query(req.query.as_deref())?;
    if let Some(error) = params.error.as_deref() {
        let detail = params.error_description.as_deref().unwrap_or("oauth error");
        return Err(ProviderError::Other(format!("{error}: {detail}")));
    }
    let (code, parsed_state) = resolve_manual_code_and_state(req.query.as_deref())
        .map_err(|msg| ProviderError::InvalidConfig(msg.to_string()))?;
    let state_key = params.state.clone().or(parsed_state);

    let (redirect_uri, base_url_hint, project_id_hint) = if let Some(state) = state_key.as_deref()
    {
        let mut guard = oauth_states().lock().expect("oauth state lock poisoned");
        prune_oauth_states(&mut guard);
        match guard.remove(state) {
            Some(entry) => (entry.redirect_uri, entry.base_url, entry.project_id),
            None => (
                params.redirect_uri.unwrap_or_else(default_redirect_uri),
                params.base_url,
                params.project_id,
            ),
        }
    } else {
        (
            params.redirect_uri.unwrap_or_else(default_redirect_uri),
            params.base_url,
            params.project_id,
        )
    };

    let (_, token_url) = oauth_endpoints(config);
    let tokens = block_on(exchange_code_for_tokens(&code, &redirect_uri, &token_url))?;
    let base_url = base_url_hint.unwrap_or_else(|| {
        super::geminicli_base_url(config)
            .unwrap_or(super::DEFAULT_BASE_URL)
            .to_string()
    });
    let project_id = match project_id_hint {
        Some(value) => value,
        None => block_on(detect_project_id(&tokens.access_token, &base_url))?.ok_or_else(|| {
            ProviderError::InvalidConfig("missing project_id (auto-detect failed)".to_string())
        })?,
    };

    let user_email = tokens.id_token.as_deref().and_then(parse_id_token_email);
    let expires_at = tokens
        .expires_in
        .map(|secs| OffsetDateTime::now_utc().unix_timestamp() + secs)
        .unwrap_or(0);
    let credential_name = user_email
        .clone()
        .map(|value| format!("geminicli:{value}"))
        .unwrap_or_else(|| format!("geminicli:{project_id}"));

    let credential = Credential::GeminiCli(gproxy_provider_core::credential::GeminiCliCredential {
        access_token: tokens.access_token.clone(),
        refresh_token: tokens.refresh_token.clone().unwrap_or_default(),
        expires_at,
        project_id: project_id.clone(),
        client_id: CLIENT_ID.to_string(),
        client_secret: CLIENT_SECRET.to_string(),
        user_email: user_email.clone(),
    });

    let body = json!({
        "access_token": tokens.access_token,
        "refresh_token": tokens.refresh_token,
        "project_id": project_id,
        "user_email": user_email,
    });
    Ok(OAuthCallbackResult {
        response: json_response(body),
        credential: Some(OAuthCredential {
            name: Some(credential_name),
            settings_json: None,
            credential,
        }),
    })
}

pub(super) async fn enrich_credential_profile_if_missing(
    _config: &ProviderConfig,
    credential: &Credential,
) -> ProviderResult<Option<Credential>> {
    let Credential::GeminiCli(cred) = credential else {
        return Ok(None);
    };
    if cred.user_email.is_some() {
        return Ok(None);
    }
    let Some(email) = fetch_userinfo_email(&cred.access_token).await? else {
        return Ok(None);
    };
    let mut updated = cred.clone();
    updated.user_email = Some(email);
    Ok(Some(Credential::GeminiCli(updated)))
}

pub(super) fn on_auth_failure<'a>(
    _ctx: &'a UpstreamCtx,
    config: &'a ProviderConfig,
    credential: &'a Credential,
    _req: &'a Request,
    failure: &'a gproxy_provider_core::provider::UpstreamFailure,
) -> std::pin::Pin<
    Box<dyn std::future::Future<Output = ProviderResult<AuthRetryAction>> + Send + 'a>,
> {
    Box::pin(async move {
        let gproxy_provider_core::provider::UpstreamFailure::Http { status, .. } = failure else {
            return Ok(AuthRetryAction::None);
        };
        if *status != 401 && *status != 403 {
            return Ok(AuthRetryAction::None);
        }
        let Credential::GeminiCli(cred) = credential else {
            return Ok(AuthRetryAction::None);
        };
        if cred.refresh_token.is_empty() {
            return Ok(AuthRetryAction::None);
        }
        let (_, token_url) = oauth_endpoints(config);
        let refreshed = refresh_access_token(&cred.refresh_token, &token_url).await?;
        let mut updated = cred.clone();
        updated.access_token = refreshed.access_token;
        if let Some(refresh_token) = refreshed.refresh_token {
            updated.refresh_token = refresh_token;
        }
        updated.expires_at = refreshed
            .expires_in
            .map(|secs| OffsetDateTime::now_utc().unix_timestamp() + secs)
            .unwrap_or(updated.expires_at);
        Ok(AuthRetryAction::UpdateCredential(Box::new(
            Credential::GeminiCli(updated),
        )))
    })
}

async fn refresh_access_token(
    refresh_token: &str,
    token_url: &str,
) -> ProviderResult<TokenResponse> {
    let client = wreq::Client::builder()
        .build()
        .map_err(|err| ProviderError::Other(err.to_string()))?;
    let form = [
        ("refresh_token", refresh_token),
        ("client_id", CLIENT_ID),
        ("client_secret", CLIENT_SECRET),
        ("grant_type", "refresh_token"),
    ];
    let response = client
        .post(token_url)
        .form(&form)
        .send()
        .await
        .map_err(|err| ProviderError::Other(err.to_string()))?;
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|err| ProviderError::Other(err.to_string()))?;
    if !status.is_success() {
        return Err(ProviderError::Other(format!(
            "token refresh failed: {status}"
        )));
    }
    serde_json::from_slice(&body).map_err(|err| ProviderError::Other(err.to_string()))
}

async fn fetch_userinfo_email(access_token: &str) -> ProviderResult<Option<String>> {
    let client = wreq::Client::builder()
        .build()
        .map_err(|err| ProviderError::Other(err.to_string()))?;
    let response = client
        .get("https://www.googleapis.com/oauth2/v2/userinfo")
        .header("Authorization", format!("Bearer {access_token}"))
        .send()
        .await
        .map_err(|err| ProviderError::Other(err.to_string()))?;
    if !response.status().is_success() {
        return Ok(None);
    }
    let body = response
        .bytes()
        .await
        .map_err(|err| ProviderError::Other(err.to_string()))?;
    let payload: JsonValue =
        serde_json::from_slice(&body).map_err(|err| ProviderError::Other(err.to_string()))?;
    Ok(payload
        .get("email")
        .and_then(|value| value.as_str())
        .map(|value| value.to_string()))
}

async fn exchange_code_for_tokens(
    code: &str,
    redirect_uri: &str,
    token_url: &str,
) -> ProviderResult<TokenResponse> {
    let client = wreq::Client::builder()
        .build()
        .map_err(|err| ProviderError::Other(err.to_string()))?;
    let form = [
        ("code", code),
        ("client_id", CLIENT_ID),
        ("client_secret", CLIENT_SECRET),
        ("redirect_uri", redirect_uri),
        ("grant_type", "authorization_code"),
    ];
    let response = client
        .post(token_url)
        .form(&form)
        .send()
        .await
        .map_err(|err| ProviderError::Other(err.to_string()))?;
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|err| ProviderError::Other(err.to_string()))?;
    if !status.is_success() {
        return Err(ProviderError::Other(format!(
            "token exchange failed: {status}"
        )));
    }
    serde_json::from_slice(&body).map_err(|err| ProviderError::Other(err.to_string()))
}

async fn detect_project_id(access_token: &str, base_url: &str) -> ProviderResult<Option<String>> {
    super::detect_project_id_async(access_token, base_url).await
}

fn oauth_endpoints(config: &ProviderConfig) -> (String, String) {
    match config {
        ProviderConfig::GeminiCli(cfg) => (
            cfg.oauth_auth_url
                .clone()
                .unwrap_or_else(|| DEFAULT_AUTH_URL.to_string()),
            cfg.oauth_token_url
                .clone()
                .unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
        ),
    }
}

fn build_authorize_url(auth_url: &str, redirect_uri: &str, state: &str) -> String {
    let scope = urlencoding::encode(OAUTH_SCOPE);
    let redirect_uri = urlencoding::encode(redirect_uri);
    format!(
        "{}?response_type=code&client_id={CLIENT_ID}&redirect_uri={redirect_uri}&scope={scope}&access_type=offline&prompt=consent&include_granted_scopes=true&state={state}",
        auth_url.trim_end_matches('/')
    )
}

fn generate_state() -> String {
    let mut bytes = [0u8; 32];
    let mut rng = rand::rng();
    rng.fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn parse_query<T: DeserializeOwned>(query: Option<&str>) -> ProviderResult<T> {
    let query = query.unwrap_or_default();
    serde_qs::from_str(query).map_err(|err| ProviderError::InvalidConfig(format!("invalid query: {err}")))
}

fn default_redirect_uri() -> String {
    "http://localhost:1455/auth/callback".to_string()
}

fn oauth_states() -> &'static std::sync::Mutex<HashMap<String, OAuthState>> {
    OAUTH_STATES.get_or_init(|| std::sync::Mutex::new(HashMap::new()))
}

fn prune_oauth_states(states: &mut HashMap<String, OAuthState>) {
    let now = OffsetDateTime::now_utc();
    states.retain(|_, state| (now - state.created_at).whole_seconds() < OAUTH_STATE_TTL_SECS as i64);
}

fn json_response(body: JsonValue) -> UpstreamHttpResponse {
    let bytes = serde_json::to_vec(&body).unwrap_or_default();
    let mut headers = Vec::new();
    header_set(&mut headers, "content-type", "application/json");
    UpstreamHttpResponse {
        status: 200,
        headers,
        body: UpstreamBody::Bytes(bytes.into()),
    }
}

fn parse_id_token_email(id_token: &str) -> Option<String> {
    let mut parts = id_token.split('.');
    let (_h, payload_b64, _s) = match (parts.next(), parts.next(), parts.next()) {
        (Some(h), Some(p), Some(s)) if !h.is_empty() && !p.is_empty() && !s.is_empty() => {
            (h, p, s)
        }
        _ => return None,
    };
    let payload_bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .ok()?;
    let payload = serde_json::from_slice::<JsonValue>(&payload_bytes).ok()?;
    payload
        .get("email")
        .and_then(|value| value.as_str())
        .map(|value| value.to_string())
}
