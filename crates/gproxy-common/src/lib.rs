use std::sync::OnceLock;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum GlobalConfigError {
    #[error("missing required global config field: {0}")]
    MissingField(&'static str),
}

/// How thinking/reasoning content is surfaced on the OpenAI-chat-completions
/// shape, which has no single agreed-upon field for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThinkingStyle {
    /// Inline in `content`, the way the vendor's own CLI clients render it.
    #[default]
    Tags,
    /// Only on the dedicated `reasoning_content` delta/field.
    ReasoningContent,
    /// Both: `reasoning_content` populated and also echoed inline.
    Both,
}

impl ThinkingStyle {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "tags" => Some(Self::Tags),
            "reasoning_content" => Some(Self::ReasoningContent),
            "both" => Some(Self::Both),
            _ => None,
        }
    }

    pub fn emits_tags(self) -> bool {
        matches!(self, Self::Tags | Self::Both)
    }

    pub fn emits_reasoning_content(self) -> bool {
        matches!(self, Self::ReasoningContent | Self::Both)
    }
}

/// Process-wide knobs that are semantics, not per-request config: retry
/// counts/backoff, capacity cooldown bounds, per-account concurrency,
/// request deadline, thinking-output rendering, and debug capture. Parsed
/// once at startup (CLI > ENV, same precedence as `GlobalConfig`) and read
/// from anywhere via `RuntimeLimits::global()`.
#[derive(Debug, Clone)]
pub struct RuntimeLimits {
    /// Upper bound on cross-account retry attempts for one inbound call.
    pub max_upstream_retries: u32,
    pub retry_base_delay: Duration,
    pub capacity_cooldown_base: Duration,
    pub capacity_cooldown_max: Duration,
    /// Max concurrent in-flight calls per credential. `0` = unlimited.
    pub account_concurrency_cap: u32,
    /// Wall-clock budget for one inbound call, start to finish. `None` = no deadline.
    pub request_deadline: Option<Duration>,
    /// Diagnostics escape hatch: when set, concurrency caps and cooldowns are
    /// bypassed entirely (retries/backoff still apply).
    pub disable_local_limits: bool,
    pub thinking_style: ThinkingStyle,
    /// When set, raw upstream request bodies and SSE frames are appended to
    /// files under this directory for offline inspection.
    pub debug_capture_dir: Option<String>,
}

impl Default for RuntimeLimits {
    fn default() -> Self {
        Self {
            max_upstream_retries: 6,
            retry_base_delay: Duration::from_millis(200),
            capacity_cooldown_base: Duration::from_secs(5),
            capacity_cooldown_max: Duration::from_secs(10 * 60),
            account_concurrency_cap: 0,
            request_deadline: None,
            disable_local_limits: false,
            thinking_style: ThinkingStyle::Tags,
            debug_capture_dir: None,
        }
    }
}

static RUNTIME_LIMITS: OnceLock<RuntimeLimits> = OnceLock::new();

impl RuntimeLimits {
    /// Installs the process-wide limits. Only the first call takes effect;
    /// later calls (e.g. in tests that don't bootstrap) are no-ops.
    pub fn install(limits: RuntimeLimits) {
        let _ = RUNTIME_LIMITS.set(limits);
    }

    pub fn global() -> &'static RuntimeLimits {
        RUNTIME_LIMITS.get_or_init(RuntimeLimits::default)
    }

    /// `0` (unlimited) whenever local limits are switched off for diagnostics.
    pub fn effective_account_concurrency_cap(&self) -> u32 {
        if self.disable_local_limits {
            0
        } else {
            self.account_concurrency_cap
        }
    }
}

/// Final, merged global configuration used by the running process.
///
/// Merge order (after DB connection): CLI > ENV > DB, then persist back to DB.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    pub host: String,
    pub port: u16,
    /// Stored as a hash (not plaintext).
    pub admin_key_hash: String,
    /// Optional outbound proxy (for upstream egress).
    pub proxy: Option<String>,
    /// Database DSN used for this process.
    pub dsn: String,
    /// Whether to redact sensitive fields in emitted events.
    pub event_redact_sensitive: bool,
}

/// Optional layer used for merging global config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalConfigPatch {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub admin_key_hash: Option<String>,
    pub proxy: Option<String>,
    pub dsn: Option<String>,
    pub event_redact_sensitive: Option<bool>,
}

impl GlobalConfigPatch {
    pub fn overlay(&mut self, other: GlobalConfigPatch) {
        if other.host.is_some() {
            self.host = other.host;
        }
        if other.port.is_some() {
            self.port = other.port;
        }
        if other.admin_key_hash.is_some() {
            self.admin_key_hash = other.admin_key_hash;
        }
        if other.proxy.is_some() {
            self.proxy = other.proxy;
        }
        if other.dsn.is_some() {
            self.dsn = other.dsn;
        }
        if other.event_redact_sensitive.is_some() {
            self.event_redact_sensitive = other.event_redact_sensitive;
        }
    }

    pub fn into_config(self) -> Result<GlobalConfig, GlobalConfigError> {
        Ok(GlobalConfig {
            host: self.host.unwrap_or_else(|| "0.0.0.0".to_string()),
            port: self.port.unwrap_or(8787),
            admin_key_hash: self
                .admin_key_hash
                .ok_or(GlobalConfigError::MissingField("admin_key_hash"))?,
            proxy: self.proxy,
            dsn: self.dsn.ok_or(GlobalConfigError::MissingField("dsn"))?,
            event_redact_sensitive: self.event_redact_sensitive.unwrap_or(true),
        })
    }
}

impl From<GlobalConfig> for GlobalConfigPatch {
    fn from(value: GlobalConfig) -> Self {
        Self {
            host: Some(value.host),
            port: Some(value.port),
            admin_key_hash: Some(value.admin_key_hash),
            proxy: value.proxy,
            dsn: Some(value.dsn),
            event_redact_sensitive: Some(value.event_redact_sensitive),
        }
    }
}
