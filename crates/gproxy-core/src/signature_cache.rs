//! Extended-thinking signature cache (see spec component C4).
//!
//! Claude's extended-thinking contract requires that every assistant message
//! containing a `tool_use` block begin with a `thinking`/`redacted_thinking`
//! block carrying a vendor-issued signature. Clients routinely drop these
//! blocks on replay (context trimming, third-party libraries that don't know
//! to preserve them). This cache lets the gateway reconstruct a valid leading
//! signature instead of forcing every such request down to `thinking:
//! disabled`.
//!
//! Five independently-keyed, independently-TTL'd maps, matching the five
//! signature kinds the translator needs:
//!
//! - [`SignatureKind::ClaudeThinkingPerToolUse`] and
//!   [`SignatureKind::ClaudeLastThinkingPerUser`] are mirrored to durable
//!   storage so a container restart doesn't force a downgrade.
//! - [`SignatureKind::ClaudeAssistantSignature`],
//!   [`SignatureKind::OpenAiToolThoughtSignature`] and
//!   [`SignatureKind::ClaudeToolThinking`] are in-memory only.
//!
//! Reads never block a writer and vice versa: each kind owns its own lock, and
//! writes are last-write-wins (no read-modify-write across kinds).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

/// Cap on live entries per kind before insertion-order eviction kicks in.
/// Mirrors how `CredentialPool`'s cooldown constants are plain consts rather
/// than config knobs; see `DESIGN.md` for the tradeoff.
const MAX_ENTRIES_PER_KIND: usize = 50_000;

const TTL_PERSISTED: Duration = Duration::from_secs(24 * 60 * 60);
const TTL_MEMORY: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureKind {
    /// `tool_use_id -> signature` (persisted).
    ClaudeThinkingPerToolUse,
    /// `user_id -> signature` (persisted); used when a turn produces a tool
    /// call without re-emitting a signature.
    ClaudeLastThinkingPerUser,
    /// `(user_id, stable-hash(content-without-thinking)) -> signature`
    /// (in-memory); used when the client strips thinking blocks entirely.
    ClaudeAssistantSignature,
    /// `tool_call_id -> signature` (in-memory); Gemini tool-calls relayed
    /// through the OpenAI protocol.
    OpenAiToolThoughtSignature,
    /// `tool_call_id -> {signature, thought_text}` (in-memory); Claude tools
    /// relayed through the OpenAI protocol.
    ClaudeToolThinking,
}

impl SignatureKind {
    pub const ALL: [SignatureKind; 5] = [
        SignatureKind::ClaudeThinkingPerToolUse,
        SignatureKind::ClaudeLastThinkingPerUser,
        SignatureKind::ClaudeAssistantSignature,
        SignatureKind::OpenAiToolThoughtSignature,
        SignatureKind::ClaudeToolThinking,
    ];

    pub fn is_persisted(self) -> bool {
        matches!(
            self,
            SignatureKind::ClaudeThinkingPerToolUse | SignatureKind::ClaudeLastThinkingPerUser
        )
    }

    fn ttl(self) -> Duration {
        if self.is_persisted() {
            TTL_PERSISTED
        } else {
            TTL_MEMORY
        }
    }

    /// Stable string stored in the `signature_cache.kind` column and used to
    /// reload rows at startup.
    pub fn as_str(self) -> &'static str {
        match self {
            SignatureKind::ClaudeThinkingPerToolUse => "claude_thinking_per_tool_use",
            SignatureKind::ClaudeLastThinkingPerUser => "claude_last_thinking_per_user",
            SignatureKind::ClaudeAssistantSignature => "claude_assistant_signature",
            SignatureKind::OpenAiToolThoughtSignature => "openai_tool_thought_signature",
            SignatureKind::ClaudeToolThinking => "claude_tool_thinking",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }
}

#[derive(Debug, Clone)]
struct Entry {
    signature: String,
    thought_text: Option<String>,
    saved_at: Instant,
    seq: u64,
}

/// A single kind's entries plus its own insertion-order eviction queue.
struct KindMap {
    entries: HashMap<String, Entry>,
    next_seq: u64,
}

impl KindMap {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            next_seq: 0,
        }
    }

    fn get(&self, key: &str, ttl: Duration) -> Option<(String, Option<String>)> {
        let entry = self.entries.get(key)?;
        if entry.saved_at.elapsed() > ttl {
            return None;
        }
        Some((entry.signature.clone(), entry.thought_text.clone()))
    }

    /// Returns true if this write changed the stored value (used to decide
    /// whether a persisted kind needs a storage write-through).
    fn insert(&mut self, key: String, signature: String, thought_text: Option<String>) -> bool {
        let seq = self.next_seq;
        self.next_seq += 1;

        let changed = self
            .entries
            .get(&key)
            .map(|existing| existing.signature != signature || existing.thought_text != thought_text)
            .unwrap_or(true);

        self.entries.insert(
            key,
            Entry {
                signature,
                thought_text,
                saved_at: Instant::now(),
                seq,
            },
        );

        if self.entries.len() > MAX_ENTRIES_PER_KIND {
            self.evict_oldest();
        }

        changed
    }

    fn evict_oldest(&mut self) {
        if let Some(oldest_key) = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.seq)
            .map(|(key, _)| key.clone())
        {
            self.entries.remove(&oldest_key);
        }
    }

    fn sweep_expired(&mut self, ttl: Duration) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.saved_at.elapsed() <= ttl);
        before - self.entries.len()
    }
}

/// Owns all five signature maps for the process. One instance lives on
/// [`crate::state::AppState`].
pub struct SignatureCaches {
    maps: [RwLock<KindMap>; 5],
}

impl SignatureCaches {
    pub fn new() -> Self {
        Self {
            maps: std::array::from_fn(|_| RwLock::new(KindMap::new())),
        }
    }

    fn index(kind: SignatureKind) -> usize {
        SignatureKind::ALL
            .iter()
            .position(|candidate| *candidate == kind)
            .expect("SignatureKind::ALL covers every variant")
    }

    pub async fn get(&self, kind: SignatureKind, key: &str) -> Option<(String, Option<String>)> {
        self.maps[Self::index(kind)].read().await.get(key, kind.ttl())
    }

    /// Inserts/overwrites an entry. Returns `true` when the process-local
    /// value changed, so callers can decide whether a persisted kind needs a
    /// storage write-through.
    pub async fn insert(
        &self,
        kind: SignatureKind,
        key: String,
        signature: String,
        thought_text: Option<String>,
    ) -> bool {
        self.maps[Self::index(kind)]
            .write()
            .await
            .insert(key, signature, thought_text)
    }

    /// Seeds a persisted kind from storage at startup. Does not report
    /// whether values changed (there is nothing to write back).
    pub async fn seed(&self, kind: SignatureKind, key: String, signature: String) {
        self.maps[Self::index(kind)]
            .write()
            .await
            .insert(key, signature, None);
    }

    /// Removes expired entries from every kind. Intended to run at most once
    /// every few minutes from a background task.
    pub async fn sweep(&self) -> usize {
        let mut removed = 0;
        for kind in SignatureKind::ALL {
            removed += self.maps[Self::index(kind)]
                .write()
                .await
                .sweep_expired(kind.ttl());
        }
        removed
    }
}

impl Default for SignatureCaches {
    fn default() -> Self {
        Self::new()
    }
}

/// Canonical-JSON content hash used by the `ClaudeAssistantSignature` kind:
/// two requests whose assistant content is byte-different but
/// semantically-identical-once-keys-are-sorted must hash the same way.
pub fn stable_hash(value: &serde_json::Value) -> String {
    let canonical = canonicalize(value);
    blake3::hash(canonical.as_bytes()).to_hex().to_string()
}

fn canonicalize(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Object(map) => {
            let mut entries: Vec<(&String, &serde_json::Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let body = entries
                .into_iter()
                .map(|(k, v)| format!("{}:{}", serde_json::to_string(k).unwrap_or_default(), canonicalize(v)))
                .collect::<Vec<_>>()
                .join(",");
            format!("{{{body}}}")
        }
        serde_json::Value::Array(items) => {
            let body = items.iter().map(canonicalize).collect::<Vec<_>>().join(",");
            format!("[{body}]")
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_then_get_round_trips() {
        let caches = SignatureCaches::new();
        assert!(
            caches
                .insert(
                    SignatureKind::ClaudeThinkingPerToolUse,
                    "toolu_1".to_string(),
                    "sig-a".to_string(),
                    None,
                )
                .await
        );
        let (signature, thought) = caches
            .get(SignatureKind::ClaudeThinkingPerToolUse, "toolu_1")
            .await
            .expect("entry should be present");
        assert_eq!(signature, "sig-a");
        assert!(thought.is_none());
    }

    #[tokio::test]
    async fn second_insert_reports_unchanged_when_identical() {
        let caches = SignatureCaches::new();
        caches
            .insert(
                SignatureKind::ClaudeLastThinkingPerUser,
                "user-1".to_string(),
                "sig-a".to_string(),
                None,
            )
            .await;
        let changed = caches
            .insert(
                SignatureKind::ClaudeLastThinkingPerUser,
                "user-1".to_string(),
                "sig-a".to_string(),
                None,
            )
            .await;
        assert!(!changed);
    }

    #[tokio::test]
    async fn unknown_key_misses() {
        let caches = SignatureCaches::new();
        assert!(
            caches
                .get(SignatureKind::ClaudeAssistantSignature, "missing")
                .await
                .is_none()
        );
    }

    #[test]
    fn stable_hash_ignores_key_order() {
        let a = serde_json::json!({"b": 1, "a": [1, 2, {"y": 2, "x": 1}]});
        let b = serde_json::json!({"a": [1, 2, {"x": 1, "y": 2}], "b": 1});
        assert_eq!(stable_hash(&a), stable_hash(&b));
    }

    #[test]
    fn stable_hash_distinguishes_different_content() {
        let a = serde_json::json!({"a": 1});
        let b = serde_json::json!({"a": 2});
        assert_ne!(stable_hash(&a), stable_hash(&b));
    }

    #[test]
    fn kind_round_trips_through_storage_string() {
        for kind in SignatureKind::ALL {
            assert_eq!(SignatureKind::from_str(kind.as_str()), Some(kind));
        }
    }
}
