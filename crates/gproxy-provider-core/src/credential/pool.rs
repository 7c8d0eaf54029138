use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use gproxy_common::RuntimeLimits;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::events::{Event, ModelUnavailableStartEvent, OperationalEvent, UnavailableStartEvent};
use crate::{Credential, CredentialId, CredentialState, EventHub, UnavailableReason};

use super::model_unavailable_queue::ModelUnavailableQueue;
use super::unavailable_queue::UnavailableQueue;

type ModelStateKey = (CredentialId, String);
type ModelStateValue = (Instant, UnavailableReason);

#[derive(Debug, Clone)]
pub enum AcquireError {
    ProviderUnknown,
    NoActiveCredentials,
    /// Every otherwise-eligible credential is currently cooling down on the
    /// requested model. Carries the wait until the earliest cooldown clears,
    /// so the caller can raise a 429 with a `reset after Ns` hint instead of
    /// the generic "no credentials" error.
    AllInCooldown { retry_after_ms: u64 },
}

/// Scheduler counters for one provider's pool, exposed read-only on the
/// `/health` surface. Advisory only: a credential counted `active` here can
/// still lose a race against a concurrent `acquire`.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct PoolStats {
    pub total: u32,
    pub active: u32,
    pub unavailable: u32,
    pub locked: u32,
    pub in_model_cooldown: u32,
}

/// Consecutive non-capacity errors on one credential before it is permanently
/// disabled. A successful request on the credential resets the counter.
const ERROR_DISABLE_THRESHOLD: u32 = 5;

pub struct CredentialPool {
    creds: RwLock<HashMap<CredentialId, Credential>>,
    by_provider: RwLock<HashMap<String, Vec<CredentialId>>>,
    states: Arc<RwLock<HashMap<CredentialId, CredentialState>>>,
    model_states: Arc<RwLock<HashMap<ModelStateKey, ModelStateValue>>>,
    /// Consecutive capacity-error count per `(credential, model)`, driving the
    /// exponential cooldown. Cleared by `mark_capacity_recovered`.
    model_error_counts: RwLock<HashMap<ModelStateKey, u32>>,
    /// Consecutive non-capacity error count per credential, driving the
    /// disable threshold. Cleared by `mark_success`.
    error_counts: RwLock<HashMap<CredentialId, u32>>,
    /// Counted per-credential lock map; a credential whose count is at or
    /// above the configured cap is skipped by the scheduler. `0` disables the
    /// cap (unlimited).
    locks: RwLock<HashMap<CredentialId, u32>>,
    lock_cap: u32,
    /// Last credential id *attempted* (handed out, not necessarily
    /// dispatched) per provider, for strict round-robin scheduling. Advanced
    /// eagerly, before any token-refresh await, so two concurrent calls never
    /// converge on the same candidate.
    cursor: RwLock<HashMap<String, CredentialId>>,
    events: EventHub,
    queue: Arc<UnavailableQueue>,
    model_queue: Arc<ModelUnavailableQueue>,
}

impl CredentialPool {
    /// Uses the process-wide `RuntimeLimits::global()` lock cap (0 =
    /// unlimited, or whatever `GPROXY_ACCOUNT_CONCURRENCY_CAP` resolved to).
    pub fn new(events: EventHub) -> Self {
        Self::with_lock_cap(
            events,
            RuntimeLimits::global().effective_account_concurrency_cap(),
        )
    }

    pub fn with_lock_cap(events: EventHub, lock_cap: u32) -> Self {
        let states = Arc::new(RwLock::new(HashMap::new()));
        let model_states = Arc::new(RwLock::new(HashMap::new()));
        let queue = Arc::new(UnavailableQueue::new());
        let model_queue = Arc::new(ModelUnavailableQueue::new());
        queue
            .clone()
            .spawn_recover_task(states.clone(), events.clone());
        model_queue
            .clone()
            .spawn_recover_task(model_states.clone(), events.clone());
        Self {
            creds: RwLock::new(HashMap::new()),
            by_provider: RwLock::new(HashMap::new()),
            states,
            model_states,
            model_error_counts: RwLock::new(HashMap::new()),
            error_counts: RwLock::new(HashMap::new()),
            locks: RwLock::new(HashMap::new()),
            lock_cap,
            cursor: RwLock::new(HashMap::new()),
            events,
            queue,
            model_queue,
        }
    }

    pub fn events(&self) -> &EventHub {
        &self.events
    }

    pub async fn insert(&self, provider: impl Into<String>, id: CredentialId, cred: Credential) {
        let provider = provider.into();
        self.creds.write().await.insert(id, cred);
        // Avoid duplicated IDs in the provider index; insert() can be called on enable toggles.
        let mut by_provider = self.by_provider.write().await;
        let ids = by_provider.entry(provider).or_default();
        if !ids.contains(&id) {
            ids.push(id);
        }
        self.states
            .write()
            .await
            .entry(id)
            .or_insert(CredentialState::Active);
    }

    pub async fn update_credential(&self, id: CredentialId, cred: Credential) {
        self.creds.write().await.insert(id, cred);
    }

    pub async fn set_enabled(&self, provider: &str, id: CredentialId, enabled: bool) {
        if enabled {
            let mut by_provider = self.by_provider.write().await;
            let ids = by_provider.entry(provider.to_string()).or_default();
            if !ids.contains(&id) {
                ids.push(id);
            }
            drop(by_provider);

            // If the credential was never inserted before, keep state as Active.
            self.states
                .write()
                .await
                .entry(id)
                .or_insert(CredentialState::Active);
        } else {
            let mut by_provider = self.by_provider.write().await;
            if let Some(ids) = by_provider.get_mut(provider) {
                ids.retain(|x| *x != id);
            }
            let mut model_states = self.model_states.write().await;
            model_states.retain(|(cred_id, _), _| *cred_id != id);
        }
    }

    pub async fn acquire(
        &self,
        provider: &str,
    ) -> Result<(CredentialId, Credential), AcquireError> {
        self.acquire_filtered(provider, |_id| true).await
    }

    pub async fn acquire_for_model(
        &self,
        provider: &str,
        model: &str,
    ) -> Result<(CredentialId, Credential), AcquireError> {
        let now = Instant::now();
        let ids = {
            let guard = self.by_provider.read().await;
            guard.get(provider).cloned().unwrap_or_default()
        };

        let (states, locks, model_states) = tokio::join!(
            self.states.read(),
            self.locks.read(),
            self.model_states.read()
        );
        let otherwise_eligible = |id: &CredentialId| {
            matches!(states.get(id), Some(CredentialState::Active))
                && (self.lock_cap == 0 || locks.get(id).copied().unwrap_or(0) < self.lock_cap)
        };
        let cooldown_until = |id: &CredentialId| {
            model_states
                .get(&(*id, model.to_string()))
                .filter(|(until, _)| *until > now)
                .map(|(until, _)| *until)
        };

        let mut cooling = std::collections::HashSet::new();
        let mut earliest: Option<Instant> = None;
        let mut any_eligible_outside_cooldown = false;
        for id in &ids {
            if !otherwise_eligible(id) {
                continue;
            }
            match cooldown_until(id) {
                Some(until) => {
                    cooling.insert(*id);
                    earliest = Some(earliest.map_or(until, |e| e.min(until)));
                }
                None => any_eligible_outside_cooldown = true,
            }
        }
        drop((states, locks, model_states));

        match self
            .acquire_filtered(provider, |id| !cooling.contains(id))
            .await
        {
            Err(AcquireError::NoActiveCredentials) if !any_eligible_outside_cooldown => {
                if let Some(until) = earliest {
                    let retry_after_ms = until.saturating_duration_since(now).as_millis() as u64;
                    Err(AcquireError::AllInCooldown { retry_after_ms })
                } else {
                    Err(AcquireError::NoActiveCredentials)
                }
            }
            other => other,
        }
    }

    /// Strict global round-robin over ids ordered ascending, skipping
    /// credentials that are not active, over their lock cap, or excluded by
    /// `eligible`. The cursor is advanced to whatever id is returned *before*
    /// the caller can await anything, which is what keeps two concurrent
    /// schedule calls from picking the same candidate.
    async fn acquire_filtered(
        &self,
        provider: &str,
        eligible: impl Fn(&CredentialId) -> bool,
    ) -> Result<(CredentialId, Credential), AcquireError> {
        let mut ids = {
            let guard = self.by_provider.read().await;
            guard.get(provider).cloned()
        }
        .ok_or(AcquireError::ProviderUnknown)?;
        ids.sort_unstable();
        if ids.is_empty() {
            return Err(AcquireError::NoActiveCredentials);
        }

        let states = self.states.read().await;
        let locks = self.locks.read().await;
        let mut cursor = self.cursor.write().await;
        let last = cursor.get(provider).copied();

        let passes = |id: &CredentialId| {
            matches!(states.get(id), Some(CredentialState::Active))
                && (self.lock_cap == 0 || locks.get(id).copied().unwrap_or(0) < self.lock_cap)
                && eligible(id)
        };

        let after_cursor =
            last.and_then(|cursor_id| ids.iter().find(|id| **id > cursor_id && passes(*id)));
        let chosen = after_cursor
            .or_else(|| ids.iter().find(|id| passes(*id)))
            .copied();

        let Some(id) = chosen else {
            drop(locks);
            drop(states);
            return Err(AcquireError::NoActiveCredentials);
        };
        cursor.insert(provider.to_string(), id);
        drop(cursor);
        drop(locks);
        drop(states);

        let cred = self
            .creds
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(AcquireError::NoActiveCredentials)?;
        Ok((id, cred))
    }

    pub async fn lock(&self, credential_id: CredentialId) {
        if self.lock_cap == 0 {
            return;
        }
        let mut locks = self.locks.write().await;
        *locks.entry(credential_id).or_insert(0) += 1;
    }

    pub async fn unlock(&self, credential_id: CredentialId) {
        if self.lock_cap == 0 {
            return;
        }
        let mut locks = self.locks.write().await;
        if let Some(count) = locks.get_mut(&credential_id) {
            *count = count.saturating_sub(1);
        }
    }

    /// Records a non-capacity error for `credential_id`; once
    /// `ERROR_DISABLE_THRESHOLD` consecutive errors accrue, the credential is
    /// permanently disabled. Returns `true` if this call disabled it.
    pub async fn mark_error(&self, credential_id: CredentialId) -> bool {
        let count = {
            let mut counts = self.error_counts.write().await;
            let entry = counts.entry(credential_id).or_insert(0);
            *entry += 1;
            *entry
        };
        if count >= ERROR_DISABLE_THRESHOLD {
            self.mark_unavailable(
                credential_id,
                Duration::from_secs(10 * 365 * 24 * 60 * 60),
                UnavailableReason::Unknown,
            )
            .await;
            return true;
        }
        false
    }

    /// Clears the non-capacity error counter after a successful dispatch.
    pub async fn mark_success(&self, credential_id: CredentialId) {
        self.error_counts.write().await.remove(&credential_id);
    }

    /// Implements the cooldown algebra: each consecutive capacity error on
    /// `(credential_id, model)` doubles the previous cooldown, up to a
    /// ceiling, unless the vendor supplied an explicit wait hint (honored
    /// verbatim). Returns the cooldown applied.
    pub async fn mark_capacity_limited(
        &self,
        credential_id: CredentialId,
        model: impl Into<String>,
        explicit_duration: Option<Duration>,
    ) -> Duration {
        let model = model.into();
        let key = (credential_id, model.clone());
        let n = {
            let mut counts = self.model_error_counts.write().await;
            let entry = counts.entry(key).or_insert(0);
            *entry += 1;
            *entry
        };
        let duration = explicit_duration.unwrap_or_else(|| {
            let limits = RuntimeLimits::global();
            let scaled = limits
                .capacity_cooldown_base
                .saturating_mul(1u32 << (n.min(16) - 1));
            scaled.min(limits.capacity_cooldown_max)
        });
        self.mark_model_unavailable(credential_id, model, duration, UnavailableReason::RateLimit)
            .await;
        duration
    }

    /// Resets the consecutive capacity-error counter for `(credential_id,
    /// model)`; the next `mark_capacity_limited` call starts back at the base
    /// cooldown.
    pub async fn mark_capacity_recovered(&self, credential_id: CredentialId, model: &str) {
        self.model_error_counts
            .write()
            .await
            .remove(&(credential_id, model.to_string()));
    }

    pub async fn mark_unavailable(
        &self,
        credential_id: CredentialId,
        duration: Duration,
        reason: UnavailableReason,
    ) {
        let until_instant = Instant::now() + duration;
        {
            let mut guard = self.states.write().await;
            guard.insert(
                credential_id,
                CredentialState::Unavailable {
                    until: until_instant,
                    reason,
                },
            );
        }
        self.queue.push(until_instant, credential_id).await;

        let until_wall = SystemTime::now()
            .checked_add(duration)
            .unwrap_or_else(SystemTime::now);
        self.events
            .emit(Event::Operational(OperationalEvent::UnavailableStart(
                UnavailableStartEvent {
                    at: SystemTime::now(),
                    credential_id,
                    reason,
                    until: until_wall,
                },
            )))
            .await;
    }

    pub async fn mark_model_unavailable(
        &self,
        credential_id: CredentialId,
        model: impl Into<String>,
        duration: Duration,
        reason: UnavailableReason,
    ) {
        let model = model.into();
        let until_instant = Instant::now() + duration;
        {
            let mut guard = self.model_states.write().await;
            guard.insert((credential_id, model.clone()), (until_instant, reason));
        }
        self.model_queue
            .push(until_instant, credential_id, model.clone())
            .await;

        let until_wall = SystemTime::now()
            .checked_add(duration)
            .unwrap_or_else(SystemTime::now);
        self.events
            .emit(Event::Operational(OperationalEvent::ModelUnavailableStart(
                ModelUnavailableStartEvent {
                    at: SystemTime::now(),
                    credential_id,
                    model,
                    reason,
                    until: until_wall,
                },
            )))
            .await;
    }

    pub async fn state(&self, credential_id: CredentialId) -> Option<CredentialState> {
        self.states.read().await.get(&credential_id).cloned()
    }

    /// Snapshot of scheduler counters for the `/health` surface: how many
    /// credentials are active vs. cooling down/disabled, how many
    /// `(credential, model)` pairs are currently in a capacity cooldown, and
    /// how many credentials are at their lock cap.
    pub async fn stats(&self, provider: &str) -> PoolStats {
        let ids = {
            let guard = self.by_provider.read().await;
            guard.get(provider).cloned().unwrap_or_default()
        };
        let states = self.states.read().await;
        let locks = self.locks.read().await;
        let model_states = self.model_states.read().await;
        let now = Instant::now();

        let mut active = 0u32;
        let mut unavailable = 0u32;
        let mut locked = 0u32;
        for id in &ids {
            match states.get(id) {
                Some(CredentialState::Unavailable { until, .. }) if *until > now => {
                    unavailable += 1;
                }
                _ => active += 1,
            }
            if self.lock_cap != 0 && locks.get(id).copied().unwrap_or(0) >= self.lock_cap {
                locked += 1;
            }
        }
        let in_model_cooldown = model_states
            .iter()
            .filter(|((id, _), (until, _))| ids.contains(id) && *until > now)
            .count() as u32;

        PoolStats {
            total: ids.len() as u32,
            active,
            unavailable,
            locked,
            in_model_cooldown,
        }
    }

    pub async fn model_states(
        &self,
        credential_id: CredentialId,
    ) -> Vec<(String, Instant, UnavailableReason)> {
        let now = Instant::now();
        let guard = self.model_states.read().await;
        let mut rows = Vec::new();
        for ((id, model), (until, reason)) in guard.iter() {
            if *id != credential_id {
                continue;
            }
            if *until <= now {
                continue;
            }
            rows.push((model.clone(), *until, *reason));
        }
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::GeminiCliCredential;

    fn test_credential() -> Credential {
        Credential::GeminiCli(GeminiCliCredential {
            access_token: "at".to_string(),
            refresh_token: "rt".to_string(),
            expires_at: 0,
            project_id: "proj".to_string(),
            client_id: "cid".to_string(),
            client_secret: "secret".to_string(),
            user_email: None,
        })
    }

    async fn pool_with(n: i64) -> CredentialPool {
        let pool = CredentialPool::new(EventHub::new(16));
        for id in 0..n {
            pool.insert("gemini-cli", id, test_credential()).await;
        }
        pool
    }

    #[tokio::test]
    async fn round_robin_visits_every_account_at_least_floor_n_over_m_times() {
        let pool = pool_with(3).await;
        let mut counts = HashMap::new();
        for _ in 0..10 {
            let (id, _) = pool.acquire("gemini-cli").await.unwrap();
            *counts.entry(id).or_insert(0u32) += 1;
        }
        // 10 calls over 3 accounts: each visited at least floor(10/3) = 3 times.
        assert_eq!(counts.len(), 3);
        for count in counts.values() {
            assert!(*count >= 3, "account under-visited: {count}");
        }
    }

    #[tokio::test]
    async fn round_robin_wraps_in_ascending_id_order() {
        let pool = pool_with(3).await;
        let mut order = Vec::new();
        for _ in 0..6 {
            let (id, _) = pool.acquire("gemini-cli").await.unwrap();
            order.push(id);
        }
        assert_eq!(order, vec![0, 1, 2, 0, 1, 2]);
    }

    #[tokio::test]
    async fn cursor_advances_before_any_await_so_concurrent_acquires_never_collide() {
        let pool = Arc::new(pool_with(4).await);
        let mut handles = Vec::new();
        for _ in 0..4 {
            let pool = pool.clone();
            handles.push(tokio::spawn(
                async move { pool.acquire("gemini-cli").await.unwrap().0 },
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for handle in handles {
            let id = handle.await.unwrap();
            assert!(seen.insert(id), "two concurrent acquires both got {id}");
        }
    }

    #[tokio::test]
    async fn capacity_cooldown_doubles_until_ceiling_and_resets_on_recovery() {
        let pool = pool_with(1).await;
        let mut prev = Duration::from_secs(0);
        for _ in 0..3 {
            let cooldown = pool.mark_capacity_limited(0, "model-a", None).await;
            assert!(cooldown >= prev, "cooldown should be monotonically non-decreasing");
            prev = cooldown;
        }
        let base = RuntimeLimits::global().capacity_cooldown_base;
        assert_eq!(prev, base * 4);

        pool.mark_capacity_recovered(0, "model-a").await;
        let after_reset = pool.mark_capacity_limited(0, "model-a", None).await;
        assert_eq!(after_reset, base);
    }

    #[tokio::test]
    async fn capacity_cooldown_honors_vendor_explicit_hint() {
        let pool = pool_with(1).await;
        let cooldown = pool
            .mark_capacity_limited(0, "model-a", Some(Duration::from_secs(3)))
            .await;
        assert_eq!(cooldown, Duration::from_secs(3));
    }

    #[tokio::test]
    async fn acquire_for_model_skips_accounts_cooling_down_on_that_model() {
        let pool = pool_with(2).await;
        pool.mark_capacity_limited(0, "model-a", Some(Duration::from_secs(60)))
            .await;
        let (id, _) = pool.acquire_for_model("gemini-cli", "model-a").await.unwrap();
        assert_eq!(id, 1);
    }

    #[tokio::test]
    async fn all_accounts_in_cooldown_raises_no_active_credentials() {
        let pool = pool_with(1).await;
        pool.mark_capacity_limited(0, "model-a", Some(Duration::from_secs(60)))
            .await;
        let err = pool.acquire_for_model("gemini-cli", "model-a").await;
        assert!(matches!(err, Err(AcquireError::NoActiveCredentials)));
    }
}
