use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{OwnedSemaphorePermit, RwLock, Semaphore};

/// Global per-model semaphore (C6): caps how many `generateContent`/
/// `streamGenerateContent` calls for one model id may be in flight at once,
/// independent of which account ends up serving them. `cap == 0` disables
/// the limiter entirely (the common case; most deployments rely on the
/// account pool's own cooldowns instead).
#[derive(Clone)]
pub struct ModelRateLimiter {
    cap: usize,
    semaphores: Arc<RwLock<HashMap<String, Arc<Semaphore>>>>,
}

/// `Err(())` means the model's slot is exhausted; the caller should answer
/// `429 model_concurrency_limit` without ever touching the account pool.
pub type AcquireResult = Result<Option<OwnedSemaphorePermit>, ()>;

impl ModelRateLimiter {
    pub fn new(cap: u32) -> Self {
        Self {
            cap: cap as usize,
            semaphores: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn try_acquire(&self, model: &str) -> AcquireResult {
        if self.cap == 0 {
            return Ok(None);
        }
        let sem = {
            let existing = self.semaphores.read().await.get(model).cloned();
            match existing {
                Some(sem) => sem,
                None => {
                    let mut write = self.semaphores.write().await;
                    write
                        .entry(model.to_string())
                        .or_insert_with(|| Arc::new(Semaphore::new(self.cap)))
                        .clone()
                }
            }
        };
        sem.try_acquire_owned().map(Some).map_err(|_| ())
    }
}

/// Re-chunks `rx` through a fresh channel, holding `permit` alive in the
/// forwarding task until the upstream side closes — so a streaming response
/// keeps its model slot occupied for the life of the stream, not just until
/// the handler returns the response object. Mirrors the forwarding-task
/// idiom already used for the SSE heartbeat wrapper in `proxy.rs`.
pub fn guard_stream_with_permit(
    mut rx: tokio::sync::mpsc::Receiver<Bytes>,
    permit: OwnedSemaphorePermit,
) -> tokio::sync::mpsc::Receiver<Bytes> {
    let (tx, out_rx) = tokio::sync::mpsc::channel::<Bytes>(32);
    tokio::spawn(async move {
        let _permit = permit;
        while let Some(chunk) = rx.recv().await {
            if tx.send(chunk).await.is_err() {
                break;
            }
        }
    });
    out_rx
}
