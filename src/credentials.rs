//! Rotation over a pool of search API keys.
//!
//! Each key moves `Untested → Active` when its probe succeeds, or to the
//! terminal `Exhausted`/`Invalid` states when the probe reports quota or key
//! errors. Terminal keys are never handed out again in this process.

use crate::providers::{KeyProbe, ProbeOutcome};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialState {
    Untested,
    Active,
    Exhausted,
    Invalid,
}

impl CredentialState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CredentialState::Exhausted | CredentialState::Invalid)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("All API keys are exhausted or invalid")]
    Exhausted,

    #[error("No API keys configured")]
    EmptyPool,
}

#[derive(Debug)]
struct Credential {
    key: String,
    state: CredentialState,
}

#[derive(Debug)]
struct Pool {
    credentials: Vec<Credential>,
    cursor: usize,
}

pub struct CredentialRotator {
    pool: Mutex<Pool>,
    probe: Arc<dyn KeyProbe>,
}

impl CredentialRotator {
    pub fn new(keys: Vec<String>, probe: Arc<dyn KeyProbe>) -> Self {
        let credentials = keys
            .into_iter()
            .map(|key| Credential {
                key,
                state: CredentialState::Untested,
            })
            .collect();

        Self {
            pool: Mutex::new(Pool {
                credentials,
                cursor: 0,
            }),
            probe,
        }
    }

    /// Hand out a usable key.
    ///
    /// The current key is probed first and stays current while it keeps
    /// passing. A key that fails its probe is flagged and the cursor moves
    /// on; at most one probe per key is made before giving up.
    pub async fn next(&self) -> Result<String, CredentialError> {
        let pool_size = self.pool.lock().credentials.len();
        if pool_size == 0 {
            return Err(CredentialError::EmptyPool);
        }

        for _ in 0..pool_size {
            let Some((index, key)) = self.current_candidate() else {
                break;
            };

            match self.probe.probe(&key).await {
                ProbeOutcome::Valid | ProbeOutcome::Inconclusive => {
                    if !self.activate(index) {
                        log::debug!("API key {} was flagged during its probe", mask(&key));
                        continue;
                    }
                    log::debug!("Using API key {}", mask(&key));
                    return Ok(key);
                }
                ProbeOutcome::QuotaExceeded => self.flag(index, CredentialState::Exhausted),
                ProbeOutcome::Invalid => self.flag(index, CredentialState::Invalid),
            }
        }

        log::error!("All {} API keys are exhausted or invalid", pool_size);
        Err(CredentialError::Exhausted)
    }

    /// Flag a key terminal after a failure seen outside the probe.
    pub fn mark_terminal(&self, key: &str, state: CredentialState) {
        if !state.is_terminal() {
            return;
        }
        let index = self
            .pool
            .lock()
            .credentials
            .iter()
            .position(|c| c.key == key);

        if let Some(index) = index {
            self.flag(index, state);
        }
    }

    /// Keys that can still be handed out.
    pub fn available(&self) -> usize {
        self.pool
            .lock()
            .credentials
            .iter()
            .filter(|c| !c.state.is_terminal())
            .count()
    }

    /// Masked keys with their current state, in pool order.
    pub fn states(&self) -> Vec<(String, CredentialState)> {
        self.pool
            .lock()
            .credentials
            .iter()
            .map(|c| (mask(&c.key), c.state))
            .collect()
    }

    /// First non-terminal key at or after the cursor; the cursor is moved onto it.
    fn current_candidate(&self) -> Option<(usize, String)> {
        let mut pool = self.pool.lock();
        let len = pool.credentials.len();

        for step in 0..len {
            let index = (pool.cursor + step) % len;
            if !pool.credentials[index].state.is_terminal() {
                pool.cursor = index;
                return Some((index, pool.credentials[index].key.clone()));
            }
        }
        None
    }

    /// Mark a key `Active` unless another caller flagged it meanwhile.
    /// Returns whether the key can still be handed out.
    fn activate(&self, index: usize) -> bool {
        let mut pool = self.pool.lock();
        match pool.credentials.get_mut(index) {
            Some(credential) if !credential.state.is_terminal() => {
                credential.state = CredentialState::Active;
                true
            }
            _ => false,
        }
    }

    fn flag(&self, index: usize, state: CredentialState) {
        let mut pool = self.pool.lock();
        let len = pool.credentials.len();
        let Some(credential) = pool.credentials.get_mut(index) else {
            return;
        };

        if credential.state.is_terminal() {
            return;
        }
        credential.state = state;
        log::warn!("API key {} flagged {:?}", mask(&credential.key), state);

        if pool.cursor == index {
            pool.cursor = (index + 1) % len;
        }
    }
}

fn mask(key: &str) -> String {
    let prefix: String = key.chars().take(6).collect();
    format!("{}***", prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubProbe;
    use tokio::sync::Semaphore;

    fn rotator(keys: &[&str], probe: Arc<StubProbe>) -> CredentialRotator {
        CredentialRotator::new(keys.iter().map(|k| k.to_string()).collect(), probe)
    }

    #[tokio::test]
    async fn test_skips_failing_keys() {
        let probe = Arc::new(
            StubProbe::new()
                .with("key-one", ProbeOutcome::QuotaExceeded)
                .with("key-two", ProbeOutcome::Invalid),
        );
        let rotator = rotator(&["key-one", "key-two", "key-three"], probe.clone());

        assert_eq!(rotator.next().await.unwrap(), "key-three");
        assert_eq!(probe.calls(), vec!["key-one", "key-two", "key-three"]);

        let states: Vec<CredentialState> = rotator.states().into_iter().map(|(_, s)| s).collect();
        assert_eq!(
            states,
            vec![
                CredentialState::Exhausted,
                CredentialState::Invalid,
                CredentialState::Active
            ]
        );
    }

    #[tokio::test]
    async fn test_terminal_keys_are_never_returned_again() {
        let probe = Arc::new(StubProbe::new().with("key-one", ProbeOutcome::QuotaExceeded));
        let rotator = rotator(&["key-one", "key-two"], probe.clone());

        assert_eq!(rotator.next().await.unwrap(), "key-two");
        // Even once the quota would reset, the key stays terminal for this run
        probe.set("key-one", ProbeOutcome::Valid);
        rotator.mark_terminal("key-two", CredentialState::Exhausted);

        assert_eq!(rotator.next().await, Err(CredentialError::Exhausted));
        assert_eq!(probe.calls(), vec!["key-one", "key-two"]);
    }

    #[tokio::test]
    async fn test_current_key_is_sticky() {
        let probe = Arc::new(StubProbe::new());
        let rotator = rotator(&["key-one", "key-two"], probe.clone());

        assert_eq!(rotator.next().await.unwrap(), "key-one");
        assert_eq!(rotator.next().await.unwrap(), "key-one");
        assert_eq!(probe.calls(), vec!["key-one", "key-one"]);
    }

    #[tokio::test]
    async fn test_inconclusive_probe_counts_as_valid() {
        let probe = Arc::new(StubProbe::new().with("key-one", ProbeOutcome::Inconclusive));
        let rotator = rotator(&["key-one"], probe);
        assert_eq!(rotator.next().await.unwrap(), "key-one");
    }

    #[tokio::test]
    async fn test_whole_pool_failing_terminates() {
        let probe = Arc::new(
            StubProbe::new()
                .with("a", ProbeOutcome::QuotaExceeded)
                .with("b", ProbeOutcome::QuotaExceeded)
                .with("c", ProbeOutcome::Invalid),
        );
        let rotator = rotator(&["a", "b", "c"], probe.clone());

        assert_eq!(rotator.next().await, Err(CredentialError::Exhausted));
        assert_eq!(probe.calls().len(), 3);
        assert_eq!(rotator.available(), 0);

        // No further probes once everything is terminal
        assert_eq!(rotator.next().await, Err(CredentialError::Exhausted));
        assert_eq!(probe.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_key_flagged_during_probe_is_not_returned() {
        let gate = Arc::new(Semaphore::new(0));
        let probe = Arc::new(StubProbe::new().gated(gate.clone()));
        let rotator = Arc::new(rotator(&["key-one", "key-two"], probe.clone()));

        let pending = tokio::spawn({
            let rotator = rotator.clone();
            async move { rotator.next().await }
        });
        while probe.calls().is_empty() {
            tokio::task::yield_now().await;
        }

        rotator.mark_terminal("key-one", CredentialState::Exhausted);
        gate.add_permits(2);

        assert_eq!(pending.await.unwrap().unwrap(), "key-two");
        let states: Vec<CredentialState> = rotator.states().into_iter().map(|(_, s)| s).collect();
        assert_eq!(
            states,
            vec![CredentialState::Exhausted, CredentialState::Active]
        );
    }

    #[tokio::test]
    async fn test_empty_pool() {
        let rotator = rotator(&[], Arc::new(StubProbe::new()));
        assert_eq!(rotator.next().await, Err(CredentialError::EmptyPool));
    }

    #[test]
    fn test_mask_hides_key() {
        assert_eq!(mask("AIzaSyExampleKey"), "AIzaSy***");
        assert_eq!(mask("abc"), "abc***");
    }
}
