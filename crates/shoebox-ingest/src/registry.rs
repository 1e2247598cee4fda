//! In-flight and cool-down bookkeeping.
//!
//! The registry is the pipeline's claim ledger: a path may be claimed by at
//! most one worker at a time, and a recently processed path sits out a
//! cool-down before it can be claimed again. One mutex guards both maps;
//! every operation under it is O(1) except the occasional history
//! eviction, and the lock is never held across an await point.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use shoebox_config::defaults;

/// Number of oldest history entries evicted once the high-water mark is
/// crossed.
const EVICTION_BATCH: usize = 100;

/// Verdict of a claim attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimDecision {
    /// The caller now owns the path and must release it.
    Claimed,
    /// Another worker currently owns the path.
    AlreadyInFlight,
    /// The path finished processing recently and is cooling down.
    CoolingDown,
}

struct RegistryInner {
    in_flight: HashSet<PathBuf>,
    history: HashMap<PathBuf, Instant>,
}

/// Claim ledger shared by all pipeline workers.
pub struct ProcessingRegistry {
    inner: Mutex<RegistryInner>,
    cool_down: Duration,
    high_water: usize,
}

impl ProcessingRegistry {
    /// Build a registry with the given cool-down and history bound.
    #[must_use]
    pub fn new(cool_down: Duration, high_water: usize) -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                in_flight: HashSet::new(),
                history: HashMap::new(),
            }),
            cool_down,
            high_water,
        }
    }

    /// Build a registry with the default cool-down and history bound.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(defaults::HISTORY_COOL_DOWN, defaults::HISTORY_HIGH_WATER)
    }

    /// Attempt to claim a path for processing.
    pub fn try_claim(&self, path: &Path) -> ClaimDecision {
        let mut inner = self.lock();
        if inner.in_flight.contains(path) {
            return ClaimDecision::AlreadyInFlight;
        }
        if let Some(processed_at) = inner.history.get(path) {
            if processed_at.elapsed() < self.cool_down {
                return ClaimDecision::CoolingDown;
            }
        }
        inner.in_flight.insert(path.to_path_buf());
        ClaimDecision::Claimed
    }

    /// Release a claim and record the path in the cool-down history.
    ///
    /// Called on every terminal outcome, success or failure, so a crashed
    /// stage cannot leave a path claimed forever.
    pub fn release(&self, path: &Path) {
        let mut inner = self.lock();
        inner.in_flight.remove(path);
        inner.history.insert(path.to_path_buf(), Instant::now());
        if inner.history.len() > self.high_water {
            let mut entries: Vec<(PathBuf, Instant)> = inner
                .history
                .iter()
                .map(|(path, instant)| (path.clone(), *instant))
                .collect();
            entries.sort_by_key(|entry| entry.1);
            for (stale, _) in entries.into_iter().take(EVICTION_BATCH) {
                inner.history.remove(&stale);
            }
        }
    }

    /// Number of paths currently claimed.
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.lock().in_flight.len()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ProcessingRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_claims_are_rejected() {
        let registry = ProcessingRegistry::new(Duration::from_secs(300), 1000);
        let path = Path::new("/staging/a.jpg");

        assert_eq!(registry.try_claim(path), ClaimDecision::Claimed);
        assert_eq!(registry.try_claim(path), ClaimDecision::AlreadyInFlight);
        assert_eq!(registry.in_flight_count(), 1);
    }

    #[test]
    fn released_paths_cool_down() {
        let registry = ProcessingRegistry::new(Duration::from_secs(300), 1000);
        let path = Path::new("/staging/a.jpg");

        assert_eq!(registry.try_claim(path), ClaimDecision::Claimed);
        registry.release(path);
        assert_eq!(registry.try_claim(path), ClaimDecision::CoolingDown);
        assert_eq!(registry.in_flight_count(), 0);
    }

    #[test]
    fn a_zero_cool_down_allows_immediate_reclaim() {
        let registry = ProcessingRegistry::new(Duration::ZERO, 1000);
        let path = Path::new("/staging/a.jpg");

        assert_eq!(registry.try_claim(path), ClaimDecision::Claimed);
        registry.release(path);
        assert_eq!(registry.try_claim(path), ClaimDecision::Claimed);
    }

    #[test]
    fn crossing_the_high_water_mark_evicts_the_oldest_entries() {
        let registry = ProcessingRegistry::new(Duration::from_secs(300), 10);
        for i in 0..=10 {
            let path = PathBuf::from(format!("/staging/photo_{i}.jpg"));
            assert_eq!(registry.try_claim(&path), ClaimDecision::Claimed);
            registry.release(&path);
        }

        // The oldest entry was evicted, so its cool-down no longer applies.
        assert_eq!(
            registry.try_claim(Path::new("/staging/photo_0.jpg")),
            ClaimDecision::Claimed
        );
    }
}
