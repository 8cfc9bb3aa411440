use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::SettingsAggregate;

#[derive(Debug, Default)]
struct CacheState {
    generation: u64,
    value: Option<SettingsAggregate>,
}

/// In-memory copy of the settings row.
///
/// Every write bumps the generation and drops the cached row. A reader that
/// fetched from the store only installs its result if no write happened in
/// between, so a slow read can never resurrect a stale row.
#[derive(Debug, Default)]
pub struct SettingsCache {
    state: RwLock<CacheState>,
}

impl SettingsCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current generation and cached row; `None` means "re-fetch".
    pub fn snapshot(&self) -> (u64, Option<SettingsAggregate>) {
        let state = self.read();
        (state.generation, state.value.clone())
    }

    pub fn generation(&self) -> u64 {
        self.read().generation
    }

    /// Installs a freshly read row unless a write happened since `generation`.
    pub fn fill(&self, generation: u64, value: SettingsAggregate) -> bool {
        let mut state = self.write();
        if state.generation != generation {
            return false;
        }
        state.value = Some(value);
        true
    }

    /// Drops the cached row and starts a new generation.
    pub fn invalidate(&self) -> u64 {
        let mut state = self.write();
        state.generation = state.generation.wrapping_add(1);
        state.value = None;
        state.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_is_rejected_after_invalidation() {
        let cache = SettingsCache::new();
        let (generation, cached) = cache.snapshot();
        assert!(cached.is_none());

        cache.invalidate();
        assert!(!cache.fill(generation, SettingsAggregate::synthesized(1)));
        assert!(cache.snapshot().1.is_none());
    }

    #[test]
    fn fill_with_current_generation_is_served() {
        let cache = SettingsCache::new();
        let generation = cache.generation();
        assert!(cache.fill(generation, SettingsAggregate::synthesized(1)));
        assert_eq!(cache.snapshot().1.map(|s| s.user_id), Some(1));
    }
}
