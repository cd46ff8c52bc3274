use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use once_cell::sync::OnceCell;

type Slot<T> = Arc<OnceCell<Arc<T>>>;

/// Season-keyed memoisation store.
///
/// Each key owns a once-cell, so a value is computed at most once per key even
/// when several callers race on the same season. A failed computation leaves
/// the cell empty and the next caller retries. Entries are immutable once
/// stored and only leave through [`SeasonCache::invalidate`] or
/// [`SeasonCache::clear`].
pub struct SeasonCache<T> {
    slots: Mutex<HashMap<i32, Slot<T>>>,
}

impl<T> Default for SeasonCache<T> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> SeasonCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_try_insert_with<E>(
        &self,
        season: i32,
        init: impl FnOnce() -> Result<T, E>,
    ) -> Result<Arc<T>, E> {
        // Only the map lookup happens under the lock; other seasons stay
        // available while this one populates.
        let slot = self.lock().entry(season).or_default().clone();
        slot.get_or_try_init(|| init().map(Arc::new)).cloned()
    }

    pub fn get(&self, season: i32) -> Option<Arc<T>> {
        self.lock()
            .get(&season)
            .and_then(|slot| slot.get().cloned())
    }

    pub fn contains(&self, season: i32) -> bool {
        self.get(season).is_some()
    }

    pub fn invalidate(&self, season: i32) -> bool {
        self.lock()
            .remove(&season)
            .is_some_and(|slot| slot.get().is_some())
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of populated seasons.
    pub fn len(&self) -> usize {
        self.lock()
            .values()
            .filter(|slot| slot.get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<i32, Slot<T>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn populates_each_season_once() {
        let cache = SeasonCache::new();
        let calls = Cell::new(0);
        for _ in 0..3 {
            let v = cache
                .get_or_try_insert_with(2024, || {
                    calls.set(calls.get() + 1);
                    Ok::<_, ()>(vec![1, 2, 3])
                })
                .unwrap();
            assert_eq!(v.len(), 3);
        }
        assert_eq!(calls.get(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn failed_population_is_retried() {
        let cache: SeasonCache<u32> = SeasonCache::new();
        assert!(cache.get_or_try_insert_with(2023, || Err("boom")).is_err());
        assert!(!cache.contains(2023));
        assert!(cache.is_empty());
        let v = cache.get_or_try_insert_with(2023, || Ok::<_, &str>(7)).unwrap();
        assert_eq!(*v, 7);
    }

    #[test]
    fn invalidate_forces_recompute() {
        let cache = SeasonCache::new();
        cache.get_or_try_insert_with(2022, || Ok::<_, ()>(1)).unwrap();
        assert!(cache.invalidate(2022));
        assert!(!cache.invalidate(2022));
        let v = cache.get_or_try_insert_with(2022, || Ok::<_, ()>(2)).unwrap();
        assert_eq!(*v, 2);
        cache.clear();
        assert!(cache.get(2022).is_none());
    }
}
