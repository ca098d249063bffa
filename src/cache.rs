use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use tracing::debug;

use crate::error::FetchError;
use crate::model::game::GameRecord;

/// How long a collected schedule stays fresh.
pub const CACHE_TTL: Duration = Duration::from_secs(10 * 60);

/// Full parameter set of a collection run; unrelated parameters never share
/// an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub per_page: u32,
}

struct CacheEntry {
    games: Vec<GameRecord>,
    expires_at: Instant,
}

/// TTL cache over collected schedules.
///
/// Every key owns its own slot lock, so concurrent lookups of the same
/// parameters collapse into a single upstream fetch while lookups of
/// different parameters proceed independently. Expired entries are replaced
/// lazily on the next lookup.
pub struct ScheduleCache {
    ttl: Duration,
    slots: Mutex<HashMap<CacheKey, Arc<Mutex<Option<CacheEntry>>>>>,
}

impl ScheduleCache {
    pub fn new(ttl: Duration) -> Self {
        ScheduleCache {
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached schedule for `key`, or run `fetch` and remember its
    /// result. The TTL window opens when the fetch completes, not when the
    /// lookup started. A failed fetch is returned to the caller and never
    /// cached.
    pub fn get_or_fetch<F>(&self, key: CacheKey, fetch: F) -> Result<Vec<GameRecord>, FetchError>
    where
        F: FnOnce() -> Result<Vec<GameRecord>, FetchError>,
    {
        self.get_or_fetch_with(key, Instant::now, fetch)
    }

    fn get_or_fetch_with<C, F>(
        &self,
        key: CacheKey,
        clock: C,
        fetch: F,
    ) -> Result<Vec<GameRecord>, FetchError>
    where
        C: Fn() -> Instant,
        F: FnOnce() -> Result<Vec<GameRecord>, FetchError>,
    {
        let slot = self.slot(key);
        // Held across the fetch: a second lookup of the same key waits here
        // and then reads the entry the first one filled in.
        let mut entry = slot.lock().expect("cache slot lock poisoned");

        if let Some(cached) = entry.as_ref() {
            if clock() < cached.expires_at {
                debug!(?key, "cache hit");
                return Ok(cached.games.clone());
            }
        }

        debug!(?key, "cache miss");
        let games = fetch()?;
        // Stamped after the fetch; a retry-laden collection can take a
        // minute or more, and the window runs from when the data arrived.
        *entry = Some(CacheEntry {
            games: games.clone(),
            expires_at: clock() + self.ttl,
        });
        Ok(games)
    }

    fn slot(&self, key: CacheKey) -> Arc<Mutex<Option<CacheEntry>>> {
        let mut slots = self.slots.lock().expect("cache index lock poisoned");
        slots.entry(key).or_default().clone()
    }
}
