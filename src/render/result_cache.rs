use crate::error::GradientError;
use crate::render::gradient::{GradientOptions, GradientResult};
use futures::future::{BoxFuture, Shared};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Work for one cache key, shared by every caller that asked while it ran.
pub type InFlight = Shared<BoxFuture<'static, Result<Arc<GradientResult>, GradientError>>>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheKeyPolicy {
    /// One result per URL; the options of the first completed call win.
    Url,
    /// One result per URL and option set.
    #[default]
    UrlAndOptions,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheConfig {
    /// `None` keeps every entry for the life of the cache.
    pub capacity: Option<usize>,
    /// `None` never expires entries.
    pub ttl: Option<Duration>,
    pub key_policy: CacheKeyPolicy,
}

/// Bit-exact option identity, so float options can key a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OptionsKey {
    luminance_threshold: u64,
    sample_rate: u32,
    angle: u64,
    min_contrast: u64,
}

impl From<&GradientOptions> for OptionsKey {
    fn from(o: &GradientOptions) -> Self {
        Self {
            luminance_threshold: o.luminance_threshold.to_bits(),
            sample_rate: o.sample_rate,
            angle: o.angle.to_bits(),
            min_contrast: o.min_contrast.to_bits(),
        }
    }
}

/// URLs are compared as given: no normalization of case, query or trailing slash.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub url: String,
    pub options: Option<OptionsKey>,
}

impl CacheKey {
    pub fn new(policy: CacheKeyPolicy, url: &str, options: &GradientOptions) -> Self {
        let options = match policy {
            CacheKeyPolicy::Url => None,
            CacheKeyPolicy::UrlAndOptions => Some(OptionsKey::from(options)),
        };
        Self {
            url: url.to_string(),
            options,
        }
    }
}

enum Slot {
    Ready {
        result: Arc<GradientResult>,
        stored_at: Instant,
    },
    Pending {
        id: u64,
        work: InFlight,
    },
}

pub enum Lookup {
    Hit(Arc<GradientResult>),
    /// Another caller already started this key.
    Joined(InFlight),
    Miss,
}

/// Completed gradients plus the in-flight work that will produce more.
///
/// LRU order only tracks completed entries; pending slots never count toward
/// the capacity and are never evicted.
pub struct GradientCache {
    config: CacheConfig,
    order: VecDeque<CacheKey>,
    map: HashMap<CacheKey, Slot>,
    next_id: u64,
}

impl GradientCache {
    pub fn new(config: CacheConfig) -> Self {
        let config = CacheConfig {
            capacity: config.capacity.map(|c| c.max(1)),
            ..config
        };
        Self {
            config,
            order: VecDeque::new(),
            map: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn key(&self, url: &str, options: &GradientOptions) -> CacheKey {
        CacheKey::new(self.config.key_policy, url, options)
    }

    pub fn lookup(&mut self, key: &CacheKey) -> Lookup {
        self.lookup_at(key, Instant::now())
    }

    fn lookup_at(&mut self, key: &CacheKey, now: Instant) -> Lookup {
        let expired = match self.map.get(key) {
            None => return Lookup::Miss,
            Some(Slot::Pending { work, .. }) => return Lookup::Joined(work.clone()),
            Some(Slot::Ready { stored_at, .. }) => self
                .config
                .ttl
                .is_some_and(|ttl| now.saturating_duration_since(*stored_at) >= ttl),
        };

        if expired {
            self.remove(key);
            return Lookup::Miss;
        }

        let hit = match self.map.get(key) {
            Some(Slot::Ready { result, .. }) => result.clone(),
            _ => return Lookup::Miss,
        };
        self.touch(key);
        Lookup::Hit(hit)
    }

    /// A fresh ticket identifying one piece of in-flight work.
    pub fn next_ticket(&mut self) -> u64 {
        self.next_id = self.next_id.wrapping_add(1);
        self.next_id
    }

    /// Registers in-flight work for `key` under ticket `id`.
    pub fn begin(&mut self, key: CacheKey, id: u64, work: InFlight) {
        if matches!(self.map.get(&key), Some(Slot::Ready { .. })) {
            self.forget_order(&key);
        }
        self.map.insert(key, Slot::Pending { id, work });
    }

    /// Stores the result of ticket `id`. Dropped if the slot was invalidated or
    /// taken over meanwhile.
    pub fn complete(&mut self, key: &CacheKey, id: u64, result: Arc<GradientResult>) {
        self.complete_at(key, id, result, Instant::now());
    }

    fn complete_at(&mut self, key: &CacheKey, id: u64, result: Arc<GradientResult>, now: Instant) {
        if !self.is_ticket(key, id) {
            return;
        }
        self.map.insert(
            key.clone(),
            Slot::Ready {
                result,
                stored_at: now,
            },
        );
        self.order.push_back(key.clone());

        if let Some(cap) = self.config.capacity {
            while self.order.len() > cap {
                if let Some(old) = self.order.pop_front() {
                    self.map.remove(&old);
                }
            }
        }
    }

    /// Clears the slot of a failed ticket so the next call starts over.
    pub fn fail(&mut self, key: &CacheKey, id: u64) {
        if self.is_ticket(key, id) {
            self.map.remove(key);
        }
    }

    /// Drops every entry for `url`, whatever options it was computed with.
    pub fn invalidate(&mut self, url: &str) -> usize {
        let keys: Vec<CacheKey> = self.map.keys().filter(|k| k.url == url).cloned().collect();
        for k in &keys {
            self.remove(k);
        }
        keys.len()
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.order.clear();
    }

    /// Completed entries only.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.map.values().filter(|s| matches!(s, Slot::Pending { .. })).count()
    }

    fn is_ticket(&self, key: &CacheKey, id: u64) -> bool {
        matches!(self.map.get(key), Some(Slot::Pending { id: cur, .. }) if *cur == id)
    }

    fn remove(&mut self, key: &CacheKey) {
        if let Some(Slot::Ready { .. }) = self.map.remove(key) {
            self.forget_order(key);
        }
    }

    fn touch(&mut self, key: &CacheKey) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            if let Some(k) = self.order.remove(pos) {
                self.order.push_back(k);
            }
        }
    }

    fn forget_order(&mut self, key: &CacheKey) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::gradient::Rgb;
    use futures::FutureExt;

    fn result(r: u8) -> Arc<GradientResult> {
        Arc::new(GradientResult::new(135.0, Rgb::new(r, r, r), Rgb::new(9, 9, 11)))
    }

    fn never() -> InFlight {
        futures::future::pending().boxed().shared()
    }

    fn begin(cache: &mut GradientCache, key: &CacheKey) -> u64 {
        let id = cache.next_ticket();
        cache.begin(key.clone(), id, never());
        id
    }

    fn store(cache: &mut GradientCache, url: &str, r: u8) -> CacheKey {
        let key = cache.key(url, &GradientOptions::default());
        let id = begin(cache, &key);
        cache.complete(&key, id, result(r));
        key
    }

    fn hit(cache: &mut GradientCache, key: &CacheKey) -> Option<Arc<GradientResult>> {
        match cache.lookup(key) {
            Lookup::Hit(r) => Some(r),
            _ => None,
        }
    }

    #[test]
    fn completed_ticket_becomes_a_hit() {
        let mut cache = GradientCache::new(CacheConfig::default());
        let key = store(&mut cache, "https://a/logo.png", 1);
        assert_eq!(hit(&mut cache, &key), Some(result(1)));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.pending(), 0);
    }

    #[test]
    fn pending_slot_is_joined() {
        let mut cache = GradientCache::new(CacheConfig::default());
        let key = cache.key("u", &GradientOptions::default());
        begin(&mut cache, &key);
        assert!(matches!(cache.lookup(&key), Lookup::Joined(_)));
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.pending(), 1);
    }

    #[test]
    fn failed_ticket_leaves_nothing_behind() {
        let mut cache = GradientCache::new(CacheConfig::default());
        let key = cache.key("u", &GradientOptions::default());
        let id = begin(&mut cache, &key);
        cache.fail(&key, id);
        assert!(matches!(cache.lookup(&key), Lookup::Miss));
    }

    #[test]
    fn stale_ticket_does_not_overwrite() {
        let mut cache = GradientCache::new(CacheConfig::default());
        let key = cache.key("u", &GradientOptions::default());
        let old = begin(&mut cache, &key);
        cache.invalidate("u");
        cache.complete(&key, old, result(1));
        assert!(matches!(cache.lookup(&key), Lookup::Miss));
    }

    #[test]
    fn lru_evicts_least_recently_used() {
        let mut cache = GradientCache::new(CacheConfig {
            capacity: Some(2),
            ..Default::default()
        });
        let a = store(&mut cache, "a", 1);
        let b = store(&mut cache, "b", 2);
        assert!(hit(&mut cache, &a).is_some());
        let c = store(&mut cache, "c", 3);

        assert_eq!(cache.len(), 2);
        assert!(hit(&mut cache, &a).is_some());
        assert!(hit(&mut cache, &b).is_none());
        assert!(hit(&mut cache, &c).is_some());
    }

    #[test]
    fn ttl_expires_on_lookup() {
        let mut cache = GradientCache::new(CacheConfig {
            ttl: Some(Duration::from_secs(60)),
            ..Default::default()
        });
        let key = cache.key("u", &GradientOptions::default());
        let id = begin(&mut cache, &key);
        let t0 = Instant::now();
        cache.complete_at(&key, id, result(1), t0);

        assert!(matches!(cache.lookup_at(&key, t0 + Duration::from_secs(59)), Lookup::Hit(_)));
        assert!(matches!(cache.lookup_at(&key, t0 + Duration::from_secs(60)), Lookup::Miss));
        assert!(cache.is_empty());
    }

    #[test]
    fn url_policy_ignores_options() {
        let cache = GradientCache::new(CacheConfig {
            key_policy: CacheKeyPolicy::Url,
            ..Default::default()
        });
        let wide = GradientOptions {
            angle: 90.0,
            ..Default::default()
        };
        assert_eq!(cache.key("u", &GradientOptions::default()), cache.key("u", &wide));
    }

    #[test]
    fn default_policy_separates_options() {
        let cache = GradientCache::new(CacheConfig::default());
        let wide = GradientOptions {
            angle: 90.0,
            ..Default::default()
        };
        assert_ne!(cache.key("u", &GradientOptions::default()), cache.key("u", &wide));
    }

    #[test]
    fn urls_are_not_normalized() {
        let cache = GradientCache::new(CacheConfig::default());
        let o = GradientOptions::default();
        assert_ne!(cache.key("https://a/x.png", &o), cache.key("https://a/x.png?", &o));
        assert_ne!(cache.key("https://a/x/", &o), cache.key("https://a/x", &o));
    }

    #[test]
    fn invalidate_drops_all_option_variants() {
        let mut cache = GradientCache::new(CacheConfig::default());
        store(&mut cache, "u", 1);
        let key = cache.key(
            "u",
            &GradientOptions {
                angle: 10.0,
                ..Default::default()
            },
        );
        let id = begin(&mut cache, &key);
        cache.complete(&key, id, result(2));
        store(&mut cache, "v", 3);

        assert_eq!(cache.invalidate("u"), 2);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
