//! Expression cache: memoizes `express_genome` results keyed by a coarse
//! digest of genome hash + environment, so repeated calls against a
//! slowly-changing environment don't re-run the fixed-point solver
//! (spec §4.4).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::config::CacheConfig;
use crate::epigenetics::{EnvironmentalState, Mode};
use crate::expression::ExpressionResult;

/// Coarse, lossy digest of an environment snapshot: buckets balance into
/// 10-unit steps, starvation into 2-day steps, thriving into 7-day steps,
/// stress into {low,med,high}, plus mode and the deception/trust flag.
/// Two environments that land in the same bucket share a cache entry.
fn environment_digest(env: &EnvironmentalState) -> u64 {
    let balance_bucket = (env.balance / 10.0).floor() as i64;
    let starving_bucket = (env.days_starving / 2.0).floor() as i64;
    let thriving_bucket = (env.days_thriving / 7.0).floor() as i64;
    let stress_bucket: u8 = if env.stress_level >= 0.7 {
        2
    } else if env.stress_level >= 0.3 {
        1
    } else {
        0
    };
    let mode_word: u8 = match env.mode {
        Mode::Normal => 0,
        Mode::LowPower => 1,
        Mode::Emergency => 2,
        Mode::Hibernation => 3,
    };
    let deceived = env.recent_deception_count > 0.0;
    let trusted = env.cooperation_count > 0.0;

    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    use std::hash::{Hash, Hasher};
    balance_bucket.hash(&mut hasher);
    starving_bucket.hash(&mut hasher);
    thriving_bucket.hash(&mut hasher);
    stress_bucket.hash(&mut hasher);
    mode_word.hash(&mut hasher);
    deceived.hash(&mut hasher);
    trusted.hash(&mut hasher);
    hasher.finish()
}

/// `(genomeHash16 || envDigest8)` per spec §4.4, represented as two fields
/// rather than a concatenated byte string for cheap hashing/equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    genome_hash_prefix: [u8; 16],
    env_digest: u64,
}

impl CacheKey {
    pub fn new(genome_hash: &[u8; 32], env: &EnvironmentalState) -> Self {
        let mut prefix = [0u8; 16];
        prefix.copy_from_slice(&genome_hash[..16]);
        Self { genome_hash_prefix: prefix, env_digest: environment_digest(env) }
    }

    pub fn genome_hash_hex_prefix(&self) -> String {
        hex::encode(self.genome_hash_prefix)
    }
}

struct Entry {
    result: Arc<ExpressionResult>,
    inserted_at: Instant,
    hit_count: u32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Filter for `invalidate`: every present field must match for an entry to
/// be dropped (spec §4.4's `{genomeHashPrefix?, olderThan?, lowHitCount?}`).
#[derive(Debug, Clone, Default)]
pub struct InvalidateFilter {
    pub genome_hash_prefix: Option<String>,
    pub older_than: Option<Duration>,
    pub low_hit_count: Option<u32>,
}

pub struct ExpressionCache {
    entries: LruCache<CacheKey, Entry>,
    ttl: Duration,
    stats: CacheStats,
    /// Keys with a computation already registered this tick, so concurrent
    /// identical requests dedup onto the same in-flight result instead of
    /// recomputing (spec §4.4 "batch/dedup for concurrent identical
    /// requests").
    pending: HashMap<CacheKey, ()>,
}

impl ExpressionCache {
    pub fn new(config: CacheConfig) -> Self {
        let capacity = std::num::NonZeroUsize::new(config.max_size.max(1)).unwrap();
        Self {
            entries: LruCache::new(capacity),
            ttl: Duration::from_secs(config.ttl_secs),
            stats: CacheStats::default(),
            pending: HashMap::new(),
        }
    }

    pub fn get(&mut self, key: &CacheKey) -> Option<Arc<ExpressionResult>> {
        let expired = match self.entries.peek(key) {
            Some(entry) => entry.inserted_at.elapsed() > self.ttl,
            None => false,
        };
        if expired {
            self.entries.pop(key);
            self.stats.evictions += 1;
            self.stats.misses += 1;
            return None;
        }
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.hit_count += 1;
                self.stats.hits += 1;
                Some(entry.result.clone())
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    pub fn put(&mut self, key: CacheKey, result: ExpressionResult) -> Arc<ExpressionResult> {
        let arc = Arc::new(result);
        if self.entries.len() == self.entries.cap().get() && !self.entries.contains(&key) {
            self.stats.evictions += 1;
        }
        self.entries.put(key.clone(), Entry { result: arc.clone(), inserted_at: Instant::now(), hit_count: 0 });
        self.pending.remove(&key);
        arc
    }

    /// Register that a computation for `key` is in flight, returning `true`
    /// if the caller should proceed (no one else is already computing it).
    pub fn begin_pending(&mut self, key: &CacheKey) -> bool {
        if self.pending.contains_key(key) {
            false
        } else {
            self.pending.insert(key.clone(), ());
            true
        }
    }

    pub fn invalidate(&mut self, filter: &InvalidateFilter) -> usize {
        let now = Instant::now();
        let keys: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|(key, entry)| {
                let prefix_matches = filter
                    .genome_hash_prefix
                    .as_ref()
                    .map(|p| key.genome_hash_hex_prefix().starts_with(p.as_str()))
                    .unwrap_or(true);
                let age_matches = filter
                    .older_than
                    .map(|d| now.duration_since(entry.inserted_at) > d)
                    .unwrap_or(true);
                let hit_matches = filter.low_hit_count.map(|h| entry.hit_count < h).unwrap_or(true);
                prefix_matches && age_matches && hit_matches
            })
            .map(|(key, _)| key.clone())
            .collect();
        let count = keys.len();
        for key in keys {
            self.entries.pop(&key);
        }
        count
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rough resident-memory estimate: fixed per-entry overhead plus the
    /// expressed-gene vector length, in bytes.
    pub fn footprint_bytes(&self) -> usize {
        const KEY_OVERHEAD: usize = 32;
        const ENTRY_OVERHEAD: usize = 64;
        const PER_GENE_BYTES: usize = 80;
        self.entries
            .iter()
            .map(|(_, entry)| KEY_OVERHEAD + ENTRY_OVERHEAD + entry.result.expressed_genes.len() * PER_GENE_BYTES)
            .sum()
    }
}
