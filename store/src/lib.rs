//! A content-addressed bundle store: bundles keyed by their [`bp7::BundleId`],
//! capacity-capped, with lifetime-based expiry swept out by [`Store::cleanup`].

use bp7::bundle::Bundle;
use bp7::dtn_time::DtnTime;
use bp7::BundleId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, trace};

/// Tunables for a [`Store`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Upper bound on the number of bundles held at once. `Push` is
    /// rejected once this is reached; nothing is evicted implicitly.
    pub max_bundles: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self { max_bundles: 1000 }
    }
}

struct Entry {
    bundle: Arc<Bundle>,
    expiry: DtnTime,
}

/// Bundle storage with a single lock guarding the whole map. All reads
/// return owned snapshots so callers never hold the lock while processing.
pub struct Store {
    config: Config,
    bundles: Mutex<HashMap<BundleId, Entry>>,
}

impl Store {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            bundles: Mutex::new(HashMap::new()),
        }
    }

    /// Inserts `bundle` if the store is under capacity and its ID is not
    /// already present. Returns whether the insertion happened; there is no
    /// implicit eviction to make room.
    pub fn push(&self, bundle: Bundle) -> bool {
        let id = bundle.id();
        let expiry = bundle.expiry();
        let mut bundles = self.bundles.lock().unwrap();
        if bundles.contains_key(&id) {
            trace!(%id, "push rejected: duplicate");
            return false;
        }
        if bundles.len() >= self.config.max_bundles {
            debug!(%id, capacity = self.config.max_bundles, "push rejected: store full");
            return false;
        }
        bundles.insert(
            id,
            Entry {
                bundle: Arc::new(bundle),
                expiry,
            },
        );
        true
    }

    /// Returns the bundle if present and not past its expiry instant.
    pub fn get(&self, id: &BundleId) -> Option<Arc<Bundle>> {
        let bundles = self.bundles.lock().unwrap();
        let entry = bundles.get(id)?;
        if entry.expiry < DtnTime::now() {
            return None;
        }
        Some(entry.bundle.clone())
    }

    pub fn has(&self, id: &BundleId) -> bool {
        self.bundles.lock().unwrap().contains_key(id)
    }

    /// Idempotent removal; returns whether anything was actually removed.
    pub fn remove(&self, id: &BundleId) -> bool {
        self.bundles.lock().unwrap().remove(id).is_some()
    }

    /// A snapshot of every bundle currently held, expired or not.
    pub fn get_all(&self) -> Vec<Arc<Bundle>> {
        self.bundles
            .lock()
            .unwrap()
            .values()
            .map(|e| e.bundle.clone())
            .collect()
    }

    /// A filtered snapshot; the predicate runs outside the lock.
    pub fn query(&self, predicate: impl Fn(&Bundle) -> bool) -> Vec<Arc<Bundle>> {
        self.get_all().into_iter().filter(|b| predicate(b)).collect()
    }

    pub fn len(&self) -> usize {
        self.bundles.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every bundle whose `creation-time + lifetime < now`. Returns
    /// the number removed. Intended to be called on a periodic timer.
    pub fn cleanup(&self, now: DtnTime) -> usize {
        let mut bundles = self.bundles.lock().unwrap();
        let before = bundles.len();
        bundles.retain(|id, entry| {
            let keep = entry.expiry >= now;
            if !keep {
                trace!(%id, "cleanup: bundle expired");
            }
            keep
        });
        let removed = before - bundles.len();
        if removed > 0 {
            debug!(removed, "cleanup swept expired bundles");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bp7::builder::Builder;
    use bp7::eid::Eid;

    fn bundle_with_lifetime(lifetime_ms: u64) -> Bundle {
        Builder::new(Eid::ipn(2, 1), Eid::ipn(1, 0))
            .lifetime(lifetime_ms)
            .payload(b"x".to_vec())
            .build()
            .unwrap()
    }

    #[test]
    fn push_rejects_duplicate() {
        let store = Store::new(Config::default());
        let bundle = bundle_with_lifetime(3600);
        let id = bundle.id();
        assert!(store.push(bundle));
        let dup = Builder::new(Eid::ipn(2, 1), Eid::ipn(1, 0))
            .timestamp(store.get(&id).unwrap().primary.timestamp)
            .payload(b"x".to_vec())
            .build()
            .unwrap();
        assert!(!store.push(dup));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn push_rejects_when_full() {
        let store = Store::new(Config { max_bundles: 1 });
        assert!(store.push(bundle_with_lifetime(3600)));
        assert!(!store.push(bundle_with_lifetime(3600)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn remove_is_idempotent() {
        let store = Store::new(Config::default());
        let bundle = bundle_with_lifetime(3600);
        let id = bundle.id();
        store.push(bundle);
        assert!(store.remove(&id));
        assert!(!store.remove(&id));
    }

    #[test]
    fn cleanup_sweeps_expired_bundles() {
        let store = Store::new(Config::default());
        let bundle = Builder::new(Eid::ipn(2, 1), Eid::ipn(1, 0))
            .timestamp(bp7::creation_timestamp::CreationTimestamp::new(
                DtnTime::new(0, 0),
                0,
            ))
            .lifetime(5_000)
            .payload(b"x".to_vec())
            .build()
            .unwrap();
        let id = bundle.id();
        store.push(bundle);

        assert_eq!(store.cleanup(DtnTime::new(4, 0)), 0);
        assert!(store.has(&id));

        assert_eq!(store.cleanup(DtnTime::new(6, 0)), 1);
        assert!(!store.has(&id));
    }

    #[test]
    fn query_filters_snapshot() {
        let store = Store::new(Config::default());
        store.push(bundle_with_lifetime(3600));
        store.push(
            Builder::new(Eid::ipn(3, 1), Eid::ipn(1, 0))
                .lifetime(3600)
                .payload(b"y".to_vec())
                .build()
                .unwrap(),
        );
        let matches = store.query(|b| b.primary.destination == Eid::ipn(3, 1));
        assert_eq!(matches.len(), 1);
    }
}
