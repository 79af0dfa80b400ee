//! Run-scoped tag resolution with graceful degradation

use super::client::TagLookup;
use crate::types::{FallbackReason, ResolvedTag, TagId};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Default number of identifiers per lookup request
pub const DEFAULT_BATCH_SIZE: usize = 20;

/// Per-unique-identifier resolution counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TagCounts {
    pub resolved_via_api: usize,
    pub fallback: usize,
}

/// Resolves tag identifiers to display names.
///
/// The cache lives for one run and only grows. Its lock is held across the
/// lookup so concurrent posts never query the same identifier twice.
pub struct TagResolver {
    lookup: Option<Arc<dyn TagLookup>>,
    inactive_reason: FallbackReason,
    batch_size: usize,
    cache: Mutex<HashMap<TagId, ResolvedTag>>,
    service_disabled: AtomicBool,
    degraded_warned: AtomicBool,
    resolved_via_api: AtomicUsize,
    fallback: AtomicUsize,
}

impl TagResolver {
    fn with_state(lookup: Option<Arc<dyn TagLookup>>, inactive_reason: FallbackReason) -> Self {
        Self {
            lookup,
            inactive_reason,
            batch_size: DEFAULT_BATCH_SIZE,
            cache: Mutex::new(HashMap::new()),
            service_disabled: AtomicBool::new(false),
            degraded_warned: AtomicBool::new(false),
            resolved_via_api: AtomicUsize::new(0),
            fallback: AtomicUsize::new(0),
        }
    }

    /// Resolver backed by a lookup service
    pub fn new(lookup: Arc<dyn TagLookup>) -> Self {
        Self::with_state(Some(lookup), FallbackReason::Disabled)
    }

    /// Enrichment turned off: every tag gets its fallback name
    pub fn disabled() -> Self {
        Self::with_state(None, FallbackReason::Disabled)
    }

    /// No credential available: every tag gets its fallback name
    pub fn without_credential() -> Self {
        Self::with_state(None, FallbackReason::NoCredential)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Whether a lookup service is configured and still usable
    pub fn is_active(&self) -> bool {
        self.lookup.is_some() && !self.service_disabled.load(Ordering::Relaxed)
    }

    /// Resolve a set of identifiers, looking up only the ones not cached yet
    pub async fn resolve(&self, ids: &BTreeSet<TagId>) -> HashMap<TagId, ResolvedTag> {
        let mut cache = self.cache.lock().await;

        let missing: Vec<TagId> = ids
            .iter()
            .filter(|id| !cache.contains_key(*id))
            .cloned()
            .collect();

        if !missing.is_empty() {
            match &self.lookup {
                Some(lookup) => self.lookup_missing(lookup.as_ref(), &missing, &mut cache).await,
                None => {
                    for id in missing {
                        self.insert_fallback(&mut cache, id, self.inactive_reason.clone());
                    }
                }
            }
        }

        ids.iter()
            .filter_map(|id| cache.get(id).map(|tag| (id.clone(), tag.clone())))
            .collect()
    }

    async fn lookup_missing(
        &self,
        lookup: &dyn TagLookup,
        missing: &[TagId],
        cache: &mut HashMap<TagId, ResolvedTag>,
    ) {
        for batch in missing.chunks(self.batch_size) {
            if self.service_disabled.load(Ordering::Relaxed) {
                let reason = FallbackReason::ServiceError("service disabled for this run".to_string());
                for id in batch {
                    self.insert_fallback(cache, id.clone(), reason.clone());
                }
                continue;
            }

            match lookup.lookup(batch).await {
                Ok(names) => {
                    debug!("Resolved {} of {} tags via API", names.len(), batch.len());
                    for id in batch {
                        match names.get(id) {
                            Some(name) => {
                                self.resolved_via_api.fetch_add(1, Ordering::Relaxed);
                                cache.insert(id.clone(), ResolvedTag::resolved(id.clone(), name.clone()));
                            }
                            None => self.insert_fallback(cache, id.clone(), FallbackReason::NotFound),
                        }
                    }
                }
                Err(e) => {
                    if e.is_auth_failure() {
                        self.service_disabled.store(true, Ordering::Relaxed);
                    }
                    if !self.degraded_warned.swap(true, Ordering::Relaxed) {
                        warn!("Tag enrichment degraded, using fallback names: {}", e);
                    } else {
                        debug!("Tag lookup failed for {} tags: {}", batch.len(), e);
                    }
                    let reason = FallbackReason::ServiceError(e.to_string());
                    for id in batch {
                        self.insert_fallback(cache, id.clone(), reason.clone());
                    }
                }
            }
        }
    }

    fn insert_fallback(&self, cache: &mut HashMap<TagId, ResolvedTag>, id: TagId, reason: FallbackReason) {
        self.fallback.fetch_add(1, Ordering::Relaxed);
        cache.insert(id.clone(), ResolvedTag::fallback(id, reason));
    }

    pub fn counts(&self) -> TagCounts {
        TagCounts {
            resolved_via_api: self.resolved_via_api.load(Ordering::Relaxed),
            fallback: self.fallback.load(Ordering::Relaxed),
        }
    }
}
