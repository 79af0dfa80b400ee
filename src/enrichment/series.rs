//! Series name resolution
//!
//! The export only carries series identifiers for most posts. Names come
//! from the publication's series list, fetched once per publication and
//! kept for the run.

use super::client::SeriesLookup;
use crate::types::{FallbackReason, ResolvedSeries, SeriesRef};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Catalog of one publication, or the reason it is unavailable
type Catalog = Result<HashMap<String, String>, String>;

/// Resolves series identifiers to display names
pub struct SeriesResolver {
    lookup: Option<Arc<dyn SeriesLookup>>,
    inactive_reason: FallbackReason,
    catalogs: Mutex<HashMap<String, Catalog>>,
    degraded_warned: AtomicBool,
}

impl SeriesResolver {
    fn with_state(lookup: Option<Arc<dyn SeriesLookup>>, inactive_reason: FallbackReason) -> Self {
        Self {
            lookup,
            inactive_reason,
            catalogs: Mutex::new(HashMap::new()),
            degraded_warned: AtomicBool::new(false),
        }
    }

    pub fn new(lookup: Arc<dyn SeriesLookup>) -> Self {
        Self::with_state(Some(lookup), FallbackReason::Disabled)
    }

    pub fn disabled() -> Self {
        Self::with_state(None, FallbackReason::Disabled)
    }

    pub fn without_credential() -> Self {
        Self::with_state(None, FallbackReason::NoCredential)
    }

    /// Name a series: the export's own name wins, then the publication
    /// catalog, then the `Series-<id>` fallback.
    pub async fn resolve(&self, publication_id: Option<&str>, series: &SeriesRef) -> ResolvedSeries {
        if let Some(name) = series.name.as_deref().filter(|n| !n.trim().is_empty()) {
            return ResolvedSeries::resolved(series.id.clone(), name);
        }

        let Some(lookup) = &self.lookup else {
            return ResolvedSeries::fallback(series.id.clone(), self.inactive_reason.clone());
        };
        let Some(publication_id) = publication_id.filter(|id| !id.is_empty()) else {
            return ResolvedSeries::fallback(series.id.clone(), FallbackReason::NoPublication);
        };

        // Held across the lookup so a publication is only queried once
        let mut catalogs = self.catalogs.lock().await;
        if !catalogs.contains_key(publication_id) {
            let catalog = match lookup.publication_series(publication_id).await {
                Ok(names) => {
                    debug!("Publication {} has {} named series", publication_id, names.len());
                    Ok(names)
                }
                Err(e) => {
                    if !self.degraded_warned.swap(true, Ordering::Relaxed) {
                        warn!("Series enrichment degraded, using fallback names: {}", e);
                    }
                    Err(e.to_string())
                }
            };
            catalogs.insert(publication_id.to_string(), catalog);
        }

        match catalogs.get(publication_id) {
            Some(Ok(names)) => match names.get(&series.id) {
                Some(name) => ResolvedSeries::resolved(series.id.clone(), name.clone()),
                None => ResolvedSeries::fallback(series.id.clone(), FallbackReason::NotFound),
            },
            Some(Err(message)) => ResolvedSeries::fallback(
                series.id.clone(),
                FallbackReason::ServiceError(message.clone()),
            ),
            None => ResolvedSeries::fallback(series.id.clone(), FallbackReason::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::EnrichmentError;
    use crate::types::TagResolution;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct FakeSeries {
        names: HashMap<String, String>,
        calls: AtomicUsize,
        fail: bool,
    }

    impl FakeSeries {
        fn new(names: &[(&str, &str)]) -> Self {
            Self {
                names: names
                    .iter()
                    .map(|(id, name)| (id.to_string(), name.to_string()))
                    .collect(),
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(&[])
            }
        }
    }

    #[async_trait]
    impl SeriesLookup for FakeSeries {
        async fn publication_series(
            &self,
            _publication_id: &str,
        ) -> Result<HashMap<String, String>, EnrichmentError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            if self.fail {
                return Err(EnrichmentError::Status {
                    status: 503,
                    body: "down".into(),
                });
            }
            Ok(self.names.clone())
        }
    }

    #[tokio::test]
    async fn test_catalog_fetched_once_per_publication() {
        let lookup = Arc::new(FakeSeries::new(&[("s1", "Rust Basics"), ("s2", "Async")]));
        let resolver = SeriesResolver::new(lookup.clone());

        let first = resolver.resolve(Some("pub1"), &SeriesRef::new("s1")).await;
        let second = resolver.resolve(Some("pub1"), &SeriesRef::new("s2")).await;
        let unknown = resolver.resolve(Some("pub1"), &SeriesRef::new("s9")).await;

        assert_eq!(first.name(), "Rust Basics");
        assert_eq!(second.name(), "Async");
        assert_eq!(unknown.name(), "Series-s9");
        assert!(matches!(
            unknown.resolution,
            TagResolution::Fallback { reason: FallbackReason::NotFound, .. }
        ));
        assert_eq!(lookup.calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_inline_name_needs_no_lookup() {
        let lookup = Arc::new(FakeSeries::new(&[]));
        let resolver = SeriesResolver::new(lookup.clone());
        let series = resolver
            .resolve(None, &SeriesRef::new("s1").with_name("Written Down"))
            .await;
        assert_eq!(series.name(), "Written Down");
        assert!(!series.is_fallback());
        assert_eq!(lookup.calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_missing_publication_falls_back() {
        let lookup = Arc::new(FakeSeries::new(&[("s1", "Rust Basics")]));
        let resolver = SeriesResolver::new(lookup.clone());
        let series = resolver.resolve(None, &SeriesRef::new("s1")).await;
        assert!(matches!(
            series.resolution,
            TagResolution::Fallback { reason: FallbackReason::NoPublication, .. }
        ));
        assert_eq!(lookup.calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_service_failure_is_remembered() {
        let lookup = Arc::new(FakeSeries::failing());
        let resolver = SeriesResolver::new(lookup.clone());

        let a = resolver.resolve(Some("pub1"), &SeriesRef::new("s1")).await;
        let b = resolver.resolve(Some("pub1"), &SeriesRef::new("s2")).await;

        assert_eq!(a.name(), "Series-s1");
        assert!(matches!(
            b.resolution,
            TagResolution::Fallback { reason: FallbackReason::ServiceError(_), .. }
        ));
        assert_eq!(lookup.calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_inactive_resolvers() {
        let series = SeriesResolver::disabled()
            .resolve(Some("pub1"), &SeriesRef::new("0123456789abcdef"))
            .await;
        assert_eq!(series.name(), "Series-01234567");
        assert!(matches!(
            series.resolution,
            TagResolution::Fallback { reason: FallbackReason::Disabled, .. }
        ));

        let series = SeriesResolver::without_credential()
            .resolve(Some("pub1"), &SeriesRef::new("s1"))
            .await;
        assert!(matches!(
            series.resolution,
            TagResolution::Fallback { reason: FallbackReason::NoCredential, .. }
        ));
    }
}
