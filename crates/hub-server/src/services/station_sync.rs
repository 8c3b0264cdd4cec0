//! Station synchronizer
//!
//! Reads station listings from the directory and writes each returned record
//! through to the store. Persistence problems never reach the caller.

use crate::services::directory::{DirectoryRoute, StationDirectory, UpstreamError};
use crate::storage::{Collection, Document, Filter, PersistenceGateway};
use hub_types::{station_count, station_key, STATION_KEY};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Maximum number of countries returned by [`StationSynchronizer::top_countries`]
pub const COUNTRY_LIMIT: usize = 50;

pub struct StationSynchronizer {
    directory: Arc<dyn StationDirectory>,
    gateway: Arc<PersistenceGateway>,
}

/// What happened to the records of one fetch
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub cached: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl StationSynchronizer {
    pub fn new(directory: Arc<dyn StationDirectory>, gateway: Arc<PersistenceGateway>) -> Self {
        Self { directory, gateway }
    }

    /// Fetch a station listing and cache every record by `stationuuid`
    pub async fn fetch_and_cache(&self, route: &DirectoryRoute) -> Result<Vec<Value>, UpstreamError> {
        let stations = self.directory.fetch(route).await?;
        let report = self.cache(&stations).await;

        info!(
            "Fetched {} stations for {:?}: cached={}, failed={}, skipped={}",
            stations.len(),
            route,
            report.cached,
            report.failed,
            report.skipped
        );

        Ok(stations)
    }

    async fn cache(&self, stations: &[Value]) -> SyncReport {
        let mut report = SyncReport::default();

        for station in stations {
            let (Some(key), Value::Object(record)) = (station_key(station), station) else {
                debug!("Station without {} not cached", STATION_KEY);
                report.skipped += 1;
                continue;
            };

            let filter = Filter::new().eq(STATION_KEY, key);
            match self
                .gateway
                .upsert(Collection::Stations, &filter, Document::clone(record))
                .await
            {
                Ok(_) => report.cached += 1,
                Err(e) => {
                    warn!("Failed to cache station {}: {}", key, e);
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Countries ordered by station count, largest first, capped at [`COUNTRY_LIMIT`]
    pub async fn top_countries(&self) -> Result<Vec<Value>, UpstreamError> {
        let countries = self.directory.fetch(&DirectoryRoute::Countries).await?;
        Ok(rank_countries(countries))
    }
}

fn rank_countries(mut countries: Vec<Value>) -> Vec<Value> {
    countries.sort_by(|a, b| station_count(b).total_cmp(&station_count(a)));
    countries.truncate(COUNTRY_LIMIT);
    countries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{DocumentStore, MemoryMode, MemoryStore, PersistenceError, StoreMode, UpsertOutcome};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeDirectory {
        stations: Vec<Value>,
        countries: Vec<Value>,
        fail_with: Option<u16>,
        requests: Mutex<Vec<DirectoryRoute>>,
    }

    impl FakeDirectory {
        fn new(stations: Vec<Value>) -> Self {
            Self {
                stations,
                countries: Vec::new(),
                fail_with: None,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl StationDirectory for FakeDirectory {
        async fn fetch(&self, route: &DirectoryRoute) -> Result<Vec<Value>, UpstreamError> {
            self.requests.lock().unwrap().push(route.clone());
            if let Some(status) = self.fail_with {
                return Err(UpstreamError::Status {
                    status,
                    message: "Service Unavailable".to_string(),
                });
            }
            match route {
                DirectoryRoute::Countries => Ok(self.countries.clone()),
                _ => Ok(self.stations.clone()),
            }
        }
    }

    /// Store that rejects the first `failures` upserts
    struct FlakyStore {
        inner: MemoryStore,
        failures: AtomicUsize,
    }

    #[async_trait]
    impl DocumentStore for FlakyStore {
        async fn insert(&self, collection: Collection, doc: Document) -> Result<(), PersistenceError> {
            self.inner.insert(collection, doc).await
        }

        async fn find(
            &self,
            collection: Collection,
            filter: &Filter,
        ) -> Result<Vec<Document>, PersistenceError> {
            self.inner.find(collection, filter).await
        }

        async fn upsert(
            &self,
            collection: Collection,
            key: &Filter,
            doc: Document,
        ) -> Result<UpsertOutcome, PersistenceError> {
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(PersistenceError::Unavailable("connection reset".to_string()));
            }
            self.inner.upsert(collection, key, doc).await
        }

        async fn delete(&self, collection: Collection, filter: &Filter) -> Result<u64, PersistenceError> {
            self.inner.delete(collection, filter).await
        }
    }

    fn stations() -> Vec<Value> {
        vec![
            json!({"stationuuid": "u1", "name": "Rock FM", "votes": 900, "codec": "MP3"}),
            json!({"stationuuid": "u2", "name": "Jazz Radio", "votes": 500}),
            json!({"stationuuid": "u3", "name": "News 24", "votes": 100}),
        ]
    }

    #[tokio::test]
    async fn test_fetch_returns_upstream_records_and_caches_them() {
        let gateway = Arc::new(PersistenceGateway::in_memory(MemoryMode::Filtered));
        let directory = Arc::new(FakeDirectory::new(stations()));
        let sync = StationSynchronizer::new(directory.clone(), gateway.clone());

        let route = DirectoryRoute::TopVoted { limit: 3 };
        let fetched = sync.fetch_and_cache(&route).await.unwrap();
        assert_eq!(fetched, stations());
        assert_eq!(directory.requests.lock().unwrap().as_slice(), &[route.clone()]);

        // A second fetch overwrites instead of duplicating
        sync.fetch_and_cache(&route).await.unwrap();
        let cached = gateway.find(Collection::Stations, &Filter::new()).await.unwrap();
        assert_eq!(cached.len(), 3);
        let u1 = gateway
            .find(Collection::Stations, &Filter::new().eq("stationuuid", "u1"))
            .await
            .unwrap();
        assert_eq!(u1[0]["name"], "Rock FM");
    }

    #[tokio::test]
    async fn test_refresh_overwrites_full_record() {
        let gateway = Arc::new(PersistenceGateway::in_memory(MemoryMode::Filtered));
        let old = StationSynchronizer::new(
            Arc::new(FakeDirectory::new(vec![
                json!({"stationuuid": "u1", "name": "Old", "tags": "rock"}),
            ])),
            gateway.clone(),
        );
        old.fetch_and_cache(&DirectoryRoute::TopVoted { limit: 1 })
            .await
            .unwrap();

        let new = StationSynchronizer::new(
            Arc::new(FakeDirectory::new(vec![json!({"stationuuid": "u1", "name": "New"})])),
            gateway.clone(),
        );
        new.fetch_and_cache(&DirectoryRoute::TopVoted { limit: 1 })
            .await
            .unwrap();

        let cached = gateway.find(Collection::Stations, &Filter::new()).await.unwrap();
        assert_eq!(cached.len(), 1);
        assert_eq!(Value::Object(cached[0].clone()), json!({"stationuuid": "u1", "name": "New"}));
    }

    #[tokio::test]
    async fn test_upstream_failure_has_no_side_effect() {
        let gateway = Arc::new(PersistenceGateway::in_memory(MemoryMode::Filtered));
        let mut directory = FakeDirectory::new(stations());
        directory.fail_with = Some(503);
        let sync = StationSynchronizer::new(Arc::new(directory), gateway.clone());

        let err = sync
            .fetch_and_cache(&DirectoryRoute::ByName {
                query: "rock".to_string(),
                limit: 20,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Status { status: 503, .. }));

        let cached = gateway.find(Collection::Stations, &Filter::new()).await.unwrap();
        assert!(cached.is_empty());
    }

    #[tokio::test]
    async fn test_persistence_failures_are_invisible() {
        let store = Arc::new(FlakyStore {
            inner: MemoryStore::default(),
            failures: AtomicUsize::new(2),
        });
        let gateway = Arc::new(PersistenceGateway::new(store.clone(), StoreMode::Connected));
        let sync = StationSynchronizer::new(Arc::new(FakeDirectory::new(stations())), gateway);

        let fetched = sync
            .fetch_and_cache(&DirectoryRoute::ByCountry {
                country: "Germany".to_string(),
                limit: 3,
            })
            .await
            .unwrap();
        assert_eq!(fetched, stations());

        // The loop kept going after the first two failures
        assert_eq!(store.inner.len(Collection::Stations), 1);
    }

    #[tokio::test]
    async fn test_records_without_key_are_returned_but_not_cached() {
        let gateway = Arc::new(PersistenceGateway::in_memory(MemoryMode::Filtered));
        let upstream = vec![json!({"name": "Mystery FM"}), json!({"stationuuid": "u9"})];
        let sync = StationSynchronizer::new(Arc::new(FakeDirectory::new(upstream.clone())), gateway.clone());

        let fetched = sync
            .fetch_and_cache(&DirectoryRoute::TopVoted { limit: 2 })
            .await
            .unwrap();
        assert_eq!(fetched, upstream);

        let cached = gateway.find(Collection::Stations, &Filter::new()).await.unwrap();
        assert_eq!(cached.len(), 1);
    }

    #[tokio::test]
    async fn test_top_countries_sorted_and_capped() {
        let gateway = Arc::new(PersistenceGateway::in_memory(MemoryMode::Filtered));
        let mut directory = FakeDirectory::new(Vec::new());
        directory.countries = (0..80u64)
            .map(|i| json!({"name": format!("C{}", i), "stationcount": (i * 37) % 101}))
            .chain(std::iter::once(json!({"name": "Unknown"})))
            .collect();
        let sync = StationSynchronizer::new(Arc::new(directory), gateway.clone());

        let countries = sync.top_countries().await.unwrap();
        assert_eq!(countries.len(), COUNTRY_LIMIT);
        for pair in countries.windows(2) {
            assert!(station_count(&pair[0]) >= station_count(&pair[1]));
        }

        // Country listings are never cached
        let cached = gateway.find(Collection::Stations, &Filter::new()).await.unwrap();
        assert!(cached.is_empty());
    }

    #[test]
    fn test_rank_countries_short_list() {
        let ranked = rank_countries(vec![
            json!({"name": "Austria", "stationcount": 3}),
            json!({"name": "Germany", "stationcount": 12}),
            json!({"name": "Nowhere"}),
        ]);
        let names: Vec<&str> = ranked.iter().filter_map(|c| c["name"].as_str()).collect();
        assert_eq!(names, vec!["Germany", "Austria", "Nowhere"]);
    }

    #[test]
    fn test_rank_countries_fractional_and_negative_counts() {
        let ranked = rank_countries(vec![
            json!({"name": "Below", "stationcount": -1}),
            json!({"name": "Missing"}),
            json!({"name": "Half", "stationcount": 0.5}),
            json!({"name": "Big", "stationcount": 4.0e3}),
            json!({"name": "Zero", "stationcount": 0}),
        ]);
        let names: Vec<&str> = ranked.iter().filter_map(|c| c["name"].as_str()).collect();
        assert_eq!(names, vec!["Big", "Half", "Missing", "Zero", "Below"]);
    }
}
