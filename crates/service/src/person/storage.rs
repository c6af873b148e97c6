use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use models::Person;

use crate::errors::StorageError;
use crate::metrics;
use crate::storage::collection::PersonCollection;

use super::id_policy::IdPolicy;
use super::store::{PersonStore, ScanResult};

pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy)]
pub struct StorageOptions {
    /// Deadline for the backing-store work of one operation.
    pub op_timeout: Duration,
    pub id_policy: IdPolicy,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self { op_timeout: DEFAULT_OP_TIMEOUT, id_policy: IdPolicy::default() }
    }
}

/// The storage engine.
///
/// The collection lives inside one async mutex, so at most one operation runs
/// at a time across all identifiers. Id assignment reads the collection and
/// writes it in two steps; the lock is what keeps those steps atomic.
pub struct PersonStorage<C: PersonCollection> {
    collection: Mutex<C>,
    options: StorageOptions,
}

impl<C: PersonCollection> PersonStorage<C> {
    /// Build an engine over `collection`.
    ///
    /// # Examples
    /// ```
    /// use service::person::{PersonStorage, PersonStore, StorageOptions};
    /// use service::storage::mock::MockPersonCollection;
    /// use models::Person;
    /// let storage = PersonStorage::new(MockPersonCollection::new(), StorageOptions::default());
    /// let mut p = Person::new("A", "X", "Y", 18);
    /// let id = tokio_test::block_on(storage.insert(&mut p)).unwrap();
    /// assert_eq!(id, 0);
    /// assert_eq!(tokio_test::block_on(storage.get(0)).unwrap(), p);
    /// ```
    pub fn new(collection: C, options: StorageOptions) -> Self {
        Self { collection: Mutex::new(collection), options }
    }

    /// Run the backing-store part of an operation under the deadline.
    async fn bounded<T, F>(&self, fut: F) -> Result<T, StorageError>
    where
        F: Future<Output = Result<T, StorageError>>,
    {
        match tokio::time::timeout(self.options.op_timeout, fut).await {
            Ok(res) => res,
            Err(_) => Err(StorageError::Timeout(self.options.op_timeout)),
        }
    }
}

#[async_trait]
impl<C: PersonCollection> PersonStore for PersonStorage<C> {
    #[instrument(skip(self, person), fields(policy = self.options.id_policy.as_str()))]
    async fn insert(&self, person: &mut Person) -> Result<i64, StorageError> {
        let collection = self.collection.lock().await;
        let started = Instant::now();
        let coll: &C = &collection;
        let policy = self.options.id_policy;
        let mut doc = person.clone();

        let res = self
            .bounded(async move {
                let id = policy.next_id(coll).await?;
                doc.id = id;
                coll.insert_one(&doc).await?;
                Ok::<_, StorageError>(id)
            })
            .await;
        metrics::observe("insert", res.as_ref().map(|_| ()), started.elapsed());

        match res {
            Ok(id) => {
                person.id = id;
                info!(id, "person inserted");
                Ok(id)
            }
            Err(StorageError::DuplicateId(id)) => {
                warn!(id, "minted identifier already belongs to a stored person");
                Err(StorageError::DuplicateId(id))
            }
            Err(e) => {
                warn!(error = %e, "insert failed");
                Err(e)
            }
        }
    }

    #[instrument(skip(self))]
    async fn get(&self, id: i64) -> Result<Person, StorageError> {
        let collection = self.collection.lock().await;
        let started = Instant::now();
        let coll: &C = &collection;

        let res = self
            .bounded(async move { coll.find_one(id).await?.ok_or(StorageError::NotFound(id)) })
            .await;
        metrics::observe("get", res.as_ref().map(|_| ()), started.elapsed());

        if let Err(e) = &res {
            debug!(error = %e, "get failed");
        }
        res
    }

    #[instrument(skip(self))]
    async fn get_all(&self) -> ScanResult {
        let collection = self.collection.lock().await;
        let started = Instant::now();
        let coll: &C = &collection;

        let res = self.bounded(async move { Ok::<_, StorageError>(coll.find_all().await?) }).await;
        let scan = match res {
            Ok(rows) => {
                let mut scan = ScanResult { persons: Vec::with_capacity(rows.len()), error: None };
                for row in rows {
                    match row {
                        Ok(p) => scan.persons.push(p),
                        Err(e) => {
                            warn!(error = %e, "skipping undecodable person document");
                            scan.error.get_or_insert(StorageError::from(e));
                        }
                    }
                }
                scan
            }
            Err(e) => {
                warn!(error = %e, "scan failed");
                ScanResult { persons: Vec::new(), error: Some(e) }
            }
        };
        metrics::observe("get_all", scan.error.as_ref().map_or(Ok(()), Err), started.elapsed());
        debug!(count = scan.persons.len(), complete = scan.is_complete(), "scan finished");
        scan
    }

    #[instrument(skip(self, person), fields(id = person.id))]
    async fn update(&self, person: &Person) -> Result<(), StorageError> {
        let collection = self.collection.lock().await;
        let started = Instant::now();
        let coll: &C = &collection;

        let res = self
            .bounded(async move {
                match coll.replace_one(person).await? {
                    0 => Err(StorageError::NotFound(person.id)),
                    _ => Ok(()),
                }
            })
            .await;
        metrics::observe("update", res.as_ref().map(|_| ()), started.elapsed());

        match &res {
            Ok(()) => info!("person replaced"),
            Err(e) => debug!(error = %e, "update failed"),
        }
        res
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i64) -> Result<(), StorageError> {
        let collection = self.collection.lock().await;
        let started = Instant::now();
        let coll: &C = &collection;

        let res = self
            .bounded(async move {
                match coll.delete_one(id).await? {
                    0 => Err(StorageError::NotFound(id)),
                    _ => Ok(()),
                }
            })
            .await;
        metrics::observe("delete", res.as_ref().map(|_| ()), started.elapsed());

        match &res {
            Ok(()) => info!("person deleted"),
            Err(e) => debug!(error = %e, "delete failed"),
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;
    use crate::storage::mock::MockPersonCollection;

    fn engine(policy: IdPolicy) -> (PersonStorage<MockPersonCollection>, MockPersonCollection) {
        let mock = MockPersonCollection::new();
        let storage = PersonStorage::new(
            mock.clone(),
            StorageOptions { op_timeout: Duration::from_secs(5), id_policy: policy },
        );
        (storage, mock)
    }

    fn person(name: &str) -> Person {
        Person::new(name, "X", "Y", 18)
    }

    #[tokio::test]
    async fn insert_then_get_returns_equal_record() {
        let (s, _) = engine(IdPolicy::DocumentCount);
        let mut p = Person::new("testName", "testAddress", "testWork", 18);
        let id = s.insert(&mut p).await.unwrap();
        assert_eq!(p.id, id);

        let got = s.get(id).await.unwrap();
        assert_eq!(got, Person::new("testName", "testAddress", "testWork", 18).with_id(id));
    }

    #[tokio::test]
    async fn caller_supplied_id_is_ignored_on_insert() {
        let (s, _) = engine(IdPolicy::DocumentCount);
        let mut p = person("A").with_id(42);
        assert_eq!(s.insert(&mut p).await.unwrap(), 0);
        assert_eq!(p.id, 0);
        assert_eq!(s.get(42).await, Err(StorageError::NotFound(42)));
    }

    #[tokio::test]
    async fn get_unknown_id_is_not_found() {
        let (s, _) = engine(IdPolicy::DocumentCount);
        assert_eq!(s.get(0).await, Err(StorageError::NotFound(0)));
        assert_eq!(s.get(-1).await, Err(StorageError::NotFound(-1)));
    }

    #[tokio::test]
    async fn update_unknown_id_is_not_found_and_creates_nothing() {
        let (s, mock) = engine(IdPolicy::DocumentCount);
        let err = s.update(&person("A").with_id(3)).await.unwrap_err();
        assert_eq!(err, StorageError::NotFound(3));
        assert!(mock.documents().is_empty());
        assert!(s.get_all().await.persons.is_empty());
    }

    #[tokio::test]
    async fn update_outside_existing_range_is_not_found() {
        let (s, _) = engine(IdPolicy::DocumentCount);
        for name in ["A", "B", "C"] {
            s.insert(&mut person(name)).await.unwrap();
        }
        assert_eq!(s.update(&person("Z").with_id(5)).await, Err(StorageError::NotFound(5)));
        assert_eq!(s.get_all().await.persons.len(), 3);
    }

    #[tokio::test]
    async fn update_replaces_every_field() {
        let (s, _) = engine(IdPolicy::DocumentCount);
        let mut p = Person::new("testName", "testAddress", "testWork", 18);
        let id = s.insert(&mut p).await.unwrap();

        let replacement = Person::new("testUpdatedName", "testUpdatedAddress", "testUpdatedWork", 19).with_id(id);
        s.update(&replacement).await.unwrap();
        assert_eq!(s.get(id).await.unwrap(), replacement);
    }

    #[tokio::test]
    async fn delete_unknown_id_is_not_found() {
        let (s, _) = engine(IdPolicy::DocumentCount);
        assert_eq!(s.delete(0).await, Err(StorageError::NotFound(0)));
    }

    #[tokio::test]
    async fn deleted_record_no_longer_resolves() {
        let (s, _) = engine(IdPolicy::DocumentCount);
        let id = s.insert(&mut person("A")).await.unwrap();
        s.delete(id).await.unwrap();
        assert_eq!(s.get(id).await, Err(StorageError::NotFound(id)));
        assert_eq!(s.delete(id).await, Err(StorageError::NotFound(id)));
    }

    #[tokio::test]
    async fn empty_scan_is_empty_and_complete() {
        let (s, _) = engine(IdPolicy::DocumentCount);
        let scan = s.get_all().await;
        assert!(scan.persons.is_empty());
        assert!(scan.is_complete());
        assert_eq!(scan.into_result(), Ok(vec![]));
    }

    #[tokio::test]
    async fn scan_length_tracks_inserts_minus_deletes() {
        let (s, _) = engine(IdPolicy::MaxPlusOne);
        for i in 0..6 {
            s.insert(&mut person(&format!("P{i}"))).await.unwrap();
        }
        s.delete(1).await.unwrap();
        s.delete(4).await.unwrap();
        let scan = s.get_all().await;
        assert!(scan.is_complete());
        let ids: Vec<i64> = scan.persons.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![0, 2, 3, 5]);
    }

    /// A, B get 0 and 1; deleting 0 drops the count to 1, so C is minted id 1
    /// again. The collision surfaces as DuplicateId and B stays intact.
    #[tokio::test]
    async fn count_based_ids_collide_after_delete() {
        let (s, _) = engine(IdPolicy::DocumentCount);
        assert_eq!(s.insert(&mut person("A")).await, Ok(0));
        assert_eq!(s.insert(&mut person("B")).await, Ok(1));
        s.delete(0).await.unwrap();

        let mut c = person("C");
        assert_eq!(s.insert(&mut c).await, Err(StorageError::DuplicateId(1)));
        assert_eq!(c.id, 0, "failed insert leaves the caller's id untouched");

        assert_eq!(s.get(1).await.unwrap().name, "B");
        assert_eq!(s.get_all().await.persons.len(), 1);
    }

    #[tokio::test]
    async fn max_plus_one_avoids_the_collision() {
        let (s, _) = engine(IdPolicy::MaxPlusOne);
        assert_eq!(s.insert(&mut person("A")).await, Ok(0));
        assert_eq!(s.insert(&mut person("B")).await, Ok(1));
        s.delete(0).await.unwrap();
        assert_eq!(s.insert(&mut person("C")).await, Ok(2));
        assert_eq!(s.get(1).await.unwrap().name, "B");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_inserts_get_distinct_ids() {
        let (s, _) = engine(IdPolicy::DocumentCount);
        let s = Arc::new(s);
        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..32 {
            let s = Arc::clone(&s);
            tasks.spawn(async move {
                let mut p = person(&format!("P{i}"));
                s.insert(&mut p).await
            });
        }
        let mut ids = HashSet::new();
        while let Some(res) = tasks.join_next().await {
            assert!(ids.insert(res.unwrap().unwrap()));
        }
        assert_eq!(ids, (0..32).collect::<HashSet<i64>>());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn operations_never_overlap_in_the_collection() {
        let (s, mock) = engine(IdPolicy::MaxPlusOne);
        mock.set_latency(Some(Duration::from_millis(2)));
        let s = Arc::new(s);
        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..24i64 {
            let s = Arc::clone(&s);
            tasks.spawn(async move {
                match i % 4 {
                    0 => {
                        let _ = s.insert(&mut person("P")).await;
                    }
                    1 => {
                        let _ = s.get(i / 2).await;
                    }
                    2 => {
                        let _ = s.update(&person("U").with_id(i / 3)).await;
                    }
                    _ => {
                        let _ = s.get_all().await;
                    }
                }
            });
        }
        while let Some(res) = tasks.join_next().await {
            res.unwrap();
        }
        assert!(mock.calls() >= 24);
        assert_eq!(mock.peak_in_flight(), 1);
    }

    #[tokio::test]
    async fn slow_backend_trips_the_deadline() {
        let mock = MockPersonCollection::new();
        let s = PersonStorage::new(
            mock.clone(),
            StorageOptions { op_timeout: Duration::from_millis(20), id_policy: IdPolicy::DocumentCount },
        );
        mock.set_latency(Some(Duration::from_millis(200)));

        let timeout = StorageError::Timeout(Duration::from_millis(20));
        assert_eq!(s.get(0).await, Err(timeout.clone()));
        assert_eq!(s.insert(&mut person("A")).await, Err(timeout.clone()));
        assert_eq!(s.delete(0).await, Err(timeout.clone()));
        let scan = s.get_all().await;
        assert!(scan.persons.is_empty());
        assert_eq!(scan.error, Some(timeout));

        // the engine is usable again once the store recovers
        mock.set_latency(None);
        assert_eq!(s.insert(&mut person("A")).await, Ok(0));
    }

    #[tokio::test]
    async fn backend_faults_are_storage_errors() {
        let (s, mock) = engine(IdPolicy::DocumentCount);
        s.insert(&mut person("A")).await.unwrap();
        mock.set_offline(true);

        for err in [
            s.get(0).await.unwrap_err(),
            s.insert(&mut person("B")).await.unwrap_err(),
            s.update(&person("A").with_id(0)).await.unwrap_err(),
            s.delete(0).await.unwrap_err(),
        ] {
            assert_eq!(err, StorageError::Db("connection refused".into()));
            assert!(!err.is_not_found());
        }
        let scan = s.get_all().await;
        assert!(scan.persons.is_empty());
        assert_eq!(scan.error, Some(StorageError::Db("connection refused".into())));
    }

    #[tokio::test]
    async fn scan_keeps_readable_records_and_reports_the_rest() {
        let (s, mock) = engine(IdPolicy::MaxPlusOne);
        s.insert(&mut person("A")).await.unwrap();
        mock.insert_corrupt(1);
        s.insert(&mut person("C")).await.unwrap();

        let scan = s.get_all().await;
        let names: Vec<&str> = scan.persons.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);
        assert!(matches!(scan.error, Some(StorageError::Decode(_))));
        assert!(scan.into_result().is_err());

        assert!(matches!(s.get(1).await, Err(StorageError::Decode(_))));
    }
}
