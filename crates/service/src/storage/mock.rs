//! In-memory collection for tests, doc examples and benchmarks.
//!
//! Clones share state, so a test can hand one clone to the engine and keep
//! another to inject faults or inspect what the engine did.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use models::Person;

use super::collection::{CollectionError, PersonCollection};

#[derive(Default)]
struct Shared {
    // None marks a document that can no longer be decoded
    docs: Mutex<BTreeMap<i64, Option<Person>>>,
    latency: Mutex<Option<Duration>>,
    offline: AtomicBool,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

#[derive(Clone, Default)]
pub struct MockPersonCollection {
    shared: Arc<Shared>,
}

struct InFlight<'a>(&'a Shared);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockPersonCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency`, simulating a slow round trip.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.shared.latency.lock().unwrap() = latency;
    }

    /// While offline every call fails with a backend error.
    pub fn set_offline(&self, offline: bool) {
        self.shared.offline.store(offline, Ordering::SeqCst);
    }

    /// Store an undecodable document under `id`.
    pub fn insert_corrupt(&self, id: i64) {
        self.shared.docs.lock().unwrap().insert(id, None);
    }

    /// Highest number of calls that were ever running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.shared.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.shared.calls.load(Ordering::SeqCst)
    }

    /// Snapshot of the decodable documents, ordered by id.
    pub fn documents(&self) -> Vec<Person> {
        self.shared.docs.lock().unwrap().values().flatten().cloned().collect()
    }

    async fn enter(&self) -> Result<InFlight<'_>, CollectionError> {
        let shared = &*self.shared;
        shared.calls.fetch_add(1, Ordering::SeqCst);
        let now = shared.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        shared.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let guard = InFlight(shared);

        let latency = *shared.latency.lock().unwrap();
        match latency {
            Some(d) => tokio::time::sleep(d).await,
            // give other tasks a chance to overlap with this call
            None => tokio::task::yield_now().await,
        }
        if shared.offline.load(Ordering::SeqCst) {
            return Err(CollectionError::Backend("connection refused".into()));
        }
        Ok(guard)
    }
}

fn decoded(id: i64, slot: &Option<Person>) -> Result<Person, CollectionError> {
    slot.clone().ok_or_else(|| CollectionError::Decode(format!("document {id}: missing field `address`")))
}

#[async_trait]
impl PersonCollection for MockPersonCollection {
    async fn count(&self) -> Result<u64, CollectionError> {
        let _call = self.enter().await?;
        Ok(self.shared.docs.lock().unwrap().len() as u64)
    }

    async fn max_id(&self) -> Result<Option<i64>, CollectionError> {
        let _call = self.enter().await?;
        Ok(self.shared.docs.lock().unwrap().keys().next_back().copied())
    }

    async fn find_one(&self, id: i64) -> Result<Option<Person>, CollectionError> {
        let _call = self.enter().await?;
        let docs = self.shared.docs.lock().unwrap();
        docs.get(&id).map(|slot| decoded(id, slot)).transpose()
    }

    async fn find_all(&self) -> Result<Vec<Result<Person, CollectionError>>, CollectionError> {
        let _call = self.enter().await?;
        let docs = self.shared.docs.lock().unwrap();
        Ok(docs.iter().map(|(id, slot)| decoded(*id, slot)).collect())
    }

    async fn insert_one(&self, person: &Person) -> Result<(), CollectionError> {
        let _call = self.enter().await?;
        let mut docs = self.shared.docs.lock().unwrap();
        if docs.contains_key(&person.id) {
            return Err(CollectionError::DuplicateKey(person.id));
        }
        docs.insert(person.id, Some(person.clone()));
        Ok(())
    }

    async fn replace_one(&self, person: &Person) -> Result<u64, CollectionError> {
        let _call = self.enter().await?;
        let mut docs = self.shared.docs.lock().unwrap();
        match docs.get_mut(&person.id) {
            Some(slot) => {
                *slot = Some(person.clone());
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_one(&self, id: i64) -> Result<u64, CollectionError> {
        let _call = self.enter().await?;
        Ok(self.shared.docs.lock().unwrap().remove(&id).map_or(0, |_| 1))
    }
}
