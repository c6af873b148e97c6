use std::{collections::BTreeMap, path::PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::{fs, sync::RwLock};
use tracing::debug;

use models::Person;

use super::collection::{CollectionError, PersonCollection};

type Documents = BTreeMap<i64, Value>;

/// JSON file-backed document collection.
///
/// Documents are kept as raw JSON values and decoded on read, so one damaged
/// document does not poison the rest of the collection. Every mutation is
/// written back to disk before it becomes visible.
pub struct JsonDocumentStore {
    docs: RwLock<Documents>,
    file_path: PathBuf,
}

impl JsonDocumentStore {
    /// Open the store at `path`. Creates the file with an empty collection if missing;
    /// the parent directory must already exist.
    pub async fn open<P: Into<PathBuf>>(path: P) -> Result<Self, CollectionError> {
        let file_path = path.into();
        let docs: Documents = match fs::read(&file_path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Documents::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| CollectionError::Decode(format!("{}: {e}", file_path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let empty = Documents::new();
                fs::write(&file_path, serde_json::to_vec(&empty).map_err(backend)?)
                    .await
                    .map_err(backend)?;
                empty
            }
            Err(e) => return Err(backend(e)),
        };
        debug!(path = %file_path.display(), documents = docs.len(), "json document store opened");

        Ok(Self { docs: RwLock::new(docs), file_path })
    }

    async fn save(&self, docs: &Documents) -> Result<(), CollectionError> {
        let data = serde_json::to_vec_pretty(docs).map_err(backend)?;
        fs::write(&self.file_path, data).await.map_err(backend)
    }

    /// Put a raw document in place, bypassing the entity shape. Used to seed data
    /// written by other tools.
    pub async fn put_raw(&self, id: i64, doc: Value) -> Result<(), CollectionError> {
        let mut docs = self.docs.write().await;
        let previous = docs.insert(id, doc);
        if let Err(e) = self.save(&docs).await {
            restore(&mut docs, id, previous);
            return Err(e);
        }
        Ok(())
    }
}

fn backend<E: std::fmt::Display>(e: E) -> CollectionError {
    CollectionError::Backend(e.to_string())
}

fn decode(id: i64, doc: &Value) -> Result<Person, CollectionError> {
    serde_json::from_value(doc.clone()).map_err(|e| CollectionError::Decode(format!("document {id}: {e}")))
}

fn encode(person: &Person) -> Result<Value, CollectionError> {
    serde_json::to_value(person).map_err(backend)
}

fn restore(docs: &mut Documents, id: i64, previous: Option<Value>) {
    match previous {
        Some(doc) => {
            docs.insert(id, doc);
        }
        None => {
            docs.remove(&id);
        }
    }
}

#[async_trait]
impl PersonCollection for JsonDocumentStore {
    async fn count(&self) -> Result<u64, CollectionError> {
        Ok(self.docs.read().await.len() as u64)
    }

    async fn max_id(&self) -> Result<Option<i64>, CollectionError> {
        Ok(self.docs.read().await.keys().next_back().copied())
    }

    async fn find_one(&self, id: i64) -> Result<Option<Person>, CollectionError> {
        let docs = self.docs.read().await;
        docs.get(&id).map(|doc| decode(id, doc)).transpose()
    }

    async fn find_all(&self) -> Result<Vec<Result<Person, CollectionError>>, CollectionError> {
        let docs = self.docs.read().await;
        Ok(docs.iter().map(|(id, doc)| decode(*id, doc)).collect())
    }

    async fn insert_one(&self, person: &Person) -> Result<(), CollectionError> {
        let doc = encode(person)?;
        let mut docs = self.docs.write().await;
        if docs.contains_key(&person.id) {
            return Err(CollectionError::DuplicateKey(person.id));
        }
        docs.insert(person.id, doc);
        if let Err(e) = self.save(&docs).await {
            docs.remove(&person.id);
            return Err(e);
        }
        Ok(())
    }

    async fn replace_one(&self, person: &Person) -> Result<u64, CollectionError> {
        let doc = encode(person)?;
        let mut docs = self.docs.write().await;
        if !docs.contains_key(&person.id) {
            return Ok(0);
        }
        let previous = docs.insert(person.id, doc);
        if let Err(e) = self.save(&docs).await {
            restore(&mut docs, person.id, previous);
            return Err(e);
        }
        Ok(1)
    }

    async fn delete_one(&self, id: i64) -> Result<u64, CollectionError> {
        let mut docs = self.docs.write().await;
        let Some(previous) = docs.remove(&id) else {
            return Ok(0);
        };
        if let Err(e) = self.save(&docs).await {
            docs.insert(id, previous);
            return Err(e);
        }
        Ok(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_path() -> PathBuf {
        std::env::temp_dir().join(format!("json_document_store_{}.json", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn json_document_store_crud_persists() -> Result<(), anyhow::Error> {
        let tmp = tmp_path();
        let store = JsonDocumentStore::open(&tmp).await?;

        // initially empty
        assert_eq!(store.count().await?, 0);
        assert_eq!(store.max_id().await?, None);

        store.insert_one(&Person::new("A", "X", "Y", 18).with_id(0)).await?;
        store.insert_one(&Person::new("B", "X", "Y", 19).with_id(1)).await?;
        assert_eq!(store.count().await?, 2);
        assert_eq!(store.max_id().await?, Some(1));

        // replace
        let matched = store.replace_one(&Person::new("A2", "X2", "Y2", 20).with_id(0)).await?;
        assert_eq!(matched, 1);
        assert_eq!(store.find_one(0).await?.unwrap().name, "A2");

        // delete and reload persistence
        assert_eq!(store.delete_one(1).await?, 1);
        let reloaded = JsonDocumentStore::open(&tmp).await?;
        let all = reloaded.find_all().await?;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].as_ref().unwrap(), &Person::new("A2", "X2", "Y2", 20).with_id(0));

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_key_leaves_existing_document() -> Result<(), anyhow::Error> {
        let tmp = tmp_path();
        let store = JsonDocumentStore::open(&tmp).await?;
        store.insert_one(&Person::new("B", "X", "Y", 19).with_id(1)).await?;

        let err = store.insert_one(&Person::new("C", "X", "Y", 20).with_id(1)).await.unwrap_err();
        assert_eq!(err, CollectionError::DuplicateKey(1));
        assert_eq!(store.find_one(1).await?.unwrap().name, "B");

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn missing_ids_match_nothing() -> Result<(), anyhow::Error> {
        let tmp = tmp_path();
        let store = JsonDocumentStore::open(&tmp).await?;
        assert_eq!(store.find_one(5).await?, None);
        assert_eq!(store.replace_one(&Person::new("A", "X", "Y", 1).with_id(5)).await?, 0);
        assert_eq!(store.delete_one(5).await?, 0);
        assert_eq!(store.count().await?, 0);

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn damaged_document_only_fails_itself() -> Result<(), anyhow::Error> {
        let tmp = tmp_path();
        let store = JsonDocumentStore::open(&tmp).await?;
        store.insert_one(&Person::new("A", "X", "Y", 18).with_id(0)).await?;
        store.put_raw(1, serde_json::json!({"id": 1, "name": "broken"})).await?;

        let all = store.find_all().await?;
        assert_eq!(all.len(), 2);
        assert!(all[0].is_ok());
        assert!(matches!(all[1], Err(CollectionError::Decode(_))));
        assert!(matches!(store.find_one(1).await, Err(CollectionError::Decode(_))));

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn missing_directory_is_not_created() {
        let dir = std::env::temp_dir().join(format!("json_document_store_missing_{}", uuid::Uuid::new_v4()));
        let res = JsonDocumentStore::open(dir.join("persons.json")).await;
        assert!(matches!(res, Err(CollectionError::Backend(_))));
        assert!(tokio::fs::metadata(&dir).await.is_err());
    }

    #[tokio::test]
    async fn unreadable_file_is_rejected() -> Result<(), anyhow::Error> {
        let tmp = tmp_path();
        tokio::fs::write(&tmp, b"not json").await?;
        assert!(matches!(JsonDocumentStore::open(&tmp).await, Err(CollectionError::Decode(_))));

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }
}
