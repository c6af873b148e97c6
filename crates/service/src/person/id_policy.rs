use crate::errors::StorageError;
use crate::storage::collection::PersonCollection;

/// How a new person's identifier is derived from the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdPolicy {
    /// id = number of stored documents.
    ///
    /// Only unique while nothing is deleted: after a delete the count drops and
    /// the next insert can mint an id a retained record already owns. The
    /// engine reports that as [`StorageError::DuplicateId`].
    #[default]
    DocumentCount,
    /// id = highest stored id + 1, or 0 for an empty collection.
    MaxPlusOne,
}

impl IdPolicy {
    pub(crate) async fn next_id<C>(&self, collection: &C) -> Result<i64, StorageError>
    where
        C: PersonCollection + ?Sized,
    {
        match self {
            IdPolicy::DocumentCount => {
                let count = collection.count().await?;
                i64::try_from(count).map_err(|_| StorageError::Db(format!("document count {count} overflows an identifier")))
            }
            IdPolicy::MaxPlusOne => match collection.max_id().await? {
                None => Ok(0),
                Some(max) => max
                    .checked_add(1)
                    .ok_or_else(|| StorageError::Db("identifier space exhausted".into())),
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IdPolicy::DocumentCount => "document_count",
            IdPolicy::MaxPlusOne => "max_plus_one",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::mock::MockPersonCollection;
    use models::Person;

    #[tokio::test]
    async fn empty_collection_starts_at_zero() {
        let c = MockPersonCollection::new();
        assert_eq!(IdPolicy::DocumentCount.next_id(&c).await.unwrap(), 0);
        assert_eq!(IdPolicy::MaxPlusOne.next_id(&c).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn policies_diverge_after_a_gap() {
        use crate::storage::collection::PersonCollection;
        let c = MockPersonCollection::new();
        c.insert_one(&Person::new("B", "X", "Y", 1).with_id(1)).await.unwrap();
        c.insert_one(&Person::new("D", "X", "Y", 1).with_id(3)).await.unwrap();
        assert_eq!(IdPolicy::DocumentCount.next_id(&c).await.unwrap(), 2);
        assert_eq!(IdPolicy::MaxPlusOne.next_id(&c).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn max_plus_one_refuses_to_wrap() {
        use crate::storage::collection::PersonCollection;
        let c = MockPersonCollection::new();
        c.insert_one(&Person::new("Z", "X", "Y", 1).with_id(i64::MAX)).await.unwrap();
        assert!(matches!(IdPolicy::MaxPlusOne.next_id(&c).await, Err(StorageError::Db(_))));
    }
}
