use async_trait::async_trait;
use futures_util::StreamExt;
use sea_orm::{
    sea_query::Expr, ActiveValue::NotSet, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, SqlErr,
};
use sea_orm::ColumnTrait;

use models::person;
use models::Person;

use super::collection::{CollectionError, PersonCollection};

/// SeaORM-backed collection over the `persons` table.
pub struct SeaOrmPersonCollection {
    pub db: DatabaseConnection,
}

impl SeaOrmPersonCollection {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn db_err(e: DbErr) -> CollectionError {
    CollectionError::Backend(e.to_string())
}

/// Only a row that cannot be turned into a `Person` is a decode failure;
/// anything else seen mid-stream is a store fault.
fn row_err(e: DbErr) -> CollectionError {
    match e {
        DbErr::Type(msg) | DbErr::Json(msg) => CollectionError::Decode(msg),
        other => db_err(other),
    }
}

fn active_model(p: &Person) -> person::ActiveModel {
    person::ActiveModel {
        id: Set(p.id),
        name: Set(p.name.clone()),
        address: Set(p.address.clone()),
        work: Set(p.work.clone()),
        age: Set(p.age),
    }
}

#[async_trait]
impl PersonCollection for SeaOrmPersonCollection {
    async fn count(&self) -> Result<u64, CollectionError> {
        person::Entity::find().count(&self.db).await.map_err(db_err)
    }

    async fn max_id(&self) -> Result<Option<i64>, CollectionError> {
        let max: Option<Option<i64>> = person::Entity::find()
            .select_only()
            .column_as(Expr::col(person::Column::Id).max(), "max_id")
            .into_tuple()
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(max.flatten())
    }

    async fn find_one(&self, id: i64) -> Result<Option<Person>, CollectionError> {
        person::Entity::find_by_id(id).one(&self.db).await.map_err(row_err)
    }

    async fn find_all(&self) -> Result<Vec<Result<Person, CollectionError>>, CollectionError> {
        let rows = person::Entity::find()
            .order_by_asc(person::Column::Id)
            .stream(&self.db)
            .await
            .map_err(db_err)?;
        let rows: Vec<Result<Person, DbErr>> = rows.collect().await;
        Ok(rows.into_iter().map(|r| r.map_err(row_err)).collect())
    }

    async fn insert_one(&self, p: &Person) -> Result<(), CollectionError> {
        match person::Entity::insert(active_model(p)).exec_without_returning(&self.db).await {
            Ok(_) => Ok(()),
            Err(e) => match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => Err(CollectionError::DuplicateKey(p.id)),
                _ => Err(db_err(e)),
            },
        }
    }

    async fn replace_one(&self, p: &Person) -> Result<u64, CollectionError> {
        let mut am = active_model(p);
        am.id = NotSet;
        let res = person::Entity::update_many()
            .set(am)
            .filter(person::Column::Id.eq(p.id))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(res.rows_affected)
    }

    async fn delete_one(&self, id: i64) -> Result<u64, CollectionError> {
        let res = person::Entity::delete_by_id(id).exec(&self.db).await.map_err(db_err)?;
        Ok(res.rows_affected)
    }
}
