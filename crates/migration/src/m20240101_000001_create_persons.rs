//! Create `persons` table.
//! One row per person document, keyed by the engine-assigned integer id.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Persons::Table)
                    .if_not_exists()
                    // ids are minted by the storage engine, never by the database
                    .col(big_integer(Persons::Id).primary_key())
                    .col(string(Persons::Name).not_null())
                    .col(string(Persons::Address).not_null())
                    .col(string(Persons::Work).not_null())
                    .col(integer(Persons::Age).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Persons::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Persons {
    Table,
    Id,
    Name,
    Address,
    Work,
    Age,
}
