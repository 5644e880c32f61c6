use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Elements::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Elements::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Elements::Name)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Elements::StandardRate).decimal().not_null())
                    .col(
                        ColumnDef::new(Elements::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Elements::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Elements::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Elements::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Elements {
    Table,
    Id,
    Name,
    StandardRate,
    IsActive,
    CreatedAt,
    UpdatedAt,
}
