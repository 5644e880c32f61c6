use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Clients::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Clients::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Clients::ClientCode)
                            .string_len(100)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Clients::ClientName).string_len(255).not_null())
                    .col(ColumnDef::new(Clients::BranchName).string_len(255).not_null())
                    .col(ColumnDef::new(Clients::Amount).decimal().not_null())
                    .col(ColumnDef::new(Clients::GstNumber).string_len(50).not_null())
                    .col(ColumnDef::new(Clients::Elements).json().not_null())
                    .col(
                        ColumnDef::new(Clients::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Clients::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Clients::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Clients::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Clients {
    Table,
    Id,
    ClientCode,
    ClientName,
    BranchName,
    Amount,
    GstNumber,
    Elements,
    IsActive,
    CreatedAt,
    UpdatedAt,
}
