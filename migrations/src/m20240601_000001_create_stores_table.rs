use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Stores::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Stores::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Stores::DealerCode)
                            .string_len(100)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Stores::StoreId).string_len(100))
                    .col(ColumnDef::new(Stores::StoreName).string_len(255).not_null())
                    .col(ColumnDef::new(Stores::ProjectRef).string_len(100))
                    .col(ColumnDef::new(Stores::VendorCode).string_len(255))
                    .col(ColumnDef::new(Stores::ClientCode).string_len(100))
                    .col(ColumnDef::new(Stores::ClientId).uuid())
                    .col(ColumnDef::new(Stores::Zone).string_len(100))
                    .col(ColumnDef::new(Stores::State).string_len(100))
                    .col(ColumnDef::new(Stores::District).string_len(100))
                    .col(ColumnDef::new(Stores::City).string_len(100))
                    .col(ColumnDef::new(Stores::Address).text())
                    .col(ColumnDef::new(Stores::BoardWidthFt).decimal())
                    .col(ColumnDef::new(Stores::BoardHeightFt).decimal())
                    .col(ColumnDef::new(Stores::BoardType).string_len(100))
                    .col(
                        ColumnDef::new(Stores::CurrentStatus)
                            .string_len(50)
                            .not_null()
                            .default("UPLOADED"),
                    )
                    .col(ColumnDef::new(Stores::RecceAssignedTo).uuid())
                    .col(ColumnDef::new(Stores::RecceAssignedBy).uuid())
                    .col(ColumnDef::new(Stores::RecceAssignedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Stores::InstallationAssignedTo).uuid())
                    .col(ColumnDef::new(Stores::InstallationAssignedBy).uuid())
                    .col(ColumnDef::new(Stores::InstallationAssignedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Stores::Recce).json())
                    .col(ColumnDef::new(Stores::Installation).json())
                    .col(
                        ColumnDef::new(Stores::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Stores::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_stores_current_status")
                    .table(Stores::Table)
                    .col(Stores::CurrentStatus)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_stores_recce_assigned_to")
                    .table(Stores::Table)
                    .col(Stores::RecceAssignedTo)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_stores_installation_assigned_to")
                    .table(Stores::Table)
                    .col(Stores::InstallationAssignedTo)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Stores::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Stores {
    Table,
    Id,
    DealerCode,
    StoreId,
    StoreName,
    ProjectRef,
    VendorCode,
    ClientCode,
    ClientId,
    Zone,
    State,
    District,
    City,
    Address,
    BoardWidthFt,
    BoardHeightFt,
    BoardType,
    CurrentStatus,
    RecceAssignedTo,
    RecceAssignedBy,
    RecceAssignedAt,
    InstallationAssignedTo,
    InstallationAssignedBy,
    InstallationAssignedAt,
    Recce,
    Installation,
    CreatedAt,
    UpdatedAt,
}
