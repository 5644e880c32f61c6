pub use sea_orm_migration::prelude::*;

mod m20240601_000001_create_stores_table;
mod m20240601_000002_create_auth_tables;
mod m20240601_000003_create_clients_table;
mod m20240601_000004_create_elements_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_stores_table::Migration),
            Box::new(m20240601_000002_create_auth_tables::Migration),
            Box::new(m20240601_000003_create_clients_table::Migration),
            Box::new(m20240601_000004_create_elements_table::Migration),
        ]
    }
}
