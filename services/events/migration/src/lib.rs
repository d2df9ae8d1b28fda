pub use sea_orm_migration::prelude::*;

mod m20260101_000001_create_events;
mod m20260101_000002_create_outbox;
mod m20260101_000003_enable_tenant_isolation;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260101_000001_create_events::Migration),
            Box::new(m20260101_000002_create_outbox::Migration),
            Box::new(m20260101_000003_enable_tenant_isolation::Migration),
        ]
    }
}
