use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Outbox::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Outbox::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Outbox::TenantId).text().not_null())
                    .col(
                        ColumnDef::new(Outbox::EventId)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Outbox::EventType).text().not_null())
                    .col(ColumnDef::new(Outbox::AggregateId).big_integer().not_null())
                    .col(ColumnDef::new(Outbox::Payload).json_binary().not_null())
                    .col(ColumnDef::new(Outbox::PublishedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_outbox_aggregate_id")
                            .from(Outbox::Table, Outbox::AggregateId)
                            .to(Events::Table, Events::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // Relay poll: unpublished rows of one tenant in id order.
        manager
            .create_index(
                Index::create()
                    .table(Outbox::Table)
                    .col(Outbox::TenantId)
                    .col(Outbox::PublishedAt)
                    .col(Outbox::Id)
                    .name("idx_outbox_tenant_id_published_at_id")
                    .to_owned(),
            )
            .await?;

        // Newest-first listing.
        manager
            .create_index(
                Index::create()
                    .table(Outbox::Table)
                    .col(Outbox::TenantId)
                    .col(Outbox::AggregateId)
                    .name("idx_outbox_tenant_id_aggregate_id")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Outbox::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Outbox {
    Table,
    Id,
    TenantId,
    EventId,
    EventType,
    AggregateId,
    Payload,
    PublishedAt,
}

#[derive(Iden)]
enum Events {
    Table,
    Id,
}
