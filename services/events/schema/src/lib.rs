//! SeaORM entities for the events service tables.

pub mod events;
pub mod outbox;
