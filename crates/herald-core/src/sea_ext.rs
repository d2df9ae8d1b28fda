#![allow(async_fn_in_trait)]

use std::future::Future;
use std::pin::Pin;

use sea_orm::{
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, DbErr, Statement,
    TransactionError, TransactionTrait,
};

/// Session setting read by the row-level security policies on tenant-owned tables.
pub const TENANT_SETTING: &str = "app.tenant_id";

/// Boxed unit of work executed inside a tenant-scoped transaction.
pub type TenantWork<'c, T> = Pin<Box<dyn Future<Output = Result<T, DbErr>> + Send + 'c>>;

/// Restrict the current transaction to rows owned by `tenant_id`.
///
/// Uses `set_config(.., is_local => true)` with bound parameters, so the setting is dropped
/// at commit/rollback and the tenant id never becomes part of the SQL text.
pub async fn scope_to_tenant<C>(conn: &C, tenant_id: &str) -> Result<(), DbErr>
where
    C: ConnectionTrait,
{
    conn.execute(Statement::from_sql_and_values(
        DbBackend::Postgres,
        "SELECT set_config($1, $2, true)",
        [TENANT_SETTING.into(), tenant_id.into()],
    ))
    .await?;
    Ok(())
}

pub trait TenantTransaction {
    /// Run `callback` in a fresh transaction scoped to `tenant_id`.
    ///
    /// Every call opens its own transaction; an `Err` from the callback rolls it back.
    async fn tenant_transaction<F, T>(&self, tenant_id: &str, callback: F) -> Result<T, DbErr>
    where
        F: for<'c> FnOnce(&'c DatabaseTransaction) -> TenantWork<'c, T> + Send + 'static,
        T: Send + 'static;
}

impl TenantTransaction for DatabaseConnection {
    async fn tenant_transaction<F, T>(&self, tenant_id: &str, callback: F) -> Result<T, DbErr>
    where
        F: for<'c> FnOnce(&'c DatabaseTransaction) -> TenantWork<'c, T> + Send + 'static,
        T: Send + 'static,
    {
        let tenant_id = tenant_id.to_owned();
        self.transaction::<_, T, DbErr>(move |txn| {
            Box::pin(async move {
                scope_to_tenant(txn, &tenant_id).await?;
                callback(txn).await
            })
        })
        .await
        .map_err(|e| match e {
            TransactionError::Connection(e) | TransactionError::Transaction(e) => e,
        })
    }
}
