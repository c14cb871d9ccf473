//! A connection together with its transaction state.
//!
//! # Example
//!
//! ```ignore
//! use pgdao::{ContextConfig, DataAccessContext, DaoResult, Query};
//!
//! # async fn demo() -> DaoResult<()> {
//! let ctx = DataAccessContext::connect("postgres://...", ContextConfig::new()).await?;
//!
//! ctx.begin().await?;
//! ctx.insert_into("agent").value("name", "Bond").execute(&ctx).await?;
//! ctx.commit().await?;
//!
//! let count = ctx.select("count(*)").from("agent").get_int(&ctx).await?;
//! ctx.close().await?;
//! # Ok(()) }
//! ```

use crate::client::{GenericClient, RowStream};
use crate::config::ContextConfig;
use crate::dao::impl_entry_points;
use crate::dialect::Dialect;
use crate::error::{DaoError, DaoResult};
use crate::trace;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_postgres::types::ToSql;
use tokio_postgres::{NoTls, Row};

/// A database connection that statements run on and transactions are scoped to.
///
/// Outside `begin` … `commit`/`rollback` every statement commits on its own.
/// Several transactions may follow each other on the same context.
pub struct DataAccessContext {
    client: tokio_postgres::Client,
    config: ContextConfig,
    in_transaction: AtomicBool,
}

impl DataAccessContext {
    /// Wrap an existing connection.
    pub fn new(client: tokio_postgres::Client, config: ContextConfig) -> Self {
        Self {
            client,
            config,
            in_transaction: AtomicBool::new(false),
        }
    }

    /// Open a connection without TLS and drive it on the tokio runtime.
    pub async fn connect(url: &str, config: ContextConfig) -> DaoResult<Self> {
        let (client, connection) = tokio_postgres::connect(url, NoTls).await?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                trace::connection_lost(&e);
            }
        });
        Ok(Self::new(client, config))
    }

    /// The underlying connection.
    pub fn connection(&self) -> &tokio_postgres::Client {
        &self.client
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.config.dialect.as_ref()
    }

    fn dialect_arc(&self) -> Arc<dyn Dialect> {
        Arc::clone(&self.config.dialect)
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction.load(Ordering::Acquire)
    }

    /// Start a transaction.
    pub async fn begin(&self) -> DaoResult<()> {
        self.boundary("BEGIN", "begin a transaction").await?;
        self.in_transaction.store(true, Ordering::Release);
        Ok(())
    }

    /// Commit the current transaction.
    pub async fn commit(&self) -> DaoResult<()> {
        self.boundary("COMMIT", "commit").await?;
        self.in_transaction.store(false, Ordering::Release);
        Ok(())
    }

    /// Roll back the current transaction. When the rollback fails the context
    /// still counts as inside the transaction.
    pub async fn rollback(&self) -> DaoResult<()> {
        self.boundary("ROLLBACK", "roll back").await?;
        self.in_transaction.store(false, Ordering::Release);
        Ok(())
    }

    /// End the context. An open transaction is committed, or rolled back when
    /// `commit_on_close` is off.
    pub async fn close(self) -> DaoResult<()> {
        if !self.in_transaction() {
            return Ok(());
        }
        if self.config.commit_on_close {
            self.commit().await.inspect_err(|e| trace::commit_failed(e))
        } else {
            self.rollback().await
        }
    }

    async fn boundary(&self, command: &str, action: &'static str) -> DaoResult<()> {
        trace::transaction(action);
        self.client
            .batch_execute(command)
            .await
            .map_err(|e| DaoError::context(action, e))
    }
}

impl_entry_points!(DataAccessContext);

impl Drop for DataAccessContext {
    fn drop(&mut self) {
        if *self.in_transaction.get_mut() {
            trace::open_transaction_dropped();
        }
    }
}

impl std::fmt::Debug for DataAccessContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataAccessContext")
            .field("config", &self.config)
            .field("in_transaction", &self.in_transaction())
            .finish_non_exhaustive()
    }
}

impl GenericClient for DataAccessContext {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DaoResult<Vec<Row>> {
        GenericClient::query(&self.client, sql, params).await
    }

    async fn query_stream(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> DaoResult<RowStream> {
        GenericClient::query_stream(&self.client, sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DaoResult<u64> {
        GenericClient::execute(&self.client, sql, params).await
    }
}

/// Run a block inside a transaction of a [`DataAccessContext`].
///
/// Commits when the block evaluates to `Ok`, rolls back on `Err`. The block
/// must evaluate to `pgdao::DaoResult<T>`. If the rollback fails as well, the
/// result is [`DaoError::RollbackFailed`](crate::DaoError::RollbackFailed)
/// carrying both errors.
///
/// ```ignore
/// let id = pgdao::transaction!(ctx, {
///     let id = ctx.insert_into("agent").value("name", "Bond").create(&ctx).await?;
///     ctx.update("stats").set("agents = agents + ?", 1).execute(&ctx).await?;
///     Ok(id)
/// })?;
/// ```
#[macro_export]
macro_rules! transaction {
    ($ctx:expr, $body:block) => {{
        let __pgdao_ctx: &$crate::DataAccessContext = &$ctx;
        __pgdao_ctx.begin().await?;
        let __pgdao_tx_body_result: $crate::DaoResult<_> = async { $body }.await;
        match __pgdao_tx_body_result {
            Ok(value) => {
                __pgdao_ctx.commit().await?;
                Ok(value)
            }
            Err(error) => match __pgdao_ctx.rollback().await {
                Ok(()) => Err(error),
                Err(rollback) => Err($crate::DaoError::rollback_failed(error, rollback)),
            },
        }
    }};
}
