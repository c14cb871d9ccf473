//! Statement logging through `tracing`.
//!
//! Events go to the `pgdao::sql` target. Without the `tracing` feature every
//! function here compiles to nothing.

#[cfg(feature = "tracing")]
pub(crate) fn statement(kind: &'static str, sql: &str, param_count: usize) {
    tracing::debug!(target: "pgdao::sql", kind, param_count, sql = %sql);
}

#[cfg(not(feature = "tracing"))]
pub(crate) fn statement(_kind: &'static str, _sql: &str, _param_count: usize) {}

#[cfg(feature = "tracing")]
pub(crate) fn skipped_row() {
    tracing::trace!(target: "pgdao::sql", "row key has no entry in the map, skipped");
}

#[cfg(not(feature = "tracing"))]
pub(crate) fn skipped_row() {}

#[cfg(feature = "tracing")]
pub(crate) fn transaction(action: &'static str) {
    tracing::debug!(target: "pgdao::sql", action, "transaction boundary");
}

#[cfg(not(feature = "tracing"))]
pub(crate) fn transaction(_action: &'static str) {}

#[cfg(feature = "tracing")]
pub(crate) fn commit_failed(error: &dyn std::error::Error) {
    tracing::warn!(target: "pgdao::sql", error = %error, "commit on close failed");
}

#[cfg(not(feature = "tracing"))]
pub(crate) fn commit_failed(_error: &dyn std::error::Error) {}

#[cfg(feature = "tracing")]
pub(crate) fn open_transaction_dropped() {
    tracing::warn!(target: "pgdao::sql", "context dropped inside a transaction, the server rolls it back");
}

#[cfg(not(feature = "tracing"))]
pub(crate) fn open_transaction_dropped() {}

#[cfg(feature = "tracing")]
pub(crate) fn connection_lost(error: &tokio_postgres::Error) {
    tracing::error!(target: "pgdao::sql", error = %error, "connection closed with an error");
}

#[cfg(not(feature = "tracing"))]
pub(crate) fn connection_lost(_error: &tokio_postgres::Error) {}
