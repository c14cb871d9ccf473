#![allow(dead_code)]

use pgdao::{ContextConfig, DaoResult, DataAccessContext};

/// Connect to `DATABASE_URL` (read from the environment or a `.env` file).
///
/// Returns `None`, after printing why, when no database is configured.
pub async fn connect(test: &str) -> DaoResult<Option<DataAccessContext>> {
    dotenvy::dotenv().ok();
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL is not set; skipping {test}");
        return Ok(None);
    };
    let ctx = DataAccessContext::connect(&url, ContextConfig::new()).await?;
    Ok(Some(ctx))
}

/// Run a batch of setup statements without parameters.
pub async fn setup(ctx: &DataAccessContext, sql: &str) -> DaoResult<()> {
    ctx.connection()
        .batch_execute(sql)
        .await
        .map_err(pgdao::DaoError::from_db_error)
}
