mod chat_repository;
mod checkpoint_repository;
mod models;

use crate::errors::{Error, Result};
use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use std::sync::Arc;

pub use chat_repository::*;
pub use checkpoint_repository::*;
pub use models::*;

/// Tables created on startup when missing
const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS chat_messages (
    id TEXT PRIMARY KEY NOT NULL,
    correlation_id TEXT,
    message TEXT NOT NULL,
    response TEXT NOT NULL,
    task_graph TEXT,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS checkpoints (
    task_graph_id TEXT PRIMARY KEY NOT NULL,
    state TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
";

#[derive(Clone, Debug)]
pub struct Database {
    pool: Arc<Pool<ConnectionManager<SqliteConnection>>>,
}

impl Database {
    /// Opens (or creates) the SQLite file and makes sure the tables exist
    pub fn new(db_path: &str) -> Result<Self> {
        let manager = ConnectionManager::<SqliteConnection>::new(db_path);
        let pool = Pool::builder().max_size(4).build(manager)?;
        let database = Database {
            pool: Arc::new(pool),
        };
        database
            .get_conn()?
            .batch_execute(SCHEMA_SQL)
            .map_err(Error::DieselError)?;
        Ok(database)
    }

    pub fn get_conn(&self) -> Result<PooledConnection<ConnectionManager<SqliteConnection>>> {
        Ok(self.pool.get()?)
    }

    /// Runs blocking diesel work off the async runtime
    pub async fn run<F, T>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let database = self.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = database.get_conn()?;
            work(&mut conn)
        })
        .await
        .map_err(|e| Error::Store(format!("database task panicked: {}", e)))?
    }
}
