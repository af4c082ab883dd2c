use crate::db::models::CheckpointRecord;
use crate::errors::Error;
use chrono::Utc;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

/// Repository for run checkpoints, one row per task graph id
pub struct CheckpointRepository<'a> {
    pub conn: &'a mut SqliteConnection,
}

impl<'a> CheckpointRepository<'a> {
    pub fn new(conn: &'a mut SqliteConnection) -> Self {
        CheckpointRepository { conn }
    }

    /// Inserts or replaces the snapshot for `task_graph_id`
    pub fn upsert(&mut self, graph_id: &str, serialized_state: &str) -> Result<(), Error> {
        use crate::schema::checkpoints;

        let record = CheckpointRecord {
            task_graph_id: graph_id.to_string(),
            state: serialized_state.to_string(),
            updated_at: Utc::now().to_rfc3339(),
        };
        diesel::replace_into(checkpoints::table)
            .values(&record)
            .execute(self.conn)?;
        Ok(())
    }

    pub fn find(&mut self, graph_id: &str) -> Result<Option<CheckpointRecord>, Error> {
        use crate::schema::checkpoints::dsl::*;

        let record = checkpoints
            .filter(task_graph_id.eq(graph_id))
            .first::<CheckpointRecord>(self.conn)
            .optional()?;
        Ok(record)
    }

    pub fn delete(&mut self, graph_id: &str) -> Result<usize, Error> {
        use crate::schema::checkpoints::dsl::*;

        let deleted = diesel::delete(checkpoints.filter(task_graph_id.eq(graph_id)))
            .execute(self.conn)?;
        Ok(deleted)
    }
}
